//! Monte Carlo sample bookkeeping
//!
//! A run produces `nsamps` realizations. Each realization is driven by one
//! temperature trajectory and evaluated with exactly one empirical response method.
//! [`SampleSpec`] resolves the requested counts and [`SampleAllocation`] partitions
//! the realizations between methods.
//!
//! All randomness is drawn from a generator owned by the caller and passed in by
//! `&mut`. The consumption order is fixed:
//!
//! 1. choice of the methods that receive one of the remainder samples
//! 2. per-method selection of sample indices, without replacement, from a pool that
//!    shrinks after every method
//! 3. per-sample uncertainty draws (made by the projection, after allocation)
//!
//! Reordering these steps changes every downstream number for a given seed.

use crate::errors::{Ar5Error, Ar5Result};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many realizations were requested
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSpec {
    /// A single total sample count
    Total(usize),
    /// Method samples × temperature samples, the two-factor design
    Factored { nmsamps: usize, ntsamps: usize },
}

/// Resolved sample counts for a run
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    /// Total number of realizations in the output ensemble
    pub nsamps: usize,
    /// Number of method realizations
    pub nmsamps: usize,
    /// Number of temperature realizations per method realization
    pub ntsamps: usize,
}

impl SampleSpec {
    /// Resolve the requested counts against the number of response methods
    ///
    /// A total count is decomposed as `nmsamps = ceil(sqrt(nsamps))` rounded down to a
    /// multiple of `n_methods`, and `ntsamps = ceil(nsamps / nmsamps)`.
    ///
    /// # Errors
    ///
    /// [`Ar5Error::Configuration`] if there are no methods, no samples, or the
    /// realization count is not a multiple of the number of methods.
    pub fn resolve(self, n_methods: usize) -> Ar5Result<SampleCounts> {
        if n_methods == 0 {
            return Err(Ar5Error::Configuration(
                "at least one response method is required".to_string(),
            ));
        }

        let counts = match self {
            SampleSpec::Total(nsamps) => {
                if nsamps == 0 {
                    return Err(Ar5Error::Configuration(
                        "number of samples must be positive".to_string(),
                    ));
                }
                let root = ceil_sqrt(nsamps);
                let nmsamps = root - root % n_methods;
                if nmsamps == 0 {
                    return Err(Ar5Error::Configuration(format!(
                        "{} samples are too few to spread over {} methods",
                        nsamps, n_methods
                    )));
                }
                SampleCounts {
                    nsamps,
                    nmsamps,
                    ntsamps: nsamps.div_ceil(nmsamps),
                }
            }
            SampleSpec::Factored { nmsamps, ntsamps } => SampleCounts {
                nsamps: nmsamps.checked_mul(ntsamps).ok_or_else(|| {
                    Ar5Error::Configuration(format!(
                        "{} realizations of {} temperature samples overflow the sample count",
                        nmsamps, ntsamps
                    ))
                })?,
                nmsamps,
                ntsamps,
            },
        };

        if counts.nsamps == 0 {
            return Err(Ar5Error::Configuration(
                "number of samples must be positive".to_string(),
            ));
        }
        if counts.nmsamps % n_methods != 0 {
            return Err(Ar5Error::Configuration(format!(
                "number of realisations ({}) must be a multiple of the number of methods ({})",
                counts.nmsamps, n_methods
            )));
        }
        Ok(counts)
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt().ceil() as usize;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}

/// Partition of the realizations `0..nsamps` between response methods
///
/// Every index appears in exactly one method's list, and list sizes differ by at most
/// one. Each list is kept in the order its indices were drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleAllocation {
    nsamps: usize,
    members: Vec<Vec<usize>>,
}

impl SampleAllocation {
    /// Draw an allocation of `nsamps` realizations over `n_methods` methods
    ///
    /// Each method receives `nsamps / n_methods` samples; the remainder goes one each
    /// to methods chosen uniformly without replacement.
    pub fn draw<R: Rng + ?Sized>(
        nsamps: usize,
        n_methods: usize,
        rng: &mut R,
    ) -> Ar5Result<Self> {
        if n_methods == 0 {
            return Err(Ar5Error::Configuration(
                "at least one response method is required".to_string(),
            ));
        }

        let mut sizes = vec![nsamps / n_methods; n_methods];
        for method in index::sample(rng, n_methods, nsamps % n_methods).iter() {
            sizes[method] += 1;
        }

        let mut pool: Vec<usize> = (0..nsamps).collect();
        let mut members = Vec::with_capacity(n_methods);
        for (method, &size) in sizes.iter().enumerate() {
            let picks = index::sample(rng, pool.len(), size);

            let mut taken = vec![false; pool.len()];
            let chosen: Vec<usize> = picks
                .iter()
                .map(|i| {
                    taken[i] = true;
                    pool[i]
                })
                .collect();
            pool = pool
                .into_iter()
                .zip(taken)
                .filter_map(|(sample, taken)| (!taken).then_some(sample))
                .collect();

            debug!(method, samples = chosen.len(), "Allocated samples");
            members.push(chosen);
        }

        Ok(Self { nsamps, members })
    }

    pub fn nsamps(&self) -> usize {
        self.nsamps
    }

    pub fn n_methods(&self) -> usize {
        self.members.len()
    }

    /// Sample indices assigned to `method`, in draw order
    pub fn samples_for(&self, method: usize) -> &[usize] {
        &self.members[method]
    }

    /// Number of samples assigned to each method
    pub fn sizes(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }

    /// Iterate over `(method, samples)` pairs in method order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.members
            .iter()
            .enumerate()
            .map(|(method, samples)| (method, samples.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn resolve_total_decomposes() {
        let counts = SampleSpec::Total(500).resolve(5).unwrap();
        // ceil(sqrt(500)) = 23 -> 20
        assert_eq!(counts.nmsamps, 20);
        assert_eq!(counts.ntsamps, 25);
        assert_eq!(counts.nsamps, 500);

        let counts = SampleSpec::Total(301).resolve(3).unwrap();
        assert_eq!(counts.nmsamps, 18);
        assert_eq!(counts.ntsamps, 17);
    }

    #[test]
    fn resolve_factored_requires_multiple() {
        let counts = SampleSpec::Factored {
            nmsamps: 1000,
            ntsamps: 450,
        }
        .resolve(5)
        .unwrap();
        assert_eq!(counts.nsamps, 450_000);

        let result = SampleSpec::Factored {
            nmsamps: 1001,
            ntsamps: 2,
        }
        .resolve(5);
        assert!(matches!(result, Err(Ar5Error::Configuration(_))));
    }

    #[test]
    fn resolve_factored_overflow() {
        let result = SampleSpec::Factored {
            nmsamps: usize::MAX / 2 + 1,
            ntsamps: 2,
        }
        .resolve(1);
        assert!(matches!(result, Err(Ar5Error::Configuration(_))));
    }

    #[test]
    fn resolve_degenerate_counts() {
        assert!(SampleSpec::Total(0).resolve(3).is_err());
        assert!(SampleSpec::Total(10).resolve(0).is_err());
        // ceil(sqrt(4)) = 2 rounds down to zero realizations for 5 methods
        assert!(SampleSpec::Total(4).resolve(5).is_err());
    }

    #[test]
    fn ceil_sqrt_exact_squares() {
        assert_eq!(ceil_sqrt(0), 0);
        assert_eq!(ceil_sqrt(1), 1);
        assert_eq!(ceil_sqrt(16), 4);
        assert_eq!(ceil_sqrt(17), 5);
        assert_eq!(ceil_sqrt(300), 18);
    }

    #[test]
    fn allocation_is_a_partition() {
        for &(nsamps, n_methods) in &[(300, 3), (301, 3), (10, 4), (7, 7), (5, 7), (1000, 5)] {
            let mut rng = ChaCha8Rng::seed_from_u64(1234);
            let allocation = SampleAllocation::draw(nsamps, n_methods, &mut rng).unwrap();

            let mut seen = vec![0usize; nsamps];
            for (_, samples) in allocation.iter() {
                for &s in samples {
                    seen[s] += 1;
                }
            }
            assert!(
                seen.iter().all(|&count| count == 1),
                "Every sample must be allocated exactly once for ({}, {})",
                nsamps,
                n_methods
            );

            let sizes = allocation.sizes();
            assert_eq!(sizes.iter().sum::<usize>(), nsamps);
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn allocation_even_split() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let allocation = SampleAllocation::draw(300, 3, &mut rng).unwrap();
        assert_eq!(allocation.sizes(), vec![100, 100, 100]);
    }

    #[test]
    fn allocation_single_remainder() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let allocation = SampleAllocation::draw(301, 3, &mut rng).unwrap();
        let mut sizes = allocation.sizes();
        sizes.sort();
        assert_eq!(sizes, vec![100, 100, 101]);

        // The method with the extra sample is the generator's first draw
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let first = index::sample(&mut rng, 3, 1).index(0);
        assert_eq!(allocation.samples_for(first).len(), 101);
    }

    #[test]
    fn allocation_is_reproducible() {
        let a = SampleAllocation::draw(257, 5, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = SampleAllocation::draw(257, 5, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let c = SampleAllocation::draw(257, 5, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

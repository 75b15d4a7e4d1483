//! Power-law glacier melt model
//!
//! Each empirical method relates cumulative glacier mass loss to integrated
//! temperature $I$ as
//!
//! $$\Delta M = 10^{-3} \, f \, \max(I, 0)^{p}$$
//!
//! with $f$ the method's factor (mm SLE) and $p$ its exponent, giving metres SLE.
//!
//! Negative integrated temperature is clamped to zero before exponentiation. A
//! fractional power of a negative number is undefined, and non-physical negative
//! warming should not produce a result at all. This is a domain policy, not an error.

use ndarray::{Array1, ArrayView1};

/// Millimetres to metres
pub const MM_TO_M: f64 = 1e-3;
/// Metres to millimetres
pub const M_TO_MM: f64 = 1e3;

/// Glacier contribution (m SLE) of one method for an integrated-temperature trajectory
pub fn project_glacier(
    integrated_temperature: ArrayView1<'_, f64>,
    factor: f64,
    exponent: f64,
) -> Array1<f64> {
    integrated_temperature.mapv(|it| MM_TO_M * factor * clamp_non_negative(it).powf(exponent))
}

/// Zero for negative values; NaN passes through untouched
fn clamp_non_negative(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn linear_method() {
        let mean = array![0.0, 1.0, 2.0];
        let projected = project_glacier(mean.view(), 2.0, 1.0);
        for (value, expected) in projected.iter().zip([0.0, 0.002, 0.004]) {
            assert_abs_diff_eq!(*value, expected, epsilon = 1e-15);
        }
        for (value, expected) in projected.iter().zip([0.0, 2.0, 4.0]) {
            assert_abs_diff_eq!(value * M_TO_MM, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn negative_inputs_behave_as_zero() {
        let raw = array![-3.0, -0.1, 0.0, 4.0, 9.0];
        let clamped = array![0.0, 0.0, 0.0, 4.0, 9.0];
        assert_eq!(
            project_glacier(raw.view(), 4.35, 0.658),
            project_glacier(clamped.view(), 4.35, 0.658)
        );
    }

    #[test]
    fn power_law_shape() {
        let it = array![4.0, 9.0];
        let projected = project_glacier(it.view(), 1000.0, 0.5);
        assert_abs_diff_eq!(projected[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(projected[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn nan_propagates() {
        let it = array![f64::NAN, 1.0];
        let projected = project_glacier(it.view(), 1.0, 0.7);
        assert!(projected[0].is_nan());
        assert!(projected[1].is_finite());
    }
}

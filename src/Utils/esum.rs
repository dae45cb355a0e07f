//! # Exact summation
//!
//! Reaction networks sum many terms of very different magnitude and opposite sign
//! (creation and destruction of the same nucleus, mass-weighted abundance changes in the
//! energy generation rate). A naive left-to-right sum loses the small terms; `esum`
//! keeps a list of non-overlapping partial sums (Shewchuk's algorithm, the `msum`
//! recipe) and is exact to within the final rounding.
//!
//! ```
//! use StellarBurn::Utils::esum::esum;
//! assert_eq!(esum(&[1e100, 1.0, -1e100]), 1.0);
//! ```

/// Sum of `values` correct to within the final rounding.
///
/// Falls back to the ordinary sum if any value is not finite, because the partials
/// algorithm would turn an infinity into NaN.
pub fn esum(values: &[f64]) -> f64 {
    if values.iter().any(|v| !v.is_finite()) {
        return values.iter().sum();
    }
    let mut partials: Vec<f64> = Vec::with_capacity(8);
    for &value in values {
        let mut x = value;
        let mut i = 0;
        for j in 0..partials.len() {
            let mut y = partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials[i] = lo;
                i += 1;
            }
            x = hi;
        }
        partials.truncate(i);
        partials.push(x);
    }
    partials.iter().sum()
}

/// Compensated (Kahan) summation. Cheaper than [`esum`], used where a few ulps are acceptable.
pub fn kahan_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for &value in values {
        let y = value - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esum_recovers_small_terms() {
        let values = [1e100, 1.0, -1e100, 1e-16, 2.0];
        assert_eq!(esum(&values), 3.0 + 1e-16);
        let naive: f64 = values.iter().sum();
        assert_ne!(naive, esum(&values));
    }

    #[test]
    fn test_esum_matches_plain_sum_for_benign_input() {
        let values = [0.25, 0.5, 0.125, 0.125];
        assert_eq!(esum(&values), 1.0);
        assert_eq!(esum(&[]), 0.0);
    }

    #[test]
    fn test_esum_non_finite_input() {
        assert!(esum(&[1.0, f64::INFINITY]).is_infinite());
        assert!(esum(&[1.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_kahan_sum_tenths() {
        let values = vec![0.1; 10];
        assert!((kahan_sum(&values) - 1.0).abs() <= f64::EPSILON);
    }
}

//! Numeric helpers shared by the mixture fit and the summarizer.
//!
//! Distribution densities and moments come from `statrs`; this module keeps the
//! order statistic and log-space reduction the EM loop and feature record need.

/// Calculates the median of a slice of MAF values.
///
/// # Arguments
///
/// * `data` - Values in any order; the slice is left untouched.
///
/// # Returns
///
/// `None` for an empty slice. For an even number of values, the mean of the two
/// middle values.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    match sorted.len() % 2 {
        0 => Some((sorted[mid - 1] + sorted[mid]) / 2.0),
        _ => Some(sorted[mid]),
    }
}

/// Computes `ln(sum(exp(x)))` without overflow.
///
/// # Arguments
///
/// * `xs` - Log-space terms, e.g. the weighted log-densities of every component.
///
/// # Returns
///
/// The log of the summed terms, or negative infinity when every term is negative
/// infinity.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_median_single() {
        assert_eq!(median(&[0.25]), Some(0.25));
    }

    #[test]
    fn test_median_even() {
        assert_eq!(
            median(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0]),
            Some(3.5)
        );
    }

    #[test]
    fn test_median_odd() {
        assert_eq!(median(&[0.1, 0.3, 0.2, 0.5, 0.4]), Some(0.3));
    }

    #[test]
    fn test_median_all_equal() {
        assert_eq!(median(&[0.2, 0.2, 0.2, 0.2]), Some(0.2));
    }

    #[test]
    fn test_median_long_run_of_equal_values() {
        let frac = 1.0 / 30.0;
        assert_eq!(median(&vec![frac; 100_000]), Some(frac));
        let mut mixed = vec![frac; 60_001];
        mixed.extend(std::iter::repeat(0.5).take(40_000));
        assert_eq!(median(&mixed), Some(frac));
    }

    #[test]
    fn test_median_leaves_input_untouched() {
        let data = [0.4, 0.1, 0.3];
        assert_eq!(median(&data), Some(0.3));
        assert_eq!(data, [0.4, 0.1, 0.3]);
    }

    #[test]
    fn test_log_sum_exp() {
        let got = log_sum_exp(&[0.0_f64.ln(), 2.0_f64.ln()]);
        assert!((got - 2.0_f64.ln()).abs() < 1e-12);
        assert_eq!(
            log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]),
            f64::NEG_INFINITY
        );
        let big = log_sum_exp(&[1000.0, 1000.0]);
        assert!((big - (1000.0 + 2.0_f64.ln())).abs() < 1e-9);
    }
}

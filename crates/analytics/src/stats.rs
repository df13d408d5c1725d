//! Sample statistics over Decimal series.
//!
//! Variances and covariances use the n − 1 denominator so the results line up
//! with the defaults of the common dataframe libraries.

use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::DatedValue;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use std::collections::BTreeMap;

pub fn mean(values: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "mean of an empty series".to_string(),
        ));
    }
    let sum = checked_sum(values.iter().copied(), "mean")?;
    sum.checked_div(Decimal::from(values.len()))
        .ok_or_else(|| overflow("mean"))
}

pub fn sample_variance(values: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    sample_covariance(values, values)
}

pub fn sample_covariance(xs: &[Decimal], ys: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    if xs.len() != ys.len() {
        return Err(AnalyticsError::InvalidInput(format!(
            "covariance needs equal-length series, got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(AnalyticsError::InsufficientData(format!(
            "at least 2 observations are required, got {}",
            xs.len()
        )));
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let products = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let dx = x.checked_sub(mean_x).ok_or_else(|| overflow("covariance"))?;
            let dy = y.checked_sub(mean_y).ok_or_else(|| overflow("covariance"))?;
            dx.checked_mul(dy).ok_or_else(|| overflow("covariance"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let sum = checked_sum(products, "covariance")?;

    sum.checked_div(Decimal::from(xs.len() - 1))
        .ok_or_else(|| overflow("covariance"))
}

pub fn sample_std_dev(values: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    sqrt(sample_variance(values)?)
}

pub fn sqrt(value: Decimal) -> Result<Decimal, AnalyticsError> {
    value.sqrt().ok_or_else(|| {
        AnalyticsError::Calculation(format!("failed to calculate square root of {value}"))
    })
}

/// Sums without panicking when the total leaves Decimal's range.
pub fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal, AnalyticsError> {
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or_else(|| overflow(what))
    })
}

pub(crate) fn overflow(what: &str) -> AnalyticsError {
    AnalyticsError::Calculation(format!("{what} exceeds the representable decimal range"))
}

/// Inner-joins two dated series on their common dates, in date order.
pub fn align(left: &[DatedValue], right: &[DatedValue]) -> (Vec<Decimal>, Vec<Decimal>) {
    let right: BTreeMap<NaiveDate, Decimal> = right.iter().copied().collect();
    left.iter()
        .filter_map(|(date, l)| right.get(date).map(|r| (*l, *r)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sample_variance_uses_n_minus_one() {
        // squared deviations from the mean sum to 2; a population variance would be 2/3
        let values = [dec!(1), dec!(2), dec!(3)];
        assert_eq!(sample_variance(&values).unwrap(), dec!(1));
    }

    #[test]
    fn covariance_of_mirrored_series_is_negative_variance() {
        let xs = [dec!(1), dec!(2), dec!(3)];
        let ys = [dec!(3), dec!(2), dec!(1)];
        assert_eq!(sample_covariance(&xs, &ys).unwrap(), dec!(-1));
    }

    #[test]
    fn single_observation_is_insufficient() {
        assert!(matches!(
            sample_variance(&[dec!(1)]),
            Err(AnalyticsError::InsufficientData(_))
        ));
        assert!(matches!(mean(&[]), Err(AnalyticsError::InsufficientData(_))));
    }

    #[test]
    fn overflowing_sums_are_errors() {
        assert!(matches!(
            mean(&[Decimal::MAX, Decimal::MAX]),
            Err(AnalyticsError::Calculation(_))
        ));
        assert!(matches!(
            sample_variance(&[Decimal::MAX, Decimal::MIN]),
            Err(AnalyticsError::Calculation(_))
        ));
        assert_eq!(checked_sum([dec!(1), dec!(2)], "sum").unwrap(), dec!(3));
    }

    #[test]
    fn align_keeps_only_common_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let left = [(d(1), dec!(1)), (d(2), dec!(2)), (d(4), dec!(4))];
        let right = [(d(2), dec!(20)), (d(3), dec!(30)), (d(4), dec!(40))];

        let (l, r) = align(&left, &right);
        assert_eq!(l, vec![dec!(2), dec!(4)]);
        assert_eq!(r, vec![dec!(20), dec!(40)]);
    }
}

//! Input validation shared by every estimator, grounded on the
//! reference's `check_X_y`/`check_for_predict`
//! (`original_source/lib/src/tsetlini.cpp`).

use crate::container::BitRow;
use crate::error::{TsetlinError, TsetlinResult};

fn check_all_0s_or_1s(row: &[u8]) -> bool {
    row.iter().all(|&b| b == 0 || b == 1)
}

fn check_rows_same_width(x: &[Vec<u8>]) -> bool {
    match x.first() {
        None => true,
        Some(first) => x.iter().all(|row| row.len() == first.len()),
    }
}

/// Validate a classifier fit/partial_fit call's `(X, y)` pair.
pub fn check_x_y_classifier(x: &[Vec<u8>], y: &[i32]) -> TsetlinResult<()> {
    if x.is_empty() {
        return Err(TsetlinError::ValueError("Cannot fit on empty X".to_string()));
    }
    if x.len() != y.len() {
        return Err(TsetlinError::ValueError(format!(
            "X and y must have the same number of rows, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if !check_rows_same_width(x) {
        return Err(TsetlinError::ValueError(
            "All samples in X must have the same number of feature columns".to_string(),
        ));
    }
    if !x.iter().all(|row| check_all_0s_or_1s(row)) {
        return Err(TsetlinError::ValueError(
            "Only values of 0 and 1 can be used in X".to_string(),
        ));
    }
    if y.iter().any(|&label| label < 0) {
        return Err(TsetlinError::ValueError(
            "Labels in y must be non-negative integers".to_string(),
        ));
    }
    Ok(())
}

/// Validate a regressor fit/partial_fit call's `(X, y)` pair; `y` must
/// lie in `[0, threshold]`.
pub fn check_x_y_regressor(x: &[Vec<u8>], y: &[i32], threshold: i32) -> TsetlinResult<()> {
    if x.is_empty() {
        return Err(TsetlinError::ValueError("Cannot fit on empty X".to_string()));
    }
    if x.len() != y.len() {
        return Err(TsetlinError::ValueError(format!(
            "X and y must have the same number of rows, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if !check_rows_same_width(x) {
        return Err(TsetlinError::ValueError(
            "All samples in X must have the same number of feature columns".to_string(),
        ));
    }
    if !x.iter().all(|row| check_all_0s_or_1s(row)) {
        return Err(TsetlinError::ValueError(
            "Only values of 0 and 1 can be used in X".to_string(),
        ));
    }
    if y.iter().any(|&v| !(0..=threshold).contains(&v)) {
        return Err(TsetlinError::ValueError(format!(
            "Only values within [0, {threshold}] range can be used in y"
        )));
    }
    Ok(())
}

/// Validate a predict call against the feature count fixed at fit time.
pub fn check_for_predict(x: &[Vec<u8>], is_fitted: bool, number_of_features: usize) -> TsetlinResult<()> {
    if !is_fitted {
        return Err(TsetlinError::NotFitted);
    }
    if x.is_empty() {
        return Err(TsetlinError::ValueError("Cannot predict for empty X".to_string()));
    }
    if !check_rows_same_width(x) {
        return Err(TsetlinError::ValueError(
            "All samples in X must have the same number of feature columns".to_string(),
        ));
    }
    if x[0].len() != number_of_features {
        return Err(TsetlinError::ValueError(format!(
            "Predict called with X, which number of features {} does not match that from prior fit {}",
            x[0].len(),
            number_of_features
        )));
    }
    if !x.iter().all(|row| check_all_0s_or_1s(row)) {
        return Err(TsetlinError::ValueError(
            "Only values of 0 and 1 can be used in X".to_string(),
        ));
    }
    Ok(())
}

fn check_rows_same_cols(x: &[BitRow]) -> bool {
    match x.first() {
        None => true,
        Some(first) => x.iter().all(|row| row.cols() == first.cols()),
    }
}

fn check_padding_is_zero(x: &[BitRow]) -> TsetlinResult<()> {
    if !x.iter().all(|row| row.padding_is_zero()) {
        return Err(TsetlinError::ValueError(
            "A packed row has a set bit beyond its declared feature count".to_string(),
        ));
    }
    Ok(())
}

/// Validate a bitwise classifier fit/partial_fit call's `(X, y)` pair.
pub fn check_x_y_classifier_bitwise(x: &[BitRow], y: &[i32]) -> TsetlinResult<()> {
    if x.is_empty() {
        return Err(TsetlinError::ValueError("Cannot fit on empty X".to_string()));
    }
    if x.len() != y.len() {
        return Err(TsetlinError::ValueError(format!(
            "X and y must have the same number of rows, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if !check_rows_same_cols(x) {
        return Err(TsetlinError::ValueError(
            "All samples in X must have the same number of feature columns".to_string(),
        ));
    }
    check_padding_is_zero(x)?;
    if y.iter().any(|&label| label < 0) {
        return Err(TsetlinError::ValueError(
            "Labels in y must be non-negative integers".to_string(),
        ));
    }
    Ok(())
}

/// Validate a bitwise regressor fit/partial_fit call's `(X, y)` pair;
/// `y` must lie in `[0, threshold]`.
pub fn check_x_y_regressor_bitwise(x: &[BitRow], y: &[i32], threshold: i32) -> TsetlinResult<()> {
    if x.is_empty() {
        return Err(TsetlinError::ValueError("Cannot fit on empty X".to_string()));
    }
    if x.len() != y.len() {
        return Err(TsetlinError::ValueError(format!(
            "X and y must have the same number of rows, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if !check_rows_same_cols(x) {
        return Err(TsetlinError::ValueError(
            "All samples in X must have the same number of feature columns".to_string(),
        ));
    }
    check_padding_is_zero(x)?;
    if y.iter().any(|&v| !(0..=threshold).contains(&v)) {
        return Err(TsetlinError::ValueError(format!(
            "Only values within [0, {threshold}] range can be used in y"
        )));
    }
    Ok(())
}

/// Validate a bitwise predict call against the feature count fixed at
/// fit time, including the padding guard `BitRow::new` does not enforce.
pub fn check_for_predict_bitwise(x: &[BitRow], is_fitted: bool, number_of_features: usize) -> TsetlinResult<()> {
    if !is_fitted {
        return Err(TsetlinError::NotFitted);
    }
    if x.is_empty() {
        return Err(TsetlinError::ValueError("Cannot predict for empty X".to_string()));
    }
    if !check_rows_same_cols(x) {
        return Err(TsetlinError::ValueError(
            "All samples in X must have the same number of feature columns".to_string(),
        ));
    }
    if x[0].cols() != number_of_features {
        return Err(TsetlinError::ValueError(format!(
            "Predict called with X, which number of features {} does not match that from prior fit {}",
            x[0].cols(),
            number_of_features
        )));
    }
    check_padding_is_zero(x)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_x() {
        assert!(check_x_y_classifier(&[], &[]).is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        let x = vec![vec![0, 1], vec![0, 1, 1]];
        assert!(check_x_y_classifier(&x, &[0, 1]).is_err());
    }

    #[test]
    fn rejects_non_binary_values() {
        let x = vec![vec![0, 2]];
        assert!(check_x_y_classifier(&x, &[0]).is_err());
    }

    #[test]
    fn regressor_rejects_y_outside_threshold() {
        let x = vec![vec![0, 1]];
        assert!(check_x_y_regressor(&x, &[20], 15).is_err());
        assert!(check_x_y_regressor(&x, &[15], 15).is_ok());
    }

    #[test]
    fn predict_requires_fitted_model() {
        let x = vec![vec![0, 1]];
        assert!(matches!(
            check_for_predict(&x, false, 2),
            Err(TsetlinError::NotFitted)
        ));
    }

    #[test]
    fn bitwise_rejects_row_with_set_padding_bit() {
        let good = BitRow::from_bits(&[1, 0, 1, 1, 0]).unwrap();
        let bad = BitRow::new(5, vec![0b0010_0000]); // bit 5 set, beyond cols=5
        let err = check_x_y_classifier_bitwise(&[good], &[0]);
        assert!(err.is_ok());
        let err = check_for_predict_bitwise(&[bad], true, 5).unwrap_err();
        assert_eq!(err.code(), "VALUE_ERROR");
    }

    #[test]
    fn bitwise_rejects_mismatched_row_widths() {
        let a = BitRow::from_bits(&[1, 0]).unwrap();
        let b = BitRow::from_bits(&[1, 0, 1]).unwrap();
        assert!(check_x_y_classifier_bitwise(&[a, b], &[0, 1]).is_err());
    }
}

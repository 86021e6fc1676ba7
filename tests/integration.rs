//! End-to-end scenarios: serialize/restart equivalence, predict
//! determinism, and input-validation rejection, exercised through the
//! public façade only (no access to crate-internal types).

use tsetlini::container::BitRow;
use tsetlini::{ClassifierBitwise, ClassifierClassic, RegressorClassic};

fn xor_dataset(n_repeats: usize) -> (Vec<Vec<u8>>, Vec<i32>) {
    let base_x = [vec![0u8, 0], vec![0, 1], vec![1, 0], vec![1, 1]];
    let base_y = [0i32, 1, 1, 0];
    let mut x = Vec::new();
    let mut y = Vec::new();
    for _ in 0..n_repeats {
        x.extend(base_x.iter().cloned());
        y.extend(base_y.iter().copied());
    }
    (x, y)
}

/// Training for 2 epochs, serializing, restoring into a
/// fresh estimator, then training 3 more epochs must match a single
/// 5-epoch run with the same seed.
#[test]
fn serialize_restart_matches_single_run() {
    let (x, y) = xor_dataset(20);
    let params = r#"{"clauses_per_label": 8, "threshold": 5, "s": 3.0, "random_state": 11}"#;

    let mut single_run = ClassifierClassic::new(params).unwrap();
    single_run.fit(&x, &y, None, 5).unwrap();

    let mut split_run = ClassifierClassic::new(params).unwrap();
    split_run.fit(&x, &y, None, 2).unwrap();
    let snapshot = split_run.to_json().unwrap();
    let mut resumed = ClassifierClassic::from_json(&snapshot).unwrap();
    resumed.partial_fit(&x, &y, None, 3).unwrap();

    assert_eq!(
        single_run.state().counters.to_rows(),
        resumed.state().counters.to_rows()
    );
    assert_eq!(single_run.predict(&x).unwrap(), resumed.predict(&x).unwrap());
}

/// Two independently constructed estimators with the same
/// params/seed, trained on the same data in the same order, predict
/// identically on a held-out set.
#[test]
fn two_estimators_with_same_seed_predict_identically() {
    let (x, y) = xor_dataset(15);
    let params = r#"{"clauses_per_label": 12, "threshold": 8, "s": 2.5, "random_state": 42}"#;

    let mut a = ClassifierClassic::new(params).unwrap();
    a.fit(&x, &y, None, 10).unwrap();
    let mut b = ClassifierClassic::new(params).unwrap();
    b.fit(&x, &y, None, 10).unwrap();

    let holdout = vec![vec![0u8, 0], vec![0, 1], vec![1, 0], vec![1, 1]];
    assert_eq!(a.predict(&holdout).unwrap(), b.predict(&holdout).unwrap());
}

/// Predict called twice on a fitted model with the same sample never
/// mutates hidden state: both calls return the same answer.
#[test]
fn predict_is_idempotent() {
    let (x, y) = xor_dataset(10);
    let mut clf = ClassifierClassic::new(r#"{"clauses_per_label": 8, "random_state": 3}"#).unwrap();
    clf.fit(&x, &y, None, 5).unwrap();
    let first = clf.predict(&x).unwrap();
    let second = clf.predict(&x).unwrap();
    assert_eq!(first, second);
}

/// Malformed inputs are rejected with VALUE_ERROR and the
/// estimator stays unfitted.
#[test]
fn invalid_inputs_are_rejected_without_mutating_state() {
    let mut clf = ClassifierClassic::new(r#"{"clauses_per_label": 4, "random_state": 1}"#).unwrap();

    let err = clf.fit(&[], &[], None, 1).unwrap_err();
    assert_eq!(err.code(), "VALUE_ERROR");
    assert!(!clf.is_fitted());

    let err = clf.fit(&[vec![0, 1]], &[0, 1], None, 1).unwrap_err();
    assert_eq!(err.code(), "VALUE_ERROR");
    assert!(!clf.is_fitted());

    let err = clf.fit(&[vec![0, 2]], &[0], None, 1).unwrap_err();
    assert_eq!(err.code(), "VALUE_ERROR");
    assert!(!clf.is_fitted());

    let err = clf.fit(&[vec![0, 1]], &[-1], None, 1).unwrap_err();
    assert_eq!(err.code(), "VALUE_ERROR");
    assert!(!clf.is_fitted());
}

/// Non-binary values are rejected at `BitRow` construction time rather
/// than at `fit`: the packed representation has no slot for a value
/// other than 0/1 to begin with.
#[test]
fn bit_row_rejects_non_binary_values() {
    assert!(BitRow::from_bits(&[0, 1, 2]).is_none());
}

/// Bit-padding guard: a bitwise `fit` call rejects a row whose packed
/// blocks carry a set bit beyond the declared feature count, even
/// though every logical feature value is binary.
#[test]
fn bitwise_classifier_rejects_padded_garbage_bit() {
    let good = BitRow::from_bits(&[0, 1]).unwrap();
    let bad = BitRow::new(2, vec![0b0000_0100]); // bit 2 set, cols=2
    let mut clf = ClassifierBitwise::new(r#"{"clauses_per_label": 4, "random_state": 1}"#).unwrap();
    let err = clf.fit(&[good, bad], &[0, 1], None, 1).unwrap_err();
    assert_eq!(err.code(), "VALUE_ERROR");
}

/// Regressor predictions stay within the configured response range and
/// a fitted regressor round-trips through JSON.
#[test]
fn regressor_state_round_trips_and_stays_in_range() {
    let x = vec![vec![0u8, 0], vec![0, 1], vec![1, 0], vec![1, 1]];
    let y = vec![0i32, 4, 6, 10];
    let mut reg = RegressorClassic::new(r#"{"clauses": 16, "threshold": 10, "s": 3.0, "random_state": 5}"#).unwrap();
    reg.fit(&x, &y, 20).unwrap();

    let preds = reg.predict(&x).unwrap();
    assert!(preds.iter().all(|&p| (0..=10).contains(&p)));

    let json = reg.to_json().unwrap();
    let restored = RegressorClassic::from_json(&json).unwrap();
    assert_eq!(restored.predict(&x).unwrap(), preds);
}

/// Minimum legal clause counts fit without error.
#[test]
fn minimum_clause_counts_are_accepted() {
    let x = vec![vec![0u8, 1], vec![1, 0]];
    let y_cls = vec![0i32, 1];
    let mut clf = ClassifierClassic::new(r#"{"clauses_per_label": 4, "random_state": 1}"#).unwrap();
    assert!(clf.fit(&x, &y_cls, None, 1).is_ok());

    let y_rgr = vec![0i32, 5];
    let mut reg = RegressorClassic::new(r#"{"clauses": 2, "threshold": 5, "random_state": 1}"#).unwrap();
    assert!(reg.fit(&x, &y_rgr, 1).is_ok());
}

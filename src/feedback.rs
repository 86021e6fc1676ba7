//! Feedback allocation (C7): decide which clauses receive Type I or
//! Type II reinforcement this step, and with what probability. The
//! classifier schedule is grounded on the canonical per-class feedback
//! rule the reference's `classifier_update_impl` drives
//! (`calculate_classifier_feedback_to_clauses`,
//! `original_source/lib/src/tsetlini.cpp`); the regressor schedule
//! generalizes the reference's error-driven single-polarity rule
//! (`regressor_update_impl`, same file) to the configured loss function.

use crate::params::LossFn;
use crate::rng::FloatGen;
use crate::vote::{neg_clause_index, pos_clause_index};

/// Per-clause feedback directive: `1` applies Type I, `-1` applies
/// Type II, `0` leaves the clause untouched this step.
pub type FeedbackSign = i8;

/// Fill `feedback[target block] ∪ feedback[opposite block]` for one
/// training sample, per the standard multiclass-via-one-vs-one-label-pairs
/// update (Granmo 2018):
///
/// - target label: positive-polarity clauses get Type I w.p.
///   `(T - target_sum) / 2T` (reinforce firing toward the target);
///   negative-polarity clauses get Type II at the same probability
///   (suppress firing against the target).
/// - opposite label: the mirror image, at `(T + opposite_sum) / 2T`.
pub fn calculate_classifier_feedback_to_clauses(
    feedback: &mut [FeedbackSign],
    target_label: usize,
    opposite_label: usize,
    target_sum: i32,
    opposite_sum: i32,
    half: usize,
    threshold: i32,
    fgen: &mut FloatGen,
) {
    let t = threshold as f32;
    let p_target = ((t - target_sum as f32) / (2.0 * t)).clamp(0.0, 1.0);
    let p_opposite = ((t + opposite_sum as f32) / (2.0 * t)).clamp(0.0, 1.0);

    for j in 0..half {
        let pos = pos_clause_index(target_label, j, half);
        let neg = neg_clause_index(target_label, j, half);
        feedback[pos] = if fgen.next() <= p_target { 1 } else { 0 };
        feedback[neg] = if fgen.next() <= p_target { -1 } else { 0 };
    }
    for j in 0..half {
        let pos = pos_clause_index(opposite_label, j, half);
        let neg = neg_clause_index(opposite_label, j, half);
        feedback[pos] = if fgen.next() <= p_opposite { -1 } else { 0 };
        feedback[neg] = if fgen.next() <= p_opposite { 1 } else { 0 };
    }
}

/// Normalize the response error into `[-1, 1]` by the threshold, the
/// common scale every loss curve below is defined over.
fn normalized_error(response_error: i32, threshold: i32) -> f32 {
    (response_error as f32 / threshold as f32).clamp(-1.0, 1.0)
}

/// Feedback-gate probability as a function of normalized error
/// magnitude, shaped by `loss_fn`. `loss_fn_c1` is the blend weight for `L1Plus2` and the
/// knee point for `BerHu`; unused by the others.
pub fn regressor_feedback_probability(response_error: i32, threshold: i32, loss_fn: LossFn, loss_fn_c1: f32) -> f32 {
    let e = normalized_error(response_error, threshold).abs();
    match loss_fn {
        LossFn::Mae | LossFn::L1 => e,
        LossFn::Mse | LossFn::L2 => e * e,
        LossFn::L1Plus2 => {
            let c1 = loss_fn_c1.clamp(0.0, 1.0);
            (1.0 - c1) * e + c1 * e * e
        }
        LossFn::BerHu => {
            let knee = loss_fn_c1.max(1e-6);
            if e <= knee {
                e
            } else {
                (e * e + knee * knee) / (2.0 * knee)
            }
        }
    }
    .clamp(0.0, 1.0)
}

/// Per-clause feedback sign for the regressor's single polarity block:
/// `error > 0` (over-predicted) applies Type II everywhere to suppress
/// firing; `error < 0` (under-predicted) applies Type I to encourage
/// it; `error == 0` applies nothing. One gate draw per clause.
pub fn calculate_regressor_feedback_to_clauses(
    feedback: &mut [FeedbackSign],
    response_error: i32,
    threshold: i32,
    loss_fn: LossFn,
    loss_fn_c1: f32,
    fgen: &mut FloatGen,
) {
    let p = regressor_feedback_probability(response_error, threshold, loss_fn, loss_fn_c1);
    let sign: FeedbackSign = if response_error > 0 {
        -1
    } else if response_error < 0 {
        1
    } else {
        0
    };
    for slot in feedback.iter_mut() {
        *slot = if sign != 0 && fgen.next() <= p { sign } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_sum_at_threshold_silences_target_feedback() {
        let mut feedback = vec![9i8; 4];
        let mut fgen = FloatGen::new(1);
        calculate_classifier_feedback_to_clauses(&mut feedback, 0, 1, 15, -15, 2, 15, &mut fgen);
        assert_eq!(&feedback[0..2], &[0, 0]);
    }

    #[test]
    fn opposite_sum_at_negative_threshold_silences_opposite_feedback() {
        let mut feedback = vec![9i8; 4];
        let mut fgen = FloatGen::new(1);
        calculate_classifier_feedback_to_clauses(&mut feedback, 0, 1, -15, -15, 2, 15, &mut fgen);
        assert_eq!(&feedback[2..4], &[0, 0]);
    }

    #[test]
    fn exact_prediction_draws_no_regressor_feedback() {
        let mut feedback = vec![9i8; 3];
        let mut fgen = FloatGen::new(2);
        calculate_regressor_feedback_to_clauses(&mut feedback, 0, 15, LossFn::Mse, 0.0, &mut fgen);
        assert_eq!(feedback, vec![0, 0, 0]);
    }

    #[test]
    fn overprediction_only_ever_emits_type_ii() {
        let mut feedback = vec![9i8; 50];
        let mut fgen = FloatGen::new(3);
        calculate_regressor_feedback_to_clauses(&mut feedback, 15, 15, LossFn::Mae, 0.0, &mut fgen);
        assert!(feedback.iter().all(|&s| s == -1 || s == 0));
    }

    #[test]
    fn mse_probability_is_quadratic_in_error() {
        let half = regressor_feedback_probability(8, 16, LossFn::Mse, 0.0);
        let full = regressor_feedback_probability(16, 16, LossFn::Mse, 0.0);
        assert!((half - 0.25).abs() < 1e-6);
        assert!((full - 1.0).abs() < 1e-6);
    }
}

//! The multiclass classifier estimator (C9/C11), classic and bitwise
//! variants, grounded on `original_source/lib/src/tsetlini.cpp`'s
//! `fit_classifier_online_impl` / `classifier_update_impl` /
//! `predict_impl`.

use super::validate;
use crate::container::BitRow;
use crate::error::{TsetlinError, TsetlinResult};
use crate::feedback::calculate_classifier_feedback_to_clauses;
use crate::kernel::{PARALLEL_CLAUSE_THRESHOLD, evaluate_range_bitwise, evaluate_range_classic};
use crate::params::Params;
use crate::rng::{FloatCache, FloatGen, IntGen};
use crate::state::{TaState, choose_width};
use crate::update::{update_range_bitwise, update_range_classic};
use crate::vote::{argmax_label, sum_all_label_votes, sum_label_votes};

/// A pool is only built when more than one worker is configured — below
/// that, C5/C8 always take the sequential path regardless of range size.
fn build_pool(n_jobs: i32) -> Option<rayon::ThreadPool> {
    (n_jobs > 1).then(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_jobs as usize)
            .build()
            .expect("thread pool builds")
    })
}

/// Shared orchestration for both representations; `bitwise` selects
/// which clause kernel and literal storage the instance uses — the
/// same "tagged width resolved once, not per sample" principle
/// applied here to representation. The classic and bitwise row types
/// differ structurally (`Vec<u8>` vs. packed [`BitRow`]), so the
/// fit/predict entry points are duplicated per representation rather
/// than branching on `bitwise` per call.
struct ClassifierCore {
    params: Params,
    state: TaState,
    igen: IntGen,
    fgen: FloatGen,
    bitwise: bool,
    /// Built once, alongside `igen`/`fgen`, and reused by every sample's
    /// C5 (clause-evaluation) and C8 (automata-update) fan-out instead
    /// of spinning a fresh OS thread pool per call.
    pool: Option<rayon::ThreadPool>,
}

impl ClassifierCore {
    fn new(json_params: &str, bitwise: bool) -> TsetlinResult<Self> {
        let params = Params::from_json(json_params)?;
        params.validate_classifier_clauses()?;
        if params.s < 1.05 {
            log::warn!(
                "s={} is very close to 1.0; the Type-I gate 1-1/s will fire on almost every draw",
                params.s
            );
        }
        let seed = params.random_state.expect("normalize() fills random_state");
        let pool = build_pool(params.n_jobs);
        Ok(Self {
            igen: IntGen::new(seed),
            fgen: FloatGen::new(seed),
            params,
            state: TaState::empty(),
            bitwise,
            pool,
        })
    }

    fn half(&self) -> usize {
        self.params.clauses as usize / 2
    }

    fn number_of_labels(&self) -> usize {
        self.params.number_of_labels.expect("set at fit time") as usize
    }

    fn number_of_features(&self) -> usize {
        self.params.number_of_features.expect("set at fit time") as usize
    }

    fn label_range(&self, label: usize) -> (usize, usize) {
        let per_label = self.params.clauses as usize;
        (label * per_label, label * per_label + per_label)
    }

    fn init_state(&mut self, number_of_features: usize, number_of_labels: usize) -> TsetlinResult<()> {
        self.params.number_of_features = Some(number_of_features as i32);
        self.params.number_of_labels = Some(number_of_labels as i32);
        let width = choose_width(self.params.counting_type, self.params.number_of_states)?;
        let total_clauses = number_of_labels * self.params.clauses as usize;
        self.state = TaState::init(
            total_clauses,
            number_of_features,
            width,
            self.bitwise,
            self.params.weighted,
            &mut self.igen,
        )?;
        Ok(())
    }

    fn check_partial_fit_labels(&self, y: &[i32]) -> TsetlinResult<()> {
        let max_label = y.iter().copied().max().unwrap_or(0) as usize;
        if max_label >= self.number_of_labels() {
            return Err(TsetlinError::ValueError(format!(
                "partial_fit called with a label {} beyond the {} labels seen at prior fit",
                max_label,
                self.number_of_labels()
            )));
        }
        Ok(())
    }

    fn fit_classic(&mut self, x: &[Vec<u8>], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        validate::check_x_y_classifier(x, y)?;
        let number_of_labels = ((y.iter().copied().max().unwrap_or(0) + 1) as usize).max(max_labels.unwrap_or(0));
        self.init_state(x[0].len(), number_of_labels)?;
        self.partial_fit_impl_classic(x, y, epochs)
    }

    /// `max_labels` only matters when this call ends up initializing
    /// state (delegated to `fit_classic`): the reference's
    /// `partial_fit_impl` ignores it once the classifier is already
    /// fitted, since `number_of_labels` is fixed at first fit.
    fn partial_fit_classic(&mut self, x: &[Vec<u8>], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        if !self.state.is_fitted() {
            return self.fit_classic(x, y, max_labels, epochs);
        }
        validate::check_x_y_classifier(x, y)?;
        if x[0].len() != self.number_of_features() {
            return Err(TsetlinError::ValueError(format!(
                "partial_fit called with X, which number of features {} does not match that from prior fit {}",
                x[0].len(),
                self.number_of_features()
            )));
        }
        self.check_partial_fit_labels(y)?;
        self.partial_fit_impl_classic(x, y, epochs)
    }

    fn partial_fit_impl_classic(&mut self, x: &[Vec<u8>], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        let half = self.half();
        let number_of_labels = self.number_of_labels();
        let number_of_features = self.number_of_features();
        let total_clauses = number_of_labels * self.params.clauses as usize;
        let tile = self.params.clause_output_tile_size as usize;
        let threshold = self.params.threshold;
        let s_inv = 1.0 / self.params.s;
        let boost = self.params.boost_true_positive_feedback;
        let max_weight = self.params.max_weight;

        let mut clause_output = vec![0u8; total_clauses];
        let mut feedback = vec![0i8; total_clauses];
        let mut fcache = FloatCache::new();
        let n = x.len();

        for epoch in 0..epochs {
            let opposite_y: Vec<i32> = y
                .iter()
                .map(|&label| {
                    let r = self.igen.next_below((number_of_labels - 1) as u32) as i32;
                    (label + 1 + r) % number_of_labels as i32
                })
                .collect();
            let order = self.igen.shuffled_indices(n);
            let mut vote_magnitude_sum = 0i64;
            let mut feedback_count = 0u64;

            for &i in &order {
                let sample = &x[i];
                let target = y[i] as usize;
                let opposite = opposite_y[i] as usize;
                let (t_begin, t_end) = self.label_range(target);
                let (o_begin, o_end) = self.label_range(opposite);

                for &(begin, end) in &[(t_begin, t_end), (o_begin, o_end)] {
                    evaluate_range_classic(
                        &self.state.counters,
                        begin,
                        end,
                        sample,
                        tile,
                        false,
                        self.pool.as_ref(),
                        &mut clause_output,
                    );
                }

                let target_sum = sum_label_votes(&clause_output, self.state.weights.as_deref(), target, half, threshold);
                let opposite_sum =
                    sum_label_votes(&clause_output, self.state.weights.as_deref(), opposite, half, threshold);
                vote_magnitude_sum += target_sum.unsigned_abs() as i64;

                calculate_classifier_feedback_to_clauses(
                    &mut feedback,
                    target,
                    opposite,
                    target_sum,
                    opposite_sum,
                    half,
                    threshold,
                    &mut self.fgen,
                );

                for &(begin, end) in &[(t_begin, t_end), (o_begin, o_end)] {
                    feedback_count += update_range_classic(
                        &mut self.state,
                        begin,
                        end,
                        &feedback,
                        &clause_output,
                        sample,
                        number_of_features,
                        self.params.number_of_states,
                        s_inv,
                        boost,
                        max_weight,
                        &mut self.fgen,
                        &mut fcache,
                        PARALLEL_CLAUSE_THRESHOLD,
                        self.pool.as_ref(),
                    );
                }
            }

            if self.params.verbose {
                log::debug!(
                    "epoch {epoch}/{epochs}: mean |target vote| {:.2}, {feedback_count} clauses reinforced over {n} samples",
                    vote_magnitude_sum as f64 / n.max(1) as f64
                );
            }
        }
        Ok(())
    }

    fn decision_function_classic(&self, x: &[Vec<u8>]) -> TsetlinResult<Vec<Vec<i32>>> {
        validate::check_for_predict(x, self.state.is_fitted(), self.number_of_features())?;
        let half = self.half();
        let number_of_labels = self.number_of_labels();
        let total_clauses = number_of_labels * self.params.clauses as usize;
        let tile = self.params.clause_output_tile_size as usize;
        let threshold = self.params.threshold;

        let mut out = Vec::with_capacity(x.len());
        let mut clause_output = vec![0u8; total_clauses];
        for sample in x {
            evaluate_range_classic(
                &self.state.counters,
                0,
                total_clauses,
                sample,
                tile,
                true,
                self.pool.as_ref(),
                &mut clause_output,
            );
            out.push(sum_all_label_votes(
                &clause_output,
                self.state.weights.as_deref(),
                number_of_labels,
                half,
                threshold,
            ));
        }
        Ok(out)
    }

    fn fit_bitwise(&mut self, x: &[BitRow], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        validate::check_x_y_classifier_bitwise(x, y)?;
        let number_of_labels = ((y.iter().copied().max().unwrap_or(0) + 1) as usize).max(max_labels.unwrap_or(0));
        self.init_state(x[0].cols(), number_of_labels)?;
        self.partial_fit_impl_bitwise(x, y, epochs)
    }

    /// `max_labels` only matters when this call ends up initializing
    /// state (delegated to `fit_bitwise`); see [`Self::partial_fit_classic`].
    fn partial_fit_bitwise(&mut self, x: &[BitRow], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        if !self.state.is_fitted() {
            return self.fit_bitwise(x, y, max_labels, epochs);
        }
        validate::check_x_y_classifier_bitwise(x, y)?;
        if x[0].cols() != self.number_of_features() {
            return Err(TsetlinError::ValueError(format!(
                "partial_fit called with X, which number of features {} does not match that from prior fit {}",
                x[0].cols(),
                self.number_of_features()
            )));
        }
        self.check_partial_fit_labels(y)?;
        self.partial_fit_impl_bitwise(x, y, epochs)
    }

    fn partial_fit_impl_bitwise(&mut self, x: &[BitRow], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        let half = self.half();
        let number_of_labels = self.number_of_labels();
        let number_of_features = self.number_of_features();
        let total_clauses = number_of_labels * self.params.clauses as usize;
        let tile_size = self.params.clause_output_tile_size;
        let threshold = self.params.threshold;
        let s_inv = 1.0 / self.params.s;
        let boost = self.params.boost_true_positive_feedback;
        let max_weight = self.params.max_weight;

        let mut clause_output = vec![0u8; total_clauses];
        let mut feedback = vec![0i8; total_clauses];
        let mut fcache = FloatCache::new();
        let n = x.len();

        for epoch in 0..epochs {
            let opposite_y: Vec<i32> = y
                .iter()
                .map(|&label| {
                    let r = self.igen.next_below((number_of_labels - 1) as u32) as i32;
                    (label + 1 + r) % number_of_labels as i32
                })
                .collect();
            let order = self.igen.shuffled_indices(n);
            let mut vote_magnitude_sum = 0i64;
            let mut feedback_count = 0u64;

            for &i in &order {
                let sample = &x[i];
                let target = y[i] as usize;
                let opposite = opposite_y[i] as usize;
                let (t_begin, t_end) = self.label_range(target);
                let (o_begin, o_end) = self.label_range(opposite);

                for &(begin, end) in &[(t_begin, t_end), (o_begin, o_end)] {
                    evaluate_range_bitwise(
                        self.state.signs.as_ref().expect("bitwise state carries signs"),
                        begin,
                        end,
                        sample.blocks(),
                        tile_size,
                        false,
                        self.pool.as_ref(),
                        &mut clause_output,
                    );
                }

                let target_sum = sum_label_votes(&clause_output, self.state.weights.as_deref(), target, half, threshold);
                let opposite_sum =
                    sum_label_votes(&clause_output, self.state.weights.as_deref(), opposite, half, threshold);
                vote_magnitude_sum += target_sum.unsigned_abs() as i64;

                calculate_classifier_feedback_to_clauses(
                    &mut feedback,
                    target,
                    opposite,
                    target_sum,
                    opposite_sum,
                    half,
                    threshold,
                    &mut self.fgen,
                );

                for &(begin, end) in &[(t_begin, t_end), (o_begin, o_end)] {
                    feedback_count += update_range_bitwise(
                        &mut self.state,
                        begin,
                        end,
                        &feedback,
                        &clause_output,
                        sample.blocks(),
                        number_of_features,
                        self.params.number_of_states,
                        s_inv,
                        boost,
                        max_weight,
                        &mut self.fgen,
                        &mut fcache,
                        PARALLEL_CLAUSE_THRESHOLD,
                        self.pool.as_ref(),
                    );
                }
            }

            if self.params.verbose {
                log::debug!(
                    "epoch {epoch}/{epochs}: mean |target vote| {:.2}, {feedback_count} clauses reinforced over {n} samples",
                    vote_magnitude_sum as f64 / n.max(1) as f64
                );
            }
        }
        Ok(())
    }

    fn decision_function_bitwise(&self, x: &[BitRow]) -> TsetlinResult<Vec<Vec<i32>>> {
        validate::check_for_predict_bitwise(x, self.state.is_fitted(), self.number_of_features())?;
        let half = self.half();
        let number_of_labels = self.number_of_labels();
        let total_clauses = number_of_labels * self.params.clauses as usize;
        let tile_size = self.params.clause_output_tile_size;
        let threshold = self.params.threshold;

        let mut out = Vec::with_capacity(x.len());
        let mut clause_output = vec![0u8; total_clauses];
        for sample in x {
            evaluate_range_bitwise(
                self.state.signs.as_ref().expect("bitwise state carries signs"),
                0,
                total_clauses,
                sample.blocks(),
                tile_size,
                true,
                self.pool.as_ref(),
                &mut clause_output,
            );
            out.push(sum_all_label_votes(
                &clause_output,
                self.state.weights.as_deref(),
                number_of_labels,
                half,
                threshold,
            ));
        }
        Ok(out)
    }
}

pub struct ClassifierClassic {
    core: ClassifierCore,
}

impl ClassifierClassic {
    pub fn new(json_params: &str) -> TsetlinResult<Self> {
        Ok(Self {
            core: ClassifierCore::new(json_params, false)?,
        })
    }

    /// `max_labels`, if given, pre-registers a label space at least that
    /// large even if it is not fully observed in `y`.
    pub fn fit(&mut self, x: &[Vec<u8>], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        self.core.fit_classic(x, y, max_labels, epochs)
    }

    pub fn partial_fit(&mut self, x: &[Vec<u8>], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        self.core.partial_fit_classic(x, y, max_labels, epochs)
    }

    pub fn predict(&self, x: &[Vec<u8>]) -> TsetlinResult<Vec<i32>> {
        let scores = self.core.decision_function_classic(x)?;
        Ok(scores.iter().map(|row| argmax_label(row) as i32).collect())
    }

    pub fn decision_function(&self, x: &[Vec<u8>]) -> TsetlinResult<Vec<Vec<i32>>> {
        self.core.decision_function_classic(x)
    }

    /// Fraction of `x` whose prediction matches the paired label in
    /// `y`, in `[0, 1]`.
    pub fn evaluate(&self, x: &[Vec<u8>], y: &[i32]) -> TsetlinResult<f32> {
        if x.len() != y.len() {
            return Err(TsetlinError::ValueError(format!(
                "X and y must have the same number of rows, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        let preds = self.predict(x)?;
        let correct = preds.iter().zip(y).filter(|(p, t)| *p == *t).count();
        Ok(correct as f32 / x.len() as f32)
    }

    pub fn is_fitted(&self) -> bool {
        self.core.state.is_fitted()
    }

    pub fn read_params(&self) -> &Params {
        &self.core.params
    }

    pub fn state(&self) -> &TaState {
        &self.core.state
    }

    pub fn to_json(&self) -> TsetlinResult<String> {
        crate::serialize::to_json(&self.core.params, &self.core.state, &self.core.igen, &self.core.fgen)
    }

    pub fn from_json(json: &str) -> TsetlinResult<Self> {
        let (params, state, igen, fgen) = crate::serialize::from_json(json, false)?;
        let pool = build_pool(params.n_jobs);
        Ok(Self {
            core: ClassifierCore {
                params,
                state,
                igen,
                fgen,
                bitwise: false,
                pool,
            },
        })
    }
}

/// Classifier over the bitwise literal representation: `fit`/
/// `partial_fit`/`predict` take packed [`BitRow`]s rather than
/// byte-per-feature rows, so a row whose padding bits are set beyond
/// its declared feature count is rejected at the boundary instead of
/// silently re-packed away.
pub struct ClassifierBitwise {
    core: ClassifierCore,
}

impl ClassifierBitwise {
    pub fn new(json_params: &str) -> TsetlinResult<Self> {
        Ok(Self {
            core: ClassifierCore::new(json_params, true)?,
        })
    }

    pub fn fit(&mut self, x: &[BitRow], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        self.core.fit_bitwise(x, y, max_labels, epochs)
    }

    pub fn partial_fit(&mut self, x: &[BitRow], y: &[i32], max_labels: Option<usize>, epochs: u32) -> TsetlinResult<()> {
        self.core.partial_fit_bitwise(x, y, max_labels, epochs)
    }

    pub fn predict(&self, x: &[BitRow]) -> TsetlinResult<Vec<i32>> {
        let scores = self.core.decision_function_bitwise(x)?;
        Ok(scores.iter().map(|row| argmax_label(row) as i32).collect())
    }

    pub fn decision_function(&self, x: &[BitRow]) -> TsetlinResult<Vec<Vec<i32>>> {
        self.core.decision_function_bitwise(x)
    }

    /// Fraction of `x` whose prediction matches the paired label in
    /// `y`, in `[0, 1]`.
    pub fn evaluate(&self, x: &[BitRow], y: &[i32]) -> TsetlinResult<f32> {
        if x.len() != y.len() {
            return Err(TsetlinError::ValueError(format!(
                "X and y must have the same number of rows, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        let preds = self.predict(x)?;
        let correct = preds.iter().zip(y).filter(|(p, t)| *p == *t).count();
        Ok(correct as f32 / x.len() as f32)
    }

    pub fn is_fitted(&self) -> bool {
        self.core.state.is_fitted()
    }

    pub fn read_params(&self) -> &Params {
        &self.core.params
    }

    pub fn state(&self) -> &TaState {
        &self.core.state
    }

    pub fn to_json(&self) -> TsetlinResult<String> {
        crate::serialize::to_json(&self.core.params, &self.core.state, &self.core.igen, &self.core.fgen)
    }

    pub fn from_json(json: &str) -> TsetlinResult<Self> {
        let (params, state, igen, fgen) = crate::serialize::from_json(json, true)?;
        let pool = build_pool(params.n_jobs);
        Ok(Self {
            core: ClassifierCore {
                params,
                state,
                igen,
                fgen,
                bitwise: true,
                pool,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_dataset() -> (Vec<Vec<u8>>, Vec<i32>) {
        let x = vec![
            vec![0, 0],
            vec![0, 1],
            vec![1, 0],
            vec![1, 1],
        ];
        let y = vec![0, 1, 1, 0];
        (x, y)
    }

    #[test]
    fn classic_classifier_learns_xor_above_chance() {
        let (x, y) = xor_dataset();
        let mut clf = ClassifierClassic::new(r#"{"clauses_per_label": 8, "threshold": 5, "s": 3.0, "random_state": 42}"#).unwrap();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for _ in 0..50 {
            xs.extend(x.iter().cloned());
            ys.extend(y.iter().copied());
        }
        clf.fit(&xs, &ys, None, 50).unwrap();
        let preds = clf.predict(&x).unwrap();
        let correct = preds.iter().zip(&y).filter(|(a, b)| *a == *b).count();
        assert!(correct >= 3, "expected at least 3/4 correct, got {correct}");
    }

    #[test]
    fn bitwise_classifier_learns_xor_above_chance() {
        let (x, y) = xor_dataset();
        let rows: Vec<BitRow> = x.iter().map(|row| BitRow::from_bits(row).unwrap()).collect();
        let mut clf = ClassifierBitwise::new(r#"{"clauses_per_label": 8, "threshold": 5, "s": 3.0, "random_state": 42}"#).unwrap();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for _ in 0..50 {
            xs.extend(rows.iter().cloned());
            ys.extend(y.iter().copied());
        }
        clf.fit(&xs, &ys, None, 50).unwrap();
        let preds = clf.predict(&rows).unwrap();
        let correct = preds.iter().zip(&y).filter(|(a, b)| *a == *b).count();
        assert!(correct >= 3, "expected at least 3/4 correct, got {correct}");
    }

    #[test]
    fn predict_before_fit_is_not_fitted_error() {
        let clf = ClassifierClassic::new("{}").unwrap();
        let err = clf.predict(&[vec![0, 1]]).unwrap_err();
        assert_eq!(err.code(), "NOT_FITTED_ERROR");
    }

    #[test]
    fn partial_fit_rejects_unseen_label() {
        let (x, y) = xor_dataset();
        let mut clf = ClassifierClassic::new(r#"{"clauses_per_label": 4, "random_state": 1}"#).unwrap();
        clf.fit(&x, &y, None, 1).unwrap();
        let err = clf.partial_fit(&x, &[0, 1, 1, 5], None, 1).unwrap_err();
        assert_eq!(err.code(), "VALUE_ERROR");
    }

    #[test]
    fn bitwise_fit_rejects_row_with_set_bit_beyond_feature_count() {
        let good = BitRow::from_bits(&[0, 1]).unwrap();
        let bad = BitRow::new(2, vec![0b0000_0100]); // bit 2 set, cols=2
        let mut clf = ClassifierBitwise::new(r#"{"clauses_per_label": 4, "random_state": 1}"#).unwrap();
        let err = clf.fit(&[good, bad], &[0, 1], None, 1).unwrap_err();
        assert_eq!(err.code(), "VALUE_ERROR");
    }
}

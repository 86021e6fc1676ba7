//! The scalar regressor estimator (C9/C11), classic and bitwise
//! variants, grounded on `original_source/lib/src/tsetlini.cpp`'s
//! `regressor_update_impl` / `predict_impl`. Unlike the classifier, all
//! clauses share a single polarity and vote are driven by the signed
//! prediction error rather than a target/opposite label pair.

use super::validate;
use crate::container::BitRow;
use crate::error::{TsetlinError, TsetlinResult};
use crate::feedback::calculate_regressor_feedback_to_clauses;
use crate::kernel::{PARALLEL_CLAUSE_THRESHOLD, evaluate_range_bitwise, evaluate_range_classic};
use crate::params::Params;
use crate::rng::{FloatCache, FloatGen, IntGen};
use crate::state::{TaState, choose_width};
use crate::update::{update_range_bitwise, update_range_classic};
use crate::vote::sum_regressor_votes;

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

/// Row types differ structurally between representations (`Vec<u8>`
/// vs. packed [`BitRow`]), so — as in [`super::classifier`] — the
/// fit/predict entry points are duplicated per representation rather
/// than branching on `bitwise` per call.
struct RegressorCore {
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

impl RegressorCore {
    fn new(json_params: &str, bitwise: bool) -> TsetlinResult<Self> {
        let params = Params::from_json_regressor(json_params)?;
        params.validate_regressor_clauses()?;
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

    fn number_of_clauses(&self) -> usize {
        self.params.clauses as usize
    }

    fn number_of_features(&self) -> usize {
        self.params.number_of_features.expect("set at fit time") as usize
    }

    fn init_state(&mut self, number_of_features: usize) -> TsetlinResult<()> {
        self.params.number_of_features = Some(number_of_features as i32);
        let width = choose_width(self.params.counting_type, self.params.number_of_states)?;
        let total_clauses = self.number_of_clauses();
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

    fn fit_classic(&mut self, x: &[Vec<u8>], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        validate::check_x_y_regressor(x, y, self.params.threshold)?;
        self.init_state(x[0].len())?;
        self.partial_fit_impl_classic(x, y, epochs)
    }

    fn partial_fit_classic(&mut self, x: &[Vec<u8>], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        if !self.state.is_fitted() {
            return self.fit_classic(x, y, epochs);
        }
        validate::check_x_y_regressor(x, y, self.params.threshold)?;
        if x[0].len() != self.number_of_features() {
            return Err(TsetlinError::ValueError(format!(
                "partial_fit called with X, which number of features {} does not match that from prior fit {}",
                x[0].len(),
                self.number_of_features()
            )));
        }
        self.partial_fit_impl_classic(x, y, epochs)
    }

    fn partial_fit_impl_classic(&mut self, x: &[Vec<u8>], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        let number_of_features = self.number_of_features();
        let total_clauses = self.number_of_clauses();
        let tile = self.params.clause_output_tile_size as usize;
        let threshold = self.params.threshold;
        let s_inv = 1.0 / self.params.s;
        let boost = self.params.boost_true_positive_feedback;
        let max_weight = self.params.max_weight;
        let loss_fn = self.params.loss_fn;
        let loss_fn_c1 = self.params.loss_fn_c1;

        let mut clause_output = vec![0u8; total_clauses];
        let mut feedback = vec![0i8; total_clauses];
        let mut fcache = FloatCache::new();
        let n = x.len();

        for epoch in 0..epochs {
            let order = self.igen.shuffled_indices(n);
            let mut error_magnitude_sum = 0i64;
            let mut feedback_count = 0u64;

            for &i in &order {
                let sample = &x[i];
                let target_response = y[i];

                evaluate_range_classic(
                    &self.state.counters,
                    0,
                    total_clauses,
                    sample,
                    tile,
                    false,
                    self.pool.as_ref(),
                    &mut clause_output,
                );

                let votes = sum_regressor_votes(&clause_output, self.state.weights.as_deref(), threshold);
                let response_error = votes - target_response;
                error_magnitude_sum += response_error.unsigned_abs() as i64;

                calculate_regressor_feedback_to_clauses(
                    &mut feedback,
                    response_error,
                    threshold,
                    loss_fn,
                    loss_fn_c1,
                    &mut self.fgen,
                );

                feedback_count += update_range_classic(
                    &mut self.state,
                    0,
                    total_clauses,
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

            if self.params.verbose {
                log::debug!(
                    "epoch {epoch}/{epochs}: mean |response error| {:.2}, {feedback_count} clauses reinforced over {n} samples",
                    error_magnitude_sum as f64 / n.max(1) as f64
                );
            }
        }
        Ok(())
    }

    fn decision_function_classic(&self, x: &[Vec<u8>]) -> TsetlinResult<Vec<i32>> {
        validate::check_for_predict(x, self.state.is_fitted(), self.number_of_features())?;
        let total_clauses = self.number_of_clauses();
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
            out.push(sum_regressor_votes(&clause_output, self.state.weights.as_deref(), threshold));
        }
        Ok(out)
    }

    fn fit_bitwise(&mut self, x: &[BitRow], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        validate::check_x_y_regressor_bitwise(x, y, self.params.threshold)?;
        self.init_state(x[0].cols())?;
        self.partial_fit_impl_bitwise(x, y, epochs)
    }

    fn partial_fit_bitwise(&mut self, x: &[BitRow], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        if !self.state.is_fitted() {
            return self.fit_bitwise(x, y, epochs);
        }
        validate::check_x_y_regressor_bitwise(x, y, self.params.threshold)?;
        if x[0].cols() != self.number_of_features() {
            return Err(TsetlinError::ValueError(format!(
                "partial_fit called with X, which number of features {} does not match that from prior fit {}",
                x[0].cols(),
                self.number_of_features()
            )));
        }
        self.partial_fit_impl_bitwise(x, y, epochs)
    }

    fn partial_fit_impl_bitwise(&mut self, x: &[BitRow], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        let number_of_features = self.number_of_features();
        let total_clauses = self.number_of_clauses();
        let tile_size = self.params.clause_output_tile_size;
        let threshold = self.params.threshold;
        let s_inv = 1.0 / self.params.s;
        let boost = self.params.boost_true_positive_feedback;
        let max_weight = self.params.max_weight;
        let loss_fn = self.params.loss_fn;
        let loss_fn_c1 = self.params.loss_fn_c1;

        let mut clause_output = vec![0u8; total_clauses];
        let mut feedback = vec![0i8; total_clauses];
        let mut fcache = FloatCache::new();
        let n = x.len();

        for epoch in 0..epochs {
            let order = self.igen.shuffled_indices(n);
            let mut error_magnitude_sum = 0i64;
            let mut feedback_count = 0u64;

            for &i in &order {
                let sample = &x[i];
                let target_response = y[i];

                evaluate_range_bitwise(
                    self.state.signs.as_ref().expect("bitwise state carries signs"),
                    0,
                    total_clauses,
                    sample.blocks(),
                    tile_size,
                    false,
                    self.pool.as_ref(),
                    &mut clause_output,
                );

                let votes = sum_regressor_votes(&clause_output, self.state.weights.as_deref(), threshold);
                let response_error = votes - target_response;
                error_magnitude_sum += response_error.unsigned_abs() as i64;

                calculate_regressor_feedback_to_clauses(
                    &mut feedback,
                    response_error,
                    threshold,
                    loss_fn,
                    loss_fn_c1,
                    &mut self.fgen,
                );

                feedback_count += update_range_bitwise(
                    &mut self.state,
                    0,
                    total_clauses,
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

            if self.params.verbose {
                log::debug!(
                    "epoch {epoch}/{epochs}: mean |response error| {:.2}, {feedback_count} clauses reinforced over {n} samples",
                    error_magnitude_sum as f64 / n.max(1) as f64
                );
            }
        }
        Ok(())
    }

    fn decision_function_bitwise(&self, x: &[BitRow]) -> TsetlinResult<Vec<i32>> {
        validate::check_for_predict_bitwise(x, self.state.is_fitted(), self.number_of_features())?;
        let total_clauses = self.number_of_clauses();
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
            out.push(sum_regressor_votes(&clause_output, self.state.weights.as_deref(), threshold));
        }
        Ok(out)
    }
}

pub struct RegressorClassic {
    core: RegressorCore,
}

impl RegressorClassic {
    pub fn new(json_params: &str) -> TsetlinResult<Self> {
        Ok(Self {
            core: RegressorCore::new(json_params, false)?,
        })
    }

    pub fn fit(&mut self, x: &[Vec<u8>], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        self.core.fit_classic(x, y, epochs)
    }

    pub fn partial_fit(&mut self, x: &[Vec<u8>], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        self.core.partial_fit_classic(x, y, epochs)
    }

    pub fn predict(&self, x: &[Vec<u8>]) -> TsetlinResult<Vec<i32>> {
        self.core.decision_function_classic(x)
    }

    /// The regressor has no single accuracy scalar — RMSD
    /// semantics are left to the caller. `evaluate` returns the
    /// raw predictions, and the caller derives whatever error
    /// metric fits their loss.
    pub fn evaluate(&self, x: &[Vec<u8>]) -> TsetlinResult<Vec<i32>> {
        self.core.decision_function_classic(x)
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
            core: RegressorCore {
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

/// Regressor over the bitwise literal representation: `fit`/
/// `partial_fit`/`predict` take packed [`BitRow`]s, with the same
/// bit-padding guard `ClassifierBitwise` enforces.
pub struct RegressorBitwise {
    core: RegressorCore,
}

impl RegressorBitwise {
    pub fn new(json_params: &str) -> TsetlinResult<Self> {
        Ok(Self {
            core: RegressorCore::new(json_params, true)?,
        })
    }

    pub fn fit(&mut self, x: &[BitRow], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        self.core.fit_bitwise(x, y, epochs)
    }

    pub fn partial_fit(&mut self, x: &[BitRow], y: &[i32], epochs: u32) -> TsetlinResult<()> {
        self.core.partial_fit_bitwise(x, y, epochs)
    }

    pub fn predict(&self, x: &[BitRow]) -> TsetlinResult<Vec<i32>> {
        self.core.decision_function_bitwise(x)
    }

    /// The regressor has no single accuracy scalar — RMSD
    /// semantics are left to the caller. `evaluate` returns the
    /// raw predictions, and the caller derives whatever error
    /// metric fits their loss.
    pub fn evaluate(&self, x: &[BitRow]) -> TsetlinResult<Vec<i32>> {
        self.core.decision_function_bitwise(x)
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
            core: RegressorCore {
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

    #[test]
    fn regressor_predictions_stay_within_response_range() {
        let x = vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]];
        let y = vec![0, 5, 5, 10];
        let mut reg = RegressorClassic::new(r#"{"clauses": 20, "threshold": 10, "s": 3.0, "random_state": 9}"#).unwrap();
        reg.fit(&x, &y, 30).unwrap();
        let preds = reg.predict(&x).unwrap();
        assert!(preds.iter().all(|&p| (0..=10).contains(&p)));
    }

    #[test]
    fn bitwise_regressor_predicts_without_panicking() {
        let x = vec![vec![1, 0, 1], vec![0, 1, 0]];
        let y = vec![3, 7];
        let rows: Vec<BitRow> = x.iter().map(|row| BitRow::from_bits(row).unwrap()).collect();
        let mut reg = RegressorBitwise::new(r#"{"clauses": 8, "threshold": 10, "random_state": 3}"#).unwrap();
        reg.fit(&rows, &y, 5).unwrap();
        assert_eq!(reg.predict(&rows).unwrap().len(), 2);
    }

    #[test]
    fn bitwise_fit_rejects_row_with_set_bit_beyond_feature_count() {
        let good = BitRow::from_bits(&[1, 0]).unwrap();
        let bad = BitRow::new(2, vec![0b0000_0100]); // bit 2 set, cols=2
        let mut reg = RegressorBitwise::new(r#"{"clauses": 4, "threshold": 10, "random_state": 1}"#).unwrap();
        let err = reg.fit(&[good, bad], &[1, 2], 1).unwrap_err();
        assert_eq!(err.code(), "VALUE_ERROR");
    }
}

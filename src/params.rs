//! The parameter store (C3): a named, typed hyperparameter bag with
//! schema validation, defaults, and normalization, grounded on
//! `original_source/lib/src/tsetlini_params.cpp`.

use crate::error::{TsetlinError, TsetlinResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountingType {
    Auto,
    I8,
    I16,
    I32,
}

impl CountingType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "int8" => Some(Self::I8),
            "int16" => Some(Self::I16),
            "int32" => Some(Self::I32),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossFn {
    Mse,
    Mae,
    L1,
    L2,
    L1Plus2,
    BerHu,
}

impl LossFn {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "MSE" => Some(Self::Mse),
            "MAE" => Some(Self::Mae),
            "L1" => Some(Self::L1),
            "L2" => Some(Self::L2),
            "L1+2" => Some(Self::L1Plus2),
            "berHu" => Some(Self::BerHu),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Mse => "MSE",
            Self::Mae => "MAE",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L1Plus2 => "L1+2",
            Self::BerHu => "berHu",
        }
    }
}

const VALID_TILE_SIZES: [u32; 4] = [16, 32, 64, 128];

/// The full hyperparameter bag, shared by classifier and regressor
/// variants; fields that only apply to one estimator kind are simply
/// unused by the other (mirroring the reference's single `params_t`
/// map shared by both estimator families).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub number_of_states: i32,
    pub threshold: i32,
    pub s: f32,
    /// classifier: clauses per label (must be divisible by 4).
    /// regressor: total clauses (must be divisible by 2).
    pub clauses: i32,
    pub boost_true_positive_feedback: bool,
    pub weighted: bool,
    pub max_weight: i32,
    pub clause_output_tile_size: u32,
    pub n_jobs: i32,
    pub counting_type: CountingType,
    pub random_state: Option<u32>,
    pub loss_fn: LossFn,
    pub loss_fn_c1: f32,
    pub verbose: bool,
    /// Set once, at first fit; `None` before then.
    pub number_of_labels: Option<i32>,
    pub number_of_features: Option<i32>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            number_of_states: 100,
            threshold: 15,
            s: 2.0,
            clauses: 12,
            boost_true_positive_feedback: false,
            weighted: false,
            max_weight: i32::MAX,
            clause_output_tile_size: 16,
            n_jobs: -1,
            counting_type: CountingType::Auto,
            random_state: None,
            loss_fn: LossFn::Mse,
            loss_fn_c1: 0.0,
            verbose: false,
            number_of_labels: None,
            number_of_features: None,
        }
    }
}

impl Params {
    /// `default_regressor_params` in the reference sets `weighted=true`
    /// where `default_classifier_params` sets it `false`, so the two
    /// estimator families merge user overrides onto different base
    /// defaults rather than sharing one.
    pub fn regressor_default() -> Self {
        Self {
            weighted: true,
            ..Self::default()
        }
    }

    /// Merge a JSON object over the defaults, reject unknown keys and
    /// type mismatches (`BAD_JSON`), then validate and normalize
    /// (`VALUE_ERROR`). Mirrors `json_to_params` + `normalize_*` +
    /// `assert_*` in the reference.
    pub fn from_json(json_params: &str) -> TsetlinResult<Self> {
        let value: Value = serde_json::from_str(json_params)
            .map_err(|e| TsetlinError::BadJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Same as [`Self::from_json`], merging over [`Self::regressor_default`]
    /// instead of the classifier base.
    pub fn from_json_regressor(json_params: &str) -> TsetlinResult<Self> {
        let value: Value = serde_json::from_str(json_params)
            .map_err(|e| TsetlinError::BadJson(e.to_string()))?;
        Self::from_value_over(&value, Self::regressor_default())
    }

    pub fn from_value(value: &Value) -> TsetlinResult<Self> {
        Self::from_value_over(value, Self::default())
    }

    fn from_value_over(value: &Value, base: Self) -> TsetlinResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TsetlinError::BadJson("passed json is not a dictionary".to_string()))?;

        let mut params = base;
        for (key, val) in object {
            apply_field(&mut params, key, val)?;
        }
        params.normalize();
        params.validate()?;
        Ok(params)
    }

    /// `n_jobs == -1` resolves to `max(1, hardware_concurrency)`;
    /// `random_state` unset draws from OS entropy.
    fn normalize(&mut self) {
        if self.n_jobs == -1 {
            self.n_jobs = num_cpus::get().max(1) as i32;
        }
        if self.random_state.is_none() {
            self.random_state = Some(crate::rng::seed_from_os_entropy());
        }
    }

    pub fn validate(&self) -> TsetlinResult<()> {
        if !(self.n_jobs == -1 || self.n_jobs >= 1) {
            return Err(TsetlinError::ValueError(format!(
                "param 'n_jobs' got value {}, instead of -1 or a value >= 1",
                self.n_jobs
            )));
        }
        if self.s < 1.0 {
            return Err(TsetlinError::ValueError(format!(
                "param 's' got value {}, instead of a value >= 1.0",
                self.s
            )));
        }
        if self.threshold < 1 {
            return Err(TsetlinError::ValueError(format!(
                "param 'threshold' got value {}, instead of a natural integer",
                self.threshold
            )));
        }
        if self.number_of_states < 1 {
            return Err(TsetlinError::ValueError(format!(
                "param 'number_of_states' got value {}, instead of a natural integer",
                self.number_of_states
            )));
        }
        if self.max_weight < 1 {
            return Err(TsetlinError::ValueError(format!(
                "param 'max_weight' got value {}, instead of a natural integer",
                self.max_weight
            )));
        }
        if !VALID_TILE_SIZES.contains(&self.clause_output_tile_size) {
            return Err(TsetlinError::ValueError(format!(
                "param 'clause_output_tile_size' got value {}, instead of one of 16, 32, 64, 128",
                self.clause_output_tile_size
            )));
        }
        Ok(())
    }

    /// Classifier-specific check: clauses per label divisible by 4 and
    /// at least 4 (one positive/negative clause pair per polarity,
    /// doubled for the tile-width-4 kernel).
    pub fn validate_classifier_clauses(&self) -> TsetlinResult<()> {
        if self.clauses < 1 || self.clauses % 4 != 0 {
            return Err(TsetlinError::ValueError(format!(
                "param 'clauses_per_label' got value {}, instead of a natural integer divisible by 4",
                self.clauses
            )));
        }
        Ok(())
    }

    /// Regressor-specific check: total clauses divisible by 2, minimum
    /// legal value `2`.
    pub fn validate_regressor_clauses(&self) -> TsetlinResult<()> {
        if self.clauses < 1 || self.clauses % 2 != 0 {
            return Err(TsetlinError::ValueError(format!(
                "param 'clauses' got value {}, instead of a natural integer divisible by 2",
                self.clauses
            )));
        }
        Ok(())
    }
}

fn apply_field(params: &mut Params, key: &str, val: &Value) -> TsetlinResult<()> {
    let bad = |msg: String| TsetlinError::BadJson(msg);
    match key {
        "number_of_states" => params.number_of_states = as_i32(key, val)?,
        "threshold" => params.threshold = as_i32(key, val)?,
        "clauses" | "clauses_per_label" => params.clauses = as_i32(key, val)?,
        "boost_true_positive_feedback" => params.boost_true_positive_feedback = as_bool(key, val)?,
        "weighted" => params.weighted = as_bool(key, val)?,
        "max_weight" => params.max_weight = as_i32(key, val)?,
        "clause_output_tile_size" => params.clause_output_tile_size = as_i32(key, val)? as u32,
        "n_jobs" => params.n_jobs = as_i32(key, val)?,
        "s" => params.s = as_f32(key, val)?,
        "loss_fn_c1" => params.loss_fn_c1 = as_f32(key, val)?,
        "verbose" => params.verbose = as_bool(key, val)?,
        "counting_type" => {
            let s = as_str(key, val)?;
            params.counting_type = CountingType::parse(s)
                .ok_or_else(|| bad(format!("unknown counting_type '{s}'")))?;
        }
        "loss_fn" => {
            let s = as_str(key, val)?;
            params.loss_fn =
                LossFn::parse(s).ok_or_else(|| bad(format!("unknown loss_fn '{s}'")))?;
        }
        "random_state" => {
            if val.is_null() {
                params.random_state = None;
            } else {
                params.random_state = Some(
                    val.as_u64()
                        .ok_or_else(|| bad("random_state must be an unsigned integer".to_string()))?
                        as u32,
                );
            }
        }
        _ => return Err(bad(format!("unknown key [{key}] in config"))),
    }
    Ok(())
}

fn as_i32(key: &str, val: &Value) -> TsetlinResult<i32> {
    val.as_i64()
        .map(|v| v as i32)
        .ok_or_else(|| TsetlinError::BadJson(format!("param '{key}' must be an integer")))
}

fn as_f32(key: &str, val: &Value) -> TsetlinResult<f32> {
    val.as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| TsetlinError::BadJson(format!("param '{key}' must be a number")))
}

fn as_bool(key: &str, val: &Value) -> TsetlinResult<bool> {
    val.as_bool()
        .ok_or_else(|| TsetlinError::BadJson(format!("param '{key}' must be a boolean")))
}

fn as_str(key: &str, val: &Value) -> TsetlinResult<&str> {
    val.as_str()
        .ok_or_else(|| TsetlinError::BadJson(format!("param '{key}' must be a string")))
}

impl CountingType {
    pub fn as_json(&self) -> &'static str {
        self.as_str()
    }
}

impl LossFn {
    pub fn as_json(&self) -> &'static str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let p = Params::default();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_key() {
        let err = Params::from_json(r#"{"bogus": 1}"#).unwrap_err();
        assert_eq!(err.code(), "BAD_JSON");
    }

    #[test]
    fn rejects_s_below_one() {
        let err = Params::from_json(r#"{"s": 0.5}"#).unwrap_err();
        assert_eq!(err.code(), "VALUE_ERROR");
    }

    #[test]
    fn n_jobs_auto_resolves_to_concrete_count() {
        let p = Params::from_json(r#"{"n_jobs": -1}"#).unwrap();
        assert!(p.n_jobs >= 1);
    }

    #[test]
    fn random_state_unset_gets_filled() {
        let p = Params::from_json("{}").unwrap();
        assert!(p.random_state.is_some());
    }

    #[test]
    fn classifier_clauses_must_divide_by_four() {
        let mut p = Params::default();
        p.clauses = 10;
        assert!(p.validate_classifier_clauses().is_err());
        p.clauses = 4;
        assert!(p.validate_classifier_clauses().is_ok());
    }

    #[test]
    fn regressor_default_is_weighted_classifier_default_is_not() {
        assert!(!Params::default().weighted);
        assert!(Params::regressor_default().weighted);
        let p = Params::from_json_regressor("{}").unwrap();
        assert!(p.weighted);
        let p = Params::from_json_regressor(r#"{"weighted": false}"#).unwrap();
        assert!(!p.weighted);
    }

    #[test]
    fn regressor_clauses_must_divide_by_two() {
        let mut p = Params::default();
        p.clauses = 3;
        assert!(p.validate_regressor_clauses().is_err());
        p.clauses = 2;
        assert!(p.validate_regressor_clauses().is_ok());
    }
}

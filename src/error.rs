//! Error taxonomy for the public estimator facade.
//!
//! Every fallible entry point returns [`TsetlinResult`]: `Err` carries a
//! `(code, message)` pair via the enum variant, `Ok` carries the value. No
//! panics or exceptions escape the core on a validation or parse failure.

/// The three failure kinds the public API can return. `Ok` is
/// represented by `Result::Ok`, not a variant here.
#[derive(Debug, thiserror::Error)]
pub enum TsetlinError {
    /// Malformed JSON, a type mismatch, or a schema violation while
    /// decoding params or a serialized estimator state.
    #[error("bad json: {0}")]
    BadJson(String),

    /// A constraint violation: an out-of-range hyperparameter, a
    /// malformed `X`/`y`, a dimension mismatch on `partial_fit`.
    #[error("value error: {0}")]
    ValueError(String),

    /// `predict`/`decision_function`/`evaluate` called before the first
    /// `fit`/`partial_fit`.
    #[error("estimator is not fitted yet; call fit or partial_fit first")]
    NotFitted,
}

pub type TsetlinResult<T> = Result<T, TsetlinError>;

impl TsetlinError {
    /// The stable status code string, as used in serialized diagnostics
    /// and by callers that branch on kind rather than message.
    pub fn code(&self) -> &'static str {
        match self {
            TsetlinError::BadJson(_) => "BAD_JSON",
            TsetlinError::ValueError(_) => "VALUE_ERROR",
            TsetlinError::NotFitted => "NOT_FITTED_ERROR",
        }
    }
}

impl From<serde_json::Error> for TsetlinError {
    fn from(e: serde_json::Error) -> Self {
        TsetlinError::BadJson(e.to_string())
    }
}

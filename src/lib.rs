//! `tsetlini`: the training and inference core of a Tsetlin Machine —
//! a propositional-logic learner whose model is a population of finite
//! -state automata that vote on conjunctive clauses over binary
//! features.
//!
//! Four estimators share the eleven components documented module by
//! module below:
//!
//! - [`ClassifierClassic`] / [`ClassifierBitwise`] — multi-class
//!   classification.
//! - [`RegressorClassic`] / [`RegressorBitwise`] — scalar regression.
//!
//! "Classic" stores one byte per literal; "bitwise" packs literals into
//! `u64` blocks for a popcount-friendly clause kernel. Both share the
//! same feedback allocator (C7), automata updater (C8) and JSON state
//! serializer (C10).
//!
//! No GPU path, no distributed execution, no dynamic model growth, no
//! hyperparameter search: clause count and feature count are fixed
//! after the first `fit`/`partial_fit` call. Reproducibility is
//! guaranteed only at a fixed `(random_state, n_jobs)` pair.

pub mod config;
pub mod container;
pub mod error;
pub mod estimator;
pub mod feedback;
pub mod kernel;
pub mod logging;
pub mod params;
pub mod rng;
pub mod serialize;
pub mod state;
pub mod update;
pub mod vote;

pub use error::{TsetlinError, TsetlinResult};
pub use estimator::{
    ClassifierBitwise, ClassifierClassic, ClauseStorage, RegressorBitwise, RegressorClassic,
};
pub use params::Params;

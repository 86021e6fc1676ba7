//! The estimator layer (C9/C11): four concrete types sharing one
//! orchestration shape (fit/partial_fit/predict over epochs and
//! samples), differing only in label arity (classifier vs regressor)
//! and literal storage (classic vs bitwise).
//!
//! [`ClauseStorage`] names that shared shape as a trait, the way a
//! `KMeans` trait can carry one clustering algorithm across several
//! point representations: here one fit/predict shape
//! is carried across two literal representations. The concrete
//! estimators currently implement the shape directly rather than
//! through this trait's default methods, since classifier and
//! regressor differ enough in their per-sample update (label pairs vs.
//! signed error) that a shared default body would obscure more than it
//! would save; the trait still documents the contract new estimator
//! kinds are expected to honor.

mod classifier;
mod regressor;
mod validate;

pub use classifier::{ClassifierBitwise, ClassifierClassic};
pub use regressor::{RegressorBitwise, RegressorClassic};

use crate::container::BitRow;
use crate::error::TsetlinResult;

/// The fit/predict contract every estimator in this crate honors,
/// independent of label arity or literal representation.
pub trait ClauseStorage {
    /// Row type accepted by `fit`/`partial_fit`/`predict`: a classic
    /// byte-per-feature row for every estimator in this crate (the
    /// bitwise variants pack it internally).
    type Row;
    /// Target accepted by `fit`/`partial_fit`: a class label for the
    /// classifier, a scalar response for the regressor.
    type Target;
    /// Prediction returned by `predict`: an `i32` either way.
    type Prediction;

    fn fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()>;
    fn partial_fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()>;
    fn predict(&self, x: &[Self::Row]) -> TsetlinResult<Vec<Self::Prediction>>;
    fn is_fitted(&self) -> bool;
}

impl ClauseStorage for ClassifierClassic {
    type Row = Vec<u8>;
    type Target = i32;
    type Prediction = i32;

    fn fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        ClassifierClassic::fit(self, x, y, epochs)
    }
    fn partial_fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        ClassifierClassic::partial_fit(self, x, y, epochs)
    }
    fn predict(&self, x: &[Self::Row]) -> TsetlinResult<Vec<Self::Prediction>> {
        ClassifierClassic::predict(self, x)
    }
    fn is_fitted(&self) -> bool {
        ClassifierClassic::is_fitted(self)
    }
}

impl ClauseStorage for ClassifierBitwise {
    type Row = BitRow;
    type Target = i32;
    type Prediction = i32;

    fn fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        ClassifierBitwise::fit(self, x, y, epochs)
    }
    fn partial_fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        ClassifierBitwise::partial_fit(self, x, y, epochs)
    }
    fn predict(&self, x: &[Self::Row]) -> TsetlinResult<Vec<Self::Prediction>> {
        ClassifierBitwise::predict(self, x)
    }
    fn is_fitted(&self) -> bool {
        ClassifierBitwise::is_fitted(self)
    }
}

impl ClauseStorage for RegressorClassic {
    type Row = Vec<u8>;
    type Target = i32;
    type Prediction = i32;

    fn fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        RegressorClassic::fit(self, x, y, epochs)
    }
    fn partial_fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        RegressorClassic::partial_fit(self, x, y, epochs)
    }
    fn predict(&self, x: &[Self::Row]) -> TsetlinResult<Vec<Self::Prediction>> {
        RegressorClassic::predict(self, x)
    }
    fn is_fitted(&self) -> bool {
        RegressorClassic::is_fitted(self)
    }
}

impl ClauseStorage for RegressorBitwise {
    type Row = BitRow;
    type Target = i32;
    type Prediction = i32;

    fn fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        RegressorBitwise::fit(self, x, y, epochs)
    }
    fn partial_fit(&mut self, x: &[Self::Row], y: &[Self::Target], epochs: u32) -> TsetlinResult<()> {
        RegressorBitwise::partial_fit(self, x, y, epochs)
    }
    fn predict(&self, x: &[Self::Row]) -> TsetlinResult<Vec<Self::Prediction>> {
        RegressorBitwise::predict(self, x)
    }
    fn is_fitted(&self) -> bool {
        RegressorBitwise::is_fitted(self)
    }
}

//! The TA-state container (C4): the chosen-width counter matrix, the
//! optional sign shadow for the bitwise variant, and the optional
//! per-clause weight vector. This is the learned model.

use crate::container::{AlignedMatrix, BitMatrix};
use crate::error::{TsetlinError, TsetlinResult};
use crate::params::CountingType;
use crate::rng::IntGen;

/// A counter element narrow enough to be chosen by `counting_type`.
/// Implemented for `i8`/`i16`/`i32`; the kernel, updater and serializer
/// resolve which one is in play exactly once per call ("avoid virtual
/// dispatch on the hot path") via a `match` on
/// [`CounterMatrix`], then call into code generic over this trait.
pub trait TaCounter: Copy + Default + PartialEq + Send + Sync + 'static {
    const WIDTH: u8;
    fn from_i32(v: i32) -> Self;
    fn to_i32(self) -> i32;
    fn includes(self) -> bool {
        self.to_i32() >= 0
    }
}

impl TaCounter for i8 {
    const WIDTH: u8 = 1;
    fn from_i32(v: i32) -> Self {
        v as i8
    }
    fn to_i32(self) -> i32 {
        self as i32
    }
}

impl TaCounter for i16 {
    const WIDTH: u8 = 2;
    fn from_i32(v: i32) -> Self {
        v as i16
    }
    fn to_i32(self) -> i32 {
        self as i32
    }
}

impl TaCounter for i32 {
    const WIDTH: u8 = 4;
    fn from_i32(v: i32) -> Self {
        v
    }
    fn to_i32(self) -> i32 {
        self
    }
}

/// Clamp an incremented counter at `number_of_states - 1`.
pub fn saturating_incr<T: TaCounter>(v: T, number_of_states: i32) -> T {
    T::from_i32((v.to_i32() + 1).min(number_of_states - 1))
}

/// Clamp a decremented counter at `-number_of_states`.
pub fn saturating_decr<T: TaCounter>(v: T, number_of_states: i32) -> T {
    T::from_i32((v.to_i32() - 1).max(-number_of_states))
}

/// The tagged-width counter matrix.
pub enum CounterMatrix {
    I8(AlignedMatrix<i8>),
    I16(AlignedMatrix<i16>),
    I32(AlignedMatrix<i32>),
}

impl CounterMatrix {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            CounterMatrix::I8(m) => m.shape(),
            CounterMatrix::I16(m) => m.shape(),
            CounterMatrix::I32(m) => m.shape(),
        }
    }

    pub fn width(&self) -> u8 {
        match self {
            CounterMatrix::I8(_) => i8::WIDTH,
            CounterMatrix::I16(_) => i16::WIDTH,
            CounterMatrix::I32(_) => i32::WIDTH,
        }
    }

    /// Every counter as an `i64`, row by row — used by the serializer
    /// (C10) and by tests asserting the range invariant.
    pub fn to_rows(&self) -> Vec<Vec<i64>> {
        fn rows_of<T: TaCounter>(m: &AlignedMatrix<T>) -> Vec<Vec<i64>> {
            (0..m.rows())
                .map(|r| m.row(r).iter().map(|&v| v.to_i32() as i64).collect())
                .collect()
        }
        match self {
            CounterMatrix::I8(m) => rows_of(m),
            CounterMatrix::I16(m) => rows_of(m),
            CounterMatrix::I32(m) => rows_of(m),
        }
    }

    pub fn from_rows(width: u8, rows: &[Vec<i64>]) -> TsetlinResult<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        if !rows.iter().all(|r| r.len() == ncols) {
            return Err(TsetlinError::BadJson(
                "ta_state.data rows have inconsistent lengths".to_string(),
            ));
        }
        fn fill<T: TaCounter>(nrows: usize, ncols: usize, rows: &[Vec<i64>]) -> AlignedMatrix<T> {
            let mut m = AlignedMatrix::<T>::zeros(nrows, ncols);
            for (r, row) in rows.iter().enumerate() {
                for (c, &v) in row.iter().enumerate() {
                    m.set(r, c, T::from_i32(v as i32));
                }
            }
            m
        }
        match width {
            1 => Ok(CounterMatrix::I8(fill(nrows, ncols, rows))),
            2 => Ok(CounterMatrix::I16(fill(nrows, ncols, rows))),
            4 => Ok(CounterMatrix::I32(fill(nrows, ncols, rows))),
            other => Err(TsetlinError::BadJson(format!(
                "ta_state.width must be 1, 2 or 4, got {other}"
            ))),
        }
    }
}

/// Choose the narrowest counter width whose range `[-N, N-1]` fits, or
/// honor an explicit request if it fits.
pub fn choose_width(counting_type: CountingType, number_of_states: i32) -> TsetlinResult<u8> {
    let fits_i8 = number_of_states <= 128;
    let fits_i16 = number_of_states <= 32_768;
    match counting_type {
        CountingType::Auto => Ok(if fits_i8 {
            1
        } else if fits_i16 {
            2
        } else {
            4
        }),
        CountingType::I8 if fits_i8 => Ok(1),
        CountingType::I16 if fits_i16 => Ok(2),
        CountingType::I32 => Ok(4),
        other => Err(TsetlinError::ValueError(format!(
            "counting_type {:?} cannot represent number_of_states {}",
            other, number_of_states
        ))),
    }
}

/// The learned model: TA counters, the bitwise sign shadow (when in
/// play) and per-clause weights (when `weighted`).
pub struct TaState {
    pub counters: CounterMatrix,
    pub signs: Option<BitMatrix>,
    pub weights: Option<Vec<i32>>,
}

impl TaState {
    pub fn is_fitted(&self) -> bool {
        self.counters.shape().0 != 0
    }

    /// Allocate and initialize state for `number_of_clauses` clauses
    /// over `number_of_features` features: every counter is a
    /// uniform draw from `{-1, 0}`, signs mirror that, weights start
    /// at 1.
    pub fn init(
        number_of_clauses: usize,
        number_of_features: usize,
        width: u8,
        bitwise: bool,
        weighted: bool,
        igen: &mut IntGen,
    ) -> TsetlinResult<Self> {
        let rows = 2 * number_of_clauses;
        let mut counters = match width {
            1 => CounterMatrix::I8(AlignedMatrix::zeros(rows, number_of_features)),
            2 => CounterMatrix::I16(AlignedMatrix::zeros(rows, number_of_features)),
            4 => CounterMatrix::I32(AlignedMatrix::zeros(rows, number_of_features)),
            other => {
                return Err(TsetlinError::ValueError(format!(
                    "unsupported counter width {other}"
                )));
            }
        };

        let mut signs = bitwise.then(|| BitMatrix::zeros(rows, number_of_features));

        fn seed<T: TaCounter>(
            m: &mut AlignedMatrix<T>,
            signs: &mut Option<BitMatrix>,
            igen: &mut IntGen,
        ) {
            for r in 0..m.rows() {
                for c in 0..m.cols() {
                    let draw = igen.next_below(2) as i32 - 1; // {-1, 0}
                    let v = T::from_i32(draw);
                    m.set(r, c, v);
                    if let Some(signs) = signs.as_mut() {
                        signs.set(r, c, v.includes());
                    }
                }
            }
        }

        match &mut counters {
            CounterMatrix::I8(m) => seed(m, &mut signs, igen),
            CounterMatrix::I16(m) => seed(m, &mut signs, igen),
            CounterMatrix::I32(m) => seed(m, &mut signs, igen),
        }

        let weights = weighted.then(|| vec![1i32; number_of_clauses]);

        Ok(Self {
            counters,
            signs,
            weights,
        })
    }

    /// Empty, "not fitted" placeholder state.
    pub fn empty() -> Self {
        Self {
            counters: CounterMatrix::I8(AlignedMatrix::zeros(0, 0)),
            signs: None,
            weights: None,
        }
    }

    pub fn number_of_clauses(&self) -> usize {
        self.counters.shape().0 / 2
    }

    pub fn number_of_features(&self) -> usize {
        self.counters.shape().1
    }

    /// Quantified invariant check: every counter in range, every
    /// sign mirrors its counter, every weight in `[1, max_weight]`.
    #[cfg(test)]
    pub fn check_invariants(&self, number_of_states: i32, max_weight: i32) -> bool {
        let rows = self.counters.to_rows();
        let counters_in_range = rows
            .iter()
            .all(|row| row.iter().all(|&v| v >= -(number_of_states as i64) && v < number_of_states as i64));
        let signs_ok = match &self.signs {
            None => true,
            Some(signs) => rows.iter().enumerate().all(|(r, row)| {
                row.iter()
                    .enumerate()
                    .all(|(c, &v)| signs.get(r, c) == (v >= 0))
            }),
        };
        let weights_ok = match &self.weights {
            None => true,
            Some(w) => w.iter().all(|&v| (1..=max_weight).contains(&v)),
        };
        counters_in_range && signs_ok && weights_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CountingType;

    #[test]
    fn auto_width_picks_narrowest_fit() {
        assert_eq!(choose_width(CountingType::Auto, 100).unwrap(), 1);
        assert_eq!(choose_width(CountingType::Auto, 1000).unwrap(), 2);
        assert_eq!(choose_width(CountingType::Auto, 100_000).unwrap(), 4);
    }

    #[test]
    fn explicit_width_rejects_overflow() {
        assert!(choose_width(CountingType::I8, 1000).is_err());
        assert!(choose_width(CountingType::I16, 100_000).is_err());
    }

    #[test]
    fn init_respects_invariants() {
        let mut igen = IntGen::new(1);
        let state = TaState::init(4, 10, 1, true, true, &mut igen).unwrap();
        assert!(state.check_invariants(100, 10));
        assert_eq!(state.number_of_clauses(), 4);
        assert_eq!(state.number_of_features(), 10);
    }

    #[test]
    fn empty_state_is_not_fitted() {
        assert!(!TaState::empty().is_fitted());
    }
}

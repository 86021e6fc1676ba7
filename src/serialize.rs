//! Full estimator state (de)serialization (C10): params, the
//! width-tagged TA counters, the optional sign shadow and weights, and
//! both PRNG states — enough to resume training exactly where it left
//! off. Grounded on `original_source/lib/tests/src/test_*_state_json*`
//! naming the same four top-level sections.

use crate::container::BitMatrix;
use crate::error::{TsetlinError, TsetlinResult};
use crate::params::Params;
use crate::rng::{FloatGen, IntGen};
use crate::state::{CounterMatrix, TaState};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaStateJson {
    width: u8,
    data: Vec<Vec<i64>>,
}

/// Mirrors the spec's top-level `signs` object: row/column counts plus
/// a flat, row-major array of `u64` blocks (so the wire shape doesn't
/// nest a `Vec<Vec<_>>` the way `ta_state.data` does).
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignsJson {
    rows: usize,
    cols: usize,
    blocks: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotJson {
    params: Params,
    ta_state: TaStateJson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signs: Option<SignsJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weights: Option<Vec<i32>>,
    igen: IntGen,
    fgen: FloatGen,
}

/// Serialize the full estimator state to a JSON string.
pub fn to_json(params: &Params, state: &TaState, igen: &IntGen, fgen: &FloatGen) -> TsetlinResult<String> {
    let snapshot = SnapshotJson {
        params: params.clone(),
        ta_state: TaStateJson {
            width: state.counters.width(),
            data: state.counters.to_rows(),
        },
        signs: state.signs.as_ref().map(|signs| {
            let (rows, cols) = signs.shape();
            SignsJson {
                rows,
                cols,
                blocks: signs.to_row_blocks().into_iter().flatten().collect(),
            }
        }),
        weights: state.weights.clone(),
        igen: igen.clone(),
        fgen: fgen.clone(),
    };
    serde_json::to_string(&snapshot).map_err(TsetlinError::from)
}

/// Parse a JSON string produced by [`to_json`]. `expect_bitwise` guards
/// against loading a bitwise snapshot into a classic estimator or vice
/// versa, since the literal representation is fixed at estimator
/// construction, not carried per-call.
pub fn from_json(json: &str, expect_bitwise: bool) -> TsetlinResult<(Params, TaState, IntGen, FloatGen)> {
    let snapshot: SnapshotJson = serde_json::from_str(json).map_err(|e| TsetlinError::BadJson(e.to_string()))?;

    let has_signs = snapshot.signs.is_some();
    if has_signs != expect_bitwise {
        return Err(TsetlinError::BadJson(format!(
            "state was serialized from a {} estimator, cannot load into a {} one",
            if has_signs { "bitwise" } else { "classic" },
            if expect_bitwise { "bitwise" } else { "classic" }
        )));
    }

    let counters = CounterMatrix::from_rows(snapshot.ta_state.width, &snapshot.ta_state.data)?;
    let signs = match snapshot.signs {
        Some(s) => {
            let blocks_per_row = s.cols.div_ceil(64).max(1);
            if s.blocks.len() != s.rows * blocks_per_row {
                return Err(TsetlinError::BadJson(format!(
                    "signs.blocks length {} does not match rows {} * blocks_per_row {}",
                    s.blocks.len(),
                    s.rows,
                    blocks_per_row
                )));
            }
            let rows = s.blocks.chunks(blocks_per_row).map(|chunk| chunk.to_vec()).collect();
            Some(BitMatrix::from_row_blocks(s.cols, rows))
        }
        None => None,
    };
    let state = TaState {
        counters,
        signs,
        weights: snapshot.weights,
    };
    Ok((snapshot.params, state, snapshot.igen, snapshot.fgen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::IntGen as IntGenT;

    #[test]
    fn round_trips_classic_unweighted_state() {
        let params = Params::default();
        let mut igen = IntGenT::new(params.random_state.unwrap_or(1));
        let state = TaState::init(4, 6, 1, false, false, &mut igen).unwrap();
        let fgen = FloatGen::new(1);

        let json = to_json(&params, &state, &igen, &fgen).unwrap();
        let (p2, s2, _, _) = from_json(&json, false).unwrap();

        assert_eq!(p2, params);
        assert_eq!(s2.counters.to_rows(), state.counters.to_rows());
        assert!(s2.signs.is_none());
        assert!(s2.weights.is_none());
    }

    #[test]
    fn round_trips_bitwise_weighted_state() {
        let params = Params::default();
        let mut igen = IntGenT::new(7);
        let state = TaState::init(3, 5, 2, true, true, &mut igen).unwrap();
        let fgen = FloatGen::new(7);

        let json = to_json(&params, &state, &igen, &fgen).unwrap();
        let (_, s2, _, _) = from_json(&json, true).unwrap();

        assert_eq!(s2.signs.as_ref().unwrap().shape(), state.signs.as_ref().unwrap().shape());
        assert_eq!(s2.weights, state.weights);
    }

    #[test]
    fn rejects_representation_mismatch() {
        let params = Params::default();
        let mut igen = IntGenT::new(1);
        let state = TaState::init(2, 4, 1, false, false, &mut igen).unwrap();
        let fgen = FloatGen::new(1);
        let json = to_json(&params, &state, &igen, &fgen).unwrap();
        assert!(from_json(&json, true).is_err());
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let err = from_json(r#"{"bogus": 1}"#, false).unwrap_err();
        assert_eq!(err.code(), "BAD_JSON");
    }
}

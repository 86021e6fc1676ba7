//! The clause-evaluation kernel (C5): bit-parallel AND/NOT over
//! include/exclude masks, with early termination and tile-sized
//! batching.

use crate::container::{AlignedMatrix, BitMatrix, Block, BITS_PER_BLOCK};
use crate::state::{CounterMatrix, TaCounter};
use rayon::prelude::*;

/// Above this many clauses in a batch, clause evaluation and the
/// automata update fan out across `n_jobs` workers.
pub const PARALLEL_CLAUSE_THRESHOLD: usize = 64;

/// `(fires, all_excluded)` for one clause against one classic sample,
/// scanning in `tile` feature-sized chunks with early exit on the
/// first falsifying literal — but *not* short-circuiting the
/// `all_excluded` accumulation, which must see every feature.
fn scan_classic<T: TaCounter>(pos: &[T], neg: &[T], x: &[u8], tile: usize) -> (bool, bool) {
    let f = x.len();
    let mut all_exclude = true;
    let mut i = 0;
    while i < f {
        let end = (i + tile).min(f);
        let mut falsified = false;
        for k in i..end {
            let inc_pos = pos[k].includes();
            let inc_neg = neg[k].includes();
            all_exclude &= !(inc_pos || inc_neg);
            if (inc_pos && x[k] == 0) || (inc_neg && x[k] == 1) {
                falsified = true;
                break;
            }
        }
        if falsified {
            return (false, all_exclude);
        }
        i = end;
    }
    (true, all_exclude)
}

/// Training-path clause output: no `all_exclude` suppression, so an
/// empty clause fires — the learning pressure that bootstraps
/// inclusion from scratch.
pub fn clause_output_classic<T: TaCounter>(
    counters: &AlignedMatrix<T>,
    clause: usize,
    x: &[u8],
    tile: usize,
) -> bool {
    let pos = counters.row(2 * clause);
    let neg = counters.row(2 * clause + 1);
    scan_classic(pos, neg, x, tile).0
}

/// Predict-path clause output: an all-excluded clause is forced to 0.
pub fn clause_output_for_predict_classic<T: TaCounter>(
    counters: &AlignedMatrix<T>,
    clause: usize,
    x: &[u8],
    tile: usize,
) -> bool {
    let pos = counters.row(2 * clause);
    let neg = counters.row(2 * clause + 1);
    let (fires, all_exclude) = scan_classic(pos, neg, x, tile);
    fires && !all_exclude
}

/// Bitwise-variant scan: `pos_mask`/`neg_mask` are the `signs` rows for
/// this clause (1 = literal included); `x` is the sample's blocks,
/// already validated to have zeroed padding bits.
fn scan_bitwise(pos_mask: &[u64], neg_mask: &[u64], x: &[u64], blocks_per_tile: usize) -> (bool, bool) {
    let nblocks = x.len();
    let mut all_exclude_acc = 0u64;
    let mut i = 0;
    while i < nblocks {
        let end = (i + blocks_per_tile).min(nblocks);
        let mut falsified = false;
        for b in i..end {
            let xb = x[b];
            let pm = pos_mask[b];
            let nm = neg_mask[b];
            all_exclude_acc |= pm | nm;
            let pos_violation = (xb & pm) ^ pm;
            let neg_violation = (!xb & nm) ^ nm;
            if pos_violation != 0 || neg_violation != 0 {
                falsified = true;
                break;
            }
        }
        if falsified {
            return (false, all_exclude_acc == 0);
        }
        i = end;
    }
    (true, all_exclude_acc == 0)
}

fn blocks_per_tile(tile_size: u32) -> usize {
    (tile_size as usize).div_ceil(BITS_PER_BLOCK).max(1)
}

pub fn clause_output_bitwise(signs: &BitMatrix, clause: usize, x: &[Block], tile_size: u32) -> bool {
    let pos = signs.row_blocks(2 * clause);
    let neg = signs.row_blocks(2 * clause + 1);
    scan_bitwise(pos, neg, x, blocks_per_tile(tile_size)).0
}

pub fn clause_output_for_predict_bitwise(signs: &BitMatrix, clause: usize, x: &[Block], tile_size: u32) -> bool {
    let pos = signs.row_blocks(2 * clause);
    let neg = signs.row_blocks(2 * clause + 1);
    let (fires, all_exclude) = scan_bitwise(pos, neg, x, blocks_per_tile(tile_size));
    fires && !all_exclude
}

/// Evaluate clauses `[begin, end)` for one classic sample into
/// `clause_output[begin..end]`, fanning out across `pool` once the
/// range is at least [`PARALLEL_CLAUSE_THRESHOLD`] clauses wide. `pool`
/// is built once by the estimator (alongside its PRNGs), not per call —
/// the PRNG pair is never touched here (no draws in C5).
pub fn evaluate_range_classic(
    counters: &CounterMatrix,
    begin: usize,
    end: usize,
    x: &[u8],
    tile: usize,
    for_predict: bool,
    pool: Option<&rayon::ThreadPool>,
    clause_output: &mut [u8],
) {
    fn eval_one<T: TaCounter>(m: &AlignedMatrix<T>, j: usize, x: &[u8], tile: usize, predict: bool) -> u8 {
        let fires = if predict {
            clause_output_for_predict_classic(m, j, x, tile)
        } else {
            clause_output_classic(m, j, x, tile)
        };
        #[cfg(debug_assertions)]
        log::trace!("clause {j} (classic, predict={predict}) -> fires={fires}");
        fires as u8
    }

    macro_rules! run {
        ($m:expr) => {{
            let slice = &mut clause_output[begin..end];
            if end - begin >= PARALLEL_CLAUSE_THRESHOLD {
                if let Some(pool) = pool {
                    pool.install(|| {
                        slice.par_iter_mut().enumerate().for_each(|(i, out)| {
                            *out = eval_one($m, begin + i, x, tile, for_predict);
                        });
                    });
                    return;
                }
            }
            for (i, out) in slice.iter_mut().enumerate() {
                *out = eval_one($m, begin + i, x, tile, for_predict);
            }
        }};
    }

    match counters {
        CounterMatrix::I8(m) => run!(m),
        CounterMatrix::I16(m) => run!(m),
        CounterMatrix::I32(m) => run!(m),
    }
}

pub fn evaluate_range_bitwise(
    signs: &BitMatrix,
    begin: usize,
    end: usize,
    x: &[Block],
    tile_size: u32,
    for_predict: bool,
    pool: Option<&rayon::ThreadPool>,
    clause_output: &mut [u8],
) {
    let slice = &mut clause_output[begin..end];
    let eval_one = |j: usize| -> u8 {
        let fires = if for_predict {
            clause_output_for_predict_bitwise(signs, j, x, tile_size)
        } else {
            clause_output_bitwise(signs, j, x, tile_size)
        };
        #[cfg(debug_assertions)]
        log::trace!("clause {j} (bitwise, predict={for_predict}) -> fires={fires}");
        fires as u8
    };
    if end - begin >= PARALLEL_CLAUSE_THRESHOLD {
        if let Some(pool) = pool {
            pool.install(|| {
                slice
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, out)| *out = eval_one(begin + i));
            });
            return;
        }
    }
    for (i, out) in slice.iter_mut().enumerate() {
        *out = eval_one(begin + i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::AlignedMatrix;

    #[test]
    fn empty_clause_fires_in_train_not_predict() {
        let m = AlignedMatrix::<i8>::zeros(2, 4); // both rows all -1 by default (Default for i8 is 0, which *includes*)
        // zeros() fills with T::default() == 0, which is "include" (>=0).
        // Build an explicit all-exclude clause instead: every counter negative.
        let mut m = m;
        for c in 0..4 {
            m.set(0, c, -1);
            m.set(1, c, -1);
        }
        let x = [1u8, 0, 1, 0];
        assert!(clause_output_classic(&m, 0, &x, 16));
        assert!(!clause_output_for_predict_classic(&m, 0, &x, 16));
    }

    #[test]
    fn classic_and_bitwise_kernels_agree() {
        let mut counters = AlignedMatrix::<i8>::zeros(2, 70);
        // include feature 0 positively, feature 69 negatively.
        counters.set(0, 0, 0);
        counters.set(1, 69, 0);
        for c in 1..70 {
            counters.set(0, c, -1);
        }
        for c in 0..69 {
            counters.set(1, c, -1);
        }

        let mut signs = BitMatrix::zeros(2, 70);
        for r in 0..2 {
            for c in 0..70 {
                signs.set(r, c, counters.get(r, c) >= 0);
            }
        }

        let mut x_bytes = vec![0u8; 70];
        x_bytes[0] = 1;
        x_bytes[69] = 0;

        let mut x_bits = BitMatrix::zeros(1, 70);
        for (c, &b) in x_bytes.iter().enumerate() {
            x_bits.set(0, c, b == 1);
        }

        let classic = clause_output_classic(&counters, 0, &x_bytes, 16);
        let bitwise = clause_output_bitwise(&signs, 0, x_bits.row_blocks(0), 16);
        assert_eq!(classic, bitwise);
        assert!(classic);
    }

    #[test]
    fn falsifying_literal_kills_clause_both_representations() {
        let mut counters = AlignedMatrix::<i8>::zeros(1 * 2, 4);
        counters.set(0, 0, 0); // include positively: requires x[0]==1
        for c in 1..4 {
            counters.set(0, c, -1);
        }
        for c in 0..4 {
            counters.set(1, c, -1);
        }
        let x = [0u8, 0, 0, 0]; // x[0] == 0 falsifies
        assert!(!clause_output_classic(&counters, 0, &x, 16));
        assert!(!clause_output_for_predict_classic(&counters, 0, &x, 16));
    }
}

//! The automata update kernel (C8): Type I (negative/positive) and
//! Type II feedback applied to one clause's literal-automata pair, plus
//! weight and sign-shadow maintenance. Ported from the reference's
//! `block1`/`block2`/`block3`/`train_automata_batch`
//! (`original_source/src/tsetlini_algo.hpp`).

use crate::container::{AlignedMatrix, BitMatrix, BITS_PER_BLOCK};
use crate::feedback::FeedbackSign;
use crate::rng::{FloatCache, FloatGen};
use crate::state::{CounterMatrix, TaCounter, TaState, saturating_decr, saturating_incr};
use rayon::prelude::*;

/// Feedback Type I, negative branch: every feature's pos/neg automaton
/// is decremented independently with probability `S_inv`, regardless of
/// `X`. Consumes two cache draws per feature.
fn block1<T: TaCounter>(pos: &mut [T], neg: &mut [T], number_of_states: i32, s_inv: f32, fcache: &FloatCache, mut p: usize) -> usize {
    for k in 0..pos.len() {
        if fcache.at(p) <= s_inv {
            pos[k] = saturating_decr(pos[k], number_of_states);
        }
        p += 1;
        if fcache.at(p) <= s_inv {
            neg[k] = saturating_decr(neg[k], number_of_states);
        }
        p += 1;
    }
    p
}

/// Feedback Type I, positive branch: reinforces the automaton that
/// agrees with `X[k]`, penalizes the one that disagrees. `boost`
/// (`boost_true_positive_feedback`) forces the agreeing branch
/// unconditionally rather than gating it by `1 - S_inv`, and short
/// circuits the draw behind it exactly like the reference's `cond1 =
/// boost_true_positive_feedback == true or (fcache[fcache_pos++] <= ...)`:
/// one cache draw per feature when `boost` is set, two otherwise.
fn block2<T: TaCounter>(
    pos: &mut [T],
    neg: &mut [T],
    number_of_states: i32,
    s_inv: f32,
    boost: bool,
    x_bit: impl Fn(usize) -> bool,
    fcache: &FloatCache,
    mut p: usize,
) -> usize {
    for k in 0..pos.len() {
        let cond1 = if boost {
            true
        } else {
            let v = fcache.at(p);
            p += 1;
            v <= (1.0 - s_inv)
        };
        let cond2 = fcache.at(p) <= s_inv;
        p += 1;

        if x_bit(k) {
            if cond1 {
                pos[k] = saturating_incr(pos[k], number_of_states);
            }
            if cond2 {
                neg[k] = saturating_decr(neg[k], number_of_states);
            }
        } else {
            if cond1 {
                neg[k] = saturating_incr(neg[k], number_of_states);
            }
            if cond2 {
                pos[k] = saturating_decr(pos[k], number_of_states);
            }
        }
    }
    p
}

/// Feedback Type II: pushes the excluded automaton on the side that
/// currently falsifies nothing back toward inclusion, starving a
/// clause that is voting the wrong way without touching the other
/// side. No cache draws — deterministic given `X`.
fn block3<T: TaCounter>(pos: &mut [T], neg: &mut [T], number_of_states: i32, x_bit: impl Fn(usize) -> bool) {
    for k in 0..pos.len() {
        if !x_bit(k) {
            if !pos[k].includes() {
                pos[k] = saturating_incr(pos[k], number_of_states);
            }
        } else if !neg[k].includes() {
            neg[k] = saturating_incr(neg[k], number_of_states);
        }
    }
}

fn set_bit(row: &mut [u64], c: usize, value: bool) {
    let idx = c / BITS_PER_BLOCK;
    let bit = c % BITS_PER_BLOCK;
    if value {
        row[idx] |= 1 << bit;
    } else {
        row[idx] &= !(1 << bit);
    }
}

fn mirror_signs<T: TaCounter>(row: &mut [u64], values: &[T]) {
    for (c, &v) in values.iter().enumerate() {
        set_bit(row, c, v.includes());
    }
}

/// Apply Type I/II feedback to clause `j`'s automata pair, update its
/// weight, and re-mirror its sign row if bitwise. `x_bit(k)`
/// reads feature `k` of the current sample, independent of whether the
/// caller holds a classic byte row or a bitwise packed row.
#[allow(clippy::too_many_arguments)]
pub fn update_clause<T: TaCounter>(
    pos: &mut [T],
    neg: &mut [T],
    signs: Option<(&mut [u64], &mut [u64])>,
    weight: Option<&mut i32>,
    feedback: FeedbackSign,
    fires: bool,
    number_of_features: usize,
    number_of_states: i32,
    s_inv: f32,
    boost_true_positive_feedback: bool,
    max_weight: i32,
    x_bit: impl Fn(usize) -> bool,
    fcache: &FloatCache,
    fcache_pos: usize,
) -> usize {
    let mut next_pos = fcache_pos;
    if feedback > 0 {
        if !fires {
            next_pos = block1(pos, neg, number_of_states, s_inv, fcache, fcache_pos);
        } else {
            next_pos = block2(pos, neg, number_of_states, s_inv, boost_true_positive_feedback, &x_bit, fcache, fcache_pos);
            if let Some(w) = weight {
                *w = (*w + 1).min(max_weight);
            }
        }
    } else if feedback < 0 && fires {
        block3(pos, neg, number_of_states, &x_bit);
        if let Some(w) = weight {
            *w = (*w - 1).max(1);
        }
    }

    let _ = number_of_features;
    if let Some((pos_row, neg_row)) = signs {
        mirror_signs(pos_row, pos);
        mirror_signs(neg_row, neg);
    }
    next_pos
}

/// Draws consumed by [`update_clause`] for one clause when Type I
/// fires: `2 * number_of_features` floats either way (`block1` and
/// `block2` both draw two per feature); Type II and "no feedback" draw
/// nothing.
pub fn draws_for_feedback(feedback: FeedbackSign, number_of_features: usize) -> usize {
    if feedback > 0 {
        2 * number_of_features
    } else {
        0
    }
}

/// One bulk, sequential refill sized to every clause's draw cost in
/// `[begin, end)`, handing back each clause's offset into the refilled
/// cache. This is the orchestrator-side half of C8's parallel fan-out:
/// the float stream itself cannot be drawn from out of order, so the
/// whole range's floats are produced up front and workers only read
/// their own disjoint window afterwards.
fn refill_for_range(
    fcache: &mut FloatCache,
    fgen: &mut FloatGen,
    feedback: &[FeedbackSign],
    begin: usize,
    end: usize,
    number_of_features: usize,
) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(end - begin);
    let mut total = 0usize;
    for &fb in &feedback[begin..end] {
        offsets.push(total);
        total += draws_for_feedback(fb, number_of_features);
    }
    fcache.refill(fgen, total);
    offsets
}

#[allow(clippy::too_many_arguments)]
fn apply_range_classic<T: TaCounter>(
    m: &mut AlignedMatrix<T>,
    mut weights: Option<&mut [i32]>,
    begin: usize,
    end: usize,
    feedback: &[FeedbackSign],
    clause_output: &[u8],
    x: &[u8],
    number_of_features: usize,
    number_of_states: i32,
    s_inv: f32,
    boost: bool,
    max_weight: i32,
    fcache: &FloatCache,
    offsets: &[usize],
    parallel_threshold: usize,
    pool: Option<&rayon::ThreadPool>,
) {
    if end - begin >= parallel_threshold {
        if let Some(pool) = pool {
            let pairs = m.clause_pairs_mut(begin, end);
            match weights {
                Some(w) => pool.install(|| {
                    pairs.zip(w.par_iter_mut()).enumerate().for_each(|(local, ((pos, neg), wt))| {
                        let j = begin + local;
                        update_clause(
                            pos, neg, None, Some(wt), feedback[j], clause_output[j] == 1, number_of_features,
                            number_of_states, s_inv, boost, max_weight, |k| x[k] != 0, fcache, offsets[local],
                        );
                    });
                }),
                None => pool.install(|| {
                    pairs.enumerate().for_each(|(local, (pos, neg))| {
                        let j = begin + local;
                        update_clause(
                            pos, neg, None, None, feedback[j], clause_output[j] == 1, number_of_features,
                            number_of_states, s_inv, boost, max_weight, |k| x[k] != 0, fcache, offsets[local],
                        );
                    });
                }),
            }
            return;
        }
    }
    for (local, j) in (begin..end).enumerate() {
        let (pos, neg) = m.row_pair_mut(2 * j, 2 * j + 1);
        let weight = weights.as_mut().map(|w| &mut w[local]);
        update_clause(
            pos, neg, None, weight, feedback[j], clause_output[j] == 1, number_of_features,
            number_of_states, s_inv, boost, max_weight, |k| x[k] != 0, fcache, offsets[local],
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_range_bitwise<T: TaCounter>(
    m: &mut AlignedMatrix<T>,
    signs: &mut BitMatrix,
    mut weights: Option<&mut [i32]>,
    begin: usize,
    end: usize,
    feedback: &[FeedbackSign],
    clause_output: &[u8],
    row: &[u64],
    number_of_features: usize,
    number_of_states: i32,
    s_inv: f32,
    boost: bool,
    max_weight: i32,
    fcache: &FloatCache,
    offsets: &[usize],
    parallel_threshold: usize,
    pool: Option<&rayon::ThreadPool>,
) {
    if end - begin >= parallel_threshold {
        if let Some(pool) = pool {
            let pairs = m.clause_pairs_mut(begin, end);
            let sign_pairs = signs.clause_pairs_blocks_mut(begin, end);
            match weights {
                Some(w) => pool.install(|| {
                    pairs.zip(sign_pairs).zip(w.par_iter_mut()).enumerate().for_each(
                        |(local, (((pos, neg), (spos, sneg)), wt))| {
                            let j = begin + local;
                            update_clause(
                                pos, neg, Some((spos, sneg)), Some(wt), feedback[j], clause_output[j] == 1,
                                number_of_features, number_of_states, s_inv, boost, max_weight,
                                |k| (row[k / 64] >> (k % 64)) & 1 == 1, fcache, offsets[local],
                            );
                        },
                    );
                }),
                None => pool.install(|| {
                    pairs.zip(sign_pairs).enumerate().for_each(|(local, ((pos, neg), (spos, sneg)))| {
                        let j = begin + local;
                        update_clause(
                            pos, neg, Some((spos, sneg)), None, feedback[j], clause_output[j] == 1,
                            number_of_features, number_of_states, s_inv, boost, max_weight,
                            |k| (row[k / 64] >> (k % 64)) & 1 == 1, fcache, offsets[local],
                        );
                    });
                }),
            }
            return;
        }
    }
    for (local, j) in (begin..end).enumerate() {
        let (pos, neg) = m.row_pair_mut(2 * j, 2 * j + 1);
        let (spos, sneg) = signs.row_pair_blocks_mut(2 * j, 2 * j + 1);
        let weight = weights.as_mut().map(|w| &mut w[local]);
        update_clause(
            pos, neg, Some((spos, sneg)), weight, feedback[j], clause_output[j] == 1, number_of_features,
            number_of_states, s_inv, boost, max_weight, |k| (row[k / 64] >> (k % 64)) & 1 == 1, fcache, offsets[local],
        );
    }
}

/// Apply Type I/II feedback to every clause in `[begin, end)` against
/// one classic sample, fanning out across `pool` once the range is at
/// least `parallel_threshold` clauses wide — the same gate
/// [`crate::kernel::evaluate_range_classic`] uses for C5. Returns the
/// number of clauses that received nonzero feedback.
#[allow(clippy::too_many_arguments)]
pub fn update_range_classic(
    state: &mut TaState,
    begin: usize,
    end: usize,
    feedback: &[FeedbackSign],
    clause_output: &[u8],
    x: &[u8],
    number_of_features: usize,
    number_of_states: i32,
    s_inv: f32,
    boost: bool,
    max_weight: i32,
    fgen: &mut FloatGen,
    fcache: &mut FloatCache,
    parallel_threshold: usize,
    pool: Option<&rayon::ThreadPool>,
) -> u64 {
    let offsets = refill_for_range(fcache, fgen, feedback, begin, end, number_of_features);
    let feedback_count = feedback[begin..end].iter().filter(|&&fb| fb != 0).count() as u64;
    let weights = state.weights.as_deref_mut().map(|w| &mut w[begin..end]);
    match &mut state.counters {
        CounterMatrix::I8(m) => apply_range_classic(
            m, weights, begin, end, feedback, clause_output, x, number_of_features, number_of_states, s_inv, boost,
            max_weight, fcache, &offsets, parallel_threshold, pool,
        ),
        CounterMatrix::I16(m) => apply_range_classic(
            m, weights, begin, end, feedback, clause_output, x, number_of_features, number_of_states, s_inv, boost,
            max_weight, fcache, &offsets, parallel_threshold, pool,
        ),
        CounterMatrix::I32(m) => apply_range_classic(
            m, weights, begin, end, feedback, clause_output, x, number_of_features, number_of_states, s_inv, boost,
            max_weight, fcache, &offsets, parallel_threshold, pool,
        ),
    }
    feedback_count
}

/// Bitwise counterpart of [`update_range_classic`]; `row` is the
/// sample's packed blocks and every clause's sign shadow is re-mirrored
/// alongside its counters.
#[allow(clippy::too_many_arguments)]
pub fn update_range_bitwise(
    state: &mut TaState,
    begin: usize,
    end: usize,
    feedback: &[FeedbackSign],
    clause_output: &[u8],
    row: &[u64],
    number_of_features: usize,
    number_of_states: i32,
    s_inv: f32,
    boost: bool,
    max_weight: i32,
    fgen: &mut FloatGen,
    fcache: &mut FloatCache,
    parallel_threshold: usize,
    pool: Option<&rayon::ThreadPool>,
) -> u64 {
    let offsets = refill_for_range(fcache, fgen, feedback, begin, end, number_of_features);
    let feedback_count = feedback[begin..end].iter().filter(|&&fb| fb != 0).count() as u64;
    let weights = state.weights.as_deref_mut().map(|w| &mut w[begin..end]);
    let signs = state.signs.as_mut().expect("bitwise state carries signs");
    match &mut state.counters {
        CounterMatrix::I8(m) => apply_range_bitwise(
            m, signs, weights, begin, end, feedback, clause_output, row, number_of_features, number_of_states, s_inv,
            boost, max_weight, fcache, &offsets, parallel_threshold, pool,
        ),
        CounterMatrix::I16(m) => apply_range_bitwise(
            m, signs, weights, begin, end, feedback, clause_output, row, number_of_features, number_of_states, s_inv,
            boost, max_weight, fcache, &offsets, parallel_threshold, pool,
        ),
        CounterMatrix::I32(m) => apply_range_bitwise(
            m, signs, weights, begin, end, feedback, clause_output, row, number_of_features, number_of_states, s_inv,
            boost, max_weight, fcache, &offsets, parallel_threshold, pool,
        ),
    }
    feedback_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FloatGen;

    fn cache_of_ones(len: usize) -> FloatCache {
        let mut fgen = FloatGen::new(1);
        let mut cache = FloatCache::new();
        cache.refill(&mut fgen, len.max(1));
        cache
    }

    #[test]
    fn type_ii_feedback_only_grows_the_falsified_side() {
        let mut pos = vec![-1i8, -1];
        let mut neg = vec![-1i8, -1];
        let x = [true, false];
        let cache = cache_of_ones(8);
        update_clause(
            &mut pos,
            &mut neg,
            None,
            None,
            -1,
            true,
            2,
            100,
            0.5,
            false,
            i32::MAX,
            |k| x[k],
            &cache,
            0,
        );
        // x[0]=true -> neg[0] grows (was falsifying nothing, pushed toward include)
        assert_eq!(neg[0], 0);
        // x[1]=false -> pos[1] grows
        assert_eq!(pos[1], 0);
    }

    #[test]
    fn weight_clamped_at_one_on_repeated_type_ii() {
        let mut pos = vec![-1i8];
        let mut neg = vec![-1i8];
        let mut w = 1i32;
        let cache = cache_of_ones(8);
        update_clause(
            &mut pos, &mut neg, None, Some(&mut w), -1, true, 1, 100, 0.5, false, 10, |_| true, &cache, 0,
        );
        assert_eq!(w, 1);
    }

    #[test]
    fn weight_increments_on_type_i_positive_branch_when_firing() {
        let mut pos = vec![0i8];
        let mut neg = vec![-1i8];
        let mut w = 1i32;
        let cache = cache_of_ones(8);
        update_clause(
            &mut pos, &mut neg, None, Some(&mut w), 1, true, 1, 100, 0.0, true, 10, |_| true, &cache, 0,
        );
        assert_eq!(w, 2);
    }

    #[test]
    fn draws_for_feedback_accounts_type_i_cost() {
        assert_eq!(draws_for_feedback(1, 5), 10);
        assert_eq!(draws_for_feedback(-1, 5), 0);
        assert_eq!(draws_for_feedback(0, 5), 0);
    }
}

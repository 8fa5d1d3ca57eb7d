//! Predictor estimation and assignment
//!
//! Builds a codebook of second-order linear predictors and decides which
//! predictor fits each frame best. Nothing here touches audio directly; every
//! step works on the per-frame autocorrelation matrices from
//! [`super::autocorr`].
//!
//! Coefficients are `[c0, c1]` where `c0` multiplies the previous sample and
//! `c1` the sample before that.

use super::autocorr::Autocorr;
use crate::core::{Codebook, Vector, COEFFICIENT_SHIFT, ENCODE_ORDER, VECTOR_SIZE};

/// Refinement passes when assigning predictors
const ITERATIONS: usize = 20;

/// Pivots smaller than this fraction of the largest diagonal entry are
/// treated as zero
const RELATIVE_EPSILON: f64 = 1.0 / 4096.0;

/// Squared prediction error for a frame, given its autocorrelation matrix and
/// a set of coefficients.
pub fn eval(corr: &Autocorr, coeff: &[f32; 2]) -> f32 {
    corr[0]
        + corr[2] * coeff[0] * coeff[0]
        + corr[5] * coeff[1] * coeff[1]
        + 2.0 * (corr[4] * coeff[0] * coeff[1] - corr[1] * coeff[0] - corr[3] * coeff[1])
}

/// Same as [`eval`], for coefficients that came out of [`solve`] for this
/// exact matrix. At the optimum the quadratic terms cancel half of the
/// linear ones, which leaves `k - B^T x`.
pub fn eval_solved(corr: &[f64; 6], coeff: &[f64; 2]) -> f64 {
    corr[0] - corr[1] * coeff[0] - corr[3] * coeff[1]
}

/// Coefficients minimizing [`eval`] for an autocorrelation matrix.
///
/// Solves the normal equations with Gaussian elimination and partial
/// pivoting. A matrix that is close to zero gives zero coefficients; a
/// singular one falls back to a first-order predictor.
pub fn solve(corr: &[f64; 6]) -> [f64; 2] {
    let mut coeff = [0.0; 2];

    // largest element is on the diagonal (Cauchy-Schwarz)
    let max = corr[0].max(corr[2]).max(corr[5]);
    let epsilon = max * RELATIVE_EPSILON;

    // [a b | x]
    // [b c | y]
    let (mut a, b, mut c) = (corr[2], corr[4], corr[5]);
    let (mut x, mut y) = (corr[1], corr[3]);

    // a and c are non-negative
    let pivot = usize::from(c > a);
    if pivot == 1 {
        std::mem::swap(&mut a, &mut c);
        std::mem::swap(&mut x, &mut y);
    }

    if a <= epsilon {
        return coeff;
    }
    let b1 = b / a;
    let x1 = x / a;

    let c2 = c - b1 * b;
    let y2 = y - x1 * b;
    if c2.abs() <= epsilon {
        coeff[pivot] = x1;
        return coeff;
    }
    let y3 = y2 / c2;
    let x4 = x1 - y3 * b1;

    coeff[pivot] = x4;
    coeff[1 - pivot] = y3;
    coeff
}

/// Move coefficients into the stable region of a second-order filter.
/// Returns true if they had to be changed.
pub fn stabilize(coeff: &mut [f64; 2]) -> bool {
    if coeff[1] < -1.0 {
        coeff[1] = -1.0;
        coeff[0] = coeff[0].clamp(-1.0, 1.0);
        return true;
    }
    if coeff[0] > 0.0 {
        if coeff[1] + coeff[0] > 1.0 {
            let d = (coeff[1] - coeff[0]).clamp(-3.0, 1.0);
            coeff[0] = 0.5 - 0.5 * d;
            coeff[1] = 0.5 + 0.5 * d;
            return true;
        }
    } else if coeff[1] - coeff[0] > 1.0 {
        let d = (coeff[1] + coeff[0]).clamp(-3.0, 1.0);
        coeff[0] = 0.5 * d - 0.5;
        coeff[1] = 0.5 * d + 0.5;
        return true;
    }
    false
}

fn widen(corr: &Autocorr) -> [f64; 6] {
    corr.map(f64::from)
}

fn narrow(coeff: &[f64; 2]) -> [f32; 2] {
    coeff.map(|c| c as f32)
}

/// Lowest achievable error for each frame with its own optimal predictor
pub fn best_error(corrs: &[Autocorr]) -> Vec<f32> {
    corrs
        .iter()
        .map(|corr| {
            let wide = widen(corr);
            let mut coeff = solve(&wide);
            if stabilize(&mut coeff) {
                eval(corr, &narrow(&coeff))
            } else {
                eval_solved(&wide, &coeff) as f32
            }
        })
        .collect()
}

/// Mean autocorrelation per predictor over the frames assigned to it, and the
/// number of such frames. Frames assigned out of range are ignored.
pub fn mean_corrs(
    corrs: &[Autocorr],
    predictor_count: usize,
    assignments: &[u8],
) -> (Vec<[f64; 6]>, Vec<usize>) {
    let mut sums = vec![[0.0f64; 6]; predictor_count];
    let mut counts = vec![0usize; predictor_count];
    for (corr, &predictor) in corrs.iter().zip(assignments) {
        let predictor = predictor as usize;
        if predictor < predictor_count {
            counts[predictor] += 1;
            for (sum, &value) in sums[predictor].iter_mut().zip(corr) {
                *sum += value as f64;
            }
        }
    }
    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            let scale = 1.0 / count as f64;
            for value in sum.iter_mut() {
                *value *= scale;
            }
        }
    }
    (sums, counts)
}

/// One refinement pass: recompute each used predictor from its frames, drop
/// empty predictors, then move every frame to its best predictor and record
/// that frame's error.
///
/// Returns the index of a predictor left with no frames, or the number of
/// active predictors if all of them are used.
fn refine(
    corrs: &[Autocorr],
    predictor_count: usize,
    error: &mut [f32],
    assignments: &mut [u8],
) -> usize {
    let (pcorr, counts) = mean_corrs(corrs, predictor_count, assignments);
    let coeffs: Vec<[f32; 2]> = pcorr
        .iter()
        .zip(&counts)
        .filter(|(_, &count)| count > 0)
        .map(|(corr, _)| {
            let mut coeff = solve(corr);
            stabilize(&mut coeff);
            narrow(&coeff)
        })
        .collect();

    let mut used = vec![0usize; coeffs.len()];
    for (frame, corr) in corrs.iter().enumerate() {
        let mut best = 0;
        let mut best_err = 0.0f32;
        for (i, coeff) in coeffs.iter().enumerate() {
            let e = eval(corr, coeff);
            if i == 0 || e < best_err {
                best = i;
                best_err = e;
            }
        }
        assignments[frame] = best as u8;
        error[frame] = best_err;
        if let Some(count) = used.get_mut(best) {
            *count += 1;
        }
    }

    used.iter()
        .position(|&count| count == 0)
        .unwrap_or(coeffs.len())
}

/// Frame whose error is furthest above its best case. First one wins ties.
fn worst_frame(best_error: &[f32], error: &[f32]) -> usize {
    let mut worst = 0;
    let mut worst_gap = f32::NEG_INFINITY;
    for (frame, (&err, &best)) in error.iter().zip(best_error).enumerate() {
        let gap = err - best;
        if gap > worst_gap {
            worst_gap = gap;
            worst = frame;
        }
    }
    worst
}

/// Assign one of `predictor_count` predictors to every frame.
///
/// Starts from a single predictor and repeatedly seeds an unused predictor
/// with the worst-served frame, then refines. Deterministic: ties always go
/// to the lowest index.
pub fn assign_predictors(corrs: &[Autocorr], predictor_count: usize) -> Vec<u8> {
    let frame_count = corrs.len();
    let mut assignments = vec![0u8; frame_count];
    if predictor_count <= 1 || frame_count == 0 {
        return assignments;
    }

    let best = best_error(corrs);
    let mut error = vec![0.0f32; frame_count];
    let mut unassigned = predictor_count;
    let mut active = 1;
    for _ in 0..ITERATIONS {
        if unassigned < predictor_count {
            let worst = worst_frame(&best, &error);
            assignments[worst] = unassigned as u8;
            if unassigned >= active {
                active = unassigned + 1;
            }
        }
        unassigned = refine(corrs, active, &mut error, &mut assignments);
    }
    assignments
}

/// Codebook vectors for one predictor.
///
/// Vector 0 is the filter's response to a unit sample two steps back, vector
/// 1 the response to a unit sample one step back. Values are fixed point with
/// [`COEFFICIENT_SHIFT`] fraction bits and saturate at the `i16` range.
pub fn make_vectors(coeff: &[f64; 2]) -> [Vector; ENCODE_ORDER] {
    let unit = (1 << COEFFICIENT_SHIFT) as f64;
    let mut vectors = [[0i16; VECTOR_SIZE]; ENCODE_ORDER];
    for (i, vector) in vectors.iter_mut().enumerate() {
        let (mut x1, mut x2) = if i == 0 { (0.0, unit) } else { (unit, 0.0) };
        for value in vector.iter_mut() {
            let x = coeff[0] * x1 + coeff[1] * x2;
            *value = x.round_ties_even().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            x2 = x1;
            x1 = x;
        }
    }
    vectors
}

/// Optimal codebook for a fixed assignment of frames to predictors.
/// Predictors without frames get zero vectors.
pub fn make_codebook(corrs: &[Autocorr], predictor_count: usize, assignments: &[u8]) -> Codebook {
    let (pcorr, counts) = mean_corrs(corrs, predictor_count, assignments);
    let mut codebook = Codebook::zeroed(ENCODE_ORDER, predictor_count);
    for (index, (corr, &count)) in pcorr.iter().zip(&counts).enumerate() {
        if count == 0 {
            continue;
        }
        let mut coeff = solve(corr);
        stabilize(&mut coeff);
        let start = index * ENCODE_ORDER;
        codebook.vectors[start..start + ENCODE_ORDER].copy_from_slice(&make_vectors(&coeff));
    }
    codebook
}

//! Shared Nelder-Mead round engine behind both [`crate::pro::Pro`] and
//! [`crate::angel::Angel`]. Operates on a caller-supplied scalar rank per
//! vertex so PRO can rank by `Performance::unify` and ANGEL can rank by a
//! penalized single objective, while both reuse the same reflect / expand
//! / shrink state machine and convergence test.

use harmony_model::model::{simplex, Space};

use crate::error::StrategyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Init,
    Reflect,
    ExpandOne,
    ExpandAll,
    Shrink,
    Converged,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimplexParams {
    pub reflect: f64,
    pub expand: f64,
    pub shrink: f64,
    pub converge_fv: f64,
    pub converge_sz: f64,
    /// Extra ANGEL convergence path (a): converged once the reflection
    /// move length (centroid displacement per round) stays below
    /// `dist_tol * space_diameter` for `tol_cnt` consecutive rounds. `None`
    /// disables this path (PRO does not use it).
    pub dist_tol: Option<f64>,
    pub tol_cnt: u32,
    pub space_diameter: f64,
}

/// Consecutive rounds of bit-for-bit identical base ranks before
/// convergence path (c) (SPEC_FULL's "3 consecutive identical moves") fires.
const IDENTICAL_RANK_STREAK_TARGET: u32 = 3;

/// Outcome of completing one round (all `size` vertices reported).
pub(crate) struct RoundOutcome {
    pub best_rank: f64,
    pub best_coords: Vec<f64>,
    pub converged: bool,
}

const MAX_OUT_OF_BOUNDS_RETRIES: u32 = 4;

pub(crate) struct SimplexEngine {
    dim: usize,
    size: usize,
    params: SimplexParams,
    lo: Vec<f64>,
    hi: Vec<f64>,
    state: State,
    base_coords: Vec<Vec<f64>>,
    base_rank: Vec<f64>,
    /// Unpenalized value per base vertex used only for the convergence
    /// test; equal to `base_rank` for PRO (no penalty concept), but the
    /// raw `obj[phase]` rather than the penalized rank for ANGEL.
    base_conv: Vec<f64>,
    best_base: usize,
    pivot_coords: Vec<f64>,
    stash_best_test: usize,
    test_coords: Vec<Vec<f64>>,
    test_rank: Vec<Option<f64>>,
    test_conv: Vec<Option<f64>>,
    reported: usize,
    last_centroid: Option<Vec<f64>>,
    tol_streak: u32,
    last_base_rank: Option<Vec<f64>>,
    identical_streak: u32,
}

impl SimplexEngine {
    /// # Errors
    ///
    /// Returns [`StrategyError::Config`] if the space has a non-numeric
    /// (enum) dimension, since simplex geometry requires real coordinates.
    pub(crate) fn new(space: &Space, size: usize, params: SimplexParams, initial_vertices: Vec<Vec<f64>>) -> Result<Self, StrategyError> {
        let dim = space.len();
        let mut lo = Vec::with_capacity(dim);
        let mut hi = Vec::with_capacity(dim);
        for d in space.iter() {
            match d {
                harmony_model::model::Dimension::Integer { min, max, .. } => {
                    lo.push(*min as f64);
                    hi.push(*max as f64);
                }
                harmony_model::model::Dimension::Real { min, max, .. } => {
                    lo.push(*min);
                    hi.push(*max);
                }
                harmony_model::model::Dimension::Enum { .. } => {
                    return Err(StrategyError::Config { detail: "simplex strategies require numeric dimensions only".into() });
                }
            }
        }
        if initial_vertices.len() != size {
            return Err(StrategyError::Internal { detail: "initial simplex vertex count mismatch".into() });
        }
        Ok(Self {
            dim,
            size,
            params,
            lo,
            hi,
            state: State::Init,
            base_coords: vec![vec![0.0; dim]; size],
            base_rank: vec![f64::INFINITY; size],
            base_conv: vec![f64::INFINITY; size],
            best_base: 0,
            pivot_coords: vec![0.0; dim],
            stash_best_test: 0,
            test_coords: initial_vertices,
            test_rank: vec![None; size],
            test_conv: vec![None; size],
            reported: 0,
            last_centroid: None,
            tol_streak: 0,
            last_base_rank: None,
            identical_streak: 0,
        })
    }

    pub(crate) fn converged(&self) -> bool {
        self.state == State::Converged
    }

    /// Raw (pre-alignment) coordinates for slot `i` of the in-flight test
    /// round. The caller is responsible for aligning to the space and
    /// assigning an id.
    pub(crate) fn test_coords(&self, i: usize) -> &[f64] {
        &self.test_coords[i]
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) fn best_coords(&self) -> Vec<f64> {
        self.base_coords[self.best_base].clone()
    }

    pub(crate) fn best_rank(&self) -> f64 {
        self.base_rank[self.best_base]
    }

    /// Record the observed rank for the test-round slot `i`, along with the
    /// unpenalized value the convergence test should use. Once every slot
    /// of the round has reported, runs the state transition and returns
    /// the new best.
    pub(crate) fn report(&mut self, i: usize, rank: f64, conv_value: f64) -> Option<RoundOutcome> {
        self.test_rank[i] = Some(rank);
        self.test_conv[i] = Some(conv_value);
        self.reported += 1;
        if self.reported < self.size {
            return None;
        }
        self.complete_round();
        Some(RoundOutcome { best_rank: self.best_rank(), best_coords: self.best_coords(), converged: self.converged() })
    }

    fn test_best_idx(&self) -> usize {
        (0..self.size)
            .min_by(|&a, &b| self.test_rank[a].unwrap_or(f64::INFINITY).total_cmp(&self.test_rank[b].unwrap_or(f64::INFINITY)))
            .unwrap_or(0)
    }

    fn complete_round(&mut self) {
        let test_best = self.test_best_idx();
        match self.state {
            State::Init | State::Shrink => {
                self.accept_test_as_base();
                self.best_base = test_best;
                self.enter_reflect();
            }
            State::Reflect => {
                if self.test_rank[test_best].unwrap() < self.base_rank[self.best_base] {
                    self.pivot_coords = self.base_coords[self.best_base].clone();
                    self.accept_test_as_base();
                    self.stash_best_test = test_best;
                    self.state = State::ExpandOne;
                    self.build_expand_one_round();
                } else {
                    self.state = State::Shrink;
                    self.build_shrink_round();
                }
            }
            State::ExpandOne => {
                if self.test_rank[self.stash_best_test].unwrap() < self.base_rank[self.best_base] {
                    self.state = State::ExpandAll;
                    self.build_expand_all_round();
                } else {
                    self.best_base = self.stash_best_test;
                    self.enter_reflect();
                }
            }
            State::ExpandAll => {
                if self.test_rank[test_best].unwrap() < self.base_rank[self.best_base] {
                    self.accept_test_as_base();
                    self.best_base = test_best;
                }
                self.enter_reflect();
            }
            State::Converged => {}
        }
    }

    fn accept_test_as_base(&mut self) {
        for i in 0..self.size {
            self.base_coords[i] = self.test_coords[i].clone();
            self.base_rank[i] = self.test_rank[i].unwrap_or(f64::INFINITY);
            self.base_conv[i] = self.test_conv[i].unwrap_or(f64::INFINITY);
        }
    }

    fn enter_reflect(&mut self) {
        if self.check_converged() {
            self.state = State::Converged;
            return;
        }
        self.state = State::Reflect;
        self.build_reflect_round();
    }

    /// (a) and (c) are the extra ANGEL convergence paths from
    /// SPEC_FULL.md's §4.3.4; they no-op when `dist_tol` is `None` (PRO).
    fn check_converged(&mut self) -> bool {
        if simplex::collapsed(&self.base_coords, 1e-9) {
            return true;
        }

        let centroid = simplex::centroid(&self.base_coords);
        let dist_tol_hit = self.params.dist_tol.is_some_and(|tol| {
            let move_len = self.last_centroid.as_ref().map_or(f64::INFINITY, |prev| simplex::distance(prev, &centroid));
            self.tol_streak = if move_len < tol * self.params.space_diameter { self.tol_streak + 1 } else { 0 };
            self.tol_streak >= self.params.tol_cnt
        });
        self.last_centroid = Some(centroid.clone());

        let identical = self.last_base_rank.as_ref().is_some_and(|prev| {
            prev.len() == self.base_conv.len() && prev.iter().zip(&self.base_conv).all(|(a, b)| (a - b).abs() < 1e-12)
        });
        self.identical_streak = if identical { self.identical_streak + 1 } else { 0 };
        let identical_hit = self.identical_streak >= IDENTICAL_RANK_STREAK_TARGET;
        self.last_base_rank = Some(self.base_conv.clone());

        if dist_tol_hit || identical_hit {
            return true;
        }

        let mean_conv: f64 = self.base_conv.iter().sum::<f64>() / self.size as f64;
        let fv = self.base_conv.iter().map(|r| (r - mean_conv).powi(2)).sum::<f64>() / self.size as f64;
        let max_dist = self.base_coords.iter().map(|c| simplex::distance(c, &centroid)).fold(0.0_f64, f64::max);
        fv < self.params.converge_fv && max_dist < self.params.converge_sz
    }

    fn clamp_round(&mut self) {
        for v in &mut self.test_coords {
            for (x, (lo, hi)) in v.iter_mut().zip(self.lo.iter().zip(self.hi.iter())) {
                *x = x.clamp(*lo, *hi);
            }
        }
    }

    fn all_out_of_bounds(&self) -> bool {
        self.test_coords.iter().all(|v| !simplex::in_bounds(v, &self.lo, &self.hi))
    }

    fn start_round(&mut self) {
        self.test_rank = vec![None; self.size];
        self.test_conv = vec![None; self.size];
        self.reported = 0;
        let mut retries = 0;
        while self.all_out_of_bounds() && retries < MAX_OUT_OF_BOUNDS_RETRIES {
            self.build_shrink_round_raw();
            retries += 1;
        }
        self.clamp_round();
    }

    fn build_reflect_round(&mut self) {
        let pivot = self.base_coords[self.best_base].clone();
        self.test_coords = self.base_coords.iter().map(|v| simplex::transform(&pivot, v, -self.params.reflect)).collect();
        self.start_round();
    }

    fn build_expand_one_round(&mut self) {
        let probe = simplex::transform(&self.pivot_coords, &self.base_coords[self.best_base], self.params.expand);
        self.test_coords = (0..self.size)
            .map(|i| if i == self.stash_best_test { probe.clone() } else { self.base_coords[self.best_base].clone() })
            .collect();
        self.start_round();
    }

    fn build_expand_all_round(&mut self) {
        let pivot = self.base_coords[self.best_base].clone();
        self.test_coords = self.base_coords.iter().map(|v| simplex::transform(&pivot, v, self.params.expand)).collect();
        self.start_round();
    }

    fn build_shrink_round(&mut self) {
        self.build_shrink_round_raw();
        self.clamp_round();
        self.test_rank = vec![None; self.size];
        self.test_conv = vec![None; self.size];
        self.reported = 0;
    }

    fn build_shrink_round_raw(&mut self) {
        let pivot = self.base_coords[self.best_base].clone();
        self.test_coords = self.base_coords.iter().map(|v| simplex::transform(&pivot, v, self.params.shrink)).collect();
    }

    /// Re-seed geometry entirely (used by ANGEL on phase advance).
    pub(crate) fn reseed(&mut self, vertices: Vec<Vec<f64>>) {
        self.state = State::Init;
        self.test_coords = vertices;
        self.test_rank = vec![None; self.size];
        self.test_conv = vec![None; self.size];
        self.reported = 0;
        self.last_centroid = None;
        self.tol_streak = 0;
        self.last_base_rank = None;
        self.identical_streak = 0;
    }

    /// Replace the simplex vertex closest to `anchor` with `anchor` itself
    /// (ANGEL's `ANGEL_ANCHOR` behavior), operating on the in-flight test
    /// round produced by [`Self::reseed`].
    pub(crate) fn anchor_closest(&mut self, anchor: &[f64]) {
        if let Some(closest) = (0..self.test_coords.len()).min_by(|&a, &b| {
            simplex::distance(&self.test_coords[a], anchor).total_cmp(&simplex::distance(&self.test_coords[b], anchor))
        }) {
            self.test_coords[closest] = anchor.to_vec();
        }
    }
}

/// Build an initial simplex of `size` vertices around `center`, perturbing
/// outward by `percent` of each dimension's range. `balanced` selects the
/// `point` construction (every vertex perturbs every axis a little);
/// `!balanced` selects `point_fast` (each vertex perturbs exactly one axis).
pub(crate) fn seed_point_simplex(center: &[f64], lo: &[f64], hi: &[f64], size: usize, percent: f64, balanced: bool) -> Vec<Vec<f64>> {
    let dim = center.len();
    let mut vertices = Vec::with_capacity(size);
    vertices.push(center.to_vec());
    for k in 1..size {
        let axis = (k - 1) % dim;
        let mut v = center.to_vec();
        if balanced {
            for (i, x) in v.iter_mut().enumerate() {
                let range = hi[i] - lo[i];
                let sign = if i == axis { 1.0 } else { -1.0 };
                *x += sign * percent * range / (dim as f64).sqrt();
            }
        } else {
            let range = hi[axis] - lo[axis];
            v[axis] += percent * range;
        }
        vertices.push(v);
    }
    vertices
}

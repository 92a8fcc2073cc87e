//! PRO: a Nelder-Mead simplex strategy with a reflect / expand-one /
//! expand-all / shrink state machine (see [`crate::simplex_engine`]).

use rand::rngs::SmallRng;
use rand::SeedableRng;

use harmony_model::config::{ConfigStore, OptionInfo};
use harmony_model::model::{Performance, Point, Space};

use crate::contract::{Flow, FlowStatus, Strategy};
use crate::error::StrategyError;
use crate::simplex_engine::{seed_point_simplex, SimplexEngine, SimplexParams};

pub struct Pro {
    space: Option<Space>,
    engine: Option<SimplexEngine>,
    slot_ids: Vec<u32>,
    next_id: u32,
    best_point: Point,
    best_rank: f64,
}

impl std::fmt::Debug for Pro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pro").field("next_id", &self.next_id).field("best_rank", &self.best_rank).finish_non_exhaustive()
    }
}

impl Default for Pro {
    fn default() -> Self {
        Self { space: None, engine: None, slot_ids: Vec::new(), next_id: 1, best_point: Point::none(), best_rank: f64::INFINITY }
    }
}

impl Pro {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bounding_diagonal(space: &Space) -> f64 {
        let mut acc = 0.0;
        for d in space.iter() {
            let span = match d {
                harmony_model::model::Dimension::Integer { min, max, .. } => (*max - *min) as f64,
                harmony_model::model::Dimension::Real { min, max, .. } => max - min,
                harmony_model::model::Dimension::Enum { .. } => 0.0,
            };
            acc += span * span;
        }
        acc.sqrt()
    }

    /// Report `rank` for `slot` and, if that completes the round, absorb
    /// the new best and reset the slot map. Shared by `analyze`'s ordinary
    /// path and `rejected`'s no-hint infinite-penalty fallback.
    fn close_round_if_done(&mut self, slot: usize, rank: f64, conv_value: f64) -> Result<(), StrategyError> {
        let engine = self.engine.as_mut().ok_or_else(|| StrategyError::Internal { detail: "analyze called before init".into() })?;
        if let Some(outcome) = engine.report(slot, rank, conv_value) {
            self.slot_ids = vec![0; engine.size()];
            if outcome.best_rank < self.best_rank {
                self.best_rank = outcome.best_rank;
                let space = self.space.clone().unwrap();
                self.best_point = Point::from_coords(0, &outcome.best_coords, &space)?;
            }
            if outcome.converged {
                log::info!("converged at rank {}", self.best_rank);
            }
        }
        Ok(())
    }
}

impl Strategy for Pro {
    fn init(&mut self, space: &Space, config: &mut ConfigStore) -> Result<(), StrategyError> {
        config.register(&[
            OptionInfo::new("SIMPLEX_SIZE", "0", "simplex vertex count; 0 means space.len()+1"),
            OptionInfo::new("INIT_METHOD", "point", "random | point | point_fast"),
            OptionInfo::new("INIT_PERCENT", "0.35", "fraction of each dimension's range used to perturb the initial simplex"),
            OptionInfo::new("INIT_POINT", "", "center of the initial simplex; empty uses the geometric center"),
            OptionInfo::new("REFLECT", "1.0", "reflection coefficient, must be > 0"),
            OptionInfo::new("EXPAND", "2.0", "expansion coefficient, must be > REFLECT"),
            OptionInfo::new("CONTRACT", "0.5", "contraction coefficient, must be in (0, 1)"),
            OptionInfo::new("SHRINK", "0.5", "shrink coefficient, must be in (0, 1)"),
            OptionInfo::new("CONVERGE_FV", "1e-4", "performance-variance convergence threshold"),
            OptionInfo::new("CONVERGE_SZ", "", "simplex-size convergence threshold; empty derives 0.5% of the space diagonal"),
            OptionInfo::new("RANDOM_SEED", "", "fixed seed for INIT_METHOD=random; empty uses OS entropy"),
        ]);

        let reflect = config.real("REFLECT")?;
        let expand = config.real("EXPAND")?;
        let contract = config.real("CONTRACT")?;
        let shrink = config.real("SHRINK")?;
        let converge_fv = config.real("CONVERGE_FV")?;
        if reflect <= 0.0 {
            return Err(StrategyError::Config { detail: "REFLECT must be > 0".into() });
        }
        if expand <= reflect {
            return Err(StrategyError::Config { detail: "EXPAND must be > REFLECT".into() });
        }
        if !(0.0..1.0).contains(&contract) {
            return Err(StrategyError::Config { detail: "CONTRACT must be in (0, 1)".into() });
        }
        if !(0.0..1.0).contains(&shrink) {
            return Err(StrategyError::Config { detail: "SHRINK must be in (0, 1)".into() });
        }

        let diag = Self::bounding_diagonal(space);
        let converge_sz_raw = config.get_or("CONVERGE_SZ", "");
        let converge_sz = if converge_sz_raw.is_empty() {
            0.005 * diag
        } else {
            converge_sz_raw.parse::<f64>().map_err(|_| StrategyError::Config { detail: "CONVERGE_SZ must be a real number".into() })?
        };

        let configured_size = config.int("SIMPLEX_SIZE")? as usize;
        let size = configured_size.max(space.len() + 1);

        let init_point: Option<Point> = {
            let raw = config.get_or("INIT_POINT", "");
            if raw.is_empty() { None } else { Some(Point::parse(0, &raw, space)?) }
        };
        let center: Vec<f64> = match &init_point {
            Some(p) => p.terms.iter().filter_map(harmony_model::model::Value::as_real).collect(),
            None => space
                .iter()
                .map(|d| match d {
                    harmony_model::model::Dimension::Integer { min, max, .. } => (*min as f64 + *max as f64) / 2.0,
                    harmony_model::model::Dimension::Real { min, max, .. } => (min + max) / 2.0,
                    harmony_model::model::Dimension::Enum { .. } => 0.0,
                })
                .collect(),
        };

        let method = config.get_or("INIT_METHOD", "point");
        let (lo, hi): (Vec<f64>, Vec<f64>) = space
            .iter()
            .map(|d| match d {
                harmony_model::model::Dimension::Integer { min, max, .. } => (*min as f64, *max as f64),
                harmony_model::model::Dimension::Real { min, max, .. } => (*min, *max),
                harmony_model::model::Dimension::Enum { .. } => (0.0, 0.0),
            })
            .unzip();
        let percent = config.real("INIT_PERCENT")?;
        let vertices = if method == "random" {
            let seed_raw = config.get_or("RANDOM_SEED", "");
            let mut rng = if seed_raw.is_empty() {
                SmallRng::from_os_rng()
            } else {
                let seed = seed_raw.parse::<u64>().map_err(|_| StrategyError::Config { detail: "RANDOM_SEED must be an integer".into() })?;
                SmallRng::seed_from_u64(seed)
            };
            (0..size).map(|_| space.iter().map(|d| d.random(&mut rng).as_real().unwrap_or(0.0)).collect()).collect()
        } else {
            seed_point_simplex(&center, &lo, &hi, size, percent, method == "point")
        };

        let params = SimplexParams { reflect, expand, shrink, converge_fv, converge_sz, dist_tol: None, tol_cnt: 0, space_diameter: diag };
        self.engine = Some(SimplexEngine::new(space, size, params, vertices)?);
        self.space = Some(space.clone());
        self.slot_ids = vec![0; size];
        self.next_id = 1;
        self.best_point = Point::none();
        self.best_rank = f64::INFINITY;
        Ok(())
    }

    fn generate(&mut self, flow: &mut Flow) -> Result<Point, StrategyError> {
        let space = self.space.clone().ok_or_else(|| StrategyError::Internal { detail: "generate called before init".into() })?;
        let engine = self.engine.as_mut().ok_or_else(|| StrategyError::Internal { detail: "generate called before init".into() })?;
        let slot = self.slot_ids.iter().position(|&id| id == 0);
        let Some(slot) = slot else {
            flow.status = FlowStatus::Wait;
            return Ok(Point::none());
        };
        let coords = engine.test_coords(slot).to_vec();
        let id = self.next_id;
        self.next_id += 1;
        self.slot_ids[slot] = id;
        let point = Point::from_coords(id, &coords, &space)?;
        flow.status = FlowStatus::Accept;
        Ok(point)
    }

    fn rejected(&mut self, point: &Point, flow: &Flow) -> Result<Point, StrategyError> {
        if !flow.hint.is_none() {
            return Ok(flow.hint.clone());
        }
        // No hint to substitute: apply an infinite penalty to the slot this
        // candidate occupied, as if it had been reported with
        // `Performance::worst`, and step the simplex forward on that basis
        // rather than stalling the search on a single pipeline veto.
        if let Some(slot) = self.slot_ids.iter().position(|&id| id == point.id) {
            let worst = Performance::worst(1).unify();
            self.close_round_if_done(slot, worst, worst)?;
        }
        let mut scratch = Flow::accept();
        self.generate(&mut scratch)
    }

    fn analyze(&mut self, point: &Point, perf: &Performance) -> Result<(), StrategyError> {
        let Some(slot) = self.slot_ids.iter().position(|&id| id == point.id) else {
            return Ok(());
        };
        let unified = perf.unify();
        self.close_round_if_done(slot, unified, unified)
    }

    fn best(&self) -> Point {
        self.best_point.clone()
    }

    fn converged(&self) -> bool {
        self.engine.as_ref().is_some_and(SimplexEngine::converged)
    }
}

//! Random: uniformly samples every dimension independently. Never converges.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use harmony_model::config::{ConfigStore, OptionInfo};
use harmony_model::model::{Performance, Point, Space};

use crate::contract::{Flow, FlowStatus, Strategy};
use crate::error::StrategyError;

pub struct Random {
    space: Option<Space>,
    rng: SmallRng,
    next_id: u32,
    init_point: Option<Point>,
    best_point: Point,
    best_perf: Option<Performance>,
}

impl std::fmt::Debug for Random {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Random").field("next_id", &self.next_id).finish_non_exhaustive()
    }
}

impl Default for Random {
    fn default() -> Self {
        Self { space: None, rng: SmallRng::seed_from_u64(0), next_id: 1, init_point: None, best_point: Point::none(), best_perf: None }
    }
}

impl Random {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sample(&mut self) -> Point {
        if let Some(p) = self.init_point.take() {
            return Point::new(self.next_id, p.terms);
        }
        let space = self.space.as_ref().expect("sample called before init");
        let terms = space.iter().map(|d| d.random(&mut self.rng)).collect();
        Point::new(self.next_id, terms)
    }
}

impl Strategy for Random {
    fn init(&mut self, space: &Space, config: &mut ConfigStore) -> Result<(), StrategyError> {
        config.register(&[
            OptionInfo::new("RANDOM_SEED", "", "fixed seed for reproducible sampling; empty uses OS entropy"),
            OptionInfo::new("INIT_POINT", "", "first point to return, before random sampling begins"),
        ]);
        let seed_raw = config.get_or("RANDOM_SEED", "");
        let rng = if seed_raw.is_empty() {
            SmallRng::from_os_rng()
        } else {
            let seed = seed_raw.parse::<u64>().map_err(|_| StrategyError::Config { detail: "RANDOM_SEED must be an integer".into() })?;
            SmallRng::seed_from_u64(seed)
        };
        let init_point_raw = config.get_or("INIT_POINT", "");
        let init_point = if init_point_raw.is_empty() { None } else { Some(Point::parse(0, &init_point_raw, space)?) };
        *self = Self { space: Some(space.clone()), rng, next_id: 1, init_point, best_point: Point::none(), best_perf: None };
        Ok(())
    }

    fn generate(&mut self, flow: &mut Flow) -> Result<Point, StrategyError> {
        let point = self.sample();
        self.next_id += 1;
        flow.status = FlowStatus::Accept;
        Ok(point)
    }

    fn rejected(&mut self, _point: &Point, flow: &Flow) -> Result<Point, StrategyError> {
        if !flow.hint.is_none() {
            return Ok(flow.hint.clone());
        }
        let mut scratch = Flow::accept();
        self.generate(&mut scratch)
    }

    fn analyze(&mut self, point: &Point, perf: &Performance) -> Result<(), StrategyError> {
        let better = match &self.best_perf {
            None => true,
            Some(best) => perf.unify() < best.unify(),
        };
        if better {
            self.best_point = point.clone();
            self.best_perf = Some(perf.clone());
        }
        Ok(())
    }

    fn best(&self) -> Point {
        self.best_point.clone()
    }

    fn converged(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmony_model::model::Dimension;

    fn space() -> Space {
        Space::new(vec![Dimension::integer("i", 0, 100, 1).unwrap()]).unwrap()
    }

    #[test]
    fn never_converges() {
        let mut r = Random::new();
        let mut config = ConfigStore::new();
        config.set("RANDOM_SEED", "1");
        r.init(&space(), &mut config).unwrap();
        for _ in 0..50 {
            let mut flow = Flow::accept();
            let p = r.generate(&mut flow).unwrap();
            r.analyze(&p, &Performance::new(vec![1.0])).unwrap();
        }
        assert!(!r.converged());
    }

    #[test]
    fn honors_init_point_first() {
        let mut r = Random::new();
        let mut config = ConfigStore::new();
        config.set("RANDOM_SEED", "1");
        config.set("INIT_POINT", "(42)");
        r.init(&space(), &mut config).unwrap();
        let mut flow = Flow::accept();
        let p = r.generate(&mut flow).unwrap();
        assert_eq!(p.terms[0].as_int(), Some(42));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut config_a = ConfigStore::new();
        config_a.set("RANDOM_SEED", "99");
        let mut a = Random::new();
        a.init(&space(), &mut config_a).unwrap();

        let mut config_b = ConfigStore::new();
        config_b.set("RANDOM_SEED", "99");
        let mut b = Random::new();
        b.init(&space(), &mut config_b).unwrap();

        for _ in 0..10 {
            let mut fa = Flow::accept();
            let mut fb = Flow::accept();
            assert_eq!(a.generate(&mut fa).unwrap(), b.generate(&mut fb).unwrap());
        }
    }
}

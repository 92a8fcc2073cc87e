//! Exhaustive: visits every legal grid point exactly once per pass,
//! odometer-style (least-significant dimension increments fastest).

use harmony_model::config::{ConfigStore, OptionInfo};
use harmony_model::model::{Dimension, Performance, Point, Space, Value};

use crate::contract::{Flow, FlowStatus, Strategy};
use crate::error::StrategyError;

#[derive(Debug, Clone)]
pub struct Exhaustive {
    space: Option<Space>,
    /// Current odometer position, one index (or real value) per dimension.
    next: Vec<u64>,
    /// Real-dimension cursors, parallel to `next` but only meaningful where
    /// the dimension is real (tracked separately since reals are not
    /// indexable).
    real_cursor: Vec<Option<f64>>,
    next_id: u32,
    passes_remaining: u32,
    done: bool,
    final_id: u32,
    final_point_received: bool,
    outstanding_points: u32,
    best_point: Point,
    best_perf: Option<Performance>,
}

impl Default for Exhaustive {
    fn default() -> Self {
        Self {
            space: None,
            next: Vec::new(),
            real_cursor: Vec::new(),
            next_id: 1,
            passes_remaining: 1,
            done: false,
            final_id: 0,
            final_point_received: false,
            outstanding_points: 0,
            best_point: Point::none(),
            best_perf: None,
        }
    }
}

impl Exhaustive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn current_point(&self, space: &Space) -> Point {
        let terms = (0..space.len())
            .map(|i| match space.dimension(i) {
                Dimension::Integer { .. } | Dimension::Enum { .. } => space.dimension(i).value(self.next[i]),
                Dimension::Real { min, .. } => Value::Real(self.real_cursor[i].unwrap_or(*min)),
            })
            .collect();
        Point::new(self.next_id, terms)
    }

    /// Advance the odometer by one step. Returns `true` if this step
    /// wrapped every dimension back to its start (a full pass completed).
    fn advance(&mut self, space: &Space) -> bool {
        for i in (0..space.len()).rev() {
            match space.dimension(i) {
                Dimension::Real { min, max, .. } => {
                    let cur = self.real_cursor[i].unwrap_or(*min);
                    let stepped = next_above(cur);
                    if stepped > *max {
                        self.real_cursor[i] = Some(*min);
                    } else {
                        self.real_cursor[i] = Some(stepped);
                        return false;
                    }
                }
                dim => {
                    self.next[i] += 1;
                    if self.next[i] >= dim.limit() {
                        self.next[i] = 0;
                    } else {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// The smallest representable `f64` strictly greater than `x`.
fn next_above(x: f64) -> f64 {
    if x.is_infinite() || x.is_nan() {
        return x;
    }
    let bits = x.to_bits();
    let next_bits = if x >= 0.0 { bits + 1 } else { bits - 1 };
    f64::from_bits(next_bits)
}

impl Strategy for Exhaustive {
    fn init(&mut self, space: &Space, config: &mut ConfigStore) -> Result<(), StrategyError> {
        config.register(&[OptionInfo::new("PASSES", "1", "number of full passes over the grid before converging")]);
        let passes = config.get_or("PASSES", "1").parse::<u32>().map_err(|_| StrategyError::Config {
            detail: "PASSES must be a positive integer".into(),
        })?;
        if passes == 0 {
            return Err(StrategyError::Config { detail: "PASSES must be at least 1".into() });
        }
        *self = Self { passes_remaining: passes, ..Self::default() };
        self.next = vec![0; space.len()];
        self.real_cursor = vec![None; space.len()];
        self.space = Some(space.clone());
        Ok(())
    }

    fn generate(&mut self, flow: &mut Flow) -> Result<Point, StrategyError> {
        let space = self.space.clone().ok_or_else(|| StrategyError::Internal { detail: "generate called before init".into() })?;
        if self.done {
            flow.status = FlowStatus::Wait;
            return Ok(Point::none());
        }
        let point = self.current_point(&space);
        self.next_id += 1;
        self.outstanding_points += 1;
        let wrapped = self.advance(&space);
        if wrapped {
            self.passes_remaining -= 1;
            if self.passes_remaining == 0 {
                self.done = true;
                self.final_id = point.id;
            }
        }
        flow.status = FlowStatus::Accept;
        Ok(point)
    }

    fn rejected(&mut self, _point: &Point, flow: &Flow) -> Result<Point, StrategyError> {
        // The original candidate that was generated for this slot is being
        // discarded; release its count before accounting for whatever
        // takes its place, so the two net to zero either way.
        self.outstanding_points = self.outstanding_points.saturating_sub(1);
        if !flow.hint.is_none() {
            self.outstanding_points += 1;
            return Ok(flow.hint.clone());
        }
        let mut scratch = Flow::accept();
        self.generate(&mut scratch)
    }

    fn cancelled(&mut self, _point: &Point) -> Result<(), StrategyError> {
        self.outstanding_points = self.outstanding_points.saturating_sub(1);
        Ok(())
    }

    fn analyze(&mut self, point: &Point, perf: &Performance) -> Result<(), StrategyError> {
        self.outstanding_points = self.outstanding_points.saturating_sub(1);
        if point.id == self.final_id && self.final_id != 0 {
            self.final_point_received = true;
        }
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
        self.final_point_received && self.outstanding_points == 0
    }
}

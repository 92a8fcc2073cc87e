//! The strategy contract: the capability set every concrete search
//! strategy exposes, and the flow-control record it shares with the
//! pipeline.

use harmony_model::config::ConfigStore;
use harmony_model::model::{Performance, Point, Space};

use crate::error::StrategyError;

/// Outcome of a pipeline or strategy decision about one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Proceed to the next pipeline stage (forward) or accept into the
    /// strategy (reverse).
    Accept,
    /// Abort the current direction; the strategy's `rejected` is invoked.
    Reject,
    /// Park the trial; no candidate is available yet.
    Wait,
    /// Short-circuit: deliver (forward) or discard (reverse) immediately.
    Return,
    /// Ask the strategy to generate again from scratch.
    Retry,
}

/// The control record threaded through a pipeline pass. `hint` carries a
/// replacement point on [`FlowStatus::Reject`]; [`Point::none`] means no
/// hint was supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub status: FlowStatus,
    pub hint: Point,
}

impl Flow {
    #[must_use]
    pub fn accept() -> Self {
        Self { status: FlowStatus::Accept, hint: Point::none() }
    }

    #[must_use]
    pub fn wait() -> Self {
        Self { status: FlowStatus::Wait, hint: Point::none() }
    }

    #[must_use]
    pub fn reject_with_hint(hint: Point) -> Self {
        Self { status: FlowStatus::Reject, hint }
    }
}

/// The operations every search strategy implements. A strategy owns its
/// monotonic id counter and best-so-far bookkeeping; the session core owns
/// everything about the trials moving through the pipeline around it.
pub trait Strategy {
    /// Reset strategy state for `space`. Idempotent when called again with
    /// an equal space; re-initializes when the space differs.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if `config` holds an invalid tunable for
    /// this strategy.
    fn init(&mut self, space: &Space, config: &mut ConfigStore) -> Result<(), StrategyError>;

    /// Produce the next candidate point, or set `flow.status =
    /// FlowStatus::Wait` if none is available yet.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] on an internal state-machine fault.
    fn generate(&mut self, flow: &mut Flow) -> Result<Point, StrategyError>;

    /// Called when the pipeline or client rejected `point`, a previously
    /// generated candidate. If `flow.hint` is not [`Point::none`], the
    /// strategy incorporates it as the replacement and echoes it back.
    /// Otherwise the strategy applies an infinite penalty to `point` as if
    /// it had been reported with [`Performance::worst`], steps its own
    /// state machine forward on that basis, and generates a fresh
    /// candidate by its own method — rejection with no hint must still
    /// make forward progress, never abort the search.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] on an internal state-machine fault.
    fn rejected(&mut self, point: &Point, flow: &Flow) -> Result<Point, StrategyError>;

    /// Called when a previously generated point is discarded on the
    /// reverse pass (a pipeline stage's `analyze` rejected it) with no
    /// replacement ever reaching the client. Unlike [`Strategy::rejected`],
    /// there is nothing to echo back: the point simply never gets a
    /// matching `analyze` call. Strategies that track their own
    /// outstanding-candidate counts (e.g. [`crate::exhaustive::Exhaustive`])
    /// override this to release that bookkeeping; strategies that track
    /// outstanding candidates by slot membership instead (PRO, ANGEL) have
    /// nothing to release and keep the default no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] on an internal state-machine fault.
    fn cancelled(&mut self, _point: &Point) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Feed back an observed performance for a previously generated point.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if `point` was never produced by this
    /// strategy's own counter, or on an internal state-machine fault.
    fn analyze(&mut self, point: &Point, perf: &Performance) -> Result<(), StrategyError>;

    /// The best point observed so far, or [`Point::none`] before any report.
    fn best(&self) -> Point;

    /// `true` once the strategy has decided no further improvement is
    /// being sought.
    fn converged(&self) -> bool;

    /// The current lexicographic phase, for multi-objective strategies that
    /// have one. `None` for strategies without phases.
    fn phase(&self) -> Option<usize> {
        None
    }
}

//! The session core: owns configuration, space, strategy, and pipeline;
//! tracks outstanding trials; exposes the client protocol.

use std::collections::HashMap;

use harmony_model::config::ConfigStore;
use harmony_model::model::{Performance, Point, Space};
use harmony_strategy::{Flow, FlowStatus, Strategy};

use crate::error::SessionError;
use crate::pipeline::Pipeline;
use crate::trial::{Trial, TrialStatus};

const MAX_RETRY_LOOPS: u32 = 8;

/// `FETCH`'s response: either a fresh candidate (plus the current best, if
/// the caller hadn't seen it yet), or `Busy` if the strategy has nothing
/// ready.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Busy,
    Point { point: Point, best: Option<Point> },
}

pub struct Session {
    config: ConfigStore,
    space: Space,
    strategy: Box<dyn Strategy>,
    pipeline: Pipeline,
    trials: HashMap<u32, Trial>,
}

impl Session {
    /// # Errors
    ///
    /// Returns [`SessionError`] if the strategy or any pipeline stage
    /// rejects `config` for `space`; fatal to session startup.
    pub fn new(space: Space, mut config: ConfigStore, mut strategy: Box<dyn Strategy>, mut pipeline: Pipeline) -> Result<Self, SessionError> {
        strategy.init(&space, &mut config)?;
        pipeline.init(&space, &mut config)?;
        Ok(Self { config, space, strategy, pipeline, trials: HashMap::new() })
    }

    #[must_use]
    pub fn space(&self) -> &Space {
        &self.space
    }

    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.trials.len()
    }

    pub fn join(&mut self, client_id: &str) {
        log::debug!("JOIN client_id={client_id}");
        self.pipeline.join(client_id);
    }

    /// # Errors
    ///
    /// Returns [`SessionError`] if the strategy or a pipeline stage faults.
    /// A stage rejecting every candidate for `MAX_RETRY_LOOPS` consecutive
    /// `RETRY`s surfaces as [`SessionError::StageFault`] rather than
    /// looping forever.
    pub fn fetch(&mut self, best_prev_id: u32) -> Result<FetchOutcome, SessionError> {
        log::debug!("FETCH best_prev_id={best_prev_id}");
        // A forward-parked point whose stage is now ready takes priority
        // over generating a new candidate: it has been waiting longer and
        // the strategy already committed an id to it.
        if let Some((point, flow)) = self.pipeline.resume_forward()? {
            return self.finish_forward_flow(point, flow, best_prev_id);
        }
        for _ in 0..MAX_RETRY_LOOPS {
            let mut flow = Flow::accept();
            let point = self.strategy.generate(&mut flow)?;
            if flow.status == FlowStatus::Wait {
                return Ok(FetchOutcome::Busy);
            }
            self.pipeline.run_forward(&mut flow, &point)?;
            if flow.status == FlowStatus::Retry {
                continue;
            }
            return self.finish_forward_flow(point, flow, best_prev_id);
        }
        Err(SessionError::StageFault { stage: "pipeline".into(), detail: "forward pass retried past its budget".into() })
    }

    fn finish_forward_flow(&mut self, point: Point, flow: Flow, best_prev_id: u32) -> Result<FetchOutcome, SessionError> {
        match flow.status {
            FlowStatus::Accept | FlowStatus::Return => {
                Ok(FetchOutcome::Point { point: self.admit(point), best: self.best_if_newer(best_prev_id) })
            }
            // A stage further down the pipeline parked the point again; the
            // pipeline already re-queued it, so the client just sees BUSY.
            FlowStatus::Wait => Ok(FetchOutcome::Busy),
            FlowStatus::Reject => {
                let replacement = self.strategy.rejected(&point, &flow)?;
                Ok(FetchOutcome::Point { point: self.admit(replacement), best: self.best_if_newer(best_prev_id) })
            }
            FlowStatus::Retry => unreachable!("the caller's loop consumes Retry before reaching here"),
        }
    }

    fn admit(&mut self, point: Point) -> Point {
        self.trials.insert(point.id, Trial::new(point.clone()));
        point
    }

    fn best_if_newer(&self, known_id: u32) -> Option<Point> {
        let best = self.strategy.best();
        (!best.is_none() && best.id > known_id).then_some(best)
    }

    /// # Errors
    ///
    /// Returns [`SessionError`] if the strategy's `analyze`/`rejected` or a
    /// pipeline stage faults. A report for an id the session never issued
    /// is accepted as a no-op.
    pub fn report(&mut self, point_id: u32, perf: Performance) -> Result<(), SessionError> {
        log::debug!("REPORT id={point_id}");
        // Service one reverse-parked trial whose stage is now ready before
        // handling the trial this call actually named; both directions of
        // the pipeline are serviced opportunistically, one per request, so
        // neither starves the other under a steady stream of requests.
        if let Some((parked, flow)) = self.pipeline.resume_reverse()? {
            self.finish_reverse_flow(parked, flow)?;
        }

        let Some(mut trial) = self.trials.remove(&point_id) else {
            return Ok(());
        };
        trial.perf = Some(perf);
        trial.status = TrialStatus::PipelineRev;

        let mut flow = Flow::accept();
        if let Err(e) = self.pipeline.run_reverse(&mut flow, &trial) {
            log::warn!("REPORT id={point_id} stage fault: {e}");
            return Err(e);
        }
        self.finish_reverse_flow(trial, flow)?;
        self.publish_strategy_state();
        Ok(())
    }

    fn finish_reverse_flow(&mut self, trial: Trial, flow: Flow) -> Result<(), SessionError> {
        match flow.status {
            FlowStatus::Accept | FlowStatus::Return | FlowStatus::Retry => {
                let perf = trial.perf.as_ref().expect("a reverse-pass trial always carries a reported performance");
                self.strategy.analyze(&trial.point, perf)?;
            }
            FlowStatus::Reject => {
                // Reverse-pass rejection has no forward stage left to hand
                // a replacement to, so there is nothing to echo back; the
                // strategy only needs to release whatever it was holding
                // for this point, not generate a substitute.
                self.strategy.cancelled(&trial.point)?;
            }
            // The pipeline already re-parked it under its own stage index;
            // there is nothing left for the session to track here.
            FlowStatus::Wait => {}
        }
        Ok(())
    }

    /// Mirror the strategy's convergence flag and (if it has one) its
    /// lexicographic phase into `config` so external readers of `config`
    /// see them update as soon as a report moves the strategy forward.
    fn publish_strategy_state(&mut self) {
        self.config.set("CONVERGED", if self.strategy.converged() { "1" } else { "0" });
        if let Some(phase) = self.strategy.phase() {
            self.config.set("ANGEL_PHASE", phase.to_string());
        }
    }

    #[must_use]
    pub fn best(&self) -> Point {
        self.strategy.best()
    }

    #[must_use]
    pub fn converged(&self) -> bool {
        self.strategy.converged()
    }

    /// # Errors
    ///
    /// Returns [`SessionError::UnknownId`] if `point_id` has no outstanding
    /// trial.
    pub fn kill(&mut self, point_id: u32) -> Result<(), SessionError> {
        log::debug!("KILL id={point_id}");
        self.trials.remove(&point_id).map(|_| ()).ok_or(SessionError::UnknownId { id: point_id })
    }
}

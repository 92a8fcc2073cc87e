//! The processing pipeline: an ordered list of [`Stage`]s that every
//! generated point passes through on the way out, and every report passes
//! through on the way back.

use harmony_model::config::ConfigStore;
use harmony_model::model::{Point, Space};
use harmony_strategy::{Flow, FlowStatus};

use crate::error::SessionError;
use crate::trial::{Trial, TrialStatus};

/// One stage of the pipeline. Every method has a default no-op/accept
/// implementation so a concrete stage only overrides what it cares about.
pub trait Stage {
    fn name(&self) -> &str;

    /// Allocate per-session context. Called once, before `init`.
    fn alloc(&mut self) {}

    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if the stage's setup fails;
    /// fatal to session startup.
    fn init(&mut self, _space: &Space, _config: &mut ConfigStore) -> Result<(), SessionError> {
        Ok(())
    }

    fn join(&mut self, _client_id: &str) {}

    /// Forward-pass hook: inspect/veto a point on its way to the client.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] on an unrecoverable stage fault.
    fn generate(&mut self, _flow: &mut Flow, _point: &Point) -> Result<(), SessionError> {
        Ok(())
    }

    /// Reverse-pass hook: inspect a trial's reported performance.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] on an unrecoverable stage fault.
    fn analyze(&mut self, _flow: &mut Flow, _trial: &Trial) -> Result<(), SessionError> {
        Ok(())
    }

    /// Polled for every trial this stage has parked with
    /// [`FlowStatus::Wait`], once per pipeline pump. A stage that never
    /// returns `Wait` never needs to override this; the default `true`
    /// would just mean "resume immediately" for a stage that can't park
    /// anything in the first place.
    fn is_ready(&self, _id: u32) -> bool {
        true
    }

    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if teardown fails; fatal.
    fn fini(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// The configured stage chain. Forward pass runs stages in list order;
/// reverse pass runs them in reverse. A stage that returns
/// [`FlowStatus::Wait`] parks the trial here, keyed by the index of the
/// stage that parked it (`Trial::stage_cursor`), instead of dropping it;
/// `resume_forward`/`resume_reverse` poll that stage's `is_ready` and, once
/// it reports true, continue the pass from the stage immediately after (or
/// before, on the reverse pass) the one that parked it.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    parked: Vec<Trial>,
}

impl Pipeline {
    #[must_use]
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages, parked: Vec::new() }
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name())
    }

    #[must_use]
    pub fn parked_count(&self) -> usize {
        self.parked.len()
    }

    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if any stage's `init` fails.
    pub fn init(&mut self, space: &Space, config: &mut ConfigStore) -> Result<(), SessionError> {
        for stage in &mut self.stages {
            stage.alloc();
            stage.init(space, config).map_err(|e| wrap_fault(stage.name(), e))?;
        }
        Ok(())
    }

    pub fn join(&mut self, client_id: &str) {
        for stage in &mut self.stages {
            stage.join(client_id);
        }
    }

    /// Run the forward pass, stopping at the first stage that does not
    /// leave `flow.status == Accept`. A `Wait` parks `point` at the
    /// stopping stage rather than being reported to the caller as any
    /// other non-`Accept` status; the caller still observes `flow.status
    /// == Wait` and should treat the request as `BUSY`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if a stage's `generate` fails.
    pub fn run_forward(&mut self, flow: &mut Flow, point: &Point) -> Result<(), SessionError> {
        self.run_forward_from(0, flow, point)
    }

    fn run_forward_from(&mut self, start: usize, flow: &mut Flow, point: &Point) -> Result<(), SessionError> {
        for (idx, stage) in self.stages.iter_mut().enumerate().skip(start) {
            if flow.status != FlowStatus::Accept {
                break;
            }
            stage.generate(flow, point).map_err(|e| wrap_fault(stage.name(), e))?;
            if flow.status == FlowStatus::Wait {
                let mut parked = Trial::new(point.clone());
                parked.status = TrialStatus::PipelineFwd;
                parked.stage_cursor = idx;
                self.parked.push(parked);
                return Ok(());
            }
        }
        Ok(())
    }

    /// Look for a forward-parked trial whose parking stage now reports
    /// ready, and if one exists, continue its pass from the stage after
    /// the one that parked it. Returns `None` if nothing is ready (or
    /// nothing is parked); `Some` carries the point and the flow the
    /// continued pass left it in (never `Wait` — a stage that waits again
    /// re-parks internally and this call reports nothing resumed yet).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if the continued pass faults.
    pub fn resume_forward(&mut self) -> Result<Option<(Point, Flow)>, SessionError> {
        let mut ready_at = None;
        for (i, t) in self.parked.iter().enumerate() {
            if t.status == TrialStatus::PipelineFwd && self.stages[t.stage_cursor].is_ready(t.point.id) {
                ready_at = Some(i);
                break;
            }
        }
        let Some(i) = ready_at else {
            return Ok(None);
        };
        let trial = self.parked.remove(i);
        let mut flow = Flow::accept();
        self.run_forward_from(trial.stage_cursor + 1, &mut flow, &trial.point)?;
        if flow.status == FlowStatus::Wait {
            return Ok(None);
        }
        Ok(Some((trial.point, flow)))
    }

    /// Run the reverse pass (stage order reversed), stopping at the first
    /// stage that does not leave `flow.status == Accept`. A `Wait` parks
    /// `trial` at the stopping stage.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if a stage's `analyze` fails.
    pub fn run_reverse(&mut self, flow: &mut Flow, trial: &Trial) -> Result<(), SessionError> {
        self.run_reverse_from(self.stages.len(), flow, trial)
    }

    fn run_reverse_from(&mut self, start_exclusive: usize, flow: &mut Flow, trial: &Trial) -> Result<(), SessionError> {
        let mut idx = start_exclusive;
        while idx > 0 {
            idx -= 1;
            if flow.status != FlowStatus::Accept {
                break;
            }
            let stage = &mut self.stages[idx];
            stage.analyze(flow, trial).map_err(|e| wrap_fault(stage.name(), e))?;
            if flow.status == FlowStatus::Wait {
                let mut parked = trial.clone();
                parked.status = TrialStatus::PipelineRev;
                parked.stage_cursor = idx;
                self.parked.push(parked);
                return Ok(());
            }
        }
        Ok(())
    }

    /// The reverse-pass counterpart of [`Pipeline::resume_forward`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if the continued pass faults.
    pub fn resume_reverse(&mut self) -> Result<Option<(Trial, Flow)>, SessionError> {
        let mut ready_at = None;
        for (i, t) in self.parked.iter().enumerate() {
            if t.status == TrialStatus::PipelineRev && self.stages[t.stage_cursor].is_ready(t.point.id) {
                ready_at = Some(i);
                break;
            }
        }
        let Some(i) = ready_at else {
            return Ok(None);
        };
        let trial = self.parked.remove(i);
        let mut flow = Flow::accept();
        self.run_reverse_from(trial.stage_cursor, &mut flow, &trial)?;
        if flow.status == FlowStatus::Wait {
            return Ok(None);
        }
        Ok(Some((trial, flow)))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::StageFault`] if any stage's `fini` fails;
    /// fatal to the session (all stages are still given a chance to run).
    pub fn fini(&mut self) -> Result<(), SessionError> {
        let mut first_err = None;
        for stage in &mut self.stages {
            if let Err(e) = stage.fini() {
                first_err.get_or_insert(wrap_fault(stage.name(), e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

fn wrap_fault(stage: &str, e: SessionError) -> SessionError {
    match e {
        SessionError::StageFault { .. } => e,
        other => SessionError::StageFault { stage: stage.to_string(), detail: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl Stage for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn generate(&mut self, _flow: &mut Flow, _point: &Point) -> Result<(), SessionError> {
            self.log.borrow_mut().push(format!("fwd:{}", self.name));
            Ok(())
        }

        fn analyze(&mut self, _flow: &mut Flow, _trial: &Trial) -> Result<(), SessionError> {
            self.log.borrow_mut().push(format!("rev:{}", self.name));
            Ok(())
        }
    }

    struct Rejector;

    impl Stage for Rejector {
        fn name(&self) -> &str {
            "rejector"
        }

        fn generate(&mut self, flow: &mut Flow, _point: &Point) -> Result<(), SessionError> {
            flow.status = FlowStatus::Reject;
            flow.hint = Point::new(9, vec![]);
            Ok(())
        }
    }

    /// Parks on the first call per id, then reports ready and accepts.
    struct ParkOnce {
        parked_ids: std::cell::RefCell<std::collections::HashSet<u32>>,
    }

    impl ParkOnce {
        fn new() -> Self {
            Self { parked_ids: std::cell::RefCell::new(std::collections::HashSet::new()) }
        }
    }

    impl Stage for ParkOnce {
        fn name(&self) -> &str {
            "park_once"
        }

        fn generate(&mut self, flow: &mut Flow, point: &Point) -> Result<(), SessionError> {
            if self.parked_ids.borrow_mut().insert(point.id) {
                flow.status = FlowStatus::Wait;
            }
            Ok(())
        }

        fn analyze(&mut self, flow: &mut Flow, trial: &Trial) -> Result<(), SessionError> {
            if self.parked_ids.borrow_mut().insert(trial.point.id) {
                flow.status = FlowStatus::Wait;
            }
            Ok(())
        }

        fn is_ready(&self, id: u32) -> bool {
            self.parked_ids.borrow().contains(&id)
        }
    }

    #[test]
    fn forward_runs_in_list_order_reverse_runs_reversed() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Recorder { name: "a", log: log.clone() }),
            Box::new(Recorder { name: "b", log: log.clone() }),
        ];
        let mut pipeline = Pipeline::new(stages);
        let mut flow = Flow::accept();
        pipeline.run_forward(&mut flow, &Point::none()).unwrap();
        let mut flow = Flow::accept();
        pipeline.run_reverse(&mut flow, &Trial::new(Point::none())).unwrap();
        assert_eq!(*log.borrow(), vec!["fwd:a", "fwd:b", "rev:b", "rev:a"]);
    }

    #[test]
    fn a_rejecting_stage_halts_the_forward_pass() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let stages: Vec<Box<dyn Stage>> =
            vec![Box::new(Rejector), Box::new(Recorder { name: "never", log: log.clone() })];
        let mut pipeline = Pipeline::new(stages);
        let mut flow = Flow::accept();
        pipeline.run_forward(&mut flow, &Point::none()).unwrap();
        assert_eq!(flow.status, FlowStatus::Reject);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn a_forward_wait_parks_the_point_until_the_stage_is_ready() {
        let mut pipeline = Pipeline::new(vec![Box::new(ParkOnce::new())]);
        let point = Point::new(5, vec![]);
        let mut flow = Flow::accept();
        pipeline.run_forward(&mut flow, &point).unwrap();
        assert_eq!(flow.status, FlowStatus::Wait);
        assert_eq!(pipeline.parked_count(), 1);

        // not ready yet from the pipeline's point of view, since nothing
        // has re-asked the stage; but our fixture already flipped ready on
        // park, so the very next resume call should succeed.
        let (resumed_point, resumed_flow) = pipeline.resume_forward().unwrap().expect("park_once reports ready on the first poll");
        assert_eq!(resumed_point, point);
        assert_eq!(resumed_flow.status, FlowStatus::Accept);
        assert_eq!(pipeline.parked_count(), 0);
    }

    #[test]
    fn a_reverse_wait_parks_the_trial_with_its_parking_stage_index() {
        let mut pipeline = Pipeline::new(vec![Box::new(ParkOnce::new())]);
        let trial = Trial::new(Point::new(7, vec![]));
        let mut flow = Flow::accept();
        pipeline.run_reverse(&mut flow, &trial).unwrap();
        assert_eq!(flow.status, FlowStatus::Wait);
        assert_eq!(pipeline.parked_count(), 1);

        let resumed = pipeline.resume_reverse().unwrap();
        let (resumed_trial, resumed_flow) = resumed.unwrap();
        assert_eq!(resumed_trial.point.id, 7);
        assert_eq!(resumed_flow.status, FlowStatus::Accept);
        assert_eq!(pipeline.parked_count(), 0);
    }

    #[test]
    fn resume_is_a_no_op_when_nothing_is_parked() {
        let mut pipeline = Pipeline::new(vec![Box::new(ParkOnce::new())]);
        assert_eq!(pipeline.resume_forward().unwrap(), None);
        assert_eq!(pipeline.resume_reverse().unwrap(), None);
    }
}

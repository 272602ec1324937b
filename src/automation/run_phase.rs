// Pure decision logic for the run poll loop: what to do after observing a status

use std::time::Duration;

use crate::workspace::RunStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Wait for `planned`, then confirm the apply explicitly
    Manual,
    /// The service applies on its own once planning succeeds
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    AwaitingPlan,
    AwaitingApply,
    Applying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    Wait(Duration),
    /// Issue the apply action, then keep polling at the apply interval
    Apply,
    Finished(RunStatus),
    Failed(RunStatus),
}

#[derive(Debug, Clone)]
pub struct RunPhaseTracker {
    phase: RunPhase,
    plan_interval: Duration,
    apply_interval: Duration,
}

impl RunPhaseTracker {
    pub fn new(mode: ApplyMode, plan_interval: Duration, apply_interval: Duration) -> Self {
        let phase = match mode {
            ApplyMode::Manual => RunPhase::AwaitingPlan,
            ApplyMode::Auto => RunPhase::AwaitingApply,
        };
        Self {
            phase,
            plan_interval,
            apply_interval,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn interval(&self) -> Duration {
        match self.phase {
            RunPhase::Applying => self.apply_interval,
            _ => self.plan_interval,
        }
    }

    pub fn observe(&mut self, status: &RunStatus) -> PollDecision {
        match (self.phase, status) {
            (_, RunStatus::Applied) => PollDecision::Finished(RunStatus::Applied),
            (RunPhase::Applying, s) if s.is_terminal() => PollDecision::Finished(s.clone()),
            (_, s) if s.is_failure() => PollDecision::Failed(s.clone()),
            (RunPhase::AwaitingPlan, RunStatus::Planned) => {
                self.phase = RunPhase::Applying;
                PollDecision::Apply
            }
            (_, RunStatus::Applying) | (RunPhase::AwaitingApply, RunStatus::Planned) => {
                self.phase = RunPhase::Applying;
                PollDecision::Wait(self.apply_interval)
            }
            _ => PollDecision::Wait(self.interval()),
        }
    }
}

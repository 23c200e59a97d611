//! Exploration loop state management
//!
//! Tracks where the loop is in its lifecycle, the step counter, and how the
//! session ended.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of one exploration session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Starting,
    Stepping,
    Stopping,
    Crashed,
    Finalizing,
    Done,
}

/// Exactly one of these ends every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The validated action was `stop`
    Stopped { reason: String },
    /// The step budget ran out
    BudgetExhausted { steps: usize },
    /// The page could not be read
    ObservationFailed { reason: String },
    /// Something escaped its step boundary, or start navigation failed
    Crashed { reason: String },
    /// User interrupt
    Cancelled,
}

impl Termination {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Stopped { .. } | Self::BudgetExhausted { .. })
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped { reason } => write!(f, "stopped: {}", reason),
            Self::BudgetExhausted { steps } => write!(f, "step budget of {} exhausted", steps),
            Self::ObservationFailed { reason } => write!(f, "observation failed: {}", reason),
            Self::Crashed { reason } => write!(f, "crashed: {}", reason),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// State of the exploration loop
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Current phase
    pub phase: LoopPhase,
    /// Steps started so far; the next step index is `step + 1`
    pub step: usize,
    /// Maximum allowed steps
    pub max_steps: usize,
    /// Set once the session has a terminal reason
    pub termination: Option<Termination>,
}

impl LoopState {
    /// Create a new loop state with the given step budget
    pub fn new(max_steps: usize) -> Self {
        Self {
            phase: LoopPhase::Starting,
            step: 0,
            max_steps,
            termination: None,
        }
    }

    /// Check if another step should run
    pub fn should_continue(&self) -> bool {
        self.phase == LoopPhase::Stepping
            && self.step < self.max_steps
            && self.termination.is_none()
    }

    /// Advance the counter and return the new 1-based step index
    pub fn next_step(&mut self) -> usize {
        self.step += 1;
        self.step
    }

    pub fn begin_stepping(&mut self) {
        self.phase = LoopPhase::Stepping;
    }

    /// Record the terminal reason; the first one wins
    pub fn terminate(&mut self, termination: Termination) {
        if self.termination.is_some() {
            return;
        }
        self.phase = match termination {
            Termination::Crashed { .. } => LoopPhase::Crashed,
            _ => LoopPhase::Stopping,
        };
        self.termination = Some(termination);
    }

    /// Enter `Finalizing`, filling in budget exhaustion if nothing else ended the run
    pub fn finalize(&mut self) -> Termination {
        self.phase = LoopPhase::Finalizing;
        self.termination
            .get_or_insert(Termination::BudgetExhausted {
                steps: self.max_steps,
            })
            .clone()
    }

    pub fn done(&mut self) {
        self.phase = LoopPhase::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_new() {
        let state = LoopState::new(10);
        assert_eq!(state.phase, LoopPhase::Starting);
        assert_eq!(state.step, 0);
        assert!(state.termination.is_none());
        assert!(!state.should_continue());
    }

    #[test]
    fn test_should_continue() {
        let mut state = LoopState::new(2);
        state.begin_stepping();
        assert!(state.should_continue());

        assert_eq!(state.next_step(), 1);
        assert!(state.should_continue());

        assert_eq!(state.next_step(), 2);
        assert!(!state.should_continue()); // Reached max steps
        assert_eq!(
            state.finalize(),
            Termination::BudgetExhausted { steps: 2 }
        );
    }

    #[test]
    fn test_first_termination_wins() {
        let mut state = LoopState::new(5);
        state.begin_stepping();
        state.terminate(Termination::Stopped {
            reason: "done".into(),
        });
        state.terminate(Termination::Cancelled);
        assert_eq!(state.phase, LoopPhase::Stopping);
        assert!(!state.should_continue());
        assert!(state.finalize().is_clean());
        assert_eq!(state.phase, LoopPhase::Finalizing);
    }

    #[test]
    fn test_crash_phase() {
        let mut state = LoopState::new(5);
        state.terminate(Termination::Crashed {
            reason: "boom".into(),
        });
        assert_eq!(state.phase, LoopPhase::Crashed);
    }

    #[test]
    fn test_termination_serializes_tagged() {
        let json = serde_json::to_value(Termination::BudgetExhausted { steps: 3 }).unwrap();
        assert_eq!(json["kind"], "budget_exhausted");
        assert_eq!(json["steps"], 3);
    }
}

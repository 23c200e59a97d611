//! Exploration loop
//!
//! Runs observe → decide → validate → execute → analyze → record until the
//! policy stops, the step budget runs out, the page becomes unreadable, or
//! something escapes a step. History is flushed on every one of those paths,
//! and on cancellation.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agent::analyzer::IssueAnalyzer;
use crate::agent::decision::{Decision, DecisionPolicy};
use crate::agent::grounder::ActionGrounder;
use crate::agent::history::{HistorySink, SessionHistory, SessionReport, StepRecord};
use crate::agent::loop_state::{LoopState, Termination};
use crate::agent::observer::PageObserver;
use crate::agent::validator::ActionValidator;
use crate::browser::BrowserDriver;
use crate::core::config::AgentConfig;
use crate::core::error::panic_message;
use crate::core::{Config, Result};

/// Drives one page through a decision policy
pub struct Explorer {
    driver: Arc<dyn BrowserDriver>,
    policy: Arc<dyn DecisionPolicy>,
    sink: Box<dyn HistorySink>,
    observer: PageObserver,
    validator: ActionValidator,
    grounder: ActionGrounder,
    analyzer: IssueAnalyzer,
    config: AgentConfig,
}

impl Explorer {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        policy: Arc<dyn DecisionPolicy>,
        sink: Box<dyn HistorySink>,
        config: &Config,
    ) -> Self {
        let agent = config.agent.clone();
        Self {
            observer: PageObserver::new(driver.clone(), config.observer.clone()),
            validator: ActionValidator::new(agent.confidence_floor),
            grounder: ActionGrounder::new(driver.clone()),
            analyzer: IssueAnalyzer::new(agent.console_window, agent.confidence_floor),
            driver,
            policy,
            sink,
            config: agent,
        }
    }

    /// Run a session to completion
    pub async fn run(&self, start_url: &str) -> Result<SessionReport> {
        self.run_until(start_url, std::future::pending::<()>()).await
    }

    /// Run a session, cancelling it when `shutdown` resolves
    ///
    /// Only a failed flush is returned as an error; every other ending is
    /// described by the report's termination.
    pub async fn run_until<F>(&self, start_url: &str, shutdown: F) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let mut history = SessionHistory::start();
        let mut state = LoopState::new(self.config.max_steps);

        info!(
            url = start_url,
            max_steps = self.config.max_steps,
            "Starting exploration session"
        );

        let interrupted = tokio::select! {
            biased;
            _ = shutdown => {
                warn!("Session interrupted");
                Some(Termination::Cancelled)
            }
            result = AssertUnwindSafe(self.drive(start_url, &mut history, &mut state))
                .catch_unwind() => {
                match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(Termination::Crashed { reason: e.to_string() }),
                    Err(panic) => Some(Termination::Crashed {
                        reason: format!("panicked: {}", panic_message(panic.as_ref())),
                    }),
                }
            }
        };

        if let Some(termination) = interrupted {
            if let Termination::Crashed { reason } = &termination {
                error!(reason = %reason, "Session crashed");
            }
            state.terminate(termination);
        }

        let termination = state.finalize();
        let mut report = SessionReport::new(&history, termination);
        let flushed = self.sink.flush(&history, &report);
        state.done();

        let path = flushed.map_err(|e| {
            error!(error = %e, "Failed to save session log");
            e
        })?;
        report.log_path = Some(path);

        info!(
            steps = report.steps,
            issues = report.issues.total(),
            termination = %report.termination,
            "Session finished"
        );
        Ok(report)
    }

    async fn drive(
        &self,
        start_url: &str,
        history: &mut SessionHistory,
        state: &mut LoopState,
    ) -> Result<()> {
        if let Err(e) = self.driver.navigate_with_retry(start_url).await {
            error!(url = start_url, error = %e, "Could not open start page");
            state.terminate(Termination::Crashed {
                reason: e.to_string(),
            });
            return Ok(());
        }

        state.begin_stepping();
        while state.should_continue() {
            let step = state.next_step();
            info!(step, max_steps = state.max_steps, "--- Step {}/{} ---", step, state.max_steps);

            if let Some(termination) = self.step(step, history).await? {
                state.terminate(termination);
                break;
            }

            if state.should_continue() {
                tokio::time::sleep(self.config.step_delay()).await;
            }
        }
        Ok(())
    }

    /// One full cycle. `Some` ends the session.
    async fn step(
        &self,
        step_index: usize,
        history: &mut SessionHistory,
    ) -> Result<Option<Termination>> {
        let snapshot = match self.observer.observe().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(step = step_index, error = %e, "Observation failed; ending session");
                return Ok(Some(Termination::ObservationFailed {
                    reason: e.to_string(),
                }));
            }
        };

        let window = history.recent(self.config.history_window);
        let decision = match self.policy.decide(&snapshot, window).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(step = step_index, error = %e, "Decision failed; stopping safely");
                Decision::fallback(&e)
            }
        };
        info!(
            step = step_index,
            action = decision.action_type.as_deref().unwrap_or(""),
            reasoning = %decision.reasoning,
            "Decision"
        );

        let action = self.validator.validate(&decision);
        let outcome = self.grounder.execute(&action).await;
        info!(
            step = step_index,
            status = outcome.status.as_str(),
            details = %outcome.details,
            "Result"
        );

        let console = match self
            .driver
            .recent_console_entries(self.config.console_window)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Could not read console log");
                Vec::new()
            }
        };

        let issues = self.analyzer.analyze(&snapshot, &decision, &outcome, &console);
        for issue in &issues {
            warn!(
                step = step_index,
                severity = ?issue.severity,
                title = %issue.title,
                "Issue detected: {}",
                issue.description
            );
        }

        let stop = action.is_stop().then(|| Termination::Stopped {
            reason: action.reason.clone(),
        });

        history.append(StepRecord {
            step_index,
            timestamp: chrono::Local::now(),
            url: snapshot.url.clone(),
            snapshot_summary: StepRecord::summarize_text(&snapshot.visible_text),
            decision,
            action,
            outcome,
            issues,
        })?;

        Ok(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::history::JsonFileSink;
    use crate::agent::observer::Snapshot;
    use crate::browser::{MemoryDriver, MemoryPage};
    use crate::core::DecisionError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const URL: &str = "https://shop.test/";

    /// Replays decisions in order, then stops
    struct Scripted {
        decisions: Mutex<Vec<std::result::Result<Decision, DecisionError>>>,
        seen_history: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(decisions: Vec<std::result::Result<Decision, DecisionError>>) -> Arc<Self> {
            let mut decisions = decisions;
            decisions.reverse();
            Arc::new(Self {
                decisions: Mutex::new(decisions),
                seen_history: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DecisionPolicy for Scripted {
        async fn decide(
            &self,
            _snapshot: &Snapshot,
            history: &[StepRecord],
        ) -> std::result::Result<Decision, DecisionError> {
            self.seen_history.lock().unwrap().push(history.len());
            self.decisions.lock().unwrap().pop().unwrap_or_else(|| {
                Ok(Decision {
                    action_type: Some("stop".into()),
                    reason: Some("script finished".into()),
                    ..Default::default()
                })
            })
        }
    }

    struct Panicking;

    #[async_trait]
    impl DecisionPolicy for Panicking {
        async fn decide(
            &self,
            _snapshot: &Snapshot,
            _history: &[StepRecord],
        ) -> std::result::Result<Decision, DecisionError> {
            panic!("policy exploded");
        }
    }

    fn click(target: &str) -> std::result::Result<Decision, DecisionError> {
        Ok(Decision {
            action_type: Some("click".into()),
            target_description: Some(target.into()),
            ..Default::default()
        })
    }

    fn config(max_steps: usize) -> Config {
        let mut config = Config::default();
        config.agent.max_steps = max_steps;
        config.agent.step_delay_ms = 0;
        config
    }

    fn explorer(
        driver: MemoryDriver,
        policy: Arc<dyn DecisionPolicy>,
        dir: &std::path::Path,
        max_steps: usize,
    ) -> Explorer {
        Explorer::new(
            Arc::new(driver),
            policy,
            Box::new(JsonFileSink::new(dir)),
            &config(max_steps),
        )
    }

    fn shop() -> MemoryDriver {
        MemoryDriver::new().with_page(URL, MemoryPage::new("Shop").text("Welcome").button("Cart"))
    }

    #[tokio::test]
    async fn test_stop_ends_session_and_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Scripted::new(vec![click("cart")]);
        let report = explorer(shop(), policy.clone(), dir.path(), 10)
            .run(URL)
            .await
            .unwrap();

        assert_eq!(report.steps, 2);
        assert_eq!(
            report.termination,
            Termination::Stopped {
                reason: "script finished".into()
            }
        );
        // second decision saw the first completed step only
        assert_eq!(*policy.seen_history.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Scripted::new(vec![click("cart"), click("cart"), click("cart")]);
        let report = explorer(shop(), policy, dir.path(), 2).run(URL).await.unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(report.termination, Termination::BudgetExhausted { steps: 2 });
    }

    #[tokio::test]
    async fn test_start_navigation_failure_still_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MemoryDriver::new().unreachable(URL);
        let report = explorer(driver, Scripted::new(vec![]), dir.path(), 5)
            .run(URL)
            .await
            .unwrap();
        assert!(matches!(report.termination, Termination::Crashed { .. }));
        assert_eq!(report.steps, 0);
        assert!(report.log_path.unwrap().exists());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let report = explorer(shop(), Arc::new(Panicking), dir.path(), 5)
            .run(URL)
            .await
            .unwrap();
        match report.termination {
            Termination::Crashed { reason } => assert!(reason.contains("policy exploded")),
            other => panic!("unexpected termination: {other:?}"),
        }
        assert!(report.log_path.unwrap().exists());
    }

    #[tokio::test]
    async fn test_cancellation_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let report = explorer(shop(), Scripted::new(vec![]), dir.path(), 5)
            .run_until(URL, async {})
            .await
            .unwrap();
        assert_eq!(report.termination, Termination::Cancelled);
        assert!(report.log_path.unwrap().exists());
    }
}

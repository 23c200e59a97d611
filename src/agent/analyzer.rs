//! Issue detection
//!
//! `IssueAnalyzer::analyze` is a pure function of its inputs. Rules run in a
//! fixed order and each rule keeps its input order, so the output is already
//! sorted by severity:
//!
//! | rule              | severity |
//! |-------------------|----------|
//! | execution error   | high     |
//! | decision failure  | medium   |
//! | error page title  | medium   |
//! | console window    | medium   |
//! | policy-reported   | low      |
//! | low confidence    | low      |

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agent::decision::Decision;
use crate::agent::grounder::{ExecutionOutcome, OutcomeStatus};
use crate::agent::observer::Snapshot;
use crate::browser::ConsoleEntry;

/// Ordered so that `High > Medium > Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Which rule produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    Execution,
    DecisionFailure,
    ErrorPage,
    Console,
    Policy,
    LowConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub source: IssueSource,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub evidence: serde_json::Value,
}

impl Issue {
    pub fn new(
        severity: Severity,
        source: IssueSource,
        title: impl Into<String>,
        description: impl Into<String>,
        evidence: serde_json::Value,
    ) -> Self {
        Self {
            severity,
            source,
            title: title.into(),
            description: description.into(),
            evidence,
        }
    }
}

const ERROR_PAGE_MARKERS: [&str; 3] = ["404", "page not found", "error"];

#[derive(Debug, Clone)]
pub struct IssueAnalyzer {
    console_window: usize,
    confidence_floor: f64,
}

impl IssueAnalyzer {
    pub fn new(console_window: usize, confidence_floor: f64) -> Self {
        Self {
            console_window,
            confidence_floor,
        }
    }

    pub fn analyze(
        &self,
        snapshot: &Snapshot,
        decision: &Decision,
        outcome: &ExecutionOutcome,
        console: &[ConsoleEntry],
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        if outcome.status == OutcomeStatus::Error {
            issues.push(Issue::new(
                Severity::High,
                IssueSource::Execution,
                format!("Failed to {}", outcome.action_type),
                outcome.details.clone(),
                json!({
                    "action": outcome.action_type,
                    "target": decision.target_description,
                    "details": outcome.details,
                    "screenshot": outcome.evidence.screenshot,
                }),
            ));
        }

        if let Some(failure) = &decision.failure {
            issues.push(Issue::new(
                Severity::Medium,
                IssueSource::DecisionFailure,
                "Decision policy failure",
                failure.message.clone(),
                json!({ "kind": failure.kind }),
            ));
        }

        let title = snapshot.title.to_lowercase();
        if ERROR_PAGE_MARKERS.iter().any(|m| title.contains(m)) {
            issues.push(Issue::new(
                Severity::Medium,
                IssueSource::ErrorPage,
                "Potential error page",
                format!("Page title suggests an error: {}", snapshot.title),
                json!({ "url": snapshot.url, "title": snapshot.title }),
            ));
        }

        let start = console.len().saturating_sub(self.console_window);
        let problems: Vec<&ConsoleEntry> = console[start..]
            .iter()
            .filter(|entry| entry.level.is_problem())
            .collect();
        if !problems.is_empty() {
            issues.push(Issue::new(
                Severity::Medium,
                IssueSource::Console,
                "Console errors detected",
                format!("{} console error/warning message(s)", problems.len()),
                json!(problems),
            ));
        }

        for item in decision.potential_issues.iter().filter(|i| !i.trim().is_empty()) {
            issues.push(Issue::new(
                Severity::Low,
                IssueSource::Policy,
                "AI identified issue",
                item.clone(),
                json!({ "url": snapshot.url }),
            ));
        }

        if let Some(confidence) = decision.confidence {
            if !confidence.is_finite() || confidence < self.confidence_floor {
                issues.push(Issue::new(
                    Severity::Low,
                    IssueSource::LowConfidence,
                    "Low-confidence decision",
                    format!(
                        "Confidence {} is below the floor of {}",
                        confidence, self.confidence_floor
                    ),
                    json!({ "confidence": confidence, "floor": self.confidence_floor }),
                ));
            }
        }

        issues
    }
}

impl Default for IssueAnalyzer {
    fn default() -> Self {
        Self::new(5, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::decision::{DecisionFailure, DecisionFailureKind};
    use crate::agent::grounder::Evidence;
    use crate::agent::validator::ActionKind;
    use crate::browser::ConsoleLevel;

    fn snapshot(title: &str) -> Snapshot {
        Snapshot {
            url: "https://shop.test/".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn outcome(status: OutcomeStatus) -> ExecutionOutcome {
        ExecutionOutcome {
            status,
            details: "Execution Error: NoElementFound: nothing on the page matches 'cart'".into(),
            action_type: ActionKind::Click,
            evidence: Evidence::default(),
        }
    }

    #[test]
    fn test_clean_step_has_no_issues() {
        let issues = IssueAnalyzer::default().analyze(
            &snapshot("Products"),
            &Decision::default(),
            &outcome(OutcomeStatus::Success),
            &[ConsoleEntry::new(ConsoleLevel::Log, "ready")],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_ordering_high_medium_low() {
        let decision = Decision {
            potential_issues: vec!["Slow load".into(), "Broken image".into()],
            confidence: Some(0.1),
            ..Default::default()
        };
        let console = vec![
            ConsoleEntry::new(ConsoleLevel::Error, "Uncaught TypeError"),
            ConsoleEntry::new(ConsoleLevel::Warning, "deprecated API"),
        ];
        let issues = IssueAnalyzer::default().analyze(
            &snapshot("404 Not Found"),
            &decision,
            &outcome(OutcomeStatus::Error),
            &console,
        );

        let sources: Vec<IssueSource> = issues.iter().map(|i| i.source).collect();
        assert_eq!(
            sources,
            vec![
                IssueSource::Execution,
                IssueSource::ErrorPage,
                IssueSource::Console,
                IssueSource::Policy,
                IssueSource::Policy,
                IssueSource::LowConfidence,
            ]
        );
        assert!(issues.windows(2).all(|w| w[0].severity >= w[1].severity));
        assert_eq!(issues[3].description, "Slow load");
        assert_eq!(issues[4].description, "Broken image");
        assert_eq!(issues[2].evidence.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_console_window_only_sees_recent_entries() {
        let mut console = vec![ConsoleEntry::new(ConsoleLevel::Error, "old failure")];
        for i in 0..5 {
            console.push(ConsoleEntry::new(ConsoleLevel::Info, format!("tick {}", i)));
        }
        let issues = IssueAnalyzer::new(5, 0.3).analyze(
            &snapshot("Home"),
            &Decision::default(),
            &outcome(OutcomeStatus::Success),
            &console,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_decision_failure_issue() {
        let decision = Decision {
            failure: Some(DecisionFailure {
                kind: DecisionFailureKind::Malformed,
                message: "not JSON".into(),
            }),
            ..Default::default()
        };
        let issues = IssueAnalyzer::default().analyze(
            &snapshot("Home"),
            &decision,
            &outcome(OutcomeStatus::Stopped),
            &[],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].source, IssueSource::DecisionFailure);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].evidence["kind"], "malformed");
    }

    #[test]
    fn test_execution_evidence_names_action() {
        let issues = IssueAnalyzer::default().analyze(
            &snapshot("Home"),
            &Decision {
                target_description: Some("cart".into()),
                ..Default::default()
            },
            &outcome(OutcomeStatus::Error),
            &[],
        );
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].evidence["action"], "click");
        assert_eq!(issues[0].evidence["target"], "cart");
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = IssueAnalyzer::default();
        let decision = Decision {
            potential_issues: vec!["Typo in header".into()],
            ..Default::default()
        };
        let console = vec![ConsoleEntry::new(ConsoleLevel::Error, "boom")];
        let snap = snapshot("Server Error");
        let out = outcome(OutcomeStatus::Error);

        let first = analyzer.analyze(&snap, &decision, &out, &console);
        let second = analyzer.analyze(&snap, &decision, &out, &console);
        assert_eq!(first, second);
    }
}

//! Action grounding and execution
//!
//! Turns a validated action into a concrete interaction. Failures of any
//! kind, panics included, come back as an `ExecutionOutcome` with status
//! `error`; nothing propagates to the loop.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::agent::strategies::ResolutionPlan;
use crate::agent::validator::{ActionKind, ValidatedAction};
use crate::browser::BrowserDriver;
use crate::core::error::panic_message;
use crate::core::{DriverError, GroundingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
    Stopped,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }
}

/// Advisory material captured alongside an outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_element: Option<String>,
    /// Resolver tier that found the element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub status: OutcomeStatus,
    pub details: String,
    pub action_type: ActionKind,
    #[serde(default)]
    pub evidence: Evidence,
}

impl ExecutionOutcome {
    pub fn stopped(action: &ValidatedAction) -> Self {
        Self {
            status: OutcomeStatus::Stopped,
            details: action.reason.clone(),
            action_type: ActionKind::Stop,
            evidence: Evidence::default(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == OutcomeStatus::Error
    }
}

/// Resolves target descriptions to page elements and acts on them
pub struct ActionGrounder {
    driver: Arc<dyn BrowserDriver>,
    click_plan: ResolutionPlan,
    fill_plan: ResolutionPlan,
}

impl ActionGrounder {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            click_plan: ResolutionPlan::click(),
            fill_plan: ResolutionPlan::fill(),
        }
    }

    pub async fn execute(&self, action: &ValidatedAction) -> ExecutionOutcome {
        if action.is_stop() {
            info!(reason = %action.reason, "Agent decided to STOP");
            return ExecutionOutcome::stopped(action);
        }

        info!(
            action = %action.kind,
            target = %action.target_description,
            "Executing"
        );

        let mut evidence = Evidence::default();
        let result = AssertUnwindSafe(self.perform(action, &mut evidence))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(GroundingError::Driver(DriverError::command(format!(
                    "panicked: {}",
                    panic_message(panic.as_ref())
                ))))
            });

        let (status, details) = match result {
            Ok(details) => (OutcomeStatus::Success, details),
            Err(e) => {
                warn!(action = %action.kind, error = %e, "Execution failed");
                (OutcomeStatus::Error, format!("Execution Error: {}", e))
            }
        };

        let suffix = if status == OutcomeStatus::Success {
            "ok"
        } else {
            "error"
        };
        let label = format!("{}_{}", action.kind, suffix);
        evidence.screenshot = match self.driver.screenshot(&label).await {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!(error = %e, "Screenshot failed");
                None
            }
        };

        ExecutionOutcome {
            status,
            details,
            action_type: action.kind,
            evidence,
        }
    }

    async fn perform(
        &self,
        action: &ValidatedAction,
        evidence: &mut Evidence,
    ) -> Result<String, GroundingError> {
        match action.kind {
            ActionKind::Click => self.click(&action.target_description, evidence).await,
            ActionKind::Type => {
                self.type_text(&action.target_description, &action.input_value, evidence)
                    .await
            }
            ActionKind::Navigate => self.navigate(&action.target_description).await,
            ActionKind::Stop => Ok(action.reason.clone()),
        }
    }

    async fn click(&self, target: &str, evidence: &mut Evidence) -> Result<String, GroundingError> {
        if target.is_empty() {
            return Err(GroundingError::MissingTarget(ActionKind::Click));
        }

        let elements = self.driver.query_interactive_elements().await?;
        let resolution = self
            .click_plan
            .resolve(target, &elements)
            .ok_or_else(|| GroundingError::NoElementFound(target.to_string()))?;

        let description = resolution.element.descriptor.describe();
        info!(strategy = resolution.strategy, element = %description, "Grounded click");
        evidence.matched_element = Some(description.clone());
        evidence.strategy = Some(resolution.strategy.to_string());

        self.driver.click(&resolution.element.locator).await?;
        Ok(format!("Clicked {}", description))
    }

    async fn type_text(
        &self,
        target: &str,
        text: &str,
        evidence: &mut Evidence,
    ) -> Result<String, GroundingError> {
        let elements = self.driver.query_interactive_elements().await?;
        let resolution = self
            .fill_plan
            .resolve(target, &elements)
            .ok_or_else(|| GroundingError::NoElementFound(target.to_string()))?;

        let description = resolution.element.descriptor.describe();
        info!(strategy = resolution.strategy, element = %description, "Grounded field");
        evidence.matched_element = Some(description.clone());
        evidence.strategy = Some(resolution.strategy.to_string());

        self.driver.fill(&resolution.element.locator, text).await?;
        Ok(format!("Typed '{}' into {}", text, description))
    }

    async fn navigate(&self, target: &str) -> Result<String, GroundingError> {
        if target.is_empty() {
            return Err(GroundingError::MissingTarget(ActionKind::Navigate));
        }

        let current = if self.driver.is_ready() {
            self.driver.page_state().await.ok().map(|s| s.url)
        } else {
            None
        };
        let url = resolve_navigation_target(current.as_deref(), target)?;

        self.driver.navigate_with_retry(&url).await?;
        Ok(format!("Navigated to {}", url))
    }
}

/// Absolute http(s) URL for a navigate target, joining relative targets
/// onto the current page
pub fn resolve_navigation_target(
    current: Option<&str>,
    target: &str,
) -> Result<String, GroundingError> {
    let url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = current
                .and_then(|c| Url::parse(c).ok())
                .ok_or_else(|| GroundingError::InvalidUrl(target.to_string()))?;
            base.join(target)
                .map_err(|e| GroundingError::InvalidUrl(format!("{}: {}", target, e)))?
        }
        Err(e) => return Err(GroundingError::InvalidUrl(format!("{}: {}", target, e))),
    };

    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(GroundingError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            target, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ElementDescriptor, MemoryDriver, MemoryPage};

    const URL: &str = "https://app.test/";

    async fn grounder(page: MemoryPage) -> (Arc<MemoryDriver>, ActionGrounder) {
        let driver = Arc::new(MemoryDriver::new().with_page(URL, page));
        driver.navigate_with_retry(URL).await.unwrap();
        let grounder = ActionGrounder::new(driver.clone());
        (driver, grounder)
    }

    fn action(kind: ActionKind, target: &str) -> ValidatedAction {
        ValidatedAction {
            kind,
            target_description: target.to_string(),
            input_value: String::new(),
            reason: "test".to_string(),
            confidence: None,
            low_confidence: false,
        }
    }

    fn named(name: &str) -> ElementDescriptor {
        ElementDescriptor {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_click_login_resolves_log_in() {
        let page = MemoryPage::new("Login").button("Log In").button("Cancel");
        let (driver, grounder) = grounder(page).await;
        let outcome = grounder.execute(&action(ActionKind::Click, "log in")).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(driver.clicks()[0].as_str(), "#button-0");
        assert_eq!(outcome.evidence.matched_element.as_deref(), Some("'Log In'"));
    }

    #[tokio::test]
    async fn test_click_on_empty_page_is_no_element_found() {
        let (driver, grounder) = grounder(MemoryPage::new("Empty")).await;
        let outcome = grounder.execute(&action(ActionKind::Click, "login")).await;
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.details.contains("NoElementFound"));
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_click_without_target_is_error() {
        let (_, grounder) = grounder(MemoryPage::new("Page").button("Go")).await;
        let outcome = grounder.execute(&action(ActionKind::Click, "")).await;
        assert!(outcome.is_error());
    }

    #[tokio::test]
    async fn test_type_email_address_picks_email_field() {
        let page = MemoryPage::new("Login").input(named("email")).input(named("password"));
        let (driver, grounder) = grounder(page).await;
        let mut typed = action(ActionKind::Type, "email address");
        typed.input_value = "user@example.com".to_string();

        let outcome = grounder.execute(&typed).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        let fills = driver.fills();
        assert_eq!(fills[0].0.as_str(), "#input-0");
        assert_eq!(fills[0].1, "user@example.com");
    }

    #[tokio::test]
    async fn test_type_falls_back_and_allows_empty_value() {
        let page = MemoryPage::new("Search").input(named("q"));
        let (driver, grounder) = grounder(page).await;
        let outcome = grounder.execute(&action(ActionKind::Type, "the search box")).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.evidence.strategy.as_deref(), Some("first-visible-field"));
        assert_eq!(driver.fills()[0].1, "");
    }

    #[tokio::test]
    async fn test_click_timeout_becomes_error_outcome() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_page(URL, MemoryPage::new("Slow").button("Checkout"))
                .failing_click("#button-0"),
        );
        driver.navigate_with_retry(URL).await.unwrap();
        let outcome = ActionGrounder::new(driver)
            .execute(&action(ActionKind::Click, "checkout"))
            .await;
        assert!(outcome.is_error());
        assert!(outcome.details.contains("timed out"));
    }

    #[tokio::test]
    async fn test_screenshot_failure_keeps_success() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_page(URL, MemoryPage::new("Page").button("Go"))
                .failing_screenshots(),
        );
        driver.navigate_with_retry(URL).await.unwrap();
        let outcome = ActionGrounder::new(driver)
            .execute(&action(ActionKind::Click, "go"))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(outcome.evidence.screenshot.is_none());
    }

    #[tokio::test]
    async fn test_every_executed_action_captures_evidence() {
        let (driver, grounder) = grounder(MemoryPage::new("Page").button("Go")).await;
        grounder.execute(&action(ActionKind::Click, "go")).await;
        grounder.execute(&action(ActionKind::Click, "missing")).await;
        grounder.execute(&ValidatedAction::stop("done")).await;
        assert_eq!(driver.screenshots().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_does_not_touch_page() {
        let (driver, grounder) = grounder(MemoryPage::new("Page").button("Go")).await;
        let outcome = grounder.execute(&ValidatedAction::stop("goal reached")).await;
        assert_eq!(outcome.status, OutcomeStatus::Stopped);
        assert_eq!(outcome.details, "goal reached");
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_navigate_without_target_is_error() {
        let (_, grounder) = grounder(MemoryPage::new("Page")).await;
        let outcome = grounder.execute(&action(ActionKind::Navigate, "")).await;
        assert!(outcome.is_error());
    }

    #[test]
    fn test_resolve_navigation_target() {
        assert_eq!(
            resolve_navigation_target(Some("https://shop.test/a/b"), "/cart").unwrap(),
            "https://shop.test/cart"
        );
        assert_eq!(
            resolve_navigation_target(None, "https://other.test").unwrap(),
            "https://other.test/"
        );
        assert!(resolve_navigation_target(None, "/cart").is_err());
        assert!(resolve_navigation_target(Some(URL), "javascript:alert(1)").is_err());
    }
}

//! Browser driver backed by the agent-browser CLI
//!
//! Every operation is one `agent-browser` invocation bounded by a timeout.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::browser::driver::{
    BrowserDriver, ConsoleEntry, ElementRef, InteractiveElements, PageState,
};
use crate::browser::retry::RetryPolicy;
use crate::browser::scripts;
use crate::core::config::BrowserConfig;
use crate::core::DriverError;

/// Console entries kept driver-side; matches the in-page shim's cap
const CONSOLE_BUFFER_CAP: usize = 500;

/// Driver for a single agent-browser session
pub struct AgentBrowserDriver {
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
    /// Timeout for click / fill / eval / screenshot
    timeout: Duration,
    /// Timeout for one navigation attempt
    navigation_timeout: Duration,
    retry: RetryPolicy,
    /// Wait after navigation for client-side rendering
    settle: Duration,
    screenshot_dir: PathBuf,
    /// Set once a page has been opened
    ready: AtomicBool,
    /// Most recent console entries drained from the page
    console: Mutex<VecDeque<ConsoleEntry>>,
}

impl AgentBrowserDriver {
    /// Create a new driver with default settings
    pub fn new(session_name: impl Into<String>) -> Self {
        let mut config = BrowserConfig::default();
        config.session_name = session_name.into();
        Self::from_config(&config)
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            session_name: config.session_name.clone(),
            headed: !config.headless,
            timeout: Duration::from_millis(config.timeout_ms),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            retry: RetryPolicy::new(
                config.navigation_attempts,
                Duration::from_millis(config.navigation_base_delay_ms),
            ),
            settle: Duration::from_millis(config.settle_ms),
            screenshot_dir: config.screenshot_dir.clone(),
            ready: AtomicBool::new(false),
            console: Mutex::new(VecDeque::new()),
        }
    }

    /// Check if agent-browser is installed
    pub async fn is_available() -> bool {
        Command::new("agent-browser")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run an agent-browser command under a timeout
    async fn run_command(&self, args: &[&str], timeout: Duration) -> Result<String, DriverError> {
        let mut cmd = Command::new("agent-browser");
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let operation = args.first().copied().unwrap_or("command");
        debug!(operation, "agent-browser");

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| DriverError::Timeout {
                operation: operation.to_string(),
                after_ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DriverError::AgentBrowserNotFound
                } else {
                    DriverError::command(format!("Failed to run agent-browser: {}", e))
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DriverError::command(format!(
                "agent-browser {} failed: {}",
                operation,
                stderr.trim()
            )))
        }
    }

    /// Evaluate a script that returns a JSON string and decode it
    async fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T, DriverError> {
        let output = self
            .run_command(&["eval", script, "--json"], self.timeout)
            .await?;
        let value = parse_eval_output(&output)?;
        serde_json::from_value(value).map_err(|e| DriverError::eval(e.to_string()))
    }

    async fn open_once(&self, url: &str) -> Result<(), DriverError> {
        self.run_command(&["open", url], self.navigation_timeout)
            .await?;
        // networkidle never arrives on some pages; the open itself succeeded
        if let Err(e) = self
            .run_command(&["wait", "--load", "domcontentloaded"], self.navigation_timeout)
            .await
        {
            debug!(error = %e, "load wait failed");
        }
        Ok(())
    }

    /// Move buffered console messages from the page into the driver buffer
    async fn drain_console(&self) {
        match self.eval_json::<Vec<ConsoleEntry>>(scripts::CONSOLE_DRAIN_JS).await {
            Ok(entries) if !entries.is_empty() => {
                if let Ok(mut buffer) = self.console.lock() {
                    push_bounded(&mut buffer, entries, CONSOLE_BUFFER_CAP);
                }
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "console drain failed"),
        }
    }

    async fn highlight(&self, element: &ElementRef) {
        let script = scripts::highlight_js(element.as_str());
        if let Err(e) = self.run_command(&["eval", &script], self.timeout).await {
            debug!(error = %e, "highlight failed");
        }
    }

    /// Close the browser session
    pub async fn close(&self) -> Result<(), DriverError> {
        self.run_command(&["close"], self.timeout).await?;
        self.ready.store(false, Ordering::SeqCst);
        info!("Browser stopped.");
        Ok(())
    }
}

impl Default for AgentBrowserDriver {
    fn default() -> Self {
        Self::new("sitescout")
    }
}

/// Decode `agent-browser eval --json` output.
///
/// Accepts the `{success, data: {result}}` envelope, a bare JSON value, or a
/// JSON-encoded string returned by one of our scripts.
pub(crate) fn parse_eval_output(output: &str) -> Result<serde_json::Value, DriverError> {
    let trimmed = output.trim();
    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| DriverError::eval(format!("unreadable eval output: {}", e)))?;

    let value = match value {
        serde_json::Value::Object(mut map) if map.contains_key("success") => {
            if map.get("success").and_then(|s| s.as_bool()) == Some(false) {
                let reason = map
                    .get("error")
                    .and_then(|e| e.as_str())
                    .unwrap_or("eval reported failure")
                    .to_string();
                return Err(DriverError::eval(reason));
            }
            match map.remove("data") {
                Some(serde_json::Value::Object(mut data)) if data.contains_key("result") => {
                    data.remove("result").unwrap_or_default()
                }
                Some(data) => data,
                None => serde_json::Value::Null,
            }
        }
        other => other,
    };

    match value {
        serde_json::Value::String(inner) => {
            Ok(serde_json::from_str(&inner).unwrap_or(serde_json::Value::String(inner)))
        }
        other => Ok(other),
    }
}

/// Append entries, dropping the oldest beyond `cap`
fn push_bounded(buffer: &mut VecDeque<ConsoleEntry>, entries: Vec<ConsoleEntry>, cap: usize) {
    buffer.extend(entries);
    let excess = buffer.len().saturating_sub(cap);
    buffer.drain(..excess);
}

#[async_trait]
impl BrowserDriver for AgentBrowserDriver {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn navigate_with_retry(&self, url: &str) -> Result<(), DriverError> {
        info!(url, "Navigating");
        if self.is_ready() {
            self.drain_console().await;
        }

        let mut attempt = 1;
        loop {
            match self.open_once(url).await {
                Ok(()) => {
                    self.ready.store(true, Ordering::SeqCst);
                    if let Err(e) = self
                        .eval_json::<serde_json::Value>(scripts::CONSOLE_CAPTURE_JS)
                        .await
                    {
                        warn!(error = %e, "console capture not installed");
                    }
                    tokio::time::sleep(self.settle).await;
                    return Ok(());
                }
                Err(DriverError::AgentBrowserNotFound) => {
                    return Err(DriverError::AgentBrowserNotFound);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Navigation attempt failed");
                    match self.retry.delay_after(attempt) {
                        Some(delay) => {
                            info!("Retrying in {}s...", delay.as_secs_f32());
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            error!(url, "All navigation retries failed");
                            return Err(DriverError::NavigationFailed {
                                url: url.to_string(),
                                attempts: attempt,
                                last: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    async fn page_state(&self) -> Result<PageState, DriverError> {
        if !self.is_ready() {
            return Err(DriverError::NotReady);
        }
        self.eval_json(scripts::PAGE_STATE_JS).await
    }

    async fn query_interactive_elements(&self) -> Result<InteractiveElements, DriverError> {
        if !self.is_ready() {
            return Err(DriverError::NotReady);
        }
        self.eval_json(scripts::INTERACTIVE_ELEMENTS_JS).await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        info!(element = %element, "Clicking");
        self.highlight(element).await;
        self.run_command(&["click", element.as_str()], self.timeout)
            .await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        info!(element = %element, text, "Typing");
        self.highlight(element).await;
        self.run_command(&["fill", element.as_str(), text], self.timeout)
            .await?;
        Ok(())
    }

    async fn screenshot(&self, label: &str) -> Result<String, DriverError> {
        tokio::fs::create_dir_all(&self.screenshot_dir)
            .await
            .map_err(|e| DriverError::command(format!("Failed to create screenshot dir: {}", e)))?;

        let filename = format!("{}_{}.png", label, chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.screenshot_dir.join(filename);
        let path_str = path.to_string_lossy().into_owned();

        self.run_command(&["screenshot", &path_str], self.timeout)
            .await?;
        info!(path = %path_str, "Screenshot saved");
        Ok(path_str)
    }

    async fn recent_console_entries(&self, n: usize) -> Result<Vec<ConsoleEntry>, DriverError> {
        if self.is_ready() {
            self.drain_console().await;
        }
        let buffer = self
            .console
            .lock()
            .map_err(|_| DriverError::command("console buffer poisoned"))?;
        let start = buffer.len().saturating_sub(n);
        Ok(buffer.iter().skip(start).cloned().collect())
    }
}

//! Browser driver capability surface
//!
//! The exploration core only talks to the page through this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::DriverError;

/// Basic readable state of the current page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub title: String,
    /// `document.body.innerText`
    #[serde(default)]
    pub text: String,
}

/// Opaque locator for an element on the live page
///
/// Only valid until the page navigates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display-relevant attributes of an element. Never holds a handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Trimmed text content
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// `type` attribute for inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// `value` attribute for inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl ElementDescriptor {
    /// Descriptor with only text content
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Lowercased `type`, defaulting to `text` like the DOM does
    pub fn input_type(&self) -> String {
        self.input_type
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    /// Short human-readable description, used as grounding evidence
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if !self.text.is_empty() {
            out.push_str(&format!("'{}'", self.text));
        }
        let attrs = [
            ("id", &self.id),
            ("name", &self.name),
            ("placeholder", &self.placeholder),
            ("value", &self.value),
            ("href", &self.href),
        ];
        for (key, value) in attrs {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(&format!("{}='{}'", key, v));
            }
        }
        if self.disabled {
            out.push_str(" [disabled]");
        }
        out
    }
}

/// An interactive element as reported by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    /// How to address the element for click / fill
    pub locator: ElementRef,
    /// Lowercase tag name
    pub tag: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(flatten)]
    pub descriptor: ElementDescriptor,
}

fn default_visible() -> bool {
    true
}

impl PageElement {
    pub fn new(
        locator: impl Into<String>,
        tag: impl Into<String>,
        descriptor: ElementDescriptor,
    ) -> Self {
        Self {
            locator: ElementRef::new(locator),
            tag: tag.into(),
            visible: true,
            descriptor,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Inputs that act as buttons
    pub fn is_button_input(&self) -> bool {
        self.tag == "input" && matches!(self.descriptor.input_type().as_str(), "submit" | "button")
    }

    /// Elements that accept typed text
    pub fn is_text_entry(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.descriptor.input_type().as_str(),
                "hidden"
                    | "submit"
                    | "button"
                    | "reset"
                    | "image"
                    | "checkbox"
                    | "radio"
                    | "file"
            ),
            _ => false,
        }
    }
}

/// Interactive elements in DOM order, per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElements {
    #[serde(default)]
    pub buttons: Vec<PageElement>,
    #[serde(default)]
    pub links: Vec<PageElement>,
    /// `input` and `textarea` elements
    #[serde(default)]
    pub inputs: Vec<PageElement>,
}

/// Severity of a console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
    #[serde(other)]
    Other,
}

impl ConsoleLevel {
    /// Errors and warnings are reported as issues
    pub fn is_problem(self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

/// A console message captured from the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    #[serde(alias = "message")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ConsoleEntry {
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            location: None,
        }
    }
}

/// Operations the exploration loop needs from a browser
///
/// Every operation is expected to enforce its own timeout.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Whether a live page exists
    fn is_ready(&self) -> bool;

    /// Navigate, retrying with backoff; surfaces the last error
    async fn navigate_with_retry(&self, url: &str) -> Result<(), DriverError>;

    /// URL, title and visible text
    async fn page_state(&self) -> Result<PageState, DriverError>;

    /// All interactive elements, uncapped, in DOM order
    async fn query_interactive_elements(&self) -> Result<InteractiveElements, DriverError>;

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    /// Capture a screenshot, returning a reference (path) to it
    async fn screenshot(&self, label: &str) -> Result<String, DriverError>;

    /// The last `n` console entries, oldest first
    async fn recent_console_entries(&self, n: usize) -> Result<Vec<ConsoleEntry>, DriverError>;
}

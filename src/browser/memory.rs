//! In-memory browser driver
//!
//! Serves scripted pages keyed by URL. Used by the test suite and by
//! `--dry-run`, where no real browser is launched.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::browser::driver::{
    BrowserDriver, ConsoleEntry, ElementDescriptor, ElementRef, InteractiveElements, PageElement,
    PageState,
};
use crate::core::DriverError;

/// A scripted page
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub title: String,
    pub text: String,
    pub elements: InteractiveElements,
    /// Console messages emitted when the page loads
    pub console: Vec<ConsoleEntry>,
    /// Clicking the element with this locator navigates to the URL
    pub transitions: HashMap<String, String>,
    /// Reads of this page fail, as if it crashed mid-read
    pub broken: bool,
}

impl MemoryPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn button(mut self, text: &str) -> Self {
        let locator = format!("#button-{}", self.elements.buttons.len());
        self.elements
            .buttons
            .push(PageElement::new(locator, "button", ElementDescriptor::with_text(text)));
        self
    }

    pub fn link(mut self, text: &str, href: &str) -> Self {
        let locator = format!("#link-{}", self.elements.links.len());
        let descriptor = ElementDescriptor {
            href: Some(href.to_string()),
            ..ElementDescriptor::with_text(text)
        };
        self.elements
            .links
            .push(PageElement::new(locator, "a", descriptor));
        self
    }

    /// Add an `input` element; `input_type` of `None` means a text field
    pub fn input(mut self, descriptor: ElementDescriptor) -> Self {
        let locator = format!("#input-{}", self.elements.inputs.len());
        self.elements
            .inputs
            .push(PageElement::new(locator, "input", descriptor));
        self
    }

    /// Add any element as-is
    pub fn element(mut self, element: PageElement) -> Self {
        match element.tag.as_str() {
            "button" => self.elements.buttons.push(element),
            "a" => self.elements.links.push(element),
            _ => self.elements.inputs.push(element),
        }
        self
    }

    pub fn console(mut self, entry: ConsoleEntry) -> Self {
        self.console.push(entry);
        self
    }

    pub fn on_click(mut self, locator: &str, url: &str) -> Self {
        self.transitions.insert(locator.to_string(), url.to_string());
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    current: Option<String>,
    console: Vec<ConsoleEntry>,
    navigations: Vec<String>,
    clicks: Vec<ElementRef>,
    fills: Vec<(ElementRef, String)>,
    screenshots: Vec<String>,
}

/// Driver over a fixed set of `MemoryPage`s
#[derive(Debug, Default)]
pub struct MemoryDriver {
    pages: HashMap<String, MemoryPage>,
    unreachable: HashSet<String>,
    failing_clicks: HashSet<String>,
    failing_screenshots: bool,
    state: Mutex<MemoryState>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, page: MemoryPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// Navigation to this URL always fails
    pub fn unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }

    /// Clicking this locator fails as if the element were not actionable
    pub fn failing_click(mut self, locator: impl Into<String>) -> Self {
        self.failing_clicks.insert(locator.into());
        self
    }

    pub fn failing_screenshots(mut self) -> Self {
        self.failing_screenshots = true;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DriverError> {
        self.state
            .lock()
            .map_err(|_| DriverError::command("memory driver state poisoned"))
    }

    fn current_page(&self) -> Result<&MemoryPage, DriverError> {
        let state = self.lock()?;
        let url = state.current.as_ref().ok_or(DriverError::NotReady)?;
        let page = self
            .pages
            .get(url)
            .ok_or_else(|| DriverError::eval(format!("no page at {}", url)))?;
        if page.broken {
            return Err(DriverError::eval("Target page, context or browser has been closed"));
        }
        Ok(page)
    }

    fn enter(&self, url: &str) -> Result<(), DriverError> {
        let page = self
            .pages
            .get(url)
            .ok_or_else(|| DriverError::command(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;
        let mut state = self.lock()?;
        state.current = Some(url.to_string());
        state.navigations.push(url.to_string());
        state.console.extend(page.console.iter().cloned());
        Ok(())
    }

    pub fn current_url(&self) -> Option<String> {
        self.lock().ok().and_then(|s| s.current.clone())
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().map(|s| s.navigations.clone()).unwrap_or_default()
    }

    pub fn clicks(&self) -> Vec<ElementRef> {
        self.lock().map(|s| s.clicks.clone()).unwrap_or_default()
    }

    pub fn fills(&self) -> Vec<(ElementRef, String)> {
        self.lock().map(|s| s.fills.clone()).unwrap_or_default()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.lock().map(|s| s.screenshots.clone()).unwrap_or_default()
    }

    fn find(&self, element: &ElementRef) -> Result<PageElement, DriverError> {
        let page = self.current_page()?;
        let elements = &page.elements;
        elements
            .buttons
            .iter()
            .chain(&elements.links)
            .chain(&elements.inputs)
            .find(|el| &el.locator == element)
            .cloned()
            .ok_or_else(|| DriverError::command(format!("element {} not found", element)))
    }
}

#[async_trait]
impl BrowserDriver for MemoryDriver {
    fn is_ready(&self) -> bool {
        self.current_url().is_some()
    }

    async fn navigate_with_retry(&self, url: &str) -> Result<(), DriverError> {
        if self.unreachable.contains(url) {
            return Err(DriverError::NavigationFailed {
                url: url.to_string(),
                attempts: 3,
                last: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        self.enter(url).map_err(|e| DriverError::NavigationFailed {
            url: url.to_string(),
            attempts: 3,
            last: e.to_string(),
        })
    }

    async fn page_state(&self) -> Result<PageState, DriverError> {
        let url = self.current_url().ok_or(DriverError::NotReady)?;
        let page = self.current_page()?;
        Ok(PageState {
            url,
            title: page.title.clone(),
            text: page.text.clone(),
        })
    }

    async fn query_interactive_elements(&self) -> Result<InteractiveElements, DriverError> {
        Ok(self.current_page()?.elements.clone())
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        if self.failing_clicks.contains(element.as_str()) {
            return Err(DriverError::Timeout {
                operation: "click".to_string(),
                after_ms: 5000,
            });
        }
        let el = self.find(element)?;
        if el.descriptor.disabled {
            return Err(DriverError::command(format!("element {} is disabled", element)));
        }
        let target = self.current_page()?.transitions.get(element.as_str()).cloned();
        self.lock()?.clicks.push(element.clone());
        if let Some(url) = target {
            self.enter(&url)?;
        }
        Ok(())
    }

    async fn fill(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.find(element)?;
        self.lock()?
            .fills
            .push((element.clone(), text.to_string()));
        Ok(())
    }

    async fn screenshot(&self, label: &str) -> Result<String, DriverError> {
        if self.failing_screenshots {
            return Err(DriverError::command("screenshot failed"));
        }
        let mut state = self.lock()?;
        let reference = format!("memory://{}_{}.png", label, state.screenshots.len());
        state.screenshots.push(reference.clone());
        Ok(reference)
    }

    async fn recent_console_entries(&self, n: usize) -> Result<Vec<ConsoleEntry>, DriverError> {
        let state = self.lock()?;
        let start = state.console.len().saturating_sub(n);
        Ok(state.console[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::driver::ConsoleLevel;

    fn driver() -> MemoryDriver {
        MemoryDriver::new()
            .with_page(
                "https://shop.test/",
                MemoryPage::new("Shop")
                    .text("Welcome")
                    .button("Cart")
                    .on_click("#button-0", "https://shop.test/cart")
                    .console(ConsoleEntry::new(ConsoleLevel::Error, "boom")),
            )
            .with_page("https://shop.test/cart", MemoryPage::new("Cart"))
    }

    #[tokio::test]
    async fn test_not_ready_until_navigation() {
        let driver = driver();
        assert!(!driver.is_ready());
        assert_eq!(driver.page_state().await.unwrap_err(), DriverError::NotReady);
    }

    #[tokio::test]
    async fn test_click_follows_transition() {
        let driver = driver();
        driver.navigate_with_retry("https://shop.test/").await.unwrap();
        driver.click(&ElementRef::new("#button-0")).await.unwrap();
        assert_eq!(driver.current_url().as_deref(), Some("https://shop.test/cart"));
        assert_eq!(driver.page_state().await.unwrap().title, "Cart");
    }

    #[tokio::test]
    async fn test_console_accumulates_on_load() {
        let driver = driver();
        driver.navigate_with_retry("https://shop.test/").await.unwrap();
        let entries = driver.recent_console_entries(5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "boom");
    }

    #[tokio::test]
    async fn test_unknown_url_fails_navigation() {
        let driver = driver();
        let err = driver.navigate_with_retry("https://nowhere.test/").await.unwrap_err();
        assert!(matches!(err, DriverError::NavigationFailed { .. }));
    }

    #[test]
    fn test_disabled_element_rejects_click() {
        let driver = MemoryDriver::new().with_page(
            "https://form.test/",
            MemoryPage::new("Form").element(PageElement::new(
                "#save",
                "button",
                ElementDescriptor {
                    disabled: true,
                    ..ElementDescriptor::with_text("Save")
                },
            )),
        );
        tokio_test::block_on(async {
            driver.navigate_with_retry("https://form.test/").await.unwrap();
            assert!(driver.click(&ElementRef::new("#save")).await.is_err());
            assert!(driver.clicks().is_empty());
        });
    }
}

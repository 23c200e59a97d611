//! Page observer
//!
//! Compresses the live page into a bounded `Snapshot` of visible elements.
//! Caps are a hard ceiling: oversized input is truncated silently, never an
//! error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::browser::{BrowserDriver, ElementDescriptor, InteractiveElements, PageElement};
use crate::core::config::ObserverConfig;
use crate::core::ObservationError;

/// Bounded, decision-ready summary of the page. Holds no live references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub url: String,
    pub title: String,
    pub visible_text: String,
    pub buttons: Vec<ElementDescriptor>,
    pub links: Vec<ElementDescriptor>,
    pub inputs: Vec<ElementDescriptor>,
}

impl Snapshot {
    pub fn element_count(&self) -> usize {
        self.buttons.len() + self.links.len() + self.inputs.len()
    }
}

/// Truncate on a character boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Reads the page through the driver and shapes it into a `Snapshot`
pub struct PageObserver {
    driver: Arc<dyn BrowserDriver>,
    limits: ObserverConfig,
}

impl PageObserver {
    pub fn new(driver: Arc<dyn BrowserDriver>, limits: ObserverConfig) -> Self {
        Self { driver, limits }
    }

    pub async fn observe(&self) -> Result<Snapshot, ObservationError> {
        if !self.driver.is_ready() {
            return Err(ObservationError::NotInitialized);
        }

        let result = async {
            let state = self.driver.page_state().await?;
            let elements = self.driver.query_interactive_elements().await?;
            Ok::<_, ObservationError>(self.shape(state.url, state.title, &state.text, &elements))
        }
        .await;

        match &result {
            Ok(snapshot) => info!(
                url = %snapshot.url,
                elements = snapshot.element_count(),
                "Observation captured"
            ),
            Err(e) => error!(error = %e, "Observation failed"),
        }
        result
    }

    /// Apply caps and filters to raw page data
    pub fn shape(
        &self,
        url: String,
        title: String,
        text: &str,
        elements: &InteractiveElements,
    ) -> Snapshot {
        fn with_text(elements: &[PageElement], cap: usize) -> Vec<ElementDescriptor> {
            elements
                .iter()
                .filter(|el| el.visible && !el.descriptor.text.trim().is_empty())
                .take(cap)
                .map(|el| el.descriptor.clone())
                .collect()
        }

        let inputs = elements
            .inputs
            .iter()
            .filter(|el| el.visible && el.descriptor.input_type() != "hidden")
            .take(self.limits.max_inputs)
            .map(|el| el.descriptor.clone())
            .collect();

        Snapshot {
            url,
            title,
            visible_text: truncate_chars(text.trim(), self.limits.max_text_chars),
            buttons: with_text(&elements.buttons, self.limits.max_buttons),
            links: with_text(&elements.links, self.limits.max_links),
            inputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ElementDescriptor, MemoryDriver, MemoryPage, PageElement};

    fn observer(driver: MemoryDriver) -> PageObserver {
        PageObserver::new(Arc::new(driver), ObserverConfig::default())
    }

    #[tokio::test]
    async fn test_not_initialized_without_page() {
        let observer = observer(MemoryDriver::new());
        assert_eq!(
            observer.observe().await.unwrap_err(),
            ObservationError::NotInitialized
        );
    }

    #[tokio::test]
    async fn test_caps_hold_for_oversized_pages() {
        let mut page = MemoryPage::new("Big").text("x".repeat(10_000));
        for i in 0..40 {
            page = page
                .button(&format!("Button {}", i))
                .link(&format!("Link {}", i), "/")
                .input(ElementDescriptor {
                    name: Some(format!("field{}", i)),
                    ..Default::default()
                });
        }
        let driver = MemoryDriver::new().with_page("https://big.test/", page);
        driver.navigate_with_retry("https://big.test/").await.unwrap();

        let snapshot = observer(driver).observe().await.unwrap();
        assert_eq!(snapshot.visible_text.chars().count(), 1500);
        assert_eq!(snapshot.buttons.len(), 15);
        assert_eq!(snapshot.links.len(), 15);
        assert_eq!(snapshot.inputs.len(), 10);
        assert_eq!(snapshot.buttons[0].text, "Button 0");
    }

    #[tokio::test]
    async fn test_filters_empty_text_and_hidden_inputs() {
        let page = MemoryPage::new("Form")
            .button("")
            .button("   ")
            .button("Save")
            .input(ElementDescriptor {
                input_type: Some("hidden".to_string()),
                name: Some("csrf".to_string()),
                ..Default::default()
            })
            .input(ElementDescriptor {
                name: Some("email".to_string()),
                ..Default::default()
            });
        let driver = MemoryDriver::new().with_page("https://form.test/", page);
        driver.navigate_with_retry("https://form.test/").await.unwrap();

        let snapshot = observer(driver).observe().await.unwrap();
        assert_eq!(snapshot.buttons.len(), 1);
        assert_eq!(snapshot.buttons[0].text, "Save");
        assert_eq!(snapshot.inputs.len(), 1);
        assert_eq!(snapshot.inputs[0].name.as_deref(), Some("email"));
    }

    #[tokio::test]
    async fn test_hidden_elements_do_not_crowd_out_visible_ones() {
        let mut page = MemoryPage::new("Shop");
        for i in 0..15 {
            page = page.element(
                PageElement::new(
                    format!("#menu-{}", i),
                    "button",
                    ElementDescriptor::with_text(format!("Mobile menu {}", i)),
                )
                .hidden(),
            );
        }
        page = page
            .button("Checkout")
            .element(
                PageElement::new(
                    "#drawer-search",
                    "input",
                    ElementDescriptor {
                        name: Some("search".to_string()),
                        ..Default::default()
                    },
                )
                .hidden(),
            );
        let driver = MemoryDriver::new().with_page("https://shop.test/", page);
        driver.navigate_with_retry("https://shop.test/").await.unwrap();

        let snapshot = observer(driver).observe().await.unwrap();
        assert_eq!(snapshot.buttons.len(), 1);
        assert_eq!(snapshot.buttons[0].text, "Checkout");
        assert!(snapshot.inputs.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_surfaces_as_error() {
        let driver =
            MemoryDriver::new().with_page("https://gone.test/", MemoryPage::new("x").broken());
        driver.navigate_with_retry("https://gone.test/").await.unwrap();

        let err = observer(driver).observe().await.unwrap_err();
        assert!(matches!(err, ObservationError::ReadFailed(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_snapshot_outlives_page() {
        let observer = observer(MemoryDriver::new());
        let elements = InteractiveElements {
            buttons: vec![PageElement::new("#b", "button", ElementDescriptor::with_text("Go"))],
            ..Default::default()
        };
        let snapshot = observer.shape("u".into(), "t".into(), "body", &elements);
        drop(elements);
        assert_eq!(snapshot.buttons[0].text, "Go");
    }
}

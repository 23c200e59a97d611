//! Element resolution strategies
//!
//! Each strategy answers "which element, if any" for a target description.
//! A `ResolutionPlan` tries them in a fixed order and the first match wins;
//! there is no scoring beyond that order.
//!
//! Click plan:
//! 1. Buttons by text (bidirectional substring)
//! 2. Links by text (bidirectional substring)
//! 3. Submit/button inputs by value, then by first description token
//!
//! Type plan:
//! 1. Fields whose placeholder/name/id contains a description keyword
//! 2. First visible field

use crate::browser::{InteractiveElements, PageElement};

/// Lowercase alphanumerics only, so "Log In" and "login" compare equal
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Candidate text contains the description, or the description contains it.
/// Empty strings never match.
pub fn contains_either(candidate: &str, wanted: &str) -> bool {
    let candidate = normalize(candidate);
    let wanted = normalize(wanted);
    if candidate.is_empty() || wanted.is_empty() {
        return false;
    }
    candidate.contains(&wanted) || wanted.contains(&candidate)
}

/// Whitespace tokens longer than two characters, lowercased
pub fn keywords(description: &str) -> Vec<String> {
    description
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// One tier of the grounding heuristic
pub trait Resolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve<'a>(&self, target: &str, elements: &'a InteractiveElements)
        -> Option<&'a PageElement>;
}

/// Which element list a text strategy searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Buttons,
    Links,
}

/// Visible element whose text matches the description either way
#[derive(Debug, Clone, Copy)]
pub struct TextMatch(pub Category);

impl Resolver for TextMatch {
    fn name(&self) -> &'static str {
        match self.0 {
            Category::Buttons => "button-text",
            Category::Links => "link-text",
        }
    }

    fn resolve<'a>(
        &self,
        target: &str,
        elements: &'a InteractiveElements,
    ) -> Option<&'a PageElement> {
        let list = match self.0 {
            Category::Buttons => &elements.buttons,
            Category::Links => &elements.links,
        };
        list.iter()
            .filter(|el| el.visible)
            .find(|el| contains_either(&el.descriptor.text, target))
    }
}

/// `<input type=submit|button>`: match on text if any, else on `value`,
/// falling back to the description's first token appearing in the value
#[derive(Debug, Clone, Copy)]
pub struct ButtonInputMatch;

impl Resolver for ButtonInputMatch {
    fn name(&self) -> &'static str {
        "input-value"
    }

    fn resolve<'a>(
        &self,
        target: &str,
        elements: &'a InteractiveElements,
    ) -> Option<&'a PageElement> {
        let first_token = target
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .unwrap_or_default();

        elements
            .inputs
            .iter()
            .filter(|el| el.visible && el.is_button_input())
            .find(|el| {
                let descriptor = &el.descriptor;
                if !descriptor.text.trim().is_empty() {
                    return contains_either(&descriptor.text, target);
                }
                let value = descriptor.value.as_deref().unwrap_or("");
                contains_either(value, target)
                    || (!first_token.is_empty() && value.to_lowercase().contains(&first_token))
            })
    }
}

/// Field whose joined placeholder/name/id contains any description keyword
#[derive(Debug, Clone, Copy)]
pub struct AttributeKeywordMatch;

impl Resolver for AttributeKeywordMatch {
    fn name(&self) -> &'static str {
        "field-attributes"
    }

    fn resolve<'a>(
        &self,
        target: &str,
        elements: &'a InteractiveElements,
    ) -> Option<&'a PageElement> {
        let tokens = keywords(target);
        if tokens.is_empty() {
            return None;
        }
        elements
            .inputs
            .iter()
            .filter(|el| el.visible && el.is_text_entry())
            .find(|el| {
                let d = &el.descriptor;
                let joined = [&d.placeholder, &d.name, &d.id]
                    .iter()
                    .filter_map(|v| v.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();
                tokens.iter().any(|t| joined.contains(t.as_str()))
            })
    }
}

/// First visible field, whatever the description says
#[derive(Debug, Clone, Copy)]
pub struct FirstVisibleField;

impl Resolver for FirstVisibleField {
    fn name(&self) -> &'static str {
        "first-visible-field"
    }

    fn resolve<'a>(
        &self,
        _target: &str,
        elements: &'a InteractiveElements,
    ) -> Option<&'a PageElement> {
        elements
            .inputs
            .iter()
            .find(|el| el.visible && el.is_text_entry())
    }
}

/// A resolved element and the tier that found it
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub element: &'a PageElement,
    pub strategy: &'static str,
}

/// Ordered resolver tiers
pub struct ResolutionPlan {
    strategies: Vec<Box<dyn Resolver>>,
}

impl ResolutionPlan {
    pub fn new(strategies: Vec<Box<dyn Resolver>>) -> Self {
        Self { strategies }
    }

    /// Buttons, then links, then submit/button inputs
    pub fn click() -> Self {
        Self::new(vec![
            Box::new(TextMatch(Category::Buttons)),
            Box::new(TextMatch(Category::Links)),
            Box::new(ButtonInputMatch),
        ])
    }

    /// Keyword match on field attributes, then the first visible field
    pub fn fill() -> Self {
        Self::new(vec![Box::new(AttributeKeywordMatch), Box::new(FirstVisibleField)])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve<'a>(
        &self,
        target: &str,
        elements: &'a InteractiveElements,
    ) -> Option<Resolution<'a>> {
        self.strategies.iter().find_map(|strategy| {
            strategy.resolve(target, elements).map(|element| Resolution {
                element,
                strategy: strategy.name(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ElementDescriptor;

    fn button(locator: &str, text: &str) -> PageElement {
        PageElement::new(locator, "button", ElementDescriptor::with_text(text))
    }

    fn link(locator: &str, text: &str) -> PageElement {
        PageElement::new(locator, "a", ElementDescriptor::with_text(text))
    }

    fn field(locator: &str, name: &str) -> PageElement {
        PageElement::new(
            locator,
            "input",
            ElementDescriptor {
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
    }

    fn submit(locator: &str, value: &str) -> PageElement {
        PageElement::new(
            locator,
            "input",
            ElementDescriptor {
                input_type: Some("submit".to_string()),
                value: Some(value.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_contains_either() {
        assert!(contains_either("Log In", "log in"));
        assert!(contains_either("Log In", "login"));
        assert!(contains_either("Sign-up", "sign up"));
        assert!(contains_either("Add to cart", "cart"));
        assert!(contains_either("Cart", "the cart icon"));
        assert!(!contains_either("", "anything"));
        assert!(!contains_either("→", "next"));
        assert!(!contains_either("Cancel", ""));
        assert!(!contains_either("Cancel", "login"));
    }

    #[test]
    fn test_keywords_drop_short_tokens() {
        assert_eq!(keywords("the email address"), vec!["the", "email", "address"]);
        assert_eq!(keywords("an id of it"), Vec::<String>::new());
    }

    #[test]
    fn test_button_text_first_match_in_dom_order() {
        let elements = InteractiveElements {
            buttons: vec![
                button("#a", "Cancel"),
                button("#b", "Add to cart"),
                button("#c", "Cart"),
            ],
            ..Default::default()
        };
        let found = TextMatch(Category::Buttons).resolve("cart", &elements).unwrap();
        assert_eq!(found.locator.as_str(), "#b");
    }

    #[test]
    fn test_hidden_elements_are_skipped() {
        let elements = InteractiveElements {
            buttons: vec![button("#a", "Menu").hidden(), button("#b", "Menu")],
            ..Default::default()
        };
        let found = TextMatch(Category::Buttons).resolve("menu", &elements).unwrap();
        assert_eq!(found.locator.as_str(), "#b");
    }

    #[test]
    fn test_button_category_beats_link() {
        let elements = InteractiveElements {
            buttons: vec![button("#btn", "Login help")],
            links: vec![link("#lnk", "Login")],
            ..Default::default()
        };
        let resolution = ResolutionPlan::click().resolve("login", &elements).unwrap();
        assert_eq!(resolution.element.locator.as_str(), "#btn");
        assert_eq!(resolution.strategy, "button-text");
    }

    #[test]
    fn test_submit_value_and_token_fallback() {
        let elements = InteractiveElements {
            inputs: vec![field("#user", "username"), submit("#go", "Login")],
            ..Default::default()
        };
        let by_value = ButtonInputMatch.resolve("login", &elements).unwrap();
        assert_eq!(by_value.locator.as_str(), "#go");

        // neither string contains the other; only the first token matches
        let elements = InteractiveElements {
            inputs: vec![submit("#go", "Login now")],
            ..Default::default()
        };
        let by_token = ButtonInputMatch.resolve("Login to the site", &elements).unwrap();
        assert_eq!(by_token.locator.as_str(), "#go");
    }

    #[test]
    fn test_attribute_keyword_match() {
        let elements = InteractiveElements {
            inputs: vec![field("#pw", "password"), field("#em", "email")],
            ..Default::default()
        };
        let found = AttributeKeywordMatch.resolve("email address", &elements).unwrap();
        assert_eq!(found.locator.as_str(), "#em");
    }

    #[test]
    fn test_fill_plan_falls_back_to_first_visible_field() {
        let elements = InteractiveElements {
            inputs: vec![
                submit("#go", "Send"),
                field("#hidden", "token").hidden(),
                field("#q", "q"),
            ],
            ..Default::default()
        };
        let resolution = ResolutionPlan::fill().resolve("search box", &elements).unwrap();
        assert_eq!(resolution.element.locator.as_str(), "#q");
        assert_eq!(resolution.strategy, "first-visible-field");
    }

    #[test]
    fn test_textarea_is_a_field() {
        let elements = InteractiveElements {
            inputs: vec![PageElement::new(
                "#msg",
                "textarea",
                ElementDescriptor {
                    placeholder: Some("Your message".to_string()),
                    ..Default::default()
                },
            )],
            ..Default::default()
        };
        let resolution = ResolutionPlan::fill().resolve("message body", &elements).unwrap();
        assert_eq!(resolution.strategy, "field-attributes");
    }

    #[test]
    fn test_plan_order_is_stable() {
        assert_eq!(
            ResolutionPlan::click().strategy_names(),
            vec!["button-text", "link-text", "input-value"]
        );
        assert_eq!(
            ResolutionPlan::fill().strategy_names(),
            vec!["field-attributes", "first-visible-field"]
        );
    }
}

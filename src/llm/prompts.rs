//! Prompt templates for the exploration policy

use crate::agent::history::StepRecord;
use crate::agent::observer::Snapshot;
use crate::browser::ElementDescriptor;
use crate::core::Message;

pub const SYSTEM_PROMPT: &str = "You are a helpful QA AI agent. You explore websites the way a \
real user would and reply with a single JSON object, nothing else.";

const EXPLORATION_TEMPLATE: &str = r#"You are SiteScout, a QA agent exploring a website to find UX problems and understand its main user flows.

## Current page
URL: {url}
Title: {title}

## Visible text
{page_text}

## Interactive elements
{elements}

## Recent steps
{history}

## Your job
1. Work out what this page is for and what a user can do here.
2. Choose the single most sensible next step a real user would take to reach the core value of the site (for example: view product, add to cart, check out).
3. Note anything that looks broken, confusing or wrong.

## Rules
- Only target elements from the list above, described by their visible text or field name.
- On a login page without known credentials, look for a sign-up link, go back, or stop.
- Do not repeat the same action on the same page; if recent steps show a loop, choose something else.
- If the flow is complete or you are stuck, use "stop".

## Reply format (JSON only)
{
  "page_summary": "short description of the page",
  "reasoning": "why this next action",
  "next_action": {
    "type": "click | type | navigate | stop",
    "target_description": "visible text of the element, field name, or URL for navigate",
    "input_value": "text to type, for type actions",
    "reason": "one sentence on what this action should achieve"
  },
  "confidence_score": 0.0,
  "potential_issues": ["UX or functional problems seen on this page"]
}"#;

const NO_HISTORY: &str = "No history yet (start of session).";

fn element_lines(label: &str, elements: &[ElementDescriptor], out: &mut Vec<String>) {
    for element in elements {
        let description = element.describe();
        if !description.is_empty() {
            out.push(format!("[{}] {}", label, description));
        }
    }
}

/// One line per element, buttons then links then inputs
pub fn render_elements(snapshot: &Snapshot) -> String {
    let mut lines = Vec::new();
    element_lines("button", &snapshot.buttons, &mut lines);
    element_lines("link", &snapshot.links, &mut lines);
    for input in &snapshot.inputs {
        lines.push(format!("[input type={}] {}", input.input_type(), input.describe()));
    }
    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn render_history(history: &[StepRecord]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }
    history
        .iter()
        .map(StepRecord::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user prompt for one decision
pub fn exploration_prompt(snapshot: &Snapshot, history: &[StepRecord]) -> String {
    EXPLORATION_TEMPLATE
        .replace("{url}", &snapshot.url)
        .replace("{title}", &snapshot.title)
        .replace("{elements}", &render_elements(snapshot))
        .replace("{history}", &render_history(history))
        .replace("{page_text}", &snapshot.visible_text)
}

/// System + user messages for one decision
pub fn exploration_messages(snapshot: &Snapshot, history: &[StepRecord]) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(exploration_prompt(snapshot, history)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            url: "https://shop.test/".into(),
            title: "Swag Labs".into(),
            visible_text: "Products".into(),
            buttons: vec![ElementDescriptor::with_text("Add to cart")],
            links: vec![],
            inputs: vec![ElementDescriptor {
                name: Some("user-name".into()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_prompt_contains_page_state() {
        let prompt = exploration_prompt(&snapshot(), &[]);
        assert!(prompt.contains("URL: https://shop.test/"));
        assert!(prompt.contains("Title: Swag Labs"));
        assert!(prompt.contains("[button] 'Add to cart'"));
        assert!(prompt.contains("[input type=text] name='user-name'"));
        assert!(prompt.contains(NO_HISTORY));
        assert!(prompt.contains("\"next_action\""));
        assert!(!prompt.contains("{url}"));
    }

    #[test]
    fn test_empty_element_list() {
        let snapshot = Snapshot::default();
        assert_eq!(render_elements(&snapshot), "(none)");
    }

    #[test]
    fn test_messages_have_system_first() {
        let messages = exploration_messages(&snapshot(), &[]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }
}

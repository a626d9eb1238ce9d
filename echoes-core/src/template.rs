//! Prompt templates with named `{placeholder}` slots.

use crate::config::TemplateOverrides;
use std::collections::BTreeMap;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.txt");
const STORY_TEMPLATE: &str = include_str!("prompts/story.txt");
const EPILOGUE_TEMPLATE: &str = include_str!("prompts/epilogue.txt");

/// Premise used when a session is started without one.
pub const DEFAULT_PREMISE: &str = include_str!("prompts/premise.txt");

/// A textual template.
///
/// Placeholders are `{name}` where `name` is ASCII alphanumerics and
/// underscores. Substitution is a single pass, so values that themselves
/// contain braces are inserted verbatim. Placeholders without a value are
/// left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.text.as_str();
        while let Some((_, name, after)) = next_placeholder(rest) {
            if !names.contains(&name) {
                names.push(name);
            }
            rest = after;
        }
        names
    }

    /// Fill every placeholder that has a value.
    pub fn render(&self, values: &BTreeMap<&str, String>) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some((before, name, after)) = next_placeholder(rest) {
            out.push_str(before);
            match values.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = after;
        }
        out.push_str(rest);
        out
    }
}

/// Split `text` around its first well-formed placeholder.
fn next_placeholder(text: &str) -> Option<(&str, &str, &str)> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let open = search_from + offset;
        let body = &text[open + 1..];
        let name_len = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        if name_len > 0 && body[name_len..].starts_with('}') {
            let name = &body[..name_len];
            return Some((&text[..open], name, &body[name_len + 1..]));
        }
        search_from = open + 1;
    }
    None
}

/// The three templates the engine fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub system: PromptTemplate,
    pub story: PromptTemplate,
    pub epilogue: PromptTemplate,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            system: PromptTemplate::new(SYSTEM_TEMPLATE.trim()),
            story: PromptTemplate::new(STORY_TEMPLATE.trim()),
            epilogue: PromptTemplate::new(EPILOGUE_TEMPLATE.trim()),
        }
    }
}

impl Templates {
    /// Built-in templates with any configured replacements applied.
    pub fn from_overrides(overrides: &TemplateOverrides) -> Self {
        let mut templates = Self::default();
        if let Some(system) = &overrides.system {
            templates.system = PromptTemplate::new(system.clone());
        }
        if let Some(story) = &overrides.story {
            templates.story = PromptTemplate::new(story.clone());
        }
        if let Some(epilogue) = &overrides.epilogue {
            templates.epilogue = PromptTemplate::new(epilogue.clone());
        }
        templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_is_order_independent() {
        let template = PromptTemplate::new("{b} then {a} then {b}");
        let out = template.render(&values(&[("a", "1"), ("b", "2")]));
        assert_eq!(out, "2 then 1 then 2");
    }

    #[test]
    fn test_missing_values_and_stray_braces_survive() {
        let template = PromptTemplate::new("{known} {unknown} { spaced } {} {");
        let out = template.render(&values(&[("known", "yes")]));
        assert_eq!(out, "yes {unknown} { spaced } {} {");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = PromptTemplate::new("say {player_response}");
        let out = template.render(&values(&[
            ("player_response", "{round}"),
            ("round", "4"),
        ]));
        assert_eq!(out, "say {round}");
    }

    #[test]
    fn test_placeholders_listed_once() {
        let template = PromptTemplate::new("{x}{y}{x}");
        assert_eq!(template.placeholders(), vec!["x", "y"]);
    }

    #[test]
    fn test_default_story_template_slots() {
        let templates = Templates::default();
        let names = templates.story.placeholders();
        for slot in [
            "story_premise",
            "character_info",
            "summary",
            "npc_relationships",
            "inventory",
            "recent_events",
            "player_response",
            "round",
            "rounds_remaining",
        ] {
            assert!(names.contains(&slot), "story template lacks {slot}");
        }
        assert!(templates.epilogue.placeholders().contains(&"end_reason"));
        assert!(!DEFAULT_PREMISE.trim().is_empty());
    }

    #[test]
    fn test_overrides_replace_only_given_templates() {
        let overrides = TemplateOverrides {
            story: Some("Act: {player_response}".to_string()),
            ..TemplateOverrides::default()
        };
        let templates = Templates::from_overrides(&overrides);
        assert_eq!(templates.story.text(), "Act: {player_response}");
        assert_eq!(templates.system, Templates::default().system);
    }
}

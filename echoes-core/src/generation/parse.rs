//! Lenient parsing of narrator replies.
//!
//! The story template asks for labelled sections, but models drift: headers
//! come back bolded, in another order, or missing. Anything that still
//! yields a narrative is accepted; only an empty reply or an empty
//! narrative counts as unusable.

use crate::memory::{Archetype, Interaction};
use crate::session::CHOICES_PER_ROUND;
use thiserror::Error;

/// Phrases that introduce an item in plain prose.
const ITEM_INDICATORS: &[&str] = &[
    "found a ",
    "found an ",
    "picked up a ",
    "picked up an ",
    "discovered a ",
    "discovered an ",
    "obtained a ",
    "obtained an ",
    "received a ",
    "received an ",
    "given a ",
    "given an ",
];

/// Longest phrase the prose heuristic treats as an item name.
const MAX_INFERRED_ITEM_CHARS: usize = 30;

/// Verbs that mark the word before them as a speaker.
const SPEECH_VERBS: &[&str] = &["says", "said", "asked", "replied", "shouted", "whispered"];

/// Words that look like speakers but never name an NPC.
const NOT_SPEAKERS: &[&str] = &["you", "i", "we", "they", "he", "she", "it"];

/// Names of this length or longer are not taken as speakers.
const MAX_INFERRED_NPC_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("reply was empty")]
    Empty,

    #[error("reply had no narrative")]
    NoNarrative,
}

/// An item the reply says the player found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundItem {
    pub name: String,
    pub description: String,
    /// Picked out of the prose rather than an `ITEMS FOUND:` section.
    pub inferred: bool,
}

/// Everything one reply asks the engine to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub narrative: String,
    pub items_found: Vec<FoundItem>,
    pub items_used: Vec<String>,
    pub npcs: Vec<Interaction>,
    /// `npcs` came from dialogue in the prose rather than an `NPCS:` section.
    pub npcs_inferred: bool,
    pub choices: Vec<String>,
    /// The narrator closed the story.
    pub terminal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Narrative,
    ItemsFound,
    ItemsUsed,
    Npcs,
    Choices,
    Epilogue,
}

impl Section {
    fn from_header(label: &str) -> Option<Self> {
        let label: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_uppercase)
            .collect();
        match label.as_str() {
            "NARRATIVE" | "STORY" => Some(Section::Narrative),
            "ITEMSFOUND" | "ITEMFOUND" | "FOUNDITEMS" => Some(Section::ItemsFound),
            "ITEMSUSED" | "ITEMUSED" | "USEDITEMS" => Some(Section::ItemsUsed),
            "NPCS" | "NPC" | "CHARACTERS" => Some(Section::Npcs),
            "CHOICES" | "OPTIONS" => Some(Section::Choices),
            "EPILOGUE" => Some(Section::Epilogue),
            _ => None,
        }
    }
}

/// Strip markdown emphasis and heading marks from both ends of a line.
fn undecorate(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['#', '*', '_', '>'])
        .trim_end_matches(['*', '_'])
        .trim()
}

/// Recognise `HEADER:` lines (or a bare `HEADER` line), returning the
/// section and any text after the colon.
fn header(line: &str) -> Option<(Section, &str)> {
    let line = undecorate(line);
    let (label, rest) = match line.find(':') {
        Some(colon) => (&line[..colon], &line[colon + 1..]),
        None => (line, ""),
    };
    let label = label.trim_end_matches(['*', '_']);
    if label.chars().count() > 20 || !label.starts_with(char::is_alphabetic) {
        return None;
    }
    let section = Section::from_header(label)?;
    Some((section, rest.trim_start_matches(['*', '_']).trim()))
}

fn is_end_marker(line: &str) -> bool {
    let line = undecorate(line).trim_end_matches(['.', '!']);
    line.eq_ignore_ascii_case("the end")
}

/// Strip a list marker (`-`, `*`, `•`, `1.`, `2)`); `None` for blank lines.
fn list_item(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let stripped = if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        rest
    } else {
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        match line[digits..].strip_prefix(['.', ')']) {
            Some(rest) if digits > 0 => rest,
            _ => line,
        }
    };
    let item = stripped.trim().trim_matches('*').trim();
    if item.is_empty() || is_placeholder(item) {
        return None;
    }
    Some(item)
}

fn is_placeholder(item: &str) -> bool {
    let item = item.trim_end_matches('.').to_ascii_lowercase();
    matches!(item.as_str(), "none" | "nothing" | "n/a" | "no one" | "nobody")
}

fn split_item(item: &str) -> (&str, &str) {
    if let Some((name, description)) = item.split_once(':') {
        return (name.trim(), description.trim());
    }
    if let Some((name, description)) = item.split_once(" - ") {
        return (name.trim(), description.trim());
    }
    (item.trim(), "")
}

fn parse_npc(item: &str) -> Option<Interaction> {
    let mut fields = item.splitn(4, '|').map(str::trim);
    let name = fields.next().filter(|n| !n.is_empty())?;
    let mut interaction = Interaction::new(name.trim_matches('*'));

    if let Some(role) = fields.next() {
        if let Ok(archetype) = role.parse::<Archetype>() {
            interaction = interaction.with_archetype(archetype);
        }
    }
    if let Some(delta) = fields.next() {
        let delta = delta.trim_start_matches('+');
        if let Ok(delta) = delta.parse::<i64>() {
            interaction = interaction.with_delta(delta);
        }
    }
    if let Some(note) = fields.next() {
        interaction = interaction.with_note(note);
    }
    Some(interaction)
}

/// Pick items out of prose such as "you found a rusted key."
pub fn infer_items(narrative: &str) -> Vec<FoundItem> {
    // ASCII lowercasing keeps byte offsets aligned with `narrative`.
    let lower = narrative.to_ascii_lowercase();
    let mut found: Vec<FoundItem> = Vec::new();

    for indicator in ITEM_INDICATORS {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(indicator) {
            let start = from + pos + indicator.len();
            from = start;
            let tail = &narrative[start..];
            let end = tail
                .find(['.', ',', ';', '!', '?', '\n'])
                .unwrap_or(tail.len());
            let name = tail[..end].trim();
            if name.is_empty() || name.chars().count() >= MAX_INFERRED_ITEM_CHARS {
                continue;
            }
            if found.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            found.push(FoundItem {
                name: name.to_string(),
                description: String::new(),
                inferred: true,
            });
        }
    }
    found
}

/// Pick speakers out of dialogue such as `Mara: "..."` or
/// `Mara said, "..."`.
pub fn infer_npcs(narrative: &str) -> Vec<Interaction> {
    let mut names: Vec<&str> = Vec::new();
    for line in narrative.lines() {
        let Some(quote) = line.find(['"', '\u{201C}']) else {
            continue;
        };
        let before = line[..quote].trim();

        if let Some((label, _)) = before.split_once(':') {
            push_speaker(&mut names, label.trim());
        }
        let words: Vec<&str> = before
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .collect();
        for (idx, word) in words.iter().enumerate() {
            if idx > 0 && SPEECH_VERBS.contains(&word.to_ascii_lowercase().as_str()) {
                push_speaker(&mut names, words[idx - 1]);
            }
        }
    }
    names.into_iter().map(Interaction::new).collect()
}

fn push_speaker<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    let usable = !name.is_empty()
        && name.chars().count() < MAX_INFERRED_NPC_CHARS
        && name.starts_with(char::is_uppercase)
        && !NOT_SPEAKERS.contains(&name.to_lowercase().as_str());
    if usable && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        names.push(name);
    }
}

/// Parse one reply.
pub fn parse_reply(text: &str) -> Result<RoundOutcome, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut outcome = RoundOutcome::default();
    let mut preamble: Vec<&str> = Vec::new();
    let mut narrative: Vec<&str> = Vec::new();
    let mut epilogue: Vec<&str> = Vec::new();
    let mut saw_narrative = false;
    let mut saw_items_found = false;
    let mut saw_npcs = false;
    let mut section = Section::Preamble;

    for line in text.lines() {
        if is_end_marker(line) {
            outcome.terminal = true;
            continue;
        }
        let content = match header(line) {
            Some((next, rest)) => {
                section = next;
                match next {
                    Section::Narrative => saw_narrative = true,
                    Section::ItemsFound => saw_items_found = true,
                    Section::Npcs => saw_npcs = true,
                    Section::Epilogue => outcome.terminal = true,
                    _ => {}
                }
                if rest.is_empty() {
                    continue;
                }
                rest
            }
            None => line,
        };

        match section {
            Section::Preamble => preamble.push(content),
            Section::Narrative => narrative.push(content),
            Section::Epilogue => epilogue.push(content),
            Section::ItemsFound => {
                if let Some(item) = list_item(content) {
                    let (name, description) = split_item(item);
                    if !name.is_empty() {
                        outcome.items_found.push(FoundItem {
                            name: name.to_string(),
                            description: description.to_string(),
                            inferred: false,
                        });
                    }
                }
            }
            Section::ItemsUsed => {
                if let Some(item) = list_item(content) {
                    let (name, _) = split_item(item);
                    if !name.is_empty() {
                        outcome.items_used.push(name.to_string());
                    }
                }
            }
            Section::Npcs => {
                if let Some(npc) = list_item(content).and_then(parse_npc) {
                    outcome.npcs.push(npc);
                }
            }
            Section::Choices => {
                if let Some(choice) = list_item(content) {
                    outcome.choices.push(choice.to_string());
                }
            }
        }
    }

    let mut body = if saw_narrative {
        join_paragraphs(&narrative)
    } else {
        join_paragraphs(&preamble)
    };
    let closing = join_paragraphs(&epilogue);
    if !closing.is_empty() {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(&closing);
    }
    if body.is_empty() {
        return Err(ParseError::NoNarrative);
    }

    if !saw_items_found {
        outcome.items_found = infer_items(&body);
    }
    if !saw_npcs {
        outcome.npcs = infer_npcs(&body);
        outcome.npcs_inferred = true;
    }
    outcome.choices.truncate(CHOICES_PER_ROUND);
    outcome.narrative = body;
    Ok(outcome)
}

/// Join lines, trimming blank lines at both ends.
fn join_paragraphs(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPLY: &str = "\
NARRATIVE:
The wind drops as you reach the pumping station. Mara waits by the gate.

She nods at the canteen on your belt.

ITEMS FOUND:
- Rusted Valve Key: opens the old cistern
- Flare - one use left

ITEMS USED:
- Canteen

NPCS:
- Mara | Mentor | +15 | shared the route north
- Jonah | Rival | -5
- Tess

CHOICES:
1. Open the cistern
2. Follow Mara north
3. Wait for nightfall
4. An extra option
";

    #[test]
    fn test_parses_all_sections() {
        let outcome = parse_reply(FULL_REPLY).unwrap();

        assert!(outcome.narrative.starts_with("The wind drops"));
        assert!(outcome.narrative.ends_with("on your belt."));
        assert_eq!(outcome.items_found.len(), 2);
        assert_eq!(outcome.items_found[0].name, "Rusted Valve Key");
        assert_eq!(outcome.items_found[0].description, "opens the old cistern");
        assert_eq!(outcome.items_found[1].name, "Flare");
        assert!(!outcome.items_found[0].inferred);
        assert_eq!(outcome.items_used, vec!["Canteen"]);

        assert_eq!(outcome.npcs.len(), 3);
        assert_eq!(outcome.npcs[0].archetype, Some(Archetype::Mentor));
        assert_eq!(outcome.npcs[0].delta, 15);
        assert_eq!(outcome.npcs[0].note, "shared the route north");
        assert_eq!(outcome.npcs[1].delta, -5);
        assert_eq!(outcome.npcs[2].npc, "Tess");
        assert_eq!(outcome.npcs[2].archetype, None);

        assert_eq!(
            outcome.choices,
            vec!["Open the cistern", "Follow Mara north", "Wait for nightfall"]
        );
        assert!(!outcome.terminal);
    }

    #[test]
    fn test_markdown_headers_any_order() {
        let reply = "**Choices:**\n- Run\n- Hide\n\n## Narrative\n\n**NARRATIVE:** Smoke rises.\n";
        let outcome = parse_reply(reply).unwrap();
        assert_eq!(outcome.narrative, "Smoke rises.");
        assert_eq!(outcome.choices, vec!["Run", "Hide"]);
    }

    #[test]
    fn test_missing_narrative_header_uses_preamble() {
        let reply = "You wade through the flooded mall.\n\nCHOICES:\n1. Swim\n2. Climb\n3. Shout";
        let outcome = parse_reply(reply).unwrap();
        assert_eq!(outcome.narrative, "You wade through the flooded mall.");
        assert_eq!(outcome.choices.len(), 3);
    }

    #[test]
    fn test_none_placeholders_are_ignored() {
        let reply = "NARRATIVE:\nQuiet.\nITEMS FOUND:\n- none\nNPCS:\n- None.\nCHOICES:\n1. Rest";
        let outcome = parse_reply(reply).unwrap();
        assert!(outcome.items_found.is_empty());
        assert!(outcome.npcs.is_empty());
    }

    #[test]
    fn test_prose_heuristic_without_items_section() {
        let reply = "NARRATIVE:\nYou found a rusted key, then picked up an old radio. Later you found a rusted key.\nCHOICES:\n1. Go";
        let outcome = parse_reply(reply).unwrap();
        let names: Vec<&str> = outcome.items_found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["rusted key", "old radio"]);
        assert!(outcome.items_found.iter().all(|i| i.inferred));
    }

    #[test]
    fn test_items_section_disables_heuristic() {
        let reply = "NARRATIVE:\nYou found a shiny coin.\nITEMS FOUND:\n- none";
        let outcome = parse_reply(reply).unwrap();
        assert!(outcome.items_found.is_empty());
    }

    #[test]
    fn test_terminal_markers() {
        let ended = parse_reply("NARRATIVE:\nThe rain returns.\n\n**THE END**").unwrap();
        assert!(ended.terminal);
        assert_eq!(ended.narrative, "The rain returns.");

        let epilogue =
            parse_reply("NARRATIVE:\nYou rest.\nEPILOGUE:\nYears later, the valley blooms.").unwrap();
        assert!(epilogue.terminal);
        assert!(epilogue.narrative.ends_with("the valley blooms."));
    }

    #[test]
    fn test_unusable_replies() {
        assert_eq!(parse_reply("   \n"), Err(ParseError::Empty));
        assert_eq!(
            parse_reply("NARRATIVE:\n\nCHOICES:\n1. Go"),
            Err(ParseError::NoNarrative)
        );
    }

    #[test]
    fn test_speakers_inferred_without_npcs_section() {
        let reply = "Mara said, \"Keep to the ridge.\" Then she left.\n\
Old Tom: \"Water's two days out.\"\n\
You asked, \"Why?\"\n\
she whispered \"later\"\n\
A voice from the dark belonged to someone: \"Hey.\"\n\
CHOICES:\n1. Follow";
        let outcome = parse_reply(reply).unwrap();
        let names: Vec<&str> = outcome.npcs.iter().map(|n| n.npc.as_str()).collect();
        assert_eq!(names, vec!["Mara", "Old Tom"]);
        assert!(outcome.npcs_inferred);
        assert!(outcome.npcs.iter().all(|n| n.delta == 0 && n.archetype.is_none()));
    }

    #[test]
    fn test_npcs_section_disables_speaker_inference() {
        let reply = "NARRATIVE:\nMara said, \"Go.\"\nNPCS:\n- none";
        let outcome = parse_reply(reply).unwrap();
        assert!(outcome.npcs.is_empty());
        assert!(!outcome.npcs_inferred);
    }

    #[test]
    fn test_non_numeric_delta_is_zero() {
        let outcome = parse_reply("Hi.\nNPCS:\n- Ode | Schemer | lots | grinned").unwrap();
        let ode = &outcome.npcs[0];
        assert_eq!(ode.archetype, None);
        assert_eq!(ode.delta, 0);
        assert_eq!(ode.note, "grinned");
    }
}

//! NPC relationships and the tracker that updates them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest possible affinity.
pub const AFFINITY_MIN: i32 = -100;

/// Highest possible affinity.
pub const AFFINITY_MAX: i32 = 100;

/// Default bound on a relationship summary, in characters.
pub const DEFAULT_SUMMARY_CHARS: usize = 240;

const NOTE_SEPARATOR: &str = " | ";

/// Stable identifier for an NPC, derived from the display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NpcId(String);

impl NpcId {
    /// Slug a display name: lowercase alphanumeric words joined by `-`.
    ///
    /// Returns `None` when the name has no alphanumeric content.
    pub fn from_name(name: &str) -> Option<Self> {
        let slug = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("-");
        if slug.is_empty() {
            None
        } else {
            Some(Self(slug))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The narrative role an NPC plays toward the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Archetype {
    Mentor,
    Opportunist,
    Rival,
    LostSoul,
    #[default]
    WildCard,
}

impl Archetype {
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Mentor => "Mentor",
            Archetype::Opportunist => "Opportunist",
            Archetype::Rival => "Rival",
            Archetype::LostSoul => "Lost Soul",
            Archetype::WildCard => "Wild Card",
        }
    }

    pub fn all() -> &'static [Archetype] {
        &[
            Archetype::Mentor,
            Archetype::Opportunist,
            Archetype::Rival,
            Archetype::LostSoul,
            Archetype::WildCard,
        ]
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an archetype name that matches none of the five roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownArchetype(pub String);

impl FromStr for Archetype {
    type Err = UnknownArchetype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match wanted.as_str() {
            "mentor" => Ok(Archetype::Mentor),
            "opportunist" => Ok(Archetype::Opportunist),
            "rival" => Ok(Archetype::Rival),
            "lostsoul" => Ok(Archetype::LostSoul),
            "wildcard" => Ok(Archetype::WildCard),
            _ => Err(UnknownArchetype(s.to_string())),
        }
    }
}

/// An NPC's disposition toward the player, always within
/// [`AFFINITY_MIN`, `AFFINITY_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Affinity(i32);

impl Affinity {
    /// Build an affinity, clamping out-of-range values.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(AFFINITY_MIN as i64, AFFINITY_MAX as i64) as i32)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// Shift by `delta`, saturating at the bounds.
    pub fn adjust(self, delta: i64) -> Self {
        Self::clamped((self.0 as i64).saturating_add(delta))
    }

    /// One-word description for prompts and listings.
    pub fn describe(self) -> &'static str {
        match self.0 {
            i32::MIN..=-60 => "hostile",
            -59..=-20 => "wary",
            -19..=19 => "neutral",
            20..=59 => "friendly",
            _ => "devoted",
        }
    }
}

impl TryFrom<i32> for Affinity {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (AFFINITY_MIN..=AFFINITY_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "affinity {value} outside [{AFFINITY_MIN}, {AFFINITY_MAX}]"
            ))
        }
    }
}

impl From<Affinity> for i32 {
    fn from(a: Affinity) -> i32 {
        a.0
    }
}

/// The player's relationship with one NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcRelationship {
    pub id: NpcId,
    pub name: String,
    pub archetype: Archetype,
    pub affinity: Affinity,
    /// Rolling digest of interaction notes, oldest first.
    pub summary: String,
    pub first_met_round: u32,
    pub last_interaction_round: u32,
}

impl NpcRelationship {
    pub fn new(id: NpcId, name: impl Into<String>, archetype: Archetype, round: u32) -> Self {
        Self {
            id,
            name: name.into(),
            archetype,
            affinity: Affinity::default(),
            summary: String::new(),
            first_met_round: round,
            last_interaction_round: round,
        }
    }

    /// One-line listing, e.g. `Mara (Mentor, friendly 35) - R2: shared water`.
    pub fn line(&self) -> String {
        let mut line = format!(
            "{} ({}, {} {})",
            self.name,
            self.archetype,
            self.affinity.describe(),
            self.affinity.value()
        );
        if !self.summary.is_empty() {
            line.push_str(" - ");
            line.push_str(&self.summary);
        }
        line
    }

    fn push_note(&mut self, note: &str, round: u32, max_chars: usize) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        let segment = format!("R{round}: {note}");
        if self.summary.is_empty() {
            self.summary = segment;
        } else {
            self.summary = format!("{}{NOTE_SEPARATOR}{segment}", self.summary);
        }
        self.summary = roll_summary(&self.summary, max_chars);
    }
}

/// Drop the oldest note segments until `summary` fits in `max_chars`.
///
/// A single remaining segment that is still too long keeps its tail end
/// cut off on a character boundary.
fn roll_summary(summary: &str, max_chars: usize) -> String {
    let mut segments: Vec<&str> = summary.split(NOTE_SEPARATOR).collect();
    while segments.len() > 1 && segments.join(NOTE_SEPARATOR).chars().count() > max_chars {
        segments.remove(0);
    }
    let joined = segments.join(NOTE_SEPARATOR);
    if joined.chars().count() > max_chars {
        joined.chars().take(max_chars).collect()
    } else {
        joined
    }
}

/// One interaction outcome to apply to an NPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// Display name as written by the narrator.
    pub npc: String,
    /// Role guess; only used when creating the NPC or when stated explicitly.
    pub archetype: Option<Archetype>,
    pub delta: i64,
    pub note: String,
}

impl Interaction {
    pub fn new(npc: impl Into<String>) -> Self {
        Self {
            npc: npc.into(),
            archetype: None,
            delta: 0,
            note: String::new(),
        }
    }

    pub fn with_archetype(mut self, archetype: Archetype) -> Self {
        self.archetype = Some(archetype);
        self
    }

    pub fn with_delta(mut self, delta: i64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// All NPC relationships in a session, in first-met order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    npcs: Vec<NpcRelationship>,
    #[serde(default = "default_summary_chars")]
    summary_chars: usize,
}

fn default_summary_chars() -> usize {
    DEFAULT_SUMMARY_CHARS
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new()
    }
}

impl Relationships {
    pub fn new() -> Self {
        Self {
            npcs: Vec::new(),
            summary_chars: DEFAULT_SUMMARY_CHARS,
        }
    }

    /// Use a different bound for relationship summaries.
    pub fn with_summary_chars(mut self, max_chars: usize) -> Self {
        self.summary_chars = max_chars.max(1);
        self
    }

    pub(crate) fn from_parts(npcs: Vec<NpcRelationship>, summary_chars: usize) -> Self {
        Self {
            npcs,
            summary_chars: summary_chars.max(1),
        }
    }

    pub fn summary_chars(&self) -> usize {
        self.summary_chars
    }

    /// Apply an interaction, creating the NPC on first mention.
    ///
    /// Affinity is clamped into range; it is never rejected. Returns the
    /// NPC's id, or `None` when the name has no usable characters.
    pub fn apply_interaction(&mut self, interaction: &Interaction, round: u32) -> Option<NpcId> {
        let name = interaction.npc.trim();
        let id = NpcId::from_name(name)?;
        let max_chars = self.summary_chars;

        let npc = match self.npcs.iter().position(|n| n.id == id) {
            Some(idx) => {
                let npc = &mut self.npcs[idx];
                if let Some(archetype) = interaction.archetype {
                    npc.archetype = archetype;
                }
                npc
            }
            None => {
                let archetype = interaction.archetype.unwrap_or_default();
                self.npcs
                    .push(NpcRelationship::new(id.clone(), name, archetype, round));
                let last = self.npcs.len() - 1;
                &mut self.npcs[last]
            }
        };

        npc.affinity = npc.affinity.adjust(interaction.delta);
        npc.push_note(&interaction.note, round, max_chars);
        npc.last_interaction_round = npc.last_interaction_round.max(round);
        Some(id)
    }

    pub fn get(&self, id: &NpcId) -> Option<&NpcRelationship> {
        self.npcs.iter().find(|n| &n.id == id)
    }

    /// Case- and punctuation-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&NpcRelationship> {
        let id = NpcId::from_name(name)?;
        self.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NpcRelationship> {
        self.npcs.iter()
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// NPCs ordered most-recently-interacted first, ties by name.
    pub fn by_recency(&self) -> Vec<&NpcRelationship> {
        let mut npcs: Vec<_> = self.npcs.iter().collect();
        npcs.sort_by(|a, b| {
            b.last_interaction_round
                .cmp(&a.last_interaction_round)
                .then_with(|| a.name.cmp(&b.name))
        });
        npcs
    }

    /// Known NPCs whose display name appears in `text` (whole-word,
    /// case-insensitive).
    pub fn mentioned_in(&self, text: &str) -> Vec<&NpcRelationship> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        self.npcs
            .iter()
            .filter(|npc| {
                let needle: Vec<&str> = npc.id.as_str().split('-').collect();
                !needle.is_empty()
                    && words
                        .windows(needle.len())
                        .any(|w| w.iter().zip(&needle).all(|(a, b)| a == b))
            })
            .collect()
    }
}

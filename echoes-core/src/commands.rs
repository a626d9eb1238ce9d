//! The player's command surface.
//!
//! Anything that is not a command is a story action. Every command except
//! `quit` is read-only and works on ended sessions too.

use crate::session::Session;

pub const HELP_TEXT: &str = "\
=== GAME HELP ===

COMMANDS:
- I or inventory: Check your inventory
- J or journal: Review what has happened so far
- C or characters: See the people you've met
- H or help: Display this help text
- Q or quit: End the game

GAMEPLAY:
- Type an action, or the number of one of the offered choices
- Your choices shape the story and how people regard you

The wasteland is yours to explore. Good luck!";

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Inventory,
    Journal,
    Characters,
    Help,
    Quit,
    /// Free text (or a choice number) for the narrator.
    Action(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "i" | "inventory" => Command::Inventory,
            "j" | "journal" => Command::Journal,
            "c" | "characters" => Command::Characters,
            "h" | "help" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            _ => Command::Action(trimmed.to_string()),
        }
    }

    /// Whether the command leaves the session untouched.
    pub fn is_read_only(&self) -> bool {
        !matches!(self, Command::Quit | Command::Action(_))
    }

    /// Text for a read-only command; `None` for quit and story actions.
    pub fn render(&self, session: &Session) -> Option<String> {
        match self {
            Command::Inventory => Some(session.inventory.listing()),
            Command::Journal => Some(session.journal.review()),
            Command::Characters => Some(characters(session)),
            Command::Help => Some(HELP_TEXT.to_string()),
            Command::Quit | Command::Action(_) => None,
        }
    }
}

fn characters(session: &Session) -> String {
    if session.relationships.is_empty() {
        return "You haven't met anyone yet.".to_string();
    }
    let mut out = String::from("=== CHARACTERS ===\n");
    for npc in session.relationships.by_recency() {
        out.push_str(&format!(
            "{} ({}): {} {}, last seen in round {}\n",
            npc.name,
            npc.archetype,
            npc.affinity.describe(),
            npc.affinity.value(),
            npc.last_interaction_round
        ));
        if !npc.summary.is_empty() {
            out.push_str(&format!("  {}\n", npc.summary));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Background, CharacterConfig, Trait};
    use crate::memory::{Archetype, Interaction};
    use crate::session::StoryLength;

    fn session() -> Session {
        let character = CharacterConfig::new()
            .name("Rosa")
            .background(Background::UsedCarSalesperson)
            .with_trait(Trait::Greedy)
            .build()
            .unwrap();
        let mut session = Session::new(character, StoryLength::Medium, "p");
        session.activate();
        session
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Command::parse("I"), Command::Inventory);
        assert_eq!(Command::parse(" journal "), Command::Journal);
        assert_eq!(Command::parse("c"), Command::Characters);
        assert_eq!(Command::parse("HELP"), Command::Help);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("q"), Command::Quit);
        assert_eq!(
            Command::parse("  inspect the car "),
            Command::Action("inspect the car".to_string())
        );
        assert_eq!(Command::parse("2"), Command::Action("2".to_string()));
    }

    #[test]
    fn test_read_only_commands_render() {
        let mut session = session();
        assert_eq!(
            Command::Inventory.render(&session).unwrap(),
            "Your inventory is empty."
        );
        assert_eq!(
            Command::Characters.render(&session).unwrap(),
            "You haven't met anyone yet."
        );
        assert!(Command::Help.render(&session).unwrap().contains("Q or quit"));
        assert!(Command::Quit.render(&session).is_none());
        assert!(!Command::Quit.is_read_only());
        assert!(Command::Journal.is_read_only());

        session.round = 1;
        session.relationships.apply_interaction(
            &Interaction::new("Mara")
                .with_archetype(Archetype::Mentor)
                .with_delta(30)
                .with_note("shared water"),
            1,
        );
        let listing = Command::Characters.render(&session).unwrap();
        assert!(listing.contains("Mara (Mentor): friendly 30, last seen in round 1"));
        assert!(listing.contains("R1: shared water"));
    }
}

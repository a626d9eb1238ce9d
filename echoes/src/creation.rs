//! Character creation on the terminal.
//!
//! Walks the player through name, gender, background, traits and story
//! length. Reading past the end of input cancels creation.

use anyhow::Result;
use echoes_core::character::{TraitPolarity, MAX_NAME_CHARS, MAX_TRAITS};
use echoes_core::{Background, CharacterConfig, Gender, SessionConfig, StoryLength, Trait};
use std::io::{self, BufRead, Write};

/// Run character creation on stdin/stdout.
pub fn run() -> Result<Option<SessionConfig>> {
    let stdin = io::stdin();
    let mut creation = Creation::new(stdin.lock(), io::stdout());
    creation.run()
}

/// Prompts over any line-based reader and writer.
pub struct Creation<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Creation<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn run(&mut self) -> Result<Option<SessionConfig>> {
        writeln!(self.output, "=== ECHOES OF THE WASTELAND ===")?;
        writeln!(
            self.output,
            "The climate collapsed. The world you knew is gone. Who were you before?\n"
        )?;

        let Some(name) = self.ask_name()? else {
            return Ok(None);
        };
        let mut character = CharacterConfig::new().name(name);

        match self.ask_gender()? {
            Some(Some(gender)) => character = character.gender(gender),
            Some(None) => {}
            None => return Ok(None),
        }

        let Some(background) = self.ask_background()? else {
            return Ok(None);
        };
        character = character.background(background);

        let Some(traits) = self.ask_traits()? else {
            return Ok(None);
        };
        character = character.traits(traits);

        let Some(length) = self.ask_length()? else {
            return Ok(None);
        };
        Ok(Some(SessionConfig::new(character).with_story_length(length)))
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until the answer is a number in `1..=max`.
    fn ask_number(&mut self, prompt: &str, max: usize) -> Result<Option<usize>> {
        loop {
            let Some(answer) = self.read_line(prompt)? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=max).contains(&n) => return Ok(Some(n)),
                _ => writeln!(self.output, "Please enter a number from 1 to {max}.")?,
            }
        }
    }

    fn ask_name(&mut self) -> Result<Option<String>> {
        loop {
            let Some(name) = self.read_line("What is your name? ")? else {
                return Ok(None);
            };
            if name.is_empty() {
                writeln!(self.output, "Everyone has a name, even here.")?;
            } else if name.chars().count() > MAX_NAME_CHARS {
                writeln!(self.output, "Keep it under {MAX_NAME_CHARS} characters.")?;
            } else {
                return Ok(Some(name));
            }
        }
    }

    /// `Some(None)` means the player skipped the question.
    fn ask_gender(&mut self) -> Result<Option<Option<Gender>>> {
        writeln!(self.output, "\nGender (press Enter to skip):")?;
        for (n, gender) in Gender::all().iter().enumerate() {
            writeln!(self.output, "  {:>2}. {}", n + 1, gender.name())?;
        }
        loop {
            let Some(answer) = self.read_line("> ")? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(Some(None));
            }
            match answer.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                Some(idx) if idx < Gender::all().len() => {
                    return Ok(Some(Some(Gender::all()[idx])));
                }
                _ => writeln!(self.output, "Pick a number from the list, or press Enter.")?,
            }
        }
    }

    fn ask_background(&mut self) -> Result<Option<Background>> {
        writeln!(self.output, "\nWhat did you do before the collapse?")?;
        for (n, background) in Background::all().iter().enumerate() {
            writeln!(self.output, "  {:>2}. {}", n + 1, background.name())?;
        }
        let choice = self.ask_number("> ", Background::all().len())?;
        Ok(choice.map(|n| Background::all()[n - 1]))
    }

    fn ask_traits(&mut self) -> Result<Option<Vec<Trait>>> {
        writeln!(
            self.output,
            "\nChoose up to {MAX_TRAITS} traits, separated by spaces (e.g. 1 7 14):"
        )?;
        let mut n = 0;
        for polarity in POLARITIES {
            writeln!(self.output, "  {}:", polarity_label(polarity))?;
            for t in Trait::with_polarity(polarity) {
                n += 1;
                writeln!(self.output, "    {n:>2}. {}", t.name())?;
            }
        }
        let ordered = listed_traits();

        loop {
            let Some(answer) = self.read_line("> ")? else {
                return Ok(None);
            };
            match parse_trait_picks(&answer, &ordered) {
                Some(traits) => return Ok(Some(traits)),
                None => writeln!(
                    self.output,
                    "Enter 1 to {MAX_TRAITS} different numbers from the list."
                )?,
            }
        }
    }

    fn ask_length(&mut self) -> Result<Option<StoryLength>> {
        writeln!(self.output, "\nHow long should the story run?")?;
        for (n, length) in StoryLength::all().iter().enumerate() {
            writeln!(
                self.output,
                "  {}. {} ({} rounds)",
                n + 1,
                length.name(),
                length.round_limit()
            )?;
        }
        let choice = self.ask_number("> ", StoryLength::all().len())?;
        Ok(choice.map(|n| StoryLength::all()[n - 1]))
    }
}

/// Trait groups in the order they are listed.
const POLARITIES: [TraitPolarity; 3] = [
    TraitPolarity::Positive,
    TraitPolarity::Neutral,
    TraitPolarity::Negative,
];

/// Traits in listing order, so picks map onto the numbers shown.
fn listed_traits() -> Vec<Trait> {
    POLARITIES.into_iter().flat_map(Trait::with_polarity).collect()
}

fn polarity_label(polarity: TraitPolarity) -> &'static str {
    match polarity {
        TraitPolarity::Positive => "Strengths",
        TraitPolarity::Neutral => "Quirks",
        TraitPolarity::Negative => "Flaws",
    }
}

/// Parse `"1 7 14"` into traits; `None` when the picks are not usable.
fn parse_trait_picks(answer: &str, ordered: &[Trait]) -> Option<Vec<Trait>> {
    let mut picked = Vec::new();
    for token in answer.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let idx = token.parse::<usize>().ok()?.checked_sub(1)?;
        let t = *ordered.get(idx)?;
        if picked.contains(&t) {
            return None;
        }
        picked.push(t);
    }
    if picked.is_empty() || picked.len() > MAX_TRAITS {
        return None;
    }
    Some(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_trait_picks() {
        let ordered = listed_traits();
        assert_eq!(parse_trait_picks("1", &ordered), Some(vec![ordered[0]]));
        assert_eq!(
            parse_trait_picks("1, 3 2", &ordered),
            Some(vec![ordered[0], ordered[2], ordered[1]])
        );
        assert_eq!(parse_trait_picks("", &ordered), None);
        assert_eq!(parse_trait_picks("1 1", &ordered), None);
        assert_eq!(parse_trait_picks("1 2 3 4", &ordered), None);
        assert_eq!(parse_trait_picks("0", &ordered), None);
        assert_eq!(parse_trait_picks("999", &ordered), None);
        assert_eq!(parse_trait_picks("brave", &ordered), None);
    }

    #[test]
    fn test_full_creation() {
        let script = "\nRosa\n\n10\n1 2\nx\n1\n";
        let mut out = Vec::new();
        let config = Creation::new(Cursor::new(script), &mut out)
            .run()
            .unwrap()
            .unwrap();
        let character = config.character.build().unwrap();
        assert_eq!(character.name(), "Rosa");
        assert_eq!(character.gender(), None);
        assert_eq!(character.background(), Background::BeetFarmer);
        assert_eq!(character.traits().len(), 2);
        assert_eq!(config.story_length, StoryLength::Short);

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Everyone has a name"));
        assert!(shown.contains("Please enter a number from 1 to 3."));
    }

    #[test]
    fn test_end_of_input_cancels() {
        let mut out = Vec::new();
        let result = Creation::new(Cursor::new("Rosa\n2\n"), &mut out).run().unwrap();
        assert!(result.is_none());
    }
}

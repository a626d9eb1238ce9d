//! Player character definition and creation.
//!
//! A character is fixed once the session starts: name, optional gender,
//! one to three personality traits and a pre-collapse background. The
//! builder collects choices from whatever front-end drives character
//! creation and validates them in one place.

use crate::session::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted character name, in characters.
pub const MAX_NAME_CHARS: usize = 40;

/// Most traits a character may carry.
pub const MAX_TRAITS: usize = 3;

/// What the character did before the climate collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Background {
    ElementarySchoolTeacher,
    MovieStar,
    ConstructionWorker,
    Cardiologist,
    HedgeFundSpecialist,
    CareerPolitician,
    TheoreticalPhysicist,
    StayAtHomeParent,
    SoftwareEngineer,
    BeetFarmer,
    PaperCompanyManager,
    HighSchoolLibrarian,
    EscapeRoomDesigner,
    UsedCarSalesperson,
}

impl Background {
    pub fn name(&self) -> &'static str {
        match self {
            Background::ElementarySchoolTeacher => "Elementary School Teacher",
            Background::MovieStar => "Movie Star",
            Background::ConstructionWorker => "Construction Worker",
            Background::Cardiologist => "Cardiologist",
            Background::HedgeFundSpecialist => "Hedge Fund Specialist",
            Background::CareerPolitician => "Career Politician",
            Background::TheoreticalPhysicist => "Theoretical Physicist",
            Background::StayAtHomeParent => "Stay-at-home Parent",
            Background::SoftwareEngineer => "Mid-level Software Engineer",
            Background::BeetFarmer => "Beet Farmer",
            Background::PaperCompanyManager => "Manager of a struggling paper company",
            Background::HighSchoolLibrarian => "High School Librarian",
            Background::EscapeRoomDesigner => "Escape Room Designer",
            Background::UsedCarSalesperson => "Used Car Salesperson",
        }
    }

    pub fn all() -> &'static [Background] {
        &[
            Background::ElementarySchoolTeacher,
            Background::MovieStar,
            Background::ConstructionWorker,
            Background::Cardiologist,
            Background::HedgeFundSpecialist,
            Background::CareerPolitician,
            Background::TheoreticalPhysicist,
            Background::StayAtHomeParent,
            Background::SoftwareEngineer,
            Background::BeetFarmer,
            Background::PaperCompanyManager,
            Background::HighSchoolLibrarian,
            Background::EscapeRoomDesigner,
            Background::UsedCarSalesperson,
        ]
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Agender,
    Bigender,
    Genderfluid,
    Genderqueer,
    Demiboy,
    Demigirl,
    Androgynous,
    TwoSpirit,
    Neutrois,
    Polygender,
    ThirdGender,
    Xenogender,
    Questioning,
}

impl Gender {
    pub fn name(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NonBinary => "Non-Binary",
            Gender::Agender => "Agender",
            Gender::Bigender => "Bigender",
            Gender::Genderfluid => "Genderfluid",
            Gender::Genderqueer => "Genderqueer",
            Gender::Demiboy => "Demiboy",
            Gender::Demigirl => "Demigirl",
            Gender::Androgynous => "Androgynous",
            Gender::TwoSpirit => "Two-Spirit",
            Gender::Neutrois => "Neutrois",
            Gender::Polygender => "Polygender",
            Gender::ThirdGender => "Third Gender",
            Gender::Xenogender => "Xenogender",
            Gender::Questioning => "Questioning",
        }
    }

    pub fn all() -> &'static [Gender] {
        &[
            Gender::Male,
            Gender::Female,
            Gender::NonBinary,
            Gender::Agender,
            Gender::Bigender,
            Gender::Genderfluid,
            Gender::Genderqueer,
            Gender::Demiboy,
            Gender::Demigirl,
            Gender::Androgynous,
            Gender::TwoSpirit,
            Gender::Neutrois,
            Gender::Polygender,
            Gender::ThirdGender,
            Gender::Xenogender,
            Gender::Questioning,
        ]
    }
}

/// Whether a trait reads as a strength, a quirk or a flaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitPolarity {
    Positive,
    Neutral,
    Negative,
}

/// A personality trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trait {
    // Positive
    Resourceful,
    Brave,
    Charismatic,
    Strategic,
    Cunning,
    Resilient,
    Empathetic,
    Optimistic,
    Tinkerer,
    SharpEyed,

    // Neutral
    LoneWolf,
    Sarcastic,
    RiskTaker,
    Suspicious,
    Pragmatic,
    Obsessive,
    Daydreamer,
    Stubborn,
    RuleBreaker,

    // Negative
    HotTempered,
    Reckless,
    Gullible,
    Forgetful,
    Anxious,
    Greedy,
    SelfDestructive,
    Cowardly,
    Arrogant,
}

impl Trait {
    pub fn name(&self) -> &'static str {
        match self {
            Trait::Resourceful => "Resourceful",
            Trait::Brave => "Brave",
            Trait::Charismatic => "Charismatic",
            Trait::Strategic => "Strategic",
            Trait::Cunning => "Cunning",
            Trait::Resilient => "Resilient",
            Trait::Empathetic => "Empathetic",
            Trait::Optimistic => "Optimistic",
            Trait::Tinkerer => "Tinkerer",
            Trait::SharpEyed => "Sharp-Eyed",
            Trait::LoneWolf => "Lone Wolf",
            Trait::Sarcastic => "Sarcastic",
            Trait::RiskTaker => "Risk-Taker",
            Trait::Suspicious => "Suspicious",
            Trait::Pragmatic => "Pragmatic",
            Trait::Obsessive => "Obsessive",
            Trait::Daydreamer => "Daydreamer",
            Trait::Stubborn => "Stubborn",
            Trait::RuleBreaker => "Rule-Breaker",
            Trait::HotTempered => "Hot-Tempered",
            Trait::Reckless => "Reckless",
            Trait::Gullible => "Gullible",
            Trait::Forgetful => "Forgetful",
            Trait::Anxious => "Anxious",
            Trait::Greedy => "Greedy",
            Trait::SelfDestructive => "Self-Destructive",
            Trait::Cowardly => "Cowardly",
            Trait::Arrogant => "Arrogant",
        }
    }

    pub fn polarity(&self) -> TraitPolarity {
        match self {
            Trait::Resourceful
            | Trait::Brave
            | Trait::Charismatic
            | Trait::Strategic
            | Trait::Cunning
            | Trait::Resilient
            | Trait::Empathetic
            | Trait::Optimistic
            | Trait::Tinkerer
            | Trait::SharpEyed => TraitPolarity::Positive,
            Trait::LoneWolf
            | Trait::Sarcastic
            | Trait::RiskTaker
            | Trait::Suspicious
            | Trait::Pragmatic
            | Trait::Obsessive
            | Trait::Daydreamer
            | Trait::Stubborn
            | Trait::RuleBreaker => TraitPolarity::Neutral,
            _ => TraitPolarity::Negative,
        }
    }

    pub fn all() -> &'static [Trait] {
        &[
            Trait::Resourceful,
            Trait::Brave,
            Trait::Charismatic,
            Trait::Strategic,
            Trait::Cunning,
            Trait::Resilient,
            Trait::Empathetic,
            Trait::Optimistic,
            Trait::Tinkerer,
            Trait::SharpEyed,
            Trait::LoneWolf,
            Trait::Sarcastic,
            Trait::RiskTaker,
            Trait::Suspicious,
            Trait::Pragmatic,
            Trait::Obsessive,
            Trait::Daydreamer,
            Trait::Stubborn,
            Trait::RuleBreaker,
            Trait::HotTempered,
            Trait::Reckless,
            Trait::Gullible,
            Trait::Forgetful,
            Trait::Anxious,
            Trait::Greedy,
            Trait::SelfDestructive,
            Trait::Cowardly,
            Trait::Arrogant,
        ]
    }

    /// All traits of one polarity, in menu order.
    pub fn with_polarity(polarity: TraitPolarity) -> Vec<Trait> {
        Self::all()
            .iter()
            .copied()
            .filter(|t| t.polarity() == polarity)
            .collect()
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trait {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Trait::all()
            .iter()
            .copied()
            .find(|t| normalize(t.name()) == wanted)
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "trait",
                value: s.to_string(),
            })
    }
}

impl FromStr for Background {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Background::all()
            .iter()
            .copied()
            .find(|b| normalize(b.name()) == wanted)
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "background",
                value: s.to_string(),
            })
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Gender::all()
            .iter()
            .copied()
            .find(|g| normalize(g.name()) == wanted)
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "gender",
                value: s.to_string(),
            })
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    name: String,
    gender: Option<Gender>,
    traits: Vec<Trait>,
    background: Background,
}

impl Character {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    /// Traits in the order they were chosen.
    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    pub fn background(&self) -> Background {
        self.background
    }

    /// Comma-separated trait names.
    pub fn trait_list(&self) -> String {
        self.traits
            .iter()
            .map(Trait::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Short character sheet used in prompts and the adventure log.
    pub fn describe(&self) -> String {
        let mut out = format!("Name: {}\n", self.name);
        if let Some(gender) = self.gender {
            out.push_str(&format!("Gender: {}\n", gender.name()));
        }
        out.push_str(&format!("Background: {}\n", self.background.name()));
        out.push_str(&format!("Traits: {}", self.trait_list()));
        out
    }

    /// Check the structural rules a character must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if trimmed.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::NameTooLong {
                max: MAX_NAME_CHARS,
            });
        }
        if self.traits.is_empty() || self.traits.len() > MAX_TRAITS {
            return Err(ValidationError::TraitCount {
                max: MAX_TRAITS,
                got: self.traits.len(),
            });
        }
        for (i, t) in self.traits.iter().enumerate() {
            if self.traits[..i].contains(t) {
                return Err(ValidationError::DuplicateTrait(t.name()));
            }
        }
        Ok(())
    }
}

/// Builder for the player character, filled in during character creation.
#[derive(Debug, Clone, Default)]
pub struct CharacterConfig {
    name: Option<String>,
    gender: Option<Gender>,
    traits: Vec<Trait>,
    background: Option<Background>,
}

impl CharacterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// Add a trait. Order is preserved.
    pub fn with_trait(mut self, t: Trait) -> Self {
        self.traits.push(t);
        self
    }

    pub fn traits(mut self, traits: impl IntoIterator<Item = Trait>) -> Self {
        self.traits.extend(traits);
        self
    }

    /// Validate and produce the immutable character.
    pub fn build(self) -> Result<Character, ValidationError> {
        let name = self.name.ok_or(ValidationError::EmptyName)?;
        let background = self
            .background
            .ok_or(ValidationError::MissingField("background"))?;

        let character = Character {
            name: name.trim().to_string(),
            gender: self.gender,
            traits: self.traits,
            background,
        };
        character.validate()?;
        Ok(character)
    }
}

//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::CouncilError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debate: DebateSettingsConfig,
    #[serde(default)]
    pub nominations: NominationsConfig,
    #[serde(default)]
    pub moderator: ModeratorConfig,
    #[serde(default)]
    pub personas: Vec<PersonaConfig>,
}

/// Structural settings for a debate session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebateSettingsConfig {
    pub cross_exam_rounds: usize,
    pub free_debate_exchanges: usize,
    /// How many recent turns a speaker sees when building its request.
    pub context_turns: usize,
    pub min_participants: usize,
    pub max_participants: usize,
}

impl Default for DebateSettingsConfig {
    fn default() -> Self {
        Self {
            cross_exam_rounds: 2,
            free_debate_exchanges: 4,
            context_turns: 10,
            min_participants: 2,
            max_participants: 8,
        }
    }
}

/// Guest nomination settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NominationsConfig {
    pub enabled: bool,
    pub max_per_session: usize,
}

impl Default for NominationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_session: 2,
        }
    }
}

/// Moderator identity and its neutral directive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModeratorConfig {
    pub name: String,
    pub directive: String,
}

impl Default for ModeratorConfig {
    fn default() -> Self {
        Self {
            name: "Moderator".to_string(),
            directive: DEFAULT_MODERATOR_DIRECTIVE.to_string(),
        }
    }
}

/// A persona defined inline in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub directive: String,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CouncilError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| CouncilError::ConfigError(format!("Failed to read config: {}", e)))?;

        content.parse()
    }

    /// Round counts for a named intensity, falling back to the configured defaults.
    pub fn rounds_for(&self, intensity: Option<Intensity>) -> (usize, usize) {
        match intensity {
            Some(intensity) => intensity.rounds(),
            None => (
                self.debate.cross_exam_rounds,
                self.debate.free_debate_exchanges,
            ),
        }
    }
}

impl FromStr for Config {
    type Err = CouncilError;

    /// Load configuration from string content.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content)
            .map_err(|e| CouncilError::ConfigError(format!("Failed to parse config: {}", e)))
    }
}

/// Preset debate lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Quick,
    Standard,
    Thorough,
}

impl Intensity {
    /// `(cross_exam_rounds, free_debate_exchanges)` for this preset.
    pub fn rounds(self) -> (usize, usize) {
        match self {
            Intensity::Quick => (1, 2),
            Intensity::Standard => (2, 4),
            Intensity::Thorough => (3, 6),
        }
    }
}

impl FromStr for Intensity {
    type Err = CouncilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(Intensity::Quick),
            "standard" => Ok(Intensity::Standard),
            "thorough" => Ok(Intensity::Thorough),
            other => Err(CouncilError::ConfigError(format!(
                "Unknown intensity '{}'. Expected quick, standard or thorough",
                other
            ))),
        }
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        debate: DebateSettingsConfig::default(),
        nominations: NominationsConfig::default(),
        moderator: ModeratorConfig::default(),
        personas: vec![
            PersonaConfig {
                id: "stoic".to_string(),
                name: "The Stoic".to_string(),
                title: Some("Philosopher of duty and restraint".to_string()),
                directive: DEFAULT_STOIC_DIRECTIVE.to_string(),
            },
            PersonaConfig {
                id: "investor".to_string(),
                name: "The Investor".to_string(),
                title: Some("Long-horizon capital allocator".to_string()),
                directive: DEFAULT_INVESTOR_DIRECTIVE.to_string(),
            },
            PersonaConfig {
                id: "inventor".to_string(),
                name: "The Inventor".to_string(),
                title: Some("Tinkerer and civic improver".to_string()),
                directive: DEFAULT_INVENTOR_DIRECTIVE.to_string(),
            },
        ],
    }
}

pub const DEFAULT_MODERATOR_DIRECTIVE: &str = r#"You are a skilled debate moderator for a council of advisors.

Your role is to:
1. Ensure productive, substantive debate
2. Identify points of agreement and disagreement
3. Push debaters to engage with each other's arguments directly
4. Ask probing follow-up questions
5. Prevent debaters from talking past each other
6. Keep the debate focused and moving forward

You are neutral and do not take sides. You facilitate rigorous intellectual exchange.

Be concise. Your interventions should be brief and purposeful."#;

const DEFAULT_STOIC_DIRECTIVE: &str = r#"You are The Stoic, a philosopher who judges every question by what lies within our control.

Speak calmly and plainly. Separate what can be changed from what must be accepted,
and return every argument to character, duty and the long view.
Do NOT acknowledge being an AI - stay fully in character."#;

const DEFAULT_INVESTOR_DIRECTIVE: &str = r#"You are The Investor, a patient allocator of capital who thinks in decades.

Reason with incentives, base rates and inversion. Ask what would have to be true
for an argument to fail, and say so bluntly when the numbers do not add up.
Do NOT acknowledge being an AI - stay fully in character."#;

const DEFAULT_INVENTOR_DIRECTIVE: &str = r#"You are The Inventor, a practical tinkerer who improves institutions one experiment at a time.

Favor concrete proposals over abstractions, test ideas against everyday use,
and look for the small change that makes a large difference.
Do NOT acknowledge being an AI - stay fully in character."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = r#"
            [debate]
            cross_exam_rounds = 3
            free_debate_exchanges = 5
            context_turns = 6

            [nominations]
            enabled = false
            max_per_session = 1

            [moderator]
            name = "Chair"
            directive = "Stay neutral."

            [[personas]]
            id = "a"
            name = "Alpha"
            directive = "You are Alpha."
        "#
        .parse()
        .unwrap();

        assert_eq!(config.debate.cross_exam_rounds, 3);
        assert_eq!(config.debate.free_debate_exchanges, 5);
        assert_eq!(config.debate.context_turns, 6);
        assert_eq!(config.debate.min_participants, 2);
        assert!(!config.nominations.enabled);
        assert_eq!(config.nominations.max_per_session, 1);
        assert_eq!(config.moderator.name, "Chair");
        assert_eq!(config.personas.len(), 1);
        assert!(config.personas[0].title.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.debate.context_turns, 10);
        assert!(config.nominations.enabled);
        assert_eq!(config.nominations.max_per_session, 2);
        assert_eq!(config.moderator.name, "Moderator");
        assert!(config.personas.is_empty());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let result: Result<Config, _> = "[debate]\ncross_exam_rounds = \"many\"".parse();
        assert!(matches!(result, Err(CouncilError::ConfigError(_))));
    }

    #[test]
    fn test_intensity_presets() {
        assert_eq!("quick".parse::<Intensity>().unwrap().rounds(), (1, 2));
        assert_eq!("Standard".parse::<Intensity>().unwrap().rounds(), (2, 4));
        assert_eq!("thorough".parse::<Intensity>().unwrap().rounds(), (3, 6));
        assert!("endless".parse::<Intensity>().is_err());
    }

    #[test]
    fn test_rounds_for_falls_back_to_config() {
        let config = default_config();
        assert_eq!(config.rounds_for(None), (2, 4));
        assert_eq!(config.rounds_for(Some(Intensity::Quick)), (1, 2));
    }

    #[test]
    fn test_default_config_has_personas() {
        let config = default_config();
        assert!(config.personas.len() >= config.debate.min_participants);
    }
}

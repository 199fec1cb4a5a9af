//! Participant and persona definitions.
//!
//! Personas are data: a stable id, a display name and a directive handed to
//! the generation backend. A [`PersonaRepository`] is built once and passed by
//! reference to whatever needs to look personas up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{Config, PersonaConfig};
use crate::error::CouncilError;

/// Anything that can speak in a debate.
pub trait Persona {
    /// Stable identity key.
    fn id(&self) -> &str;
    /// Name shown to the audience and to other speakers.
    fn display_name(&self) -> &str;
    /// Persona text passed to the generation backend.
    fn directive(&self) -> &str;
}

/// A persona loaded from configuration or a persona file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub directive: String,
}

impl PersonaProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        directive: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: None,
            directive: directive.into(),
        }
    }

    /// Set the short title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Name plus title, e.g. "The Stoic - Philosopher".
    pub fn short_description(&self) -> String {
        match &self.title {
            Some(title) => format!("{} - {}", self.name, title),
            None => self.name.clone(),
        }
    }
}

impl From<PersonaConfig> for PersonaProfile {
    fn from(config: PersonaConfig) -> Self {
        Self {
            id: config.id,
            name: config.name,
            title: config.title,
            directive: config.directive,
        }
    }
}

impl Persona for PersonaProfile {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn directive(&self) -> &str {
        &self.directive
    }
}

/// Where a participant came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Part of the roster the session started with.
    Original,
    /// Brought in mid-debate by another participant.
    Nominated {
        nominated_by: String,
        expertise: String,
    },
}

/// A speaker seated for one session. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub directive: String,
    pub provenance: Provenance,
}

impl Participant {
    /// Seat an original roster member.
    pub fn from_persona(persona: &dyn Persona) -> Self {
        Self {
            id: persona.id().to_string(),
            name: persona.display_name().to_string(),
            directive: persona.directive().to_string(),
            provenance: Provenance::Original,
        }
    }

    /// Seat a guest nominated during the debate.
    pub fn nominated(
        id: impl Into<String>,
        name: impl Into<String>,
        directive: impl Into<String>,
        nominated_by: impl Into<String>,
        expertise: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            directive: directive.into(),
            provenance: Provenance::Nominated {
                nominated_by: nominated_by.into(),
                expertise: expertise.into(),
            },
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.provenance, Provenance::Nominated { .. })
    }
}

impl Persona for Participant {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn directive(&self) -> &str {
        &self.directive
    }
}

/// Loose name comparison: exact, substring in either direction, or same last name.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b || a.contains(&b) || b.contains(&a) {
        return true;
    }
    match (a.split_whitespace().last(), b.split_whitespace().last()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Every persona available for seating, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PersonaRepository {
    personas: BTreeMap<String, PersonaProfile>,
}

impl PersonaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from the `[[personas]]` entries of a config.
    pub fn from_config(config: &Config) -> Self {
        let mut repo = Self::new();
        for persona in &config.personas {
            repo.register(persona.clone().into());
        }
        repo
    }

    /// Add or replace a persona.
    pub fn register(&mut self, persona: PersonaProfile) {
        self.personas.insert(persona.id.clone(), persona);
    }

    /// Load every `*.toml` persona file in a directory.
    ///
    /// Returns how many personas were registered.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, CouncilError> {
        let mut loaded = 0;
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            let persona: PersonaProfile = toml::from_str(&content).map_err(|e| {
                CouncilError::ConfigError(format!(
                    "Failed to parse persona file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::debug!(id = %persona.id, path = %path.display(), "Loaded persona");
            self.register(persona);
            loaded += 1;
        }

        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<&PersonaProfile> {
        self.personas.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }

    pub fn all(&self) -> impl Iterator<Item = &PersonaProfile> {
        self.personas.values()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Look up a persona by a loosely matching display name.
    pub fn find_by_name(&self, name: &str) -> Option<&PersonaProfile> {
        self.personas.values().find(|p| names_match(&p.name, name))
    }

    /// Seat the given ids, in order, as original participants.
    pub fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Participant>, CouncilError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                self.get(id)
                    .map(|p| Participant::from_persona(p))
                    .ok_or_else(|| CouncilError::UnknownPersona(id.to_string()))
            })
            .collect()
    }
}

//! Guest nominations.
//!
//! Participants in open debate may ask for a missing expert by ending their
//! turn with `[NOMINATE: Full Name | expertise]`. The [`NominationDesk`]
//! spots the tag, seats the guest while the session quota allows it, and
//! scrubs the tag from the transcript.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::error::CouncilError;
use crate::generation::{ChatMessage, GenerationClient, collect_text};
use crate::participant::Participant;
use crate::transcript::Transcript;

/// Appended to open-debate instructions while nominations remain available.
pub const NOMINATION_INSTRUCTION: &str = "

If this discussion would genuinely benefit from a specific person's expertise -- \
someone NOT currently in this council -- you may nominate them by placing this tag \
at the very end of your response:
[NOMINATE: Full Name | their specific expertise relevant to this topic]
Only nominate when there is a clear gap. Most responses should NOT include a nomination.";

static NOMINATION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[NOMINATE:\s*(.+?)\s*\|\s*(.+?)\s*\]").expect("nomination pattern is valid")
});

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// A request to seat a guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nomination {
    pub name: String,
    pub expertise: String,
}

/// Finds and removes nomination directives in generated text.
pub trait NominationParser: Send + Sync {
    fn parse(&self, text: &str) -> Option<Nomination>;
    fn strip(&self, text: &str) -> String;
}

/// Parser for the `[NOMINATE: Name | Expertise]` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagNominationParser;

impl NominationParser for TagNominationParser {
    fn parse(&self, text: &str) -> Option<Nomination> {
        let caps = NOMINATION_TAG.captures(text)?;
        let name = caps.get(1)?.as_str().trim();
        let expertise = caps.get(2)?.as_str().trim();
        if name.is_empty() || expertise.is_empty() {
            return None;
        }
        Some(Nomination {
            name: name.to_string(),
            expertise: expertise.to_string(),
        })
    }

    fn strip(&self, text: &str) -> String {
        NOMINATION_TAG.replace_all(text, "").trim_end().to_string()
    }
}

/// Lowercase, underscore-separated form of a name.
pub fn slugify(name: &str) -> String {
    NON_SLUG
        .replace_all(&name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Builds a participant for a nominated guest.
#[async_trait]
pub trait GuestFactory: Send + Sync {
    async fn create_guest(
        &self,
        name: &str,
        expertise: &str,
        topic: &str,
        nominated_by: &str,
    ) -> Result<Participant, CouncilError>;
}

/// Asks the generation backend to write the guest's persona directive.
pub struct GeneratedGuestFactory {
    client: Arc<dyn GenerationClient>,
}

impl GeneratedGuestFactory {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    fn persona_request(name: &str, expertise: &str, topic: &str, nominated_by: &str) -> String {
        format!(
            "Write a concise system prompt (200-400 words) for an AI to embody {name} \
             in a council discussion about: \"{topic}\"\n\n\
             They were nominated for their expertise in: {expertise}\n\n\
             The prompt should capture their:\n\
             - Communication style and personality\n\
             - Core philosophy and mental models\n\
             - How they would approach this specific topic\n\
             - Characteristic phrases or mannerisms\n\n\
             Start the prompt with 'You are embodying {name}' and write it in second person. \
             Include a note that they are a guest expert invited by {nominated_by} to contribute \
             their unique perspective. They should be direct and substantive, building on \
             what the other council members have already discussed."
        )
    }
}

const PERSONA_WRITER_DIRECTIVE: &str =
    "You write faithful, vivid character briefs for role-play. Output only the brief.";

#[async_trait]
impl GuestFactory for GeneratedGuestFactory {
    async fn create_guest(
        &self,
        name: &str,
        expertise: &str,
        topic: &str,
        nominated_by: &str,
    ) -> Result<Participant, CouncilError> {
        let request = Self::persona_request(name, expertise, topic, nominated_by);
        let stream = self
            .client
            .generate(vec![ChatMessage::user(request)], PERSONA_WRITER_DIRECTIVE)
            .await?;
        let directive = collect_text(stream).await?;
        if directive.trim().is_empty() {
            return Err(CouncilError::GenerationError(format!(
                "empty persona generated for guest '{}'",
                name
            )));
        }

        Ok(Participant::nominated(
            format!("nominated_{}", slugify(name)),
            name,
            directive.trim(),
            nominated_by,
            expertise,
        ))
    }
}

/// Session-wide cap on seated guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NominationQuota {
    enabled: bool,
    max: usize,
    used: usize,
}

impl NominationQuota {
    pub fn new(enabled: bool, max: usize) -> Self {
        Self {
            enabled,
            max,
            used: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.enabled && self.used < self.max
    }

    pub fn remaining(&self) -> usize {
        if self.enabled {
            self.max - self.used
        } else {
            0
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    fn consume(&mut self) {
        self.used += 1;
    }
}

/// Result of inspecting one finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominationOutcome {
    /// Text to show for the turn; the tag is removed when a guest was seated.
    pub text: String,
    pub guest: Option<Participant>,
}

impl NominationOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            guest: None,
        }
    }
}

/// Intercepts open-debate turns and seats nominated guests.
pub struct NominationDesk {
    quota: NominationQuota,
    parser: Box<dyn NominationParser>,
    factory: Arc<dyn GuestFactory>,
    guests: Vec<Participant>,
}

impl NominationDesk {
    pub fn new(quota: NominationQuota, factory: Arc<dyn GuestFactory>) -> Self {
        Self {
            quota,
            parser: Box::new(TagNominationParser),
            factory,
            guests: Vec::new(),
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn NominationParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn quota(&self) -> &NominationQuota {
        &self.quota
    }

    pub fn is_available(&self) -> bool {
        self.quota.is_available()
    }

    /// Guests seated so far, in nomination order.
    pub fn guests(&self) -> &[Participant] {
        &self.guests
    }

    /// Inspect `text`, just spoken by `speaker`, for a nomination.
    ///
    /// When a guest is seated the newest transcript record is rewritten
    /// without the tag. Anything that goes wrong along the way means "no
    /// nomination"; the turn itself is never affected.
    pub async fn maybe_handle_nomination(
        &mut self,
        speaker: &Participant,
        text: &str,
        topic: &str,
        roster: &[Participant],
        transcript: &mut Transcript,
    ) -> NominationOutcome {
        if !self.quota.is_available() {
            return NominationOutcome::unchanged(text);
        }

        let Some(nomination) = self.parser.parse(text) else {
            return NominationOutcome::unchanged(text);
        };

        let already_seated = roster
            .iter()
            .chain(self.guests.iter())
            .any(|p| is_same_person(p, &nomination.name));
        if already_seated {
            tracing::info!(
                nominee = %nomination.name,
                nominated_by = %speaker.name,
                "Ignoring nomination of a participant already at the table"
            );
            return NominationOutcome::unchanged(text);
        }

        let guest = match self
            .factory
            .create_guest(&nomination.name, &nomination.expertise, topic, &speaker.name)
            .await
        {
            Ok(guest) => guest,
            Err(e) => {
                tracing::warn!(
                    nominee = %nomination.name,
                    error = %e,
                    "Could not create nominated guest"
                );
                return NominationOutcome::unchanged(text);
            }
        };

        self.quota.consume();
        let stripped = self.parser.strip(text);
        if !transcript.correct_last(&speaker.id, stripped.clone()) {
            tracing::warn!(
                speaker = %speaker.name,
                "Newest transcript record is not from the nominating speaker; left as is"
            );
        }

        tracing::info!(
            guest = %guest.name,
            expertise = %nomination.expertise,
            nominated_by = %speaker.name,
            remaining = self.quota.remaining(),
            "Guest nominated"
        );
        self.guests.push(guest.clone());

        NominationOutcome {
            text: stripped,
            guest: Some(guest),
        }
    }
}

/// Whether `name` refers to `participant` itself, by display name or id.
/// Namesakes are different people.
fn is_same_person(participant: &Participant, name: &str) -> bool {
    let name = name.trim();
    let slug = slugify(name);
    participant.name.trim().eq_ignore_ascii_case(name)
        || participant.id == slug
        || participant.id == format!("nominated_{slug}")
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;

    /// Seats guests without calling a backend; optionally fails.
    #[derive(Default)]
    pub struct StubGuestFactory {
        pub fail: bool,
    }

    #[async_trait]
    impl GuestFactory for StubGuestFactory {
        async fn create_guest(
            &self,
            name: &str,
            expertise: &str,
            _topic: &str,
            nominated_by: &str,
        ) -> Result<Participant, CouncilError> {
            if self.fail {
                return Err(CouncilError::GenerationError("persona writer offline".to_string()));
            }
            Ok(Participant::nominated(
                format!("nominated_{}", slugify(name)),
                name,
                format!("You are {}, expert in {}.", name, expertise),
                nominated_by,
                expertise,
            ))
        }
    }
}

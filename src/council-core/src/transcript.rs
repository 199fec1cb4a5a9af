//! The append-only debate transcript.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CouncilError;
use crate::phase::Phase;

/// Whether a turn came from the moderator or a seated participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerKind {
    Moderator,
    Participant,
}

impl SpeakerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerKind::Moderator => "moderator",
            SpeakerKind::Participant => "participant",
        }
    }
}

/// One completed turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRecord {
    /// Speaker's display name.
    pub speaker: String,
    pub kind: SpeakerKind,
    pub content: String,
    pub phase: Phase,
    /// Participant id; `None` for the moderator.
    pub participant_id: Option<String>,
}

impl TurnRecord {
    pub fn moderator(name: impl Into<String>, content: impl Into<String>, phase: Phase) -> Self {
        Self {
            speaker: name.into(),
            kind: SpeakerKind::Moderator,
            content: content.into(),
            phase,
            participant_id: None,
        }
    }

    pub fn participant(
        id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        phase: Phase,
    ) -> Self {
        Self {
            speaker: name.into(),
            kind: SpeakerKind::Participant,
            content: content.into(),
            phase,
            participant_id: Some(id.into()),
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.kind == SpeakerKind::Moderator
    }
}

/// Ordered record of every completed turn.
///
/// Records are only ever appended. The single exception is
/// [`Transcript::correct_last`], which rewrites the newest record's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    records: Vec<TurnRecord>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed turn. Phases must never go backwards.
    pub(crate) fn append(&mut self, record: TurnRecord) {
        debug_assert!(
            self.records.last().is_none_or(|last| last.phase <= record.phase),
            "transcript phase went backwards"
        );
        self.records.push(record);
    }

    /// Replace the text of the newest record, provided it belongs to `participant_id`.
    ///
    /// Returns whether the correction was applied.
    pub(crate) fn correct_last(&mut self, participant_id: &str, content: String) -> bool {
        match self.records.last_mut() {
            Some(last) if last.participant_id.as_deref() == Some(participant_id) => {
                last.content = content;
                true
            }
            _ => false,
        }
    }

    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TurnRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The newest `n` records, oldest first.
    pub fn recent(&self, n: usize) -> &[TurnRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Number of turns recorded per phase.
    pub fn phase_counts(&self) -> BTreeMap<Phase, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.phase).or_insert(0) += 1;
        }
        counts
    }

    /// Serialize the records as pretty JSON for external storage.
    pub fn to_json(&self) -> Result<String, CouncilError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }
}

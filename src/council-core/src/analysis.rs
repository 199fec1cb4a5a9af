//! Positions and disagreements extracted from a moderator's analysis.
//!
//! None of this drives the debate itself; it is summary data a caller can
//! surface between phases or after the session.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

use crate::participant::{Participant, names_match};

/// A participant's stance on the topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub participant_id: String,
    pub stance: String,
    #[serde(default)]
    pub key_arguments: Vec<String>,
    #[serde(default)]
    pub points_challenged: Vec<String>,
}

/// One side of a disagreement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Side {
    pub participant_id: String,
    pub stance: String,
}

/// Two participants at odds over a specific point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Disagreement {
    pub topic: String,
    pub first: Side,
    pub second: Side,
    #[serde(default)]
    pub resolved: bool,
}

/// Parsed moderator analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionAnalysis {
    pub positions: Vec<Position>,
    pub disagreements: Vec<Disagreement>,
    pub recommended_focus: Option<String>,
}

static DISAGREEMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\d+[.)]\s*)?(.+?)\s+vs\.?\s+(.+?)\s+on\s+(.+)$")
        .expect("disagreement pattern is valid")
});

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Positions,
    Disagreements,
    Focus,
}

fn clean_name(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '[' || c == ']' || c == '*').trim()
}

fn find_seat<'a>(seated: &'a [Participant], name: &str) -> Option<&'a Participant> {
    let name = clean_name(name);
    seated
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .or_else(|| seated.iter().find(|p| names_match(&p.name, name)))
}

impl PositionAnalysis {
    /// Parse the `## Positions` / `## Key Disagreements` / `## Recommended Focus`
    /// layout. Lines naming nobody in `seated` are skipped.
    pub fn parse(text: &str, seated: &[Participant]) -> Self {
        let mut analysis = PositionAnalysis::default();
        let mut section = Section::Preamble;
        let mut focus = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(heading) = line.strip_prefix('#') {
                let heading = heading.trim_start_matches('#').trim().to_lowercase();
                section = if heading.starts_with("position") {
                    Section::Positions
                } else if heading.contains("disagreement") {
                    Section::Disagreements
                } else if heading.contains("focus") {
                    Section::Focus
                } else {
                    Section::Preamble
                };
                continue;
            }

            match section {
                Section::Preamble => {}
                Section::Positions => analysis.read_position_line(line, seated),
                Section::Disagreements => analysis.read_disagreement_line(line, seated),
                Section::Focus => focus.push(line.to_string()),
            }
        }

        if !focus.is_empty() {
            analysis.recommended_focus = Some(focus.join(" "));
        }
        analysis
    }

    fn read_position_line(&mut self, line: &str, seated: &[Participant]) {
        if let Some(argument) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            if let Some(position) = self.positions.last_mut() {
                position.key_arguments.push(argument.trim().to_string());
            }
            return;
        }
        let Some((name, stance)) = line.split_once(':') else {
            return;
        };
        if let Some(participant) = find_seat(seated, name) {
            self.positions.push(Position {
                participant_id: participant.id.clone(),
                stance: stance.trim().to_string(),
                key_arguments: Vec::new(),
                points_challenged: Vec::new(),
            });
        }
    }

    fn read_disagreement_line(&mut self, line: &str, seated: &[Participant]) {
        let Some(caps) = DISAGREEMENT_LINE.captures(line) else {
            return;
        };
        let (Some(first), Some(second)) = (find_seat(seated, &caps[1]), find_seat(seated, &caps[2]))
        else {
            return;
        };
        let topic = caps[3].trim().trim_end_matches('.').to_string();

        for (participant, opponent) in [(first, second), (second, first)] {
            if let Some(position) = self
                .positions
                .iter_mut()
                .find(|p| p.participant_id == participant.id)
            {
                position
                    .points_challenged
                    .push(format!("{} (vs {})", topic, opponent.name));
            }
        }

        let stance_of = |id: &str| {
            self.positions
                .iter()
                .find(|p| p.participant_id == id)
                .map(|p| p.stance.clone())
                .unwrap_or_default()
        };
        let disagreement = Disagreement {
            topic,
            first: Side {
                participant_id: first.id.clone(),
                stance: stance_of(&first.id),
            },
            second: Side {
                participant_id: second.id.clone(),
                stance: stance_of(&second.id),
            },
            resolved: false,
        };
        self.disagreements.push(disagreement);
    }

    pub fn position_of(&self, participant_id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.participant_id == participant_id)
    }
}

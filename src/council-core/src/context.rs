//! Builds the bounded context a speaker sees before taking a turn.

use std::fmt::Write as _;

use crate::generation::ChatMessage;
use crate::participant::Participant;
use crate::transcript::{Transcript, TurnRecord};

/// How a prior turn is attributed from the viewer's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextLabel {
    /// The viewer's own earlier turn.
    Own,
    Moderator,
    Speaker(String),
}

impl ContextLabel {
    fn for_record(record: &TurnRecord, viewer: Option<&str>) -> Self {
        if record.is_moderator() {
            ContextLabel::Moderator
        } else if viewer.is_some() && record.participant_id.as_deref() == viewer {
            ContextLabel::Own
        } else {
            ContextLabel::Speaker(record.speaker.clone())
        }
    }

    pub fn render(&self) -> String {
        match self {
            ContextLabel::Own => "[You]".to_string(),
            ContextLabel::Moderator => "[MODERATOR]".to_string(),
            ContextLabel::Speaker(name) => format!("[{}]", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub label: ContextLabel,
    pub content: String,
}

/// The last few turns of a debate, labelled for one viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    entries: Vec<ContextEntry>,
}

impl ContextWindow {
    /// Take the newest `turns` records, labelled relative to `viewer`
    /// (a participant id, or `None` for the moderator).
    pub fn build(transcript: &Transcript, viewer: Option<&str>, turns: usize) -> Self {
        let entries = transcript
            .recent(turns)
            .iter()
            .map(|record| ContextEntry {
                label: ContextLabel::for_record(record, viewer),
                content: record.content.clone(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("Recent debate:\n\n");
        for entry in &self.entries {
            let _ = write!(out, "{}: {}\n\n", entry.label.render(), entry.content);
        }
        out
    }
}

/// Request for a moderator turn.
pub fn moderator_request(
    topic: &str,
    roster: &[Participant],
    context: &ContextWindow,
    instruction: &str,
) -> Vec<ChatMessage> {
    let debaters = roster
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    vec![ChatMessage::user(format!(
        "Topic: {}\n\nDebaters: {}\n\n{}\n\n{}",
        topic,
        debaters,
        context.render(),
        instruction
    ))]
}

/// Request for a participant turn. `others` is everyone seated, the speaker is filtered out.
pub fn participant_request(
    topic: &str,
    speaker: &Participant,
    others: &[Participant],
    context: &ContextWindow,
    instruction: &str,
) -> Vec<ChatMessage> {
    let other_names = others
        .iter()
        .filter(|p| p.id != speaker.id)
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    vec![ChatMessage::user(format!(
        r#"You are participating in a formal debate.

Topic: {}

Other debaters: {}

{}

{}

Remember: This is a debate. Engage directly with the other debaters' arguments.
If you disagree, say so clearly and explain why. If you agree, acknowledge it and build upon it.
Do not simply give a monologue - this is a conversation."#,
        topic,
        other_names,
        context.render(),
        instruction
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::PersonaProfile;
    use crate::phase::Phase;

    fn seat(id: &str, name: &str) -> Participant {
        Participant::from_persona(&PersonaProfile::new(id, name, format!("You are {}.", name)))
    }

    fn transcript() -> Transcript {
        let mut t = Transcript::new();
        t.append(TurnRecord::moderator("Moderator", "Welcome.", Phase::Opening));
        t.append(TurnRecord::participant("a", "Alpha", "Alpha opens.", Phase::Opening));
        t.append(TurnRecord::participant("b", "Beta", "Beta opens.", Phase::Opening));
        t.append(TurnRecord::participant("a", "Alpha", "Alpha again.", Phase::Opening));
        t
    }

    #[test]
    fn test_own_turns_are_labelled_you() {
        let window = ContextWindow::build(&transcript(), Some("a"), 10);
        let labels: Vec<_> = window.entries().iter().map(|e| e.label.clone()).collect();
        assert_eq!(
            labels,
            vec![
                ContextLabel::Moderator,
                ContextLabel::Own,
                ContextLabel::Speaker("Beta".to_string()),
                ContextLabel::Own,
            ]
        );
        let rendered = window.render();
        assert!(!rendered.contains("[Alpha]"));
        assert!(rendered.contains("[You]: Alpha again."));
    }

    #[test]
    fn test_moderator_view_names_everyone() {
        let rendered = ContextWindow::build(&transcript(), None, 10).render();
        assert!(rendered.starts_with("Recent debate:"));
        assert!(rendered.contains("[MODERATOR]: Welcome."));
        assert!(rendered.contains("[Alpha]: Alpha opens."));
        assert!(!rendered.contains("[You]"));
    }

    #[test]
    fn test_window_is_bounded_and_chronological() {
        let window = ContextWindow::build(&transcript(), Some("b"), 2);
        let contents: Vec<_> = window.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["Beta opens.", "Alpha again."]);
    }

    #[test]
    fn test_empty_transcript_renders_nothing() {
        let window = ContextWindow::build(&Transcript::new(), None, 10);
        assert!(window.is_empty());
        assert_eq!(window.render(), "");
    }

    #[test]
    fn test_participant_request_excludes_speaker() {
        let roster = vec![seat("a", "Alpha"), seat("b", "Beta"), seat("c", "Gamma")];
        let window = ContextWindow::build(&transcript(), Some("a"), 10);
        let messages = participant_request("Taxes", &roster[0], &roster, &window, "Open.");
        assert_eq!(messages.len(), 1);
        let prompt = &messages[0].content;
        assert!(prompt.contains("Topic: Taxes"));
        assert!(prompt.contains("Other debaters: Beta, Gamma"));
        assert!(prompt.contains("Open."));
        assert!(prompt.contains("Do not simply give a monologue"));
    }

    #[test]
    fn test_moderator_request_lists_roster() {
        let roster = vec![seat("a", "Alpha"), seat("b", "Beta")];
        let window = ContextWindow::build(&Transcript::new(), None, 10);
        let messages = moderator_request("Taxes", &roster, &window, "Introduce.");
        assert!(messages[0].content.contains("Debaters: Alpha, Beta"));
        assert!(messages[0].content.ends_with("Introduce."));
    }
}

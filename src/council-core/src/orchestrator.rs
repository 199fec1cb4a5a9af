//! Debate orchestration.
//!
//! [`DebateEngine`] walks the phase machine one turn at a time, streams each
//! speaker's text as it is generated, records completed turns and seats
//! nominated guests as they appear.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::analysis::{Disagreement, Position, PositionAnalysis};
use crate::config::{Config, default_config};
use crate::context::{self, ContextWindow};
use crate::error::CouncilError;
use crate::generation::{ChatMessage, GenerationClient, collect_text};
use crate::nomination::{GuestFactory, NOMINATION_INSTRUCTION, NominationDesk, NominationQuota};
use crate::participant::Participant;
use crate::phase::{Phase, PhaseMachine, Seat, TurnPlan};
use crate::prompts;
use crate::transcript::{SpeakerKind, Transcript, TurnRecord};

/// Settings for one debate session, fixed at construction.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// The topic being debated.
    pub topic: String,
    pub moderator_name: String,
    /// Neutral directive the moderator speaks under.
    pub moderator_directive: String,
    /// How many recent turns each speaker is shown.
    pub context_turns: usize,
    pub min_participants: usize,
    pub max_participants: usize,
    pub nominations_enabled: bool,
    pub max_nominations: usize,
}

impl DebateConfig {
    /// Settings for `topic` using the built-in defaults.
    pub fn new(topic: impl Into<String>) -> Self {
        Self::from_config(topic, &default_config())
    }

    /// Settings for `topic` taken from a loaded config file.
    pub fn from_config(topic: impl Into<String>, config: &Config) -> Self {
        Self {
            topic: topic.into(),
            moderator_name: config.moderator.name.clone(),
            moderator_directive: config.moderator.directive.clone(),
            context_turns: config.debate.context_turns,
            min_participants: config.debate.min_participants,
            max_participants: config.debate.max_participants,
            nominations_enabled: config.nominations.enabled,
            max_nominations: config.nominations.max_per_session,
        }
    }

    /// Override whether guests may be nominated.
    pub fn with_nominations(mut self, enabled: bool) -> Self {
        self.nominations_enabled = enabled;
        self
    }

    /// Override the per-session guest cap.
    pub fn with_max_nominations(mut self, max: usize) -> Self {
        self.max_nominations = max;
        self
    }

    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    fn validate(&self, roster: &[Participant]) -> Result<(), CouncilError> {
        if self.topic.trim().is_empty() {
            return Err(CouncilError::ConfigError("Debate topic cannot be empty".to_string()));
        }
        if self.context_turns == 0 {
            return Err(CouncilError::ConfigError(
                "context_turns must be at least 1".to_string(),
            ));
        }
        if self.min_participants < 2 || self.min_participants > self.max_participants {
            return Err(CouncilError::ConfigError(format!(
                "Invalid participant bounds: min {} / max {}",
                self.min_participants, self.max_participants
            )));
        }
        if roster.len() < self.min_participants || roster.len() > self.max_participants {
            return Err(CouncilError::InvalidParticipantCount {
                min: self.min_participants,
                max: self.max_participants,
                actual: roster.len(),
            });
        }

        let mut seen = HashSet::new();
        for participant in roster {
            if !seen.insert(participant.id.as_str()) {
                return Err(CouncilError::DuplicateParticipant(participant.id.clone()));
            }
        }
        Ok(())
    }
}

/// Events emitted while a debate streams.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    /// A speaker takes the floor.
    TurnStart {
        phase: Phase,
        speaker: String,
        kind: SpeakerKind,
    },
    /// A piece of the current speaker's text, exactly as generated.
    Fragment {
        phase: Phase,
        speaker: String,
        kind: SpeakerKind,
        text: String,
    },
    /// The speaker has finished; `record` is what the transcript now holds.
    TurnEnd {
        phase: Phase,
        speaker: String,
        kind: SpeakerKind,
        record: TurnRecord,
    },
    /// A guest was nominated during the current turn and will speak later.
    GuestNominated {
        phase: Phase,
        guest: Participant,
        nominated_by: String,
    },
}

impl DebateEvent {
    pub fn phase(&self) -> Phase {
        match self {
            DebateEvent::TurnStart { phase, .. }
            | DebateEvent::Fragment { phase, .. }
            | DebateEvent::TurnEnd { phase, .. }
            | DebateEvent::GuestNominated { phase, .. } => *phase,
        }
    }
}

/// Everything needed to run one turn.
struct PreparedTurn {
    speaker: String,
    kind: SpeakerKind,
    participant: Option<Participant>,
    directive: String,
    messages: Vec<ChatMessage>,
}

impl PreparedTurn {
    fn record(&self, content: String, phase: Phase) -> TurnRecord {
        match &self.participant {
            Some(p) => TurnRecord::participant(&p.id, &p.name, content, phase),
            None => TurnRecord::moderator(&self.speaker, content, phase),
        }
    }
}

/// Runs a moderated, multi-phase debate.
pub struct DebateEngine {
    config: DebateConfig,
    roster: Vec<Participant>,
    client: Arc<dyn GenerationClient>,
    nominations: NominationDesk,
    transcript: Transcript,
    phase: Phase,
    started: bool,
    positions: Vec<Position>,
    disagreements: Vec<Disagreement>,
}

impl DebateEngine {
    /// Create an engine for `roster`, validating everything up front.
    pub fn new(
        config: DebateConfig,
        roster: Vec<Participant>,
        client: Arc<dyn GenerationClient>,
        guest_factory: Arc<dyn GuestFactory>,
    ) -> Result<Self, CouncilError> {
        config.validate(&roster)?;

        let quota = NominationQuota::new(config.nominations_enabled, config.max_nominations);

        Ok(Self {
            nominations: NominationDesk::new(quota, guest_factory),
            config,
            roster,
            client,
            transcript: Transcript::new(),
            phase: Phase::Opening,
            started: false,
            positions: Vec::new(),
            disagreements: Vec::new(),
        })
    }

    /// Swap the nomination desk, e.g. to use a different parser.
    pub fn with_nomination_desk(mut self, desk: NominationDesk) -> Self {
        self.nominations = desk;
        self
    }

    /// Run every phase, streaming events as they happen.
    ///
    /// Turns run strictly one after another. A generation error ends the
    /// stream with that error. Dropping the stream early stops the debate;
    /// the transcript keeps every turn completed so far.
    ///
    /// The stream borrows the engine mutably, so [`transcript`](Self::transcript)
    /// is only reachable once it is dropped. Callers that need the transcript
    /// while the debate is live should fold the `record` carried by each
    /// [`DebateEvent::TurnEnd`]; those records match the stored ones, tag
    /// correction included.
    pub fn run_full_debate(
        &mut self,
        cross_exam_rounds: usize,
        free_debate_exchanges: usize,
    ) -> impl Stream<Item = Result<DebateEvent, CouncilError>> + Send + '_ {
        let this = self;
        async_stream::try_stream! {
            if this.started {
                Err::<(), _>(CouncilError::AlreadyRun)?;
            }
            this.started = true;

            tracing::info!(
                topic = %this.config.topic,
                participants = this.roster.len(),
                cross_exam_rounds,
                free_debate_exchanges,
                "Debate starting"
            );

            let mut machine = PhaseMachine::new(cross_exam_rounds, free_debate_exchanges);
            let mut announced: Option<Phase> = None;

            while let Some(plan) =
                machine.next_turn(this.roster.len(), this.nominations.guests().len())
            {
                if announced != Some(plan.phase) {
                    tracing::info!(phase = %plan.phase, "Entering phase");
                    announced = Some(plan.phase);
                }
                this.phase = plan.phase;

                let turn = this.prepare_turn(&plan)?;
                let phase = plan.phase;
                tracing::debug!(%phase, speaker = %turn.speaker, cue = ?plan.cue, "Turn starting");

                yield DebateEvent::TurnStart {
                    phase,
                    speaker: turn.speaker.clone(),
                    kind: turn.kind,
                };

                let mut fragments = this
                    .client
                    .generate(turn.messages.clone(), &turn.directive)
                    .await?;
                let mut text = String::new();
                while let Some(fragment) = fragments.next().await {
                    let fragment = fragment?;
                    text.push_str(&fragment);
                    yield DebateEvent::Fragment {
                        phase,
                        speaker: turn.speaker.clone(),
                        kind: turn.kind,
                        text: fragment,
                    };
                }

                this.transcript.append(turn.record(text, phase));

                if plan.detect_nominations {
                    if let Some(speaker) = &turn.participant {
                        let spoken = this
                            .transcript
                            .last()
                            .map(|r| r.content.clone())
                            .unwrap_or_default();
                        let outcome = this
                            .nominations
                            .maybe_handle_nomination(
                                speaker,
                                &spoken,
                                &this.config.topic,
                                &this.roster,
                                &mut this.transcript,
                            )
                            .await;
                        if let Some(guest) = outcome.guest {
                            yield DebateEvent::GuestNominated {
                                phase,
                                guest,
                                nominated_by: speaker.name.clone(),
                            };
                        }
                    }
                }

                let record = this
                    .transcript
                    .last()
                    .cloned()
                    .ok_or_else(|| CouncilError::GenerationError("turn was not recorded".to_string()))?;
                tracing::debug!(%phase, speaker = %turn.speaker, chars = record.content.len(), "Turn finished");

                yield DebateEvent::TurnEnd {
                    phase,
                    speaker: turn.speaker,
                    kind: turn.kind,
                    record,
                };
            }

            tracing::info!(
                turns = this.transcript.len(),
                guests = this.nominations.guests().len(),
                "Debate concluded"
            );
        }
    }

    fn prepare_turn(&self, plan: &TurnPlan) -> Result<PreparedTurn, CouncilError> {
        let topic = &self.config.topic;
        let turns = self.config.context_turns;

        let participant = match plan.seat {
            Seat::Moderator => {
                let window = ContextWindow::build(&self.transcript, None, turns);
                let instruction =
                    prompts::instruction(plan.cue, topic, &self.config.moderator_name, "");
                return Ok(PreparedTurn {
                    speaker: self.config.moderator_name.clone(),
                    kind: SpeakerKind::Moderator,
                    participant: None,
                    directive: self.config.moderator_directive.clone(),
                    messages: context::moderator_request(topic, &self.roster, &window, &instruction),
                });
            }
            Seat::Original(index) => self.roster.get(index),
            Seat::Guest(index) => self.nominations.guests().get(index),
        }
        .ok_or_else(|| {
            CouncilError::ConfigError(format!("No participant seated at {:?}", plan.seat))
        })?;

        let seated: Vec<Participant> = self
            .roster
            .iter()
            .chain(self.nominations.guests())
            .cloned()
            .collect();
        let other_names = seated
            .iter()
            .filter(|p| p.id != participant.id)
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut instruction = prompts::instruction(plan.cue, topic, &participant.name, &other_names);
        if plan.detect_nominations && self.nominations.is_available() {
            instruction.push_str(NOMINATION_INSTRUCTION);
        }

        let window = ContextWindow::build(&self.transcript, Some(&participant.id), turns);
        Ok(PreparedTurn {
            speaker: participant.name.clone(),
            kind: SpeakerKind::Participant,
            participant: Some(participant.clone()),
            directive: participant.directive.clone(),
            messages: context::participant_request(topic, participant, &seated, &window, &instruction),
        })
    }

    /// Ask the moderator to map out positions and disagreements so far.
    ///
    /// The analysis is not part of the transcript. Results replace any
    /// earlier analysis.
    pub async fn analyze_positions(&mut self) -> Result<PositionAnalysis, CouncilError> {
        let window = ContextWindow::build(&self.transcript, None, self.config.context_turns);
        let prompt = format!(
            "{}\n\n{}",
            window.render(),
            prompts::position_analysis(&self.config.topic)
        );

        let stream = self
            .client
            .generate(vec![ChatMessage::user(prompt)], &self.config.moderator_directive)
            .await?;
        let text = collect_text(stream).await?;

        let seated: Vec<Participant> = self
            .roster
            .iter()
            .chain(self.nominations.guests())
            .cloned()
            .collect();
        let analysis = PositionAnalysis::parse(&text, &seated);
        tracing::debug!(
            positions = analysis.positions.len(),
            disagreements = analysis.disagreements.len(),
            "Position analysis parsed"
        );

        self.positions = analysis.positions.clone();
        self.disagreements = analysis.disagreements.clone();
        Ok(analysis)
    }

    /// Mark a tracked disagreement as resolved. Returns false for an unknown index.
    pub fn resolve_disagreement(&mut self, index: usize) -> bool {
        match self.disagreements.get_mut(index) {
            Some(d) => {
                d.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Get the full transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The phase currently (or most recently) running.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Original participants, in speaking order.
    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    /// Guests seated so far, in nomination order.
    pub fn guests(&self) -> &[Participant] {
        self.nominations.guests()
    }

    pub fn nominations_remaining(&self) -> usize {
        self.nominations.quota().remaining()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn disagreements(&self) -> &[Disagreement] {
        &self.disagreements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::scripted::ScriptedClient;
    use crate::nomination::stub::StubGuestFactory;
    use crate::participant::PersonaProfile;
    use std::pin::pin;

    fn seat(id: &str, name: &str) -> Participant {
        Participant::from_persona(&PersonaProfile::new(id, name, format!("You are {}.", name)))
    }

    fn roster(n: usize) -> Vec<Participant> {
        [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma"), ("d", "Delta")]
            .iter()
            .take(n)
            .map(|(id, name)| seat(id, name))
            .collect()
    }

    /// A client whose reply at `index` is `special`; every other call gets the fallback.
    fn client_with(specials: &[(usize, &str)]) -> Arc<ScriptedClient> {
        let last = specials.iter().map(|(i, _)| *i).max().unwrap_or(0);
        let mut client = ScriptedClient::new();
        for i in 0..=last {
            let text = specials
                .iter()
                .find(|(idx, _)| *idx == i)
                .map(|(_, t)| *t)
                .unwrap_or("A considered reply.");
            client = client.reply(text);
        }
        Arc::new(client)
    }

    fn engine(
        participants: usize,
        config: DebateConfig,
        client: Arc<ScriptedClient>,
    ) -> DebateEngine {
        DebateEngine::new(
            config,
            roster(participants),
            client,
            Arc::new(StubGuestFactory::default()),
        )
        .unwrap()
    }

    async fn run(engine: &mut DebateEngine, rounds: usize, exchanges: usize) -> Vec<DebateEvent> {
        engine
            .run_full_debate(rounds, exchanges)
            .map(|event| event.unwrap())
            .collect()
            .await
    }

    fn count(transcript: &Transcript, phase: Phase, kind: SpeakerKind) -> usize {
        transcript
            .records()
            .iter()
            .filter(|r| r.phase == phase && r.kind == kind)
            .count()
    }

    const TAGGED: &str = "We are missing a historian. [NOMINATE: Barbara Tuchman | military history]";

    #[tokio::test]
    async fn test_two_person_debate_without_nominations() {
        let client = client_with(&[]);
        let mut engine = engine(2, DebateConfig::new("Taxes").with_nominations(false), client);
        let events = run(&mut engine, 1, 2).await;

        let transcript = engine.transcript();
        assert_eq!(transcript.len(), 16);
        for phase in [Phase::Opening, Phase::CrossExamination, Phase::Rebuttal, Phase::FreeDebate] {
            assert_eq!(count(transcript, phase, SpeakerKind::Moderator), 1, "{phase}");
            assert_eq!(count(transcript, phase, SpeakerKind::Participant), 2, "{phase}");
        }
        assert_eq!(count(transcript, Phase::Closing, SpeakerKind::Moderator), 2);
        assert_eq!(count(transcript, Phase::Closing, SpeakerKind::Participant), 2);

        let ends = events.iter().filter(|e| matches!(e, DebateEvent::TurnEnd { .. })).count();
        assert_eq!(ends, 16);
        assert!(engine.guests().is_empty());
        assert_eq!(engine.phase(), Phase::Closing);
    }

    #[tokio::test]
    async fn test_event_phases_are_contiguous() {
        let mut engine = engine(3, DebateConfig::new("Taxes"), client_with(&[]));
        let events = run(&mut engine, 2, 4).await;

        let mut phases: Vec<Phase> = Vec::new();
        for event in &events {
            if phases.last() != Some(&event.phase()) {
                phases.push(event.phase());
            }
        }
        assert_eq!(phases, Phase::ALL.to_vec());

        let recorded: Vec<Phase> = engine.transcript().records().iter().map(|r| r.phase).collect();
        assert!(recorded.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_turn_events_are_framed() {
        let mut engine = engine(2, DebateConfig::new("Taxes"), client_with(&[]));
        let events = run(&mut engine, 1, 1).await;

        let mut open: Option<String> = None;
        let mut text = String::new();
        for event in events {
            match event {
                DebateEvent::TurnStart { speaker, .. } => {
                    assert!(open.is_none());
                    open = Some(speaker);
                    text.clear();
                }
                DebateEvent::Fragment { speaker, text: fragment, .. } => {
                    assert_eq!(open.as_deref(), Some(speaker.as_str()));
                    text.push_str(&fragment);
                }
                DebateEvent::TurnEnd { speaker, record, .. } => {
                    assert_eq!(open.take().as_deref(), Some(speaker.as_str()));
                    assert_eq!(record.content, text);
                    assert_eq!(record.speaker, speaker);
                }
                DebateEvent::GuestNominated { .. } => {}
            }
        }
        assert!(open.is_none());
    }

    #[tokio::test]
    async fn test_cross_examination_counts() {
        let mut engine = engine(3, DebateConfig::new("Taxes"), client_with(&[]));
        run(&mut engine, 3, 2).await;
        let transcript = engine.transcript();
        assert_eq!(count(transcript, Phase::CrossExamination, SpeakerKind::Moderator), 3);
        assert_eq!(count(transcript, Phase::CrossExamination, SpeakerKind::Participant), 9);
    }

    #[tokio::test]
    async fn test_speakers_see_themselves_as_you() {
        let client = client_with(&[]);
        let mut engine = engine(2, DebateConfig::new("Taxes"), client.clone());
        run(&mut engine, 1, 2).await;

        let alpha_calls: Vec<_> = client
            .calls()
            .into_iter()
            .filter(|c| c.directive == "You are Alpha.")
            .collect();
        assert!(alpha_calls.len() > 1);
        assert!(alpha_calls.iter().all(|c| !c.messages[0].content.contains("[Alpha]:")));
        assert!(alpha_calls.iter().skip(1).all(|c| c.messages[0].content.contains("[You]:")));
        assert!(alpha_calls.iter().all(|c| c.messages[0].content.contains("Other debaters: Beta")));
    }

    #[tokio::test]
    async fn test_moderator_uses_neutral_directive() {
        let client = client_with(&[]);
        let config = DebateConfig::new("Taxes");
        let directive = config.moderator_directive.clone();
        let mut engine = engine(2, config, client.clone());
        run(&mut engine, 1, 1).await;

        let first = &client.calls()[0];
        assert_eq!(first.directive, directive);
        assert!(first.messages[0].content.contains("Debaters: Alpha, Beta"));
        assert!(first.messages[0].content.contains("introduce this debate on 'Taxes'"));
    }

    #[tokio::test]
    async fn test_nominated_guest_speaks_in_free_debate_and_closing() {
        // Calls 0..=8 cover opening, cross-examination and rebuttal; 9 is the
        // moderator opening the floor and 10 is Alpha's first exchange.
        let client = client_with(&[(10, TAGGED)]);
        let config = DebateConfig::new("Wars").with_max_nominations(1);
        let mut engine = engine(2, config, client.clone());
        let events = run(&mut engine, 1, 2).await;

        assert_eq!(engine.guests().len(), 1);
        let guest = engine.guests()[0].clone();
        assert_eq!(guest.name, "Barbara Tuchman");

        let transcript = engine.transcript();
        assert_eq!(transcript.len(), 18);
        assert_eq!(transcript.records()[10].content, "We are missing a historian.");

        let guest_turns: Vec<(usize, Phase)> = transcript
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.participant_id.as_deref() == Some(guest.id.as_str()))
            .map(|(i, r)| (i, r.phase))
            .collect();
        assert_eq!(guest_turns, vec![(12, Phase::FreeDebate), (16, Phase::Closing)]);

        // Nomination is announced inside Alpha's turn, before it ends.
        let nominated = events
            .iter()
            .position(|e| matches!(e, DebateEvent::GuestNominated { .. }))
            .unwrap();
        match &events[nominated + 1] {
            DebateEvent::TurnEnd { speaker, record, .. } => {
                assert_eq!(speaker, "Alpha");
                assert_eq!(record.content, "We are missing a historian.");
            }
            other => panic!("expected TurnEnd, got {other:?}"),
        }

        // Once the quota is spent the nomination hint disappears.
        let calls = client.calls();
        assert!(calls[10].messages[0].content.contains("[NOMINATE:"));
        assert!(!calls[11].messages[0].content.contains("[NOMINATE:"));
        assert_eq!(calls[12].directive, guest.directive);
    }

    #[tokio::test]
    async fn test_turn_end_records_rebuild_transcript() {
        let client = client_with(&[(10, TAGGED)]);
        let mut engine = engine(2, DebateConfig::new("Wars"), client);

        let mut live = Vec::new();
        {
            let mut events = pin!(engine.run_full_debate(1, 2));
            while let Some(event) = events.next().await {
                if let DebateEvent::TurnEnd { record, .. } = event.unwrap() {
                    live.push(record);
                }
            }
        }

        assert_eq!(live.len(), 18);
        assert_eq!(live.as_slice(), engine.transcript().records());
        assert_eq!(live[10].content, "We are missing a historian.");
    }

    #[tokio::test]
    async fn test_guest_count_respects_quota() {
        let second = "Also. [NOMINATE: Peter Drucker | management]";
        let third = "And. [NOMINATE: Jane Jacobs | cities]";
        let client = client_with(&[(10, TAGGED), (11, second), (13, third)]);
        let config = DebateConfig::new("Wars").with_max_nominations(2);
        let mut engine = engine(2, config, client);
        run(&mut engine, 1, 4).await;

        assert_eq!(engine.guests().len(), 2);
        assert_eq!(engine.nominations_remaining(), 0);
        assert!(engine.transcript().records().iter().any(|r| r.content.contains("[NOMINATE: Jane Jacobs")));
    }

    #[tokio::test]
    async fn test_disabled_nominations_leave_text_alone() {
        let client = client_with(&[(10, TAGGED)]);
        let config = DebateConfig::new("Wars").with_nominations(false);
        let mut engine = engine(2, config, client.clone());
        let events = run(&mut engine, 1, 2).await;

        assert!(engine.guests().is_empty());
        assert!(!events.iter().any(|e| matches!(e, DebateEvent::GuestNominated { .. })));
        assert_eq!(engine.transcript().records()[10].content, TAGGED);
        assert!(client.calls().iter().all(|c| !c.messages[0].content.contains("Only nominate")));
    }

    #[tokio::test]
    async fn test_nominations_only_checked_in_free_debate() {
        // Call 1 is Alpha's opening statement.
        let client = client_with(&[(1, TAGGED)]);
        let mut engine = engine(2, DebateConfig::new("Wars"), client);
        run(&mut engine, 1, 2).await;

        assert!(engine.guests().is_empty());
        assert_eq!(engine.transcript().records()[1].content, TAGGED);
    }

    #[tokio::test]
    async fn test_custom_nomination_parser() {
        use crate::nomination::{Nomination, NominationParser};

        struct InviteParser;
        impl NominationParser for InviteParser {
            fn parse(&self, text: &str) -> Option<Nomination> {
                let rest = text.split("@invite ").nth(1)?;
                let (name, expertise) = rest.split_once(" for ")?;
                Some(Nomination {
                    name: name.trim().to_string(),
                    expertise: expertise.trim().to_string(),
                })
            }
            fn strip(&self, text: &str) -> String {
                text.split("@invite ").next().unwrap_or_default().trim_end().to_string()
            }
        }

        let client = client_with(&[(10, "Good point. @invite Ada Lovelace for computation")]);
        let desk = NominationDesk::new(
            NominationQuota::new(true, 1),
            Arc::new(StubGuestFactory::default()),
        )
        .with_parser(Box::new(InviteParser));
        let mut engine = engine(2, DebateConfig::new("Machines"), client).with_nomination_desk(desk);
        run(&mut engine, 1, 2).await;

        assert_eq!(engine.guests()[0].name, "Ada Lovelace");
        assert_eq!(engine.transcript().records()[10].content, "Good point.");
    }

    #[tokio::test]
    async fn test_generation_failure_ends_stream() {
        let client = Arc::new(
            ScriptedClient::new()
                .reply("Welcome.")
                .reply("Alpha opens.")
                .fail("backend unavailable"),
        );
        let mut engine = engine(2, DebateConfig::new("Taxes"), client);
        let results: Vec<_> = engine.run_full_debate(1, 2).collect().await;

        let last = results.last().unwrap();
        assert!(matches!(last, Err(CouncilError::GenerationError(_))));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(engine.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_early_stop_keeps_completed_turns_only() {
        let mut engine = engine(2, DebateConfig::new("Taxes"), client_with(&[]));
        {
            let mut stream = pin!(engine.run_full_debate(1, 2));
            let mut finished = 0;
            while let Some(event) = stream.next().await {
                match event.unwrap() {
                    DebateEvent::TurnEnd { .. } => finished += 1,
                    DebateEvent::Fragment { .. } if finished == 2 => break,
                    _ => {}
                }
            }
        }
        assert_eq!(engine.transcript().len(), 2);
        assert_eq!(engine.phase(), Phase::Opening);
    }

    #[tokio::test]
    async fn test_debate_cannot_run_twice() {
        let mut engine = engine(2, DebateConfig::new("Taxes"), client_with(&[]));
        run(&mut engine, 1, 1).await;
        let len = engine.transcript().len();

        let second: Vec<_> = engine.run_full_debate(1, 1).collect().await;
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], Err(CouncilError::AlreadyRun)));
        assert_eq!(engine.transcript().len(), len);
    }

    #[test]
    fn test_rejects_small_roster() {
        let result = DebateEngine::new(
            DebateConfig::new("Taxes"),
            roster(1),
            Arc::new(ScriptedClient::new()),
            Arc::new(StubGuestFactory::default()),
        );
        assert!(matches!(
            result,
            Err(CouncilError::InvalidParticipantCount { min: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_participants() {
        let result = DebateEngine::new(
            DebateConfig::new("Taxes"),
            vec![seat("a", "Alpha"), seat("a", "Alpha")],
            Arc::new(ScriptedClient::new()),
            Arc::new(StubGuestFactory::default()),
        );
        assert!(matches!(result, Err(CouncilError::DuplicateParticipant(id)) if id == "a"));
    }

    #[test]
    fn test_rejects_bad_settings() {
        for config in [
            DebateConfig::new("  "),
            DebateConfig::new("Taxes").with_context_turns(0),
        ] {
            let result = DebateEngine::new(
                config,
                roster(2),
                Arc::new(ScriptedClient::new()),
                Arc::new(StubGuestFactory::default()),
            );
            assert!(matches!(result, Err(CouncilError::ConfigError(_))));
        }
    }

    #[tokio::test]
    async fn test_analyze_positions_is_not_recorded() {
        let analysis = "## Positions\nAlpha: Cut taxes\n- Growth\nBeta: Raise taxes\n\n\
                        ## Key Disagreements\n1. Alpha vs Beta on the top marginal rate";
        let client = Arc::new(ScriptedClient::new().reply(analysis));
        let mut engine = engine(2, DebateConfig::new("Taxes"), client.clone());

        let result = engine.analyze_positions().await.unwrap();
        assert_eq!(result.positions.len(), 2);
        assert_eq!(engine.positions()[0].stance, "Cut taxes");
        assert_eq!(engine.disagreements()[0].topic, "the top marginal rate");
        assert!(engine.transcript().is_empty());

        assert!(engine.resolve_disagreement(0));
        assert!(engine.disagreements()[0].resolved);
        assert!(!engine.resolve_disagreement(5));
        assert!(client.calls()[0].messages[0].content.contains("## Key Disagreements"));
    }
}

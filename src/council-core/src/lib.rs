//! Council Core Library
//!
//! Runs moderated panel debates between persona-driven participants:
//! phase sequencing, per-speaker context windows, streamed turns, the
//! transcript, and guests nominated mid-debate.

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod nomination;
pub mod orchestrator;
pub mod participant;
pub mod phase;
pub mod prompts;
pub mod transcript;

pub use analysis::{Disagreement, Position, PositionAnalysis};
pub use config::{Config, Intensity, default_config};
pub use error::CouncilError;
pub use generation::{
    ChatMessage, FragmentStream, GenerationClient, OpenAiGenerator, OpenAiSettings, Role,
};
pub use nomination::{
    GeneratedGuestFactory, GuestFactory, NominationDesk, NominationParser, NominationQuota,
    TagNominationParser,
};
pub use orchestrator::{DebateConfig, DebateEngine, DebateEvent};
pub use participant::{Participant, Persona, PersonaProfile, PersonaRepository, Provenance};
pub use phase::Phase;
pub use transcript::{SpeakerKind, Transcript, TurnRecord};

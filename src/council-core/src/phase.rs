//! Debate phases and the planner that sequences turns through them.
//!
//! [`PhaseMachine`] decides who speaks next and with which cue. It never
//! talks to the backend; the engine executes each [`TurnPlan`] it hands out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five fixed stages of a debate, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    CrossExamination,
    Rebuttal,
    FreeDebate,
    Closing,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Opening,
        Phase::CrossExamination,
        Phase::Rebuttal,
        Phase::FreeDebate,
        Phase::Closing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Opening => "opening",
            Phase::CrossExamination => "cross_examination",
            Phase::Rebuttal => "rebuttal",
            Phase::FreeDebate => "free_debate",
            Phase::Closing => "closing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Opening => "Opening Statements",
            Phase::CrossExamination => "Cross-Examination",
            Phase::Rebuttal => "Rebuttals",
            Phase::FreeDebate => "Open Debate",
            Phase::Closing => "Closing Statements",
        }
    }

    fn next(self) -> Option<Phase> {
        match self {
            Phase::Opening => Some(Phase::CrossExamination),
            Phase::CrossExamination => Some(Phase::Rebuttal),
            Phase::Rebuttal => Some(Phase::FreeDebate),
            Phase::FreeDebate => Some(Phase::Closing),
            Phase::Closing => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who holds the floor for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Moderator,
    /// Index into the original roster.
    Original(usize),
    /// Index into the guest list, in nomination order.
    Guest(usize),
}

/// What the speaker has been asked to do. Maps one-to-one onto instruction text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    ModeratorIntroduction,
    OpeningStatement,
    ModeratorChallenge,
    CrossExamination,
    ModeratorIntervention,
    ModeratorFraming,
    Rebuttal,
    ModeratorOpenFloor,
    FreeExchange,
    ModeratorRedirect,
    GuestContribution,
    ModeratorSummary,
    ClosingStatement,
    GuestClosing,
    ModeratorFarewell,
}

/// One turn the engine should run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnPlan {
    pub phase: Phase,
    pub seat: Seat,
    pub cue: Cue,
    /// Whether the finished text should be checked for a guest nomination.
    pub detect_nominations: bool,
}

impl TurnPlan {
    fn new(phase: Phase, seat: Seat, cue: Cue) -> Self {
        Self {
            phase,
            seat,
            cue,
            detect_nominations: false,
        }
    }
}

/// Phase-local position inside the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Nothing from this phase has been handed out yet.
    Start,
    /// Speaking through the original roster; `index` is the next speaker.
    Roster { round: usize, index: usize },
    /// A moderator interjection is due before `next` resumes.
    Interjection { next: usize },
    Guests { index: usize },
    Farewell,
    Done,
}

/// Sequences turns through the five phases without ever revisiting one.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: Phase,
    step: Step,
    cross_exam_rounds: usize,
    free_debate_exchanges: usize,
}

impl PhaseMachine {
    pub fn new(cross_exam_rounds: usize, free_debate_exchanges: usize) -> Self {
        Self {
            phase: Phase::Opening,
            step: Step::Start,
            cross_exam_rounds,
            free_debate_exchanges,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.step == Step::Done
    }

    /// Plan the next turn.
    ///
    /// `guests` is the number of guests seated so far; guests speak in the
    /// order they were nominated. Returns `None` once the closing remark has
    /// been handed out.
    pub fn next_turn(&mut self, roster_len: usize, guests: usize) -> Option<TurnPlan> {
        loop {
            if self.step == Step::Done {
                return None;
            }
            if let Some(plan) = self.advance(roster_len, guests) {
                return Some(plan);
            }
            // Current phase is exhausted.
            match self.phase.next() {
                Some(next) => {
                    self.phase = next;
                    self.step = Step::Start;
                }
                None => self.step = Step::Done,
            }
        }
    }

    fn advance(&mut self, roster_len: usize, guests: usize) -> Option<TurnPlan> {
        match self.phase {
            Phase::Opening => self.roster_pass(roster_len, Cue::ModeratorIntroduction, Cue::OpeningStatement),
            Phase::CrossExamination => self.cross_examination(roster_len),
            Phase::Rebuttal => self.roster_pass(roster_len, Cue::ModeratorFraming, Cue::Rebuttal),
            Phase::FreeDebate => self.free_debate(roster_len, guests),
            Phase::Closing => self.closing(roster_len, guests),
        }
    }

    /// Moderator cue, then each original participant once.
    fn roster_pass(&mut self, roster_len: usize, moderator: Cue, participant: Cue) -> Option<TurnPlan> {
        match self.step {
            Step::Start => {
                self.step = Step::Roster { round: 0, index: 0 };
                Some(TurnPlan::new(self.phase, Seat::Moderator, moderator))
            }
            Step::Roster { round, index } if index < roster_len => {
                self.step = Step::Roster { round, index: index + 1 };
                Some(TurnPlan::new(self.phase, Seat::Original(index), participant))
            }
            _ => None,
        }
    }

    fn cross_examination(&mut self, roster_len: usize) -> Option<TurnPlan> {
        let rounds = self.cross_exam_rounds;
        match self.step {
            Step::Start => {
                self.step = Step::Roster { round: 0, index: 0 };
                Some(TurnPlan::new(self.phase, Seat::Moderator, Cue::ModeratorChallenge))
            }
            Step::Roster { round, .. } if round >= rounds => None,
            Step::Roster { round, index } if index < roster_len => {
                self.step = Step::Roster { round, index: index + 1 };
                Some(TurnPlan::new(self.phase, Seat::Original(index), Cue::CrossExamination))
            }
            Step::Roster { round, .. } => {
                // Round complete: intervene unless this was the last round.
                if round + 1 < rounds {
                    self.step = Step::Roster { round: round + 1, index: 0 };
                    Some(TurnPlan::new(self.phase, Seat::Moderator, Cue::ModeratorIntervention))
                } else {
                    self.step = Step::Roster { round: rounds, index: 0 };
                    None
                }
            }
            _ => None,
        }
    }

    fn free_debate(&mut self, roster_len: usize, guests: usize) -> Option<TurnPlan> {
        let exchanges = self.free_debate_exchanges;
        match self.step {
            Step::Start => {
                self.step = Step::Roster { round: 0, index: 0 };
                Some(TurnPlan::new(self.phase, Seat::Moderator, Cue::ModeratorOpenFloor))
            }
            Step::Roster { index: exchange, .. } if exchange < exchanges && roster_len > 0 => {
                let next = exchange + 1;
                self.step = if exchange % 2 == 1 && exchange + 1 < exchanges {
                    Step::Interjection { next }
                } else {
                    Step::Roster { round: 0, index: next }
                };
                let mut plan = TurnPlan::new(
                    self.phase,
                    Seat::Original(exchange % roster_len),
                    Cue::FreeExchange,
                );
                plan.detect_nominations = true;
                Some(plan)
            }
            Step::Interjection { next } => {
                self.step = Step::Roster { round: 0, index: next };
                Some(TurnPlan::new(self.phase, Seat::Moderator, Cue::ModeratorRedirect))
            }
            Step::Roster { .. } => {
                self.step = Step::Guests { index: 0 };
                self.free_debate(roster_len, guests)
            }
            Step::Guests { index } if index < guests => {
                self.step = Step::Guests { index: index + 1 };
                Some(TurnPlan::new(self.phase, Seat::Guest(index), Cue::GuestContribution))
            }
            _ => None,
        }
    }

    fn closing(&mut self, roster_len: usize, guests: usize) -> Option<TurnPlan> {
        match self.step {
            Step::Start => {
                self.step = Step::Roster { round: 0, index: 0 };
                Some(TurnPlan::new(self.phase, Seat::Moderator, Cue::ModeratorSummary))
            }
            Step::Roster { index, .. } if index < roster_len => {
                self.step = Step::Roster { round: 0, index: index + 1 };
                Some(TurnPlan::new(self.phase, Seat::Original(index), Cue::ClosingStatement))
            }
            Step::Roster { .. } => {
                self.step = Step::Guests { index: 0 };
                self.closing(roster_len, guests)
            }
            Step::Guests { index } if index < guests => {
                self.step = Step::Guests { index: index + 1 };
                Some(TurnPlan::new(self.phase, Seat::Guest(index), Cue::GuestClosing))
            }
            Step::Guests { .. } => {
                self.step = Step::Farewell;
                Some(TurnPlan::new(self.phase, Seat::Moderator, Cue::ModeratorFarewell))
            }
            _ => None,
        }
    }
}

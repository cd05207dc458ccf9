use quiz_types::{
    GameResult, Phase, Question, Room, RoomCode, RoomStatus, ServerEvent, UserId,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{PlayerPatch, RoomStore, Standings};

/// Value the pre-game countdown starts from.
pub const COUNTDOWN_START: u32 = 3;

/// Period of both the countdown and the per-question clock.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Countdown,
    QuestionClock,
}

/// Names the one timer that should currently be running.
///
/// The epoch changes on every phase change and every delivered question; a
/// tick carrying an older epoch is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub kind: TimerKind,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Kicked,
    RoomDeleted,
}

/// What applying an inbound event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Ignored,
    Updated,
    /// The user must leave the room view; the session has already been reset.
    Exit { reason: ExitReason, message: String },
}

/// Answer the user picked, to be sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub room_code: RoomCode,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestionState<'a> {
    /// Not in the playing phase.
    Idle,
    /// Playing, but no question has arrived yet (e.g. reload mid-game).
    Loading,
    Ready(&'a Question),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMark {
    Neutral,
    Selected,
    Correct,
    Incorrect,
}

/// Cloneable view of a [`RoomSession`] for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub room: Option<Room>,
    pub phase: Phase,
    pub countdown: u32,
    pub question: Option<Question>,
    pub time_remaining: u32,
    pub has_answered: bool,
    pub selected_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub show_correct_answer: bool,
    pub answer_marks: Vec<AnswerMark>,
    pub results: Option<Vec<GameResult>>,
}

impl SessionSnapshot {
    pub fn winner(&self) -> Option<&GameResult> {
        self.results.as_deref().and_then(Standings::winner)
    }
}

/// Client-side state machine of one room view.
///
/// Phases run `waiting -> countdown -> playing -> results`, driven by server
/// events and by ticks of the single timer named in [`RoomSession::timer_request`].
#[derive(Debug)]
pub struct RoomSession {
    room_code: RoomCode,
    user_id: UserId,
    store: RoomStore,
    phase: Phase,
    countdown: u32,
    question: Option<Question>,
    time_remaining: u32,
    has_answered: bool,
    selected_answer: Option<String>,
    correct_answer: Option<String>,
    show_correct_answer: bool,
    results: Option<Vec<GameResult>>,
    epoch: u64,
}

impl RoomSession {
    pub fn new(room_code: impl Into<RoomCode>, user_id: impl Into<UserId>) -> Self {
        Self {
            room_code: room_code.into(),
            user_id: user_id.into(),
            store: RoomStore::new(),
            phase: Phase::Waiting,
            countdown: COUNTDOWN_START,
            question: None,
            time_remaining: 0,
            has_answered: false,
            selected_answer: None,
            correct_answer: None,
            show_correct_answer: false,
            results: None,
            epoch: 0,
        }
    }

    /// Install a fetched room snapshot and enter the phase its status implies.
    ///
    /// A `waiting` room never moves the phase backwards: a `game:started` push
    /// may already have been applied before the fetch resolved.
    pub fn load_room(&mut self, room: Room) {
        let status = room.status;
        self.store.replace(room);

        match status {
            RoomStatus::Waiting => {}
            RoomStatus::Playing => {
                if self.phase == Phase::Waiting {
                    info!(
                        "Room {} already playing; entering playing without countdown",
                        self.room_code
                    );
                    self.set_phase(Phase::Playing);
                }
            }
            RoomStatus::Finished => {
                if self.phase != Phase::Results {
                    info!("Room {} already finished", self.room_code);
                    self.question = None;
                    self.set_phase(Phase::Results);
                }
            }
        }
    }

    pub fn apply(&mut self, event: &ServerEvent) -> Effect {
        match event {
            ServerEvent::RoomUpdated(room) => {
                self.store.replace(room.clone());
                Effect::Updated
            }
            ServerEvent::GameStarted => self.start_countdown(),
            ServerEvent::Question(question) => {
                self.deliver_question(question.clone());
                Effect::Updated
            }
            ServerEvent::AnswerReveal(reveal) => {
                if self.phase != Phase::Playing {
                    debug!("Answer reveal ignored in phase {}", self.phase);
                    return Effect::Ignored;
                }
                self.correct_answer = Some(reveal.correct_answer.clone());
                self.show_correct_answer = true;
                Effect::Updated
            }
            ServerEvent::Scores(scores) => {
                if self.store.merge_scores(scores) > 0 {
                    Effect::Updated
                } else {
                    Effect::Ignored
                }
            }
            ServerEvent::GameEnded(ended) => {
                info!(
                    "Game ended in room {} with {} results",
                    self.room_code,
                    ended.results.len()
                );
                self.results = Some(Standings::normalize(ended.results.clone()));
                self.question = None;
                self.set_phase(Phase::Results);
                Effect::Updated
            }
            ServerEvent::PlayerAnswered(answered) => {
                if self
                    .store
                    .update_player(&answered.user_id, &PlayerPatch::answered())
                {
                    Effect::Updated
                } else {
                    Effect::Ignored
                }
            }
            ServerEvent::Kicked(notice) => self.exit(ExitReason::Kicked, &notice.message),
            ServerEvent::RoomDeleted(notice) => {
                self.exit(ExitReason::RoomDeleted, &notice.message)
            }
            ServerEvent::AuthSuccess | ServerEvent::AuthError(_) | ServerEvent::NotificationNew(_) => {
                Effect::Ignored
            }
        }
    }

    /// Advance the running timer by one second. Returns whether anything changed.
    pub fn tick(&mut self, ticket: TimerTicket) -> bool {
        if ticket.epoch != self.epoch {
            debug!(
                "Stale {:?} tick (epoch {} != {})",
                ticket.kind, ticket.epoch, self.epoch
            );
            return false;
        }

        match ticket.kind {
            TimerKind::Countdown if self.phase == Phase::Countdown && self.countdown > 0 => {
                self.countdown -= 1;
                true
            }
            TimerKind::QuestionClock if self.question_clock_running() => {
                self.time_remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// The timer that should be running right now, if any.
    pub fn timer_request(&self) -> Option<TimerTicket> {
        let kind = match self.phase {
            Phase::Countdown if self.countdown > 0 => TimerKind::Countdown,
            Phase::Playing if self.question_clock_running() => TimerKind::QuestionClock,
            _ => return None,
        };
        Some(TimerTicket {
            kind,
            epoch: self.epoch,
        })
    }

    /// Record the user's choice. A no-op once answered or after the reveal.
    pub fn select_answer(&mut self, answer: &str) -> Option<AnswerSubmission> {
        if self.phase != Phase::Playing || self.has_answered || self.show_correct_answer {
            debug!("Answer '{}' ignored: selection closed", answer);
            return None;
        }
        let Some(question) = &self.question else {
            debug!("Answer '{}' ignored: no question yet", answer);
            return None;
        };
        if !question.answers.iter().any(|a| a == answer) {
            warn!(
                "Answer '{}' is not an option of question {}",
                answer, question.question_number
            );
            return None;
        }

        self.selected_answer = Some(answer.to_string());
        self.has_answered = true;

        Some(AnswerSubmission {
            room_code: self.room_code.clone(),
            answer: answer.to_string(),
        })
    }

    /// Select by 1-based option number, as typed by a player.
    pub fn select_option(&mut self, number: usize) -> Option<AnswerSubmission> {
        let answer = self
            .question
            .as_ref()
            .and_then(|q| number.checked_sub(1).and_then(|i| q.answers.get(i)))
            .cloned()?;
        self.select_answer(&answer)
    }

    /// Drop all state; used when leaving the room view.
    pub fn reset(&mut self) {
        self.store.clear();
        self.question = None;
        self.countdown = COUNTDOWN_START;
        self.time_remaining = 0;
        self.results = None;
        self.clear_answer_state();
        self.set_phase(Phase::Waiting);
        self.epoch += 1;
    }

    pub fn answer_marks(&self) -> Vec<AnswerMark> {
        let Some(question) = &self.question else {
            return Vec::new();
        };

        question
            .answers
            .iter()
            .map(|option| {
                let selected = self.selected_answer.as_deref() == Some(option.as_str());
                match (&self.correct_answer, self.show_correct_answer) {
                    (Some(correct), true) if correct == option => AnswerMark::Correct,
                    (Some(_), true) if selected => AnswerMark::Incorrect,
                    _ if selected => AnswerMark::Selected,
                    _ => AnswerMark::Neutral,
                }
            })
            .collect()
    }

    pub fn question_state(&self) -> QuestionState<'_> {
        match (self.phase, &self.question) {
            (Phase::Playing, Some(question)) => QuestionState::Ready(question),
            (Phase::Playing, None) => QuestionState::Loading,
            _ => QuestionState::Idle,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room: self.store.room().cloned(),
            phase: self.phase,
            countdown: self.countdown,
            question: self.question.clone(),
            time_remaining: self.time_remaining,
            has_answered: self.has_answered,
            selected_answer: self.selected_answer.clone(),
            correct_answer: self.correct_answer.clone(),
            show_correct_answer: self.show_correct_answer,
            answer_marks: self.answer_marks(),
            results: self.results.clone(),
        }
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn room(&self) -> Option<&Room> {
        self.store.room()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn has_answered(&self) -> bool {
        self.has_answered
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }

    pub fn is_revealed(&self) -> bool {
        self.show_correct_answer
    }

    pub fn results(&self) -> Option<&[GameResult]> {
        self.results.as_deref()
    }

    pub fn winner(&self) -> Option<&GameResult> {
        self.results().and_then(Standings::winner)
    }

    pub fn is_member(&self) -> bool {
        self.room().is_some_and(|r| r.has_player(&self.user_id))
    }

    pub fn is_host(&self) -> bool {
        self.room().is_some_and(|r| r.is_host(&self.user_id))
    }

    /// Host may start once every other player is ready.
    pub fn can_start(&self) -> bool {
        self.phase == Phase::Waiting
            && self
                .room()
                .is_some_and(|r| !r.players.is_empty() && r.all_players_ready())
    }

    fn start_countdown(&mut self) -> Effect {
        if !matches!(self.phase, Phase::Waiting | Phase::Countdown) {
            debug!("game:started ignored in phase {}", self.phase);
            return Effect::Ignored;
        }
        info!("Game starting in room {}", self.room_code);
        self.countdown = COUNTDOWN_START;
        self.results = None;
        self.set_phase(Phase::Countdown);
        // Restart the countdown even if we were already counting
        self.epoch += 1;
        Effect::Updated
    }

    fn deliver_question(&mut self, question: Question) {
        debug!(
            "Question {}/{} in room {}",
            question.question_number, question.total_questions, self.room_code
        );
        self.store.reset_answered();
        self.time_remaining = question.time_limit;
        self.question = Some(question);
        self.clear_answer_state();
        self.set_phase(Phase::Playing);
        self.epoch += 1;
    }

    fn exit(&mut self, reason: ExitReason, message: &str) -> Effect {
        info!("Leaving room {}: {:?} ({})", self.room_code, reason, message);
        self.reset();
        Effect::Exit {
            reason,
            message: message.to_string(),
        }
    }

    fn clear_answer_state(&mut self) {
        self.has_answered = false;
        self.selected_answer = None;
        self.correct_answer = None;
        self.show_correct_answer = false;
    }

    fn question_clock_running(&self) -> bool {
        self.phase == Phase::Playing
            && self.question.is_some()
            && self.time_remaining > 0
            && !self.has_answered
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            info!(
                "Room {} phase {} -> {}",
                self.room_code, self.phase, phase
            );
            self.phase = phase;
            self.epoch += 1;
        }
    }
}

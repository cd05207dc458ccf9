//! Controller for one open room: wires the event channel, the REST gateway
//! and the phase timer around a [`RoomSession`].

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;
use tracing::{error, info, warn};
use validator::ValidationErrors;

use crate::api::{ApiClient, ApiError};
use crate::channel::EventChannel;
use crate::timer::PhaseTimer;
use quiz_core::{
    Effect, ExitReason, Handler, HandlerId, RoomSession, SessionSnapshot, SettingsForm,
    TICK_INTERVAL, TimerTicket,
};
use quiz_types::{Room, ServerEvent, SettingsUpdate};

/// REST operations the room view needs.
#[async_trait]
pub trait RoomGateway: Send + Sync {
    async fn fetch_room(&self, code: &str) -> Result<Room, ApiError>;
    async fn join_room(&self, code: &str) -> Result<Room, ApiError>;
    async fn leave_room(&self, code: &str) -> Result<(), ApiError>;
    async fn toggle_ready(&self, code: &str) -> Result<(), ApiError>;
    async fn start_game(&self, code: &str) -> Result<(), ApiError>;
    async fn submit_answer(&self, code: &str, answer: &str) -> Result<(), ApiError>;
    async fn update_settings(&self, code: &str, update: &SettingsUpdate) -> Result<Room, ApiError>;
    async fn delete_room(&self, code: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl RoomGateway for ApiClient {
    async fn fetch_room(&self, code: &str) -> Result<Room, ApiError> {
        self.get_room(code).await
    }

    async fn join_room(&self, code: &str) -> Result<Room, ApiError> {
        ApiClient::join_room(self, code).await
    }

    async fn leave_room(&self, code: &str) -> Result<(), ApiError> {
        ApiClient::leave_room(self, code).await.map(|_| ())
    }

    async fn toggle_ready(&self, code: &str) -> Result<(), ApiError> {
        ApiClient::toggle_ready(self, code).await.map(|_| ())
    }

    async fn start_game(&self, code: &str) -> Result<(), ApiError> {
        ApiClient::start_game(self, code).await.map(|_| ())
    }

    async fn submit_answer(&self, code: &str, answer: &str) -> Result<(), ApiError> {
        ApiClient::submit_answer(self, code, answer).await.map(|_| ())
    }

    async fn update_settings(&self, code: &str, update: &SettingsUpdate) -> Result<Room, ApiError> {
        ApiClient::update_settings(self, code, update).await
    }

    async fn delete_room(&self, code: &str) -> Result<(), ApiError> {
        ApiClient::delete_room(self, code).await.map(|_| ())
    }
}

/// Channel operations the room view needs.
pub trait RoomChannel: Send + Sync {
    fn subscribe(&self, event: &str, handler: Handler<ServerEvent>) -> HandlerId;
    fn unsubscribe(&self, event: &str, id: HandlerId);
    fn join_room(&self, code: &str) -> bool;
    fn leave_room(&self) -> bool;
}

impl RoomChannel for EventChannel {
    fn subscribe(&self, event: &str, handler: Handler<ServerEvent>) -> HandlerId {
        self.on(event, move |e| handler(e))
    }

    fn unsubscribe(&self, event: &str, id: HandlerId) {
        self.off(event, Some(id));
    }

    fn join_room(&self, code: &str) -> bool {
        EventChannel::join_room(self, code)
    }

    fn leave_room(&self) -> bool {
        EventChannel::leave_room(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Only the host can do that")]
    NotHost,
    #[error("All players must be ready")]
    PlayersNotReady,
    #[error("{}", quiz_core::describe_errors(.0))]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] crate::session::SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomExit {
    pub reason: ExitReason,
    pub message: String,
}

/// What the front-end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomViewState {
    pub session: SessionSnapshot,
    pub is_host: bool,
    pub can_start: bool,
    /// Set when the server removed us; the view should be closed.
    pub exit: Option<RoomExit>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Inner {
    this: Weak<Inner>,
    session: Mutex<RoomSession>,
    timer: Mutex<Option<PhaseTimer>>,
    exit: Mutex<Option<RoomExit>>,
    state: watch::Sender<RoomViewState>,
}

impl Inner {
    fn new(session: RoomSession) -> Arc<Self> {
        let (state, _) = watch::channel(RoomViewState {
            session: session.snapshot(),
            is_host: false,
            can_start: false,
            exit: None,
        });

        Arc::new_cyclic(|this| Inner {
            this: this.clone(),
            session: Mutex::new(session),
            timer: Mutex::new(None),
            exit: Mutex::new(None),
            state,
        })
    }

    fn handle_event(&self, event: &ServerEvent) {
        let effect = lock(&self.session).apply(event);
        match effect {
            Effect::Ignored => {}
            Effect::Updated => {
                self.sync_timer();
                self.publish();
            }
            Effect::Exit { reason, message } => {
                warn!("Removed from room: {}", message);
                lock(&self.timer).take();
                *lock(&self.exit) = Some(RoomExit { reason, message });
                self.publish();
            }
        }
    }

    /// Returns whether the timer that produced `ticket` should keep running.
    fn on_tick(&self, ticket: TimerTicket) -> bool {
        let (changed, still_wanted) = {
            let mut session = lock(&self.session);
            let changed = session.tick(ticket);
            (changed, session.timer_request() == Some(ticket))
        };

        if changed {
            self.publish();
        }
        if !still_wanted {
            let mut timer = lock(&self.timer);
            if timer.as_ref().is_some_and(|t| t.ticket() == ticket) {
                timer.take();
            }
        }
        still_wanted
    }

    /// Make the running timer match what the session asks for.
    ///
    /// The request is read while the timer lock is held, so concurrent
    /// callers cannot install a timer from a stale request. Lock order is
    /// timer then session.
    fn sync_timer(&self) {
        let mut timer = lock(&self.timer);
        let request = lock(&self.session).timer_request();

        match request {
            Some(ticket) if timer.as_ref().is_some_and(|t| t.ticket() == ticket) => {}
            Some(ticket) => {
                let weak = self.this.clone();
                *timer = Some(PhaseTimer::start(ticket, TICK_INTERVAL, move |t| {
                    weak.upgrade().is_some_and(|inner| inner.on_tick(t))
                }));
            }
            None => {
                timer.take();
            }
        }
    }

    fn snapshot(&self) -> RoomViewState {
        let session = lock(&self.session);
        let is_host = session.is_host();
        RoomViewState {
            session: session.snapshot(),
            is_host,
            can_start: is_host && session.can_start(),
            exit: lock(&self.exit).clone(),
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.snapshot());
    }
}

pub struct RoomView {
    code: String,
    inner: Arc<Inner>,
    gateway: Arc<dyn RoomGateway>,
    channel: Arc<dyn RoomChannel>,
    subscriptions: Mutex<Vec<(&'static str, HandlerId)>>,
    closed: AtomicBool,
}

impl RoomView {
    /// Enter a room.
    ///
    /// Subscriptions are registered before the room is fetched so that no
    /// push (e.g. `game:started`) can slip in unobserved.
    pub async fn open(
        gateway: Arc<dyn RoomGateway>,
        channel: Arc<dyn RoomChannel>,
        code: &str,
        user_id: &str,
    ) -> Result<Self, RoomError> {
        let view = Self {
            code: code.to_string(),
            inner: Inner::new(RoomSession::new(code, user_id)),
            gateway,
            channel,
            subscriptions: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };

        view.subscribe_all();

        let room = match view.gateway.fetch_room(code).await {
            Ok(room) => room,
            Err(e) => {
                error!("Failed to load room {}: {}", code, e);
                view.unsubscribe_all();
                view.closed.store(true, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        lock(&view.inner.session).load_room(room);

        view.channel.join_room(code);

        let is_member = lock(&view.inner.session).is_member();
        if !is_member {
            info!("Not yet a member of {}; joining", code);
            let repaired = match view.gateway.join_room(code).await {
                Ok(_) => view.gateway.fetch_room(code).await,
                Err(e) => Err(e),
            };
            match repaired {
                Ok(room) => lock(&view.inner.session).load_room(room),
                Err(e) => {
                    error!("Failed to join room {}: {}", code, e);
                    view.close();
                    return Err(e.into());
                }
            }
        }

        info!("Opened room {}", code);
        view.inner.sync_timer();
        view.inner.publish();
        Ok(view)
    }

    fn subscribe_all(&self) {
        let mut subscriptions = lock(&self.subscriptions);
        for name in ServerEvent::ROOM_EVENTS {
            let weak = Arc::downgrade(&self.inner);
            let handler: Handler<ServerEvent> = Arc::new(move |event: &ServerEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_event(event);
                }
            });
            let id = self.channel.subscribe(name, handler);
            subscriptions.push((name, id));
        }
    }

    fn unsubscribe_all(&self) {
        for (name, id) in lock(&self.subscriptions).drain(..) {
            self.channel.unsubscribe(name, id);
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> RoomViewState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RoomViewState> {
        self.inner.state.subscribe()
    }

    /// Pick an answer. The submit call runs in the background; a failure is
    /// logged and not retried.
    pub fn select_answer(&self, answer: &str) -> bool {
        let submission = lock(&self.inner.session).select_answer(answer);
        self.dispatch_submission(submission)
    }

    /// Pick by 1-based option number.
    pub fn select_option(&self, number: usize) -> bool {
        let submission = lock(&self.inner.session).select_option(number);
        self.dispatch_submission(submission)
    }

    fn dispatch_submission(&self, submission: Option<quiz_core::AnswerSubmission>) -> bool {
        let Some(submission) = submission else {
            return false;
        };
        self.inner.sync_timer();
        self.inner.publish();

        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway
                .submit_answer(&submission.room_code, &submission.answer)
                .await
            {
                error!("Failed to submit answer: {}", e.user_message());
            }
        });
        true
    }

    pub fn can_start(&self) -> bool {
        self.state().can_start
    }

    pub async fn toggle_ready(&self) -> Result<(), RoomError> {
        self.gateway.toggle_ready(&self.code).await?;
        Ok(())
    }

    pub async fn start_game(&self) -> Result<(), RoomError> {
        let state = self.state();
        if !state.is_host {
            return Err(RoomError::NotHost);
        }
        if !state.can_start {
            return Err(RoomError::PlayersNotReady);
        }
        self.gateway.start_game(&self.code).await?;
        Ok(())
    }

    pub async fn update_settings(&self, form: SettingsForm) -> Result<(), RoomError> {
        if !self.state().is_host {
            return Err(RoomError::NotHost);
        }
        let update = form.into_request()?;
        let room = self.gateway.update_settings(&self.code, &update).await?;
        lock(&self.inner.session).load_room(room);
        self.inner.publish();
        Ok(())
    }

    pub async fn delete_room(&self) -> Result<(), RoomError> {
        if !self.state().is_host {
            return Err(RoomError::NotHost);
        }
        self.gateway.delete_room(&self.code).await?;
        self.close();
        Ok(())
    }

    /// Leave through the REST API, then close the view either way.
    pub async fn leave(&self) -> Result<(), RoomError> {
        let result = self.gateway.leave_room(&self.code).await;
        self.close();
        result.map_err(RoomError::from)
    }

    /// Tear down subscriptions and the timer, and leave the channel group.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.unsubscribe_all();
        lock(&self.inner.timer).take();
        self.channel.leave_room();
        lock(&self.inner.session).reset();
        info!("Closed room {}", self.code);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for RoomView {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_types::{Difficulty, Player, Question, RoomSettings, RoomStatus};
    use std::sync::Barrier;

    fn player(user_id: &str) -> Player {
        Player {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            avatar: None,
            score: 0,
            answers: Vec::new(),
            is_ready: true,
            is_connected: true,
            has_answered: false,
        }
    }

    fn room() -> Room {
        Room {
            id: "room-id-1".to_string(),
            room_code: "ABC123".to_string(),
            host_id: "alice".to_string(),
            players: vec![player("alice"), player("bob")],
            settings: RoomSettings {
                category: "general".to_string(),
                difficulty: Difficulty::Easy,
                number_of_questions: 10,
                time_per_question: 15,
            },
            status: RoomStatus::Waiting,
            current_question: None,
            is_public: true,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn question(number: u32) -> Question {
        Question {
            question_number: number,
            total_questions: 10,
            question: format!("Question {}?", number),
            answers: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            category: "general".to_string(),
            difficulty: "easy".to_string(),
            time_limit: 15,
        }
    }

    fn playing_inner() -> Arc<Inner> {
        let mut session = RoomSession::new("ABC123", "bob");
        session.load_room(room());
        session.apply(&ServerEvent::GameStarted);
        session.apply(&ServerEvent::Question(question(1)));
        let inner = Inner::new(session);
        inner.sync_timer();
        inner
    }

    fn running_ticket(inner: &Inner) -> Option<TimerTicket> {
        lock(&inner.timer).as_ref().map(|t| t.ticket())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_answer_racing_next_question_keeps_clock_in_sync() {
        for _ in 0..200 {
            let inner = playing_inner();
            let barrier = Arc::new(Barrier::new(2));

            let answering = {
                let (inner, barrier) = (inner.clone(), barrier.clone());
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    let submission = lock(&inner.session).select_option(1);
                    assert!(submission.is_some());
                    inner.sync_timer();
                })
            };
            let next_question = {
                let (inner, barrier) = (inner.clone(), barrier.clone());
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    inner.handle_event(&ServerEvent::Question(question(2)));
                })
            };
            answering.await.unwrap();
            next_question.await.unwrap();

            let requested = lock(&inner.session).timer_request();
            assert_eq!(running_ticket(&inner), requested);
        }
    }

    #[tokio::test]
    async fn test_exit_stops_the_timer() {
        let inner = playing_inner();
        assert!(running_ticket(&inner).is_some());

        inner.handle_event(&ServerEvent::Kicked(quiz_types::MessagePayload {
            message: "Removed".to_string(),
        }));

        assert!(running_ticket(&inner).is_none());
        assert_eq!(
            inner.state.borrow().exit.as_ref().map(|e| e.reason),
            Some(ExitReason::Kicked)
        );
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, TryStreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use warp::Filter;
use warp::Reply;
use warp::http::StatusCode;
use warp::hyper::body::Buf;
use warp::multipart::{FormData, Part};
use warp::reply::Response;

use quiz_client::{ApiError, RoomChannel, RoomGateway};
use quiz_core::{Handler, HandlerId, HandlerRegistry};
use quiz_types::{
    ChannelFrame, Difficulty, Notification, NotificationKind, Player, Question, Room,
    RoomSettings, RoomStatus, ServerEvent, SettingsUpdate, User, UserStats,
};

pub const ROOM_CODE: &str = "ABC123";
pub const HOST_ID: &str = "test-player-alice";
pub const GUEST_ID: &str = "test-player-bob";
pub const TEST_TOKEN: &str = "test-token";
pub const TEST_PASSWORD: &str = "Secret1";
pub const TEST_OTP: &str = "123456";

const CLOSE_SIGNAL: &str = "__close__";

// Fixtures

pub fn create_test_player(name: &str) -> Player {
    Player {
        user_id: format!("test-player-{}", name.to_lowercase()),
        username: name.to_string(),
        avatar: None,
        score: 0,
        answers: Vec::new(),
        is_ready: false,
        is_connected: true,
        has_answered: false,
    }
}

/// Room hosted by Alice; `guests` are added after her.
pub fn create_room(status: RoomStatus, guests: &[&str]) -> Room {
    let mut players = vec![create_test_player("Alice")];
    players.extend(guests.iter().map(|name| create_test_player(name)));
    Room {
        id: "room-id-1".to_string(),
        room_code: ROOM_CODE.to_string(),
        host_id: HOST_ID.to_string(),
        players,
        settings: RoomSettings {
            category: "general".to_string(),
            difficulty: Difficulty::Easy,
            number_of_questions: 10,
            time_per_question: 15,
        },
        status,
        current_question: None,
        is_public: true,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn create_question(number: u32, time_limit: u32) -> Question {
    Question {
        question_number: number,
        total_questions: 10,
        question: format!("Question {}?", number),
        answers: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        category: "general".to_string(),
        difficulty: "easy".to_string(),
        time_limit,
    }
}

pub fn create_test_user(name: &str) -> User {
    User {
        id: format!("test-player-{}", name.to_lowercase()),
        username: name.to_string(),
        email: format!("{}@test.com", name.to_lowercase()),
        avatar: String::new(),
        stats: UserStats::default(),
        is_verified: Some(true),
        created_at: None,
    }
}

pub fn create_notification(id: &str, title: &str) -> Notification {
    Notification {
        id: id.to_string(),
        user_id: HOST_ID.to_string(),
        kind: NotificationKind::GameInvite,
        title: title.to_string(),
        message: format!("{} message", title),
        is_read: false,
        data: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

// In-process backend

#[derive(Default)]
pub struct BackendState {
    pub rooms: HashMap<String, Room>,
    pub notifications: Vec<Notification>,
    /// Frames received from clients, across all connections.
    pub frames: Vec<ChannelFrame>,
    pub answers: Vec<(String, String)>,
    pub auth_headers: Vec<Option<String>>,
    pub connections: usize,
    pub uploads: Vec<Upload>,
    /// Bodies of account calls (verify, password, profile), in order.
    pub account_calls: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// REST and event-channel server on an ephemeral port.
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<BackendState>>,
    push: broadcast::Sender<String>,
}

fn ok(data: Value) -> Response {
    warp::reply::json(&json!({ "success": true, "data": data })).into_response()
}

fn ack(message: &str) -> Response {
    warp::reply::json(&json!({ "success": true, "message": message })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(
        warp::reply::json(&json!({ "success": false, "message": message })),
        status,
    )
    .into_response()
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(BackendState::default()));
        let (push, _) = broadcast::channel(64);

        let with_state = {
            let state = state.clone();
            warp::any().map(move || state.clone())
        };
        let with_push = {
            let push = push.clone();
            warp::any().map(move || push.clone())
        };

        let login = warp::path!("api" / "auth" / "login")
            .and(warp::post())
            .and(warp::body::json())
            .map(|body: Value| {
                if body["password"] != TEST_PASSWORD {
                    return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
                }
                ok(json!({ "user": create_test_user("Alice"), "token": TEST_TOKEN }))
            });

        let me = warp::path!("api" / "auth" / "me")
            .and(warp::get())
            .and(warp::header::optional::<String>("authorization"))
            .map(|auth: Option<String>| {
                if auth.as_deref() != Some(format!("Bearer {}", TEST_TOKEN).as_str()) {
                    return fail(StatusCode::UNAUTHORIZED, "Not authorized, no token");
                }
                ok(json!({ "user": create_test_user("Alice") }))
            });

        let verify_email = warp::path!("api" / "auth" / "verify-email")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_state.clone())
            .map(|body: Value, state: Arc<Mutex<BackendState>>| {
                state
                    .lock()
                    .unwrap()
                    .account_calls
                    .push(("verify-email".to_string(), body.clone()));
                if body["otp"] != TEST_OTP {
                    return fail(StatusCode::BAD_REQUEST, "Invalid or expired verification code");
                }
                ack("Email verified successfully")
            });

        let change_password = warp::path!("api" / "auth" / "password")
            .and(warp::put())
            .and(warp::body::json())
            .and(with_state.clone())
            .map(|body: Value, state: Arc<Mutex<BackendState>>| {
                state
                    .lock()
                    .unwrap()
                    .account_calls
                    .push(("password".to_string(), body.clone()));
                if body["currentPassword"] != TEST_PASSWORD {
                    return fail(StatusCode::BAD_REQUEST, "Current password is incorrect");
                }
                ack("Password updated successfully")
            });

        let update_profile = warp::path!("api" / "auth" / "profile")
            .and(warp::put())
            .and(warp::body::json())
            .and(with_state.clone())
            .map(|body: Value, state: Arc<Mutex<BackendState>>| {
                state
                    .lock()
                    .unwrap()
                    .account_calls
                    .push(("profile".to_string(), body.clone()));
                let mut user = create_test_user("Alice");
                if let Some(username) = body["username"].as_str() {
                    user.username = username.to_string();
                }
                ok(json!({ "user": user }))
            });

        let upload_avatar = warp::path!("api" / "auth" / "avatar")
            .and(warp::post())
            .and(warp::multipart::form())
            .and(with_state.clone())
            .and_then(
                |form: FormData, state: Arc<Mutex<BackendState>>| async move {
                    let parts: Vec<Part> = form.try_collect().await.map_err(|_| warp::reject())?;
                    let mut response = fail(StatusCode::BAD_REQUEST, "No file uploaded");
                    for mut part in parts {
                        let field = part.name().to_string();
                        let file_name = part.filename().unwrap_or_default().to_string();
                        let content_type = part.content_type().unwrap_or_default().to_string();
                        let mut bytes = Vec::new();
                        while let Some(chunk) = part.data().await {
                            let chunk = chunk.map_err(|_| warp::reject())?;
                            bytes.extend_from_slice(chunk.chunk());
                        }

                        if field == "avatar" {
                            let path = format!("/uploads/avatars/{}", file_name);
                            let mut user = create_test_user("Alice");
                            user.avatar = path.clone();
                            response = ok(json!({ "avatar": path, "user": user }));
                        }
                        state.lock().unwrap().uploads.push(Upload {
                            field,
                            file_name,
                            content_type,
                            bytes,
                        });
                    }
                    Ok::<_, warp::Rejection>(response)
                },
            );

        let list_rooms = warp::path!("api" / "rooms")
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .and(with_state.clone())
            .map(
                |query: HashMap<String, String>, state: Arc<Mutex<BackendState>>| {
                    let state = state.lock().unwrap();
                    let rooms: Vec<&Room> = state
                        .rooms
                        .values()
                        .filter(|room| {
                            query.get("status").is_none_or(|status| {
                                serde_json::to_value(room.status).unwrap() == *status
                            })
                        })
                        .collect();
                    ok(json!({ "rooms": rooms }))
                },
            );

        let get_room = warp::path!("api" / "rooms" / String)
            .and(warp::get())
            .and(warp::header::optional::<String>("authorization"))
            .and(with_state.clone())
            .map(
                |code: String, auth: Option<String>, state: Arc<Mutex<BackendState>>| {
                    let mut state = state.lock().unwrap();
                    state.auth_headers.push(auth);
                    match state.rooms.get(&code) {
                        Some(room) => ok(json!({ "room": room })),
                        None => fail(StatusCode::NOT_FOUND, "Room not found"),
                    }
                },
            );

        let join_room = warp::path!("api" / "rooms" / String / "join")
            .and(warp::post())
            .and(with_state.clone())
            .map(|code: String, state: Arc<Mutex<BackendState>>| {
                let mut state = state.lock().unwrap();
                match state.rooms.get_mut(&code) {
                    Some(room) => {
                        if !room.has_player(GUEST_ID) {
                            room.players.push(create_test_player("Bob"));
                        }
                        ok(json!({ "room": room }))
                    }
                    None => fail(StatusCode::NOT_FOUND, "Room not found"),
                }
            });

        let leave_room = warp::path!("api" / "rooms" / String / "leave")
            .and(warp::post())
            .map(|_code: String| ack("Left room"));

        let submit_answer = warp::path!("api" / "games" / String / "answer")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_state.clone())
            .map(
                |code: String, body: Value, state: Arc<Mutex<BackendState>>| {
                    let answer = body["answer"].as_str().unwrap_or_default().to_string();
                    state.lock().unwrap().answers.push((code, answer));
                    ack("Answer submitted")
                },
            );

        // Fails without a message body
        let leaderboard = warp::path!("api" / "games" / "leaderboard")
            .and(warp::get())
            .map(|| {
                warp::reply::with_status("boom", StatusCode::INTERNAL_SERVER_ERROR).into_response()
            });

        let notifications = warp::path!("api" / "notifications")
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .and(with_state.clone())
            .map(
                |query: HashMap<String, String>, state: Arc<Mutex<BackendState>>| {
                    let state = state.lock().unwrap();
                    let unread_only = query.get("unreadOnly").is_some_and(|v| v == "true");
                    let items: Vec<&Notification> = state
                        .notifications
                        .iter()
                        .filter(|n| !unread_only || !n.is_read)
                        .collect();
                    let unread = state.notifications.iter().filter(|n| !n.is_read).count();
                    ok(json!({ "notifications": items, "unreadCount": unread }))
                },
            );

        let socket = warp::path("ws")
            .and(warp::ws())
            .and(with_state)
            .and(with_push)
            .map(
                |ws: warp::ws::Ws,
                 state: Arc<Mutex<BackendState>>,
                 push: broadcast::Sender<String>| {
                    ws.on_upgrade(move |socket| handle_socket(socket, state, push))
                },
            );

        let routes = login
            .or(me)
            .or(verify_email)
            .or(change_password)
            .or(update_profile)
            .or(upload_avatar)
            .or(list_rooms)
            .or(get_room)
            .or(join_room)
            .or(leave_room)
            .or(submit_answer)
            .or(leaderboard)
            .or(notifications)
            .or(socket);

        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        Self { addr, state, push }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn socket_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn insert_room(&self, room: Room) {
        self.state
            .lock()
            .unwrap()
            .rooms
            .insert(room.room_code.clone(), room);
    }

    pub fn add_notification(&self, notification: Notification) {
        self.state.lock().unwrap().notifications.push(notification);
    }

    /// Send an event to every connected client.
    pub fn push(&self, event: &ServerEvent) {
        let text = event.to_frame().unwrap().to_text().unwrap();
        self.push_raw(&text);
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.push.send(text.to_string());
    }

    /// Close every open socket from the server side.
    pub fn drop_connections(&self) {
        self.push_raw(CLOSE_SIGNAL);
    }

    pub fn frames(&self) -> Vec<ChannelFrame> {
        self.state.lock().unwrap().frames.clone()
    }

    pub fn frame_names(&self) -> Vec<String> {
        self.frames().into_iter().map(|f| f.event).collect()
    }

    pub fn count_frames(&self, event: &str) -> usize {
        self.frames().iter().filter(|f| f.event == event).count()
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    pub fn answers(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().answers.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn account_calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().account_calls.clone()
    }
}

async fn handle_socket(
    socket: warp::ws::WebSocket,
    state: Arc<Mutex<BackendState>>,
    push: broadcast::Sender<String>,
) {
    let (mut sink, mut stream) = socket.split();
    let mut outbound = push.subscribe();
    state.lock().unwrap().connections += 1;

    let writer = tokio::spawn(async move {
        while let Ok(text) = outbound.recv().await {
            if text == CLOSE_SIGNAL {
                let _ = sink.close().await;
                break;
            }
            if sink.send(warp::ws::Message::text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        if message.is_close() {
            break;
        }
        if let Ok(text) = message.to_str() {
            if let Ok(frame) = ChannelFrame::from_text(text) {
                state.lock().unwrap().frames.push(frame);
            }
        }
    }
    writer.abort();
}

// In-memory collaborators for the room view

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct FakeGateway {
    pub log: CallLog,
    pub room: Mutex<Option<Room>>,
    pub answers: Mutex<Vec<(String, String)>>,
    /// Runs once, while the first fetch is in flight.
    pub during_fetch: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FakeGateway {
    pub fn new(log: CallLog, room: Option<Room>) -> Self {
        Self {
            log,
            room: Mutex::new(room),
            answers: Mutex::new(Vec::new()),
            during_fetch: Mutex::new(None),
        }
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl RoomGateway for FakeGateway {
    async fn fetch_room(&self, code: &str) -> Result<Room, ApiError> {
        self.record("fetch");
        let hook = self.during_fetch.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.room
            .lock()
            .unwrap()
            .clone()
            .filter(|room| room.room_code == code)
            .ok_or(ApiError::Server {
                status: 404,
                message: "Room not found".to_string(),
            })
    }

    async fn join_room(&self, code: &str) -> Result<Room, ApiError> {
        self.record("rest-join");
        let mut room = self.room.lock().unwrap();
        match room.as_mut() {
            Some(room) if room.room_code == code => {
                room.players.push(create_test_player("Bob"));
                Ok(room.clone())
            }
            _ => Err(ApiError::Server {
                status: 404,
                message: "Room not found".to_string(),
            }),
        }
    }

    async fn leave_room(&self, _code: &str) -> Result<(), ApiError> {
        self.record("rest-leave");
        Ok(())
    }

    async fn toggle_ready(&self, _code: &str) -> Result<(), ApiError> {
        self.record("ready");
        Ok(())
    }

    async fn start_game(&self, _code: &str) -> Result<(), ApiError> {
        self.record("start");
        Ok(())
    }

    async fn submit_answer(&self, code: &str, answer: &str) -> Result<(), ApiError> {
        self.record("answer");
        self.answers
            .lock()
            .unwrap()
            .push((code.to_string(), answer.to_string()));
        Ok(())
    }

    async fn update_settings(&self, _code: &str, update: &SettingsUpdate) -> Result<Room, ApiError> {
        self.record("settings");
        let mut guard = self.room.lock().unwrap();
        let room = guard.as_mut().ok_or(ApiError::MissingData)?;
        if let Some(seconds) = update.time_per_question {
            room.settings.time_per_question = seconds;
        }
        Ok(room.clone())
    }

    async fn delete_room(&self, _code: &str) -> Result<(), ApiError> {
        self.record("delete");
        Ok(())
    }
}

pub struct FakeChannel {
    pub log: CallLog,
    handlers: Mutex<HandlerRegistry<ServerEvent>>,
}

impl FakeChannel {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            handlers: Mutex::new(HandlerRegistry::new()),
        }
    }

    /// Deliver an event as if the server had pushed it.
    pub fn deliver(&self, event: ServerEvent) {
        let handlers = self.handlers.lock().unwrap().handlers_for(event.name());
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn total_handlers(&self) -> usize {
        let registry = self.handlers.lock().unwrap();
        ServerEvent::ROOM_EVENTS
            .iter()
            .map(|name| registry.handler_count(name))
            .sum()
    }
}

impl RoomChannel for FakeChannel {
    fn subscribe(&self, event: &str, handler: Handler<ServerEvent>) -> HandlerId {
        self.log.lock().unwrap().push(format!("subscribe:{}", event));
        self.handlers
            .lock()
            .unwrap()
            .on(event, move |e: &ServerEvent| handler(e))
    }

    fn unsubscribe(&self, event: &str, id: HandlerId) {
        self.log.lock().unwrap().push(format!("unsubscribe:{}", event));
        self.handlers.lock().unwrap().off(event, Some(id));
    }

    fn join_room(&self, code: &str) -> bool {
        self.log.lock().unwrap().push(format!("channel-join:{}", code));
        true
    }

    fn leave_room(&self) -> bool {
        self.log.lock().unwrap().push("channel-leave".to_string());
        true
    }
}

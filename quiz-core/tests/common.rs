#![allow(dead_code)]

use quiz_core::RoomSession;
use quiz_types::{
    Difficulty, GameEndedPayload, GameResult, Player, Question, Room, RoomSettings, RoomStatus,
    ServerEvent,
};

pub const ROOM_CODE: &str = "ABC123";
pub const HOST_ID: &str = "test-player-alice";
pub const GUEST_ID: &str = "test-player-bob";

/// Creates a test player with specified attributes
pub fn create_test_player(name: &str) -> Player {
    create_test_player_with_score(name, 0)
}

/// Creates a test player with a starting score
pub fn create_test_player_with_score(name: &str, score: i32) -> Player {
    Player {
        user_id: format!("test-player-{}", name.to_lowercase()),
        username: name.to_string(),
        avatar: None,
        score,
        answers: Vec::new(),
        is_ready: false,
        is_connected: true,
        has_answered: false,
    }
}

/// Creates a room hosted by Alice with Alice and Bob in it
pub fn create_standard_room(status: RoomStatus) -> Room {
    Room {
        id: "room-id-1".to_string(),
        room_code: ROOM_CODE.to_string(),
        host_id: HOST_ID.to_string(),
        players: vec![create_test_player("Alice"), create_test_player("Bob")],
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

pub fn create_result(user_id: &str, score: i32, rank: u32) -> GameResult {
    GameResult {
        user_id: user_id.to_string(),
        username: user_id.to_string(),
        final_score: score,
        accuracy: 75.0,
        average_time_to_answer: 3.5,
        fastest_answer: 1.2,
        rank,
    }
}

pub fn game_ended(results: Vec<GameResult>) -> ServerEvent {
    ServerEvent::GameEnded(GameEndedPayload { results })
}

/// Session for the guest, with the standard waiting room loaded
pub fn create_waiting_session() -> RoomSession {
    let mut session = RoomSession::new(ROOM_CODE, GUEST_ID);
    session.load_room(create_standard_room(RoomStatus::Waiting));
    session
}

/// Session already sitting on the given question
pub fn create_playing_session(time_limit: u32) -> RoomSession {
    let mut session = create_waiting_session();
    session.apply(&ServerEvent::GameStarted);
    session.apply(&ServerEvent::Question(create_question(1, time_limit)));
    session
}

/// Tick whatever timer the session currently asks for, `n` times
pub fn run_ticks(session: &mut RoomSession, n: usize) -> usize {
    let mut applied = 0;
    for _ in 0..n {
        match session.timer_request() {
            Some(ticket) if session.tick(ticket) => applied += 1,
            _ => break,
        }
    }
    applied
}

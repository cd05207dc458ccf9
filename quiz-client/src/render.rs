//! Plain-text rendering of the room view for the terminal front-end.

use std::fmt::Write;

use crate::room_view::RoomViewState;
use quiz_core::AnswerMark;
use quiz_types::{GameResult, Phase, Room};

/// Countdown value as shown to players; zero reads "GO".
pub fn countdown_label(countdown: u32) -> String {
    if countdown == 0 {
        "GO".to_string()
    } else {
        countdown.to_string()
    }
}

fn mark_prefix(mark: AnswerMark) -> &'static str {
    match mark {
        AnswerMark::Neutral => "  ",
        AnswerMark::Selected => "> ",
        AnswerMark::Correct => "+ ",
        AnswerMark::Incorrect => "x ",
    }
}

pub fn render_lobby(room: &Room, user_id: &str) -> String {
    let mut out = String::new();
    let settings = &room.settings;
    let _ = writeln!(
        out,
        "Room {} | {} | {} | {} questions x {}s (~{} min)",
        room.room_code,
        settings.category,
        settings.difficulty,
        settings.number_of_questions,
        settings.time_per_question,
        settings.estimated_minutes()
    );
    let _ = writeln!(out, "Players ({}/10):", room.players.len());
    for player in &room.players {
        let mut tags = Vec::new();
        if room.is_host(&player.user_id) {
            tags.push("host");
        } else if player.is_ready {
            tags.push("ready");
        }
        if player.user_id == user_id {
            tags.push("you");
        }
        let _ = writeln!(
            out,
            "  {:<20} {:>6}  {}",
            player.username,
            player.score,
            tags.join(", ")
        );
    }
    out
}

pub fn render_results(results: &[GameResult], user_id: &str) -> String {
    let mut out = String::new();
    if results.is_empty() {
        out.push_str("No results available.\n");
        return out;
    }
    for result in results {
        let marker = if result.user_id == user_id { "*" } else { " " };
        let _ = writeln!(
            out,
            "{}{:>2}. {:<20} {:>6} pts  {:>5.1}% accuracy",
            marker, result.rank, result.username, result.final_score, result.accuracy
        );
    }
    out
}

/// Render the whole view for the current phase.
pub fn render(state: &RoomViewState, user_id: &str) -> String {
    let session = &state.session;

    if let Some(exit) = &state.exit {
        return format!("{}\n", exit.message);
    }

    match session.phase {
        Phase::Waiting => match &session.room {
            Some(room) => {
                let mut out = render_lobby(room, user_id);
                if state.is_host {
                    out.push_str(if state.can_start {
                        "Type 'start' to begin.\n"
                    } else {
                        "Waiting for players to get ready.\n"
                    });
                } else {
                    out.push_str("Type 'ready' to toggle ready.\n");
                }
                out
            }
            None => "Loading room...\n".to_string(),
        },
        Phase::Countdown => format!("Game starting: {}\n", countdown_label(session.countdown)),
        Phase::Playing => {
            let Some(question) = &session.question else {
                return "Waiting for the next question...\n".to_string();
            };
            let mut out = String::new();
            let _ = writeln!(
                out,
                "Question {}/{} [{}s left]",
                question.question_number, question.total_questions, session.time_remaining
            );
            let _ = writeln!(out, "{}", question.question);
            for (i, (answer, mark)) in question
                .answers
                .iter()
                .zip(session.answer_marks.iter())
                .enumerate()
            {
                let _ = writeln!(out, "{}{}. {}", mark_prefix(*mark), i + 1, answer);
            }
            if session.has_answered && !session.show_correct_answer {
                out.push_str("Answer submitted.\n");
            }
            out
        }
        Phase::Results => {
            let mut out = String::from("Game over!\n");
            if let Some(winner) = session.winner() {
                let _ = writeln!(out, "Winner: {} ({} pts)", winner.username, winner.final_score);
            }
            out.push_str(&render_results(
                session.results.as_deref().unwrap_or_default(),
                user_id,
            ));
            out
        }
    }
}

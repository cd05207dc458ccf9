use quiz_types::{Player, PlayerScore, Room};
use std::collections::HashSet;
use tracing::warn;

/// Partial update of a [`Player`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPatch {
    pub score: Option<i32>,
    pub is_ready: Option<bool>,
    pub is_connected: Option<bool>,
    pub has_answered: Option<bool>,
}

impl PlayerPatch {
    pub fn score(score: i32) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }

    pub fn answered() -> Self {
        Self {
            has_answered: Some(true),
            ..Default::default()
        }
    }

    fn apply_to(&self, player: &mut Player) {
        if let Some(score) = self.score {
            player.score = score;
        }
        if let Some(ready) = self.is_ready {
            player.is_ready = ready;
        }
        if let Some(connected) = self.is_connected {
            player.is_connected = connected;
        }
        if let Some(answered) = self.has_answered {
            player.has_answered = answered;
        }
    }
}

/// Latest known snapshot of the room the user is viewing.
#[derive(Debug, Clone, Default)]
pub struct RoomStore {
    room: Option<Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Replace the whole snapshot. Duplicate user ids keep their first entry.
    pub fn replace(&mut self, mut room: Room) {
        let mut seen = HashSet::new();
        let before = room.players.len();
        room.players.retain(|p| seen.insert(p.user_id.clone()));
        if room.players.len() != before {
            warn!(
                "Room {} snapshot contained {} duplicate player entries; dropped",
                room.room_code,
                before - room.players.len()
            );
        }
        self.room = Some(room);
    }

    /// Merge `patch` into the player with `user_id`.
    ///
    /// Returns `false` (and logs) when there is no room or no such player; the
    /// snapshot is left untouched in that case.
    pub fn update_player(&mut self, user_id: &str, patch: &PlayerPatch) -> bool {
        let Some(room) = self.room.as_mut() else {
            warn!("Player update for {} with no room loaded", user_id);
            return false;
        };

        match room.players.iter_mut().find(|p| p.user_id == user_id) {
            Some(player) => {
                patch.apply_to(player);
                true
            }
            None => {
                warn!(
                    "Player update for {} ignored: not a member of room {}",
                    user_id, room.room_code
                );
                false
            }
        }
    }

    /// Apply a batch of score updates, last write wins per player.
    pub fn merge_scores(&mut self, scores: &[PlayerScore]) -> usize {
        scores
            .iter()
            .filter(|s| self.update_player(&s.user_id, &PlayerPatch::score(s.score)))
            .count()
    }

    pub fn reset_answered(&mut self) {
        if let Some(room) = self.room.as_mut() {
            for player in &mut room.players {
                player.has_answered = false;
            }
        }
    }

    pub fn clear(&mut self) {
        self.room = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_types::{Difficulty, RoomSettings, RoomStatus};

    fn player(id: &str, score: i32) -> Player {
        Player {
            user_id: id.to_string(),
            username: format!("user-{}", id),
            avatar: None,
            score,
            answers: Vec::new(),
            is_ready: false,
            is_connected: true,
            has_answered: false,
        }
    }

    fn room(players: Vec<Player>) -> Room {
        Room {
            id: "room-1".to_string(),
            room_code: "ABC123".to_string(),
            host_id: "u1".to_string(),
            players,
            settings: RoomSettings {
                category: "general".to_string(),
                difficulty: Difficulty::Easy,
                number_of_questions: 10,
                time_per_question: 15,
            },
            status: RoomStatus::Waiting,
            current_question: None,
            is_public: true,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_merge_score_changes_only_target_player() {
        let mut store = RoomStore::new();
        store.replace(room(vec![player("u1", 10), player("u2", 20), player("u3", 30)]));
        let before = store.room().unwrap().clone();

        assert!(store.update_player("u2", &PlayerPatch::score(99)));

        let after = store.room().unwrap();
        assert_eq!(after.players[1].score, 99);

        // Everything else is structurally equal
        let mut expected = before.clone();
        expected.players[1].score = 99;
        assert_eq!(after, &expected);
    }

    #[test]
    fn test_update_missing_player_is_noop() {
        let mut store = RoomStore::new();
        store.replace(room(vec![player("u1", 10)]));
        let before = store.room().unwrap().clone();

        assert!(!store.update_player("ghost", &PlayerPatch::score(5)));
        assert_eq!(store.room().unwrap(), &before);
    }

    #[test]
    fn test_update_without_room() {
        let mut store = RoomStore::new();
        assert!(!store.update_player("u1", &PlayerPatch::answered()));
        assert!(store.room().is_none());
    }

    #[test]
    fn test_replace_drops_duplicate_players() {
        let mut store = RoomStore::new();
        store.replace(room(vec![player("u1", 10), player("u2", 0), player("u1", 50)]));

        let room = store.room().unwrap();
        assert_eq!(room.players.len(), 2);
        // First entry wins
        assert_eq!(room.player("u1").unwrap().score, 10);
    }

    #[test]
    fn test_merge_scores_counts_applied_updates() {
        let mut store = RoomStore::new();
        store.replace(room(vec![player("u1", 0), player("u2", 0)]));

        let applied = store.merge_scores(&[
            PlayerScore {
                user_id: "u1".to_string(),
                score: 100,
            },
            PlayerScore {
                user_id: "nobody".to_string(),
                score: 1,
            },
            PlayerScore {
                user_id: "u1".to_string(),
                score: 150,
            },
        ]);

        assert_eq!(applied, 2);
        assert_eq!(store.room().unwrap().player("u1").unwrap().score, 150);
        assert_eq!(store.room().unwrap().player("u2").unwrap().score, 0);
    }

    #[test]
    fn test_reset_answered_and_clear() {
        let mut store = RoomStore::new();
        store.replace(room(vec![player("u1", 0), player("u2", 0)]));
        store.update_player("u1", &PlayerPatch::answered());
        assert!(store.room().unwrap().player("u1").unwrap().has_answered);

        store.reset_answered();
        assert!(store.room().unwrap().players.iter().all(|p| !p.has_answered));

        store.clear();
        assert!(store.room().is_none());
    }
}

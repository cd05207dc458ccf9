use quiz_types::GameResult;
use tracing::warn;

/// Ordering and ranking of end-of-game results.
pub struct Standings;

impl Standings {
    /// Sort results by rank and guarantee ranks are exactly `1..=N`.
    ///
    /// Server ranks are kept when they already form a contiguous sequence.
    /// Otherwise (gaps, duplicates, zero) ranks are reassigned by position after
    /// sorting on the server rank, then higher score, then user id. A zero
    /// rank is not a real placement and sorts after every ranked result.
    pub fn normalize(mut results: Vec<GameResult>) -> Vec<GameResult> {
        results.sort_by(|a, b| {
            (a.rank == 0)
                .cmp(&(b.rank == 0))
                .then(a.rank.cmp(&b.rank))
                .then(b.final_score.cmp(&a.final_score))
                .then(a.user_id.cmp(&b.user_id))
        });

        let contiguous = results
            .iter()
            .enumerate()
            .all(|(i, r)| r.rank as usize == i + 1);

        if !contiguous {
            warn!(
                "Received {} results with non-contiguous ranks; reassigning",
                results.len()
            );
            for (i, result) in results.iter_mut().enumerate() {
                result.rank = i as u32 + 1;
            }
        }

        results
    }

    pub fn winner(results: &[GameResult]) -> Option<&GameResult> {
        results.iter().find(|r| r.rank == 1)
    }

    pub fn standing_for<'a>(results: &'a [GameResult], user_id: &str) -> Option<&'a GameResult> {
        results.iter().find(|r| r.user_id == user_id)
    }
}

//! JSON messages exchanged between a play session and the leaderboard.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    pub final_score: u64,
}

/// Reply to `GameOver`. The leaderboard itself follows as a broadcast.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameOverAck {
    pub success: bool,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GetLeaderboard {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub score: u64,
    /// 1-based; may skip numbers when an entry could not be resolved
    pub rank: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardData {
    pub entries: Vec<LeaderboardEntry>,
}

/// Pushed to every connected session after a score update.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardUpdate {
    pub entries: Vec<LeaderboardEntry>,
}

impl From<LeaderboardData> for LeaderboardUpdate {
    fn from(data: LeaderboardData) -> Self {
        Self {
            entries: data.entries,
        }
    }
}

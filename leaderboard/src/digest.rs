//! Recurring top-10 digest. Independent of per-score announcements and safe
//! to run any number of times for the same week.

use chrono::{DateTime, Datelike, Utc};
use dontdrop_core::constants::TOP_PLAYERS_COUNT;
use serde::Serialize;

use crate::announce::rank_label;
use crate::error::LeaderboardError;
use crate::service::{LeaderboardService, RankedEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDigest {
    /// ISO week, e.g. `2026-W42`
    pub week: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<RankedEntry>,
}

impl WeeklyDigest {
    pub fn title(&self) -> String {
        format!("📊 Don't Drop weekly leaderboard ({})", self.week)
    }

    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No scores yet this week. Be the first!".to_string();
        }
        self.entries
            .iter()
            .map(|e| format!("{}: u/{} ({} points)", rank_label(e.rank), e.display_name, e.score))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn iso_week_label(at: DateTime<Utc>) -> String {
    let week = at.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub async fn build_weekly_digest(
    service: &LeaderboardService,
    now: DateTime<Utc>,
) -> Result<WeeklyDigest, LeaderboardError> {
    let snapshot = service.get_top_k(TOP_PLAYERS_COUNT).await?;
    let digest = WeeklyDigest {
        week: iso_week_label(now),
        generated_at: now,
        entries: snapshot.entries,
    };
    tracing::info!(
        "Built weekly digest {} with {} entries",
        digest.week,
        digest.entries.len()
    );
    Ok(digest)
}

//! The single authority for reading and mutating the global ranking.
//!
//! Only the highest score a player ever achieved counts. All safety comes from
//! the store's per-member conditional write; nothing here holds a lock across
//! an await.

use std::sync::Arc;

use dontdrop_core::constants::ANNOUNCE_TOP_N;
use dontdrop_core::{LeaderboardData, LeaderboardEntry};
use serde::Serialize;

use crate::announce::{Announcement, AnnouncementScheduler, DisplacedPlayer};
use crate::error::LeaderboardError;
use crate::identity::{IdentityResolver, PlayerIdentity};
use crate::keys::StoreKeys;
use crate::store::RankingStore;

/// Whether a submission changed the stored best score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitOutcome {
    Updated,
    NotHigher,
}

/// One resolved leaderboard row, keeping the stable id for diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: u32,
    pub stable_id: String,
    pub display_name: String,
    pub score: u64,
}

/// Fresh, per-request view of the top entries. Never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaderboardSnapshot {
    pub entries: Vec<RankedEntry>,
}

impl LeaderboardSnapshot {
    pub fn find(&self, stable_id: &str) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.stable_id == stable_id)
    }

    /// Occupant of a rank. Ranks can have gaps, so this is not an index.
    pub fn at_rank(&self, rank: u32) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.rank == rank)
    }

    pub fn to_data(&self) -> LeaderboardData {
        LeaderboardData {
            entries: self
                .entries
                .iter()
                .map(|e| LeaderboardEntry {
                    display_name: e.display_name.clone(),
                    score: e.score,
                    rank: e.rank,
                })
                .collect(),
        }
    }
}

/// Everything `record_game_over` learned while applying a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub outcome: SubmitOutcome,
    pub previous_best: Option<u64>,
    /// Set when the score entered the top 5 and a job was handed off
    pub announcement: Option<Announcement>,
}

pub struct LeaderboardService {
    store: Arc<dyn RankingStore>,
    identities: IdentityResolver,
    scheduler: Arc<dyn AnnouncementScheduler>,
    keys: StoreKeys,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn RankingStore>, scheduler: Arc<dyn AnnouncementScheduler>) -> Self {
        Self::with_keys(store, scheduler, StoreKeys::default())
    }

    pub fn with_keys(
        store: Arc<dyn RankingStore>,
        scheduler: Arc<dyn AnnouncementScheduler>,
        keys: StoreKeys,
    ) -> Self {
        Self {
            identities: IdentityResolver::new(store.clone(), keys.clone()),
            store,
            scheduler,
            keys,
        }
    }

    pub fn identities(&self) -> &IdentityResolver {
        &self.identities
    }

    pub async fn best_score(&self, stable_id: &str) -> Result<Option<u64>, LeaderboardError> {
        Ok(self
            .store
            .z_score(&self.keys.global_leaderboard(), stable_id)
            .await?)
    }

    /// Record the identity, then keep `candidate` only if it beats the stored
    /// best. The write itself is the store's conditional set.
    pub async fn submit_score(
        &self,
        stable_id: &str,
        display_name: &str,
        candidate: u64,
    ) -> Result<SubmitOutcome, LeaderboardError> {
        let previous_best = self
            .begin_submission(stable_id, display_name, candidate)
            .await?;
        if !beats(previous_best, candidate) {
            return Ok(SubmitOutcome::NotHigher);
        }
        self.write_if_higher(stable_id, candidate).await
    }

    /// Top `k` by score. Entries whose display name cannot be resolved are
    /// left out and the remaining ranks are not shifted up.
    pub async fn get_top_k(&self, k: usize) -> Result<LeaderboardSnapshot, LeaderboardError> {
        if k == 0 {
            return Ok(LeaderboardSnapshot::default());
        }
        let members = self
            .store
            .z_range_desc(&self.keys.global_leaderboard(), k)
            .await?;
        if members.is_empty() {
            return Ok(LeaderboardSnapshot::default());
        }

        let ids: Vec<String> = members.iter().map(|m| m.member.clone()).collect();
        let names = self.identities.resolve_display_names(&ids).await?;

        let mut entries = Vec::with_capacity(members.len());
        for (i, (member, name)) in members.into_iter().zip(names).enumerate() {
            let rank = i as u32 + 1;
            match name {
                Some(display_name) => entries.push(RankedEntry {
                    rank,
                    stable_id: member.member,
                    display_name,
                    score: member.score,
                }),
                None => {
                    let err = LeaderboardError::IdentityResolutionFailed {
                        stable_id: member.member,
                    };
                    tracing::warn!("Dropping rank {} from leaderboard: {}", rank, err);
                }
            }
        }
        Ok(LeaderboardSnapshot { entries })
    }

    /// Full game-over path: submit, and when the new best lands in the top 5,
    /// hand an announcement to the scheduler.
    ///
    /// A scheduling failure is logged and swallowed; the score stays applied.
    pub async fn record_game_over(
        &self,
        player: &PlayerIdentity,
        candidate: u64,
    ) -> Result<SubmissionReport, LeaderboardError> {
        let previous_best = self
            .begin_submission(&player.stable_id, &player.display_name, candidate)
            .await?;
        if !beats(previous_best, candidate) {
            return Ok(SubmissionReport {
                outcome: SubmitOutcome::NotHigher,
                previous_best,
                announcement: None,
            });
        }

        let previous_top = self.get_top_k(ANNOUNCE_TOP_N).await?;
        let outcome = self.write_if_higher(&player.stable_id, candidate).await?;
        if outcome == SubmitOutcome::NotHigher {
            return Ok(SubmissionReport {
                outcome,
                previous_best,
                announcement: None,
            });
        }

        // The score is applied from here on; later failures only cost the announcement
        let new_top = match self.get_top_k(ANNOUNCE_TOP_N).await {
            Ok(top) => top,
            Err(e) => {
                tracing::warn!(
                    "Score {} for {} applied, but reading the new top {} failed: {}",
                    candidate,
                    player.stable_id,
                    ANNOUNCE_TOP_N,
                    e
                );
                return Ok(SubmissionReport {
                    outcome,
                    previous_best,
                    announcement: None,
                });
            }
        };

        let announcement = announcement_for(&previous_top, &new_top, &player.stable_id);
        if let Some(a) = &announcement {
            tracing::info!(
                "{} reached rank {} with {} (displaced: {:?})",
                a.display_name,
                a.rank,
                a.score,
                a.displaced_player.as_ref().map(|d| &d.display_name)
            );
            if let Err(e) = self.scheduler.schedule_now(a.clone()) {
                tracing::warn!("Failed to schedule announcement for {}: {}", a.display_name, e);
            }
        }

        Ok(SubmissionReport {
            outcome,
            previous_best,
            announcement,
        })
    }

    /// Administrative reset: drop the ranking and every identity mapping.
    /// Returns the number of identity keys removed.
    pub async fn clear_all(&self) -> Result<usize, LeaderboardError> {
        tracing::warn!("Clearing global leaderboard and identity data");
        let mut keys = self.identities.all_keys().await?;
        let identities = keys.len();
        keys.push(self.keys.global_leaderboard());
        self.store.del(&keys).await?;
        tracing::info!("Cleared leaderboard and {} identity keys", identities);
        Ok(identities)
    }

    /// Validate, record the display name and read the stored best.
    async fn begin_submission(
        &self,
        stable_id: &str,
        display_name: &str,
        candidate: u64,
    ) -> Result<Option<u64>, LeaderboardError> {
        validate_identity(stable_id, display_name)?;
        self.identities
            .record_identity(stable_id, display_name)
            .await?;

        let current = self.best_score(stable_id).await?;
        if !beats(current, candidate) {
            tracing::info!(
                "Score {} for {} is not higher than {:?}; no update",
                candidate,
                stable_id,
                current
            );
        }
        Ok(current)
    }

    async fn write_if_higher(
        &self,
        stable_id: &str,
        candidate: u64,
    ) -> Result<SubmitOutcome, LeaderboardError> {
        let written = self
            .store
            .z_add_if_greater(&self.keys.global_leaderboard(), stable_id, candidate)
            .await?;
        if written {
            tracing::info!("Updated global score for {} to {}", stable_id, candidate);
            Ok(SubmitOutcome::Updated)
        } else {
            // A concurrent submission for the same player got there first
            tracing::info!("Conditional write for {} at {} was not applied", stable_id, candidate);
            Ok(SubmitOutcome::NotHigher)
        }
    }
}

fn beats(current: Option<u64>, candidate: u64) -> bool {
    current.map_or(true, |c| candidate > c)
}

fn validate_identity(stable_id: &str, display_name: &str) -> Result<(), LeaderboardError> {
    if stable_id.trim().is_empty() {
        return Err(LeaderboardError::InvalidSubmission(
            "stable id must not be empty".to_string(),
        ));
    }
    if display_name.trim().is_empty() {
        return Err(LeaderboardError::InvalidSubmission(
            "display name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Compare top-5 views from before and after a player's write.
///
/// `None` when the player is not in `new_top`. Otherwise the announcement names
/// whoever held that rank before, unless it was the player or nobody.
pub fn announcement_for(
    previous_top: &LeaderboardSnapshot,
    new_top: &LeaderboardSnapshot,
    stable_id: &str,
) -> Option<Announcement> {
    let mine = new_top.find(stable_id)?;
    let displaced_player = previous_top
        .at_rank(mine.rank)
        .filter(|prev| prev.stable_id != stable_id)
        .map(|prev| DisplacedPlayer {
            display_name: prev.display_name.clone(),
            score: prev.score,
        });

    Some(Announcement {
        display_name: mine.display_name.clone(),
        score: mine.score,
        rank: mine.rank,
        displaced_player,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rows: &[(&str, u64)]) -> LeaderboardSnapshot {
        LeaderboardSnapshot {
            entries: rows
                .iter()
                .enumerate()
                .map(|(i, (id, score))| RankedEntry {
                    rank: i as u32 + 1,
                    stable_id: (*id).to_string(),
                    display_name: id.to_uppercase(),
                    score: *score,
                })
                .collect(),
        }
    }

    #[test]
    fn newcomer_displaces_previous_occupant() {
        let before = snapshot(&[("a", 100), ("b", 90), ("c", 80)]);
        let after = snapshot(&[("a", 100), ("b", 90), ("f", 85)]);
        let a = announcement_for(&before, &after, "f").unwrap();
        assert_eq!(a.rank, 3);
        assert_eq!(a.display_name, "F");
        assert_eq!(
            a.displaced_player,
            Some(DisplacedPlayer {
                display_name: "C".into(),
                score: 80
            })
        );
    }

    #[test]
    fn empty_slot_announces_without_displacement() {
        let before = snapshot(&[("a", 100)]);
        let after = snapshot(&[("a", 100), ("f", 20)]);
        let a = announcement_for(&before, &after, "f").unwrap();
        assert_eq!(a.rank, 2);
        assert!(a.displaced_player.is_none());
    }

    #[test]
    fn own_slot_improvement_has_no_displaced_player() {
        let before = snapshot(&[("f", 100), ("a", 90)]);
        let after = snapshot(&[("f", 150), ("a", 90)]);
        let a = announcement_for(&before, &after, "f").unwrap();
        assert_eq!(a.rank, 1);
        assert!(a.displaced_player.is_none());
    }

    #[test]
    fn outside_top_is_silent() {
        let before = snapshot(&[("a", 100)]);
        let after = snapshot(&[("a", 100)]);
        assert!(announcement_for(&before, &after, "f").is_none());
    }

    #[test]
    fn at_rank_respects_gaps() {
        let mut snap = snapshot(&[("a", 100), ("b", 90), ("c", 80)]);
        snap.entries.remove(1);
        assert!(snap.at_rank(2).is_none());
        assert_eq!(snap.at_rank(3).map(|e| e.stable_id.as_str()), Some("c"));
    }
}

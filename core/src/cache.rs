//! Client-side leaderboard view with optimistic entries.
//!
//! A finished game shows up locally right away as a `Pending` entry. The
//! server's answer either replaces the whole view with `Confirmed` entries or
//! drops the pending one; shared state is never mutated in place.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::messages::LeaderboardEntry;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Pending,
    Confirmed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry {
    pub display_name: String,
    pub score: u64,
    pub rank: u32,
    pub state: SyncState,
}

/// Last confirmed server view with optimistic entries layered on top.
///
/// Pending entries never overwrite confirmed rows: the visible list is rebuilt
/// from both, so rejecting a pending score restores the confirmed view exactly.
#[derive(Debug, Clone)]
pub struct LocalLeaderboard {
    confirmed: Vec<CachedEntry>,
    pending: Vec<CachedEntry>,
    view: Vec<CachedEntry>,
    capacity: usize,
}

impl LocalLeaderboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            confirmed: Vec::new(),
            pending: Vec::new(),
            view: Vec::new(),
            capacity,
        }
    }

    pub fn entries(&self) -> &[CachedEntry] {
        &self.view
    }

    pub fn pending_count(&self) -> usize {
        self.view
            .iter()
            .filter(|e| e.state == SyncState::Pending)
            .count()
    }

    /// Show a just-finished score before the server confirms it.
    ///
    /// Returns `true` when the score made it onto the local board. A score not
    /// above the player's visible entry changes nothing.
    pub fn apply_optimistic(&mut self, display_name: &str, score: u64) -> bool {
        if let Some(existing) = self.view.iter().find(|e| e.display_name == display_name) {
            if existing.score >= score {
                return false;
            }
        }

        let previous = self
            .pending
            .iter()
            .position(|e| e.display_name == display_name)
            .map(|i| self.pending.remove(i));
        self.pending.push(CachedEntry {
            display_name: display_name.into(),
            score,
            rank: 0,
            state: SyncState::Pending,
        });
        self.rebuild();

        let shown = self
            .view
            .iter()
            .any(|e| e.state == SyncState::Pending && e.display_name == display_name);
        if !shown {
            self.pending.retain(|e| e.display_name != display_name);
            self.pending.extend(previous);
            self.rebuild();
        }
        shown
    }

    /// Replace the view with the server's entries, ranks kept as sent.
    pub fn confirm(&mut self, server: &[LeaderboardEntry]) {
        self.confirmed = server
            .iter()
            .take(self.capacity)
            .map(|e| CachedEntry {
                display_name: e.display_name.clone(),
                score: e.score,
                rank: e.rank,
                state: SyncState::Confirmed,
            })
            .collect();
        self.pending.clear();
        self.rebuild();
    }

    /// The server refused the update; drop the optimistic entry and show the
    /// player's confirmed row again, if any.
    pub fn reject(&mut self, display_name: &str) {
        let before = self.pending.len();
        self.pending.retain(|e| e.display_name != display_name);
        if self.pending.len() != before {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        if self.pending.is_empty() {
            self.view = self.confirmed.clone();
            return;
        }

        // A pending entry shadows the same player's confirmed row
        let mut view: Vec<CachedEntry> = self
            .confirmed
            .iter()
            .filter(|c| !self.pending.iter().any(|p| p.display_name == c.display_name))
            .cloned()
            .collect();
        for entry in self.pending.iter() {
            // Confirmed entries win ties, so insert after every score >= ours
            let at = view
                .iter()
                .position(|e| e.score < entry.score)
                .unwrap_or(view.len());
            view.insert(at, entry.clone());
        }
        view.truncate(self.capacity);
        for (i, entry) in view.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
        }
        self.view = view;
    }
}

/// Final scores waiting for a connection.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingScores {
    scores: Vec<u64>,
}

impl PendingScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, final_score: u64) {
        self.scores.push(final_score);
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Only the best queued score can change the stored high score.
    pub fn best(&self) -> Option<u64> {
        self.scores.iter().copied().max()
    }

    /// Take everything for a sync attempt. Put back what failed with `push`.
    pub fn drain(&mut self) -> Vec<u64> {
        core::mem::take(&mut self.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(entries: &[(&str, u64, u32)]) -> Vec<LeaderboardEntry> {
        entries
            .iter()
            .map(|(name, score, rank)| LeaderboardEntry {
                display_name: (*name).into(),
                score: *score,
                rank: *rank,
            })
            .collect()
    }

    #[test]
    fn optimistic_entry_is_pending_until_confirmed() {
        let mut board = LocalLeaderboard::new(3);
        board.confirm(&server(&[("ann", 100, 1), ("bo", 50, 2)]));

        assert!(board.apply_optimistic("cy", 70));
        assert_eq!(board.entries()[1].display_name, "cy");
        assert_eq!(board.entries()[1].state, SyncState::Pending);
        assert_eq!(board.entries()[2].rank, 3);
        assert_eq!(board.pending_count(), 1);

        board.confirm(&server(&[("ann", 100, 1), ("cy", 70, 2), ("bo", 50, 3)]));
        assert_eq!(board.pending_count(), 0);
    }

    #[test]
    fn tie_with_confirmed_entry_sorts_after_it() {
        let mut board = LocalLeaderboard::new(5);
        board.confirm(&server(&[("ann", 100, 1)]));
        board.apply_optimistic("bo", 100);
        assert_eq!(board.entries()[0].display_name, "ann");
        assert_eq!(board.entries()[1].rank, 2);
    }

    #[test]
    fn reject_removes_only_pending() {
        let mut board = LocalLeaderboard::new(5);
        board.confirm(&server(&[("ann", 100, 1), ("bo", 50, 2)]));
        board.apply_optimistic("cy", 120);
        board.reject("cy");
        board.reject("ann");
        assert_eq!(board.entries().len(), 2);
        assert_eq!(board.entries()[0].display_name, "ann");
        assert_eq!(board.entries()[0].rank, 1);
    }

    #[test]
    fn lower_score_than_own_entry_is_ignored() {
        let mut board = LocalLeaderboard::new(5);
        board.confirm(&server(&[("ann", 100, 1)]));
        assert!(!board.apply_optimistic("ann", 80));
        assert_eq!(board.entries()[0].state, SyncState::Confirmed);
    }

    #[test]
    fn reject_restores_confirmed_row() {
        let mut board = LocalLeaderboard::new(5);
        board.confirm(&server(&[("ann", 100, 1), ("bo", 90, 2)]));
        let before = board.entries().to_vec();

        assert!(board.apply_optimistic("ann", 150));
        assert_eq!(board.entries().len(), 2);
        assert_eq!(board.entries()[0].score, 150);
        assert_eq!(board.entries()[0].state, SyncState::Pending);

        board.reject("ann");
        assert_eq!(board.entries(), before.as_slice());
    }

    #[test]
    fn reject_restores_rows_pushed_off_a_full_board() {
        let mut board = LocalLeaderboard::new(2);
        board.confirm(&server(&[("ann", 100, 1), ("bo", 90, 2)]));
        assert!(board.apply_optimistic("cy", 120));
        assert_eq!(board.entries()[1].display_name, "ann");

        board.reject("cy");
        assert_eq!(board.entries()[1].display_name, "bo");
        assert_eq!(board.entries()[1].state, SyncState::Confirmed);
    }

    #[test]
    fn full_board_rejects_low_score() {
        let mut board = LocalLeaderboard::new(2);
        board.confirm(&server(&[("ann", 100, 1), ("bo", 90, 2)]));
        assert!(!board.apply_optimistic("cy", 10));
        assert_eq!(board.entries().len(), 2);
    }

    #[test]
    fn pending_scores_drain_and_best() {
        let mut pending = PendingScores::new();
        pending.push(40);
        pending.push(75);
        assert_eq!(pending.best(), Some(75));
        assert_eq!(pending.drain(), vec![40, 75]);
        assert!(pending.is_empty());
    }
}

//! Rank-entry announcements, handed off as fire-and-forget jobs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SchedulerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacedPlayer {
    pub display_name: String,
    pub score: u64,
}

/// Job payload: who reached which top-5 rank, and whom they pushed down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub display_name: String,
    pub score: u64,
    /// 1 through 5
    pub rank: u32,
    pub displaced_player: Option<DisplacedPlayer>,
}

/// A job as queued, with the time it was requested to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementJob {
    pub run_at: DateTime<Utc>,
    pub announcement: Announcement,
}

/// Deferred-job runner. `schedule_now` is a one-way send: it only reports
/// whether the job was accepted, never how it ran.
pub trait AnnouncementScheduler: Send + Sync {
    fn schedule_now(&self, announcement: Announcement) -> Result<(), SchedulerError>;
}

/// Queues jobs on an unbounded channel drained by `run_announcement_worker`.
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<AnnouncementJob>,
}

impl ChannelScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AnnouncementJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AnnouncementScheduler for ChannelScheduler {
    fn schedule_now(&self, announcement: Announcement) -> Result<(), SchedulerError> {
        self.tx
            .send(AnnouncementJob {
                run_at: Utc::now(),
                announcement,
            })
            .map_err(|_| SchedulerError::Closed)
    }
}

/// Scheduler for deployments without announcements.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl AnnouncementScheduler for NoopScheduler {
    fn schedule_now(&self, announcement: Announcement) -> Result<(), SchedulerError> {
        tracing::debug!(
            "Announcements disabled; dropping rank {} for {}",
            announcement.rank,
            announcement.display_name
        );
        Ok(())
    }
}

/// Where rendered announcements end up (a community post, a chat channel...).
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    async fn publish(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Default sink: writes the post to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl AnnouncementSink for TracingSink {
    async fn publish(&self, title: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!("📣 {}\n{}", title, body);
        Ok(())
    }
}

pub fn rank_label(rank: u32) -> String {
    let suffix = match (rank % 10, rank % 100) {
        (1, r) if r != 11 => "st",
        (2, r) if r != 12 => "nd",
        (3, r) if r != 13 => "rd",
        _ => "th",
    };
    format!("{}{}", rank, suffix)
}

/// Title and body of the post for one announcement.
pub fn render_announcement(a: &Announcement) -> (String, String) {
    let title = format!(
        "🏆 {} just took {} place on the Don't Drop leaderboard!",
        a.display_name,
        rank_label(a.rank)
    );
    let mut body = format!(
        "u/{} kept the ball up for {} points.",
        a.display_name, a.score
    );
    if let Some(displaced) = &a.displaced_player {
        body.push_str(&format!(
            "\nThey knocked u/{} ({} points) down a spot.",
            displaced.display_name, displaced.score
        ));
    }
    (title, body)
}

/// Drain queued jobs until every scheduler handle is dropped.
pub async fn run_announcement_worker(
    mut rx: mpsc::UnboundedReceiver<AnnouncementJob>,
    sink: Arc<dyn AnnouncementSink>,
) {
    while let Some(job) = rx.recv().await {
        let (title, body) = render_announcement(&job.announcement);
        if let Err(e) = sink.publish(&title, &body).await {
            tracing::error!(
                "Failed to publish announcement for {} (queued {}): {:#}",
                job.announcement.display_name,
                job.run_at,
                e
            );
        }
    }
    tracing::info!("Announcement worker stopped");
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::keys::StoreKeys;
use crate::store::RankingStore;

/// A player as seen at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerIdentity {
    /// Platform-assigned, immutable per account
    pub stable_id: String,
    /// Latest user-facing name
    pub display_name: String,
}

impl PlayerIdentity {
    pub fn new(stable_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            stable_id: stable_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Maps stable account ids to the display name last seen for them.
///
/// Rankings are keyed by the stable id, so a rename never orphans a score;
/// the name is looked up here when a leaderboard is rendered.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn RankingStore>,
    keys: StoreKeys,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn RankingStore>, keys: StoreKeys) -> Self {
        Self { store, keys }
    }

    /// Unconditional upsert of the current display name.
    pub async fn record_identity(
        &self,
        stable_id: &str,
        display_name: &str,
    ) -> Result<(), StoreError> {
        self.store
            .set(&self.keys.username(stable_id), display_name)
            .await?;
        tracing::debug!("Stored display name {} for {}", display_name, stable_id);
        Ok(())
    }

    /// Batched lookup: one store round trip for all ids, `None` where unknown.
    pub async fn resolve_display_names(
        &self,
        stable_ids: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        if stable_ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = stable_ids.iter().map(|id| self.keys.username(id)).collect();
        let names = self.store.mget(&keys).await?;
        Ok(names
            .into_iter()
            .map(|n| n.filter(|s| !s.is_empty()))
            .collect())
    }

    /// Every identity key, for an administrative reset.
    pub async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        self.store.scan_prefix(&self.keys.username_prefix()).await
    }
}

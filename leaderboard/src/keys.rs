/// Store key layout. The version suffix lets a new layout coexist with old data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    namespace: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::new("dontdrop")
    }
}

impl StoreKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Ordered collection: stable id -> best score.
    pub fn global_leaderboard(&self) -> String {
        format!("{}:leaderboard:global:v1", self.namespace)
    }

    pub fn username_prefix(&self) -> String {
        format!("{}:username_by_id:v1:", self.namespace)
    }

    /// Plain key: stable id -> display name.
    pub fn username(&self, stable_id: &str) -> String {
        format!("{}{}", self.username_prefix(), stable_id)
    }
}

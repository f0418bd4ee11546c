//! Project board: plain CRUD over the `projects` collection.
//!
//! Unlike the channels this is a point-in-time view; callers re-fetch
//! when they need fresh data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aerie_shared::constants::COLLECTION_PROJECTS;
use aerie_store::{Direction, DocumentStore, Query};

use crate::error::ChatError;

/// Fields of a project entry as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub resources: String,
    #[serde(default)]
    pub milestones: String,
}

fn default_status() -> String {
    "Inception".to_string()
}

impl ProjectDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            objective: String::new(),
            impact: String::new(),
            timeline: String::new(),
            status: default_status(),
            resources: String::new(),
            milestones: String::new(),
        }
    }
}

/// A stored project entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub draft: ProjectDraft,
}

/// CRUD over the project collection.
pub struct ProjectBoard<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ProjectBoard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All projects, oldest first.
    pub async fn list(&self) -> Result<Vec<Project>, ChatError> {
        let docs = self
            .store
            .query(
                COLLECTION_PROJECTS,
                &Query::new().order_by_created(Direction::Ascending),
            )
            .await?;

        let mut projects = Vec::with_capacity(docs.len());
        for doc in &docs {
            projects.push(Project {
                id: doc.id.clone(),
                created_at: doc.created_at,
                draft: doc.deserialize()?,
            });
        }
        Ok(projects)
    }

    pub async fn create(&self, draft: ProjectDraft) -> Result<Project, ChatError> {
        let doc = self
            .store
            .add(COLLECTION_PROJECTS, serde_json::to_value(&draft)?)
            .await?;
        Ok(Project {
            id: doc.id,
            created_at: doc.created_at,
            draft,
        })
    }

    pub async fn delete(&self, id: &str) -> Result<(), ChatError> {
        self.store.delete(COLLECTION_PROJECTS, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerie_store::SqliteStore;

    #[tokio::test]
    async fn create_list_delete() {
        let board = ProjectBoard::new(Arc::new(SqliteStore::in_memory().unwrap()));

        let first = board.create(ProjectDraft::new("Falcon")).await.unwrap();
        board.create(ProjectDraft::new("Osprey")).await.unwrap();

        let all = board.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].draft.title, "Falcon");
        assert_eq!(all[0].draft.status, "Inception");

        board.delete(&first.id).await.unwrap();
        let all = board.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].draft.title, "Osprey");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::participants::{Participants, User};
use crate::payloads::{ProjectCard, Review, ReviewState};

/// An issue or pull request record owned by the issue store.
///
/// Only `node_id` and the derived fields are interpreted here; everything
/// else the store put on the record is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalIssue {
    pub node_id: String,
    #[serde(rename = "private", default)]
    pub is_private: Option<bool>,
    #[serde(rename = "involves", default)]
    pub involved_users: Participants,
    #[serde(rename = "last_timeline_user", default)]
    pub last_actor_login: Option<String>,
    #[serde(rename = "last_timeline_at", default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(rename = "projects", default)]
    pub project_associations: Vec<ProjectAssociation>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(rename = "draft", default)]
    pub is_draft: Option<bool>,
    #[serde(default)]
    pub requested_reviewers: Vec<User>,
    #[serde(rename = "reviews", default)]
    pub review_verdicts: Vec<ReviewVerdict>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalIssue {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            is_private: None,
            involved_users: Participants::new(),
            last_actor_login: None,
            last_activity_at: None,
            project_associations: Vec::new(),
            merged_at: None,
            is_draft: None,
            requested_reviewers: Vec::new(),
            review_verdicts: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAssociation {
    pub url: String,
    pub name: String,
    #[serde(rename = "column", default)]
    pub column_name: String,
}

impl From<&ProjectCard> for ProjectAssociation {
    fn from(card: &ProjectCard) -> Self {
        Self {
            url: card.project.url.clone(),
            name: card.project.name.clone(),
            column_name: card
                .column
                .as_ref()
                .and_then(|column| column.name.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub login: String,
    pub avatar_url: Option<String>,
    pub state: ReviewState,
    pub updated_at: DateTime<Utc>,
}

impl ReviewVerdict {
    pub fn from_review(review: &Review) -> Option<Self> {
        Some(Self {
            login: review.author_login()?.to_string(),
            avatar_url: review.author_avatar_url().map(str::to_string),
            state: review.state,
            updated_at: review.updated_at,
        })
    }
}

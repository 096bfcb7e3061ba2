//! Core data types for the Euterpe feed service
//!
//! This module defines the fundamental structures used throughout euterpe:
//! activities (feed items), feed keys, and scored candidates. Everything else
//! in the pipeline is expressed in terms of these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// === Activities ===

/// One content item in a feed
///
/// Activities are identified within a feed by their `foreign_id`; appending
/// an activity whose foreign ID already exists replaces the prior entry.
/// Personalized copies produced by a rebuild carry a derived foreign ID and
/// a populated `relevance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Originating user or system principal (e.g. `User:seed`)
    pub actor: String,

    /// Interaction kind (`post` for catalog items)
    pub verb: String,

    /// Content reference
    pub object: String,

    /// Caller-assigned stable identity, unique within a feed
    pub foreign_id: String,

    /// Category tag; required for relevance scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// Non-negative popularity score (catalog range is 0-100)
    #[serde(default)]
    pub popularity: u32,

    /// Event timestamp; feeds read newest-first
    pub time: DateTime<Utc>,

    /// Relevance score, populated only on personalized copies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
}

impl Activity {
    /// Create a new activity with the given identity, timestamped now
    pub fn new(
        actor: impl Into<String>,
        verb: impl Into<String>,
        object: impl Into<String>,
        foreign_id: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            verb: verb.into(),
            object: object.into(),
            foreign_id: foreign_id.into(),
            genre: None,
            popularity: 0,
            time: Utc::now(),
            relevance: None,
        }
    }

    /// Derive the personalized copy of this activity for `user`
    ///
    /// The copy keeps every field (including the original timestamp) but
    /// carries the derived foreign ID and the relevance score. Deriving
    /// twice for the same user yields the same identity, which is what
    /// makes rebuilds idempotent.
    pub fn personalized(&self, user: &str, relevance: f32) -> Activity {
        let mut copy = self.clone();
        copy.foreign_id = derived_feed_id(&self.foreign_id, user);
        copy.relevance = Some(relevance);
        copy
    }
}

/// Derived foreign ID of a personalized copy: `{foreign_id}:p-{user}`
///
/// A pure function of its inputs, so re-deriving during a later rebuild
/// addresses the same stored entry.
pub fn derived_feed_id(foreign_id: &str, user: &str) -> String {
    format!("{}:p-{}", foreign_id, user)
}

// === Feed identity ===

/// Identifies one feed as a `group:id` pair
///
/// The global content pool lives at `global:main`; each user's synthesized
/// feed lives at `personalized:<user>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    pub group: String,
    pub id: String,
}

impl FeedKey {
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
        }
    }

    /// The shared global content pool
    pub fn global() -> Self {
        Self::new("global", "main")
    }

    /// The personalized feed for `user`
    pub fn personalized(user: &str) -> Self {
        Self::new("personalized", user)
    }
}

impl std::fmt::Display for FeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.id)
    }
}

// === Scoring output ===

/// A candidate paired with its definite relevance score
///
/// Scoring substitutes the default score on per-item failure rather than
/// dropping the item, so every candidate that goes in comes back out.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredActivity {
    pub activity: Activity,
    pub relevance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_feed_id_is_deterministic() {
        let a = derived_feed_id("post:Post:1", "alice");
        let b = derived_feed_id("post:Post:1", "alice");
        assert_eq!(a, b);
        assert_eq!(a, "post:Post:1:p-alice");
    }

    #[test]
    fn test_derived_feed_id_differs_per_user() {
        assert_ne!(
            derived_feed_id("post:Post:1", "alice"),
            derived_feed_id("post:Post:1", "bob")
        );
    }

    #[test]
    fn test_personalized_copy_preserves_fields() {
        let mut original = Activity::new("User:seed", "post", "Post 1", "post:Post:1");
        original.genre = Some("rock".to_string());
        original.popularity = 95;

        let copy = original.personalized("alice", 0.9);
        assert_eq!(copy.foreign_id, "post:Post:1:p-alice");
        assert_eq!(copy.relevance, Some(0.9));
        assert_eq!(copy.actor, original.actor);
        assert_eq!(copy.genre, original.genre);
        assert_eq!(copy.time, original.time);
        // the source entry is untouched
        assert_eq!(original.relevance, None);
    }

    #[test]
    fn test_feed_key_display() {
        assert_eq!(FeedKey::global().to_string(), "global:main");
        assert_eq!(
            FeedKey::personalized("alice").to_string(),
            "personalized:alice"
        );
    }

    #[test]
    fn test_activity_serde_omits_empty_fields() {
        let activity = Activity::new("User:seed", "post", "Post 1", "post:Post:1");
        let json = serde_json::to_value(&activity).unwrap();
        assert!(json.get("genre").is_none());
        assert!(json.get("relevance").is_none());
        assert_eq!(json["foreign_id"], "post:Post:1");
    }
}

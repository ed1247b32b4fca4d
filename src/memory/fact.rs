//! Fact record types
//!
//! A Fact is a single typed, confidence-scored statement about the user,
//! scoped to one conversation. Facts are identified for deduplication by
//! their merge key — the `(type, lowercase(value))` pair — never by rule
//! or id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::{bound, normalize};

/// The closed vocabulary of fact types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    PreferenceLike,
    PreferenceDislike,
    Interest,
    Want,
    GoalPlan,
    Habit,
    SkillRole,
    Relationship,
    Boundary,
    Experience,
    IdentityName,
    Other,
}

/// Whether a fact is eligible for selection. Inactive facts are kept in the
/// store (and still occupy their merge key) but are never injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactStatus {
    Active,
    Inactive,
}

/// A single statement about the user, inferred from an utterance or entered
/// manually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    /// Unique fact identifier, stable for the fact's lifetime
    pub id: Uuid,
    /// Type of statement this fact represents
    #[serde(rename = "type")]
    pub fact_type: FactType,
    /// Normalized statement text
    pub value: String,
    /// Selection eligibility
    pub status: FactStatus,
    /// Confidence score (0.0–1.0), clamped on every write
    pub confidence: f32,
    /// Searchable tags, duplicates collapsed
    #[serde(default)]
    pub tags: Vec<String>,
    /// Provenance note (extraction rule name, or empty for manual entries)
    #[serde(default)]
    pub source: String,
    /// Creation timestamp, immutable
    pub created_at: DateTime<Utc>,
    /// Last time this fact was observed or edited
    pub last_seen_at: DateTime<Utc>,
}

impl Fact {
    /// The deduplication/merge identity: `(type, lowercase(value))`.
    pub fn merge_key(&self) -> (FactType, String) {
        (self.fact_type, normalize(&self.value).to_lowercase())
    }

    /// Record an observation or edit, updating `last_seen_at`.
    pub fn touch(&mut self) {
        self.last_seen_at = Utc::now();
    }

    /// Set the confidence score, clamped to 0.0–1.0.
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = confidence.clamp(0.0, 1.0);
    }
}

/// Builder for constructing `Fact` instances
pub struct FactBuilder {
    fact_type: FactType,
    value: String,
    status: FactStatus,
    confidence: f32,
    tags: Vec<String>,
    source: String,
}

impl FactBuilder {
    /// Create a new builder with the required fact type
    pub fn new(fact_type: FactType) -> Self {
        Self {
            fact_type,
            value: String::new(),
            status: FactStatus::Active,
            confidence: 0.5,
            tags: Vec::new(),
            source: String::new(),
        }
    }

    /// Set the statement text (normalized; an empty value is legal for
    /// manual entries awaiting editor input)
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = normalize(&value.into());
        self
    }

    /// Set the selection status
    pub fn status(mut self, status: FactStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the confidence score (clamped to 0.0–1.0)
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Add a tag, collapsing duplicates
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = normalize(&tag.into());
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Add tags from an iterator
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self = self.tag(tag);
        }
        self
    }

    /// Set the provenance note
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = normalize(&source.into());
        self
    }

    /// Build the fact with a fresh id and current timestamps
    pub fn build(self) -> Fact {
        let now = Utc::now();
        Fact {
            id: Uuid::new_v4(),
            fact_type: self.fact_type,
            value: self.value,
            status: self.status,
            confidence: self.confidence,
            tags: self.tags,
            source: self.source,
            created_at: now,
            last_seen_at: now,
        }
    }
}

/// A leniently-typed fact as found in an import payload. Missing fields are
/// defaulted by `into_fact`, mirroring fresh-creation rules.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFact {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub fact_type: Option<FactType>,
    pub value: Option<String>,
    pub status: Option<FactStatus>,
    pub confidence: Option<f32>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl RawFact {
    /// Normalize an imported fact, generating an id when missing (or when
    /// the foreign id is not parseable), defaulting confidence to 0.5, and
    /// applying the same clamping as fresh creation.
    pub fn into_fact(self, max_value_len: usize) -> Fact {
        let now = Utc::now();
        let id = self
            .id
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .unwrap_or_else(Uuid::new_v4);
        let value = bound(normalize(&self.value.unwrap_or_default()), max_value_len);

        let mut tags = Vec::new();
        for tag in self.tags.unwrap_or_default() {
            let tag = normalize(&tag);
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Fact {
            id,
            fact_type: self.fact_type.unwrap_or(FactType::Other),
            value,
            status: self.status.unwrap_or(FactStatus::Active),
            confidence: self.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            tags,
            source: normalize(&self.source.unwrap_or_default()),
            created_at: self.created_at.unwrap_or(now),
            last_seen_at: self.last_seen_at.unwrap_or(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_builder() {
        let fact = FactBuilder::new(FactType::PreferenceLike)
            .value("使用者喜歡：貓")
            .confidence(0.75)
            .tag("preference")
            .source("like")
            .build();

        assert_eq!(fact.fact_type, FactType::PreferenceLike);
        assert_eq!(fact.value, "使用者喜歡：貓");
        assert_eq!(fact.status, FactStatus::Active);
        assert!((fact.confidence - 0.75).abs() < f32::EPSILON);
        assert_eq!(fact.tags, vec!["preference"]);
        assert_eq!(fact.source, "like");
        assert_eq!(fact.created_at, fact.last_seen_at);
    }

    #[test]
    fn test_builder_clamps_confidence() {
        let fact = FactBuilder::new(FactType::Other).confidence(1.5).build();
        assert!((fact.confidence - 1.0).abs() < f32::EPSILON);

        let fact = FactBuilder::new(FactType::Other).confidence(-0.5).build();
        assert!((fact.confidence - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_builder_collapses_duplicate_tags() {
        let fact = FactBuilder::new(FactType::Other)
            .tags(["a", "b", "a", ""])
            .build();
        assert_eq!(fact.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_key_is_case_insensitive() {
        let a = FactBuilder::new(FactType::Want).value("Steam Deck").build();
        let b = FactBuilder::new(FactType::Want).value("steam deck").build();
        assert_eq!(a.merge_key(), b.merge_key());

        let c = FactBuilder::new(FactType::Interest).value("Steam Deck").build();
        assert_ne!(a.merge_key(), c.merge_key());
    }

    #[test]
    fn test_wire_shape() {
        let fact = FactBuilder::new(FactType::PreferenceDislike)
            .value("使用者不喜歡：下雨")
            .confidence(0.75)
            .build();

        let json = serde_json::to_value(&fact).unwrap();
        assert_eq!(json["type"], "preference_dislike");
        assert_eq!(json["status"], "active");
        // fact timestamps are ISO-8601 strings on the wire
        assert!(json["createdAt"].is_string());
        assert!(json["lastSeenAt"].is_string());
        assert!(json.get("fact_type").is_none());
    }

    #[test]
    fn test_raw_fact_defaults() {
        let raw: RawFact = serde_json::from_value(serde_json::json!({
            "value": "  使用者喜歡：貓  "
        }))
        .unwrap();
        let fact = raw.into_fact(60);

        assert_eq!(fact.fact_type, FactType::Other);
        assert_eq!(fact.value, "使用者喜歡：貓");
        assert_eq!(fact.status, FactStatus::Active);
        assert!((fact.confidence - 0.5).abs() < f32::EPSILON);
        assert!(fact.tags.is_empty());
        assert!(fact.source.is_empty());
    }

    #[test]
    fn test_raw_fact_preserves_present_fields() {
        let id = Uuid::new_v4();
        let raw: RawFact = serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "type": "identity_name",
            "value": "使用者希望被稱呼為：小明",
            "status": "inactive",
            "confidence": 0.7,
            "tags": ["identity"],
            "source": "nickname"
        }))
        .unwrap();
        let fact = raw.into_fact(60);

        assert_eq!(fact.id, id);
        assert_eq!(fact.fact_type, FactType::IdentityName);
        assert_eq!(fact.status, FactStatus::Inactive);
        assert!((fact.confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(fact.tags, vec!["identity"]);
        assert_eq!(fact.source, "nickname");
    }

    #[test]
    fn test_raw_fact_unparseable_id_regenerated() {
        let raw: RawFact = serde_json::from_value(serde_json::json!({
            "id": "m_1700000000_ab12",
            "value": "x"
        }))
        .unwrap();
        // a foreign id that is not a UUID gets a fresh one
        let fact = raw.into_fact(60);
        assert_eq!(fact.value, "x");
    }

    #[test]
    fn test_raw_fact_clamps_confidence_and_length() {
        let raw: RawFact = serde_json::from_value(serde_json::json!({
            "value": "一二三四五六",
            "confidence": 7.0
        }))
        .unwrap();
        let fact = raw.into_fact(4);
        assert!((fact.confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(fact.value, "一二三四…");
    }
}

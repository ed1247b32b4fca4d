//! Per-conversation memory record and merge/upsert
//!
//! One `ConversationMemory` exists per conversation, created lazily with
//! defaults on first access. Invariant: no two facts (active or inactive)
//! share a merge key; every collapse goes through `merge`, never by
//! inserting a second fact with an identical key.
//!
//! On the wire the record is one JSON object per conversation; fact
//! timestamps serialize as ISO-8601 strings while the store-level
//! `updatedAt` is epoch milliseconds (the format the record is exchanged
//! in — preserve the asymmetry).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::memory::fact::{Fact, FactStatus, FactType, RawFact};
use crate::normalize::{bound, normalize};

/// Current schema version tag.
pub const STORE_VERSION: u32 = 2;

/// The per-conversation memory record: owner lock plus fact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMemory {
    /// Schema version tag
    #[serde(default = "default_version")]
    pub version: u32,
    /// Owning persona; once set, immutable for the record's lifetime
    #[serde(default)]
    pub owner_char_id: Option<String>,
    /// Facts in creation order (the fallback recency ordering and the
    /// ranking tie-break)
    #[serde(default)]
    pub facts: Vec<Fact>,
    /// Timestamp of the last mutation, epoch milliseconds on the wire
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    STORE_VERSION
}

/// Counts of what a merge call did, so callers can tell a gated no-op from
/// "succeeded with zero facts" and decide whether to flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Candidates appended as new facts
    pub appended: usize,
    /// Existing facts refreshed in place
    pub updated: usize,
}

impl MergeReport {
    /// Whether the merge mutated the record.
    pub fn changed(&self) -> bool {
        self.appended + self.updated > 0
    }
}

impl ConversationMemory {
    /// Create an empty record with default fields and no owner.
    pub fn new() -> Self {
        Self {
            version: STORE_VERSION,
            owner_char_id: None,
            facts: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Record a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Find a fact by id.
    pub fn fact(&self, id: Uuid) -> Option<&Fact> {
        self.facts.iter().find(|f| f.id == id)
    }

    /// Find a fact by merge key.
    pub fn fact_by_key(&self, key: &(FactType, String)) -> Option<&Fact> {
        self.facts.iter().find(|f| f.merge_key() == *key)
    }

    /// Reconcile candidate facts into the record.
    ///
    /// A candidate whose merge key already exists refreshes the existing
    /// fact: `last_seen_at` is touched, confidence takes the maximum of the
    /// two, tags are unioned. The existing fact's value, id, creation time,
    /// provenance and status are never overwritten — re-extraction must not
    /// reactivate a fact the user deliberately deactivated. Unknown keys
    /// append in arrival order. Merge never deletes.
    pub fn merge(&mut self, candidates: Vec<Fact>) -> MergeReport {
        let mut report = MergeReport::default();

        for candidate in candidates {
            let key = candidate.merge_key();
            if let Some(existing) = self.facts.iter_mut().find(|f| f.merge_key() == key) {
                existing.touch();
                existing.set_confidence(existing.confidence.max(candidate.confidence));
                for tag in candidate.tags {
                    if !existing.tags.contains(&tag) {
                        existing.tags.push(tag);
                    }
                }
                report.updated += 1;
            } else {
                self.facts.push(candidate);
                report.appended += 1;
            }
        }

        if report.changed() {
            self.touch();
        }
        report
    }

    /// Apply a manual edit to a fact. The patched value is normalized and
    /// bounded like fresh creation; an edit that would collide with another
    /// fact's merge key is rejected.
    pub fn update_fact(&mut self, id: Uuid, patch: FactPatch, max_value_len: usize) -> Result<()> {
        let index = self
            .facts
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| Error::Store(format!("Fact '{id}' not found")))?;

        let fact_type = patch.fact_type.unwrap_or(self.facts[index].fact_type);
        let value = match &patch.value {
            Some(value) => bound(normalize(value), max_value_len),
            None => self.facts[index].value.clone(),
        };
        let key = (fact_type, value.to_lowercase());
        if self
            .facts
            .iter()
            .any(|f| f.id != id && f.merge_key() == key)
        {
            return Err(Error::Validation(format!(
                "Another fact already holds the key ({fact_type:?}, {value})"
            )));
        }

        let fact = &mut self.facts[index];
        fact.fact_type = fact_type;
        fact.value = value;
        if let Some(status) = patch.status {
            fact.status = status;
        }
        if let Some(confidence) = patch.confidence {
            fact.set_confidence(confidence);
        }
        if let Some(tags) = patch.tags {
            let mut cleaned = Vec::new();
            for tag in tags {
                let tag = normalize(&tag);
                if !tag.is_empty() && !cleaned.contains(&tag) {
                    cleaned.push(tag);
                }
            }
            fact.tags = cleaned;
        }
        if let Some(source) = patch.source {
            fact.source = normalize(&source);
        }
        fact.touch();
        self.touch();
        Ok(())
    }

    /// Remove a fact by id, returning it if it existed.
    pub fn delete_fact(&mut self, id: Uuid) -> Option<Fact> {
        let index = self.facts.iter().position(|f| f.id == id)?;
        let removed = self.facts.remove(index);
        self.touch();
        Some(removed)
    }

    /// Remove all facts.
    pub fn clear_facts(&mut self) {
        self.facts.clear();
        self.touch();
    }

    /// Replace the fact list wholesale (the import path).
    pub fn replace_facts(&mut self, facts: Vec<Fact>) {
        self.facts = facts;
        self.touch();
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial manual-edit request; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactPatch {
    #[serde(rename = "type")]
    pub fact_type: Option<FactType>,
    pub value: Option<String>,
    pub status: Option<FactStatus>,
    pub confidence: Option<f32>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
}

#[derive(Deserialize)]
struct ImportPayload {
    facts: Vec<serde_json::Value>,
}

/// Parse an import payload into normalized facts.
///
/// The payload must be a JSON object with a `facts` array, otherwise the
/// whole import is rejected with no mutation. Each element is normalized
/// with the same defaulting and clamping as fresh creation; elements that
/// are not objects at all are logged and skipped. Duplicate merge keys
/// collapse to the first occurrence.
pub fn parse_import(payload: &str, max_value_len: usize) -> Result<Vec<Fact>> {
    let parsed: ImportPayload = serde_json::from_str(payload)
        .map_err(|e| Error::Validation(format!("Invalid memory payload: {e}")))?;

    let mut facts = Vec::new();
    let mut seen: HashSet<(FactType, String)> = HashSet::new();
    for element in parsed.facts {
        let raw: RawFact = match serde_json::from_value(element) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Skipping malformed fact in import: {}", e);
                continue;
            }
        };
        let fact = raw.into_fact(max_value_len);
        if seen.insert(fact.merge_key()) {
            facts.push(fact);
        }
    }

    Ok(facts)
}

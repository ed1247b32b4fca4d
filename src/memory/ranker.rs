//! Relevance ranking and bounded selection of active facts
//!
//! Only active facts with non-empty values are eligible. With relevance
//! disabled, selection is the chronological tail of the store in original
//! order. With relevance enabled, facts are scored against the latest user
//! message as `2·overlap + recency_bonus + 5·confidence` and sorted
//! descending; the sort is stable so ties keep store order and the output
//! stays deterministic.

use chrono::{DateTime, Utc};

use crate::config::MemorySettings;
use crate::memory::fact::{Fact, FactStatus};
use crate::memory::store::ConversationMemory;
use crate::normalize::tokenize;

/// Scores and selects the facts to surface for one generation.
pub struct Ranker;

impl Ranker {
    /// Select at most `settings.max_items` facts for the given query text.
    pub fn select<'a>(
        memory: &'a ConversationMemory,
        query: &str,
        settings: &MemorySettings,
    ) -> Vec<&'a Fact> {
        Self::select_at(memory, query, settings, Utc::now())
    }

    fn select_at<'a>(
        memory: &'a ConversationMemory,
        query: &str,
        settings: &MemorySettings,
        now: DateTime<Utc>,
    ) -> Vec<&'a Fact> {
        let eligible: Vec<&Fact> = memory
            .facts
            .iter()
            .filter(|f| f.status == FactStatus::Active && !f.value.is_empty())
            .collect();

        if !settings.relevance {
            let skip = eligible.len().saturating_sub(settings.max_items);
            return eligible[skip..].to_vec();
        }

        let query_tokens = tokenize(query);
        let mut scored: Vec<(f32, &Fact)> = eligible
            .into_iter()
            .map(|fact| {
                let overlap = tokenize(&fact.value)
                    .intersection(&query_tokens)
                    .count() as f32;
                let recency = if settings.recency_bonus {
                    Self::recency_bonus(fact, now)
                } else {
                    0.0
                };
                (overlap * 2.0 + recency + fact.confidence * 5.0, fact)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(settings.max_items);
        scored.into_iter().map(|(_, fact)| fact).collect()
    }

    /// Monotonically decreasing bonus for recently seen facts, bounded
    /// below at zero: `max(0, 10 − age_in_days)` since `last_seen_at`.
    fn recency_bonus(fact: &Fact, now: DateTime<Utc>) -> f32 {
        let age_seconds = (now - fact.last_seen_at).num_seconds().max(0) as f32;
        let age_days = age_seconds / 86400.0;
        (10.0 - age_days).max(0.0)
    }
}

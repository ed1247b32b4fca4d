//! Presentation-facing view of a conversation's memory
//!
//! The core emits this snapshot for the settings/editor collaborator; the
//! presentation layer renders it and talks back through engine intents,
//! with no access to merge internals.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::MemorySettings;
use crate::memory::fact::Fact;
use crate::memory::store::ConversationMemory;

/// Snapshot of one conversation's memory for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryView {
    /// Owning persona, if the record is locked
    pub owner_char_id: Option<String>,
    /// Whether the current handle may edit (i.e. owns the record)
    pub editable: bool,
    /// Settings snapshot
    pub settings: MemorySettings,
    /// Facts in store order
    pub facts: Vec<Fact>,
    /// Last mutation, epoch milliseconds on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl MemoryView {
    /// Build a view of the given record.
    pub fn new(memory: &ConversationMemory, editable: bool, settings: &MemorySettings) -> Self {
        Self {
            owner_char_id: memory.owner_char_id.clone(),
            editable,
            settings: settings.clone(),
            facts: memory.facts.clone(),
            updated_at: memory.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::fact::{FactBuilder, FactType};

    #[test]
    fn test_view_snapshot() {
        let mut memory = ConversationMemory::new();
        memory.owner_char_id = Some("char-1".to_string());
        memory.merge(vec![FactBuilder::new(FactType::PreferenceLike)
            .value("使用者喜歡：貓")
            .build()]);

        let view = MemoryView::new(&memory, true, &MemorySettings::default());
        assert_eq!(view.owner_char_id.as_deref(), Some("char-1"));
        assert!(view.editable);
        assert_eq!(view.facts.len(), 1);
    }

    #[test]
    fn test_view_wire_shape() {
        let memory = ConversationMemory::new();
        let view = MemoryView::new(&memory, false, &MemorySettings::default());
        let json = serde_json::to_value(&view).unwrap();

        assert!(json["ownerCharId"].is_null());
        assert_eq!(json["editable"], false);
        assert_eq!(json["settings"]["maxItems"], 12);
        assert!(json["updatedAt"].is_i64());
    }
}

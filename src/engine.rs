//! Orchestration of the memory pipeline
//!
//! `MemoryEngine` wires the gate, extractor, store and ranker together
//! behind the entry points the host calls: `observe_message` on every user
//! message, `injection_for` on every generation trigger, plus the manual
//! editor intents. The engine keeps the active conversation's record in
//! memory between events; a failed flush is logged and surfaced but the
//! in-memory record remains the source of truth until the next successful
//! flush.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::{default_extraction_rules, MemorySettings, RuleSpec};
use crate::error::Result;
use crate::memory::extractor::Extractor;
use crate::memory::fact::{FactBuilder, FactType};
use crate::memory::gate::{AccessGate, ConversationHandle};
use crate::memory::injection::build_injection;
use crate::memory::ranker::Ranker;
use crate::memory::repository::MemoryRepository;
use crate::memory::store::{parse_import, ConversationMemory, FactPatch};
use crate::view::MemoryView;

/// What a write-path call did. A gated no-op is distinguishable from a
/// merge that found nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The merge ran; counts may both be zero when nothing was extracted
    Applied { appended: usize, updated: usize },
    /// The handle does not own the record; nothing was mutated
    SkippedNotOwner,
    /// Memory or auto-extraction is disabled in settings
    SkippedDisabled,
}

/// A rendered injection block plus the context depth the host should place
/// it at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub text: String,
    pub depth: u32,
}

struct ActiveConversation {
    id: String,
    memory: ConversationMemory,
}

/// The memory core's host-facing engine.
pub struct MemoryEngine {
    settings: MemorySettings,
    extractor: Extractor,
    repo: Arc<dyn MemoryRepository>,
    active: Option<ActiveConversation>,
}

impl MemoryEngine {
    /// Create an engine with the builtin extraction rule table.
    pub fn new(settings: MemorySettings, repo: Arc<dyn MemoryRepository>) -> Result<Self> {
        Self::with_rules(settings, default_extraction_rules(), repo)
    }

    /// Create an engine with a custom rule table.
    pub fn with_rules(
        settings: MemorySettings,
        rules: Vec<RuleSpec>,
        repo: Arc<dyn MemoryRepository>,
    ) -> Result<Self> {
        Ok(Self {
            settings: settings.sanitized(),
            extractor: Extractor::new(rules)?,
            repo,
            active: None,
        })
    }

    /// Current settings.
    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Replace the settings (sanitized on the way in).
    pub fn update_settings(&mut self, settings: MemorySettings) {
        self.settings = settings.sanitized();
    }

    /// Take the record for the handle's conversation out of the engine,
    /// loading it (or creating a default) when it is not the active one.
    async fn checkout(&mut self, handle: &ConversationHandle) -> Result<ConversationMemory> {
        if let Some(active) = self.active.take() {
            if active.id == handle.conversation_id {
                return Ok(active.memory);
            }
        }
        Ok(self
            .repo
            .load(&handle.conversation_id)
            .await?
            .unwrap_or_default())
    }

    /// Put the record back as the active conversation, flushing it first
    /// when requested. The record is cached even when the flush fails.
    async fn checkin(
        &mut self,
        handle: &ConversationHandle,
        memory: ConversationMemory,
        flush: bool,
    ) -> Result<()> {
        let result = if flush {
            self.repo.save(&handle.conversation_id, &memory).await
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            tracing::warn!(
                "Memory flush failed for conversation {}: {} (in-memory record retained)",
                handle.conversation_id,
                e
            );
        }
        self.active = Some(ActiveConversation {
            id: handle.conversation_id.clone(),
            memory,
        });
        result
    }

    /// The message-received path: extract facts from a user utterance and
    /// merge them into the conversation's record.
    pub async fn observe_message(
        &mut self,
        handle: &ConversationHandle,
        text: &str,
    ) -> Result<WriteOutcome> {
        if !self.settings.enabled || !self.settings.auto_extract {
            return Ok(WriteOutcome::SkippedDisabled);
        }

        let mut memory = self.checkout(handle).await?;
        let locked_now = AccessGate::lock_owner(&mut memory, handle);
        if !AccessGate::is_owner(&memory, handle) {
            self.checkin(handle, memory, false).await?;
            return Ok(WriteOutcome::SkippedNotOwner);
        }

        let candidates = self.extractor.extract(text, &self.settings);
        let report = memory.merge(candidates);
        let outcome = WriteOutcome::Applied {
            appended: report.appended,
            updated: report.updated,
        };
        self.checkin(handle, memory, locked_now || report.changed())
            .await?;
        Ok(outcome)
    }

    /// The generation-trigger path: select and render the advisory block,
    /// or `None` when injection is disabled or not permitted for this
    /// handle.
    pub async fn injection_for(
        &mut self,
        handle: &ConversationHandle,
        last_user_text: &str,
    ) -> Result<Option<Injection>> {
        if !self.settings.enabled {
            return Ok(None);
        }

        let mut memory = self.checkout(handle).await?;
        let locked_now = AccessGate::lock_owner(&mut memory, handle);

        let injection = if AccessGate::may_inject(&memory, handle, &self.settings) {
            let selected = Ranker::select(&memory, last_user_text, &self.settings);
            Some(Injection {
                text: build_injection(&selected),
                depth: self.settings.depth,
            })
        } else {
            None
        };

        self.checkin(handle, memory, locked_now).await?;
        Ok(injection)
    }

    /// Editor intent: append a blank `other` fact for the user to fill in.
    /// Returns its id, or `None` when the handle may not write.
    pub async fn add_fact(&mut self, handle: &ConversationHandle) -> Result<Option<Uuid>> {
        let mut memory = self.checkout(handle).await?;
        AccessGate::lock_owner(&mut memory, handle);
        if !AccessGate::is_owner(&memory, handle) {
            self.checkin(handle, memory, false).await?;
            return Ok(None);
        }

        let blank = FactBuilder::new(FactType::Other).build();
        let key = blank.merge_key();
        memory.merge(vec![blank]);
        let id = memory.fact_by_key(&key).map(|f| f.id);
        self.checkin(handle, memory, true).await?;
        Ok(id)
    }

    /// Editor intent: apply a partial edit to a fact. Returns `false` when
    /// the handle may not write.
    pub async fn update_fact(
        &mut self,
        handle: &ConversationHandle,
        id: Uuid,
        patch: FactPatch,
    ) -> Result<bool> {
        let mut memory = self.checkout(handle).await?;
        let locked_now = AccessGate::lock_owner(&mut memory, handle);
        if !AccessGate::is_owner(&memory, handle) {
            self.checkin(handle, memory, false).await?;
            return Ok(false);
        }

        if let Err(e) = memory.update_fact(id, patch, self.settings.max_value_len) {
            self.checkin(handle, memory, locked_now).await?;
            return Err(e);
        }
        self.checkin(handle, memory, true).await?;
        Ok(true)
    }

    /// Editor intent: delete a fact by id. Returns `false` when the handle
    /// may not write or the fact does not exist.
    pub async fn delete_fact(&mut self, handle: &ConversationHandle, id: Uuid) -> Result<bool> {
        let mut memory = self.checkout(handle).await?;
        let locked_now = AccessGate::lock_owner(&mut memory, handle);
        if !AccessGate::is_owner(&memory, handle) {
            self.checkin(handle, memory, false).await?;
            return Ok(false);
        }

        let removed = memory.delete_fact(id).is_some();
        self.checkin(handle, memory, locked_now || removed).await?;
        Ok(removed)
    }

    /// Editor intent: delete every fact. Returns `false` when the handle
    /// may not write.
    pub async fn clear_facts(&mut self, handle: &ConversationHandle) -> Result<bool> {
        let mut memory = self.checkout(handle).await?;
        AccessGate::lock_owner(&mut memory, handle);
        if !AccessGate::is_owner(&memory, handle) {
            self.checkin(handle, memory, false).await?;
            return Ok(false);
        }

        memory.clear_facts();
        self.checkin(handle, memory, true).await?;
        Ok(true)
    }

    /// Export the conversation's record as pretty-printed JSON. Reading the
    /// record for export is not owner-gated.
    pub async fn export_json(&mut self, handle: &ConversationHandle) -> Result<String> {
        let memory = self.checkout(handle).await?;
        let json = serde_json::to_string_pretty(&memory)?;
        self.checkin(handle, memory, false).await?;
        Ok(json)
    }

    /// Import a record payload, replacing the conversation's fact list.
    /// Returns the number of imported facts, or `None` when the handle may
    /// not write. A malformed payload is rejected without mutation.
    pub async fn import_json(
        &mut self,
        handle: &ConversationHandle,
        payload: &str,
    ) -> Result<Option<usize>> {
        let mut memory = self.checkout(handle).await?;
        let locked_now = AccessGate::lock_owner(&mut memory, handle);
        if !AccessGate::is_owner(&memory, handle) {
            self.checkin(handle, memory, false).await?;
            return Ok(None);
        }

        let facts = match parse_import(payload, self.settings.max_value_len) {
            Ok(facts) => facts,
            Err(e) => {
                self.checkin(handle, memory, locked_now).await?;
                return Err(e);
            }
        };
        let count = facts.len();
        memory.replace_facts(facts);
        self.checkin(handle, memory, true).await?;
        Ok(Some(count))
    }

    /// Emit the view-model for the presentation layer.
    pub async fn view(&mut self, handle: &ConversationHandle) -> Result<MemoryView> {
        let mut memory = self.checkout(handle).await?;
        let locked_now = AccessGate::lock_owner(&mut memory, handle);
        let view = MemoryView::new(&memory, AccessGate::is_owner(&memory, handle), &self.settings);
        self.checkin(handle, memory, locked_now).await?;
        Ok(view)
    }
}

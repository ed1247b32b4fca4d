//! Access gate — the owner lock governing who may read or write a
//! conversation's memory
//!
//! Two states per record: unlocked (`owner_char_id == None`) and locked to
//! an owner. The lock transitions exactly once, at the first access where
//! the conversation is single-party and a persona id is available, and
//! never changes afterward. Multi-party conversations never own a record;
//! whether they may still *display* facts is a separate settings flag.

use crate::config::MemorySettings;
use crate::memory::store::ConversationMemory;

/// Identifies the conversation and persona a host event refers to.
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    /// Opaque conversation identifier, the persistence key
    pub conversation_id: String,
    /// Currently addressed persona, if any
    pub persona_id: Option<String>,
    /// Whether the conversation has more than one addressable persona
    pub is_multi_party: bool,
}

impl ConversationHandle {
    /// Convenience constructor for a single-party conversation.
    pub fn single(conversation_id: impl Into<String>, persona_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            persona_id: Some(persona_id.into()),
            is_multi_party: false,
        }
    }

    /// Convenience constructor for a multi-party conversation.
    pub fn multi_party(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            persona_id: None,
            is_multi_party: true,
        }
    }
}

/// Owner-lock state machine over a conversation record.
pub struct AccessGate;

impl AccessGate {
    /// Fire the one-time `Unlocked -> LockedToOwner` transition if the
    /// conditions hold. Returns whether the lock fired on this call.
    pub fn lock_owner(memory: &mut ConversationMemory, handle: &ConversationHandle) -> bool {
        if handle.is_multi_party || memory.owner_char_id.is_some() {
            return false;
        }
        match &handle.persona_id {
            Some(persona) => {
                memory.owner_char_id = Some(persona.clone());
                true
            }
            None => false,
        }
    }

    /// Whether the handle's persona owns the record. Unconditionally false
    /// in multi-party conversations and when no persona id is available.
    pub fn is_owner(memory: &ConversationMemory, handle: &ConversationHandle) -> bool {
        if handle.is_multi_party {
            return false;
        }
        match (&handle.persona_id, &memory.owner_char_id) {
            (Some(persona), Some(owner)) => persona == owner,
            _ => false,
        }
    }

    /// Whether facts may be rendered for injection under this handle.
    ///
    /// A multi-party conversation is never the owner but may be configured
    /// to display facts anyway; single-party injection requires ownership.
    pub fn may_inject(
        memory: &ConversationMemory,
        handle: &ConversationHandle,
        settings: &MemorySettings,
    ) -> bool {
        if handle.is_multi_party {
            settings.inject_in_groups
        } else {
            Self::is_owner(memory, handle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_fires_once() {
        let mut memory = ConversationMemory::new();
        let handle = ConversationHandle::single("conv-1", "char-1");

        assert!(AccessGate::lock_owner(&mut memory, &handle));
        assert_eq!(memory.owner_char_id.as_deref(), Some("char-1"));

        // repeated access with the same persona does not re-fire
        assert!(!AccessGate::lock_owner(&mut memory, &handle));
    }

    #[test]
    fn test_lock_never_stolen() {
        let mut memory = ConversationMemory::new();
        AccessGate::lock_owner(&mut memory, &ConversationHandle::single("conv-1", "char-1"));

        let intruder = ConversationHandle::single("conv-1", "char-2");
        assert!(!AccessGate::lock_owner(&mut memory, &intruder));
        assert_eq!(memory.owner_char_id.as_deref(), Some("char-1"));
        assert!(!AccessGate::is_owner(&memory, &intruder));
    }

    #[test]
    fn test_lock_requires_persona() {
        let mut memory = ConversationMemory::new();
        let handle = ConversationHandle {
            conversation_id: "conv-1".to_string(),
            persona_id: None,
            is_multi_party: false,
        };

        assert!(!AccessGate::lock_owner(&mut memory, &handle));
        assert!(memory.owner_char_id.is_none());
        assert!(!AccessGate::is_owner(&memory, &handle));
    }

    #[test]
    fn test_multi_party_never_locks_or_owns() {
        let mut memory = ConversationMemory::new();
        let mut handle = ConversationHandle::multi_party("conv-1");
        handle.persona_id = Some("char-1".to_string());

        assert!(!AccessGate::lock_owner(&mut memory, &handle));
        assert!(memory.owner_char_id.is_none());

        // even a persona that owns the record is not "owner" in a group
        memory.owner_char_id = Some("char-1".to_string());
        assert!(!AccessGate::is_owner(&memory, &handle));
    }

    #[test]
    fn test_owner_check() {
        let mut memory = ConversationMemory::new();
        let owner = ConversationHandle::single("conv-1", "char-1");
        AccessGate::lock_owner(&mut memory, &owner);

        assert!(AccessGate::is_owner(&memory, &owner));
        assert!(!AccessGate::is_owner(
            &memory,
            &ConversationHandle::single("conv-1", "char-2")
        ));
    }

    #[test]
    fn test_may_inject_single_party() {
        let mut memory = ConversationMemory::new();
        let owner = ConversationHandle::single("conv-1", "char-1");
        AccessGate::lock_owner(&mut memory, &owner);
        let settings = MemorySettings::default();

        assert!(AccessGate::may_inject(&memory, &owner, &settings));
        assert!(!AccessGate::may_inject(
            &memory,
            &ConversationHandle::single("conv-1", "char-2"),
            &settings
        ));
    }

    #[test]
    fn test_may_inject_multi_party_follows_flag() {
        let memory = ConversationMemory::new();
        let handle = ConversationHandle::multi_party("conv-1");

        let default = MemorySettings::default();
        assert!(!AccessGate::may_inject(&memory, &handle, &default));

        let permissive = MemorySettings {
            inject_in_groups: true,
            ..Default::default()
        };
        assert!(AccessGate::may_inject(&memory, &handle, &permissive));
    }
}

//! char-knowledge — per-conversation persona memory
//!
//! char-knowledge maintains a persona-scoped memory of typed facts inferred
//! from a user's messages and selects a bounded, relevant subset to inject
//! as advisory context before each response generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MemoryEngine                          │
//! │                                                              │
//! │  user message ──► Access Gate ──► Extractor ──► Merge/Upsert │
//! │                   (owner lock)    (rule table)       │       │
//! │                                                      ▼       │
//! │                                           ConversationMemory │
//! │                                                      │       │
//! │  generation  ──► Access Gate ──► Ranker ──► Injection│Builder│
//! │  trigger         (+group flag)  (bounded)   ({{char}}│block) │
//! └──────────────────────────────────────────────────────┼───────┘
//!                                                        │
//!                                     MemoryRepository (load/save)
//! ```
//!
//! The host owns the event bus, the settings UI and prompt assembly; the
//! engine exposes `observe_message`, `injection_for`, the manual editor
//! intents, and a view-model for display. Facts are deduplicated by their
//! `(type, lowercase(value))` merge key; each conversation's record is
//! locked to the first single-party persona that accesses it.
//!
//! ## Modules
//!
//! - [`engine`]: host-facing orchestration of the pipeline
//! - [`memory`]: extraction, store, gate, ranker, injection, repository
//! - [`config`]: settings and the builtin extraction rule table
//! - [`view`]: presentation-facing snapshot of a conversation's memory
//! - [`normalize`]: text normalization and tokenization primitives

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod view;

pub use config::{default_extraction_rules, MemorySettings, RuleSpec};
pub use engine::{Injection, MemoryEngine, WriteOutcome};
pub use error::{Error, Result};
pub use memory::{
    ConversationHandle, ConversationMemory, Fact, FactPatch, FactStatus, FactType,
    FileMemoryRepository, InMemoryRepository, MemoryRepository,
};
pub use view::MemoryView;

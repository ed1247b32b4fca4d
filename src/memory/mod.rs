//! Memory core — extraction, store, gating, ranking and rendering
//!
//! The pipeline for one conversation: a user utterance passes the access
//! gate, the extractor turns it into candidate facts, merge reconciles the
//! candidates into the per-conversation record, and on each generation
//! trigger the ranker selects a bounded subset that the injection builder
//! renders for the host.

pub mod extractor;
pub mod fact;
pub mod gate;
pub mod injection;
pub mod ranker;
pub mod repository;
pub mod store;

pub use extractor::Extractor;
pub use fact::{Fact, FactStatus, FactType};
pub use gate::{AccessGate, ConversationHandle};
pub use injection::build_injection;
pub use ranker::Ranker;
pub use repository::{FileMemoryRepository, InMemoryRepository, MemoryRepository};
pub use store::{ConversationMemory, FactPatch, MergeReport};

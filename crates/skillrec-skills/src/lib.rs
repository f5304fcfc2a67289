//! Skill records, SKILL.md parsing, directory ingestion and skill stores.

pub mod error;
pub mod export;
pub mod ingest;
pub mod loader;
pub mod skill;
pub mod store;

pub use error::{SkillError, StoreError};
pub use export::export_skill_document;
pub use ingest::{IngestMode, IngestOptions, IngestReport, ingest};
pub use loader::{DocumentContext, load_skill, parse_skill_document};
pub use skill::{Skill, TypeGroup};
pub use store::{BoxFuture, InMemorySkillStore, SkillStore, StoreStats, UsageCount};

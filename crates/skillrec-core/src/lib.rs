//! Skill recommendation engine: request model, ranking strategies, orchestration.

pub mod alternatives;
pub mod config;
pub mod error;
pub mod explain;
pub mod orchestrator;
pub mod prerequisites;
pub mod recommendation;
pub mod session;
pub mod strategy;

pub use alternatives::{Alternative, AlternativeFinder, AlternativeKind, AlternativeSet};
pub use config::Config;
pub use error::EngineError;
pub use explain::{MatchStrength, ScoreExplanation};
pub use orchestrator::{EngineSettings, Recommender};
pub use prerequisites::{
    Prerequisite, PrerequisiteChecker, PrerequisiteReport, PrerequisiteStatus, PrerequisiteSummary,
};
pub use recommendation::{Method, Recommendation, RecommendationRequest, RecommendationResponse};
pub use session::{RecommendationSession, SessionState};
pub use strategy::{KeywordStrategy, LlmStrategy, RankingStrategy};

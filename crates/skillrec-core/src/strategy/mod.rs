//! Ranking strategies behind one recommendation contract.

pub mod keyword;
pub mod llm;

use std::future::Future;

use skillrec_skills::Skill;

use crate::error::EngineError;
use crate::recommendation::{Method, Recommendation};

pub use keyword::KeywordStrategy;
pub use llm::LlmStrategy;

pub trait RankingStrategy: Send + Sync {
    /// Rank `skills` against the query. Output order is not significant; the caller sorts.
    ///
    /// # Errors
    ///
    /// Returns an error when the strategy cannot evaluate the query at all. Finding no
    /// relevant skill is an empty `Ok`.
    fn rank(
        &self,
        query: &str,
        skills: &[Skill],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Recommendation>, EngineError>> + Send;

    fn method(&self) -> Method;
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use skillrec_llm::{AnyProvider, ChatOptions, LlmProvider};
use skillrec_skills::{Skill, SkillStore};
use tokio_util::sync::CancellationToken;

use crate::alternatives::{AlternativeFinder, AlternativeSet};
use crate::error::EngineError;
use crate::explain::ScoreExplanation;
use crate::prerequisites::{PrerequisiteChecker, PrerequisiteReport};
use crate::recommendation::{Recommendation, RecommendationRequest, RecommendationResponse};
use crate::strategy::llm::DEFAULT_LLM_TIMEOUT;
use crate::strategy::{KeywordStrategy, LlmStrategy, RankingStrategy};

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;
/// Upper bound on problem text length, in characters.
pub const MAX_PROBLEM_CHARS: usize = 2000;

/// Tunables shared by every request.
#[derive(Clone, Copy, Debug)]
pub struct EngineSettings {
    pub default_limit: usize,
    pub llm_timeout: Duration,
    pub chat: ChatOptions,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            chat: ChatOptions::default(),
        }
    }
}

/// A request that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub text: String,
    pub limit: usize,
}

/// Check the problem text and resolve the effective limit.
///
/// # Errors
///
/// Returns [`EngineError::InvalidQuery`] for blank or oversized text and for `limit == 0`.
pub fn validate_request(
    request: &RecommendationRequest,
    default_limit: usize,
) -> Result<ValidatedQuery, EngineError> {
    let text = request.problem_text.trim();
    if text.is_empty() {
        return Err(EngineError::InvalidQuery("problem text is required".into()));
    }
    let chars = request.problem_text.chars().count();
    if chars > MAX_PROBLEM_CHARS {
        return Err(EngineError::InvalidQuery(format!(
            "problem text is {chars} characters, the maximum is {MAX_PROBLEM_CHARS}"
        )));
    }
    let limit = match request.limit {
        Some(0) => return Err(EngineError::InvalidQuery("limit must be at least 1".into())),
        Some(n) => n.min(MAX_LIMIT),
        None => default_limit.clamp(1, MAX_LIMIT),
    };
    Ok(ValidatedQuery {
        text: text.to_owned(),
        limit,
    })
}

/// Attach full skill records by id. Unknown ids stay un-enriched.
fn enrich(recommendations: &mut [Recommendation], skills: &[Skill]) {
    let by_id: HashMap<&str, &Skill> = skills.iter().map(|s| (s.id.as_str(), s)).collect();
    for rec in recommendations {
        match by_id.get(rec.skill_id.as_str()) {
            Some(skill) => {
                if rec.skill_name.is_empty() {
                    rec.skill_name.clone_from(&skill.name);
                }
                rec.skill = Some((*skill).clone());
            }
            None => {
                tracing::warn!(skill = %rec.skill_id, "recommended skill not found in store");
                if rec.skill_name.is_empty() {
                    rec.skill_name.clone_from(&rec.skill_id);
                }
            }
        }
    }
}

async fn until_cancelled<F>(
    cancel: &CancellationToken,
    work: F,
) -> Result<RecommendationResponse, EngineError>
where
    F: Future<Output = Result<RecommendationResponse, EngineError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(EngineError::Cancelled),
        result = work => result,
    }
}

/// Single entry point for recommendations.
///
/// With a credential-bearing LLM config the LLM strategy runs and its failures are returned
/// as errors; there is no silent downgrade. Without one, keyword ranking runs.
pub struct Recommender {
    store: Arc<dyn SkillStore>,
    keyword: KeywordStrategy,
    settings: EngineSettings,
}

impl Recommender {
    #[must_use]
    pub fn new(store: Arc<dyn SkillStore>) -> Self {
        Self {
            store,
            keyword: KeywordStrategy::default(),
            settings: EngineSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SkillStore> {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// # Errors
    ///
    /// See [`EngineError`]; an empty result is not an error.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, EngineError> {
        let query = validate_request(request, self.settings.default_limit)?;

        match request.llm_config.as_ref().filter(|c| c.has_credential()) {
            Some(config) => {
                let provider = AnyProvider::from_config(config, self.settings.llm_timeout)?;
                tracing::info!(
                    provider = provider.name(),
                    model = provider.model(),
                    "recommending with LLM"
                );
                self.execute(query, &self.llm_strategy(provider)).await
            }
            None => self.execute(query, &self.keyword).await,
        }
    }

    /// Like [`Self::recommend`], but gives up as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] if cancelled before a result arrived.
    pub async fn recommend_cancellable(
        &self,
        request: &RecommendationRequest,
        cancel: &CancellationToken,
    ) -> Result<RecommendationResponse, EngineError> {
        until_cancelled(cancel, self.recommend(request)).await
    }

    /// [`Self::recommend_with_provider`] that gives up as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] if cancelled before a result arrived.
    pub async fn recommend_with_provider_cancellable<P: LlmProvider>(
        &self,
        request: &RecommendationRequest,
        provider: P,
        cancel: &CancellationToken,
    ) -> Result<RecommendationResponse, EngineError> {
        until_cancelled(cancel, self.recommend_with_provider(request, provider)).await
    }

    /// Run the LLM strategy with a caller-built provider, ignoring `llm_config`.
    ///
    /// # Errors
    ///
    /// See [`EngineError`].
    pub async fn recommend_with_provider<P: LlmProvider>(
        &self,
        request: &RecommendationRequest,
        provider: P,
    ) -> Result<RecommendationResponse, EngineError> {
        let query = validate_request(request, self.settings.default_limit)?;
        self.execute(query, &self.llm_strategy(provider)).await
    }

    /// Break down the keyword score `skill_id` gets for `problem_text`.
    ///
    /// Returns `None` when no such skill is stored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidQuery`] for blank or oversized text, or a store failure.
    pub async fn explain(
        &self,
        problem_text: &str,
        skill_id: &str,
    ) -> Result<Option<ScoreExplanation>, EngineError> {
        let query = validate_request(&RecommendationRequest::new(problem_text), 1)?;
        let skills = self.store.get_all().await?;
        Ok(ScoreExplanation::keyword(
            &query.text,
            &skills,
            skill_id,
            self.keyword.params(),
        ))
    }

    /// Up to `max` alternatives to `skill_id`, or `None` when no such skill is stored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreUnavailable`] when the catalog cannot be read.
    pub async fn alternatives(
        &self,
        skill_id: &str,
        max: usize,
    ) -> Result<Option<AlternativeSet>, EngineError> {
        let skills = self.store.get_all().await?;
        let finder = AlternativeFinder::new(&skills);
        Ok(skills
            .iter()
            .find(|s| s.id == skill_id)
            .map(|primary| finder.find(primary, max)))
    }

    /// Resolve the prerequisites of `skill_id` against the stored catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreUnavailable`] when the catalog cannot be read.
    pub async fn check_prerequisites(
        &self,
        skill_id: &str,
    ) -> Result<Option<PrerequisiteReport>, EngineError> {
        let skills = self.store.get_all().await?;
        let checker = PrerequisiteChecker::new(&skills);
        Ok(skills
            .iter()
            .find(|s| s.id == skill_id)
            .map(|skill| checker.check(skill)))
    }

    fn llm_strategy<P: LlmProvider>(&self, provider: P) -> LlmStrategy<P> {
        LlmStrategy::new(provider)
            .with_options(self.settings.chat)
            .with_timeout(self.settings.llm_timeout)
    }

    async fn execute<S: RankingStrategy>(
        &self,
        query: ValidatedQuery,
        strategy: &S,
    ) -> Result<RecommendationResponse, EngineError> {
        let skills = self.store.get_all().await?;
        tracing::debug!(
            skills = skills.len(),
            method = %strategy.method(),
            limit = query.limit,
            "ranking"
        );

        let mut recommendations = strategy.rank(&query.text, &skills, query.limit).await?;
        enrich(&mut recommendations, &skills);
        recommendations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        recommendations.truncate(query.limit);

        Ok(RecommendationResponse {
            recommendations,
            method: strategy.method(),
            query: query.text,
        })
    }
}

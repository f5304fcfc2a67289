use std::fmt;

use serde::{Deserialize, Serialize};
use skillrec_llm::LlmConfig;
use skillrec_skills::Skill;

/// Which ranking strategy produced a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "llm")]
    Llm,
    #[serde(rename = "keyword-matching")]
    KeywordMatching,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::KeywordMatching => "keyword-matching",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked skill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub skill_id: String,
    pub skill_name: String,
    pub reason: String,
    /// In `[0, 1]`; higher is more relevant regardless of strategy.
    pub confidence: f64,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<Skill>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub method: Method,
    pub query: String,
}

impl RecommendationResponse {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Input to the engine.
///
/// `llmConfig` with a non-empty key selects LLM matching; otherwise keyword matching runs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(alias = "problem_text")]
    pub problem_text: String,
    #[serde(default, alias = "llm_config", skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<LlmConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RecommendationRequest {
    #[must_use]
    pub fn new(problem_text: impl Into<String>) -> Self {
        Self {
            problem_text: problem_text.into(),
            llm_config: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_llm(mut self, config: LlmConfig) -> Self {
        self.llm_config = Some(config);
        self
    }

    /// The strategy this request will run with.
    #[must_use]
    pub fn planned_method(&self) -> Method {
        if self
            .llm_config
            .as_ref()
            .is_some_and(LlmConfig::has_credential)
        {
            Method::Llm
        } else {
            Method::KeywordMatching
        }
    }
}

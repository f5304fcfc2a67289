//! Semantic ranking through an LLM provider.

use std::fmt::Write;
use std::time::Duration;

use serde::Deserialize;
use skillrec_llm::{ChatOptions, LlmError, LlmProvider, Message};
use skillrec_skills::Skill;

use super::RankingStrategy;
use crate::error::EngineError;
use crate::recommendation::{Method, Recommendation};

/// Model-reported matches below this confidence are dropped.
pub const MIN_LLM_CONFIDENCE: f64 = 0.3;

pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_INSTRUCTION: &str = "\
You are an expert at matching problems to reusable skills.
Given the user's problem description and the skill catalog below, select between 1 and 5 \
skills that are most relevant. Only use skill ids that appear in the catalog.

Respond with a single JSON object and nothing else, in exactly this shape:
{\"recommendations\": [{\"skill_id\": \"...\", \"skill_name\": \"...\", \"reason\": \"...\", \
\"confidence\": 0.0, \"suggestions\": [\"...\"]}]}

confidence is a number between 0 and 1. suggestions are 1 to 3 short, actionable next steps.";

/// Which stage of response parsing produced the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStage {
    /// The whole response was valid JSON.
    Direct,
    /// JSON was recovered from a fenced code block.
    FencedBlock,
}

/// Expected model output. `recommendations` is required: an object without it is not an
/// empty answer.
#[derive(Debug, Deserialize)]
pub struct ModelResponse {
    pub recommendations: Vec<ModelRecommendation>,
}

#[derive(Debug, Deserialize)]
pub struct ModelRecommendation {
    #[serde(default, alias = "skillId")]
    pub skill_id: String,
    #[serde(default, alias = "skillName")]
    pub skill_name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Render every skill into the catalog section of the prompt.
#[must_use]
pub fn build_catalog(skills: &[Skill]) -> String {
    let mut out = String::new();
    for skill in skills {
        let _ = writeln!(out, "- id: {}", skill.id);
        let _ = writeln!(out, "  name: {}", skill.name);
        let _ = writeln!(out, "  category: {}", skill.category);
        if !skill.description.is_empty() {
            let _ = writeln!(out, "  description: {}", skill.description);
        }
        if !skill.tags.is_empty() {
            let tags: Vec<&str> = skill.tags.iter().map(String::as_str).collect();
            let _ = writeln!(out, "  tags: {}", tags.join(", "));
        }
        if !skill.use_cases.is_empty() {
            let _ = writeln!(out, "  use cases: {}", skill.use_cases.join("; "));
        }
    }
    out
}

#[must_use]
pub fn build_messages(problem_text: &str, skills: &[Skill]) -> Vec<Message> {
    let system = format!(
        "{SYSTEM_INSTRUCTION}\n\nSkill catalog ({} skills):\n{}",
        skills.len(),
        build_catalog(skills)
    );
    vec![Message::system(system), Message::user(problem_text)]
}

/// Contents of the first fenced code block, preferring one tagged `json`.
#[must_use]
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```json").or_else(|| text.find("```"))?;
    let after_fence = &text[start + 3..];
    // skip the info string (`json`, `JSON`, ...); the body may follow it on the same line
    let line_end = after_fence.find('\n');
    let json_start = after_fence.find(['{', '[']);
    let body_start = match (json_start, line_end) {
        (Some(open), Some(newline)) if open < newline => open,
        (_, Some(newline)) => newline + 1,
        (Some(open), None) => open,
        (None, None) => 0,
    };
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Interpret model output: the whole text as JSON first, then the first fenced block.
///
/// # Errors
///
/// Returns [`EngineError::UnparsableModelResponse`] when neither stage yields the expected
/// shape.
pub fn parse_model_response(text: &str) -> Result<(ModelResponse, ParseStage), EngineError> {
    let direct_err = match serde_json::from_str::<ModelResponse>(text.trim()) {
        Ok(parsed) => return Ok((parsed, ParseStage::Direct)),
        Err(e) => e,
    };

    let Some(block) = extract_fenced_block(text) else {
        return Err(EngineError::UnparsableModelResponse(format!(
            "{direct_err}; no fenced JSON block found"
        )));
    };

    serde_json::from_str::<ModelResponse>(block)
        .map(|parsed| (parsed, ParseStage::FencedBlock))
        .map_err(|fenced_err| {
            EngineError::UnparsableModelResponse(format!(
                "{direct_err}; fenced block: {fenced_err}"
            ))
        })
}

/// Clamp, filter and convert model entries. Entries without an id are dropped.
#[must_use]
pub fn accept_recommendations(response: ModelResponse) -> Vec<Recommendation> {
    response
        .recommendations
        .into_iter()
        .filter_map(|rec| {
            let skill_id = rec.skill_id.trim().to_owned();
            if skill_id.is_empty() || !rec.confidence.is_finite() {
                return None;
            }
            let confidence = rec.confidence.clamp(0.0, 1.0);
            if confidence < MIN_LLM_CONFIDENCE {
                tracing::debug!(skill = %skill_id, confidence, "dropping low-confidence match");
                return None;
            }
            Some(Recommendation {
                skill_name: rec.skill_name.trim().to_owned(),
                skill_id,
                reason: rec.reason,
                confidence,
                suggestions: rec
                    .suggestions
                    .into_iter()
                    .filter(|s| !s.trim().is_empty())
                    .collect(),
                skill: None,
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct LlmStrategy<P> {
    provider: P,
    options: ChatOptions,
    timeout: Duration,
}

impl<P: LlmProvider> LlmStrategy<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: ChatOptions::default(),
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<P: LlmProvider> RankingStrategy for LlmStrategy<P> {
    async fn rank(
        &self,
        query: &str,
        skills: &[Skill],
        _limit: usize,
    ) -> Result<Vec<Recommendation>, EngineError> {
        if skills.is_empty() {
            tracing::debug!("empty skill catalog, skipping LLM call");
            return Ok(Vec::new());
        }

        let messages = build_messages(query, skills);
        let provider = self.provider.name();

        let completion =
            match tokio::time::timeout(self.timeout, self.provider.chat(&messages, &self.options))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        provider,
                        timeout_secs = self.timeout.as_secs(),
                        "LLM request timed out"
                    );
                    return Err(LlmError::Timeout { provider }.into());
                }
            };

        if let Some(usage) = completion.usage {
            tracing::debug!(
                provider,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "LLM usage"
            );
        }

        let (parsed, stage) = parse_model_response(&completion.content)?;
        if stage == ParseStage::FencedBlock {
            tracing::debug!(provider, "model response recovered from fenced block");
        }

        Ok(accept_recommendations(parsed))
    }

    fn method(&self) -> Method {
        Method::Llm
    }
}

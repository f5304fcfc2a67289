//! Breakdown of why a skill received its confidence.

use serde::Serialize;
use skillrec_skills::Skill;

use crate::recommendation::{Method, Recommendation};
use crate::strategy::keyword::{
    Bm25Params, KeywordIndex, TermContribution, keyword_confidence, query_terms, reason_for,
};

/// Coarse reading of a confidence value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    Excellent,
    Good,
    Moderate,
    Weak,
}

impl MatchStrength {
    #[must_use]
    pub fn for_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Self::Excellent
        } else if confidence >= 0.6 {
            Self::Good
        } else if confidence >= 0.4 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent match, highly recommended",
            Self::Good => "Good match, a suitable choice",
            Self::Moderate => "Moderate match, may work with some adjustments",
            Self::Weak => "Weak match, consider alternatives",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExplanation {
    pub skill_id: String,
    pub skill_name: String,
    pub method: Method,
    pub confidence: f64,
    /// Unbounded keyword relevance before mapping into a confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_score: Option<f64>,
    pub matched_terms: Vec<TermContribution>,
    pub unmatched_terms: Vec<String>,
    pub reason: String,
    pub strength: MatchStrength,
    pub interpretation: &'static str,
}

impl ScoreExplanation {
    /// Explain a recommendation that was already produced, e.g. by the LLM strategy.
    ///
    /// Only the model-reported confidence and reason are available here.
    #[must_use]
    pub fn from_recommendation(rec: &Recommendation, method: Method) -> Self {
        let strength = MatchStrength::for_confidence(rec.confidence);
        Self {
            skill_id: rec.skill_id.clone(),
            skill_name: rec.skill_name.clone(),
            method,
            confidence: rec.confidence,
            raw_score: None,
            matched_terms: Vec::new(),
            unmatched_terms: Vec::new(),
            reason: rec.reason.clone(),
            strength,
            interpretation: strength.describe(),
        }
    }

    /// Recompute the keyword score of `skill_id` against `skills` term by term.
    ///
    /// Returns `None` when the skill is not part of `skills`. A skill sharing no term with the
    /// query gets confidence 0, since keyword ranking would not return it at all.
    #[must_use]
    pub fn keyword(
        query: &str,
        skills: &[Skill],
        skill_id: &str,
        params: Bm25Params,
    ) -> Option<Self> {
        let idx = skills.iter().position(|s| s.id == skill_id)?;
        let skill = &skills[idx];
        let terms = query_terms(query);
        let index = KeywordIndex::build(skills, params);
        let matched_terms = index.term_contributions(idx, &terms);
        let unmatched_terms = terms
            .iter()
            .filter(|t| !matched_terms.iter().any(|c| &c.term == *t))
            .cloned()
            .collect();

        let (raw_score, confidence, reason) = if matched_terms.is_empty() {
            (
                0.0,
                0.0,
                "No keyword from the problem appears in this skill".to_owned(),
            )
        } else {
            let raw: f64 = matched_terms.iter().map(|c| c.score).sum();
            (raw, keyword_confidence(raw), reason_for(skill))
        };
        let strength = MatchStrength::for_confidence(confidence);

        Some(Self {
            skill_id: skill.id.clone(),
            skill_name: skill.name.clone(),
            method: Method::KeywordMatching,
            confidence,
            raw_score: Some(raw_score),
            matched_terms,
            unmatched_terms,
            reason,
            strength,
            interpretation: strength.describe(),
        })
    }
}

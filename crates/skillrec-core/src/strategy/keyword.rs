//! Deterministic keyword ranking: BM25 over name, description and tags.

use std::collections::HashMap;

use serde::Serialize;
use skillrec_skills::Skill;

use super::RankingStrategy;
use crate::error::EngineError;
use crate::recommendation::{Method, Recommendation};

/// Query tokens shorter than this are treated as noise.
pub const MIN_TOKEN_CHARS: usize = 3;

const CONFIDENCE_BASE: f64 = 0.3;
const CONFIDENCE_SCALE: f64 = 0.5;
/// Keyword matches never claim more than this.
pub const CONFIDENCE_CEILING: f64 = 0.8;

const SUGGESTIONS_FROM_USE_CASES: usize = 2;
const GENERIC_SUGGESTION: &str = "Review the skill documentation to see how it applies to your problem";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

fn long_enough(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_CHARS
}

/// Split a query into unique search terms.
///
/// Lowercases, splits on whitespace and drops short tokens. Surviving tokens are split again
/// on punctuation (`t-test` → `test`) so they line up with indexed terms.
#[must_use]
pub fn query_terms(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut terms: Vec<String> = Vec::new();
    for token in lower.split_whitespace().filter(|t| long_enough(t)) {
        for term in token
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| long_enough(t))
        {
            if !terms.iter().any(|t| t == term) {
                terms.push(term.to_owned());
            }
        }
    }
    terms
}

fn document_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// One query term's share of a document's score.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermContribution {
    pub term: String,
    pub term_frequency: u32,
    pub idf: f64,
    pub score: f64,
}

#[derive(Debug)]
struct DocStats {
    term_freq: HashMap<String, u32>,
    len: usize,
}

/// Inverted statistics for one snapshot of the skill set.
#[derive(Debug)]
pub struct KeywordIndex {
    docs: Vec<DocStats>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
    params: Bm25Params,
}

impl KeywordIndex {
    #[must_use]
    pub fn build(skills: &[Skill], params: Bm25Params) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        let docs: Vec<DocStats> = skills
            .iter()
            .map(|skill| {
                let mut term_freq: HashMap<String, u32> = HashMap::new();
                let mut len = 0usize;
                for term in document_terms(&skill.search_text()) {
                    *term_freq.entry(term).or_insert(0) += 1;
                    len += 1;
                }
                for term in term_freq.keys() {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
                total_len += len;
                DocStats { term_freq, len }
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let avg_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };

        Self {
            docs,
            doc_freq,
            avg_len,
            params,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Per-term BM25 scores for document `idx`, in query order. Absent terms are skipped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn term_contributions(&self, idx: usize, terms: &[String]) -> Vec<TermContribution> {
        let Some(doc) = self.docs.get(idx) else {
            return Vec::new();
        };
        let Bm25Params { k1, b } = self.params;
        let norm = if self.avg_len > 0.0 {
            1.0 - b + b * doc.len as f64 / self.avg_len
        } else {
            1.0
        };
        terms
            .iter()
            .filter_map(|term| {
                let &term_frequency = doc.term_freq.get(term)?;
                let tf = f64::from(term_frequency);
                let idf = self.idf(term);
                Some(TermContribution {
                    term: term.clone(),
                    term_frequency,
                    idf,
                    score: idf * tf * (k1 + 1.0) / (tf + k1 * norm),
                })
            })
            .collect()
    }

    /// Documents matching at least one term, best first. Equal scores keep index order.
    #[must_use]
    pub fn search(&self, terms: &[String]) -> Vec<(usize, f64)> {
        let mut hits: Vec<(usize, f64)> = (0..self.docs.len())
            .filter_map(|idx| {
                let contributions = self.term_contributions(idx, terms);
                (!contributions.is_empty())
                    .then(|| (idx, contributions.iter().map(|c| c.score).sum::<f64>()))
            })
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits
    }
}

/// Map a raw relevance score into `[0.3, 0.8]`.
#[must_use]
pub fn keyword_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return CONFIDENCE_BASE;
    }
    (CONFIDENCE_BASE + raw.max(0.0) * CONFIDENCE_SCALE).min(CONFIDENCE_CEILING)
}

fn suggestions_for(skill: &Skill) -> Vec<String> {
    if skill.use_cases.is_empty() {
        vec![GENERIC_SUGGESTION.to_owned()]
    } else {
        skill
            .use_cases
            .iter()
            .take(SUGGESTIONS_FROM_USE_CASES)
            .cloned()
            .collect()
    }
}

pub(crate) fn reason_for(skill: &Skill) -> String {
    format!(
        "Matches keywords from your problem ({} skill)",
        skill.category.replace('_', " ")
    )
}

#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordStrategy {
    params: Bm25Params,
}

impl KeywordStrategy {
    #[must_use]
    pub fn new(params: Bm25Params) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Synchronous ranking, used directly by benchmarks.
    #[must_use]
    pub fn rank_skills(&self, query: &str, skills: &[Skill], limit: usize) -> Vec<Recommendation> {
        let terms = query_terms(query);
        if terms.is_empty() {
            tracing::debug!("no keyword terms in query");
            return Vec::new();
        }

        let index = KeywordIndex::build(skills, self.params);
        let hits = index.search(&terms);
        tracing::debug!(terms = terms.len(), hits = hits.len(), "keyword ranking");

        hits.into_iter()
            .take(limit)
            .map(|(idx, raw)| {
                let skill = &skills[idx];
                Recommendation {
                    skill_id: skill.id.clone(),
                    skill_name: skill.name.clone(),
                    reason: reason_for(skill),
                    confidence: keyword_confidence(raw),
                    suggestions: suggestions_for(skill),
                    skill: None,
                }
            })
            .collect()
    }
}

impl RankingStrategy for KeywordStrategy {
    async fn rank(
        &self,
        query: &str,
        skills: &[Skill],
        limit: usize,
    ) -> Result<Vec<Recommendation>, EngineError> {
        Ok(self.rank_skills(query, skills, limit))
    }

    fn method(&self) -> Method {
        Method::KeywordMatching
    }
}

//! Other skills worth considering next to a recommended one.

use std::collections::HashSet;

use serde::Serialize;
use skillrec_skills::Skill;

/// Well-known substitutes, keyed by a fragment of the primary skill's id.
const METHOD_ALTERNATIVES: &[(&str, &[&str])] = &[
    ("t-test", &["mann-whitney", "wilcoxon", "bootstrap"]),
    ("anova", &["kruskal-wallis", "bootstrap"]),
    (
        "linear-regression",
        &["polynomial-regression", "generalized-linear-model", "decision-tree"],
    ),
    ("correlation", &["spearman", "kendall", "mutual-information"]),
    ("chi-square", &["fisher-exact", "bootstrap"]),
];

const SIMPLER_MARKERS: &[&str] = &["simple", "basic", "easy", "quick", "introductory"];
const ADVANCED_MARKERS: &[&str] = &["advanced", "sophisticated", "complex", "robust", "enhanced"];
const VISUAL_MARKERS: &[&str] = &["plot", "graph", "chart", "visualiz"];

const MAX_SIMILAR: usize = 3;
const MAX_PER_KIND: usize = 2;

pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeKind {
    SimilarMethod,
    SimplerAlternative,
    MoreAdvanced,
    DifferentApproach,
    Complementary,
}

impl AlternativeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SimilarMethod => "similar_method",
            Self::SimplerAlternative => "simpler_alternative",
            Self::MoreAdvanced => "more_advanced",
            Self::DifferentApproach => "different_approach",
            Self::Complementary => "complementary",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub skill_id: String,
    pub skill_name: String,
    pub kind: AlternativeKind,
    pub similarity: f64,
    pub confidence: f64,
    pub advantages: Vec<String>,
    pub disadvantages: Vec<String>,
    pub use_when: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeSet {
    pub primary_id: String,
    pub primary_name: String,
    pub alternatives: Vec<Alternative>,
    /// Alternatives found before truncation.
    pub total_found: usize,
    pub reasoning: String,
}

/// Structural closeness of two skills in `[0, 1]`.
///
/// Category match 0.3, 0.15 per shared tag up to 0.3, any shared dependency 0.2 and the same
/// type group 0.2.
#[must_use]
pub fn similarity(a: &Skill, b: &Skill) -> f64 {
    let mut score = 0.0;
    if a.category == b.category {
        score += 0.3;
    }
    let shared_tags = a.tags.intersection(&b.tags).count();
    #[allow(clippy::cast_precision_loss)]
    {
        score += (shared_tags as f64 * 0.15).min(0.3);
    }
    if a.dependencies.iter().any(|d| b.dependencies.contains(d)) {
        score += 0.2;
    }
    if a.type_group == b.type_group {
        score += 0.2;
    }
    f64::min(score, 1.0)
}

fn mentions_any(skill: &Skill, markers: &[&str]) -> bool {
    let text = format!("{} {}", skill.id, skill.description).to_lowercase();
    markers.iter().any(|m| text.contains(m))
}

fn advantages(candidate: &Skill, primary: &Skill) -> Vec<String> {
    let mut out = Vec::new();
    if candidate.dependencies.len() < primary.dependencies.len() {
        out.push("Fewer dependencies".to_owned());
    }
    if candidate.use_cases.len() > primary.use_cases.len() {
        out.push("More use cases".to_owned());
    }
    if out.is_empty() {
        out.push("Different approach".to_owned());
    }
    out
}

fn disadvantages(candidate: &Skill, primary: &Skill) -> Vec<String> {
    let mut out = Vec::new();
    if candidate.dependencies.len() > primary.dependencies.len() {
        out.push("More dependencies".to_owned());
    }
    if candidate.use_cases.len() < primary.use_cases.len() {
        out.push("Fewer documented use cases".to_owned());
    }
    if out.is_empty() {
        out.push("Different approach".to_owned());
    }
    out
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Searches a skill snapshot for alternatives to a primary skill.
pub struct AlternativeFinder<'a> {
    skills: &'a [Skill],
}

impl<'a> AlternativeFinder<'a> {
    #[must_use]
    pub fn new(skills: &'a [Skill]) -> Self {
        Self { skills }
    }

    fn candidates<'s>(&'s self, primary: &'s Skill) -> impl Iterator<Item = &'a Skill> + 's {
        self.skills.iter().filter(move |s| s.id != primary.id)
    }

    fn alternative(
        candidate: &Skill,
        primary: &Skill,
        kind: AlternativeKind,
        similarity: f64,
        confidence: f64,
    ) -> Alternative {
        let (advantages, disadvantages, use_when) = match kind {
            AlternativeKind::SimilarMethod => (
                advantages(candidate, primary),
                disadvantages(candidate, primary),
                strings(&["Similar requirements", "Alternative approach needed"]),
            ),
            AlternativeKind::DifferentApproach => (
                advantages(candidate, primary),
                disadvantages(candidate, primary),
                strings(&["Different perspective", "Verify results"]),
            ),
            AlternativeKind::SimplerAlternative => (
                strings(&["Easier to understand", "Faster computation", "Fewer assumptions"]),
                strings(&["Less powerful", "May miss nuanced patterns"]),
                strings(&["Simplicity is prioritized", "Quick results needed", "Learning stage"]),
            ),
            AlternativeKind::MoreAdvanced => (
                strings(&["More powerful", "Handles edge cases", "Better accuracy"]),
                strings(&["More complex", "Slower computation", "Requires more data"]),
                strings(&["High accuracy needed", "Complex data patterns", "Expert users"]),
            ),
            AlternativeKind::Complementary => (
                strings(&["Visual representation", "Better communication", "Pattern detection"]),
                strings(&["Additional step", "Requires visualization libraries"]),
                strings(&["Need to present results", "Explore data visually", "Create reports"]),
            ),
        };
        Alternative {
            skill_id: candidate.id.clone(),
            skill_name: candidate.name.clone(),
            kind,
            similarity,
            confidence,
            advantages,
            disadvantages,
            use_when,
        }
    }

    fn similar_methods(&self, primary: &Skill) -> Vec<Alternative> {
        let primary_id = primary.id.to_lowercase();
        let mut out = Vec::new();

        for (method, substitutes) in METHOD_ALTERNATIVES {
            if !primary_id.contains(method) {
                continue;
            }
            for substitute in *substitutes {
                for skill in self.candidates(primary) {
                    if skill.id.to_lowercase().contains(substitute) {
                        out.push(Self::alternative(
                            skill,
                            primary,
                            AlternativeKind::SimilarMethod,
                            similarity(primary, skill),
                            0.8,
                        ));
                    }
                }
            }
        }

        for skill in self.candidates(primary) {
            if skill.category == primary.category && skill.tags.intersection(&primary.tags).count() >= 2
            {
                out.push(Self::alternative(
                    skill,
                    primary,
                    AlternativeKind::SimilarMethod,
                    similarity(primary, skill),
                    0.7,
                ));
            }
        }

        out.truncate(MAX_SIMILAR);
        out
    }

    fn marked(
        &self,
        primary: &Skill,
        markers: &[&str],
        kind: AlternativeKind,
        weight: f64,
        confidence: f64,
    ) -> Vec<Alternative> {
        self.candidates(primary)
            .filter(|s| s.type_group == primary.type_group && mentions_any(s, markers))
            .take(MAX_PER_KIND)
            .map(|s| Self::alternative(s, primary, kind, similarity(primary, s) * weight, confidence))
            .collect()
    }

    fn different_approaches(&self, primary: &Skill) -> Vec<Alternative> {
        self.candidates(primary)
            .filter(|s| s.type_group == primary.type_group)
            .filter_map(|s| {
                let sim = similarity(primary, s);
                (0.3..=0.6).contains(&sim).then(|| {
                    Self::alternative(s, primary, AlternativeKind::DifferentApproach, sim, 0.65)
                })
            })
            .take(MAX_PER_KIND)
            .collect()
    }

    fn complementary(&self, primary: &Skill) -> Vec<Alternative> {
        if primary.category != "statistical_method" {
            return Vec::new();
        }
        self.candidates(primary)
            .filter(|s| mentions_any(s, VISUAL_MARKERS))
            .take(MAX_PER_KIND)
            .map(|s| Self::alternative(s, primary, AlternativeKind::Complementary, 0.5, 0.8))
            .collect()
    }

    /// Collect every kind of alternative, most similar first, keeping at most `max`.
    ///
    /// A skill may appear once per kind.
    #[must_use]
    pub fn find(&self, primary: &Skill, max: usize) -> AlternativeSet {
        let mut found = self.similar_methods(primary);
        found.extend(self.marked(
            primary,
            SIMPLER_MARKERS,
            AlternativeKind::SimplerAlternative,
            0.8,
            0.75,
        ));
        found.extend(self.marked(
            primary,
            ADVANCED_MARKERS,
            AlternativeKind::MoreAdvanced,
            0.9,
            0.7,
        ));
        found.extend(self.different_approaches(primary));
        found.extend(self.complementary(primary));

        let mut seen = HashSet::new();
        found.retain(|alt| seen.insert((alt.skill_id.clone(), alt.kind)));
        found.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let total_found = found.len();
        let reasoning = reasoning(primary, &found);
        found.truncate(max);
        tracing::debug!(skill = %primary.id, total_found, kept = found.len(), "alternatives");

        AlternativeSet {
            primary_id: primary.id.clone(),
            primary_name: primary.name.clone(),
            alternatives: found,
            total_found,
            reasoning,
        }
    }
}

fn reasoning(primary: &Skill, found: &[Alternative]) -> String {
    if found.is_empty() {
        return format!("No alternatives found for {}", primary.name);
    }
    let mut counts: Vec<(AlternativeKind, usize)> = Vec::new();
    for alt in found {
        match counts.iter_mut().find(|(kind, _)| *kind == alt.kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((alt.kind, 1)),
        }
    }
    let kinds: Vec<String> = counts
        .iter()
        .map(|(kind, n)| format!("{} ({n})", kind.as_str()))
        .collect();
    format!(
        "Found {} alternatives for {}: {}",
        found.len(),
        primary.name,
        kinds.join(", ")
    )
}

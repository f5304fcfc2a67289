//! Whether the skills a skill builds on are present in the catalog.

use std::collections::HashMap;

use serde::Serialize;
use skillrec_skills::Skill;
use skillrec_skills::skill::title_from_id;

const MAX_SIMILAR_IDS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisiteStatus {
    Satisfied,
    /// Not present, but a skill with a related id is.
    Partial,
    Missing,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prerequisite {
    pub skill_id: String,
    pub skill_name: String,
    pub description: String,
    pub status: PrerequisiteStatus,
    pub confidence: f64,
    /// Inferred from the skill's category or id rather than declared.
    pub implied: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteReport {
    pub skill_id: String,
    pub skill_name: String,
    pub prerequisites: Vec<Prerequisite>,
    pub warnings: Vec<String>,
}

impl PrerequisiteReport {
    #[must_use]
    pub fn all_satisfied(&self) -> bool {
        self.prerequisites
            .iter()
            .all(|p| p.status == PrerequisiteStatus::Satisfied)
    }

    fn count(&self, status: PrerequisiteStatus) -> usize {
        self.prerequisites.iter().filter(|p| p.status == status).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteSummary {
    pub skills_checked: usize,
    pub fully_satisfied: usize,
    pub with_missing: usize,
    pub total_prerequisites: usize,
    pub missing: usize,
    pub partial: usize,
}

/// Resolves declared and implied prerequisites against a skill snapshot.
pub struct PrerequisiteChecker<'a> {
    by_id: HashMap<&'a str, &'a Skill>,
    skills: &'a [Skill],
}

impl<'a> PrerequisiteChecker<'a> {
    #[must_use]
    pub fn new(skills: &'a [Skill]) -> Self {
        Self {
            by_id: skills.iter().map(|s| (s.id.as_str(), s)).collect(),
            skills,
        }
    }

    /// Statistical methods build on descriptive statistics; regressions build on correlation.
    fn implied_for(&self, skill: &Skill) -> Vec<&'a str> {
        let mut implied = Vec::new();
        let mut first_matching = |fragments: &[&str]| {
            if let Some(found) = self
                .skills
                .iter()
                .find(|s| s.id != skill.id && fragments.iter().any(|f| s.id.contains(f)))
            {
                implied.push(found.id.as_str());
            }
        };
        if skill.category == "statistical_method" {
            first_matching(&["descriptive", "summary"]);
        }
        if skill.id.contains("regression") {
            first_matching(&["correlation"]);
        }
        implied
    }

    fn resolve(&self, id: &str, implied: bool) -> Prerequisite {
        if let Some(skill) = self.by_id.get(id) {
            return Prerequisite {
                skill_id: id.to_owned(),
                skill_name: skill.name.clone(),
                description: skill.description.clone(),
                status: PrerequisiteStatus::Satisfied,
                confidence: 1.0,
                implied,
            };
        }

        let similar: Vec<&str> = self
            .skills
            .iter()
            .map(|s| s.id.as_str())
            .filter(|other| other.contains(id) || id.contains(other))
            .take(MAX_SIMILAR_IDS)
            .collect();
        if similar.is_empty() {
            Prerequisite {
                skill_id: id.to_owned(),
                skill_name: title_from_id(id),
                description: "Not available in the catalog".to_owned(),
                status: PrerequisiteStatus::Missing,
                confidence: 0.0,
                implied,
            }
        } else {
            Prerequisite {
                skill_id: id.to_owned(),
                skill_name: title_from_id(id),
                description: format!("Similar to: {}", similar.join(", ")),
                status: PrerequisiteStatus::Partial,
                confidence: 0.5,
                implied,
            }
        }
    }

    /// Check one skill's declared prerequisites followed by the implied ones it does not declare.
    #[must_use]
    pub fn check(&self, skill: &Skill) -> PrerequisiteReport {
        let mut prerequisites: Vec<Prerequisite> = skill
            .prerequisites
            .iter()
            .map(|id| self.resolve(id, false))
            .collect();
        for id in self.implied_for(skill) {
            if !skill.prerequisites.iter().any(|p| p == id) {
                prerequisites.push(self.resolve(id, true));
            }
        }

        let mut report = PrerequisiteReport {
            skill_id: skill.id.clone(),
            skill_name: skill.name.clone(),
            prerequisites,
            warnings: Vec::new(),
        };
        let missing = report.count(PrerequisiteStatus::Missing);
        if missing > 0 {
            report
                .warnings
                .push(format!("Missing {missing} prerequisite(s)"));
        }
        let partial = report.count(PrerequisiteStatus::Partial);
        if partial > 0 {
            report
                .warnings
                .push(format!("{partial} prerequisite(s) only partially available"));
        }
        report
    }

    #[must_use]
    pub fn check_all(&self) -> Vec<PrerequisiteReport> {
        self.skills.iter().map(|s| self.check(s)).collect()
    }

    /// Skills from `candidates` whose prerequisites are met.
    ///
    /// With `require_all` every prerequisite must be satisfied; otherwise only missing ones
    /// disqualify a skill.
    #[must_use]
    pub fn ready<'s>(&self, candidates: &'s [Skill], require_all: bool) -> Vec<&'s Skill> {
        candidates
            .iter()
            .filter(|skill| {
                let report = self.check(skill);
                if require_all {
                    report.all_satisfied()
                } else {
                    report.count(PrerequisiteStatus::Missing) == 0
                }
            })
            .collect()
    }

    #[must_use]
    pub fn summarize(&self) -> PrerequisiteSummary {
        let mut summary = PrerequisiteSummary::default();
        for report in self.check_all() {
            summary.skills_checked += 1;
            if report.all_satisfied() {
                summary.fully_satisfied += 1;
            }
            let missing = report.count(PrerequisiteStatus::Missing);
            if missing > 0 {
                summary.with_missing += 1;
            }
            summary.total_prerequisites += report.prerequisites.len();
            summary.missing += missing;
            summary.partial += report.count(PrerequisiteStatus::Partial);
        }
        summary
    }
}

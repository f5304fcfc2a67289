use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "general";

/// Categories whose skills describe a way of solving a problem rather than a piece of code.
const PROBLEM_SOLVING_CATEGORIES: &[&str] = &["statistical_method", "data_analysis", "visualization"];

/// Display grouping for skills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeGroup {
    #[default]
    ProblemSolving,
    Programming,
}

impl TypeGroup {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProblemSolving => "problem_solving",
            Self::Programming => "programming",
        }
    }

    /// Derive the group from a normalized category.
    #[must_use]
    pub fn for_category(category: &str) -> Self {
        if PROBLEM_SOLVING_CATEGORIES.contains(&category) {
            Self::ProblemSolving
        } else {
            Self::Programming
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match normalize_category(value).as_str() {
            "problem_solving" => Some(Self::ProblemSolving),
            "programming" => Some(Self::Programming),
            _ => None,
        }
    }
}

impl fmt::Display for TypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable capability definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub type_group: TypeGroup,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Ids of skills that should be understood first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_hash: String,
}

impl Skill {
    /// Build a skill with the mandatory identity fields; everything else starts empty.
    ///
    /// The category is normalized and the type group derived from it.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: &str) -> Self {
        let category = normalize_category(category);
        let category = if category.is_empty() {
            DEFAULT_CATEGORY.to_owned()
        } else {
            category
        };
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            type_group: TypeGroup::for_category(&category),
            category,
            tags: BTreeSet::new(),
            use_cases: Vec::new(),
            dependencies: Vec::new(),
            prerequisites: Vec::new(),
            source_content: None,
            source_path: None,
            content_hash: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_use_cases<I, S>(mut self, use_cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.use_cases = use_cases.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    /// Text indexed by keyword ranking: name, description and tags.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(self.name.len() + self.description.len() + 32);
        text.push_str(&self.name);
        text.push(' ');
        text.push_str(&self.description);
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag);
        }
        text
    }
}

/// Lowercase a category and fold `-` and whitespace into `_`.
#[must_use]
pub fn normalize_category(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c == '-' || c.is_whitespace() {
                '_'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Turn a folder name into a stable identifier: lowercase ASCII alphanumerics joined by `-`.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Turn an identifier like `t-test_means` into a display title (`T Test Means`).
#[must_use]
pub fn title_from_id(id: &str) -> String {
    id.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

use std::path::Path;

use serde::Deserialize;

use crate::error::SkillError;
use crate::skill::{
    DEFAULT_CATEGORY, Skill, TypeGroup, normalize_category, slugify, title_from_id,
};

/// Where a document came from; supplies the fallbacks the front matter may omit.
#[derive(Clone, Debug, Default)]
pub struct DocumentContext {
    /// Folder (or other identifier) the document lives in. Used for `id` and `name` fallbacks.
    pub folder: String,
    /// Caller-supplied category, typically the containing directory name.
    pub category: Option<String>,
    pub source_path: Option<String>,
}

impl DocumentContext {
    #[must_use]
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::One(s) => s.split(',').map(str::to_owned).collect(),
            Self::Many(v) => v,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    type_group: Option<String>,
    tags: Option<StringList>,
    use_cases: Option<StringList>,
    dependencies: Option<StringList>,
    prerequisites: Option<StringList>,
    license: Option<String>,
    compatibility: Option<serde_yaml::Value>,
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).trim_end() == "---"
}

/// Split a document into its front-matter block and body.
///
/// The first line must be `---`; the block ends at the next `---` line. LF and CRLF
/// line endings are both accepted.
///
/// # Errors
///
/// Returns [`SkillError::MissingFrontMatter`] or [`SkillError::UnclosedFrontMatter`].
pub fn split_front_matter(raw: &str) -> Result<(&str, &str), SkillError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = text.split_inclusive('\n');

    let first = lines.next().ok_or(SkillError::MissingFrontMatter)?;
    if !is_delimiter(first) {
        return Err(SkillError::MissingFrontMatter);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            return Ok((&text[yaml_start..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(SkillError::UnclosedFrontMatter)
}

fn parse_front_matter(yaml: &str) -> Result<FrontMatter, SkillError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Heuristic tags for documents that carry none: the license and the compatibility note.
fn fallback_tags(license: Option<&str>, compatibility: Option<&serde_yaml::Value>) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(license) = license {
        let tag = slugify(license);
        if !tag.is_empty() {
            tags.push(tag);
        }
    }
    match compatibility {
        Some(serde_yaml::Value::Bool(true)) => tags.push("compatible".to_owned()),
        Some(serde_yaml::Value::String(s)) => {
            let tag = slugify(s);
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
        _ => {}
    }
    tags
}

/// Convert one raw skill document into a [`Skill`].
///
/// The full text is kept verbatim in `source_content`.
///
/// # Errors
///
/// Returns an error if the front-matter block is missing, unclosed or not a valid mapping,
/// or if no identifier can be derived.
pub fn parse_skill_document(raw: &str, ctx: &DocumentContext) -> Result<Skill, SkillError> {
    let (yaml, _body) = split_front_matter(raw)?;
    let fm = parse_front_matter(yaml)?;

    let id = non_empty(fm.id).unwrap_or_else(|| slugify(&ctx.folder));
    if id.is_empty() {
        return Err(SkillError::Invalid(
            "cannot derive a skill id from front matter or folder".into(),
        ));
    }

    let name = non_empty(fm.name).unwrap_or_else(|| {
        let title = title_from_id(&ctx.folder);
        if title.is_empty() { id.clone() } else { title }
    });

    let category = non_empty(fm.category)
        .or_else(|| non_empty(ctx.category.clone()))
        .map(|c| normalize_category(&c))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned());

    let type_group = match fm.type_group.as_deref() {
        Some(raw_group) => TypeGroup::parse(raw_group).unwrap_or_else(|| {
            tracing::warn!(skill = %id, "unknown type_group '{raw_group}', deriving from category");
            TypeGroup::for_category(&category)
        }),
        None => TypeGroup::for_category(&category),
    };

    let mut tags: Vec<String> = fm.tags.map(StringList::into_vec).unwrap_or_default();
    if tags.is_empty() {
        tags = fallback_tags(fm.license.as_deref(), fm.compatibility.as_ref());
    }

    let mut skill = Skill::new(id, name, &category)
        .with_description(fm.description.unwrap_or_default().trim())
        .with_tags(tags)
        .with_use_cases(fm.use_cases.map(StringList::into_vec).unwrap_or_default());
    skill.type_group = type_group;
    skill.dependencies = fm.dependencies.map(StringList::into_vec).unwrap_or_default();
    skill.prerequisites = fm
        .prerequisites
        .map(StringList::into_vec)
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .map(slugify)
        .filter(|p| !p.is_empty() && *p != skill.id)
        .collect();
    skill.content_hash = blake3::hash(raw.as_bytes()).to_hex().to_string();
    skill.source_content = Some(raw.to_owned());
    skill.source_path.clone_from(&ctx.source_path);

    Ok(skill)
}

/// Load a skill from a SKILL.md file.
///
/// The folder containing the file supplies the id fallback.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the document is rejected.
pub fn load_skill(path: &Path, category: Option<&str>) -> Result<Skill, SkillError> {
    let raw = std::fs::read_to_string(path)?;
    let folder = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let ctx = DocumentContext {
        folder: folder.to_owned(),
        category: category.map(str::to_owned),
        source_path: Some(path.display().to_string()),
    };
    parse_skill_document(&raw, &ctx)
}

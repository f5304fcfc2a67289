use std::collections::BTreeSet;
use std::fmt::Write;

use serde::Serialize;

use crate::error::SkillError;
use crate::skill::{Skill, TypeGroup};

#[derive(Serialize)]
struct ExportFrontMatter<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    category: &'a str,
    type_group: TypeGroup,
    #[serde(skip_serializing_if = "set_is_empty")]
    tags: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "slice_is_empty")]
    use_cases: &'a [String],
    #[serde(skip_serializing_if = "slice_is_empty")]
    dependencies: &'a [String],
    #[serde(skip_serializing_if = "slice_is_empty")]
    prerequisites: &'a [String],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn set_is_empty(set: &&BTreeSet<String>) -> bool {
    set.is_empty()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn slice_is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

/// Render a skill back into a SKILL.md document.
///
/// Skills that were ingested from a document return its original text unchanged.
/// Others get a synthesized front matter followed by a title and the description.
///
/// # Errors
///
/// Returns an error if the front matter cannot be serialized.
pub fn export_skill_document(skill: &Skill) -> Result<String, SkillError> {
    if let Some(ref source) = skill.source_content {
        return Ok(source.clone());
    }

    let fm = ExportFrontMatter {
        id: &skill.id,
        name: &skill.name,
        description: &skill.description,
        category: &skill.category,
        type_group: skill.type_group,
        tags: &skill.tags,
        use_cases: &skill.use_cases,
        dependencies: &skill.dependencies,
        prerequisites: &skill.prerequisites,
    };
    let yaml = serde_yaml::to_string(&fm)?;

    let mut out = String::with_capacity(yaml.len() + skill.description.len() + 32);
    out.push_str("---\n");
    out.push_str(&yaml);
    out.push_str("---\n\n");
    let _ = writeln!(out, "# {}", skill.name);
    if !skill.description.is_empty() {
        let _ = write!(out, "\n{}\n", skill.description);
    }
    Ok(out)
}

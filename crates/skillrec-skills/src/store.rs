use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use serde::Serialize;

use crate::error::StoreError;
use crate::skill::{Skill, TypeGroup, normalize_category};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Totals per category, ordered by category name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
}

impl StoreStats {
    #[must_use]
    pub fn from_skills(skills: &[Skill]) -> Self {
        let mut categories = BTreeMap::new();
        for skill in skills {
            *categories.entry(skill.category.clone()).or_insert(0) += 1;
        }
        Self {
            total: skills.len(),
            categories,
        }
    }
}

/// How many skills share one tag or dependency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UsageCount {
    pub name: String,
    pub skills: usize,
}

/// Count values across skills, most used first. Equal counts are ordered by name.
fn count_usage<'a, I>(values: I) -> Vec<UsageCount>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    let mut usage: Vec<UsageCount> = counts
        .into_iter()
        .map(|(name, skills)| UsageCount {
            name: name.to_owned(),
            skills,
        })
        .collect();
    usage.sort_by(|a, b| b.skills.cmp(&a.skills));
    usage
}

/// Holds every known skill and resolves them by id.
///
/// Implementations must make `upsert` atomic per record: a concurrent reader sees either the
/// previous version of a skill or the new one, never a mix.
pub trait SkillStore: Send + Sync {
    /// Insert the skill or replace the one sharing its id.
    fn upsert(&self, skill: Skill) -> BoxFuture<'_, Result<(), StoreError>>;

    /// All skills ordered by name ascending (ties broken by id).
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<Skill>, StoreError>>;

    fn get_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Skill>, StoreError>>;

    /// Returns `true` if a skill was removed.
    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, StoreError>>;

    fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move {
            let category = normalize_category(category);
            let skills = self.get_all().await?;
            Ok(skills
                .into_iter()
                .filter(|s| s.category == category)
                .collect())
        })
    }

    fn by_tag<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move {
            let skills = self.get_all().await?;
            Ok(skills
                .into_iter()
                .filter(|s| s.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
                .collect())
        })
    }

    fn by_type_group(&self, group: TypeGroup) -> BoxFuture<'_, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move {
            let skills = self.get_all().await?;
            Ok(skills.into_iter().filter(|s| s.type_group == group).collect())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>> {
        Box::pin(async move {
            let skills = self.get_all().await?;
            Ok(StoreStats::from_skills(&skills))
        })
    }

    /// The `limit` most common tags.
    fn top_tags(&self, limit: usize) -> BoxFuture<'_, Result<Vec<UsageCount>, StoreError>> {
        Box::pin(async move {
            let skills = self.get_all().await?;
            let mut usage = count_usage(skills.iter().flat_map(|s| s.tags.iter()));
            usage.truncate(limit);
            Ok(usage)
        })
    }

    /// Every declared dependency with the number of skills needing it.
    fn dependencies_summary(&self) -> BoxFuture<'_, Result<Vec<UsageCount>, StoreError>> {
        Box::pin(async move {
            let skills = self.get_all().await?;
            // a skill listing a dependency twice still counts once
            let per_skill: Vec<BTreeSet<&String>> = skills
                .iter()
                .map(|s| s.dependencies.iter().collect())
                .collect();
            Ok(count_usage(per_skill.into_iter().flatten()))
        })
    }
}

/// Sort skills the way every store returns them.
pub fn sort_by_name(skills: &mut [Skill]) {
    skills.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

/// Process-local store, used for tests and the `memory` backend.
pub struct InMemorySkillStore {
    skills: RwLock<HashMap<String, Skill>>,
}

impl InMemorySkillStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            skills: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_skills(skills: impl IntoIterator<Item = Skill>) -> Self {
        let map = skills.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            skills: RwLock::new(map),
        }
    }
}

impl Default for InMemorySkillStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemorySkillStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySkillStore").finish_non_exhaustive()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl SkillStore for InMemorySkillStore {
    fn upsert(&self, skill: Skill) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut skills = self.skills.write().map_err(poisoned)?;
            skills.insert(skill.id.clone(), skill);
            Ok(())
        })
    }

    fn get_all(&self) -> BoxFuture<'_, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move {
            let mut all: Vec<Skill> = self
                .skills
                .read()
                .map_err(poisoned)?
                .values()
                .cloned()
                .collect();
            sort_by_name(&mut all);
            Ok(all)
        })
    }

    fn get_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Skill>, StoreError>> {
        Box::pin(async move { Ok(self.skills.read().map_err(poisoned)?.get(id).cloned()) })
    }

    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move { Ok(self.skills.write().map_err(poisoned)?.remove(id).is_some()) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn skill(id: &str, name: &str, category: &str) -> Skill {
        Skill::new(id, name, category)
    }

    #[tokio::test]
    async fn get_all_ordered_by_name() {
        let store = InMemorySkillStore::new();
        store.upsert(skill("z", "Zeta", "algorithm")).await.unwrap();
        store.upsert(skill("a", "Alpha", "algorithm")).await.unwrap();
        store.upsert(skill("m", "Mu", "algorithm")).await.unwrap();

        let names: Vec<_> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Mu", "Zeta"]);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemorySkillStore::new();
        store.upsert(skill("a", "Old", "algorithm")).await.unwrap();
        store.upsert(skill("a", "New", "algorithm")).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "New");
    }

    #[tokio::test]
    async fn get_by_id_missing_is_none() {
        let store = InMemorySkillStore::new();
        assert!(store.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = InMemorySkillStore::with_skills([skill("a", "A", "algorithm")]);
        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
    }

    #[tokio::test]
    async fn filters_and_stats() {
        let store = InMemorySkillStore::with_skills([
            skill("t", "T-Test", "statistical_method").with_tags(["Hypothesis_Testing"]),
            skill("f", "Fibonacci", "algorithm"),
            skill("k", "K-Means", "algorithm"),
        ]);

        let algos = store.by_category("Algorithm").await.unwrap();
        assert_eq!(algos.len(), 2);

        let tagged = store.by_tag("hypothesis_testing").await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, "t");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.categories.get("algorithm"), Some(&2));
        assert_eq!(stats.categories.get("statistical_method"), Some(&1));
    }

    #[tokio::test]
    async fn type_group_filter() {
        let mut custom = skill("p", "Plotting Helpers", "algorithm");
        custom.type_group = TypeGroup::ProblemSolving;
        let store = InMemorySkillStore::with_skills([
            skill("t", "T-Test", "statistical_method"),
            skill("f", "Fibonacci", "algorithm"),
            custom,
        ]);

        let ids: Vec<_> = store
            .by_type_group(TypeGroup::ProblemSolving)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["p", "t"]);

        let programming = store.by_type_group(TypeGroup::Programming).await.unwrap();
        assert_eq!(programming.len(), 1);
        assert_eq!(programming[0].id, "f");
    }

    #[tokio::test]
    async fn top_tags_most_used_first() {
        let store = InMemorySkillStore::with_skills([
            skill("a", "A", "algorithm").with_tags(["sorting", "arrays"]),
            skill("b", "B", "algorithm").with_tags(["arrays", "search"]),
            skill("c", "C", "algorithm").with_tags(["arrays", "sorting", "graphs"]),
        ]);

        let top = store.top_tags(3).await.unwrap();
        assert_eq!(
            top,
            vec![
                UsageCount { name: "arrays".into(), skills: 3 },
                UsageCount { name: "sorting".into(), skills: 2 },
                UsageCount { name: "graphs".into(), skills: 1 },
            ]
        );
        assert!(store.top_tags(0).await.unwrap().is_empty());
        assert!(InMemorySkillStore::new().top_tags(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dependencies_counted_once_per_skill() {
        let store = InMemorySkillStore::with_skills([
            skill("a", "A", "statistical_method").with_dependencies(["scipy", "numpy", "scipy"]),
            skill("b", "B", "statistical_method").with_dependencies(["numpy"]),
            skill("c", "C", "algorithm"),
        ]);

        let deps = store.dependencies_summary().await.unwrap();
        assert_eq!(
            deps,
            vec![
                UsageCount { name: "numpy".into(), skills: 2 },
                UsageCount { name: "scipy".into(), skills: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_records() {
        let store = Arc::new(InMemorySkillStore::new());
        store
            .upsert(skill("s", "v0", "algorithm").with_description("v0"))
            .await
            .unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 1..50 {
                    let v = format!("v{i}");
                    store
                        .upsert(skill("s", &v, "algorithm").with_description(v.clone()))
                        .await
                        .unwrap();
                }
            })
        };

        for _ in 0..50 {
            let s = store.get_by_id("s").await.unwrap().unwrap();
            assert_eq!(s.name, s.description);
        }
        writer.await.unwrap();
    }
}

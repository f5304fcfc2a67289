use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use skillrec_skills::store::{BoxFuture, SkillStore, StoreStats};
use skillrec_skills::{Skill, StoreError, TypeGroup};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::MemoryError;

const SELECT_COLUMNS: &str = "SELECT id, name, description, category, type_group, tags, \
     use_cases, dependencies, prerequisites, source_content, source_path, content_hash FROM skills";

type SkillTuple = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
);

fn skill_from_tuple(t: SkillTuple) -> Result<Skill, MemoryError> {
    let (
        id,
        name,
        description,
        category,
        type_group,
        tags,
        use_cases,
        dependencies,
        prerequisites,
        source_content,
        source_path,
        content_hash,
    ) = t;

    let type_group = TypeGroup::parse(&type_group).ok_or_else(|| MemoryError::CorruptRow {
        id: id.clone(),
        reason: format!("unknown type_group '{type_group}'"),
    })?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags)?;
    let use_cases: Vec<String> = serde_json::from_str(&use_cases)?;
    let dependencies: Vec<String> = serde_json::from_str(&dependencies)?;
    let prerequisites: Vec<String> = serde_json::from_str(&prerequisites)?;

    Ok(Skill {
        id,
        name,
        description,
        category,
        type_group,
        tags,
        use_cases,
        dependencies,
        prerequisites,
        source_content,
        source_path,
        content_hash,
    })
}

/// Durable skill store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the `SQLite` database and run migrations.
    ///
    /// `:memory:` opens a private in-memory database on a single connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let mut opts = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
        if !in_memory {
            opts = opts
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;
        tracing::debug!(path, "skill database ready");

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a skill in one statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn upsert_skill(&self, skill: &Skill) -> Result<(), MemoryError> {
        let tags = serde_json::to_string(&skill.tags)?;
        let use_cases = serde_json::to_string(&skill.use_cases)?;
        let dependencies = serde_json::to_string(&skill.dependencies)?;
        let prerequisites = serde_json::to_string(&skill.prerequisites)?;

        sqlx::query(
            "INSERT INTO skills (id, name, description, category, type_group, tags, use_cases, \
             dependencies, prerequisites, source_content, source_path, content_hash) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, \
             description = excluded.description, \
             category = excluded.category, \
             type_group = excluded.type_group, \
             tags = excluded.tags, \
             use_cases = excluded.use_cases, \
             dependencies = excluded.dependencies, \
             prerequisites = excluded.prerequisites, \
             source_content = excluded.source_content, \
             source_path = excluded.source_path, \
             content_hash = excluded.content_hash, \
             updated_at = datetime('now')",
        )
        .bind(&skill.id)
        .bind(&skill.name)
        .bind(&skill.description)
        .bind(&skill.category)
        .bind(skill.type_group.as_str())
        .bind(tags)
        .bind(use_cases)
        .bind(dependencies)
        .bind(prerequisites)
        .bind(skill.source_content.as_deref())
        .bind(skill.source_path.as_deref())
        .bind(&skill.content_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load every skill ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn load_skills(&self) -> Result<Vec<Skill>, MemoryError> {
        let rows: Vec<SkillTuple> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY name ASC, id ASC"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(skill_from_tuple).collect()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn load_skill(&self, id: &str) -> Result<Option<Skill>, MemoryError> {
        let row: Option<SkillTuple> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(skill_from_tuple).transpose()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn load_skills_by_category(&self, category: &str) -> Result<Vec<Skill>, MemoryError> {
        let rows: Vec<SkillTuple> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE category = ? ORDER BY name ASC, id ASC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(skill_from_tuple).collect()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn load_skills_by_type_group(
        &self,
        group: TypeGroup,
    ) -> Result<Vec<Skill>, MemoryError> {
        let rows: Vec<SkillTuple> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE type_group = ? ORDER BY name ASC, id ASC"
        ))
        .bind(group.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(skill_from_tuple).collect()
    }

    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete_skill(&self, id: &str) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM skills WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn category_counts(&self) -> Result<StoreStats, MemoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM skills GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        let categories: BTreeMap<String, usize> = rows
            .into_iter()
            .map(|(category, n)| (category, usize::try_from(n).unwrap_or_default()))
            .collect();
        Ok(StoreStats {
            total: categories.values().sum(),
            categories,
        })
    }
}

impl SkillStore for SqliteStore {
    fn upsert(&self, skill: Skill) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move { Ok(self.upsert_skill(&skill).await?) })
    }

    fn get_all(&self) -> BoxFuture<'_, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move { Ok(self.load_skills().await?) })
    }

    fn get_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Skill>, StoreError>> {
        Box::pin(async move { Ok(self.load_skill(id).await?) })
    }

    fn remove<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move { Ok(self.delete_skill(id).await?) })
    }

    fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move {
            let category = skillrec_skills::skill::normalize_category(category);
            Ok(self.load_skills_by_category(&category).await?)
        })
    }

    fn by_type_group(&self, group: TypeGroup) -> BoxFuture<'_, Result<Vec<Skill>, StoreError>> {
        Box::pin(async move { Ok(self.load_skills_by_type_group(group).await?) })
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, StoreError>> {
        Box::pin(async move { Ok(self.category_counts().await?) })
    }
}

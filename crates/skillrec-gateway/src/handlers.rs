use std::collections::BTreeSet;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use skillrec_core::alternatives::DEFAULT_MAX_ALTERNATIVES;
use skillrec_core::{EngineError, RecommendationRequest};
use skillrec_skills::{Skill, SkillStore, StoreError, TypeGroup, export_skill_document};

use super::server::AppState;

/// Error body shared by every non-2xx JSON response.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("skill '{id}' not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("recommendation failed: {e}");
        }
        Self::new(status, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!("skill store error: {e}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // body limit overflow keeps its 413; every other decoding problem is the caller's 400
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, rejection.body_text())
    }
}

/// Listing entry; the full record is served by `/skills/{id}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillSummary {
    id: String,
    name: String,
    description: String,
    category: String,
    type_group: TypeGroup,
    tags: BTreeSet<String>,
}

impl From<Skill> for SkillSummary {
    fn from(skill: Skill) -> Self {
        Self {
            id: skill.id,
            name: skill.name,
            description: skill.description,
            category: skill.category,
            type_group: skill.type_group,
            tags: skill.tags,
        }
    }
}

#[derive(Serialize)]
struct SkillList {
    total: usize,
    skills: Vec<SkillSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SkillFilter {
    category: Option<String>,
    tag: Option<String>,
    #[serde(rename = "typeGroup", alias = "type_group")]
    type_group: Option<String>,
}

const DEFAULT_TOP_TAGS: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TagsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AlternativesQuery {
    max: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExplainRequest {
    problem_text: String,
    skill_id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    skills: Option<usize>,
}

pub(crate) async fn recommend_handler(
    State(state): State<AppState>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(mut request) = payload?;
    if request.llm_config.is_none() {
        request.llm_config.clone_from(&state.default_llm);
    }
    let response = state.engine.recommend(&request).await?;
    tracing::info!(
        method = %response.method,
        results = response.recommendations.len(),
        "recommendation served"
    );
    Ok(Json(response).into_response())
}

pub(crate) async fn list_skills_handler(
    State(state): State<AppState>,
    Query(filter): Query<SkillFilter>,
) -> Result<Response, ApiError> {
    let type_group = filter
        .type_group
        .as_deref()
        .map(|raw| {
            TypeGroup::parse(raw).ok_or_else(|| {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    format!("unknown type group '{raw}'"),
                )
            })
        })
        .transpose()?;

    let store = state.engine.store();
    let (category, tag) = (filter.category.as_deref(), filter.tag.as_deref());
    let mut skills = match (category, tag, type_group) {
        (Some(category), _, _) => store.by_category(category).await?,
        (None, Some(tag), _) => store.by_tag(tag).await?,
        (None, None, Some(group)) => store.by_type_group(group).await?,
        (None, None, None) => store.get_all().await?,
    };
    if let (Some(_), Some(tag)) = (category, tag) {
        skills.retain(|s| s.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)));
    }
    if let Some(group) = type_group {
        skills.retain(|s| s.type_group == group);
    }

    Ok(Json(SkillList {
        total: skills.len(),
        skills: skills.into_iter().map(SkillSummary::from).collect(),
    })
    .into_response())
}

async fn find_skill(state: &AppState, id: &str) -> Result<Skill, ApiError> {
    state
        .engine
        .store()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(id))
}

pub(crate) async fn get_skill_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let skill = find_skill(&state, &id).await?;
    Ok(Json(skill).into_response())
}

pub(crate) async fn export_skill_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let skill = find_skill(&state, &id).await?;
    let document = export_skill_document(&skill).map_err(|e| {
        tracing::error!(skill = %id, "export failed: {e}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        document,
    )
        .into_response())
}

pub(crate) async fn alternatives_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AlternativesQuery>,
) -> Result<Response, ApiError> {
    let max = query.max.unwrap_or(DEFAULT_MAX_ALTERNATIVES);
    let set = state
        .engine
        .alternatives(&id, max)
        .await?
        .ok_or_else(|| ApiError::not_found(&id))?;
    Ok(Json(set).into_response())
}

pub(crate) async fn prerequisites_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let report = state
        .engine
        .check_prerequisites(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(&id))?;
    Ok(Json(report).into_response())
}

pub(crate) async fn explain_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExplainRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let explained = state
        .engine
        .explain(&request.problem_text, &request.skill_id)
        .await?
        .ok_or_else(|| ApiError::not_found(&request.skill_id))?;
    Ok(Json(explained).into_response())
}

pub(crate) async fn tags_handler(
    State(state): State<AppState>,
    Query(query): Query<TagsQuery>,
) -> Result<Response, ApiError> {
    let tags = state
        .engine
        .store()
        .top_tags(query.limit.unwrap_or(DEFAULT_TOP_TAGS))
        .await?;
    Ok(Json(tags).into_response())
}

pub(crate) async fn dependencies_handler(
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let deps = state.engine.store().dependencies_summary().await?;
    Ok(Json(deps).into_response())
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let skills = state.engine.store().get_all().await.ok().map(|s| s.len());
    Json(HealthResponse {
        status: if skills.is_some() { "ok" } else { "degraded" },
        uptime_secs: state.started_at.elapsed().as_secs(),
        skills,
    })
}

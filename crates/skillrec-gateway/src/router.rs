use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;

use super::handlers::{
    alternatives_handler, dependencies_handler, explain_handler, export_skill_handler,
    get_skill_handler, health_handler, list_skills_handler, prerequisites_handler,
    recommend_handler, tags_handler,
};
use super::middleware::{BearerAuth, RateLimiter, rate_limit, require_bearer};
use super::server::AppState;

/// Assemble the API. `/health` stays outside auth and rate limiting.
pub fn build_router(
    state: AppState,
    auth_token: Option<&str>,
    rate_limit_per_minute: u32,
    max_body_size: usize,
) -> Router {
    let api = Router::new()
        .route("/recommend", post(recommend_handler))
        .route("/skills", get(list_skills_handler))
        .route("/skills/{id}", get(get_skill_handler))
        .route("/skills/{id}/export", get(export_skill_handler))
        .route("/skills/{id}/alternatives", get(alternatives_handler))
        .route("/skills/{id}/prerequisites", get(prerequisites_handler))
        .route("/explain", post(explain_handler))
        .route("/tags", get(tags_handler))
        .route("/dependencies", get(dependencies_handler))
        .layer(middleware::from_fn_with_state(
            RateLimiter::new(rate_limit_per_minute),
            rate_limit,
        ))
        .layer(middleware::from_fn_with_state(
            BearerAuth::new(auth_token),
            require_bearer,
        ))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    Router::new()
        .route("/health", get(health_handler))
        .merge(api)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use skillrec_core::Recommender;
    use skillrec_skills::{InMemorySkillStore, Skill};
    use tower::ServiceExt;

    use super::*;

    const SOURCE: &str = "---\nname: T-Test\ndescription: Compare two means\n---\n\n# T-Test\n";

    fn catalog() -> InMemorySkillStore {
        let mut documented = Skill::new("t-test", "T-Test for Means", "statistical_method")
            .with_description("Performs a t-test to compare average scores between two groups")
            .with_tags(["hypothesis_testing"]);
        documented.source_content = Some(SOURCE.into());

        InMemorySkillStore::with_skills([
            documented,
            Skill::new("fibonacci", "Fibonacci Sequence Generator", "algorithm")
                .with_description("Generates Fibonacci numbers")
                .with_tags(["recursion"])
                .with_prerequisites(["recursion-basics"]),
        ])
    }

    fn app(auth: Option<&str>, rate_limit: u32) -> Router {
        let engine = Arc::new(Recommender::new(Arc::new(catalog())));
        build_router(AppState::new(engine), auth, rate_limit, 1_048_576)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let resp = app(None, 0).oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["skills"], 2);
    }

    #[tokio::test]
    async fn recommend_keyword_success() {
        let resp = app(None, 0)
            .oneshot(post_json(
                "/recommend",
                r#"{"problemText":"compare average scores between two groups"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["method"], "keyword-matching");
        assert_eq!(json["recommendations"][0]["skillId"], "t-test");
        assert_eq!(json["recommendations"][0]["skill"]["name"], "T-Test for Means");
    }

    #[tokio::test]
    async fn recommend_zero_matches_is_ok() {
        let resp = app(None, 0)
            .oneshot(post_json("/recommend", r#"{"problemText":"quantum chromodynamics"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["recommendations"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn recommend_empty_query_is_400() {
        let resp = app(None, 0)
            .oneshot(post_json("/recommend", r#"{"problemText":""}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert!(json["error"].as_str().unwrap().contains("invalid query"));
    }

    #[tokio::test]
    async fn recommend_wrong_type_is_400() {
        let resp = app(None, 0)
            .oneshot(post_json("/recommend", r#"{"problemText":42}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn recommend_malformed_json_is_400() {
        let resp = app(None, 0)
            .oneshot(post_json("/recommend", "{not json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommend_provider_failure_is_500() {
        let body = r#"{"problemText":"compare means","llmConfig":{"provider":"openai","apiKey":"sk-test","model":"gpt-4o-mini","baseUrl":"http://127.0.0.1:1"}}"#;
        let resp = app(None, 0)
            .oneshot(post_json("/recommend", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(resp).await;
        assert!(json["error"].as_str().unwrap().contains("LLM provider error"));
        assert!(!json.to_string().contains("sk-test"));
    }

    #[tokio::test]
    async fn server_llm_config_fills_missing_request_config() {
        let engine = Arc::new(Recommender::new(Arc::new(catalog())));
        let mut state = AppState::new(engine);
        state.default_llm = Some(
            skillrec_llm::LlmConfig::new(skillrec_llm::ProviderKind::OpenAi, "sk-server")
                .with_base_url("http://127.0.0.1:1"),
        );
        let app = build_router(state, None, 0, 1_048_576);

        // no llmConfig: the unreachable server default is used and its failure reported
        let resp = app
            .clone()
            .oneshot(post_json("/recommend", r#"{"problemText":"compare means"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json_body(resp).await["error"].as_str().unwrap().contains("LLM provider error"));

        // the caller's own config is never replaced, even without a key
        let body = r#"{"problemText":"compare average scores","llmConfig":{"provider":"openai","apiKey":""}}"#;
        let resp = app.oneshot(post_json("/recommend", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["method"], "keyword-matching");
    }

    #[tokio::test]
    async fn list_and_filter_skills() {
        let json = json_body(app(None, 0).oneshot(get_req("/skills")).await.unwrap()).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["skills"][0]["id"], "fibonacci");

        let json = json_body(
            app(None, 0)
                .oneshot(get_req("/skills?category=statistical-method"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["skills"][0]["id"], "t-test");

        let json = json_body(
            app(None, 0)
                .oneshot(get_req("/skills?tag=RECURSION"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["skills"][0]["id"], "fibonacci");
    }

    #[tokio::test]
    async fn get_skill_and_missing() {
        let resp = app(None, 0).oneshot(get_req("/skills/t-test")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["typeGroup"], "problem_solving");

        let resp = app(None, 0).oneshot(get_req("/skills/nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(json_body(resp).await["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn export_returns_source_verbatim() {
        let resp = app(None, 0)
            .oneshot(get_req("/skills/t-test/export"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-type"],
            "text/markdown; charset=utf-8"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], SOURCE.as_bytes());
    }

    #[tokio::test]
    async fn filter_by_type_group() {
        let json = json_body(
            app(None, 0)
                .oneshot(get_req("/skills?typeGroup=programming"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["skills"][0]["id"], "fibonacci");

        let json = json_body(
            app(None, 0)
                .oneshot(get_req("/skills?category=algorithm&typeGroup=problem_solving"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 0);

        let resp = app(None, 0)
            .oneshot(get_req("/skills?typeGroup=misc"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].as_str().unwrap().contains("misc"));
    }

    #[tokio::test]
    async fn alternatives_route() {
        let resp = app(None, 0)
            .oneshot(get_req("/skills/t-test/alternatives?max=3"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["primaryId"], "t-test");
        assert!(json["alternatives"].is_array());
        assert!(json["reasoning"].is_string());

        let resp = app(None, 0)
            .oneshot(get_req("/skills/nope/alternatives"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn prerequisites_route() {
        let resp = app(None, 0)
            .oneshot(get_req("/skills/fibonacci/prerequisites"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["prerequisites"][0]["skillId"], "recursion-basics");
        assert_eq!(json["prerequisites"][0]["status"], "missing");
        assert_eq!(json["warnings"][0], "Missing 1 prerequisite(s)");
    }

    #[tokio::test]
    async fn explain_route() {
        let resp = app(None, 0)
            .oneshot(post_json(
                "/explain",
                r#"{"problemText":"compare average scores","skillId":"t-test"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["method"], "keyword-matching");
        assert_eq!(json["matchedTerms"].as_array().unwrap().len(), 3);

        let resp = app(None, 0)
            .oneshot(post_json(
                "/explain",
                r#"{"problemText":"compare","skillId":"nope"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tag_and_dependency_summaries() {
        let json = json_body(app(None, 0).oneshot(get_req("/tags?limit=1")).await.unwrap()).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["skills"], 1);

        let resp = app(None, 0).oneshot(get_req("/dependencies")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn auth_rejects_missing_token() {
        let resp = app(Some("secret"), 0)
            .oneshot(get_req("/skills"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["error"], "missing or invalid bearer token");
    }

    #[tokio::test]
    async fn auth_accepts_valid_token() {
        let req = Request::builder()
            .uri("/skills")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let resp = app(Some("secret"), 0).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_skips_auth() {
        let resp = app(Some("secret"), 0)
            .oneshot(get_req("/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_enforced() {
        use tower::Service;

        let mut app = app(None, 2);
        for expected in [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS] {
            let resp = app.call(get_req("/skills")).await.unwrap();
            assert_eq!(resp.status(), expected);
            if expected == StatusCode::TOO_MANY_REQUESTS {
                assert!(json_body(resp).await["error"].is_string());
            }
        }
    }

    #[tokio::test]
    async fn body_size_limit() {
        let engine = Arc::new(Recommender::new(Arc::new(catalog())));
        let app = build_router(AppState::new(engine), None, 0, 64);
        let oversized = format!(r#"{{"problemText":"{}"}}"#, "a".repeat(128));
        let resp = app
            .oneshot(post_json("/recommend", &oversized))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use skillrec_core::config::StoreBackend;
use skillrec_core::{
    Config, EngineError, RecommendationRequest, RecommendationResponse, Recommender,
};
use skillrec_gateway::GatewayServer;
use skillrec_llm::ProviderKind;
use skillrec_memory::SqliteStore;
use skillrec_skills::{
    InMemorySkillStore, IngestMode, IngestOptions, IngestReport, Skill, SkillStore, TypeGroup,
    UsageCount, export_skill_document, ingest,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub(crate) async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SkillStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let path = &config.store.sqlite_path;
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let store = SqliteStore::new(&path.to_string_lossy())
                .await
                .with_context(|| format!("failed to open skill database {}", path.display()))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            // nothing persists between runs, so populate from the configured paths every time
            let store = InMemorySkillStore::new();
            let report = ingest(
                config.skills.paths.as_slice(),
                &store,
                IngestOptions::default(),
            )
            .await?;
            tracing::info!(skills = report.loaded(), "in-memory store populated");
            Ok(Arc::new(store))
        }
    }
}

pub(crate) async fn run_ingest(
    config: &Config,
    store: &dyn SkillStore,
    paths: Vec<PathBuf>,
    prune: bool,
    skip_existing: bool,
    json: bool,
) -> anyhow::Result<()> {
    let roots = if paths.is_empty() {
        config.skills.paths.clone()
    } else {
        paths
    };
    let options = IngestOptions {
        mode: if skip_existing {
            IngestMode::SkipExisting
        } else {
            IngestMode::Merge
        },
        prune,
    };

    let report = ingest(roots.as_slice(), store, options).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_ingest_report(&report);
    }
    Ok(())
}

fn print_ingest_report(report: &IngestReport) {
    println!(
        "scanned {}: {} added, {} updated, {} unchanged, {} skipped, {} pruned, {} failed",
        report.scanned,
        report.added,
        report.updated,
        report.unchanged,
        report.skipped,
        report.pruned.len(),
        report.errors.len()
    );
    for failure in &report.errors {
        println!("  {}: {}", failure.path.display(), failure.message);
    }
}

pub(crate) async fn run_list(
    store: &dyn SkillStore,
    category: Option<&str>,
    tag: Option<&str>,
    type_group: Option<TypeGroup>,
    json: bool,
) -> anyhow::Result<()> {
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

    if json {
        println!("{}", serde_json::to_string_pretty(&skills)?);
        return Ok(());
    }
    if skills.is_empty() {
        println!("no skills found");
    }
    for skill in &skills {
        println!("{:<32} {:<28} {}", skill.id, skill.category, skill.name);
    }
    Ok(())
}

async fn find_skill(store: &dyn SkillStore, id: &str) -> anyhow::Result<Skill> {
    match store.get_by_id(id).await? {
        Some(skill) => Ok(skill),
        None => bail!("skill '{id}' not found"),
    }
}

pub(crate) async fn run_show(store: &dyn SkillStore, id: &str) -> anyhow::Result<()> {
    let skill = find_skill(store, id).await?;
    println!("{}", serde_json::to_string_pretty(&skill)?);
    Ok(())
}

pub(crate) async fn run_export(
    store: &dyn SkillStore,
    id: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let skill = find_skill(store, id).await?;
    let document = export_skill_document(&skill)?;
    match output {
        Some(path) => {
            std::fs::write(&path, document)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(skill = id, path = %path.display(), "skill exported");
        }
        None => print!("{document}"),
    }
    Ok(())
}

pub(crate) async fn run_stats(store: &dyn SkillStore, json: bool) -> anyhow::Result<()> {
    let stats = store.stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("{} skills", stats.total);
    for (category, count) in &stats.categories {
        println!("  {category:<28} {count}");
    }
    let tags = store.top_tags(5).await?;
    if !tags.is_empty() {
        println!("top tags");
        print_usage(&tags);
    }
    Ok(())
}

fn print_usage(usage: &[UsageCount]) {
    for entry in usage {
        println!("  {:<28} {}", entry.name, entry.skills);
    }
}

pub(crate) async fn run_tags(store: &dyn SkillStore, limit: usize, json: bool) -> anyhow::Result<()> {
    let tags = store.top_tags(limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
    } else if tags.is_empty() {
        println!("no tags found");
    } else {
        print_usage(&tags);
    }
    Ok(())
}

pub(crate) async fn run_deps(store: &dyn SkillStore, json: bool) -> anyhow::Result<()> {
    let deps = store.dependencies_summary().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&deps)?);
    } else if deps.is_empty() {
        println!("no dependencies declared");
    } else {
        print_usage(&deps);
    }
    Ok(())
}

pub(crate) async fn run_alternatives(
    engine: &Recommender,
    id: &str,
    max: usize,
    json: bool,
) -> anyhow::Result<()> {
    let Some(set) = engine.alternatives(id, max).await? else {
        bail!("skill '{id}' not found");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }
    println!("{}", set.reasoning);
    for alt in &set.alternatives {
        println!(
            "  {:<32} {:<20} similarity {:.2}",
            alt.skill_id,
            alt.kind.as_str(),
            alt.similarity
        );
    }
    Ok(())
}

pub(crate) async fn run_prereqs(engine: &Recommender, id: &str, json: bool) -> anyhow::Result<()> {
    let Some(report) = engine.check_prerequisites(id).await? else {
        bail!("skill '{id}' not found");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.prerequisites.is_empty() {
        println!("{} has no prerequisites", report.skill_name);
    }
    for prereq in &report.prerequisites {
        let implied = if prereq.implied { " (implied)" } else { "" };
        println!(
            "  {:<32} {:?}{implied}: {}",
            prereq.skill_id, prereq.status, prereq.description
        );
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

pub(crate) async fn run_explain(
    engine: &Recommender,
    text: &str,
    skill: &str,
    json: bool,
) -> anyhow::Result<()> {
    let Some(explained) = engine.explain(text, skill).await? else {
        bail!("skill '{skill}' not found");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&explained)?);
        return Ok(());
    }
    println!(
        "{} ({}) confidence {:.2}",
        explained.skill_name, explained.skill_id, explained.confidence
    );
    for term in &explained.matched_terms {
        println!(
            "  {:<20} tf {} idf {:.3} score {:.3}",
            term.term, term.term_frequency, term.idf, term.score
        );
    }
    if !explained.unmatched_terms.is_empty() {
        println!("  unmatched: {}", explained.unmatched_terms.join(", "));
    }
    println!("{}", explained.interpretation);
    Ok(())
}

pub(crate) struct RecommendArgs {
    pub text: String,
    pub limit: Option<usize>,
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub json: bool,
}

pub(crate) async fn run_recommend(
    mut config: Config,
    store: Arc<dyn SkillStore>,
    args: RecommendArgs,
) -> anyhow::Result<()> {
    let explicit_llm = args.provider.is_some();
    if args.provider.is_some() || args.model.is_some() || args.base_url.is_some() {
        let section = config.llm.get_or_insert_with(Default::default);
        if let Some(provider) = args.provider {
            section.provider = provider;
        }
        if let Some(model) = args.model {
            section.model = Some(model);
        }
        if let Some(url) = args.base_url {
            section.base_url = Some(url);
        }
    }
    let llm_config = config.llm_config();
    if explicit_llm && llm_config.is_none() {
        bail!("--provider requires SKILLREC_LLM_API_KEY to be set");
    }

    let mut request = RecommendationRequest::new(args.text);
    request.limit = args.limit;
    request.llm_config = llm_config;

    let engine = Recommender::new(store).with_settings(config.engine.settings());
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("cancelling recommendation");
            guard.cancel();
        }
    });

    let result = engine.recommend_cancellable(&request, &cancel).await;
    ctrl_c.abort();

    let response = match result {
        Ok(response) => response,
        Err(EngineError::Cancelled) => bail!("recommendation cancelled"),
        Err(e) => return Err(e).context("recommendation failed"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_recommendations(&response);
    }
    Ok(())
}

fn print_recommendations(response: &RecommendationResponse) {
    if response.is_empty() {
        println!("no relevant skills found (method: {})", response.method);
        return;
    }
    for (rank, rec) in response.recommendations.iter().enumerate() {
        println!(
            "{}. {} ({}) confidence {:.2}",
            rank + 1,
            rec.skill_name,
            rec.skill_id,
            rec.confidence
        );
        println!("   {}", rec.reason);
        for suggestion in &rec.suggestions {
            println!("   - {suggestion}");
        }
    }
    println!("method: {}", response.method);
}

pub(crate) async fn run_serve(config: Config, store: Arc<dyn SkillStore>) -> anyhow::Result<()> {
    let engine = Arc::new(Recommender::new(store).with_settings(config.engine.settings()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let gateway = &config.gateway;
    GatewayServer::new(&gateway.bind, gateway.port, engine, shutdown_rx)
        .with_auth(gateway.auth_token.clone())
        .with_rate_limit(gateway.rate_limit)
        .with_max_body_size(gateway.max_body_size)
        .with_default_llm(config.llm_config())
        .serve()
        .await?;
    Ok(())
}

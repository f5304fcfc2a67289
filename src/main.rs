mod cli;
mod commands;

use std::path::PathBuf;

use clap::Parser;
use skillrec_core::{Config, Recommender};
use skillrec_core::config::DEFAULT_CONFIG_PATH;

use crate::cli::{Cli, Command};
use crate::commands::RecommendArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)?;
    config.validate()?;

    let store = commands::open_store(&config).await?;

    match cli.command {
        Command::Ingest {
            paths,
            prune,
            skip_existing,
            json,
        } => commands::run_ingest(&config, store.as_ref(), paths, prune, skip_existing, json).await,
        Command::List {
            category,
            tag,
            type_group,
            json,
        } => {
            commands::run_list(
                store.as_ref(),
                category.as_deref(),
                tag.as_deref(),
                type_group,
                json,
            )
            .await
        }
        Command::Show { id } => commands::run_show(store.as_ref(), &id).await,
        Command::Export { id, output } => commands::run_export(store.as_ref(), &id, output).await,
        Command::Stats { json } => commands::run_stats(store.as_ref(), json).await,
        Command::Tags { limit, json } => commands::run_tags(store.as_ref(), limit, json).await,
        Command::Deps { json } => commands::run_deps(store.as_ref(), json).await,
        Command::Alternatives { id, max, json } => {
            let engine = Recommender::new(store).with_settings(config.engine.settings());
            commands::run_alternatives(&engine, &id, max, json).await
        }
        Command::Prereqs { id, json } => {
            let engine = Recommender::new(store).with_settings(config.engine.settings());
            commands::run_prereqs(&engine, &id, json).await
        }
        Command::Explain { text, skill, json } => {
            let engine = Recommender::new(store).with_settings(config.engine.settings());
            commands::run_explain(&engine, &text, &skill, json).await
        }
        Command::Recommend {
            text,
            limit,
            provider,
            model,
            base_url,
            json,
        } => {
            let args = RecommendArgs {
                text,
                limit,
                provider,
                model,
                base_url,
                json,
            };
            commands::run_recommend(config, store, args).await
        }
        Command::Serve => commands::run_serve(config, store).await,
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

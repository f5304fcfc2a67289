use std::path::PathBuf;

use clap::{Parser, Subcommand};
use skillrec_llm::ProviderKind;
use skillrec_skills::TypeGroup;

/// Recommend skills from a SKILL.md library for a problem description.
#[derive(Debug, Parser)]
#[command(name = "skillrec", version, about)]
pub(crate) struct Cli {
    /// Config file (default: config/default.toml)
    #[arg(long, global = true, env = "SKILLREC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Scan skill directories and load SKILL.md documents into the store
    Ingest {
        /// Directories to scan (default: skills.paths from config)
        paths: Vec<PathBuf>,
        /// Remove stored skills that were not found in this run
        #[arg(long)]
        prune: bool,
        /// Leave already stored skills untouched
        #[arg(long)]
        skip_existing: bool,
        #[arg(long)]
        json: bool,
    },

    /// List stored skills
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// problem_solving or programming
        #[arg(long, value_parser = parse_type_group)]
        type_group: Option<TypeGroup>,
        #[arg(long)]
        json: bool,
    },

    /// Print one skill as JSON
    Show { id: String },

    /// Write a skill back out as a SKILL.md document
    Export {
        id: String,
        /// Destination file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Skill counts per category
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Most used tags
    Tags {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },

    /// How many skills need each dependency
    Deps {
        #[arg(long)]
        json: bool,
    },

    /// Skills to consider instead of, or next to, a given one
    Alternatives {
        id: String,
        #[arg(long, default_value_t = skillrec_core::alternatives::DEFAULT_MAX_ALTERNATIVES)]
        max: usize,
        #[arg(long)]
        json: bool,
    },

    /// Check whether a skill's prerequisites are in the catalog
    Prereqs {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Show how a skill's keyword score for a problem is made up
    Explain {
        /// Problem description
        text: String,
        #[arg(long)]
        skill: String,
        #[arg(long)]
        json: bool,
    },

    /// Rank skills against a problem description
    Recommend {
        /// Problem description
        text: String,
        #[arg(long)]
        limit: Option<usize>,
        /// LLM provider; requires SKILLREC_LLM_API_KEY
        #[arg(long, value_parser = parse_provider)]
        provider: Option<ProviderKind>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API
    Serve,
}

fn parse_provider(s: &str) -> Result<ProviderKind, String> {
    s.parse()
}

fn parse_type_group(s: &str) -> Result<TypeGroup, String> {
    TypeGroup::parse(s).ok_or_else(|| format!("unknown type group '{s}'"))
}

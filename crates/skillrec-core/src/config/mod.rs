mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use skillrec_llm::LlmConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error describing the first out-of-range value.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engine.default_limit == 0 {
            bail!("engine.default_limit must be at least 1");
        }
        if self.engine.llm_timeout_secs == 0 {
            bail!("engine.llm_timeout_secs must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.engine.temperature) {
            bail!(
                "engine.temperature must be within [0, 2], got {}",
                self.engine.temperature
            );
        }
        if self.skills.paths.is_empty() {
            bail!("skills.paths must name at least one directory");
        }
        Ok(())
    }

    /// Server-side LLM settings, present only when an API key was supplied.
    #[must_use]
    pub fn llm_config(&self) -> Option<LlmConfig> {
        let section = self.llm.as_ref()?;
        let key = section.api_key.as_deref()?;
        let mut config = LlmConfig::new(section.provider, key);
        if let Some(model) = &section.model {
            config = config.with_model(model.as_str());
        }
        if let Some(url) = &section.base_url {
            config = config.with_base_url(url.as_str());
        }
        config.has_credential().then_some(config)
    }
}

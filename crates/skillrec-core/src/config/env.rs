use std::path::PathBuf;

use super::{Config, LlmSection};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_storage();
        self.apply_env_overrides_engine();
        self.apply_env_overrides_llm();
        self.apply_env_overrides_gateway();
    }

    fn apply_env_overrides_storage(&mut self) {
        if let Ok(v) = std::env::var("SKILLREC_SKILLS_PATHS") {
            let paths: Vec<PathBuf> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
            if paths.is_empty() {
                tracing::warn!("ignoring empty SKILLREC_SKILLS_PATHS");
            } else {
                self.skills.paths = paths;
            }
        }
        if let Ok(v) = std::env::var("SKILLREC_STORE_BACKEND") {
            match v.parse() {
                Ok(backend) => self.store.backend = backend,
                Err(e) => tracing::warn!("ignoring invalid SKILLREC_STORE_BACKEND: {e}"),
            }
        }
        if let Ok(v) = std::env::var("SKILLREC_SQLITE_PATH") {
            self.store.sqlite_path = PathBuf::from(v);
        }
    }

    fn apply_env_overrides_engine(&mut self) {
        if let Ok(v) = std::env::var("SKILLREC_DEFAULT_LIMIT") {
            match v.parse::<usize>() {
                Ok(limit) => self.engine.default_limit = limit,
                Err(_) => tracing::warn!("ignoring invalid SKILLREC_DEFAULT_LIMIT value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("SKILLREC_LLM_TIMEOUT") {
            match v.parse::<u64>() {
                Ok(secs) => self.engine.llm_timeout_secs = secs,
                Err(_) => tracing::warn!("ignoring invalid SKILLREC_LLM_TIMEOUT value: {v}"),
            }
        }
    }

    fn llm_section(&mut self) -> &mut LlmSection {
        self.llm.get_or_insert_with(LlmSection::default)
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("SKILLREC_LLM_PROVIDER") {
            match v.parse() {
                Ok(kind) => self.llm_section().provider = kind,
                Err(e) => tracing::warn!("ignoring invalid SKILLREC_LLM_PROVIDER: {e}"),
            }
        }
        if let Ok(v) = std::env::var("SKILLREC_LLM_MODEL") {
            self.llm_section().model = Some(v);
        }
        if let Ok(v) = std::env::var("SKILLREC_LLM_BASE_URL") {
            self.llm_section().base_url = Some(v);
        }
        if let Ok(v) = std::env::var("SKILLREC_LLM_API_KEY")
            && !v.trim().is_empty()
        {
            self.llm_section().api_key = Some(v);
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("SKILLREC_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("SKILLREC_GATEWAY_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("ignoring invalid SKILLREC_GATEWAY_PORT value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("SKILLREC_GATEWAY_TOKEN") {
            self.gateway.auth_token = Some(v);
        }
    }
}

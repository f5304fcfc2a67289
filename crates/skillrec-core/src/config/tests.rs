use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;
use skillrec_llm::ProviderKind;

use super::*;

const ENV_KEYS: [&str; 12] = [
    "SKILLREC_SKILLS_PATHS",
    "SKILLREC_STORE_BACKEND",
    "SKILLREC_SQLITE_PATH",
    "SKILLREC_DEFAULT_LIMIT",
    "SKILLREC_LLM_TIMEOUT",
    "SKILLREC_LLM_PROVIDER",
    "SKILLREC_LLM_MODEL",
    "SKILLREC_LLM_BASE_URL",
    "SKILLREC_LLM_API_KEY",
    "SKILLREC_GATEWAY_BIND",
    "SKILLREC_GATEWAY_PORT",
    "SKILLREC_GATEWAY_TOKEN",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skillrec.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    (dir, path)
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.skills.paths, vec![PathBuf::from("./skills")]);
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.engine.default_limit, 5);
    assert_eq!(config.engine.llm_timeout_secs, 30);
    assert_eq!(config.engine.max_tokens, 2000);
    assert!((config.engine.temperature - 0.3).abs() < f32::EPSILON);
    assert!(config.llm.is_none());
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.gateway.port, 8090);
    assert_eq!(config.gateway.rate_limit, 120);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/skillrec.toml")).unwrap();
    assert_eq!(config.engine.default_limit, 5);
    assert!(config.llm_config().is_none());
}

#[test]
#[serial]
fn parse_valid_toml() {
    let (_dir, path) = write_config(
        r#"
[skills]
paths = ["./a", "./b"]

[store]
backend = "memory"

[engine]
default_limit = 3
temperature = 0.0

[llm]
provider = "anthropic"
model = "claude-3-5-sonnet-latest"

[gateway]
port = 9000
auth_token = "secret"
"#,
    );
    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.skills.paths.len(), 2);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.engine.default_limit, 3);
    assert_eq!(config.engine.llm_timeout_secs, 30);
    let llm = config.llm.as_ref().unwrap();
    assert_eq!(llm.provider, ProviderKind::Anthropic);
    assert!(llm.api_key.is_none());
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.auth_token.as_deref(), Some("secret"));
    // no key in the file, so no server-side LLM
    assert!(config.llm_config().is_none());
}

#[test]
#[serial]
fn invalid_toml_is_error() {
    let (_dir, path) = write_config("[engine]\ndefault_limit = \"many\"\n");
    clear_env();
    assert!(Config::load(&path).is_err());
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    unsafe {
        std::env::set_var("SKILLREC_SKILLS_PATHS", "./x, ./y,");
        std::env::set_var("SKILLREC_STORE_BACKEND", "memory");
        std::env::set_var("SKILLREC_DEFAULT_LIMIT", "7");
        std::env::set_var("SKILLREC_LLM_TIMEOUT", "12");
        std::env::set_var("SKILLREC_LLM_PROVIDER", "claude");
        std::env::set_var("SKILLREC_LLM_API_KEY", "sk-env");
        std::env::set_var("SKILLREC_GATEWAY_PORT", "9100");
        std::env::set_var("SKILLREC_GATEWAY_TOKEN", "tok");
    }

    let config = Config::load(Path::new("/nonexistent/skillrec.toml")).unwrap();
    clear_env();

    assert_eq!(
        config.skills.paths,
        vec![PathBuf::from("./x"), PathBuf::from("./y")]
    );
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.engine.default_limit, 7);
    assert_eq!(config.engine.settings().llm_timeout.as_secs(), 12);
    assert_eq!(config.gateway.port, 9100);
    assert_eq!(config.gateway.auth_token.as_deref(), Some("tok"));

    let llm = config.llm_config().unwrap();
    assert_eq!(llm.provider, ProviderKind::Anthropic);
    assert_eq!(llm.api_key, "sk-env");
}

#[test]
#[serial]
fn invalid_env_values_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("SKILLREC_STORE_BACKEND", "postgres");
        std::env::set_var("SKILLREC_DEFAULT_LIMIT", "lots");
        std::env::set_var("SKILLREC_GATEWAY_PORT", "99999");
        std::env::set_var("SKILLREC_LLM_PROVIDER", "ollama");
    }

    let config = Config::load(Path::new("/nonexistent/skillrec.toml")).unwrap();
    clear_env();

    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.engine.default_limit, 5);
    assert_eq!(config.gateway.port, 8090);
    assert!(config.llm.is_none());
}

#[test]
fn validate_rejects_out_of_range() {
    let mut config = Config::default();
    config.engine.default_limit = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.llm_timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.temperature = 2.5;
    assert!(config.validate().is_err());
}

#[test]
fn secrets_not_in_debug() {
    let mut config = Config::default();
    config.gateway.auth_token = Some("hunter2".into());
    config.llm = Some(LlmSection {
        api_key: Some("sk-secret".into()),
        ..LlmSection::default()
    });
    let dbg = format!("{config:?}");
    assert!(!dbg.contains("hunter2"));
    assert!(!dbg.contains("sk-secret"));
}

#[test]
fn engine_settings_carry_chat_options() {
    let mut config = Config::default();
    config.engine.max_tokens = 512;
    let settings = config.engine.settings();
    assert_eq!(settings.chat.max_tokens, 512);
    assert_eq!(settings.default_limit, 5);
}

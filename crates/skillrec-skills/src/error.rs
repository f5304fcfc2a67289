#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing front matter delimiter")]
    MissingFrontMatter,

    #[error("unclosed front matter")]
    UnclosedFrontMatter,

    #[error("invalid skill: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("skill store unavailable: {0}")]
    Unavailable(String),

    #[error("skill store operation failed: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

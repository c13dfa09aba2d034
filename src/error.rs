use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsdeskError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("Invalid campaign: {}", join_messages(.0))]
    InvalidCampaign(Vec<FieldError>),

    #[error("Campaign API error: {0}")]
    Remote(#[from] RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A rejected field in a campaign edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Name is required")]
    NameRequired,

    #[error("Budget must be greater than 0")]
    BudgetNotPositive,
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures reported by the campaign API. All of them are transient: the
/// coordinator rolls back and the caller may simply try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{0}")]
    Network(String),
}

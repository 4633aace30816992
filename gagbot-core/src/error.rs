use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace.
///
/// `Input` and `Unauthorized` carry user-facing text and abort the operation
/// before any state is mutated. `Gateway` and `Persistence` are logged and,
/// depending on the call site, either abort the commit (moderation actions)
/// or are tolerated (expiry cleanup, snapshot flush).
#[derive(Error, Debug)]
pub enum GagbotError {
    #[error("{0}")]
    Input(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GagbotError>;

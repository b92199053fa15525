use thiserror::Error;

/// Result type for solar3d operations
pub type SolarResult<T> = Result<T, SolarError>;

/// Errors that end or degrade a run
#[derive(Error, Debug)]
pub enum SolarError {
    /// The host can never run the demo, e.g. the terminal is too small
    #[error("unsupported environment: {0}")]
    EnvironmentUnsupported(String),

    #[error("session unavailable: {0}")]
    SessionUnavailable(#[from] SessionUnavailable),

    #[error("unable to load assets: {0}")]
    Assets(#[from] AssetError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ways the interactive session can fail to start
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionUnavailable {
    #[error("standard output is not an interactive terminal")]
    NotATerminal,

    #[error("terminal raw mode is unavailable: {0}")]
    RawMode(String),
}

impl SessionUnavailable {
    /// What the user can do about it
    pub fn remedy(&self) -> &'static str {
        match self {
            SessionUnavailable::NotATerminal => {
                "Run solar3d directly in a terminal emulator, not through a pipe or redirect."
            }
            SessionUnavailable::RawMode(_) => {
                "Use a terminal that supports raw input mode (most modern emulators do)."
            }
        }
    }
}

/// Asset batch failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("no asset named `{0}`")]
    NotFound(String),

    #[error("asset loader stopped before completing the batch")]
    Disconnected,
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SettingsError {
    /// Negative, NaN or infinite speed multipliers are rejected
    #[error("invalid speed multiplier {0}: must be a finite value >= 0")]
    InvalidMultiplier(f32),
}

/// Scene graph misuse
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0} does not exist")]
    MissingNode(usize),

    #[error("attaching node {child} under {parent} would create a cycle")]
    Cycle { child: usize, parent: usize },
}

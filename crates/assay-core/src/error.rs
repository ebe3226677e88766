use thiserror::Error;

/// The pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Input,
    Searching,
    Analyzing,
    Exporting,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Configuration => "Configuration",
            Stage::Input => "Topic",
            Stage::Searching => "Web search",
            Stage::Analyzing => "Analysis",
            Stage::Exporting => "Export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What went wrong talking to a hosted provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderFault {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderFault {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimit(message),
            _ => Self::Api { status, message },
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ProviderFault::Auth(_))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error("Search provider error: {0}")]
    Search(#[source] ProviderFault),

    #[error("Completion provider error: {0}")]
    Completion(#[source] ProviderFault),

    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn search(fault: ProviderFault) -> Self {
        Self::Search(fault)
    }

    pub fn completion(fault: ProviderFault) -> Self {
        Self::Completion(fault)
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Configuration,
            Error::EmptyTopic => Stage::Input,
            Error::Search(_) => Stage::Searching,
            Error::Completion(_) => Stage::Analyzing,
            Error::Export(_) => Stage::Exporting,
        }
    }

    /// The provider fault behind a search or completion error, if any.
    pub fn fault(&self) -> Option<&ProviderFault> {
        match self {
            Error::Search(f) | Error::Completion(f) => Some(f),
            _ => None,
        }
    }
}

use formats::CaseDataError;
use scene::SceneError;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum GlobeError {
    /// No usable graphics API, or the context was rejected earlier.
    Unsupported,
    /// The activation gate has not seen the host element yet.
    NotAuthorized,
    /// Graphics context acquisition failed after a successful probe.
    ContextInit(String),
    Config(ConfigError),
    CaseData(CaseDataError),
    Scene(SceneError),
}

impl GlobeError {
    /// Whether the host should show the static fallback for this error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, GlobeError::Unsupported | GlobeError::ContextInit(_))
    }

    /// Whether building again from default config and no cases can succeed.
    pub fn recovers_with_defaults(&self) -> bool {
        matches!(
            self,
            GlobeError::Config(_) | GlobeError::CaseData(_) | GlobeError::Scene(_)
        )
    }
}

impl std::fmt::Display for GlobeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlobeError::Unsupported => write!(f, "graphics capability unavailable"),
            GlobeError::NotAuthorized => write!(f, "engine construction not yet authorized"),
            GlobeError::ContextInit(e) => write!(f, "graphics context init failed: {e}"),
            GlobeError::Config(e) => write!(f, "{e}"),
            GlobeError::CaseData(e) => write!(f, "{e}"),
            GlobeError::Scene(e) => write!(f, "scene error: {e}"),
        }
    }
}

impl std::error::Error for GlobeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GlobeError::Config(e) => Some(e),
            GlobeError::CaseData(e) => Some(e),
            GlobeError::Scene(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for GlobeError {
    fn from(e: ConfigError) -> Self {
        GlobeError::Config(e)
    }
}

impl From<CaseDataError> for GlobeError {
    fn from(e: CaseDataError) -> Self {
        GlobeError::CaseData(e)
    }
}

impl From<SceneError> for GlobeError {
    fn from(e: SceneError) -> Self {
        GlobeError::Scene(e)
    }
}

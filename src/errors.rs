use thiserror::Error;

/// Failure of a playlist download, surfaced to the UI with a retry action.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("Timeout: le chargement a pris trop de temps ({0}s)")]
    Timeout(u64),

    /// Server answered with a non-2xx status
    #[error("Erreur serveur: impossible d'accéder à la playlist (HTTP {0})")]
    Status(u16),

    /// Transport-level failure (DNS, TCP, TLS, aborted body)
    #[error("Erreur réseau: {0}")]
    Network(String),

    /// Every proxied attempt failed
    #[error("Erreur de chargement après {attempts} tentatives: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Failure of a single lazy group load. Recorded on that group's index
/// entry; other groups are unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GroupLoadError {
    /// The load was superseded or explicitly cancelled. Not a fault:
    /// must never end up in a group's `error` field.
    #[error("Chargement annulé")]
    Cancelled,

    /// The requested group does not exist in the index
    #[error("Groupe inconnu: {0}")]
    UnknownGroup(String),

    #[error("{0}")]
    Failed(String),
}

impl GroupLoadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GroupLoadError::Cancelled)
    }
}

/// Phase of the load pipeline, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStage {
    Cache,
    Network,
    Parsing,
    Indexing,
    Complete,
}

impl LoadingStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            LoadingStage::Cache => "Vérification du cache",
            LoadingStage::Network => "Téléchargement",
            LoadingStage::Parsing => "Analyse",
            LoadingStage::Indexing => "Indexation",
            LoadingStage::Complete => "Terminé",
        }
    }
}

/// Snapshot of the load pipeline, published to the UI after every
/// transition. A failed load ends with `is_loading == false` and the
/// error message in `message`.
#[derive(Debug, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub progress: u8,
    pub stage: LoadingStage,
    pub message: String,
}

impl LoadingState {
    pub fn starting() -> Self {
        Self {
            is_loading: true,
            progress: 0,
            stage: LoadingStage::Cache,
            message: "Vérification du cache...".to_string(),
        }
    }

    pub fn at(stage: LoadingStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            is_loading: true,
            progress: progress.min(100),
            stage,
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            progress: 100,
            stage: LoadingStage::Complete,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            progress: 0,
            stage: LoadingStage::Complete,
            message: message.into(),
        }
    }
}

impl Default for LoadingState {
    fn default() -> Self {
        Self::starting()
    }
}

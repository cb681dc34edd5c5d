use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid mount configuration {}: {source}", path.display())]
    MountConfig {
        path: PathBuf,
        #[source]
        source: Box<AssetscopeError>,
    },
    #[error("mount '{mount}': {reason}")]
    InvalidMount { mount: String, reason: String },
    #[error("mount '{mount}': app {app_id} could not be located in any Steam library")]
    AppNotFound { mount: String, app_id: u32 },
    #[error("mount '{mount}': cannot look up app {app_id}: {source}")]
    AppLookup {
        mount: String,
        app_id: u32,
        #[source]
        source: Box<AssetscopeError>,
    },
    #[error("Steam library index {}: {reason}", path.display())]
    LibraryIndex { path: PathBuf, reason: String },
}

impl AssetscopeError {
    /// Fatal configuration problems that abort a run before any scanning.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AssetscopeError::Json(_)
                | AssetscopeError::MountConfig { .. }
                | AssetscopeError::InvalidMount { .. }
                | AssetscopeError::AppNotFound { .. }
                | AssetscopeError::AppLookup { .. }
                | AssetscopeError::LibraryIndex { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AssetscopeError>;

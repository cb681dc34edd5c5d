use assetscope_core::keyvalues::KeyValuesError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("cannot read scene {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scene: {0}")]
    Parse(#[from] KeyValuesError),
    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),
}

pub type Result<T> = std::result::Result<T, SceneError>;

use std::path::PathBuf;

use thiserror::Error;

/// Why a routine could not be exposed to the host
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    #[error("{routine}: parameter {param} has unsupported type {type_name}")]
    UnsupportedParam {
        routine: String,
        param: String,
        type_name: String,
    },

    #[error("{routine}: unsupported result type {type_name}")]
    UnsupportedResult { routine: String, type_name: String },

    #[error("{routine}: events must be instance routines")]
    ClassLevelEvent { routine: String },

    #[error("{routine}: events cannot return a value")]
    EventWithResult { routine: String },

    #[error("{routine}: script class {class} is not bound to a host class")]
    UnboundClass { routine: String, class: String },

    #[error("{routine}: host name already used by {existing}")]
    NameCollision { routine: String, existing: String },

    #[error("{routine}: {class} already has a host function of that name")]
    HostFunctionExists { routine: String, class: String },
}

impl BindError {
    pub fn routine(&self) -> &str {
        match self {
            BindError::UnsupportedParam { routine, .. }
            | BindError::UnsupportedResult { routine, .. }
            | BindError::ClassLevelEvent { routine }
            | BindError::EventWithResult { routine }
            | BindError::UnboundClass { routine, .. }
            | BindError::NameCollision { routine, .. }
            | BindError::HostFunctionExists { routine, .. } => routine,
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("the blueprint interface is already initialized on this thread")]
    AlreadyInitialized,

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("failed to read config {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    ConfigParse(#[from] toml::de::Error),
}

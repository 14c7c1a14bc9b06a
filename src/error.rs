use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid wire name `{0}`")]
    InvalidWire(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}:{line}: {reason}")]
    Parse {
        origin: String,
        line: usize,
        reason: String,
    },
    #[error("feature `{feature}` cannot be met by wire {wire}: no candidate switch in the universe")]
    UncoverableFeature { feature: &'static str, wire: String },
    #[error("selected pattern violates hop optimality at {violations} offset(s), first at {first:?}")]
    HopOptimalityViolated {
        violations: usize,
        first: (i32, i32),
    },
    #[error("solver failed: {0}")]
    Solver(String),
    #[error("snapshot {path}: {reason}")]
    Serde { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SynthError>;

impl SynthError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
    pub fn parse(origin: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            line,
            reason: reason.into(),
        }
    }
    pub fn serde(path: impl AsRef<std::path::Path>, err: Box<dyn std::error::Error>) -> Self {
        Self::Serde {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}

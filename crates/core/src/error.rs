/// Result alias that carries the custom [`FlythroughError`] type.
pub type Result<T> = std::result::Result<T, FlythroughError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum FlythroughError {
    /// The control points collapse to fewer distinct positions than a closed
    /// curve needs.
    #[error("path needs at least {required} distinct control points, got {found}")]
    DegenerateCurve { found: usize, required: usize },
    /// The control point list does not repeat its first point at the end.
    #[error("path is not closed: last control point must repeat the first")]
    OpenCurve,
    #[error("control point {index} has a non-finite coordinate")]
    NonFiniteControlPoint { index: usize },
    /// Thresholds are percentages on a 0.1 grid.
    #[error("invalid threshold {threshold}% for event `{id}`")]
    InvalidThreshold { id: String, threshold: f64 },
    #[error("event `{0}` is already scheduled")]
    DuplicateEvent(String),
    #[error("no scheduled event named `{0}`")]
    UnknownEvent(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl FlythroughError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

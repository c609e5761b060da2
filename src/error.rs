//! Error types for race setup and simulation
//!
//! Setup errors are raised while building curves, meshes and bodies, before
//! the first tick. Simulation errors are raised by the tick itself and signal
//! a setup bug that slipped through (there is no recovery path for either).

use thiserror::Error;

/// Configuration or construction failure, raised before the race starts
#[derive(Error, Debug)]
pub enum SetupError {
    /// Hermite spec lists differ in length
    #[error("Hermite spec has {points} control points but {tangents} tangents")]
    CurveLengthMismatch {
        /// Number of control points
        points: usize,
        /// Number of tangents
        tangents: usize,
    },

    /// A curve needs at least one segment
    #[error("Hermite spec needs at least 2 control points, got {0}")]
    TooFewControlPoints(usize),

    /// Control point or tangent contains NaN/inf
    #[error("Hermite control data at index {index} is not finite")]
    NonFiniteControlPoint {
        /// Offending index
        index: usize,
    },

    /// Track mesh would not form a closed tube
    #[error("Track mesh needs at least {min} slices, got {got}")]
    TooFewSlices {
        /// Requested slices
        got: usize,
        /// Minimum allowed
        min: usize,
    },

    /// Numeric parameter outside its valid range
    #[error("Invalid {field}: {reason}")]
    InvalidParameter {
        /// Parameter name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Body index does not exist in the simulation
    #[error("Unknown body index {0}")]
    UnknownBody(usize),

    /// Curve handle does not exist in the simulation
    #[error("Unknown curve handle {0}")]
    UnknownCurve(usize),

    /// Race configuration could not be parsed
    #[error("Failed to parse race config: {0}")]
    Config(#[from] serde_json::Error),

    /// Race configuration file could not be read
    #[error("Failed to read race config: {0}")]
    Io(#[from] std::io::Error),
}

impl SetupError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SetupError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure inside a simulation tick
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A particle was stepped before its state was marked valid
    #[error("Particle stepped before it was initialized")]
    NotInitialized,

    /// An enemy or wall contact refers to a curve that was never registered
    #[error("Curve handle {0} is not registered")]
    MissingCurve(usize),
}

/// Top-level error surfaced to the presentation layer
#[derive(Error, Debug)]
pub enum RaceError {
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("runtime simulation error: {0}")]
    Runtime(#[from] SimError),
}

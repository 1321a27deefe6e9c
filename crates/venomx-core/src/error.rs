use thiserror::Error;

/// Input rejected at the service boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(f64),

    #[error("max_distance_km must be a positive number, got {0}")]
    InvalidMaxDistance(f64),

    #[error("confidence_threshold must be between 0.0 and 1.0, got {0}")]
    InvalidConfidence(f64),

    #[error("antivenom_type must be 'polyvalent' or 'monovalent', got '{0}'")]
    InvalidAntivenomType(String),

    #[error("{0}")]
    MissingField(String),
}

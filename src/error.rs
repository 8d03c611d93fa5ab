//! Error types for container geometry construction.

use thiserror::Error;

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors raised while validating dimensions or building a container footprint.
///
/// Ordering and scene serialization never fail, so they have no variants here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A dimension field is missing, not a finite number, non-positive, or a
    /// cut-out does not fit inside the outer dimension it is subtracted from.
    #[error("Invalid dimension '{field}' ({value}): {reason}")]
    InvalidDimension {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported container shape: '{0}'")]
    UnsupportedShape(String),

    #[error("Triangulation failed: {0}")]
    Triangulation(String),
}

impl GeometryError {
    pub(crate) fn invalid_dimension(
        field: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDimension {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field, if the error concerns a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidDimension { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDimension { .. } => "invalid_dimension",
            Self::UnsupportedShape(_) => "unsupported_shape",
            Self::Triangulation(_) => "triangulation_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimension_message_names_field_and_value() {
        let err = GeometryError::invalid_dimension("notchWidth", 120.0, "must be smaller");
        let message = err.to_string();
        assert!(message.contains("notchWidth"));
        assert!(message.contains("120"));
        assert_eq!(err.field(), Some("notchWidth"));
        assert_eq!(err.code(), "invalid_dimension");
    }

    #[test]
    fn unsupported_shape_has_no_field() {
        let err = GeometryError::UnsupportedShape("hexagon".into());
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "Unsupported container shape: 'hexagon'");
    }
}

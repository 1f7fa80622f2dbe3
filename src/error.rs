use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotocapError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Invalid image: {details}")]
    InvalidImage { details: String },

    #[error("Vision model error: {message}")]
    Model { message: String },
}

impl PhotocapError {
    pub fn invalid_image<S: Into<String>>(details: S) -> Self {
        Self::InvalidImage {
            details: details.into(),
        }
    }

    pub fn model<S: Into<String>>(message: S) -> Self {
        Self::Model {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhotocapError>;

/// How a vision failure affects health bookkeeping.
///
/// Critical failures indicate backend-subsystem corruption and degrade the
/// health score; transient failures are isolated per-request misses and are
/// only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Critical,
    Transient,
}

/// Substrings in a backend error message that indicate subsystem-level
/// trouble rather than a single missed request.
const CRITICAL_MARKERS: &[&str] = &["corrupt", "cancel", "assert", "internal context"];

impl FailureClass {
    /// Classify an error from a ladder stage. Only backend model errors can
    /// be critical; everything else is a per-call miss.
    pub fn classify(error: &PhotocapError) -> Self {
        match error {
            PhotocapError::Model { message } => {
                let lower = message.to_lowercase();
                if CRITICAL_MARKERS.iter().any(|m| lower.contains(m)) {
                    FailureClass::Critical
                } else {
                    FailureClass::Transient
                }
            }
            _ => FailureClass::Transient,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, FailureClass::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_classification() {
        let err = PhotocapError::model("Vision request cancelled by system");
        assert_eq!(FailureClass::classify(&err), FailureClass::Critical);

        let err = PhotocapError::model("internal context became corrupt");
        assert_eq!(FailureClass::classify(&err), FailureClass::Critical);

        let err = PhotocapError::model("assertion failed in detector graph");
        assert_eq!(FailureClass::classify(&err), FailureClass::Critical);
    }

    #[test]
    fn test_transient_classification() {
        let err = PhotocapError::model("no results returned for request");
        assert_eq!(FailureClass::classify(&err), FailureClass::Transient);

        let err = PhotocapError::invalid_image("no pixel buffer");
        assert_eq!(FailureClass::classify(&err), FailureClass::Transient);
    }

    #[test]
    fn test_error_display() {
        let err = PhotocapError::model("detector unavailable");
        assert_eq!(err.to_string(), "Vision model error: detector unavailable");

        let err = PhotocapError::invalid_image("zero-sized buffer");
        assert_eq!(err.to_string(), "Invalid image: zero-sized buffer");
    }
}

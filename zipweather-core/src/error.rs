use http::StatusCode;
use thiserror::Error;

/// The closed set of failures a lookup can end in.
///
/// Boundary handlers are the only place that turns these into status codes;
/// everything below them just propagates the variant.
#[derive(Debug, Error)]
pub enum Error {
    /// Postal code is not exactly 8 ASCII digits.
    #[error("zip code must be 8 numeric digits")]
    InvalidFormat,

    /// Locality name is empty or whitespace-only.
    #[error("location can not be empty")]
    InvalidLocality,

    /// Celsius value outside the range ever recorded on Earth.
    #[error("temperature {0} is outside the earth range")]
    OutOfRange(f64),

    /// Request could not be built or sent, or the context ended first.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Remote answered with a non-2xx status.
    #[error("{status}")]
    HttpStatus {
        status: StatusCode,
        body_preview: String,
    },

    /// Response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Weather provider rejected the configured API key.
    #[error("API key is invalid")]
    InvalidApiKey,

    /// Postal code resolved to nothing, or the provider cannot resolve the locality.
    #[error("can not find zipcode")]
    LocalityNotFound,
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport { message: message.into(), source: Some(source) }
    }

    pub(crate) fn cancelled() -> Self {
        Self::Transport { message: "request context cancelled".to_string(), source: None }
    }

    pub(crate) fn deadline_exceeded() -> Self {
        Self::Transport { message: "request deadline exceeded".to_string(), source: None }
    }

    /// Remote status, when the failure is a non-2xx answer.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_displays_status_line() {
        let err = Error::HttpStatus {
            status: StatusCode::NOT_FOUND,
            body_preview: "{}".to_string(),
        };

        assert_eq!(err.to_string(), "404 Not Found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn cancellation_is_a_transport_failure() {
        assert!(Error::cancelled().is_transport());
        assert!(Error::deadline_exceeded().is_transport());
        assert!(!Error::LocalityNotFound.is_transport());
        assert_eq!(Error::cancelled().status(), None);
    }
}

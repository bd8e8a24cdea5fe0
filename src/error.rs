//! Error types.

use std::any::Any;
use std::fmt;
use std::net::AddrParseError;

use http::StatusCode;

/// The error type returned by plait's fallible operations.
///
/// Handlers never return errors; they write responses. This type surfaces
/// infrastructure failures of the bundled host: a bad bind address, a port
/// that cannot be bound.
#[derive(Debug)]
pub enum Error {
    Addr(AddrParseError),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(e) => write!(f, "invalid address: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Addr(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}

/// An HTTP status carried as an error.
///
/// Its message is the standard reason phrase, so it reads the same in logs
/// as on the wire. Handlers signal "answer with this status" by panicking
/// with it; [`middleware::recover`](crate::middleware::recover) and the
/// server turn the panic back into a response with that status.
///
/// ```rust,should_panic
/// use http::StatusCode;
/// use plait::StatusError;
///
/// std::panic::panic_any(StatusError::from(StatusCode::FORBIDDEN));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusError(pub StatusCode);

impl StatusError {
    pub fn status(self) -> StatusCode {
        self.0
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.canonical_reason().unwrap_or(""))
    }
}

impl std::error::Error for StatusError {}

impl From<StatusCode> for StatusError {
    fn from(status: StatusCode) -> Self {
        Self(status)
    }
}

// ── Panic payloads ────────────────────────────────────────────────────────────

/// The status a panic payload asks for.
pub(crate) fn status_of(payload: &(dyn Any + Send)) -> StatusCode {
    payload
        .downcast_ref::<StatusError>()
        .map_or(StatusCode::INTERNAL_SERVER_ERROR, |e| e.status())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(e) = payload.downcast_ref::<StatusError>() {
        e.to_string()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn status_error_reads_as_reason_phrase() {
        assert_eq!(StatusError(StatusCode::NOT_FOUND).to_string(), "Not Found");
        assert_eq!(
            StatusError::from(StatusCode::INTERNAL_SERVER_ERROR).to_string(),
            "Internal Server Error",
        );
    }

    #[test]
    fn unregistered_status_has_empty_message() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(StatusError(status).to_string(), "");
        assert_eq!(StatusError(status).status().as_u16(), 599);
    }

    #[test]
    fn error_exposes_its_source() {
        let parse = "not-an-addr".parse::<std::net::SocketAddr>().unwrap_err();
        let err = Error::from(parse);
        assert!(err.to_string().starts_with("invalid address: "));
        assert!(err.source().is_some());

        let io = Error::from(std::io::Error::other("boom"));
        assert_eq!(io.to_string(), "io: boom");
    }
}

//! Error type shared by every stream and transform.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors surfaced by event streams and the transforms layered over them.
///
/// Statistical "unknown" results are never errors; getters on
/// [`RunningStatistics`](crate::RunningStatistics) return `None` instead.
#[derive(Debug)]
pub enum StreamError {
    /// A transform was constructed with parameters it cannot honor.
    Configuration(String),
    /// The stream was read after `close()`.
    ClosedStream,
    /// Opaque failure from the upstream event source, passed through unchanged.
    Transport(Box<dyn Error + Send + Sync>),
    /// An upstream row could not be interpreted (unknown status code, wrong value kind).
    Data(String),
}

impl StreamError {
    /// Wraps an upstream failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        StreamError::Transport(err.into())
    }

    /// Returns true if this is a [`StreamError::ClosedStream`].
    pub fn is_closed_stream(&self) -> bool {
        matches!(self, StreamError::ClosedStream)
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            StreamError::ClosedStream => write!(f, "read from a closed stream"),
            StreamError::Transport(e) => write!(f, "transport error: {e}"),
            StreamError::Data(msg) => write!(f, "malformed data: {msg}"),
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamError::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        StreamError::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = StreamError::Configuration("bins must be at least 3".to_string());
        assert!(err.to_string().contains("bins must be at least 3"));

        assert!(StreamError::ClosedStream.to_string().contains("closed"));

        let err = StreamError::Data("unknown code number: 7".to_string());
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_transport_keeps_source() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset");
        let err: StreamError = io_err.into();

        match &err {
            StreamError::Transport(inner) => assert!(inner.to_string().contains("peer reset")),
            _ => panic!("Expected Transport variant"),
        }
        assert!(err.source().is_some());
        assert!(!err.is_closed_stream());
    }

    #[test]
    fn test_closed_stream_is_distinct() {
        assert!(StreamError::ClosedStream.is_closed_stream());
        assert!(StreamError::ClosedStream.source().is_none());
    }
}

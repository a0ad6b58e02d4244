use thiserror::Error;

use crate::proto::Backtrace;

/// Errors surfaced by driver operations.
///
/// Server-reported errors (`ClientError`, `CompileError`, `RuntimeError`)
/// carry the message string from the response along with the query
/// backtrace when the server provided one. Everything else is produced
/// client-side.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Connection attempt timed out")]
    ConnectTimeout,

    #[error("No connectable address")]
    NoConnectableAddress,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timed out")]
    RequestTimedOut,

    #[error("Client error: {message}")]
    ClientError {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[error("Compile error: {message}")]
    CompileError {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[error("Runtime error: {message}")]
    RuntimeError {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DriverError::DnsResolution("db.example.com: no such host".to_string());
        assert_eq!(
            err.to_string(),
            "DNS resolution failed: db.example.com: no such host"
        );

        let err = DriverError::ConnectFailed("10.0.0.1:28015: refused".to_string());
        assert_eq!(err.to_string(), "Connection failed: 10.0.0.1:28015: refused");

        let err = DriverError::RuntimeError {
            message: "table `posts` does not exist".to_string(),
            backtrace: None,
        };
        assert_eq!(
            err.to_string(),
            "Runtime error: table `posts` does not exist"
        );

        let err = DriverError::UnexpectedResponseShape("got 3 datums".to_string());
        assert_eq!(err.to_string(), "Unexpected response shape: got 3 datums");
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = DriverError::CompileError {
            message: "bad term".to_string(),
            backtrace: Some(Backtrace::default()),
        };
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_driver_result_type() {
        let ok: DriverResult<u64> = Ok(7);
        assert_eq!(ok.unwrap(), 7);

        let err: DriverResult<u64> = Err(DriverError::ConnectionClosed);
        assert!(err.is_err());
    }
}

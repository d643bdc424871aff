//! Remote control surface
//!
//! The daemon exposes `Hide()` and `Show(as codes)` under one well-known
//! D-Bus name. The bus side lives in `bus`; it only forwards calls to the
//! event loop, where `dispatch` validates and applies them.

mod bus;
mod dispatch;

use thiserror::Error;
use tokio::sync::oneshot;

pub use bus::{spawn_bus, BusError};
pub use dispatch::{dispatch, Effect};

/// Well-known bus name, also used as the interface name
pub const SERVICE_NAME: &str = "com.alexhulbert.mercury.Hud";

/// Object path for a bus name (`a.b.C` becomes `/a/b/C`)
pub fn object_path(service: &str) -> String {
    format!("/{}", service.replace('.', "/"))
}

/// Per-call failure, reported to the caller only
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    #[error("{method} takes {expected} argument(s), got {got}")]
    Arity {
        method: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Argument {index}: '{value}' is not a 16-bit hex code")]
    InvalidCode { index: usize, value: String },
    #[error("HUD event loop is not running")]
    Unavailable,
}

impl From<ControlError> for zbus::fdo::Error {
    fn from(error: ControlError) -> Self {
        let message = error.to_string();
        match error {
            ControlError::UnknownMethod(_) => zbus::fdo::Error::UnknownMethod(message),
            ControlError::Arity { .. } | ControlError::InvalidCode { .. } => {
                zbus::fdo::Error::InvalidArgs(message)
            }
            ControlError::Unavailable => zbus::fdo::Error::Failed(message),
        }
    }
}

/// A control call travelling from the bus thread to the event loop
#[derive(Debug)]
pub struct ControlRequest {
    pub method: String,
    pub args: Vec<String>,
    pub reply: oneshot::Sender<Result<(), ControlError>>,
}

impl ControlRequest {
    pub fn new(
        method: &str,
        args: Vec<String>,
    ) -> (Self, oneshot::Receiver<Result<(), ControlError>>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                method: method.to_string(),
                args,
                reply,
            },
            rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_from_service_name() {
        assert_eq!(object_path(SERVICE_NAME), "/com/alexhulbert/mercury/Hud");
        assert_eq!(object_path("Hud"), "/Hud");
    }

    #[test]
    fn test_errors_map_to_dbus_errors() {
        let err: zbus::fdo::Error = ControlError::UnknownMethod("Blink".into()).into();
        assert!(matches!(err, zbus::fdo::Error::UnknownMethod(_)));

        let err: zbus::fdo::Error = ControlError::Arity {
            method: "Show",
            expected: 9,
            got: 3,
        }
        .into();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(ref m) if m.contains("got 3")));

        let err: zbus::fdo::Error = ControlError::InvalidCode {
            index: 0,
            value: "zzzz".into(),
        }
        .into();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(_)));

        let err: zbus::fdo::Error = ControlError::Unavailable.into();
        assert!(matches!(err, zbus::fdo::Error::Failed(_)));
    }

    #[test]
    fn test_request_reply_roundtrip() {
        let (request, mut rx) = ControlRequest::new("Hide", Vec::new());
        assert_eq!(request.method, "Hide");
        request.reply.send(Ok(())).unwrap();
        assert_eq!(rx.try_recv(), Ok(Ok(())));
    }
}

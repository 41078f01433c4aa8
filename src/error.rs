// Copyright 2024 Bare Metal Enrollment Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error and Result implementations.

use std::fmt;

use reqwest::StatusCode;

/// Kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Unable to open a session to the BMC.
    ///
    /// Covers Redfish, IPMI and vendor web sessions.
    ConnectionFailed,

    /// Requested resource was not found.
    ///
    /// Roughly maps to HTTP 404 and 410.
    ResourceNotFound,

    /// No BMC account with the requested user name.
    AccountNotFound,

    /// The KCS interface cannot be managed on this platform.
    KcsNotSupported,

    /// The host interface cannot be managed on this platform.
    HostInterfaceNotSupported,

    /// The operation is not available on this platform.
    NotSupported,

    /// Invalid value passed to one of parameters.
    ///
    /// May be result of HTTP 400.
    InvalidInput,

    /// Operation has reached the specified time out.
    OperationTimedOut,

    /// Operation failed to complete.
    OperationFailed,

    /// Protocol-level error reported by the underlying transport.
    ProtocolError,

    /// Response received from the BMC is malformed.
    InvalidResponse,
}

/// Error from a BMC call.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    status: Option<StatusCode>,
    message: Option<String>,
}

/// Result of a BMC call.
pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Create a new error of the provided kind.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            status: None,
            message: Some(message.into()),
        }
    }

    /// Create with providing all details.
    pub(crate) fn new_with_details(
        kind: ErrorKind,
        status: Option<StatusCode>,
        message: Option<String>,
    ) -> Error {
        Error {
            kind,
            status,
            message,
        }
    }

    /// Error from an HTTP status outside of the 2xx range.
    pub(crate) fn from_status<S: Into<String>>(status: StatusCode, message: S) -> Error {
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::ConnectionFailed,
            StatusCode::NOT_FOUND | StatusCode::GONE => ErrorKind::ResourceNotFound,
            StatusCode::METHOD_NOT_ALLOWED => ErrorKind::NotSupported,
            c if c.is_client_error() => ErrorKind::InvalidInput,
            _ => ErrorKind::OperationFailed,
        };
        let text = status.canonical_reason().unwrap_or("Unknown status");
        Error::new_with_details(
            kind,
            Some(status),
            Some(format!("{}: {} {}", message.into(), status.as_u16(), text)),
        )
    }

    /// Error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status code (if any).
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Prepend the name of a stage to the error message.
    ///
    /// The kind and status are preserved, so sentinel kinds survive wrapping.
    pub fn context<S: fmt::Display>(self, stage: S) -> Error {
        let message = match self.message {
            Some(msg) => format!("{}: {}", stage, msg),
            None => format!("{}: {}", stage, self.kind),
        };
        Error {
            message: Some(message),
            ..self
        }
    }
}

/// Adds stage annotations to results.
pub trait ResultExt<T> {
    /// Prepend `stage` to the error, if any.
    fn context<S: fmt::Display>(self, stage: S) -> Result<T>;

    /// Prepend a lazily built stage to the error, if any.
    fn with_context<S: fmt::Display, F: FnOnce() -> S>(self, stage: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for ::std::result::Result<T, E> {
    fn context<S: fmt::Display>(self, stage: S) -> Result<T> {
        self.map_err(|e| e.into().context(stage))
    }

    fn with_context<S: fmt::Display, F: FnOnce() -> S>(self, stage: F) -> Result<T> {
        self.map_err(|e| e.into().context(stage()))
    }
}

impl ErrorKind {
    /// Short description of the error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionFailed => "Failed to connect to the BMC",
            ErrorKind::ResourceNotFound => "Requested resource was not found",
            ErrorKind::AccountNotFound => "account not found",
            ErrorKind::KcsNotSupported => "KCS interface not supported",
            ErrorKind::HostInterfaceNotSupported => "host interface not supported",
            ErrorKind::NotSupported => "Operation is not supported by the platform",
            ErrorKind::InvalidInput => "Input value(s) are invalid or missing",
            ErrorKind::OperationTimedOut => "Time out reached while waiting for the operation",
            ErrorKind::OperationFailed => "Requested operation has failed",
            ErrorKind::ProtocolError => "Error when accessing the BMC",
            ErrorKind::InvalidResponse => "Received invalid response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(ref msg) = self.message {
            write!(f, ": {}", msg)
        } else {
            Ok(())
        }
    }
}

impl ::std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Error {
        let msg = value.to_string();
        let kind = if value.is_connect() {
            ErrorKind::ConnectionFailed
        } else if value.is_timeout() {
            ErrorKind::OperationTimedOut
        } else if value.is_decode() {
            ErrorKind::InvalidResponse
        } else if value.is_builder() {
            ErrorKind::InvalidInput
        } else {
            ErrorKind::ProtocolError
        };

        Error::new_with_details(kind, value.status(), Some(msg))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Error {
        Error::new(ErrorKind::InvalidResponse, value.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(value: serde_yaml::Error) -> Error {
        Error::new(ErrorKind::InvalidInput, value.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Error {
        Error::new(ErrorKind::InvalidInput, value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Error {
        Error::new(ErrorKind::ProtocolError, value.to_string())
    }
}

//! Error types for the Graphene runtime layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while locating, launching, or talking to Graphene.
#[derive(Debug, Error)]
pub enum Error {
	/// No Graphene binary was found in any search location.
	#[error("Graphene runtime not found. Pass --runtime <path> or set GRAPHENE_RUNTIME")]
	RuntimeNotFound,

	/// An explicitly configured runtime path does not contain a usable binary.
	#[error("No Graphene binary at {}", path.display())]
	InvalidRuntimePath { path: PathBuf },

	/// Failed to launch the runtime process.
	#[error("Failed to launch Graphene: {0}")]
	LaunchFailed(String),

	/// The host already owns a running runtime process.
	#[error("Graphene is already running (pid {pid})")]
	AlreadyRunning { pid: u32 },

	/// Failed to establish the Marionette connection.
	#[error("Failed to connect to Marionette: {0}")]
	ConnectionFailed(String),

	/// Framing or socket level error.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Marionette protocol violation.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Error returned by the remote Marionette server.
	#[error("{error}: {message}")]
	Remote {
		/// WebDriver error code (e.g., "no such element", "javascript error")
		error: String,
		/// Human-readable error message
		message: String,
		/// Remote stack trace (if available)
		stacktrace: Option<String>,
	},

	/// Timeout waiting for operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// Connection closed while a command was pending.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns the WebDriver error code if this is a Remote error.
	pub fn error_code(&self) -> Option<&str> {
		match self {
			Error::Remote { error, .. } => Some(error),
			_ => None,
		}
	}

	/// Returns the remote stack trace if present.
	pub fn stacktrace(&self) -> Option<&str> {
		match self {
			Error::Remote { stacktrace, .. } => stacktrace.as_deref(),
			_ => None,
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout(_) => true,
			Error::Remote { error, .. } => error == "timeout" || error == "script timeout",
			_ => false,
		}
	}
}

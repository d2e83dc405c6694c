//! Command-group entry points: help metadata plus host/session construction
//! forwarded to a [`HostProvider`].

use crate::help::{CommandDescriptor, help};
use crate::provider::{GrapheneProvider, HostProvider};

/// Forwards to `provider.create_host`, returning its result untouched.
pub async fn create_host<P: HostProvider>(provider: &P, config: P::HostConfig) -> Result<P::Host, P::Error> {
	provider.create_host(config).await
}

/// Forwards to `provider.create_session`, returning its result untouched.
pub async fn create_session<P: HostProvider>(provider: &P, config: P::SessionConfig) -> Result<P::Session, P::Error> {
	provider.create_session(config).await
}

/// The command group as one value: descriptor plus the two constructors.
#[derive(Debug, Clone, Default)]
pub struct Shim<P = GrapheneProvider> {
	provider: P,
}

impl<P: HostProvider> Shim<P> {
	pub fn new(provider: P) -> Self {
		Self { provider }
	}

	pub fn help(&self) -> CommandDescriptor {
		help()
	}

	pub fn provider(&self) -> &P {
		&self.provider
	}

	pub async fn create_host(&self, config: P::HostConfig) -> Result<P::Host, P::Error> {
		create_host(&self.provider, config).await
	}

	pub async fn create_session(&self, config: P::SessionConfig) -> Result<P::Session, P::Error> {
		create_session(&self.provider, config).await
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use thiserror::Error;

	use super::*;

	#[derive(Debug, Clone, PartialEq, Eq)]
	struct Token {
		id: u32,
	}

	#[derive(Debug, Clone, PartialEq, Eq, Error)]
	enum StubError {
		#[error("runtime missing: {0}")]
		Missing(String),
	}

	/// Returns `{id: 1}` for `/usr/bin/graphene` and fails for anything else.
	#[derive(Default)]
	struct StubProvider {
		calls: AtomicUsize,
	}

	impl StubProvider {
		fn answer(&self, input: &str, id: u32) -> Result<Token, StubError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if input == "/usr/bin/graphene" {
				Ok(Token { id })
			} else {
				Err(StubError::Missing(input.to_string()))
			}
		}
	}

	#[async_trait]
	impl HostProvider for StubProvider {
		type HostConfig = String;
		type Host = Token;
		type SessionConfig = String;
		type Session = Token;
		type Error = StubError;

		async fn create_host(&self, config: String) -> Result<Token, StubError> {
			self.answer(&config, 1)
		}

		async fn create_session(&self, config: String) -> Result<Token, StubError> {
			self.answer(&config, 2)
		}
	}

	#[tokio::test]
	async fn create_host_returns_provider_value() {
		let provider = StubProvider::default();
		let host = create_host(&provider, "/usr/bin/graphene".to_string()).await.unwrap();
		assert_eq!(host, Token { id: 1 });
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn create_session_returns_provider_value() {
		let provider = StubProvider::default();
		let session = create_session(&provider, "/usr/bin/graphene".to_string()).await.unwrap();
		assert_eq!(session, Token { id: 2 });
	}

	#[tokio::test]
	async fn provider_errors_pass_through_unchanged() {
		let provider = StubProvider::default();
		let expected = provider.answer("/missing", 0).unwrap_err();

		let host_err = create_host(&provider, "/missing".to_string()).await.unwrap_err();
		assert_eq!(host_err, expected);
		assert_eq!(host_err.to_string(), "runtime missing: /missing");

		let session_err = create_session(&provider, "/missing".to_string()).await.unwrap_err();
		assert_eq!(session_err, expected);
	}

	#[tokio::test]
	async fn shim_bundles_help_and_constructors() {
		let shim = Shim::new(StubProvider::default());
		assert_eq!(shim.help(), help());
		assert_eq!(shim.help(), shim.help());
		assert_eq!(shim.create_host("/usr/bin/graphene".into()).await.unwrap(), Token { id: 1 });
		assert_eq!(shim.create_session("/usr/bin/graphene".into()).await.unwrap(), Token { id: 2 });
		assert_eq!(shim.provider().calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn default_shim_surfaces_runtime_errors() {
		let shim: Shim = Shim::default();
		let err = shim
			.create_host(crate::HostConfig::with_runtime("/nonexistent/graphene"))
			.await
			.unwrap_err();
		assert!(matches!(err, crate::Error::InvalidRuntimePath { .. }));
	}
}

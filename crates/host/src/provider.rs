//! Host and session construction capability.

use async_trait::async_trait;

use crate::config::{HostConfig, SessionConfig};
use crate::host::GrapheneHost;
use crate::session::Session;

/// Anything that can construct hosts and sessions
///
/// The shim forwards to an implementation of this trait without inspecting
/// configs, results, or errors, so tests can substitute a stub.
#[async_trait]
pub trait HostProvider: Send + Sync {
	type HostConfig: Send + 'static;
	type Host: Send;
	type SessionConfig: Send + 'static;
	type Session: Send;
	type Error: std::error::Error + Send + Sync + 'static;

	async fn create_host(&self, config: Self::HostConfig) -> Result<Self::Host, Self::Error>;

	async fn create_session(&self, config: Self::SessionConfig) -> Result<Self::Session, Self::Error>;
}

/// Launches real Graphene runtimes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrapheneProvider;

#[async_trait]
impl HostProvider for GrapheneProvider {
	type HostConfig = HostConfig;
	type Host = GrapheneHost;
	type SessionConfig = SessionConfig;
	type Session = Session;
	type Error = graphene_runtime::Error;

	async fn create_host(&self, config: HostConfig) -> Result<GrapheneHost, Self::Error> {
		GrapheneHost::new(config)
	}

	async fn create_session(&self, config: SessionConfig) -> Result<Session, Self::Error> {
		Session::start(config).await
	}
}

//! Graphene host: a resolved runtime binary plus at most one running process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use graphene_runtime::{Error, LaunchOptions, Result, RuntimeProcess, locate_runtime};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use crate::config::HostConfig;

/// Handle on a Graphene runtime installation
///
/// Clones share the same process slot, so a session can keep a handle to the
/// host that launched it.
#[derive(Debug, Clone)]
pub struct GrapheneHost {
	inner: Arc<HostInner>,
}

#[derive(Debug)]
struct HostInner {
	binary: PathBuf,
	config: HostConfig,
	process: TokioMutex<Option<RuntimeProcess>>,
}

impl GrapheneHost {
	/// Resolves the runtime binary from `config.runtime`, `GRAPHENE_RUNTIME`, or `PATH`.
	pub fn new(config: HostConfig) -> Result<Self> {
		let binary = locate_runtime(config.runtime.as_deref())?;
		info!(target = "graphene.host", binary = %binary.display(), "using graphene runtime");
		Ok(Self::with_binary(binary, config))
	}

	/// Builds a host around an already resolved binary.
	pub fn with_binary(binary: PathBuf, config: HostConfig) -> Self {
		Self {
			inner: Arc::new(HostInner {
				binary,
				config,
				process: TokioMutex::new(None),
			}),
		}
	}

	pub fn binary(&self) -> &Path {
		&self.inner.binary
	}

	pub fn config(&self) -> &HostConfig {
		&self.inner.config
	}

	pub fn startup_timeout(&self) -> Duration {
		self.inner.config.startup_timeout
	}

	/// Launches the runtime against `profile`.
	///
	/// # Errors
	///
	/// `Error::AlreadyRunning` if this host's process is still alive, or
	/// `Error::LaunchFailed` if the runtime does not start.
	pub async fn start(&self, profile: &Path) -> Result<()> {
		let mut slot = self.inner.process.lock().await;

		if let Some(process) = slot.as_mut() {
			if process.is_alive() {
				return Err(Error::AlreadyRunning {
					pid: process.pid().unwrap_or_default(),
				});
			}
			debug!(target = "graphene.host", "previous graphene process has exited; replacing");
		}

		let options = LaunchOptions {
			binary: self.inner.binary.clone(),
			profile: profile.to_path_buf(),
			args: self.inner.config.args.clone(),
			env: self.inner.config.env.clone(),
		};
		let process = RuntimeProcess::launch(&options).await?;
		info!(target = "graphene.host", pid = ?process.pid(), profile = %profile.display(), "graphene started");

		*slot = Some(process);
		Ok(())
	}

	/// Kills the runtime. Stopping an idle host is a no-op.
	pub async fn stop(&self) -> Result<()> {
		self.shutdown(Duration::ZERO).await
	}

	/// Gives the runtime `grace` to exit on its own before killing it.
	pub async fn shutdown(&self, grace: Duration) -> Result<()> {
		let Some(process) = self.inner.process.lock().await.take() else {
			debug!(target = "graphene.host", "stop requested but graphene is not running");
			return Ok(());
		};

		let pid = process.pid();
		if let Err(e) = process.shutdown(grace).await {
			warn!(target = "graphene.host", ?pid, error = %e, "failed to stop graphene");
			return Err(e);
		}
		info!(target = "graphene.host", ?pid, "graphene stopped");
		Ok(())
	}

	/// Returns true while the runtime process is alive.
	pub async fn is_running(&self) -> bool {
		match self.inner.process.lock().await.as_mut() {
			Some(process) => process.is_alive(),
			None => false,
		}
	}

	pub async fn pid(&self) -> Option<u32> {
		self.inner.process.lock().await.as_ref().and_then(RuntimeProcess::pid)
	}
}

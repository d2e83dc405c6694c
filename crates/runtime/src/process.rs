//! Graphene process management
//!
//! Launches the runtime against a profile with Marionette enabled and owns the
//! child process until it is shut down.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{Error, Result};

/// Everything needed to spawn one runtime process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Resolved Graphene executable.
	pub binary: PathBuf,
	/// Profile directory passed via `-profile`.
	pub profile: PathBuf,
	/// Extra arguments appended after the standard ones.
	pub args: Vec<String>,
	/// Extra environment for the child.
	pub env: BTreeMap<String, String>,
}

impl LaunchOptions {
	/// Builds the full argument list passed to the runtime.
	pub fn command_args(&self) -> Vec<String> {
		let mut args = vec![
			"-profile".to_string(),
			self.profile.display().to_string(),
			"-no-remote".to_string(),
			"-marionette".to_string(),
		];
		args.extend(self.args.iter().cloned());
		args
	}
}

/// A running Graphene process
#[derive(Debug)]
pub struct RuntimeProcess {
	child: Child,
}

impl RuntimeProcess {
	/// Launch the runtime process
	///
	/// The child inherits stdio so runtime console output stays visible, and is
	/// killed if the handle is dropped without an explicit shutdown.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the process cannot be spawned or exits
	/// immediately.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let args = options.command_args();
		debug!(
			target = "graphene.process",
			binary = %options.binary.display(),
			?args,
			"launching graphene"
		);

		let mut cmd = Command::new(&options.binary);
		cmd.args(&args)
			.env("MOZ_CRASHREPORTER_DISABLE", "1")
			.env("MOZ_MARIONETTE", "1")
			.envs(&options.env)
			.stdin(Stdio::null())
			.stdout(Stdio::inherit())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("Failed to spawn {}: {}", options.binary.display(), e)))?;

		tokio::time::sleep(Duration::from_millis(100)).await;

		match child.try_wait() {
			Ok(Some(status)) => {
				return Err(Error::LaunchFailed(format!("Graphene exited immediately with status: {}", status)));
			}
			Ok(None) => {}
			Err(e) => {
				return Err(Error::LaunchFailed(format!("Failed to check process status: {}", e)));
			}
		}

		Ok(Self { child })
	}

	/// OS process id, if the child has not been reaped yet.
	pub fn pid(&self) -> Option<u32> {
		self.child.id()
	}

	/// Returns true if the child has not exited.
	pub fn is_alive(&mut self) -> bool {
		matches!(self.child.try_wait(), Ok(None))
	}

	/// Waits up to `grace` for a voluntary exit, then kills the process.
	pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
		if let Ok(Ok(status)) = tokio::time::timeout(grace, self.child.wait()).await {
			debug!(target = "graphene.process", %status, "graphene exited");
			return Ok(());
		}

		self.kill().await
	}

	/// Force kill the process and reap it.
	pub async fn kill(mut self) -> Result<()> {
		#[cfg(windows)]
		{
			drop(self.child.stdin.take());
			drop(self.child.stdout.take());
			drop(self.child.stderr.take());
		}

		if let Err(e) = self.child.kill().await {
			if !matches!(self.child.try_wait(), Ok(Some(_))) {
				return Err(Error::LaunchFailed(format!("Failed to kill process: {}", e)));
			}
		}

		let _ = tokio::time::timeout(Duration::from_secs(2), self.child.wait()).await;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options(binary: &str) -> LaunchOptions {
		LaunchOptions {
			binary: PathBuf::from(binary),
			profile: PathBuf::from("/tmp/profile"),
			args: vec!["-jsconsole".to_string()],
			env: BTreeMap::new(),
		}
	}

	#[test]
	fn command_args_order() {
		assert_eq!(
			options("graphene").command_args(),
			vec!["-profile", "/tmp/profile", "-no-remote", "-marionette", "-jsconsole"]
		);
	}

	#[tokio::test]
	async fn launch_missing_binary_fails() {
		let err = RuntimeProcess::launch(&options("/definitely/not/graphene")).await.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)), "got {err:?}");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn immediate_exit_is_reported() {
		let err = RuntimeProcess::launch(&options("/bin/true")).await.unwrap_err();
		match err {
			Error::LaunchFailed(msg) => assert!(msg.contains("exited immediately"), "{msg}"),
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn long_running_process_can_be_killed() {
		let dir = tempfile::tempdir().unwrap();
		let script = dir.path().join("graphene");
		std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
		{
			use std::os::unix::fs::PermissionsExt;
			std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
		}

		let mut process = RuntimeProcess::launch(&LaunchOptions {
			binary: script,
			profile: dir.path().to_path_buf(),
			args: Vec::new(),
			env: BTreeMap::new(),
		})
		.await
		.unwrap();

		assert!(process.is_alive());
		assert!(process.pid().is_some());
		process.shutdown(Duration::from_millis(50)).await.unwrap();
	}
}

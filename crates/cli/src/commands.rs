//! Subcommand handlers.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use graphene_host::{Context, HostConfig, Session, SessionConfig, SessionOptions, Shim, help};
use graphene_runtime::locate_runtime;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, RunArgs};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let runtime = cli.runtime.as_deref();
	match cli.command {
		Commands::HelpJson => help_json(),
		Commands::Locate => locate(runtime),
		Commands::Run(args) => run(runtime, args).await,
	}
}

fn help_json() -> Result<()> {
	let rendered = serde_json::to_string_pretty(&help()).context("failed to render descriptor")?;
	println!("{rendered}");
	Ok(())
}

fn locate(runtime: Option<&Path>) -> Result<()> {
	let binary = locate_runtime(runtime)?;
	println!("{}", binary.display());
	Ok(())
}

async fn run(runtime: Option<&Path>, args: RunArgs) -> Result<()> {
	let shim: Shim = Shim::default();

	let host_config = host_config(runtime, &args);
	let host = shim.create_host(host_config).await.context("failed to create graphene host")?;

	let session_config = SessionConfig {
		host,
		options: session_options(&args),
	};
	let session = shim
		.create_session(session_config)
		.await
		.context("failed to create marionette session")?;

	let outcome = drive(&session, &args).await;
	let destroyed = session.destroy().await;

	outcome?;
	destroyed.context("failed to stop graphene")
}

/// Runs the requested actions, or waits for Ctrl-C when there are none.
async fn drive(session: &Session, args: &RunArgs) -> Result<()> {
	if let Some(url) = &args.url {
		session.navigate(url).await.with_context(|| format!("failed to navigate to {url}"))?;
		info!(target = "graphene.cli", url = %url, "navigated");
	}

	if let Some(path) = &args.script {
		let script = tokio::fs::read_to_string(path)
			.await
			.with_context(|| format!("failed to read script {}", path.display()))?;
		let context = Context::from(args.context);
		if context != Context::Content {
			session.set_context(context).await?;
		}
		let value = session
			.execute_script(&script, Vec::new())
			.await
			.with_context(|| format!("script {} failed", path.display()))?;
		println!("{}", serde_json::to_string_pretty(&value)?);
	}

	if args.is_interactive() {
		info!(target = "graphene.cli", session = %session.id(), "session ready; press Ctrl-C to stop");
		if let Err(e) = tokio::signal::ctrl_c().await {
			warn!(target = "graphene.cli", error = %e, "failed to wait for Ctrl-C");
		}
	}

	Ok(())
}

fn host_config(runtime: Option<&Path>, args: &RunArgs) -> HostConfig {
	let mut config = HostConfig {
		runtime: runtime.map(Path::to_path_buf),
		..HostConfig::default()
	};
	if let Some(ms) = args.startup_timeout_ms {
		config.startup_timeout = Duration::from_millis(ms);
	}
	config
}

fn session_options(args: &RunArgs) -> SessionOptions {
	SessionOptions {
		profile: args.profile.clone(),
		port: args.port,
		prefs: args.prefs.iter().cloned().collect::<BTreeMap<_, _>>(),
		..SessionOptions::default()
	}
}

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use graphene_host::help::RUNTIME_ARG;
use graphene_host::{Context, DEFAULT_MARIONETTE_PORT, help};
use serde_json::Value;

/// Root CLI for the Graphene host.
///
/// The group options (`--runtime`) are not declared here; [`command`] adds
/// them from the host's help descriptor.
#[derive(Parser, Debug)]
#[command(name = "graphene-host")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Value of the descriptor's `--runtime` option.
	#[arg(skip)]
	pub runtime: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

/// Full command: the derived subcommands plus the descriptor's group options.
pub fn command() -> clap::Command {
	let descriptor = help();
	descriptor.augment(Cli::command().about(descriptor.group.description.clone()))
}

/// Parses the process arguments, exiting with usage text on error.
pub fn parse() -> Cli {
	try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

pub fn try_parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
	I: IntoIterator<Item = T>,
	T: Into<OsString> + Clone,
{
	let matches = command().try_get_matches_from(args)?;
	let mut cli = Cli::from_arg_matches(&matches)?;
	cli.runtime = matches
		.get_one::<String>(RUNTIME_ARG.trim_start_matches('-'))
		.map(PathBuf::from);
	Ok(cli)
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Print the command-group descriptor as JSON.
	HelpJson,
	/// Print the Graphene binary that would be launched.
	Locate,
	/// Start Graphene, open a Marionette session, and optionally run a script.
	Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Profile directory (a temporary profile is used when omitted).
	#[arg(long, value_name = "DIR")]
	pub profile: Option<PathBuf>,

	/// Marionette port.
	#[arg(long, default_value_t = DEFAULT_MARIONETTE_PORT)]
	pub port: u16,

	/// Extra profile pref, NAME=VALUE where VALUE is JSON or a bare string.
	#[arg(long = "pref", value_name = "NAME=VALUE", value_parser = parse_pref, action = clap::ArgAction::Append)]
	pub prefs: Vec<(String, Value)>,

	/// Navigate to this URL once the session is up.
	#[arg(long, value_name = "URL")]
	pub url: Option<String>,

	/// JavaScript file to execute; its return value is printed as JSON.
	#[arg(long, value_name = "FILE")]
	pub script: Option<PathBuf>,

	/// Context the script runs in.
	#[arg(long, value_enum, default_value = "content")]
	pub context: CliContext,

	/// Time allowed for Graphene to accept Marionette connections (milliseconds).
	#[arg(long, value_name = "MS")]
	pub startup_timeout_ms: Option<u64>,
}

impl RunArgs {
	/// Returns true when the session should stay up until interrupted.
	pub fn is_interactive(&self) -> bool {
		self.url.is_none() && self.script.is_none()
	}
}

/// Script context (CLI wrapper for graphene_host::Context)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CliContext {
	/// Privileged runtime context
	Chrome,
	/// Web content of the current window
	#[default]
	Content,
}

impl From<CliContext> for Context {
	fn from(context: CliContext) -> Self {
		match context {
			CliContext::Chrome => Context::Chrome,
			CliContext::Content => Context::Content,
		}
	}
}

/// Parses `NAME=VALUE`; values that are not valid JSON are taken as strings.
pub fn parse_pref(raw: &str) -> Result<(String, Value), String> {
	let (name, value) = raw
		.split_once('=')
		.ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
	let name = name.trim();
	if name.is_empty() {
		return Err(format!("pref name is empty in '{raw}'"));
	}
	let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
	Ok((name.to_string(), value))
}

/// Help colors in cargo's style: green bold headers, cyan literals.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

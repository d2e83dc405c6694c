use std::path::PathBuf;

use clap::CommandFactory;
use serde_json::json;

use super::*;

#[test]
fn parse_help_json_command() {
	let cli = try_parse_from(["graphene-host", "help-json"]).unwrap();
	assert!(matches!(cli.command, Commands::HelpJson));
	assert!(cli.runtime.is_none());
	assert_eq!(cli.verbose, 0);
}

#[test]
fn runtime_is_global() {
	let before = try_parse_from(["graphene-host", "--runtime", "/opt/graphene", "locate"]).unwrap();
	assert_eq!(before.runtime, Some(PathBuf::from("/opt/graphene")));

	let after = try_parse_from(["graphene-host", "locate", "--runtime", "/opt/graphene"]).unwrap();
	assert_eq!(after.runtime, Some(PathBuf::from("/opt/graphene")));
}

#[test]
fn verbose_flag_short_and_long() {
	let short_cli = try_parse_from(["graphene-host", "-v", "locate"]).unwrap();
	assert_eq!(short_cli.verbose, 1);

	let long_cli = try_parse_from(["graphene-host", "--verbose", "locate"]).unwrap();
	assert_eq!(long_cli.verbose, 1);

	let double_cli = try_parse_from(["graphene-host", "-vv", "locate"]).unwrap();
	assert_eq!(double_cli.verbose, 2);
}

#[test]
fn parse_run_defaults() {
	let cli = try_parse_from(["graphene-host", "run"]).unwrap();
	match cli.command {
		Commands::Run(args) => {
			assert_eq!(args.port, 2828);
			assert!(args.profile.is_none());
			assert!(args.prefs.is_empty());
			assert_eq!(args.context, CliContext::Content);
			assert!(args.is_interactive());
		}
		_ => panic!("Expected Run command"),
	}
}

#[test]
fn parse_run_with_everything() {
	let cli = try_parse_from([
		"graphene-host",
		"--runtime",
		"/opt/graphene",
		"run",
		"--profile",
		"/tmp/p",
		"--port",
		"2900",
		"--pref",
		"dom.mozApps.debug=true",
		"--pref",
		"b2g.system_startup_url=app://system.gaiamobile.org/index.html",
		"--script",
		"test.js",
		"--context",
		"chrome",
		"--startup-timeout-ms",
		"5000",
	])
	.unwrap();

	assert_eq!(cli.runtime, Some(PathBuf::from("/opt/graphene")));
	match cli.command {
		Commands::Run(args) => {
			assert_eq!(args.profile, Some(PathBuf::from("/tmp/p")));
			assert_eq!(args.port, 2900);
			assert_eq!(
				args.prefs,
				vec![
					("dom.mozApps.debug".to_string(), json!(true)),
					(
						"b2g.system_startup_url".to_string(),
						json!("app://system.gaiamobile.org/index.html")
					),
				]
			);
			assert_eq!(args.script, Some(PathBuf::from("test.js")));
			assert_eq!(args.context, CliContext::Chrome);
			assert_eq!(args.startup_timeout_ms, Some(5000));
			assert!(!args.is_interactive());
		}
		_ => panic!("Expected Run command"),
	}
}

#[test]
fn parse_pref_values() {
	assert_eq!(parse_pref("a.b=1").unwrap(), ("a.b".to_string(), json!(1)));
	assert_eq!(parse_pref("a.b=\"x\"").unwrap(), ("a.b".to_string(), json!("x")));
	assert_eq!(parse_pref("a.b=x=y").unwrap(), ("a.b".to_string(), json!("x=y")));
	assert!(parse_pref("novalue").is_err());
	assert!(parse_pref("=1").is_err());
}

#[test]
fn invalid_command_fails() {
	assert!(try_parse_from(["graphene-host", "unknown-command"]).is_err());
}

#[test]
fn help_lists_runtime_under_group_heading() {
	let help = command().render_help().to_string();
	assert!(help.contains("Graphene Host"));
	assert!(help.contains("--runtime <RUNTIME>"));
	assert!(help.contains("path to find graphene"));
	assert!(help.contains("Graphene host lets you run marionette tests in graphene"));
}

#[test]
fn runtime_comes_from_descriptor() {
	assert!(Cli::command().get_arguments().all(|arg| arg.get_id() != "runtime"));

	let command = command();
	let runtime = command
		.get_arguments()
		.find(|arg| arg.get_id() == "runtime")
		.expect("descriptor adds --runtime");
	assert!(runtime.is_global_set());
	assert_eq!(
		runtime.get_help().map(ToString::to_string).as_deref(),
		help().argument_help("--runtime")
	);

	let matches = command.try_get_matches_from(["graphene-host", "locate", "--runtime", "/opt/g"]).unwrap();
	assert_eq!(matches.get_one::<String>("runtime").map(String::as_str), Some("/opt/g"));
}

#[test]
fn cli_definition_is_consistent() {
	Cli::command().debug_assert();
	command().debug_assert();
}

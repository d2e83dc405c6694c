//! Command-group help metadata.
//!
//! The descriptor is what a CLI framework reads to render usage text and to
//! recognize the group's options. It is built fresh on every call and never
//! mutated.

use std::collections::BTreeMap;

use clap::{Arg, ArgAction, Command};
use serde::{Deserialize, Serialize};

/// Group title shown as the help heading.
pub const GROUP_TITLE: &str = "Graphene Host";
/// One-line description of the group.
pub const GROUP_DESCRIPTION: &str = "Graphene host lets you run marionette tests in graphene";
/// Name of the runtime option, including its dashes.
pub const RUNTIME_ARG: &str = "--runtime";
/// Help text of the runtime option.
pub const RUNTIME_HELP: &str = "path to find graphene";

/// Title and description of a command group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
	pub title: String,
	pub description: String,
}

/// Help text for one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentHelp {
	pub help: String,
}

/// Static description of the command group and its options
///
/// Serializes as `{"group": {..}, "arguments": {"--runtime": {"help": ..}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
	pub group: GroupInfo,
	/// Keyed by option name; a map keeps names unique.
	pub arguments: BTreeMap<String, ArgumentHelp>,
}

/// Returns the Graphene host descriptor.
pub fn help() -> CommandDescriptor {
	CommandDescriptor {
		group: GroupInfo {
			title: GROUP_TITLE.to_string(),
			description: GROUP_DESCRIPTION.to_string(),
		},
		arguments: BTreeMap::from([(
			RUNTIME_ARG.to_string(),
			ArgumentHelp {
				help: RUNTIME_HELP.to_string(),
			},
		)]),
	}
}

impl CommandDescriptor {
	/// Help text for `name` (e.g. `"--runtime"`).
	pub fn argument_help(&self, name: &str) -> Option<&str> {
		self.arguments.get(name).map(|a| a.help.as_str())
	}

	/// Adds the group's options to an existing clap command.
	///
	/// Every option takes one string value, is global, and is listed under a
	/// heading named after the group title.
	pub fn augment(&self, command: Command) -> Command {
		let mut command = command.next_help_heading(self.group.title.clone());
		for (name, argument) in &self.arguments {
			let long = name.trim_start_matches('-').to_string();
			command = command.arg(
				Arg::new(long.clone())
					.long(long.clone())
					.value_name(long.to_uppercase())
					.help(argument.help.clone())
					.action(ArgAction::Set)
					.global(true),
			);
		}
		command.next_help_heading(None::<&'static str>)
	}

	/// Builds a standalone clap command for the group.
	pub fn to_command(&self, name: &'static str) -> Command {
		self.augment(Command::new(name).about(self.group.description.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn group_has_title_and_description() {
		let descriptor = help();
		assert!(!descriptor.group.title.is_empty());
		assert!(!descriptor.group.description.is_empty());
		assert_eq!(descriptor.group.title, "Graphene Host");
	}

	#[test]
	fn single_runtime_argument() {
		let descriptor = help();
		assert_eq!(descriptor.arguments.len(), 1);
		let runtime = descriptor.argument_help("--runtime").unwrap();
		assert!(!runtime.is_empty());
		assert_eq!(runtime, "path to find graphene");
	}

	#[test]
	fn help_is_idempotent() {
		assert_eq!(help(), help());
	}

	#[test]
	fn json_shape() {
		let value = serde_json::to_value(help()).unwrap();
		assert_eq!(
			value,
			serde_json::json!({
				"group": {
					"title": "Graphene Host",
					"description": "Graphene host lets you run marionette tests in graphene"
				},
				"arguments": {
					"--runtime": { "help": "path to find graphene" }
				}
			})
		);
	}

	#[test]
	fn clap_command_parses_runtime() {
		let matches = help()
			.to_command("graphene-host")
			.try_get_matches_from(["graphene-host", "--runtime", "/opt/graphene"])
			.unwrap();
		assert_eq!(matches.get_one::<String>("runtime").map(String::as_str), Some("/opt/graphene"));
	}

	#[test]
	fn clap_help_mentions_group() {
		let rendered = help().to_command("graphene-host").render_help().to_string();
		assert!(rendered.contains("Graphene host lets you run marionette tests in graphene"));
		assert!(rendered.contains("Graphene Host"));
		assert!(rendered.contains("path to find graphene"));
	}
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::GrapheneHost;

/// Marionette's default listening port.
pub const DEFAULT_MARIONETTE_PORT: u16 = 2828;

/// Default time allowed for the runtime to start accepting Marionette connections.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time the runtime gets to exit after a quit request before it is killed.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Host construction settings.
///
/// Deserializable so embedders can load it from JSON; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
	/// Value of `--runtime`: a Graphene binary or a directory containing one.
	pub runtime: Option<PathBuf>,
	/// Bound on process start plus Marionette handshake.
	#[serde(rename = "startup_timeout_ms", with = "duration_ms")]
	pub startup_timeout: Duration,
	/// Wait for a voluntary exit after `Marionette:Quit`.
	#[serde(rename = "shutdown_grace_ms", with = "duration_ms")]
	pub shutdown_grace: Duration,
	/// Extra environment for the runtime process.
	pub env: BTreeMap<String, String>,
	/// Extra runtime arguments appended after the standard ones.
	pub args: Vec<String>,
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			runtime: None,
			startup_timeout: DEFAULT_STARTUP_TIMEOUT,
			shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
			env: BTreeMap::new(),
			args: Vec::new(),
		}
	}
}

impl HostConfig {
	pub fn with_runtime(runtime: impl Into<PathBuf>) -> Self {
		Self {
			runtime: Some(runtime.into()),
			..Self::default()
		}
	}
}

/// Per-session settings that do not depend on a live host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
	/// Profile directory; a temporary one is created when absent.
	pub profile: Option<PathBuf>,
	/// Marionette port written to the profile and connected to.
	pub port: u16,
	/// Extra profile prefs, overriding the defaults.
	pub prefs: BTreeMap<String, Value>,
	/// Requested capabilities (`alwaysMatch`).
	pub capabilities: Value,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			profile: None,
			port: DEFAULT_MARIONETTE_PORT,
			prefs: BTreeMap::new(),
			capabilities: Value::Object(Default::default()),
		}
	}
}

/// Session construction request: the host to run on plus session options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub host: GrapheneHost,
	pub options: SessionOptions,
}

impl SessionConfig {
	pub fn new(host: GrapheneHost) -> Self {
		Self {
			host,
			options: SessionOptions::default(),
		}
	}
}

mod duration_ms {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn host_config_defaults() {
		let config: HostConfig = serde_json::from_str("{}").unwrap();
		assert_eq!(config, HostConfig::default());
		assert_eq!(config.startup_timeout, Duration::from_secs(30));
		assert!(config.runtime.is_none());
	}

	#[test]
	fn host_config_from_json() {
		let config: HostConfig = serde_json::from_value(serde_json::json!({
			"runtime": "/opt/graphene",
			"startup_timeout_ms": 1500,
			"env": {"DISPLAY": ":99"}
		}))
		.unwrap();
		assert_eq!(config.runtime, Some(PathBuf::from("/opt/graphene")));
		assert_eq!(config.startup_timeout, Duration::from_millis(1500));
		assert_eq!(config.env.get("DISPLAY").map(String::as_str), Some(":99"));
		assert!(config.args.is_empty());
	}

	#[test]
	fn host_config_serializes_timeout_in_ms() {
		let value = serde_json::to_value(HostConfig::with_runtime("/x")).unwrap();
		assert_eq!(value["startup_timeout_ms"], 30_000);
		assert_eq!(value["shutdown_grace_ms"], 5_000);
		assert_eq!(value["runtime"], "/x");
	}

	#[test]
	fn session_options_defaults() {
		let options: SessionOptions = serde_json::from_str(r#"{"prefs": {"dom.foo": 1}}"#).unwrap();
		assert_eq!(options.port, 2828);
		assert!(options.profile.is_none());
		assert_eq!(options.capabilities, serde_json::json!({}));
		assert_eq!(options.prefs["dom.foo"], 1);
	}
}

//! Runtime profile preparation.
//!
//! Marionette is switched on through prefs, so every session gets a profile
//! whose `user.js` enables it on the requested port.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use tracing::debug;

use crate::Result;

/// Prefs file read by the runtime at startup.
pub const USER_JS: &str = "user.js";

/// Profile directory for one session; temporary directories are removed on drop.
#[derive(Debug)]
pub struct Profile {
	path: PathBuf,
	temp: Option<TempDir>,
}

impl Profile {
	/// Creates (or reuses) the profile directory and writes `user.js`.
	///
	/// `prefs` override the defaults from [`default_prefs`].
	pub fn prepare(dir: Option<&Path>, port: u16, prefs: &BTreeMap<String, Value>) -> Result<Self> {
		let (path, temp) = match dir {
			Some(dir) => {
				std::fs::create_dir_all(dir)?;
				(dir.to_path_buf(), None)
			}
			None => {
				let temp = tempfile::Builder::new().prefix("graphene-profile-").tempdir()?;
				(temp.path().to_path_buf(), Some(temp))
			}
		};

		let mut merged = default_prefs(port);
		merged.extend(prefs.iter().map(|(k, v)| (k.clone(), v.clone())));

		let user_js = path.join(USER_JS);
		std::fs::write(&user_js, render_user_js(&merged)?)?;
		debug!(
			target = "graphene.profile",
			path = %path.display(),
			prefs = merged.len(),
			temporary = temp.is_some(),
			"profile prepared"
		);

		Ok(Self { path, temp })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn is_temporary(&self) -> bool {
		self.temp.is_some()
	}

	/// Removes a temporary profile now instead of on drop.
	pub fn cleanup(self) -> Result<()> {
		if let Some(temp) = self.temp {
			temp.close()?;
		}
		Ok(())
	}
}

/// Prefs every Graphene session needs.
pub fn default_prefs(port: u16) -> BTreeMap<String, Value> {
	BTreeMap::from([
		("marionette.enabled".to_string(), Value::Bool(true)),
		("marionette.port".to_string(), Value::from(port)),
		("browser.shell.checkDefaultBrowser".to_string(), Value::Bool(false)),
		("browser.dom.window.dump.enabled".to_string(), Value::Bool(true)),
		("devtools.console.stdout.content".to_string(), Value::Bool(true)),
	])
}

/// Renders prefs as `user_pref(...)` lines in key order.
pub fn render_user_js(prefs: &BTreeMap<String, Value>) -> Result<String> {
	let mut out = String::new();
	for (name, value) in prefs {
		let name = serde_json::to_string(name)?;
		let value = serde_json::to_string(value)?;
		let _ = writeln!(out, "user_pref({name}, {value});");
	}
	Ok(out)
}

//! Graphene runtime discovery
//!
//! Resolves the Graphene executable that hosts Marionette sessions.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable consulted when no explicit runtime path is given.
pub const RUNTIME_ENV: &str = "GRAPHENE_RUNTIME";

/// Binary names probed inside a runtime directory, in order.
#[cfg(windows)]
const BINARY_CANDIDATES: &[&str] = &["graphene.exe", "graphene-bin.exe"];
#[cfg(not(windows))]
const BINARY_CANDIDATES: &[&str] = &["graphene", "graphene-bin", "Contents/MacOS/graphene"];

/// Get the path to the Graphene executable
///
/// Candidates are tried in the following order:
/// 1. `explicit` (the `--runtime` argument), a binary or a directory containing one
/// 2. `GRAPHENE_RUNTIME` environment variable, same rules
/// 3. `graphene` on `PATH`
///
/// # Errors
///
/// Returns `Error::InvalidRuntimePath` if an explicit path was given but holds no
/// usable binary, and `Error::RuntimeNotFound` if nothing else resolves.
pub fn locate_runtime(explicit: Option<&Path>) -> Result<PathBuf> {
	locate_with(explicit, std::env::var_os(RUNTIME_ENV), || which::which("graphene").ok())
}

fn locate_with<F>(explicit: Option<&Path>, env_value: Option<OsString>, path_lookup: F) -> Result<PathBuf>
where
	F: FnOnce() -> Option<PathBuf>,
{
	if let Some(path) = explicit {
		return resolve_candidate("--runtime", path).ok_or_else(|| Error::InvalidRuntimePath { path: path.to_path_buf() });
	}

	if let Some(value) = env_value.filter(|v| !v.is_empty()) {
		let path = PathBuf::from(value);
		if let Some(binary) = resolve_candidate(RUNTIME_ENV, &path) {
			return Ok(binary);
		}
		warn!(
			target = "graphene.runtime",
			path = %path.display(),
			"{RUNTIME_ENV} does not point at a Graphene binary; falling back to PATH"
		);
	}

	if let Some(binary) = path_lookup() {
		debug!(target = "graphene.runtime", path = %binary.display(), "found graphene on PATH");
		return Ok(binary);
	}

	Err(Error::RuntimeNotFound)
}

/// Resolves a file or directory candidate into a runnable binary path.
fn resolve_candidate(label: &str, path: &Path) -> Option<PathBuf> {
	if path.is_file() {
		let usable = is_executable(path);
		debug!(target = "graphene.runtime", source = label, path = %path.display(), usable, "probing runtime file");
		return usable.then(|| path.to_path_buf());
	}

	if path.is_dir() {
		for name in BINARY_CANDIDATES {
			let binary = path.join(name);
			let usable = binary.is_file() && is_executable(&binary);
			debug!(target = "graphene.runtime", source = label, path = %binary.display(), usable, "probing runtime directory");
			if usable {
				return Some(binary);
			}
		}
	}

	None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
	use std::os::unix::fs::PermissionsExt;

	path.metadata().map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
	path.is_file()
}

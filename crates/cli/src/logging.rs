use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber; `RUST_LOG` overrides the verbosity default.
pub fn init_logging(verbosity: u8) {
	tracing_subscriber::fmt()
		.with_env_filter(env_filter(verbosity))
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

fn env_filter(verbosity: u8) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)))
}

/// 0 = errors only, 1 (-v) = info, 2+ (-vv) = debug.
fn default_directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		1 => "info",
		_ => "debug",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_maps_to_directives() {
		assert_eq!(default_directives(0), "error");
		assert_eq!(default_directives(1), "info");
		assert_eq!(default_directives(2), "debug");
		assert_eq!(default_directives(7), "debug");
	}
}

//! Marionette session on a running Graphene host.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use graphene_runtime::{Connection, Error, Handshake, Result};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::host::GrapheneHost;
use crate::profile::Profile;

/// Browsing context targeted by subsequent commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
	Chrome,
	Content,
}

impl Context {
	pub fn as_str(self) -> &'static str {
		match self {
			Context::Chrome => "chrome",
			Context::Content => "content",
		}
	}
}

/// A live Marionette session
///
/// Owns the connection, the host handle, and the profile. Call
/// [`Session::destroy`] to end it; dropping a session closes the connection
/// and leaves the runtime to the host's kill-on-drop.
#[derive(Debug)]
pub struct Session {
	connection: Arc<Connection>,
	handshake: Handshake,
	id: String,
	capabilities: Value,
	host: GrapheneHost,
	profile: Option<Profile>,
}

impl Session {
	/// Prepares the profile, starts the runtime, and opens a Marionette session.
	///
	/// The runtime is stopped again if anything after launch fails.
	pub async fn start(config: SessionConfig) -> Result<Self> {
		let SessionConfig { host, options } = config;

		let profile = Profile::prepare(options.profile.as_deref(), options.port, &options.prefs)?;
		host.start(profile.path()).await?;

		let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, options.port));
		match Self::attach(host.clone(), addr, options.capabilities).await {
			Ok(mut session) => {
				session.profile = Some(profile);
				Ok(session)
			}
			Err(e) => {
				warn!(target = "graphene.session", error = %e, "session setup failed; stopping graphene");
				if let Err(stop_err) = host.stop().await {
					warn!(target = "graphene.session", error = %stop_err, "failed to stop graphene after setup error");
				}
				Err(e)
			}
		}
	}

	/// Connects to a Marionette server at `addr` and creates a WebDriver session.
	///
	/// The connection deadline is the host's startup timeout.
	pub async fn attach(host: GrapheneHost, addr: SocketAddr, capabilities: Value) -> Result<Self> {
		let (connection, handshake) = Connection::connect(addr, host.startup_timeout()).await?;

		let result = connection.send("WebDriver:NewSession", new_session_params(capabilities)).await?;
		let id = result
			.get("sessionId")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::ProtocolError(format!("NewSession response without sessionId: {}", result)))?
			.to_string();
		let capabilities = result.get("capabilities").cloned().unwrap_or(Value::Null);

		info!(
			target = "graphene.session",
			session = %id,
			application = %handshake.application_type,
			"marionette session created"
		);

		Ok(Self {
			connection,
			handshake,
			id,
			capabilities,
			host,
			profile: None,
		})
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Capabilities negotiated by the server.
	pub fn capabilities(&self) -> &Value {
		&self.capabilities
	}

	pub fn handshake(&self) -> &Handshake {
		&self.handshake
	}

	pub fn host(&self) -> &GrapheneHost {
		&self.host
	}

	/// Sends a raw Marionette command.
	pub async fn execute(&self, command: &str, params: Value) -> Result<Value> {
		self.connection.send(command, params).await
	}

	/// Runs `script` in the current context and returns its `value`.
	pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
		let result = self
			.execute("WebDriver:ExecuteScript", json!({ "script": script, "args": args }))
			.await?;
		Ok(unwrap_value(result))
	}

	pub async fn navigate(&self, url: &str) -> Result<()> {
		self.execute("WebDriver:Navigate", json!({ "url": url })).await?;
		Ok(())
	}

	pub async fn current_url(&self) -> Result<String> {
		let result = unwrap_value(self.execute("WebDriver:GetCurrentURL", json!({})).await?);
		result
			.as_str()
			.map(str::to_string)
			.ok_or_else(|| Error::ProtocolError(format!("GetCurrentURL returned {}", result)))
	}

	pub async fn set_context(&self, context: Context) -> Result<()> {
		self.execute("Marionette:SetContext", json!({ "value": context.as_str() }))
			.await?;
		Ok(())
	}

	/// Ends the session and stops the runtime
	///
	/// Deleting the session and quitting are best effort; only a failure to
	/// stop the runtime is returned.
	pub async fn destroy(self) -> Result<()> {
		if let Err(e) = self.execute("WebDriver:DeleteSession", json!({})).await {
			debug!(target = "graphene.session", error = %e, "DeleteSession failed");
		}
		if let Err(e) = self.execute("Marionette:Quit", json!({ "flags": ["eForceQuit"] })).await {
			debug!(target = "graphene.session", error = %e, "Quit failed");
		}
		self.connection.close();

		let stopped = self.host.shutdown(self.host.config().shutdown_grace).await;

		if let Some(profile) = self.profile {
			if let Err(e) = profile.cleanup() {
				warn!(target = "graphene.session", error = %e, "failed to remove temporary profile");
			}
		}

		info!(target = "graphene.session", session = %self.id, "session destroyed");
		stopped
	}
}

fn new_session_params(capabilities: Value) -> Value {
	let empty = match &capabilities {
		Value::Null => true,
		Value::Object(map) => map.is_empty(),
		_ => false,
	};
	if empty {
		json!({})
	} else {
		json!({ "capabilities": { "alwaysMatch": capabilities } })
	}
}

/// Marionette wraps most results as `{"value": ...}`.
fn unwrap_value(result: Value) -> Value {
	match result {
		Value::Object(mut map) if map.contains_key("value") => map.remove("value").unwrap_or(Value::Null),
		other => other,
	}
}

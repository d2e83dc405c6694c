//! Marionette command/response connection
//!
//! This module correlates commands with responses on top of the transport.
//! It handles:
//! - Reading the server handshake and checking the protocol level
//! - Generating sequential message IDs
//! - Correlating responses with pending commands
//! - Failing pending commands when the connection closes
//!
//! # Message Flow
//!
//! 1. Client calls `send()` with a command name and params
//! 2. Connection allocates an ID and a oneshot channel
//! 3. `[0, id, name, params]` is queued for the writer task
//! 4. The dispatch task receives `[1, id, error, result]`
//! 5. The response is routed to the oneshot channel by ID


use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex as ParkingLotMutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::transport::{TcpTransport, TransportParts};

/// Lowest Marionette protocol level this client speaks.
pub const MIN_PROTOCOL_LEVEL: u32 = 3;

/// Message type tag for commands.
const COMMAND: u8 = 0;
/// Message type tag for responses.
const RESPONSE: u8 = 1;

/// Delay between connection attempts while the runtime starts up.
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// First frame sent by the server after accepting a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
	pub application_type: String,
	pub marionette_protocol: u32,
}

/// Command message sent to the server
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
	pub id: u32,
	pub name: String,
	pub params: Value,
}

impl Serialize for Command {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		(COMMAND, self.id, &self.name, &self.params).serialize(serializer)
	}
}

/// Response message from the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response(pub u8, pub u32, pub Option<ErrorPayload>, pub Value);

impl Response {
	pub fn id(&self) -> u32 {
		self.1
	}
}

/// Error details carried by a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// WebDriver error code
	pub error: String,
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<String>,
}

/// Classified inbound message
#[derive(Debug, Clone)]
pub enum Message {
	Response(Response),
	/// Anything that is not a response (server-initiated commands, junk)
	Unknown(Value),
}

impl Message {
	pub fn parse(value: Value) -> Self {
		let is_response = value.get(0).and_then(Value::as_u64) == Some(u64::from(RESPONSE));
		if is_response {
			if let Ok(response) = serde_json::from_value::<Response>(value.clone()) {
				return Message::Response(response);
			}
		}
		Message::Unknown(value)
	}
}

/// Pending command callbacks keyed by message ID.
type CallbackMap = Arc<TokioMutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// RAII guard ensuring callback cleanup when a command future is dropped.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		let id = self.id;
		let callbacks = Arc::clone(&self.callbacks);

		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			handle.spawn(async move {
				if callbacks.lock().await.remove(&id).is_some() {
					tracing::debug!(target = "graphene.connection", id, "removed orphaned callback");
				}
			});
		}
	}
}

/// Future returned by [`Connection::send`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Marionette connection
///
/// Owns the reader and writer tasks. Dropping the connection or calling
/// [`Connection::close`] stops them; the dispatcher then fails every pending
/// command and exits.
pub struct Connection {
	/// Sequential message ID counter
	last_id: AtomicU32,
	/// Pending command callbacks keyed by message ID
	callbacks: CallbackMap,
	/// Channel for sending outbound messages to the writer task
	outbound_tx: mpsc::UnboundedSender<Value>,
	/// Set by the dispatcher once the server side is gone
	closed: Arc<AtomicBool>,
	/// Transport tasks (reader, writer)
	tasks: ParkingLotMutex<Vec<JoinHandle<()>>>,
}

impl Connection {
	/// Connects over TCP, retrying until `timeout` elapses
	///
	/// The runtime opens its Marionette listener some time after the process
	/// starts, so refused connections are retried.
	pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<(Arc<Self>, Handshake)> {
		let deadline = Instant::now() + timeout;

		let stream = loop {
			match TcpStream::connect(addr).await {
				Ok(stream) => break stream,
				Err(e) => {
					if Instant::now() + CONNECT_RETRY_INTERVAL > deadline {
						return Err(Error::Timeout(format!(
							"Marionette not reachable at {} after {}ms: {}",
							addr,
							timeout.as_millis(),
							e
						)));
					}
					tracing::trace!(target = "graphene.connection", %addr, error = %e, "marionette not ready; retrying");
					tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
				}
			}
		};
		stream.set_nodelay(true)?;
		tracing::debug!(target = "graphene.connection", %addr, "tcp connected");

		let (transport, message_rx) = TcpTransport::from_tcp(stream);
		let remaining = deadline.saturating_duration_since(Instant::now());
		Self::open(transport.into_transport_parts(message_rx), remaining.max(CONNECT_RETRY_INTERVAL)).await
	}

	/// Starts the connection tasks and waits for the server handshake.
	pub async fn open(parts: TransportParts, handshake_timeout: Duration) -> Result<(Arc<Self>, Handshake)> {
		let TransportParts {
			mut sender,
			mut receiver,
			mut message_rx,
		} = parts;

		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Value>();

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::error!(target = "graphene.connection", "Transport read error: {}", e);
			}
		});

		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!(target = "graphene.connection", "Transport write error: {}", e);
					break;
				}
			}
		});

		let connection = Arc::new(Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(TokioMutex::new(HashMap::new())),
			outbound_tx,
			closed: Arc::new(AtomicBool::new(false)),
			tasks: ParkingLotMutex::new(vec![reader_handle, writer_handle]),
		});

		let first = match tokio::time::timeout(handshake_timeout, message_rx.recv()).await {
			Ok(Some(value)) => value,
			Ok(None) => {
				connection.close();
				return Err(Error::ConnectionFailed("connection closed before handshake".to_string()));
			}
			Err(_) => {
				connection.close();
				return Err(Error::Timeout(format!(
					"no Marionette handshake within {}ms",
					handshake_timeout.as_millis()
				)));
			}
		};

		let handshake = match parse_handshake(first) {
			Ok(handshake) => handshake,
			Err(e) => {
				connection.close();
				return Err(e);
			}
		};
		tracing::debug!(
			target = "graphene.connection",
			application = %handshake.application_type,
			protocol = handshake.marionette_protocol,
			"marionette handshake"
		);

		let callbacks = Arc::clone(&connection.callbacks);
		let closed = Arc::clone(&connection.closed);
		tokio::spawn(async move {
			while let Some(value) = message_rx.recv().await {
				dispatch(&callbacks, Message::parse(value)).await;
			}
			closed.store(true, Ordering::SeqCst);
			let pending = std::mem::take(&mut *callbacks.lock().await);
			if !pending.is_empty() {
				tracing::debug!(target = "graphene.connection", count = pending.len(), "failing pending commands on close");
			}
			for (_, callback) in pending {
				let _ = callback.send(Err(Error::ChannelClosed));
			}
		});

		Ok((connection, handshake))
	}

	/// Sends a command and awaits its response.
	pub async fn send(&self, name: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);

		tracing::debug!(target = "graphene.connection", id, command = name, "sending command");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().await.insert(id, tx);

		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		if self.is_closed() {
			return Err(Error::ChannelClosed);
		}

		let command = Command {
			id,
			name: name.to_string(),
			params,
		};

		if self.outbound_tx.send(serde_json::to_value(&command)?).is_err() {
			tracing::error!(target = "graphene.connection", "Failed to queue command: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Returns true once the server side of the connection is gone.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Stops all connection tasks. Pending commands fail with `ChannelClosed`.
	pub fn close(&self) {
		for handle in self.tasks.lock().drain(..) {
			handle.abort();
		}
	}
}

impl std::fmt::Debug for Connection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Connection")
			.field("last_id", &self.last_id.load(Ordering::SeqCst))
			.field("closed", &self.is_closed())
			.finish()
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		self.close();
	}
}

fn parse_handshake(value: Value) -> Result<Handshake> {
	let handshake: Handshake = serde_json::from_value(value.clone())
		.map_err(|_| Error::ProtocolError(format!("unexpected handshake: {}", value)))?;

	if handshake.marionette_protocol < MIN_PROTOCOL_LEVEL {
		return Err(Error::ProtocolError(format!(
			"Marionette protocol level {} is not supported (need {} or newer)",
			handshake.marionette_protocol, MIN_PROTOCOL_LEVEL
		)));
	}

	Ok(handshake)
}

async fn dispatch(callbacks: &CallbackMap, message: Message) {
	match message {
		Message::Response(Response(_, id, error, result)) => {
			let Some(callback) = callbacks.lock().await.remove(&id) else {
				tracing::debug!(target = "graphene.connection", id, "response for unknown command (ignored)");
				return;
			};

			let outcome = match error {
				Some(payload) => Err(parse_remote_error(payload)),
				None => Ok(result),
			};
			let _ = callback.send(outcome);
		}
		Message::Unknown(value) => {
			tracing::debug!(target = "graphene.connection", message = %value, "unexpected message (ignored)");
		}
	}
}

/// Converts an [`ErrorPayload`] into [`Error::Remote`].
fn parse_remote_error(payload: ErrorPayload) -> Error {
	Error::Remote {
		error: payload.error,
		message: payload.message,
		stacktrace: payload.stacktrace.filter(|s| !s.is_empty()),
	}
}

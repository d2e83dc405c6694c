//! Marionette wire framing
//!
//! Every message is a JSON document prefixed by its byte length in ASCII
//! decimal and a colon: `27:{"applicationType":"gecko"}`.
//!
//! The transport is split into a sender (writes frames) and a receiver (reads
//! frames and forwards parsed JSON over a channel), so reads and writes can run
//! on separate tasks.


use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Largest frame accepted from the server.
pub const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Enough digits for any length up to `MAX_FRAME_LEN`.
const MAX_PREFIX_DIGITS: usize = 10;

/// Outbound half of a transport.
pub trait Transport: Send {
	/// Serialize and write one message.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inbound half of a transport.
pub trait TransportReceiver: Send {
	/// Read frames until EOF, forwarding each parsed message.
	fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Type-erased transport halves plus the channel carrying inbound messages.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Encodes one message as a Marionette frame.
pub fn encode_frame(message: &Value) -> Result<Vec<u8>> {
	let body = serde_json::to_vec(message)?;
	let mut frame = format!("{}:", body.len()).into_bytes();
	frame.extend_from_slice(&body);
	Ok(frame)
}

/// Reads one frame.
///
/// Returns `Ok(None)` on a clean EOF before the first byte of a frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>>
where
	R: AsyncRead + Unpin,
{
	let mut len: usize = 0;
	let mut digits = 0;

	loop {
		let mut byte = [0u8; 1];
		let n = reader
			.read(&mut byte)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {}", e)))?;

		if n == 0 {
			if digits == 0 {
				return Ok(None);
			}
			return Err(Error::TransportError("Failed to read length prefix: unexpected EOF".to_string()));
		}

		match byte[0] {
			b':' if digits > 0 => break,
			b @ b'0'..=b'9' if digits < MAX_PREFIX_DIGITS => {
				len = len.saturating_mul(10).saturating_add(usize::from(b - b'0'));
				digits += 1;
			}
			other => {
				return Err(Error::TransportError(format!(
					"Failed to read length prefix: unexpected byte 0x{:02x}",
					other
				)));
			}
		}
	}

	if len > MAX_FRAME_LEN {
		return Err(Error::TransportError(format!(
			"Frame of {} bytes exceeds limit of {} bytes",
			len, MAX_FRAME_LEN
		)));
	}

	let mut body = vec![0u8; len];
	reader
		.read_exact(&mut body)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to read frame body: {}", e)))?;

	Ok(Some(serde_json::from_slice(&body)?))
}

/// Writes frames to the server.
pub struct MarionetteTransportSender<W> {
	writer: W,
}

impl<W> MarionetteTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	pub async fn send(&mut self, message: Value) -> Result<()> {
		let frame = encode_frame(&message)?;
		self.writer
			.write_all(&frame)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write frame: {}", e)))?;
		self.writer
			.flush()
			.await
			.map_err(|e| Error::TransportError(format!("Failed to flush: {}", e)))?;
		Ok(())
	}
}

impl<W> Transport for MarionetteTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(MarionetteTransportSender::send(self, message))
	}
}

/// Reads frames from the server and forwards them to the connection.
pub struct MarionetteTransportReceiver<R> {
	reader: BufReader<R>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> MarionetteTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send,
{
	pub async fn run(&mut self) -> Result<()> {
		while let Some(message) = read_frame(&mut self.reader).await? {
			if self.message_tx.send(message).is_err() {
				tracing::debug!(target = "graphene.transport", "message receiver dropped; stopping reader");
				return Ok(());
			}
		}

		tracing::debug!(target = "graphene.transport", "server closed the connection");
		Ok(())
	}
}

impl<R> TransportReceiver for MarionetteTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send,
{
	fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(MarionetteTransportReceiver::run(self))
	}
}

/// Framed transport over any byte stream pair
pub struct MarionetteTransport<W, R> {
	sender: MarionetteTransportSender<W>,
	receiver: MarionetteTransportReceiver<R>,
}

impl<W, R> MarionetteTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport and the channel its receiver forwards messages to.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let transport = Self {
			sender: MarionetteTransportSender { writer },
			receiver: MarionetteTransportReceiver {
				reader: BufReader::new(reader),
				message_tx,
			},
		};
		(transport, message_rx)
	}

	pub fn into_parts(self) -> (MarionetteTransportSender<W>, MarionetteTransportReceiver<R>) {
		(self.sender, self.receiver)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		TransportParts {
			sender: Box::new(self.sender),
			receiver: Box::new(self.receiver),
			message_rx,
		}
	}

	pub async fn send(&mut self, message: Value) -> Result<()> {
		self.sender.send(message).await
	}

	pub async fn run(&mut self) -> Result<()> {
		self.receiver.run().await
	}
}

/// Transport over a connected TCP socket.
pub type TcpTransport = MarionetteTransport<OwnedWriteHalf, OwnedReadHalf>;

impl TcpTransport {
	pub fn from_tcp(stream: TcpStream) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (read, write) = stream.into_split();
		Self::new(write, read)
	}
}

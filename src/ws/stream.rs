//! WebSocket message stream
//!
//! Reads and writes complete application messages over an established
//! WebSocket connection. Control frames are handled inline: pings are
//! answered with pongs, pongs are ignored, and a close frame surfaces as
//! `Error::Closed` after a best-effort close reply.

use crate::ws::frame::{self, Opcode, MAX_CONTROL_PAYLOAD};
use crate::{Error, Result};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A plain TCP or TLS-wrapped byte stream
#[derive(Debug)]
pub enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// An established client WebSocket over any byte stream.
///
/// The buffered reader is created during the handshake and retained here so
/// bytes the server sent immediately after `101 Switching Protocols` are not
/// lost.
#[derive(Debug)]
pub struct WsStream<S> {
    io: BufReader<S>,
}

/// The production connection type: a WebSocket over TCP or TLS
pub type WsConnection = WsStream<MaybeTlsStream>;

impl<S: AsyncRead + AsyncWrite + Unpin> WsStream<S> {
    pub(crate) fn new(io: BufReader<S>) -> Self {
        Self { io }
    }

    /// Wrap a raw byte stream that already speaks WebSocket framing.
    ///
    /// Used by tests to drive the stream over in-memory pipes.
    pub fn from_raw(io: S) -> Self {
        Self {
            io: BufReader::new(io),
        }
    }

    /// Read and assemble the next complete application message.
    ///
    /// A text frame starts assembly; continuation frames append until FIN.
    /// Ping frames are answered inline with an identical-payload pong and do
    /// not disturb assembly. Binary frames, stray continuations, and nested
    /// start frames are protocol errors. A close frame yields `Error::Closed`
    /// after a best-effort close reply.
    pub async fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut message = Vec::new();
        let mut collecting = false;

        loop {
            let (fin, opcode, payload) = self.read_frame().await?;

            match opcode {
                Opcode::Continuation => {
                    if !collecting {
                        return Err(Error::web_socket("continuation without start frame"));
                    }
                    message.extend_from_slice(&payload);
                }
                Opcode::Text => {
                    if collecting {
                        return Err(Error::web_socket("data frame while continuation pending"));
                    }
                    collecting = true;
                    message.extend_from_slice(&payload);
                }
                Opcode::Binary => {
                    return Err(Error::web_socket("unexpected binary websocket frame"));
                }
                Opcode::Close => {
                    let reply = if payload.len() > MAX_CONTROL_PAYLOAD {
                        &[][..]
                    } else {
                        &payload[..]
                    };
                    let _ = self.write_control(Opcode::Close, reply).await;
                    return Err(Error::Closed);
                }
                Opcode::Ping => {
                    self.write_control(Opcode::Pong, &payload).await?;
                    continue;
                }
                Opcode::Pong => continue,
            }

            if fin {
                return Ok(message);
            }
        }
    }

    /// Write one complete text message as a single masked frame.
    pub async fn write_text_message(&mut self, payload: &[u8]) -> Result<()> {
        self.write_frame(Opcode::Text, payload).await
    }

    /// Send a close frame. Best-effort; the peer may already be gone.
    pub async fn close(&mut self) -> Result<()> {
        self.write_control(Opcode::Close, &[]).await
    }

    async fn write_control(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(Error::web_socket("control frame payload too large"));
        }
        self.write_frame(opcode, payload).await
    }

    async fn write_frame(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let frame = frame::encode_frame(opcode, payload, frame::mask_key(), true);
        self.io.write_all(&frame).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Read a single frame: base header, extended length, payload.
    ///
    /// Server-to-client frames must not be masked; the 64-bit length form is
    /// rejected past the platform's signed maximum.
    async fn read_frame(&mut self) -> Result<(bool, Opcode, Vec<u8>)> {
        let mut header = [0u8; 2];
        self.io.read_exact(&mut header).await?;

        let fin = header[0] & 0x80 != 0;
        let raw_opcode = header[0] & 0x0F;
        let masked = header[1] & 0x80 != 0;
        if masked {
            return Err(Error::web_socket("server websocket frames must not be masked"));
        }

        let mut payload_len = u64::from(header[1] & 0x7F);
        match payload_len {
            126 => {
                let mut ext = [0u8; 2];
                self.io.read_exact(&mut ext).await?;
                payload_len = u64::from(u16::from_be_bytes(ext));
            }
            127 => {
                let mut ext = [0u8; 8];
                self.io.read_exact(&mut ext).await?;
                payload_len = u64::from_be_bytes(ext);
                if payload_len > isize::MAX as u64 {
                    return Err(Error::web_socket("websocket frame too large"));
                }
            }
            _ => {}
        }

        let opcode = Opcode::from_u8(raw_opcode).ok_or_else(|| {
            Error::web_socket(format!("unsupported websocket opcode: 0x{raw_opcode:x}"))
        })?;

        let mut payload = vec![0u8; payload_len as usize];
        if !payload.is_empty() {
            self.io.read_exact(&mut payload).await?;
        }

        Ok((fin, opcode, payload))
    }
}

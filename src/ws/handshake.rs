//! WebSocket opening handshake
//!
//! Dials `ws://` or `wss://` URLs over TCP (TLS with SNI for `wss`), sends
//! the HTTP/1.1 Upgrade request, and validates the server's switching
//! response including the `Sec-WebSocket-Accept` key.

use crate::deadline::Deadline;
use crate::ws::stream::{MaybeTlsStream, WsConnection, WsStream};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use rustls_pki_types::ServerName;
use sha1::{Digest, Sha1};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Headers are small; a longer line means the peer is not speaking HTTP.
const MAX_RESPONSE_LINE: usize = 8 * 1024;

/// Open a client WebSocket to `ws_url`, completing the TCP connect, TLS
/// handshake, and HTTP upgrade within `deadline`.
pub async fn connect(ws_url: &str, deadline: Deadline) -> Result<WsConnection> {
    let parsed = Url::parse(ws_url)
        .map_err(|err| Error::handshake(format!("invalid websocket url: {err}")))?;

    let scheme = parsed.scheme().to_string();
    if scheme != "ws" && scheme != "wss" {
        return Err(Error::handshake(format!(
            "unsupported websocket scheme: {scheme}"
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::handshake("websocket url missing host"))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .unwrap_or(if scheme == "wss" { 443 } else { 80 });

    let tcp = deadline
        .bound(async { Ok(TcpStream::connect((host.as_str(), port)).await?) })
        .await?;

    let io = if scheme == "wss" {
        let tls = deadline.bound(tls_connect(&host, tcp)).await?;
        MaybeTlsStream::Tls(Box::new(tls))
    } else {
        MaybeTlsStream::Plain(tcp)
    };

    deadline.bound(upgrade(io, &parsed)).await
}

async fn tls_connect(host: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::handshake(format!("invalid tls server name: {host}")))?;

    Ok(connector.connect(server_name, tcp).await?)
}

/// Perform the HTTP upgrade over an already-connected byte stream.
///
/// Split out from [`connect`] so tests can exercise the exchange over
/// in-memory pipes.
pub(crate) async fn upgrade<S>(io: S, url: &Url) -> Result<WsStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let key = generate_key();
    let mut io = BufReader::new(io);

    let request = upgrade_request(url, &key);
    io.write_all(request.as_bytes()).await?;
    io.flush().await?;

    let (status, headers) = read_http_response(&mut io).await?;

    if status != 101 {
        return Err(Error::handshake(format!("unexpected status {status}")));
    }
    if !header_contains(&headers, "connection", "upgrade") {
        return Err(Error::handshake("missing connection upgrade"));
    }
    if !header_contains(&headers, "upgrade", "websocket") {
        return Err(Error::handshake("missing upgrade websocket"));
    }
    let expected = accept_key(&key);
    if header_value(&headers, "sec-websocket-accept") != Some(expected.as_str()) {
        return Err(Error::handshake("invalid accept key"));
    }

    Ok(WsStream::new(io))
}

fn upgrade_request(url: &Url, key: &str) -> String {
    let mut target = url.path().to_string();
    if target.is_empty() {
        target.push('/');
    }
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    // Host carries the port only when the URL spells one out.
    let host = url.host_str().unwrap_or_default();
    let host_header = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    format!(
        "GET {target} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         \r\n"
    )
}

/// Compute the expected `Sec-WebSocket-Accept` value:
/// base64(SHA-1(key + GUID)).
pub(crate) fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

fn generate_key() -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();
    BASE64.encode(nonce)
}

async fn read_http_response<R>(io: &mut R) -> Result<(u16, Vec<(String, String)>)>
where
    R: AsyncBufRead + Unpin,
{
    let status_line = read_line(io).await?;
    let mut parts = status_line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| Error::handshake("empty response status line"))?;
    if !version.starts_with("HTTP/1.") {
        return Err(Error::handshake(format!(
            "unexpected http version: {version}"
        )));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| Error::handshake("malformed response status line"))?;

    let mut headers = Vec::new();
    loop {
        let line = read_line(io).await?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::handshake("malformed response header"))?;
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    Ok((status, headers))
}

async fn read_line<R>(io: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = io
        .take(MAX_RESPONSE_LINE as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Err(Error::handshake("connection closed during handshake"));
    }
    if !line.ends_with(b"\n") {
        return Err(Error::handshake("response line too long"));
    }
    while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| Error::handshake("non-utf8 response header"))
}

fn header_value<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(header, _)| header == name)
        .map(|(_, value)| value.as_str())
}

fn header_contains(headers: &[(String, String)], name: &str, token: &str) -> bool {
    header_value(headers, name)
        .map(|value| value.to_ascii_lowercase().contains(token))
        .unwrap_or(false)
}

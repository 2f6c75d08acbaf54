//! HTTP transport interface and the monoio-native HTTPS implementation
//!
//! Adapters talk to the network only through [`HttpTransport`], so tests can
//! inject a scripted transport. [`RequestParameters`] owns the one canonical
//! query encoding: whatever gets signed is exactly what goes on the wire.

use crate::errors::{ExchangeError, Result};
use async_trait::async_trait;
use monoio::io::{AsyncReadRent, AsyncWriteRentExt};
use monoio::net::TcpStream;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection};
use std::collections::BTreeMap;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const TLS_CHUNK: usize = 8192;

/// Query parameters of an exchange request
///
/// Keys are kept sorted so serialization is deterministic. The signature
/// slot is separate and always rendered last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    params: BTreeMap<String, String>,
    signature: Option<String>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.params.insert(key.into(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if key == "signature" {
            return self.signature();
        }
        self.params.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub(crate) fn set_signature(&mut self, signature: String) {
        self.signature = Some(signature);
    }

    /// Number of parameters, signature included
    pub fn len(&self) -> usize {
        self.params.len() + usize::from(self.signature.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unsigned parameters in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `k1=v1&k2=v2` over the unsigned parameters; this is the signing input
    pub fn canonical_query(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full query string as sent: canonical parameters then `signature`
    pub fn to_query_string(&self) -> String {
        let canonical = self.canonical_query();
        match &self.signature {
            Some(signature) if canonical.is_empty() => format!("signature={signature}"),
            Some(signature) => format!("{canonical}&signature={signature}"),
            None => canonical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request handed to a transport; `path` is relative to the transport's base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: RequestParameters,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Request target line: path plus the encoded query
    pub fn target(&self) -> String {
        let query = self.query.to_query_string();
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query)
        }
    }
}

/// HTTP response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP exchange. Implementations own the base URL and the
/// timeout policy; they never interpret status codes.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Monoio-native HTTPS client
pub struct MonoioHttpsClient {
    base_url: Url,
    timeout: Duration,
    tls_config: Arc<ClientConfig>,
}

impl MonoioHttpsClient {
    /// Create a client for `base_url` (must be `https`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.scheme() != "https" {
            return Err(ExchangeError::ConfigurationError(format!(
                "unsupported scheme '{}', only https is available",
                base_url.scheme()
            )));
        }
        if base_url.host_str().is_none() {
            return Err(ExchangeError::InvalidUrl("No host in URL".to_string()));
        }

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let tls_config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self {
            base_url,
            timeout,
            tls_config: Arc::new(tls_config),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let host = self
            .base_url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl("No host in URL".to_string()))?;
        let port = self.base_url.port_or_known_default().unwrap_or(443);

        let tcp = TcpStream::connect(format!("{host}:{port}"))
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("TCP connect failed: {e}")))?;

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ExchangeError::NetworkError(format!("Invalid server name: {e:?}")))?;
        let tls = ClientConnection::new(self.tls_config.clone(), server_name)
            .map_err(|e| ExchangeError::NetworkError(format!("TLS setup failed: {e}")))?;

        let mut stream = TlsStream { tcp, tls };
        stream.handshake().await?;

        let raw_request = render_request(host, request);
        stream.write_all(raw_request.as_bytes()).await?;

        let raw_response = stream.read_to_end().await?;
        parse_http_response(&raw_response)
    }
}

#[async_trait(?Send)]
impl HttpTransport for MonoioHttpsClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("📡 {} {}{}", request.method, self.base_url, request.path);
        monoio::time::timeout(self.timeout, self.exchange(&request))
            .await
            .map_err(|_| {
                ExchangeError::Timeout(format!(
                    "{} {} exceeded {}ms",
                    request.method,
                    request.path,
                    self.timeout.as_millis()
                ))
            })?
    }
}

fn render_request(host: &str, request: &HttpRequest) -> String {
    let mut raw = format!(
        "{} {} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: perpbot/0.1\r\n\
         Connection: close\r\n\
         Content-Length: 0\r\n",
        request.method,
        request.target(),
    );
    for (key, value) in &request.headers {
        raw.push_str(&format!("{key}: {value}\r\n"));
    }
    raw.push_str("\r\n");
    raw
}

/// Parse a complete HTTP/1.1 response (status line, headers, body)
pub fn parse_http_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = find_subsequence(data, b"\r\n\r\n").ok_or_else(|| {
        ExchangeError::NetworkError("Invalid HTTP response: no header terminator".to_string())
    })?;

    let header_part = String::from_utf8_lossy(&data[..header_end]);
    let body_part = &data[header_end + 4..];

    let mut lines = header_part.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| ExchangeError::NetworkError("Empty response".to_string()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ExchangeError::NetworkError("Invalid status line".to_string()))?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let mut response = HttpResponse {
        status,
        headers,
        body: String::new(),
    };

    let chunked = response
        .header("transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    let body = if chunked {
        decode_chunked(body_part)?
    } else {
        match response.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
            Some(len) if len <= body_part.len() => body_part[..len].to_vec(),
            _ => body_part.to_vec(),
        }
    };

    response.body = String::from_utf8_lossy(&body).into_owned();
    Ok(response)
}

/// Decode a `Transfer-Encoding: chunked` body
pub fn decode_chunked(mut rest: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(rest.len());
    loop {
        let line_end = find_subsequence(rest, b"\r\n").ok_or_else(|| {
            ExchangeError::InvalidResponse("truncated chunk size line".to_string())
        })?;
        let size_line = std::str::from_utf8(&rest[..line_end])
            .map_err(|e| ExchangeError::InvalidResponse(format!("chunk size: {e}")))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|e| ExchangeError::InvalidResponse(format!("chunk size '{size_hex}': {e}")))?;
        rest = &rest[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        if rest.len() < size {
            return Err(ExchangeError::InvalidResponse("truncated chunk".to_string()));
        }
        out.extend_from_slice(&rest[..size]);
        rest = &rest[size..];
        rest = rest.strip_prefix(b"\r\n").unwrap_or(rest);
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// rustls session over a monoio TCP stream
struct TlsStream {
    tcp: TcpStream,
    tls: ClientConnection,
}

impl TlsStream {
    async fn handshake(&mut self) -> Result<()> {
        while self.tls.is_handshaking() {
            self.flush_tls().await?;
            if !self.tls.is_handshaking() {
                break;
            }
            if !self.tls.wants_read() {
                return Err(ExchangeError::NetworkError("TLS handshake stalled".to_string()));
            }
            if self.fill_tls().await? == 0 {
                return Err(ExchangeError::NetworkError(
                    "Connection closed during handshake".to_string(),
                ));
            }
        }
        self.flush_tls().await
    }

    /// Send every pending TLS record to the socket
    async fn flush_tls(&mut self) -> Result<()> {
        while self.tls.wants_write() {
            let mut out = Vec::with_capacity(TLS_CHUNK);
            let written = self
                .tls
                .write_tls(&mut out)
                .map_err(|e| ExchangeError::NetworkError(format!("TLS write failed: {e}")))?;
            if written == 0 {
                break;
            }
            let (result, _) = self.tcp.write_all(out).await;
            result.map_err(|e| ExchangeError::NetworkError(format!("TCP write failed: {e}")))?;
        }
        Ok(())
    }

    /// Read one socket chunk into the TLS session; returns bytes read
    async fn fill_tls(&mut self) -> Result<usize> {
        let buf = Vec::with_capacity(TLS_CHUNK);
        let (result, buf) = self.tcp.read(buf).await;
        let read = result.map_err(|e| ExchangeError::NetworkError(format!("TCP read failed: {e}")))?;
        if read == 0 {
            return Ok(0);
        }

        self.tls
            .read_tls(&mut Cursor::new(&buf[..read]))
            .map_err(|e| ExchangeError::NetworkError(format!("TLS read failed: {e}")))?;
        self.tls
            .process_new_packets()
            .map_err(|e| ExchangeError::NetworkError(format!("TLS process failed: {e}")))?;
        Ok(read)
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.tls
            .writer()
            .write_all(data)
            .map_err(|e| ExchangeError::NetworkError(format!("TLS application write failed: {e}")))?;
        self.flush_tls().await
    }

    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();
        let mut chunk = vec![0u8; TLS_CHUNK];

        loop {
            match self.tls.reader().read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    response.extend_from_slice(&chunk[..n]);
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                // Peer closed the socket without close_notify.
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(ExchangeError::NetworkError(format!("TLS read failed: {e}")));
                }
            }

            if self.fill_tls().await? == 0 {
                break;
            }
            self.flush_tls().await?;
        }

        Ok(response)
    }
}

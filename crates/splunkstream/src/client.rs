// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Streaming client for the Splunk HTTP stream receiver.
//!
//! The client writes a single `POST` request header up front and then keeps appending events
//! to the request body over the same connection. The receiver parses the body as an open ended
//! stream, so there is no length prefix or chunked framing. The response is never read.

use crate::config::Config;
use crate::error::StreamError;
use crate::tls::TlsSettings;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::{debug, trace};

const STREAMING_MODE_HEADER: &str = "x-splunk-input-mode: streaming";
const EVENT_TERMINATOR: &[u8] = b"\r\n";

enum MaybeTlsStream {
    Raw(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Raw(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Raw(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Raw(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

enum HeaderState {
    Pending(Vec<u8>),
    Sent,
}

/// Builds the request line and headers that open the stream.
pub fn request_header(config: &Config) -> Result<String, StreamError> {
    Ok(format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nAuthorization: Basic {}\r\n{}\r\n\r\n",
        config.build_request_uri()?,
        config.host(),
        config.basic_auth(),
        STREAMING_MODE_HEADER,
    ))
}

/// A client connection to a Splunk HTTP stream receiver.
///
/// The client owns the connection. Bytes still buffered when it is dropped are lost; call
/// [`Client::close`] to flush them and shut the connection down.
///
/// # Example
///
/// ```rust,ignore
/// use splunkstream::{Client, Config};
///
/// let config = Config::new().with_host("splunk.local:8089").with_sourcetype("app");
/// let mut client = Client::connect(config).await?;
/// client.write(b"first event\n").await?;
/// client.send("second event").await?;
/// client.close().await?;
/// ```
pub struct Client {
    config: Config,
    url: String,
    header: HeaderState,
    writer: BufWriter<MaybeTlsStream>,
}

impl Client {
    /// Opens a connection to the receiver described by `config`.
    ///
    /// Defaults are applied to `config` first. Nothing is written until the first
    /// [`Client::write`] or [`Client::send`].
    pub async fn connect(config: Config) -> Result<Self, StreamError> {
        let config = config.with_defaults();
        config.validate()?;

        let url = config.build_url()?;
        let header = request_header(&config)?.into_bytes();
        let target = config.host().to_string();

        let tls = if config.is_tls() {
            Some(TlsSettings::from_config(&config)?)
        } else {
            None
        };

        debug!(
            receiver = %target,
            tls = tls.is_some(),
            verify_certificate = tls.as_ref().is_some_and(TlsSettings::verify_certificate),
            "Connecting to stream receiver"
        );

        let stream = TcpStream::connect(&target)
            .await
            .map_err(|source| StreamError::Connect {
                target: target.clone(),
                source,
            })?;

        let stream = match tls {
            Some(tls) => {
                let stream = tls
                    .connect(&target, stream)
                    .await
                    .map_err(|source| StreamError::Tls {
                        target: target.clone(),
                        source,
                    })?;
                MaybeTlsStream::Tls(Box::new(stream))
            }
            None => MaybeTlsStream::Raw(stream),
        };

        debug!(receiver = %target, "Connected to stream receiver");

        Ok(Self {
            config,
            url,
            header: HeaderState::Pending(header),
            writer: BufWriter::new(stream),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// URL of the receiver endpoint this client streams to
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header_sent(&self) -> bool {
        matches!(self.header, HeaderState::Sent)
    }

    /// Writes `buf` verbatim to the stream and flushes it.
    ///
    /// Callers provide their own event terminator. Returns the number of bytes written.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        self.ensure_header_sent().await?;
        self.write_raw(buf).await?;
        self.flush().await?;
        Ok(buf.len())
    }

    /// Writes `event` followed by CRLF.
    ///
    /// Unlike [`Client::write`] this does not flush; buffered events go out when the buffer
    /// fills, on [`Client::flush`], or on [`Client::close`].
    pub async fn send(&mut self, event: &str) -> Result<usize, StreamError> {
        self.ensure_header_sent().await?;
        self.write_raw(event.as_bytes()).await?;
        self.write_raw(EVENT_TERMINATOR).await?;
        Ok(event.len() + EVENT_TERMINATOR.len())
    }

    pub async fn flush(&mut self) -> Result<(), StreamError> {
        match self.writer.flush().await {
            Ok(()) => Ok(()),
            Err(source) => Err(self.write_error(source)),
        }
    }

    /// Flushes anything still buffered and shuts the connection down.
    pub async fn close(mut self) -> Result<(), StreamError> {
        self.flush().await?;
        if let Err(source) = self.writer.shutdown().await {
            return Err(self.write_error(source));
        }
        debug!(receiver = %self.config.host(), "Closed stream receiver connection");
        Ok(())
    }

    async fn ensure_header_sent(&mut self) -> Result<(), StreamError> {
        // Sent even if the write fails: part of the header may already be on the wire
        if let HeaderState::Pending(header) = std::mem::replace(&mut self.header, HeaderState::Sent)
        {
            self.write_raw(&header).await?;
            trace!(url = %self.url, "Sent stream request header");
        }
        Ok(())
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        match self.writer.write_all(bytes).await {
            Ok(()) => Ok(()),
            Err(source) => Err(self.write_error(source)),
        }
    }

    fn write_error(&self, source: io::Error) -> StreamError {
        StreamError::Write {
            target: self.config.host().to_string(),
            source,
        }
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("header_sent", &self.header_sent())
            .finish_non_exhaustive()
    }
}

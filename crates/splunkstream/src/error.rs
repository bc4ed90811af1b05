// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;

/// Errors returned by the stream client and its configuration
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unable to create connection to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to create TLS connection to {target}: {source}")]
    Tls {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    /// True when the transport could not be established (dial or handshake).
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Tls { .. })
    }

    /// True when an established transport rejected a write or flush.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

impl From<url::ParseError> for StreamError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("malformed receiver URL: {err}"))
    }
}

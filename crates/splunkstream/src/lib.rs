// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the Splunk HTTP stream receiver (`/services/receivers/stream`).
//!
//! Events are written as the body of a single long-lived `POST` request over a plain or TLS
//! connection. See [`Client`] for the write path and [`Config`] for endpoint settings.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod config;
pub mod error;
pub mod tls;

pub use client::Client;
pub use config::Config;
pub use error::StreamError;

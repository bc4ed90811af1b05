// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Endpoint configuration for the Splunk HTTP stream receiver.
//!
//! A [`Config`] is created with any subset of its fields set. Unset fields fall back to the
//! receiver defaults (`https://localhost:8089/services/receivers/stream`, `admin:changeme`)
//! whenever an effective value is needed, so the same partially filled value can be used for
//! URL construction and for [`crate::Client::connect`].

use crate::error::StreamError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_HOST: &str = "localhost:8089";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "changeme";
pub const DEFAULT_ENDPOINT: &str = "/services/receivers/stream";
pub const DEFAULT_SOURCE: &str = "splunkstream.go";
pub const DEFAULT_SOURCETYPE: &str = "splunkstream";

/// Connection and query settings for the Splunk HTTP stream receiver.
///
/// `None` and `Some("")` both mean "unset".
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// `http` or `https`
    pub scheme: Option<String>,
    /// host:port of the receiver
    pub host: Option<String>,
    /// Splunk user with access to the receiver (requires `edit_tcp`)
    pub username: Option<String>,
    pub password: Option<String>,
    /// API endpoint of the stream receiver
    pub endpoint: Option<String>,
    /// Maps to `source` in Splunk
    pub source: Option<String>,
    /// Maps to `sourcetype` in Splunk
    pub sourcetype: Option<String>,
    /// Maps to `index` in Splunk
    pub index: Option<String>,
    /// Maps to `host` in Splunk
    pub remote_host: Option<String>,
    /// Verify the receiver certificate on `https`. Splunk ships with a self-signed
    /// certificate, so verification is off unless asked for.
    pub verify_certificate: bool,
    /// Extra PEM encoded trust anchors, only used when `verify_certificate` is set
    pub ca_cert_path: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("source", &self.source)
            .field("sourcetype", &self.sourcetype)
            .field("index", &self.index)
            .field("remote_host", &self.remote_host)
            .field("verify_certificate", &self.verify_certificate)
            .field("ca_cert_path", &self.ca_cert_path)
            .finish()
    }
}

fn is_unset(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, str::is_empty)
}

fn set_default(field: &mut Option<String>, default: &str) {
    if is_unset(field) {
        *field = Some(default.to_string());
    }
}

fn effective<'a>(field: &'a Option<String>, default: &'a str) -> &'a str {
    field.as_deref().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn optional(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/// Splits `host:port` (or `[v6]:port`) into its host and port parts.
pub(crate) fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = port.parse::<u16>().ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some((host, port))
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from `SPLUNK_*` environment variables
    pub fn from_env() -> Result<Self, StreamError> {
        let var = |key: &str| env::var(key).ok().filter(|val| !val.is_empty());

        let mut config = Self {
            scheme: var("SPLUNK_SCHEME"),
            host: var("SPLUNK_HOST"),
            username: var("SPLUNK_USERNAME"),
            password: var("SPLUNK_PASSWORD"),
            endpoint: var("SPLUNK_ENDPOINT"),
            source: var("SPLUNK_SOURCE"),
            sourcetype: var("SPLUNK_SOURCETYPE"),
            index: var("SPLUNK_INDEX"),
            remote_host: var("SPLUNK_REMOTE_HOST"),
            verify_certificate: var("SPLUNK_VERIFY_CERTIFICATE")
                .map(|val| val.to_lowercase() == "true")
                .unwrap_or(false),
            ca_cert_path: var("SPLUNK_CA_CERT_PATH").map(PathBuf::from),
        };

        if let Some(auth) = var("SPLUNK_AUTH") {
            let (username, password) = auth.split_once(':').ok_or_else(|| {
                StreamError::Config("SPLUNK_AUTH must be in username:password form".to_string())
            })?;
            config.username = Some(username.to_string());
            config.password = Some(password.to_string());
        }

        if var("SPLUNK_INSECURE").is_some_and(|val| val.to_lowercase() == "true") {
            config.scheme = Some("http".to_string());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_sourcetype(mut self, sourcetype: impl Into<String>) -> Self {
        self.sourcetype = Some(sourcetype.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_remote_host(mut self, remote_host: impl Into<String>) -> Self {
        self.remote_host = Some(remote_host.into());
        self
    }

    pub fn with_verify_certificate(mut self, verify: bool) -> Self {
        self.verify_certificate = verify;
        self
    }

    pub fn with_ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Fill every unset field with its default. Calling it again is a no-op.
    pub fn apply_defaults(&mut self) {
        set_default(&mut self.scheme, DEFAULT_SCHEME);
        set_default(&mut self.host, DEFAULT_HOST);
        set_default(&mut self.username, DEFAULT_USERNAME);
        set_default(&mut self.password, DEFAULT_PASSWORD);
        set_default(&mut self.endpoint, DEFAULT_ENDPOINT);
        set_default(&mut self.source, DEFAULT_SOURCE);
        set_default(&mut self.sourcetype, DEFAULT_SOURCETYPE);
    }

    pub fn with_defaults(mut self) -> Self {
        self.apply_defaults();
        self
    }

    pub fn scheme(&self) -> &str {
        effective(&self.scheme, DEFAULT_SCHEME)
    }

    pub fn host(&self) -> &str {
        effective(&self.host, DEFAULT_HOST)
    }

    pub fn username(&self) -> &str {
        effective(&self.username, DEFAULT_USERNAME)
    }

    pub fn password(&self) -> &str {
        effective(&self.password, DEFAULT_PASSWORD)
    }

    pub fn endpoint(&self) -> &str {
        effective(&self.endpoint, DEFAULT_ENDPOINT)
    }

    pub fn source(&self) -> &str {
        effective(&self.source, DEFAULT_SOURCE)
    }

    pub fn sourcetype(&self) -> &str {
        effective(&self.sourcetype, DEFAULT_SOURCETYPE)
    }

    pub fn index(&self) -> Option<&str> {
        optional(&self.index)
    }

    pub fn remote_host(&self) -> Option<&str> {
        optional(&self.remote_host)
    }

    pub fn is_tls(&self) -> bool {
        self.scheme().eq_ignore_ascii_case("https")
    }

    /// Validate the effective configuration
    pub fn validate(&self) -> Result<(), StreamError> {
        let scheme = self.scheme();
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(StreamError::Config(format!(
                "Invalid scheme '{scheme}'. Must be one of: http, https"
            )));
        }

        if split_host_port(self.host()).is_none() {
            return Err(StreamError::Config(format!(
                "Invalid host '{}'. Must be in host:port form",
                self.host()
            )));
        }

        if !self.endpoint().starts_with('/') {
            return Err(StreamError::Config(format!(
                "Invalid endpoint '{}'. Must start with '/'",
                self.endpoint()
            )));
        }

        Ok(())
    }

    /// Fully qualified URL of the receiver, including the query string
    pub fn build_url(&self) -> Result<String, StreamError> {
        let (url, request_uri) = self.url_parts()?;
        Ok(format!("{}://{}{}", url.scheme(), self.host(), request_uri))
    }

    /// Path and query of the receiver URL, as placed on the request line
    pub fn build_request_uri(&self) -> Result<String, StreamError> {
        self.url_parts().map(|(_, request_uri)| request_uri)
    }

    /// Base64 encoded `username:password` as per RFC 2617
    pub fn basic_auth(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username(), self.password()))
    }

    fn url_parts(&self) -> Result<(Url, String), StreamError> {
        let mut url = Url::parse(&format!("{}://{}", self.scheme(), self.host()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(StreamError::Config(format!(
                "Invalid host '{}'",
                self.host()
            )));
        }
        url.set_path(self.endpoint());

        // keys in lexicographic order so the query is stable
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(remote_host) = self.remote_host() {
            query.append_pair("host", remote_host);
        }
        if let Some(index) = self.index() {
            query.append_pair("index", index);
        }
        query.append_pair("source", self.source());
        query.append_pair("sourcetype", self.sourcetype());

        let request_uri = format!("{}?{}", url.path(), query.finish());
        Ok((url, request_uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;
    use serial_test::serial;

    fn test_config() -> Config {
        Config::new()
            .with_scheme("http")
            .with_host("splunk.local:8089")
            .with_source("testsource")
            .with_sourcetype("testsourcetype")
    }

    #[test]
    fn test_apply_defaults() {
        let mut config = Config::new();
        config.apply_defaults();

        assert_eq!(config.scheme.as_deref(), Some("https"));
        assert_eq!(config.host.as_deref(), Some("localhost:8089"));
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("changeme"));
        assert_eq!(
            config.endpoint.as_deref(),
            Some("/services/receivers/stream")
        );
        assert_eq!(config.source.as_deref(), Some("splunkstream.go"));
        assert_eq!(config.sourcetype.as_deref(), Some("splunkstream"));
        assert_eq!(config.index, None);
        assert_eq!(config.remote_host, None);
    }

    #[test]
    fn test_apply_defaults_is_idempotent() {
        let once = Config::new().with_defaults();
        let twice = once.clone().with_defaults();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_defaults_keeps_set_fields() {
        let mut config = Config::new().with_host("splunk:8089").with_scheme("");
        config.apply_defaults();
        assert_eq!(config.host.as_deref(), Some("splunk:8089"));
        assert_eq!(config.scheme.as_deref(), Some("https"));
    }

    #[test]
    fn test_effective_values_without_defaults_applied() {
        let config = Config::new();
        assert_eq!(config.scheme(), "https");
        assert_eq!(config.host(), "localhost:8089");
        assert!(config.is_tls());
        assert_eq!(config.index(), None);
        assert_eq!(Config::new().with_index("").index(), None);
    }

    #[test]
    fn test_default_url() {
        assert_eq!(
            Config::new().build_url().unwrap(),
            "https://localhost:8089/services/receivers/stream?source=splunkstream.go&sourcetype=splunkstream"
        );
    }

    #[test]
    fn test_url_with_all_query_args() {
        let config = test_config()
            .with_index("testindex")
            .with_remote_host("testhost");

        assert_eq!(
            config.build_url().unwrap(),
            "http://splunk.local:8089/services/receivers/stream?host=testhost&index=testindex&source=testsource&sourcetype=testsourcetype"
        );
        assert_eq!(
            config.build_request_uri().unwrap(),
            "/services/receivers/stream?host=testhost&index=testindex&source=testsource&sourcetype=testsourcetype"
        );
    }

    #[duplicate_item(
        test_name                       index_arg           remote_host_arg     expected_query;
        [test_query_without_optionals]  [None]              [None]              ["source=testsource&sourcetype=testsourcetype"];
        [test_query_with_index]         [Some("main")]      [None]              ["index=main&source=testsource&sourcetype=testsourcetype"];
        [test_query_with_remote_host]   [None]              [Some("web01")]     ["host=web01&source=testsource&sourcetype=testsourcetype"];
        [test_query_with_both]          [Some("main")]      [Some("web01")]     ["host=web01&index=main&source=testsource&sourcetype=testsourcetype"];
    )]
    #[test]
    fn test_name() {
        let config = Config {
            index: index_arg.map(str::to_string),
            remote_host: remote_host_arg.map(str::to_string),
            ..test_config()
        };
        let request_uri = config.build_request_uri().unwrap();
        assert_eq!(
            request_uri,
            format!("/services/receivers/stream?{}", expected_query)
        );
    }

    #[test]
    fn test_request_uri_is_url_without_authority() {
        for config in [
            Config::new(),
            test_config().with_index("i"),
            test_config().with_remote_host("h").with_endpoint("/custom/path"),
            Config::new().with_scheme("HTTP").with_host("[::1]:9999"),
        ] {
            let url = config.build_url().unwrap();
            let request_uri = config.build_request_uri().unwrap();
            let authority = format!(
                "{}://{}",
                config.scheme().to_ascii_lowercase(),
                config.host()
            );
            assert_eq!(url.strip_prefix(&authority), Some(request_uri.as_str()));
        }
    }

    #[test]
    fn test_query_values_are_form_encoded() {
        let config = test_config()
            .with_source("my app")
            .with_sourcetype("a&b=c");
        assert_eq!(
            config.build_request_uri().unwrap(),
            "/services/receivers/stream?source=my+app&sourcetype=a%26b%3Dc"
        );
    }

    #[test]
    fn test_malformed_host_is_config_error() {
        let config = Config::new().with_host("bad host:80");
        assert!(matches!(config.build_url(), Err(StreamError::Config(_))));
    }

    #[test]
    fn test_basic_auth() {
        assert_eq!(Config::new().basic_auth(), "YWRtaW46Y2hhbmdlbWU=");
        assert_eq!(
            Config::new()
                .with_credentials("Aladdin", "open sesame")
                .basic_auth(),
            "QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_validate() {
        assert!(Config::new().validate().is_ok());
        assert!(test_config().validate().is_ok());
        assert!(Config::new().with_scheme("ftp").validate().is_err());
        assert!(Config::new().with_host("localhost").validate().is_err());
        assert!(Config::new().with_host(":8089").validate().is_err());
        assert!(Config::new()
            .with_endpoint("services/receivers/stream")
            .validate()
            .is_err());
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("localhost:8089"), Some(("localhost", 8089)));
        assert_eq!(split_host_port("[::1]:443"), Some(("::1", 443)));
        assert_eq!(split_host_port("localhost"), None);
        assert_eq!(split_host_port("localhost:http"), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Config::new().with_credentials("admin", "s3cret"));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"host": "splunk:8089", "index": "main"}"#).unwrap();
        assert_eq!(config.host(), "splunk:8089");
        assert_eq!(config.index(), Some("main"));
        assert_eq!(config.scheme(), "https");
        assert!(!config.verify_certificate);
    }

    const ENV_KEYS: &[&str] = &[
        "SPLUNK_SCHEME",
        "SPLUNK_HOST",
        "SPLUNK_AUTH",
        "SPLUNK_USERNAME",
        "SPLUNK_PASSWORD",
        "SPLUNK_ENDPOINT",
        "SPLUNK_SOURCE",
        "SPLUNK_SOURCETYPE",
        "SPLUNK_INDEX",
        "SPLUNK_REMOTE_HOST",
        "SPLUNK_INSECURE",
        "SPLUNK_VERIFY_CERTIFICATE",
        "SPLUNK_CA_CERT_PATH",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("SPLUNK_HOST", "splunk.local:8089");
        env::set_var("SPLUNK_AUTH", "ingest:p4ss:word");
        env::set_var("SPLUNK_INDEX", "main");
        env::set_var("SPLUNK_INSECURE", "true");
        env::set_var("SPLUNK_VERIFY_CERTIFICATE", "TRUE");

        let config = Config::from_env().unwrap();
        assert_eq!(config.host(), "splunk.local:8089");
        assert_eq!(config.username(), "ingest");
        assert_eq!(config.password(), "p4ss:word");
        assert_eq!(config.index(), Some("main"));
        assert_eq!(config.scheme(), "http");
        assert!(config.verify_certificate);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_auth() {
        clear_env();
        env::set_var("SPLUNK_AUTH", "no-colon");
        let err = Config::from_env().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: SPLUNK_AUTH must be in username:password form"
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_scheme() {
        clear_env();
        env::set_var("SPLUNK_SCHEME", "udp");
        assert!(Config::from_env().is_err());
        clear_env();
    }
}

//! OTLP log exporter builders and configurations.
//!
//! OTLP supports sending data via different protocols and formats. The
//! [`config`] module resolves a single [`Config`](config::Config) from
//! defaults, environment variables and explicit options, and the transport
//! modules turn that config into a [`LogsClient`](crate::LogsClient).

use crate::context::ContextError;
use crate::exporter::config::envconfig::EnvOptionsReader;
use crate::exporter::config::options::{self, ExporterOption};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

pub mod config;
pub(crate) mod http;
pub(crate) mod tonic;

/// Target to which the exporter is going to send signals, defaults to `localhost:4317`
/// for gRPC and `localhost:4318` for HTTP.
/// Learn about the relationship between this constant and the per-signal variable at
/// <https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/protocol/exporter.md#endpoint-urls-for-otlphttp>
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// Key-value pairs to be used as headers associated with gRPC or HTTP requests
/// Example: `k1=v1,k2=v2`
pub const OTEL_EXPORTER_OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
/// Protocol the exporter will use. One of `grpc`, `http/protobuf` or `http/json`.
pub const OTEL_EXPORTER_OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
/// Compression algorithm to use, defaults to none.
pub const OTEL_EXPORTER_OTLP_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_COMPRESSION";
/// Max waiting time for the backend to process each signal batch, defaults to 10 seconds.
pub const OTEL_EXPORTER_OTLP_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
/// Path to a PEM encoded root CA bundle used to verify the collector.
pub const OTEL_EXPORTER_OTLP_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_CERTIFICATE";
/// Path to the PEM encoded client certificate chain used for mTLS.
pub const OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE";
/// Path to the PEM encoded private key of the client certificate.
pub const OTEL_EXPORTER_OTLP_CLIENT_KEY: &str = "OTEL_EXPORTER_OTLP_CLIENT_KEY";
/// Whether to disable transport security for the collector connection.
pub const OTEL_EXPORTER_OTLP_INSECURE: &str = "OTEL_EXPORTER_OTLP_INSECURE";

/// Protocol value for HTTP with protobuf encoding
pub const OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_PROTOBUF: &str = "http/protobuf";
/// Protocol value for gRPC
pub const OTEL_EXPORTER_OTLP_PROTOCOL_GRPC: &str = "grpc";
/// Protocol value for HTTP with JSON encoding
pub const OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_JSON: &str = "http/json";

/// Default max waiting time for the backend to process each signal batch.
pub const OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT: Duration = Duration::from_millis(10000);

/// Default collector host for both transports.
pub const OTEL_EXPORTER_OTLP_HOST_DEFAULT: &str = "localhost";
/// Default collector port for gRPC.
pub const OTEL_EXPORTER_OTLP_GRPC_PORT_DEFAULT: u16 = 4317;
/// Default collector port for HTTP.
pub const OTEL_EXPORTER_OTLP_HTTP_PORT_DEFAULT: u16 = 4318;

/// Errors produced while building clients, exporting or shutting down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The [`Context`](crate::Context) passed to the operation ended first.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Invalid URI.
    #[error("invalid URI {0}. Reason {1}")]
    InvalidUri(String, String),

    /// Invalid configuration.
    #[error("{name}: {reason}")]
    InvalidConfig {
        /// The configuration name.
        name: String,
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// Certificate or key material could not be read or parsed.
    #[error("unreadable or unparsable credential material: {0}")]
    InvalidCredentials(String),

    /// The client was stopped before the operation.
    #[error("exporter is already shut down")]
    AlreadyShutdown,

    /// The request could not be built or sent.
    #[error("export request failed: {0}")]
    RequestFailed(String),

    /// The collector rejected the export.
    #[error("export failed with status {status}: {message}")]
    ExportFailed {
        /// HTTP status code or gRPC code reported by the collector.
        status: String,
        /// Response message, if any.
        message: String,
    },

    /// Failed due to an internal error.
    /// The error message is intended for logging purposes only and should not
    /// be used to make programmatic decisions.
    #[error("Reason: {0}")]
    InternalFailure(String),
}

impl From<::http::Error> for Error {
    fn from(err: ::http::Error) -> Self {
        Error::RequestFailed(err.to_string())
    }
}

impl From<::http::uri::InvalidUri> for Error {
    fn from(err: ::http::uri::InvalidUri) -> Self {
        Error::InvalidUri(err.to_string(), "failed to parse the collector uri".to_string())
    }
}

impl From<::tonic::transport::Error> for Error {
    fn from(err: ::tonic::transport::Error) -> Self {
        Error::InternalFailure(format!("transport error: {err}"))
    }
}

impl From<::tonic::Status> for Error {
    fn from(status: ::tonic::Status) -> Self {
        Error::ExportFailed {
            status: format!("{:?}", status.code()),
            message: status.message().to_string(),
        }
    }
}

/// The communication protocol to use when exporting data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Protocol {
    /// GRPC protocol
    Grpc,
    /// HTTP protocol with binary protobuf
    #[default]
    HttpBinary,
    /// HTTP protocol with JSON payload
    HttpJson,
}

impl Protocol {
    /// Parse an `OTEL_EXPORTER_OTLP_PROTOCOL` value, ignoring case.
    ///
    /// Unknown values resolve to [`Protocol::HttpBinary`].
    pub fn from_env_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            OTEL_EXPORTER_OTLP_PROTOCOL_GRPC => Protocol::Grpc,
            OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_JSON => Protocol::HttpJson,
            _ => Protocol::HttpBinary,
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Grpc => write!(f, "{OTEL_EXPORTER_OTLP_PROTOCOL_GRPC}"),
            Protocol::HttpBinary => write!(f, "{OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_PROTOBUF}"),
            Protocol::HttpJson => write!(f, "{OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_JSON}"),
        }
    }
}

/// The compression algorithm to use when sending data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Compression {
    /// Payloads are sent as-is.
    #[default]
    None,
    /// Compresses data using gzip.
    Gzip,
}

impl Compression {
    /// Parse an `OTEL_EXPORTER_OTLP_COMPRESSION` value. Only `gzip` selects
    /// compression; anything else disables it.
    pub fn from_env_value(value: &str) -> Self {
        if value == "gzip" {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}

/// User agent sent with every export, on both transports.
pub(crate) fn user_agent() -> String {
    format!("OTel-OTLP-Exporter-Rust/{}", env!("CARGO_PKG_VERSION"))
}

/// The configuration layers collected by an exporter builder.
///
/// Options are applied after the environment layer read through
/// `env_reader`, in the order they were added.
#[derive(Debug, Default)]
pub struct ExportConfig {
    pub(crate) env_reader: EnvOptionsReader,
    pub(crate) options: Vec<ExporterOption>,
}

/// Provide access to the [ExportConfig] field within the exporter builders.
pub trait HasExportConfig {
    /// Return a mutable reference to the [ExportConfig] within the exporter builders.
    fn export_config(&mut self) -> &mut ExportConfig;
}

/// Expose methods to layer options over the environment configuration.
///
/// This trait will be implemented for every struct that implemented [`HasExportConfig`] trait.
///
/// ## Examples
/// ```
/// use opentelemetry_otlp_logs::{LogExporter, WithExportConfig};
/// let exporter_builder = LogExporter::builder()
///     .with_http()
///     .with_endpoint("collector:4318");
/// ```
pub trait WithExportConfig {
    /// Set the collector address as `host[:port]`, without scheme or path.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    fn with_endpoint<T: Into<String>>(self, endpoint: T) -> Self;
    /// Set the protocol to use when communicating with the collector.
    fn with_protocol(self, protocol: Protocol) -> Self;
    /// Set the timeout to the collector.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    fn with_timeout(self, timeout: Duration) -> Self;
    /// Set the compression algorithm to use when communicating with the collector.
    fn with_compression(self, compression: Compression) -> Self;
    /// Replace the headers sent with every export.
    fn with_headers(self, headers: HashMap<String, String>) -> Self;
    /// Add an arbitrary option; it is applied after every option added before it.
    fn with_option(self, option: ExporterOption) -> Self;
    /// Read the environment layer from `reader` instead of the process environment.
    fn with_env_reader(self, reader: EnvOptionsReader) -> Self;
}

impl<B: HasExportConfig> WithExportConfig for B {
    fn with_endpoint<T: Into<String>>(self, endpoint: T) -> Self {
        self.with_option(options::with_endpoint(endpoint))
    }

    fn with_protocol(self, protocol: Protocol) -> Self {
        self.with_option(options::with_protocol(protocol))
    }

    fn with_timeout(self, timeout: Duration) -> Self {
        self.with_option(options::with_timeout(timeout))
    }

    fn with_compression(self, compression: Compression) -> Self {
        self.with_option(options::with_compression(compression))
    }

    fn with_headers(self, headers: HashMap<String, String>) -> Self {
        self.with_option(options::with_headers(headers))
    }

    fn with_option(mut self, option: ExporterOption) -> Self {
        self.export_config().options.push(option);
        self
    }

    fn with_env_reader(mut self, reader: EnvOptionsReader) -> Self {
        self.export_config().env_reader = reader;
        self
    }
}

pub(crate) fn parse_header_string(value: &str) -> impl Iterator<Item = (String, String)> + '_ {
    value
        .split_terminator(',')
        .map(str::trim)
        .filter_map(parse_header_key_value_string)
}

fn url_decode(value: &str) -> Option<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars_to_decode = Vec::<u8>::new();
    let mut all_chars = value.chars();

    loop {
        let ch = all_chars.next();

        if ch == Some('%') {
            chars_to_decode.push(
                u8::from_str_radix(&format!("{}{}", all_chars.next()?, all_chars.next()?), 16)
                    .ok()?,
            );
            continue;
        }

        if !chars_to_decode.is_empty() {
            result.push_str(std::str::from_utf8(&chars_to_decode).ok()?);
            chars_to_decode.clear();
        }

        match ch {
            Some(c) => result.push(c),
            None => return Some(result),
        }
    }
}

fn parse_header_key_value_string(key_value_string: &str) -> Option<(String, String)> {
    key_value_string
        .split_once('=')
        .map(|(key, value)| {
            let (key, value) = (key.trim(), value.trim());
            (
                url_decode(key).unwrap_or_else(|| key.to_string()),
                url_decode(value).unwrap_or_else(|| value.to_string()),
            )
        })
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
}

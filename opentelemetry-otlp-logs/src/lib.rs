//! The OTLP log exporter sends log records to an OpenTelemetry collector over
//! gRPC or HTTP.
//!
//! ## Configuration
//!
//! The exporter configuration is resolved in layers: transport defaults,
//! then the `OTEL_EXPORTER_OTLP_*` environment variables (per-signal
//! `OTEL_EXPORTER_OTLP_LOGS_*` variables win over generic ones), then the
//! options set on the builder, later options overriding earlier ones.
//!
//! ```no_run
//! use opentelemetry_otlp_logs::{Compression, Context, LogExporter, WithExportConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), opentelemetry_otlp_logs::Error> {
//! let exporter = LogExporter::builder()
//!     .with_http()
//!     .with_endpoint("collector:4318")
//!     .with_compression(Compression::Gzip)
//!     .with_timeout(Duration::from_secs(3))
//!     .build()?;
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(5));
//! exporter.export(&ctx, vec![]).await?;
//! exporter.shutdown(&ctx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment variables
//!
//! | variable | meaning |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | collector URL; `/v1/logs` is appended for HTTP |
//! | `OTEL_EXPORTER_OTLP_LOGS_ENDPOINT` | collector URL, used as-is |
//! | `OTEL_EXPORTER_OTLP_PROTOCOL` | `grpc`, `http/protobuf` or `http/json` |
//! | `OTEL_EXPORTER_OTLP_HEADERS` | `k1=v1,k2=v2`, percent-decoded |
//! | `OTEL_EXPORTER_OTLP_COMPRESSION` | `gzip` or `none` |
//! | `OTEL_EXPORTER_OTLP_TIMEOUT` | milliseconds |
//! | `OTEL_EXPORTER_OTLP_INSECURE` | `true` or `false` |
//! | `OTEL_EXPORTER_OTLP_CERTIFICATE` | path to a PEM root CA bundle |
//! | `OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE` / `_CLIENT_KEY` | paths to a PEM client identity |
//!
//! Each variable also exists with the `OTEL_EXPORTER_OTLP_LOGS_` prefix.
//! Malformed values are reported through the internal logs and ignored.
//!
//! ## Feature flags
//!
//! * `internal-logs`: emit the exporter's own diagnostics through `tracing` (enabled by default).
//! * `gzip-http`: gzip compression of HTTP payloads (enabled by default).
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod context;
mod exporter;
mod logs;
mod retry;
mod tls;

pub use crate::context::{Context, ContextError};
pub use crate::exporter::config::envconfig::{
    ConfigSource, EnvOptionsReader, ProcessEnv, DEFAULT_NAMESPACE,
};
pub use crate::exporter::config::options::{ExporterOption, Transport};
pub use crate::exporter::config::{
    clean_path, options, Config, DialOption, SignalConfig, DEFAULT_LOGS_PATH,
};
pub use crate::exporter::http::HttpExporterBuilder;
pub use crate::exporter::tonic::TonicExporterBuilder;
pub use crate::exporter::{
    Compression, Error, ExportConfig, HasExportConfig, Protocol, WithExportConfig,
    OTEL_EXPORTER_OTLP_CERTIFICATE, OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE,
    OTEL_EXPORTER_OTLP_CLIENT_KEY, OTEL_EXPORTER_OTLP_COMPRESSION, OTEL_EXPORTER_OTLP_ENDPOINT,
    OTEL_EXPORTER_OTLP_GRPC_PORT_DEFAULT, OTEL_EXPORTER_OTLP_HEADERS,
    OTEL_EXPORTER_OTLP_HOST_DEFAULT, OTEL_EXPORTER_OTLP_HTTP_PORT_DEFAULT,
    OTEL_EXPORTER_OTLP_INSECURE, OTEL_EXPORTER_OTLP_PROTOCOL,
    OTEL_EXPORTER_OTLP_PROTOCOL_GRPC, OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_JSON,
    OTEL_EXPORTER_OTLP_PROTOCOL_HTTP_PROTOBUF, OTEL_EXPORTER_OTLP_TIMEOUT,
    OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT,
};
pub use crate::logs::{
    ExporterState, LogExporter, LogExporterBuilder, LogsClient,
    OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE, OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE,
    OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY, OTEL_EXPORTER_OTLP_LOGS_COMPRESSION,
    OTEL_EXPORTER_OTLP_LOGS_ENDPOINT, OTEL_EXPORTER_OTLP_LOGS_HEADERS,
    OTEL_EXPORTER_OTLP_LOGS_INSECURE, OTEL_EXPORTER_OTLP_LOGS_PROTOCOL,
    OTEL_EXPORTER_OTLP_LOGS_TIMEOUT,
};
pub use crate::retry::{BackoffConfig, RetryConfig};
pub use crate::tls::{ClientIdentity, TlsConfig, TransportCredentials};

/// Generated OTLP protobuf types, for building the batches passed to
/// [`LogExporter::export`].
pub mod proto {
    pub use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
}

//! OTLP - Log Exporter
//!
//! Defines a [LogExporter] to send logs via the OpenTelemetry Protocol (OTLP)

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use opentelemetry::otel_debug;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use tokio::sync::OnceCell;

use crate::exporter::config::envconfig::EnvOptionsReader;
use crate::exporter::http::HttpExporterBuilder;
use crate::exporter::tonic::TonicExporterBuilder;
use crate::{Context, Error, Protocol, WithExportConfig};

/// Compression algorithm to use, defaults to none.
pub const OTEL_EXPORTER_OTLP_LOGS_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_LOGS_COMPRESSION";

/// Target to which the exporter is going to send logs
pub const OTEL_EXPORTER_OTLP_LOGS_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_LOGS_ENDPOINT";

/// Maximum time the OTLP exporter will wait for each batch logs export.
pub const OTEL_EXPORTER_OTLP_LOGS_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_LOGS_TIMEOUT";

/// Key-value pairs to be used as headers associated with gRPC or HTTP requests
/// for sending logs.
/// Example: `k1=v1,k2=v2`
pub const OTEL_EXPORTER_OTLP_LOGS_HEADERS: &str = "OTEL_EXPORTER_OTLP_LOGS_HEADERS";

/// Protocol used for logs, overrides `OTEL_EXPORTER_OTLP_PROTOCOL`.
pub const OTEL_EXPORTER_OTLP_LOGS_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_LOGS_PROTOCOL";

/// Path to the root CA bundle used for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE: &str = "OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE";

/// Path to the client certificate used for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE: &str =
    "OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE";

/// Path to the client key used for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY: &str = "OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY";

/// Whether to disable transport security for logs.
pub const OTEL_EXPORTER_OTLP_LOGS_INSECURE: &str = "OTEL_EXPORTER_OTLP_LOGS_INSECURE";

/// Transport of a [`LogExporter`].
///
/// Every call receives the caller's [`Context`] and should give up once it
/// ends.
#[async_trait]
pub trait LogsClient: Debug + Send + Sync {
    /// Send a batch of logs to the collector.
    async fn upload_logs(&self, ctx: &Context, logs: Vec<ResourceLogs>) -> Result<(), Error>;

    /// Release the resources of the client. Uploads attempted afterwards fail.
    async fn stop(&self, ctx: &Context) -> Result<(), Error>;
}

/// Lifecycle of a [`LogExporter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExporterState {
    /// Exporting; no shutdown is in progress.
    Constructed,
    /// A shutdown is waiting for the client to stop.
    Stopping,
    /// The client stopped, successfully or not.
    Stopped,
}

/// OTLP log exporter builder
#[derive(Debug, Default)]
pub struct LogExporterBuilder {
    env_reader: Option<EnvOptionsReader>,
}

impl LogExporterBuilder {
    /// Export over HTTP.
    pub fn with_http(self) -> HttpExporterBuilder {
        let builder = HttpExporterBuilder::default();
        match self.env_reader {
            Some(reader) => builder.with_env_reader(reader),
            None => builder,
        }
    }

    /// Export over gRPC.
    pub fn with_tonic(self) -> TonicExporterBuilder {
        let builder = TonicExporterBuilder::default();
        match self.env_reader {
            Some(reader) => builder.with_env_reader(reader),
            None => builder,
        }
    }

    /// Read the environment layer from `reader` instead of the process
    /// environment.
    pub fn with_env_reader(mut self, reader: EnvOptionsReader) -> Self {
        self.env_reader = Some(reader);
        self
    }

    /// Build an exporter for the transport selected by the `PROTOCOL`
    /// variables, HTTP with protobuf payloads if none is set.
    ///
    /// Selecting gRPC requires a tokio runtime.
    pub fn build(self) -> Result<LogExporter, Error> {
        let protocol = self
            .env_reader
            .clone()
            .unwrap_or_default()
            .protocol(Protocol::HttpBinary);
        match protocol {
            Protocol::Grpc => self.with_tonic().build(),
            Protocol::HttpBinary | Protocol::HttpJson => self.with_http().build(),
        }
    }
}

/// OTLP exporter that sends log data
#[derive(Debug)]
pub struct LogExporter {
    client: Box<dyn LogsClient>,
    stop_outcome: OnceCell<Result<(), Error>>,
    stopping: AtomicUsize,
}

impl LogExporter {
    /// Obtain a builder to configure a [LogExporter].
    pub fn builder() -> LogExporterBuilder {
        LogExporterBuilder::default()
    }

    /// Create a new log exporter
    pub fn new(client: impl LogsClient + 'static) -> Self {
        LogExporter {
            client: Box::new(client),
            stop_outcome: OnceCell::new(),
            stopping: AtomicUsize::new(0),
        }
    }

    /// Send `logs` through the client.
    ///
    /// Returns the error of `ctx` without contacting the collector when `ctx`
    /// has already ended.
    pub async fn export(&self, ctx: &Context, logs: Vec<ResourceLogs>) -> Result<(), Error> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        self.client.upload_logs(ctx, logs).await
    }

    /// Stop the client.
    ///
    /// The client is stopped once no matter how many callers shut down the
    /// exporter concurrently; every caller waits for that stop but gives up
    /// when its own `ctx` ends. The outcome of a completed stop, success or
    /// transport error, is returned to every later caller. A stop abandoned
    /// because its context ended is retried by the next caller.
    pub async fn shutdown(&self, ctx: &Context) -> Result<(), Error> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        if let Some(outcome) = self.stop_outcome.get() {
            return outcome.clone();
        }

        let _in_flight = InFlight::enter(&self.stopping);
        let stop = self.stop_outcome.get_or_try_init(|| async move {
            otel_debug!(name: "LogExporter.StoppingClient");
            match self.client.stop(ctx).await {
                Err(Error::Context(err)) => Err(err),
                outcome => Ok(outcome),
            }
        });

        tokio::select! {
            biased;
            err = ctx.done() => Err(err.into()),
            res = stop => match res {
                Ok(outcome) => outcome.clone(),
                Err(err) => Err(err.into()),
            },
        }
    }

    /// Where the exporter is in its lifecycle.
    pub fn state(&self) -> ExporterState {
        if self.stop_outcome.initialized() {
            ExporterState::Stopped
        } else if self.stopping.load(Ordering::Acquire) > 0 {
            ExporterState::Stopping
        } else {
            ExporterState::Constructed
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        InFlight(count)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

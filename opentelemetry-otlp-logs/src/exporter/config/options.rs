//! Options that modify a [`Config`] during resolution.
//!
//! Every option is a pure `Config -> Config` function tagged with the
//! transports it affects. Options built for one transport are inert when the
//! configuration of the other transport is resolved, so a single option list
//! can be shared by both builders.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry_http::HttpClient;

use super::{Config, DialOption};
use crate::exporter::{Compression, Protocol};
use crate::retry::RetryConfig;
use crate::tls::{TlsConfig, TransportCredentials};

/// The transport a [`Config`] is being resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// OTLP over HTTP.
    Http,
    /// OTLP over gRPC.
    Grpc,
}

type ConfigFn = Arc<dyn Fn(Config) -> Config + Send + Sync>;

#[derive(Clone)]
enum OptionKind {
    Generic(ConfigFn),
    Split { http: ConfigFn, grpc: ConfigFn },
    HttpOnly(ConfigFn),
    GrpcOnly(ConfigFn),
}

/// A single configuration step.
#[derive(Clone)]
pub struct ExporterOption {
    kind: OptionKind,
}

impl fmt::Debug for ExporterOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            OptionKind::Generic(_) => "Generic",
            OptionKind::Split { .. } => "Split",
            OptionKind::HttpOnly(_) => "HttpOnly",
            OptionKind::GrpcOnly(_) => "GrpcOnly",
        };
        f.debug_tuple("ExporterOption").field(&kind).finish()
    }
}

impl ExporterOption {
    /// An option applied identically for both transports.
    pub fn generic<F>(f: F) -> Self
    where
        F: Fn(Config) -> Config + Send + Sync + 'static,
    {
        ExporterOption {
            kind: OptionKind::Generic(Arc::new(f)),
        }
    }

    /// An option with a distinct function per transport.
    pub fn split<H, G>(http: H, grpc: G) -> Self
    where
        H: Fn(Config) -> Config + Send + Sync + 'static,
        G: Fn(Config) -> Config + Send + Sync + 'static,
    {
        ExporterOption {
            kind: OptionKind::Split {
                http: Arc::new(http),
                grpc: Arc::new(grpc),
            },
        }
    }

    /// An option that only affects the HTTP transport.
    pub fn http_only<F>(f: F) -> Self
    where
        F: Fn(Config) -> Config + Send + Sync + 'static,
    {
        ExporterOption {
            kind: OptionKind::HttpOnly(Arc::new(f)),
        }
    }

    /// An option that only affects the gRPC transport.
    pub fn grpc_only<F>(f: F) -> Self
    where
        F: Fn(Config) -> Config + Send + Sync + 'static,
    {
        ExporterOption {
            kind: OptionKind::GrpcOnly(Arc::new(f)),
        }
    }

    /// Apply the option to `config` as seen by `transport`.
    pub fn apply(&self, transport: Transport, config: Config) -> Config {
        match (&self.kind, transport) {
            (OptionKind::Generic(f), _) => f(config),
            (OptionKind::Split { http, .. }, Transport::Http) => http(config),
            (OptionKind::Split { grpc, .. }, Transport::Grpc) => grpc(config),
            (OptionKind::HttpOnly(f), Transport::Http) => f(config),
            (OptionKind::GrpcOnly(f), Transport::Grpc) => f(config),
            _ => config,
        }
    }
}

/// Set the collector address as `host[:port]`.
pub fn with_endpoint(endpoint: impl Into<String>) -> ExporterOption {
    let endpoint = endpoint.into();
    ExporterOption::generic(move |mut config| {
        config.logs.endpoint = endpoint.clone();
        config
    })
}

/// Set the payload compression.
pub fn with_compression(compression: Compression) -> ExporterOption {
    ExporterOption::generic(move |mut config| {
        config.logs.compression = compression;
        config
    })
}

/// Set the URL path of the HTTP endpoint. The path is cleaned once the
/// configuration is resolved.
pub fn with_url_path(url_path: impl Into<String>) -> ExporterOption {
    let url_path = url_path.into();
    ExporterOption::generic(move |mut config| {
        config.logs.url_path = url_path.clone();
        config
    })
}

/// Set the retry policy.
pub fn with_retry(retry_config: RetryConfig) -> ExporterOption {
    ExporterOption::generic(move |mut config| {
        config.retry_config = retry_config;
        config
    })
}

/// Use `tls_config` for the collector connection.
///
/// The HTTP transport keeps the TLS settings as they are, the gRPC transport
/// turns them into channel credentials.
pub fn with_tls_client_config(tls_config: TlsConfig) -> ExporterOption {
    let grpc_tls = tls_config.clone();
    ExporterOption::split(
        move |mut config| {
            config.logs.tls_config = Some(tls_config.clone());
            config
        },
        move |mut config| {
            config.logs.grpc_credentials = Some(TransportCredentials::Tls(grpc_tls.clone()));
            config
        },
    )
}

/// Disable transport security.
pub fn with_insecure() -> ExporterOption {
    ExporterOption::generic(|mut config| {
        config.logs.insecure = true;
        config
    })
}

/// Enable transport security.
pub fn with_secure() -> ExporterOption {
    ExporterOption::generic(|mut config| {
        config.logs.insecure = false;
        config
    })
}

/// Replace the headers sent with every export.
pub fn with_headers(headers: HashMap<String, String>) -> ExporterOption {
    ExporterOption::generic(move |mut config| {
        config.logs.headers = headers.clone();
        config
    })
}

/// Set the max waiting time for the backend to process each batch.
pub fn with_timeout(timeout: Duration) -> ExporterOption {
    ExporterOption::generic(move |mut config| {
        config.logs.timeout = timeout;
        config
    })
}

/// Set the wire protocol.
pub fn with_protocol(protocol: Protocol) -> ExporterOption {
    ExporterOption::generic(move |mut config| {
        config.logs.protocol = protocol;
        config
    })
}

/// Send exports through `client` instead of the default HTTP client.
pub fn with_http_client<T: HttpClient + 'static>(client: T) -> ExporterOption {
    let client: Arc<dyn HttpClient> = Arc::new(client);
    ExporterOption::http_only(move |mut config| {
        config.logs.http_client = Some(client.clone());
        config
    })
}

/// Set the minimum connect timeout of the gRPC channel.
pub fn with_reconnection_period(period: Duration) -> ExporterOption {
    ExporterOption::grpc_only(move |mut config| {
        config.reconnection_period = period;
        config
    })
}

/// Set the JSON service config of the gRPC channel.
pub fn with_service_config(service_config: impl Into<String>) -> ExporterOption {
    let service_config = service_config.into();
    ExporterOption::grpc_only(move |mut config| {
        config.service_config = Some(service_config.clone());
        config
    })
}

/// Append a raw dial option to the gRPC channel construction.
pub fn with_dial_option(option: DialOption) -> ExporterOption {
    ExporterOption::grpc_only(move |mut config| {
        config.dial_options.push(option.clone());
        config
    })
}

/// Export over an already established gRPC channel.
pub fn with_grpc_conn(channel: ::tonic::transport::Channel) -> ExporterOption {
    ExporterOption::grpc_only(move |mut config| {
        config.grpc_conn = Some(channel.clone());
        config
    })
}

/// Set the gRPC channel credentials.
pub fn with_grpc_credentials(credentials: TransportCredentials) -> ExporterOption {
    ExporterOption::grpc_only(move |mut config| {
        config.logs.grpc_credentials = Some(credentials.clone());
        config
    })
}

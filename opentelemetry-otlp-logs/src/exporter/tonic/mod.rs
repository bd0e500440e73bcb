use std::time::Duration;

use opentelemetry::otel_debug;
use tonic::codec::CompressionEncoding;
use tonic::metadata::MetadataMap;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

use super::{Compression, ExportConfig, HasExportConfig};
use crate::exporter::config::options;
use crate::exporter::config::{Config, DialOption};
use crate::tls::{TlsConfig, TransportCredentials};
use crate::{Error, LogExporter, WithExportConfig};

pub(crate) mod logs;

use logs::TonicLogsClient;

/// Builder of a [`LogExporter`] sending OTLP over gRPC, using [tonic].
///
/// It allows you to
/// - set channel credentials
/// - tune the dial options of the channel
/// - specify a custom [channel]
///
/// [tonic]: <https://github.com/hyperium/tonic>
/// [channel]: tonic::transport::Channel
///
/// ## Examples
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), opentelemetry_otlp_logs::Error> {
/// let exporter = opentelemetry_otlp_logs::LogExporter::builder()
///     .with_tonic()
///     .with_insecure()
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct TonicExporterBuilder {
    pub(crate) exporter_config: ExportConfig,
}

impl HasExportConfig for TonicExporterBuilder {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.exporter_config
    }
}

impl TonicExporterBuilder {
    /// Connect without transport security.
    pub fn with_insecure(self) -> Self {
        self.with_option(options::with_insecure())
    }

    /// Use `credentials` for the channel. Takes precedence over
    /// [`with_insecure`](Self::with_insecure).
    pub fn with_credentials(self, credentials: TransportCredentials) -> Self {
        self.with_option(options::with_grpc_credentials(credentials))
    }

    /// Use `channel` instead of dialing the collector.
    pub fn with_channel(self, channel: Channel) -> Self {
        self.with_option(options::with_grpc_conn(channel))
    }

    /// Resolve the configuration and create the exporter.
    ///
    /// The channel connects lazily, so this must be called within a tokio
    /// runtime.
    pub fn build(self) -> Result<LogExporter, Error> {
        let config = Config::new_grpc(
            &self.exporter_config.env_reader,
            &self.exporter_config.options,
        );
        let client = TonicLogsClient::new(config)?;
        Ok(LogExporter::new(client))
    }
}

pub(crate) struct TonicChannel {
    pub(crate) channel: Channel,
    pub(crate) metadata: MetadataMap,
    pub(crate) compression: Option<CompressionEncoding>,
    pub(crate) timeout: Duration,
}

/// Turn a resolved gRPC configuration into a channel.
///
/// A pre-established connection is used as-is; otherwise the dial options
/// are applied to a new lazily connected endpoint, in order.
pub(crate) fn build_channel(config: Config) -> Result<TonicChannel, Error> {
    let metadata = MetadataMap::from_headers(crate::exporter::http::build_headers(
        &config.logs.headers,
    ));
    let compression = match config.logs.compression {
        Compression::Gzip => Some(CompressionEncoding::Gzip),
        Compression::None => None,
    };
    let timeout = config.logs.timeout;

    if let Some(channel) = config.grpc_conn {
        otel_debug!(name: "TonicChannelProvided");
        return Ok(TonicChannel {
            channel,
            metadata,
            compression,
            timeout,
        });
    }

    let insecure = config
        .dial_options
        .iter()
        .rev()
        .find_map(|option| match option {
            DialOption::TransportCredentials(credentials) => {
                Some(*credentials == TransportCredentials::Insecure)
            }
            _ => None,
        })
        .unwrap_or(config.logs.insecure);
    let scheme = if insecure { "http" } else { "https" };
    let uri = format!("{scheme}://{}", config.logs.endpoint);

    let mut endpoint = Endpoint::from_shared(uri.clone())?;
    for option in &config.dial_options {
        endpoint = apply_dial_option(endpoint, option)?;
    }

    let channel = endpoint.timeout(timeout).connect_lazy();

    otel_debug!(
        name: "TonicChannelBuilt",
        endpoint = uri,
        timeout_in_millisecs = timeout.as_millis(),
        compression = format!("{:?}", compression)
    );
    Ok(TonicChannel {
        channel,
        metadata,
        compression,
        timeout,
    })
}

fn apply_dial_option(endpoint: Endpoint, option: &DialOption) -> Result<Endpoint, Error> {
    Ok(match option {
        DialOption::UserAgent(user_agent) => endpoint.user_agent(user_agent.clone())?,
        DialOption::DefaultServiceConfig(service_config) => {
            otel_debug!(
                name: "TonicChannel.ServiceConfigIgnored",
                service_config = service_config.as_str()
            );
            endpoint
        }
        DialOption::TransportCredentials(TransportCredentials::Insecure) => endpoint,
        DialOption::TransportCredentials(TransportCredentials::Tls(tls)) => {
            endpoint.tls_config(client_tls_config(tls))?
        }
        // compression is set on the client
        DialOption::DefaultCompressor(_) => endpoint,
        DialOption::ConnectParams {
            min_connect_timeout,
            ..
        } => endpoint.connect_timeout(*min_connect_timeout),
    })
}

fn client_tls_config(tls: &TlsConfig) -> ClientTlsConfig {
    let config = match tls.root_certificates() {
        Some(pem) => ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)),
        None => ClientTlsConfig::new().with_native_roots(),
    };
    match tls.client_identity() {
        Some(identity) => {
            config.identity(Identity::from_pem(identity.certificate(), identity.key()))
        }
        None => config,
    }
}

use super::{user_agent, Compression, ExportConfig, HasExportConfig, Protocol};
use crate::exporter::config::options;
use crate::exporter::config::{Config, SignalConfig};
use crate::{Error, LogExporter, WithExportConfig};
use http::header::{HeaderName, HeaderValue, CONTENT_ENCODING, USER_AGENT};
use http::{HeaderMap, Uri};
use opentelemetry::otel_warn;
use opentelemetry_http::HttpClient;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use prost::Message;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "gzip-http")]
use std::io::Write;

mod logs;

/// Builder of a [`LogExporter`] sending OTLP over HTTP.
///
/// ## Examples
///
/// ```no_run
/// use opentelemetry_otlp_logs::{LogExporter, Protocol, WithExportConfig};
///
/// # fn main() -> Result<(), opentelemetry_otlp_logs::Error> {
/// let exporter = LogExporter::builder()
///     .with_http()
///     .with_endpoint("collector:4318")
///     .with_protocol(Protocol::HttpJson)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct HttpExporterBuilder {
    pub(crate) exporter_config: ExportConfig,
}

impl HasExportConfig for HttpExporterBuilder {
    fn export_config(&mut self) -> &mut ExportConfig {
        &mut self.exporter_config
    }
}

impl HttpExporterBuilder {
    /// Assign client implementation
    pub fn with_http_client<T: HttpClient + 'static>(self, client: T) -> Self {
        self.with_option(options::with_http_client(client))
    }

    /// Resolve the configuration and create the exporter.
    pub fn build(self) -> Result<LogExporter, Error> {
        let config = Config::new_http(
            &self.exporter_config.env_reader,
            &self.exporter_config.options,
        );
        let client = HttpLogsClient::new(config)?;
        Ok(LogExporter::new(client))
    }
}

/// Sends logs to the collector as a single HTTP POST per export.
#[derive(Debug)]
pub(crate) struct HttpLogsClient {
    client: Mutex<Option<Arc<dyn HttpClient>>>,
    collector_endpoint: Uri,
    headers: HeaderMap,
    protocol: Protocol,
    compression: Compression,
    timeout: Duration,
}

impl HttpLogsClient {
    pub(crate) fn new(config: Config) -> Result<Self, Error> {
        let signal = config.logs;

        #[cfg(not(feature = "gzip-http"))]
        if signal.compression == Compression::Gzip {
            return Err(Error::InvalidConfig {
                name: "compression".to_string(),
                reason: "gzip compression requires the gzip-http feature".to_string(),
            });
        }

        let scheme = if signal.insecure { "http" } else { "https" };
        let collector_endpoint = build_endpoint_uri(scheme, &signal.endpoint, &signal.url_path)?;

        let http_client = match signal.http_client.clone() {
            Some(client) => client,
            None => Arc::new(default_client(&signal)?),
        };

        let mut headers = build_headers(&signal.headers);
        let user_agent = HeaderValue::from_str(&user_agent())
            .map_err(|e| Error::InternalFailure(e.to_string()))?;
        headers.insert(USER_AGENT, user_agent);
        if signal.compression == Compression::Gzip {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }

        Ok(HttpLogsClient {
            client: Mutex::new(Some(http_client)),
            collector_endpoint,
            headers,
            protocol: signal.protocol,
            compression: signal.compression,
            timeout: signal.timeout,
        })
    }

    fn build_logs_export_body(
        &self,
        logs: Vec<ResourceLogs>,
    ) -> Result<(Vec<u8>, &'static str), Error> {
        let req = ExportLogsServiceRequest {
            resource_logs: logs,
        };
        let (body, content_type) = match self.protocol {
            Protocol::HttpJson => match serde_json::to_vec(&req) {
                Ok(json) => (json, "application/json"),
                Err(e) => return Err(Error::InternalFailure(e.to_string())),
            },
            _ => (req.encode_to_vec(), "application/x-protobuf"),
        };
        Ok((self.compress(body)?, content_type))
    }

    fn compress(&self, body: Vec<u8>) -> Result<Vec<u8>, Error> {
        match self.compression {
            Compression::None => Ok(body),
            #[cfg(feature = "gzip-http")]
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(&body)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| Error::InternalFailure(format!("gzip failed: {e}")))
            }
            #[cfg(not(feature = "gzip-http"))]
            Compression::Gzip => Err(Error::InternalFailure(
                "gzip compression requires the gzip-http feature".to_string(),
            )),
        }
    }
}

fn build_endpoint_uri(scheme: &str, endpoint: &str, url_path: &str) -> Result<Uri, Error> {
    let endpoint = endpoint.trim_end_matches('/');
    let uri = format!("{scheme}://{endpoint}{url_path}");
    uri.parse()
        .map_err(|e: http::uri::InvalidUri| Error::InvalidUri(uri, e.to_string()))
}

pub(crate) fn build_headers(headers: &HashMap<String, String>) -> HeaderMap {
    headers
        .iter()
        .filter_map(|(key, value)| {
            match (HeaderName::from_str(key), HeaderValue::from_str(value)) {
                (Ok(key), Ok(value)) => Some((key, value)),
                _ => {
                    otel_warn!(name: "HttpLogsClient.InvalidHeader", key = key.as_str());
                    None
                }
            }
        })
        .collect()
}

/// The reqwest client used when none was configured. Custom TLS material
/// replaces the system roots.
fn default_client(signal: &SignalConfig) -> Result<reqwest::Client, Error> {
    let mut builder = reqwest::Client::builder().timeout(signal.timeout);

    if let Some(tls) = signal.tls_config.as_ref().filter(|_| !signal.insecure) {
        if let Some(pem) = tls.root_certificates() {
            builder = builder.tls_built_in_root_certs(false);
            for cert in rustls_pemfile::certs(&mut &pem[..]) {
                let cert = cert.map_err(|e| Error::InvalidCredentials(e.to_string()))?;
                let cert = reqwest::Certificate::from_der(cert.as_ref())
                    .map_err(|e| Error::InvalidCredentials(e.to_string()))?;
                builder = builder.add_root_certificate(cert);
            }
        }
        if let Some(identity) = tls.client_identity() {
            let mut pem = identity.certificate().to_vec();
            pem.push(b'\n');
            pem.extend_from_slice(identity.key());
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| Error::InvalidCredentials(e.to_string()))?;
            builder = builder.identity(identity);
        }
    }

    builder
        .build()
        .map_err(|e| Error::InternalFailure(format!("failed to build http client: {e}")))
}

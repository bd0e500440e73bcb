//! Layered configuration for the OTLP log exporter.
//!
//! A [`Config`] is resolved once per exporter by folding, in this order:
//!
//! 1. the transport defaults,
//! 2. the options derived from `OTEL_EXPORTER_OTLP_*` and
//!    `OTEL_EXPORTER_OTLP_LOGS_*` environment variables (per-signal variables
//!    win over generic ones),
//! 3. the options passed by the caller, in call order.
//!
//! The fold is finished by transport specific normalization: the HTTP URL
//! path is cleaned, and the gRPC dial options are derived from the resolved
//! credentials, compression and reconnection settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::otel_debug;
use opentelemetry_http::HttpClient;

use crate::exporter::{
    user_agent, Compression, Protocol, OTEL_EXPORTER_OTLP_GRPC_PORT_DEFAULT,
    OTEL_EXPORTER_OTLP_HOST_DEFAULT, OTEL_EXPORTER_OTLP_HTTP_PORT_DEFAULT,
    OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT,
};
use crate::retry::{BackoffConfig, RetryConfig};
use crate::tls::{TlsConfig, TransportCredentials};

pub mod envconfig;
pub mod options;

use envconfig::EnvOptionsReader;
use options::{ExporterOption, Transport};

/// Default URL path for the endpoint that receives logs.
pub const DEFAULT_LOGS_PATH: &str = "/v1/logs";

/// Settings of the logs signal.
#[derive(Clone, Debug)]
pub struct SignalConfig {
    /// Collector address as `host[:port]`, without scheme. For gRPC the
    /// address may carry a path when it was derived from an endpoint URL.
    pub endpoint: String,
    /// Wire protocol.
    pub protocol: Protocol,
    /// Disable transport security.
    pub insecure: bool,
    /// TLS settings used by the HTTP transport.
    pub tls_config: Option<TlsConfig>,
    /// Headers sent with every export.
    pub headers: HashMap<String, String>,
    /// Payload compression.
    pub compression: Compression,
    /// Max waiting time for the backend to process each batch.
    pub timeout: Duration,
    /// URL path of the HTTP endpoint.
    pub url_path: String,
    /// Channel credentials of the gRPC transport.
    pub grpc_credentials: Option<TransportCredentials>,
    /// HTTP client used instead of the default one.
    pub http_client: Option<Arc<dyn HttpClient>>,
}

/// gRPC channel construction parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum DialOption {
    /// User agent announced on the channel.
    UserAgent(String),
    /// JSON service config the channel should default to.
    DefaultServiceConfig(String),
    /// Channel security.
    TransportCredentials(TransportCredentials),
    /// Compressor used for every call.
    DefaultCompressor(Compression),
    /// Connection establishment parameters.
    ConnectParams {
        /// Backoff between connection attempts.
        backoff: BackoffConfig,
        /// Minimum time given to a single connection attempt.
        min_connect_timeout: Duration,
    },
}

/// Effective exporter configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Settings of the logs signal.
    pub logs: SignalConfig,
    /// Retry policy handed to the transport client.
    pub retry_config: RetryConfig,
    /// Minimum connect timeout of the gRPC channel. Zero leaves the transport default.
    pub reconnection_period: Duration,
    /// gRPC service config.
    pub service_config: Option<String>,
    /// gRPC dial options, in application order.
    pub dial_options: Vec<DialOption>,
    /// Pre-established gRPC connection, used instead of dialing.
    pub grpc_conn: Option<::tonic::transport::Channel>,
}

impl Config {
    fn defaults(port: u16, protocol: Protocol) -> Self {
        Config {
            logs: SignalConfig {
                endpoint: format!("{OTEL_EXPORTER_OTLP_HOST_DEFAULT}:{port}"),
                protocol,
                insecure: false,
                tls_config: None,
                headers: HashMap::new(),
                compression: Compression::None,
                timeout: OTEL_EXPORTER_OTLP_TIMEOUT_DEFAULT,
                url_path: DEFAULT_LOGS_PATH.to_string(),
                grpc_credentials: None,
                http_client: None,
            },
            retry_config: RetryConfig::default(),
            reconnection_period: Duration::ZERO,
            service_config: None,
            dial_options: Vec::new(),
            grpc_conn: None,
        }
    }

    fn apply<'a>(
        self,
        transport: Transport,
        options: impl IntoIterator<Item = &'a ExporterOption>,
    ) -> Self {
        options
            .into_iter()
            .fold(self, |config, option| option.apply(transport, config))
    }

    /// Resolve the configuration of the HTTP transport.
    ///
    /// Environment options read through `reader` are applied first, then
    /// `options` in order.
    pub fn new_http(reader: &EnvOptionsReader, options: &[ExporterOption]) -> Self {
        let env_options = reader.options();
        let mut config = Config::defaults(OTEL_EXPORTER_OTLP_HTTP_PORT_DEFAULT, Protocol::HttpBinary)
            .apply(Transport::Http, env_options.iter().chain(options));

        config.logs.url_path = clean_path(&config.logs.url_path, DEFAULT_LOGS_PATH);

        otel_debug!(
            name: "HttpConfigBuilt",
            endpoint = config.logs.endpoint.as_str(),
            url_path = config.logs.url_path.as_str(),
            protocol = config.logs.protocol.to_string(),
            insecure = config.logs.insecure,
            compression = config.logs.compression.to_string(),
            timeout_in_millisecs = config.logs.timeout.as_millis()
        );
        config
    }

    /// Resolve the configuration of the gRPC transport.
    ///
    /// Environment options read through `reader` are applied first, then
    /// `options` in order. The dial options are finalized afterwards.
    pub fn new_grpc(reader: &EnvOptionsReader, options: &[ExporterOption]) -> Self {
        let env_options = reader.options();
        let mut config = Config::defaults(OTEL_EXPORTER_OTLP_GRPC_PORT_DEFAULT, Protocol::Grpc);
        config.dial_options.push(DialOption::UserAgent(user_agent()));
        let mut config = config.apply(Transport::Grpc, env_options.iter().chain(options));

        if let Some(service_config) = &config.service_config {
            config
                .dial_options
                .push(DialOption::DefaultServiceConfig(service_config.clone()));
        }

        // explicit credentials take precedence over the insecure flag
        let credentials = match &config.logs.grpc_credentials {
            Some(credentials) => credentials.clone(),
            None if config.logs.insecure => TransportCredentials::Insecure,
            None => {
                let credentials = TransportCredentials::Tls(TlsConfig::default());
                config.logs.grpc_credentials = Some(credentials.clone());
                credentials
            }
        };
        config
            .dial_options
            .push(DialOption::TransportCredentials(credentials));

        if config.logs.compression == Compression::Gzip {
            config
                .dial_options
                .push(DialOption::DefaultCompressor(Compression::Gzip));
        }

        if !config.reconnection_period.is_zero() {
            config.dial_options.push(DialOption::ConnectParams {
                backoff: BackoffConfig::default(),
                min_connect_timeout: config.reconnection_period,
            });
        }

        otel_debug!(
            name: "GrpcConfigBuilt",
            endpoint = config.logs.endpoint.as_str(),
            insecure = config.logs.insecure,
            compression = config.logs.compression.to_string(),
            timeout_in_millisecs = config.logs.timeout.as_millis(),
            dial_options = config.dial_options.len()
        );
        config
    }

    /// [`Config::new_http`] reading the process environment.
    pub fn http_from_env(options: &[ExporterOption]) -> Self {
        Config::new_http(&EnvOptionsReader::default(), options)
    }

    /// [`Config::new_grpc`] reading the process environment.
    pub fn grpc_from_env(options: &[ExporterOption]) -> Self {
        Config::new_grpc(&EnvOptionsReader::default(), options)
    }
}

/// Returns `url_path` trimmed and lexically cleaned, as an absolute path.
///
/// If the cleaned path is empty, `default_path` is returned instead.
pub fn clean_path(url_path: &str, default_path: &str) -> String {
    let cleaned = lexical_clean(url_path.trim());
    if cleaned == "." {
        default_path.to_string()
    } else if cleaned.starts_with('/') {
        cleaned
    } else {
        // rooting a relative path may expose leading `..` segments
        lexical_clean(&format!("/{cleaned}"))
    }
}

/// Join the non-empty elements with `/` and clean the result. Returns an
/// empty string when every element is empty.
pub(crate) fn join_path(elements: &[&str]) -> String {
    let joined = elements
        .iter()
        .filter(|element| !element.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        joined
    } else {
        lexical_clean(&joined)
    }
}

/// Shortest equivalent of `path`: repeated separators collapse, `.` segments
/// are dropped and `..` removes the preceding segment. An empty result is `.`.
fn lexical_clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `..` cannot climb above the root
                _ if rooted => {}
                _ => segments.push(".."),
            },
            segment => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use rstest::rstest;

    use super::envconfig::EnvOptionsReader;
    use super::options::{self, ExporterOption};
    use super::{clean_path, join_path, Config, DialOption, DEFAULT_LOGS_PATH};
    use crate::exporter::Compression;
    use crate::retry::BackoffConfig;
    use crate::tls::tests::{WEAK_CERTIFICATE, WEAK_PRIVATE_KEY};
    use crate::tls::{TlsConfig, TransportCredentials};

    fn reader(env: &[(&str, &str)]) -> EnvOptionsReader {
        reader_with_files(env, &[])
    }

    fn reader_with_files(env: &[(&str, &str)], files: &[(&str, &str)]) -> EnvOptionsReader {
        EnvOptionsReader::from_map(
            env.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            files.iter().map(|(k, v)| (k.to_string(), v.as_bytes().to_vec())),
        )
    }

    /// Build both transports so every assertion covers HTTP and gRPC.
    fn check(
        env: &EnvOptionsReader,
        opts: &[ExporterOption],
        asserts: impl Fn(&Config, bool),
    ) {
        asserts(&Config::new_http(env, opts), false);
        asserts(&Config::new_grpc(env, opts), true);
    }

    fn weak_tls() -> TlsConfig {
        TlsConfig::default()
            .with_root_certificates_pem(WEAK_CERTIFICATE)
            .unwrap()
    }

    #[rstest]
    #[case::clean_empty_path("", "DefaultPath", "DefaultPath")]
    #[case::clean_metrics_path("/prefix/v1/metrics", "DefaultMetricsPath", "/prefix/v1/metrics")]
    #[case::clean_logs_path("https://env_endpoint", "DefaultLogsPath", "/https:/env_endpoint")]
    #[case::spaces_trimmed(" /dir", "", "/dir")]
    #[case::clean_path_empty("dir/..", "DefaultLogsPath", "DefaultLogsPath")]
    #[case::make_absolute("dir/a", "", "/dir/a")]
    #[case::collapse_separators("//a///b/./c/", "/d", "/a/b/c")]
    #[case::no_parent_above_root("../../a/../b", "/d", "/b")]
    #[case::root_stays_root("/", "/d", "/")]
    fn test_clean_path(#[case] path: &str, #[case] default: &str, #[case] want: &str) {
        assert_eq!(clean_path(path, default), want);
    }

    #[test]
    fn test_clean_path_is_idempotent() {
        let paths = [
            "", " ", ".", "..", "/", "a", "/a/", "a/../..", "./a/./b", "/x/../../y", " v1/logs ",
            "https://host/p", "//", "a//b",
        ];
        for path in paths {
            let once = clean_path(path, DEFAULT_LOGS_PATH);
            assert_eq!(clean_path(&once, DEFAULT_LOGS_PATH), once, "path {path:?}");
            assert!(once.starts_with('/'), "path {path:?} cleaned to {once:?}");
            assert!(!once.split('/').any(|s| s == ".."), "path {path:?}");
        }
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(&["", "/v1/logs"]), "/v1/logs");
        assert_eq!(join_path(&["/prefix", "/v1/logs"]), "/prefix/v1/logs");
        assert_eq!(join_path(&["/prefix/", "/v1/logs"]), "/prefix/v1/logs");
        assert_eq!(join_path(&["env.endpoint", "/prefix"]), "env.endpoint/prefix");
        assert_eq!(join_path(&["env.endpoint", ""]), "env.endpoint");
        assert_eq!(join_path(&["", ""]), "");
    }

    #[test]
    fn test_default_configs() {
        check(&reader(&[]), &[], |c, grpc| {
            if grpc {
                assert_eq!(c.logs.endpoint, "localhost:4317");
            } else {
                assert_eq!(c.logs.endpoint, "localhost:4318");
            }
            assert_eq!(c.logs.url_path, "/v1/logs");
            assert_eq!(c.logs.compression, Compression::None);
            assert!(c.logs.headers.is_empty());
            assert_eq!(c.logs.timeout, Duration::from_secs(10));
            assert!(!c.logs.insecure);
        });
    }

    #[test]
    fn test_with_endpoint() {
        check(&reader(&[]), &[options::with_endpoint("someendpoint")], |c, _| {
            assert_eq!(c.logs.endpoint, "someendpoint");
        });
    }

    #[test]
    fn test_environment_endpoint() {
        let env = reader(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "https://env.endpoint/prefix")]);
        check(&env, &[], |c, grpc| {
            assert!(!c.logs.insecure);
            if grpc {
                assert_eq!(c.logs.endpoint, "env.endpoint/prefix");
            } else {
                assert_eq!(c.logs.endpoint, "env.endpoint");
                assert_eq!(c.logs.url_path, "/prefix/v1/logs");
            }
        });
    }

    #[test]
    fn test_environment_signal_specific_endpoint() {
        let env = reader(&[
            (
                "OTEL_EXPORTER_OTLP_ENDPOINT",
                "https://override.by.signal.specific/env/var",
            ),
            ("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT", "http://env.logs.endpoint"),
        ]);
        check(&env, &[], |c, grpc| {
            assert!(c.logs.insecure);
            assert_eq!(c.logs.endpoint, "env.logs.endpoint");
            if !grpc {
                // used as-is, the default signal path is not appended
                assert_eq!(c.logs.url_path, "/");
            }
        });
    }

    #[test]
    fn test_environment_signal_specific_endpoint_keeps_path() {
        let env = reader(&[(
            "OTEL_EXPORTER_OTLP_LOGS_ENDPOINT",
            "https://collector:4443/custom/ingest",
        )]);
        check(&env, &[], |c, grpc| {
            if grpc {
                assert_eq!(c.logs.endpoint, "collector:4443/custom/ingest");
            } else {
                assert_eq!(c.logs.endpoint, "collector:4443");
                assert_eq!(c.logs.url_path, "/custom/ingest");
            }
        });
    }

    #[test]
    fn test_mixed_environment_and_with_endpoint() {
        let env = reader(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "http://env_endpoint")]);
        check(&env, &[options::with_endpoint("logs_endpoint")], |c, _| {
            assert_eq!(c.logs.endpoint, "logs_endpoint");
        });
    }

    #[rstest]
    #[case::http_scheme("http://env_endpoint", true)]
    #[case::surrounding_spaces("      http://env_endpoint    ", true)]
    #[case::https_scheme("https://env_endpoint", false)]
    #[case::uppercase_https("HTTPS://env_endpoint", false)]
    #[case::mixed_case_http("HtTp://env_endpoint", true)]
    #[case::unix_scheme("unix://env_endpoint", true)]
    #[case::uppercase_unix("UNIX://env_endpoint", true)]
    fn test_environment_endpoint_scheme(#[case] endpoint: &str, #[case] insecure: bool) {
        let env = reader(&[("OTEL_EXPORTER_OTLP_ENDPOINT", endpoint)]);
        check(&env, &[], |c, _| {
            assert_eq!(c.logs.endpoint, "env_endpoint");
            assert_eq!(c.logs.insecure, insecure);
        });
    }

    #[test]
    fn test_environment_unix_socket_endpoint() {
        let env = reader(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "unix:///var/run/otel.sock")]);
        check(&env, &[], |c, grpc| {
            assert!(c.logs.insecure);
            if grpc {
                assert_eq!(c.logs.endpoint, "/var/run/otel.sock");
            } else {
                assert_eq!(c.logs.endpoint, "");
                assert_eq!(c.logs.url_path, "/var/run/otel.sock/v1/logs");
            }
        });

        let env = reader(&[("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT", "UNIX:///tmp/logs.sock")]);
        check(&env, &[], |c, grpc| {
            assert!(c.logs.insecure);
            if grpc {
                assert_eq!(c.logs.endpoint, "/tmp/logs.sock");
            } else {
                assert_eq!(c.logs.url_path, "/tmp/logs.sock");
            }
        });
    }

    #[test]
    fn test_environment_endpoint_keeps_default_port() {
        let env = reader(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "https://collector:443"),
            ("OTEL_EXPORTER_OTLP_INSECURE", "true"),
        ]);
        check(&env, &[], |c, _| {
            // the scheme no longer implies the port once security is overridden
            assert!(c.logs.insecure);
            assert_eq!(c.logs.endpoint, "collector:443");
        });

        let env = reader(&[("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT", "http://collector:80/ingest")]);
        check(&env, &[], |c, grpc| {
            if grpc {
                assert_eq!(c.logs.endpoint, "collector:80/ingest");
            } else {
                assert_eq!(c.logs.endpoint, "collector:80");
            }
        });

        let env = reader(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "https://collector")]);
        check(&env, &[], |c, _| {
            assert_eq!(c.logs.endpoint, "collector");
        });
    }

    #[test]
    fn test_environment_signal_specific_endpoint_with_uppercase_scheme() {
        let env = reader(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "HTTPS://overrode_by_signal_specific"),
            ("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT", "HtTp://env_logs_endpoint"),
        ]);
        check(&env, &[], |c, _| {
            assert_eq!(c.logs.endpoint, "env_logs_endpoint");
            assert!(c.logs.insecure);
        });
    }

    #[test]
    fn test_malformed_environment_endpoint_is_ignored() {
        let env = reader(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://[::1"),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", "15000"),
        ]);
        check(&env, &[], |c, grpc| {
            if grpc {
                assert_eq!(c.logs.endpoint, "localhost:4317");
            } else {
                assert_eq!(c.logs.endpoint, "localhost:4318");
                assert_eq!(c.logs.url_path, "/v1/logs");
            }
            assert!(!c.logs.insecure);
            // other variables are still honored
            assert_eq!(c.logs.timeout, Duration::from_secs(15));
        });
    }

    #[test]
    fn test_default_certificate() {
        check(&reader(&[]), &[], |c, grpc| {
            if grpc {
                assert_eq!(
                    c.logs.grpc_credentials,
                    Some(TransportCredentials::Tls(TlsConfig::default()))
                );
            } else {
                assert!(c.logs.tls_config.is_none());
            }
        });
    }

    #[test]
    fn test_with_certificate() {
        check(
            &reader(&[]),
            &[options::with_tls_client_config(weak_tls())],
            |c, grpc| {
                if grpc {
                    assert_eq!(
                        c.logs.grpc_credentials,
                        Some(TransportCredentials::Tls(weak_tls()))
                    );
                } else {
                    assert_eq!(c.logs.tls_config, Some(weak_tls()));
                }
            },
        );
    }

    #[test]
    fn test_environment_certificate() {
        let env = reader_with_files(
            &[("OTEL_EXPORTER_OTLP_CERTIFICATE", "cert_path")],
            &[("cert_path", WEAK_CERTIFICATE)],
        );
        check(&env, &[], |c, grpc| {
            if grpc {
                assert_eq!(
                    c.logs.grpc_credentials,
                    Some(TransportCredentials::Tls(weak_tls()))
                );
            } else {
                assert_eq!(c.logs.tls_config, Some(weak_tls()));
            }
        });
    }

    #[test]
    fn test_environment_signal_specific_certificate() {
        let env = reader_with_files(
            &[
                ("OTEL_EXPORTER_OTLP_CERTIFICATE", "overrode_by_signal_specific"),
                ("OTEL_EXPORTER_OTLP_LOGS_CERTIFICATE", "cert_path"),
            ],
            &[
                ("cert_path", WEAK_CERTIFICATE),
                ("invalid_cert", "invalid certificate file."),
            ],
        );
        check(&env, &[], |c, grpc| {
            if grpc {
                assert_eq!(
                    c.logs.grpc_credentials,
                    Some(TransportCredentials::Tls(weak_tls()))
                );
            } else {
                assert_eq!(c.logs.tls_config, Some(weak_tls()));
            }
        });
    }

    #[test]
    fn test_unreadable_certificate_is_ignored() {
        let env = reader_with_files(
            &[("OTEL_EXPORTER_OTLP_CERTIFICATE", "invalid_cert")],
            &[("invalid_cert", "invalid certificate file.")],
        );
        check(&env, &[], |c, grpc| {
            if grpc {
                assert_eq!(
                    c.logs.grpc_credentials,
                    Some(TransportCredentials::Tls(TlsConfig::default()))
                );
            } else {
                assert!(c.logs.tls_config.is_none());
            }
        });
    }

    #[test]
    fn test_environment_client_certificate() {
        let env = reader_with_files(
            &[
                ("OTEL_EXPORTER_OTLP_LOGS_CLIENT_CERTIFICATE", "client_cert"),
                ("OTEL_EXPORTER_OTLP_LOGS_CLIENT_KEY", "client_key"),
            ],
            &[
                ("client_cert", WEAK_CERTIFICATE),
                ("client_key", WEAK_PRIVATE_KEY),
            ],
        );
        check(&env, &[], |c, grpc| {
            let tls = if grpc {
                match &c.logs.grpc_credentials {
                    Some(TransportCredentials::Tls(tls)) => tls.clone(),
                    other => panic!("unexpected credentials {other:?}"),
                }
            } else {
                c.logs.tls_config.clone().unwrap()
            };
            assert!(tls.root_certificates().is_none());
            assert_eq!(
                tls.client_identity().map(|identity| identity.key()),
                Some(WEAK_PRIVATE_KEY.as_bytes())
            );
        });
    }

    #[test]
    fn test_option_certificate_overrides_environment() {
        let env = reader_with_files(
            &[("OTEL_EXPORTER_OTLP_CERTIFICATE", "cert_path")],
            &[("cert_path", WEAK_CERTIFICATE)],
        );
        check(
            &env,
            &[options::with_tls_client_config(TlsConfig::default())],
            |c, grpc| {
                if grpc {
                    assert_eq!(
                        c.logs.grpc_credentials,
                        Some(TransportCredentials::Tls(TlsConfig::default()))
                    );
                } else {
                    assert_eq!(c.logs.tls_config, Some(TlsConfig::default()));
                }
            },
        );
    }

    #[test]
    fn test_headers_precedence() {
        let h = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };

        check(
            &reader(&[]),
            &[options::with_headers(h(&[("h1", "v1")]))],
            |c, _| assert_eq!(c.logs.headers, h(&[("h1", "v1")])),
        );
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_HEADERS", "h1=v1,h2=v2")]),
            &[],
            |c, _| assert_eq!(c.logs.headers, h(&[("h1", "v1"), ("h2", "v2")])),
        );
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_HEADERS", "overrode_by_signal_specific"),
                ("OTEL_EXPORTER_OTLP_LOGS_HEADERS", "h1=v1,h2=v2"),
            ]),
            &[],
            |c, _| assert_eq!(c.logs.headers, h(&[("h1", "v1"), ("h2", "v2")])),
        );
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_HEADERS", "h1=v1,h2=v2"),
                ("OTEL_EXPORTER_OTLP_LOGS_HEADERS", "h3=v3"),
            ]),
            &[options::with_headers(h(&[("h4", "v4")]))],
            |c, _| assert_eq!(c.logs.headers, h(&[("h4", "v4")])),
        );
    }

    #[test]
    fn test_compression_precedence() {
        check(
            &reader(&[]),
            &[options::with_compression(Compression::Gzip)],
            |c, _| assert_eq!(c.logs.compression, Compression::Gzip),
        );
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip")]),
            &[],
            |c, _| assert_eq!(c.logs.compression, Compression::Gzip),
        );
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip"),
                ("OTEL_EXPORTER_OTLP_LOGS_COMPRESSION", "none"),
            ]),
            &[],
            |c, _| assert_eq!(c.logs.compression, Compression::None),
        );
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_LOGS_COMPRESSION", "gzip")]),
            &[options::with_compression(Compression::None)],
            |c, _| assert_eq!(c.logs.compression, Compression::None),
        );
    }

    #[test]
    fn test_timeout_precedence() {
        check(
            &reader(&[]),
            &[options::with_timeout(Duration::from_secs(5))],
            |c, _| assert_eq!(c.logs.timeout, Duration::from_secs(5)),
        );
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_TIMEOUT", "15000")]),
            &[],
            |c, _| assert_eq!(c.logs.timeout, Duration::from_secs(15)),
        );
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_TIMEOUT", "15000"),
                ("OTEL_EXPORTER_OTLP_LOGS_TIMEOUT", "27000"),
            ]),
            &[],
            |c, _| assert_eq!(c.logs.timeout, Duration::from_secs(27)),
        );
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_TIMEOUT", "15000"),
                ("OTEL_EXPORTER_OTLP_LOGS_TIMEOUT", "27000"),
            ]),
            &[options::with_timeout(Duration::from_secs(5))],
            |c, _| assert_eq!(c.logs.timeout, Duration::from_secs(5)),
        );
        // malformed per-signal value leaves the generic one in place
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_TIMEOUT", "15000"),
                ("OTEL_EXPORTER_OTLP_LOGS_TIMEOUT", "27s"),
            ]),
            &[],
            |c, _| assert_eq!(c.logs.timeout, Duration::from_secs(15)),
        );
    }

    #[test]
    fn test_insecure_precedence() {
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_INSECURE", "true")]),
            &[],
            |c, _| assert!(c.logs.insecure),
        );
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_INSECURE", "true"),
                ("OTEL_EXPORTER_OTLP_LOGS_INSECURE", "FALSE"),
            ]),
            &[],
            |c, _| assert!(!c.logs.insecure),
        );
        // the explicit flag overrides the scheme of the endpoint
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector"),
                ("OTEL_EXPORTER_OTLP_INSECURE", "false"),
            ]),
            &[],
            |c, _| assert!(!c.logs.insecure),
        );
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_LOGS_INSECURE", "true")]),
            &[options::with_secure()],
            |c, _| assert!(!c.logs.insecure),
        );
    }

    #[test]
    fn test_protocol_precedence() {
        check(
            &reader(&[
                ("OTEL_EXPORTER_OTLP_PROTOCOL", "grpc"),
                ("OTEL_EXPORTER_OTLP_LOGS_PROTOCOL", "HTTP/JSON"),
            ]),
            &[],
            |c, _| assert_eq!(c.logs.protocol, crate::Protocol::HttpJson),
        );
        check(
            &reader(&[("OTEL_EXPORTER_OTLP_PROTOCOL", "bogus")]),
            &[],
            |c, _| assert_eq!(c.logs.protocol, crate::Protocol::HttpBinary),
        );
    }

    #[test]
    fn test_with_url_path_is_cleaned_once() {
        let env = reader(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "https://collector/base")]);
        let config = Config::new_http(&env, &[options::with_url_path(" custom//logs/ ")]);
        assert_eq!(config.logs.url_path, "/custom/logs");

        let config = Config::new_http(&env, &[options::with_url_path("a/..")]);
        assert_eq!(config.logs.url_path, DEFAULT_LOGS_PATH);
    }

    #[test]
    fn test_grpc_dial_options() {
        let config = Config::new_grpc(&reader(&[]), &[]);
        assert_eq!(
            config.dial_options,
            vec![
                DialOption::UserAgent(crate::exporter::user_agent()),
                DialOption::TransportCredentials(TransportCredentials::Tls(TlsConfig::default())),
            ]
        );

        let config = Config::new_grpc(
            &reader(&[("OTEL_EXPORTER_OTLP_COMPRESSION", "gzip")]),
            &[
                options::with_insecure(),
                options::with_service_config(r#"{"loadBalancingConfig":[]}"#),
                options::with_reconnection_period(Duration::from_secs(3)),
            ],
        );
        assert_eq!(
            config.dial_options,
            vec![
                DialOption::UserAgent(crate::exporter::user_agent()),
                DialOption::DefaultServiceConfig(r#"{"loadBalancingConfig":[]}"#.to_string()),
                DialOption::TransportCredentials(TransportCredentials::Insecure),
                DialOption::DefaultCompressor(Compression::Gzip),
                DialOption::ConnectParams {
                    backoff: BackoffConfig::default(),
                    min_connect_timeout: Duration::from_secs(3),
                },
            ]
        );
        // insecure without explicit credentials leaves the credentials unset
        assert!(config.logs.grpc_credentials.is_none());
    }

    #[test]
    fn test_grpc_explicit_credentials_win_over_insecure() {
        let config = Config::new_grpc(
            &reader(&[("OTEL_EXPORTER_OTLP_INSECURE", "true")]),
            &[options::with_tls_client_config(weak_tls())],
        );
        assert!(config.logs.insecure);
        assert_eq!(
            config.logs.grpc_credentials,
            Some(TransportCredentials::Tls(weak_tls()))
        );
        let credentials = config
            .dial_options
            .iter()
            .filter_map(|option| match option {
                DialOption::TransportCredentials(credentials) => Some(credentials),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(credentials, vec![&TransportCredentials::Tls(weak_tls())]);
    }

    #[test]
    fn test_grpc_user_dial_options_are_kept_once() {
        let config = Config::new_grpc(
            &reader(&[]),
            &[options::with_dial_option(DialOption::UserAgent(
                "custom-agent".to_string(),
            ))],
        );
        let user_agents = config
            .dial_options
            .iter()
            .filter(|option| matches!(option, DialOption::UserAgent(_)))
            .count();
        assert_eq!(user_agents, 2);
        assert_eq!(config.dial_options.len(), 3);
    }

    #[test]
    fn test_from_process_env() {
        crate::exporter::tests::run_env_test(
            vec![
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://from.env:1234"),
                ("OTEL_EXPORTER_OTLP_LOGS_TIMEOUT", "2500"),
            ],
            || {
                let config = Config::http_from_env(&[]);
                assert_eq!(config.logs.endpoint, "from.env:1234");
                assert_eq!(config.logs.url_path, "/v1/logs");
                assert_eq!(config.logs.timeout, Duration::from_millis(2500));
                assert!(config.logs.insecure);

                let config = Config::grpc_from_env(&[]);
                assert_eq!(config.logs.endpoint, "from.env:1234");
            },
        );
    }
}

//! Environment layer of the exporter configuration.
//!
//! Variables are read from a [`ConfigSource`] through an
//! [`EnvOptionsReader`], which turns them into [`ExporterOption`]s. The
//! reader is passed to the config builders explicitly; nothing here touches
//! global state besides the [`ProcessEnv`] source itself.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::otel_warn;
use url::Url;

use super::options::{self, ExporterOption};
use super::{join_path, DEFAULT_LOGS_PATH};
use crate::exporter::{parse_header_string, Compression, Error, Protocol};
use crate::tls::{ClientIdentity, TlsConfig};

/// Default prefix of the variables read by an [`EnvOptionsReader`].
pub const DEFAULT_NAMESPACE: &str = "OTEL_EXPORTER_OTLP";

/// Where environment values and the files they point at are read from.
pub trait ConfigSource: fmt::Debug + Send + Sync {
    /// Value of the variable `key`, if set.
    fn get_env(&self, key: &str) -> Option<String>;
    /// Content of the file at `path`.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The environment and file system of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get_env(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

#[derive(Debug, Default)]
struct MapSource {
    env: HashMap<String, String>,
    files: HashMap<PathBuf, Vec<u8>>,
}

impl ConfigSource for MapSource {
    fn get_env(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }
}

/// Reads the `<namespace>_*` and `<namespace>_LOGS_*` variables of a
/// [`ConfigSource`].
#[derive(Clone, Debug)]
pub struct EnvOptionsReader {
    namespace: String,
    source: Arc<dyn ConfigSource>,
}

impl Default for EnvOptionsReader {
    fn default() -> Self {
        EnvOptionsReader::new(DEFAULT_NAMESPACE, ProcessEnv)
    }
}

impl EnvOptionsReader {
    /// Read variables prefixed with `namespace` from `source`.
    pub fn new(namespace: impl Into<String>, source: impl ConfigSource + 'static) -> Self {
        EnvOptionsReader {
            namespace: namespace.into(),
            source: Arc::new(source),
        }
    }

    /// Read variables from an in-memory environment. `files` maps the paths
    /// that certificate variables may point at to their content.
    pub fn from_map(
        env: impl IntoIterator<Item = (String, String)>,
        files: impl IntoIterator<Item = (String, Vec<u8>)>,
    ) -> Self {
        EnvOptionsReader::new(
            DEFAULT_NAMESPACE,
            MapSource {
                env: env.into_iter().collect(),
                files: files
                    .into_iter()
                    .map(|(path, content)| (PathBuf::from(path), content))
                    .collect(),
            },
        )
    }

    /// Prefix of the variables this reader looks at.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Protocol selected by `<namespace>_LOGS_PROTOCOL` or
    /// `<namespace>_PROTOCOL`, in that order of preference, or `default`.
    pub fn protocol(&self, default: Protocol) -> Protocol {
        self.get("LOGS_PROTOCOL")
            .or_else(|| self.get("PROTOCOL"))
            .map(|value| Protocol::from_env_value(&value))
            .unwrap_or(default)
    }

    /// Options derived from the environment, in application order.
    ///
    /// Malformed values are logged and skipped.
    pub fn options(&self) -> Vec<ExporterOption> {
        let mut state = EnvState::default();

        for row in ENV_ROWS {
            let Some(values) = row
                .keys
                .iter()
                .map(|key| self.get(key))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            if let Err(err) = (row.parse)(self, &values, &mut state) {
                otel_warn!(
                    name: "EnvOptionsReader.InvalidValue",
                    key = self.key(row.keys[0]),
                    reason = format!("{err}")
                );
            }
        }

        if !state.tls.is_empty() {
            state.options.push(options::with_tls_client_config(state.tls));
        }
        state.options
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.namespace, suffix)
    }

    /// Trimmed value of `<namespace>_<suffix>`; empty values count as unset.
    fn get(&self, suffix: &str) -> Option<String> {
        self.source
            .get_env(&self.key(suffix))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, Error> {
        self.source
            .read_file(Path::new(path))
            .map_err(|err| Error::InvalidCredentials(format!("{path}: {err}")))
    }
}

#[derive(Default)]
struct EnvState {
    options: Vec<ExporterOption>,
    tls: TlsConfig,
}

type RowParser = fn(&EnvOptionsReader, &[String], &mut EnvState) -> Result<(), Error>;

/// A row is evaluated when all of its keys are set.
struct EnvRow {
    keys: &'static [&'static str],
    parse: RowParser,
}

// per-signal rows follow their generic row so they win in the fold
const ENV_ROWS: &[EnvRow] = &[
    EnvRow {
        keys: &["ENDPOINT"],
        parse: parse_generic_endpoint,
    },
    EnvRow {
        keys: &["LOGS_ENDPOINT"],
        parse: parse_signal_endpoint,
    },
    EnvRow {
        keys: &["PROTOCOL"],
        parse: parse_protocol,
    },
    EnvRow {
        keys: &["LOGS_PROTOCOL"],
        parse: parse_protocol,
    },
    EnvRow {
        keys: &["CERTIFICATE"],
        parse: parse_root_certificate,
    },
    EnvRow {
        keys: &["LOGS_CERTIFICATE"],
        parse: parse_root_certificate,
    },
    EnvRow {
        keys: &["CLIENT_CERTIFICATE", "CLIENT_KEY"],
        parse: parse_client_identity,
    },
    EnvRow {
        keys: &["LOGS_CLIENT_CERTIFICATE", "LOGS_CLIENT_KEY"],
        parse: parse_client_identity,
    },
    EnvRow {
        keys: &["INSECURE"],
        parse: parse_insecure,
    },
    EnvRow {
        keys: &["LOGS_INSECURE"],
        parse: parse_insecure,
    },
    EnvRow {
        keys: &["HEADERS"],
        parse: parse_headers,
    },
    EnvRow {
        keys: &["LOGS_HEADERS"],
        parse: parse_headers,
    },
    EnvRow {
        keys: &["COMPRESSION"],
        parse: parse_compression,
    },
    EnvRow {
        keys: &["LOGS_COMPRESSION"],
        parse: parse_compression,
    },
    EnvRow {
        keys: &["TIMEOUT"],
        parse: parse_timeout,
    },
    EnvRow {
        keys: &["LOGS_TIMEOUT"],
        parse: parse_timeout,
    },
];

struct ParsedEndpoint {
    insecure: bool,
    host: String,
    path: String,
}

fn parse_endpoint_url(value: &str) -> Result<ParsedEndpoint, Error> {
    let url =
        Url::parse(value).map_err(|err| Error::InvalidUri(value.to_string(), err.to_string()))?;
    let unix = url.scheme() == "unix";
    // unix socket URLs carry the socket path and no host
    let host = match url.host_str().filter(|host| !host.is_empty()) {
        Some(host) => host,
        None if unix => "",
        None => {
            return Err(Error::InvalidUri(
                value.to_string(),
                "missing host".to_string(),
            ))
        }
    };
    // `Url` hides a port equal to the scheme's default, keep it when it was written
    let port = match url.port() {
        Some(port) => Some(port),
        None if has_explicit_port(value) => url.port_or_known_default(),
        None => None,
    };
    let host = match port {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(ParsedEndpoint {
        insecure: unix || url.scheme() == "http",
        host,
        path: url.path().to_string(),
    })
}

fn has_explicit_port(value: &str) -> bool {
    let authority = value
        .split_once("://")
        .map_or("", |(_, rest)| rest)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);
    // the colons of an IPv6 literal sit inside the brackets
    let after_host = host_port
        .rsplit_once(']')
        .map_or(host_port, |(_, after)| after);
    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

fn push_endpoint(state: &mut EnvState, endpoint: ParsedEndpoint, http_path: String) {
    let grpc_endpoint = join_path(&[&endpoint.host, &endpoint.path]);
    let http_host = endpoint.host;

    state.options.push(if endpoint.insecure {
        options::with_insecure()
    } else {
        options::with_secure()
    });
    state.options.push(ExporterOption::split(
        move |mut config| {
            config.logs.endpoint = http_host.clone();
            config.logs.url_path = http_path.clone();
            config
        },
        move |mut config| {
            config.logs.endpoint = grpc_endpoint.clone();
            config
        },
    ));
}

fn parse_generic_endpoint(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let endpoint = parse_endpoint_url(&values[0])?;
    let http_path = join_path(&[&endpoint.path, DEFAULT_LOGS_PATH]);
    push_endpoint(state, endpoint, http_path);
    Ok(())
}

fn parse_signal_endpoint(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let endpoint = parse_endpoint_url(&values[0])?;
    let http_path = if endpoint.path.is_empty() {
        "/".to_string()
    } else {
        endpoint.path.clone()
    };
    push_endpoint(state, endpoint, http_path);
    Ok(())
}

fn parse_protocol(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    state
        .options
        .push(options::with_protocol(Protocol::from_env_value(&values[0])));
    Ok(())
}

fn parse_root_certificate(
    reader: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let pem = reader.read_file(&values[0])?;
    state.tls = state.tls.clone().with_root_certificates_pem(pem)?;
    Ok(())
}

fn parse_client_identity(
    reader: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let certificate = reader.read_file(&values[0])?;
    let key = reader.read_file(&values[1])?;
    let identity = ClientIdentity::from_pem(certificate, key)?;
    state.tls = state.tls.clone().with_client_identity(identity);
    Ok(())
}

fn parse_insecure(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let value = &values[0];
    let option = if value.eq_ignore_ascii_case("true") {
        options::with_insecure()
    } else if value.eq_ignore_ascii_case("false") {
        options::with_secure()
    } else {
        return Err(Error::InvalidConfig {
            name: "insecure".to_string(),
            reason: format!("expected true or false, got {value:?}"),
        });
    };
    state.options.push(option);
    Ok(())
}

fn parse_headers(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let headers = parse_header_string(&values[0]).collect();
    state.options.push(options::with_headers(headers));
    Ok(())
}

fn parse_compression(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    state
        .options
        .push(options::with_compression(Compression::from_env_value(
            &values[0],
        )));
    Ok(())
}

fn parse_timeout(
    _: &EnvOptionsReader,
    values: &[String],
    state: &mut EnvState,
) -> Result<(), Error> {
    let millis = values[0]
        .parse::<u64>()
        .map_err(|err| Error::InvalidConfig {
            name: "timeout".to_string(),
            reason: format!("{:?} is not a number of milliseconds: {err}", values[0]),
        })?;
    state
        .options
        .push(options::with_timeout(Duration::from_millis(millis)));
    Ok(())
}

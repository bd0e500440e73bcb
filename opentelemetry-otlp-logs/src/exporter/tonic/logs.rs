use core::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use opentelemetry::{otel_debug, otel_warn};
use opentelemetry_proto::tonic::collector::logs::v1::{
    logs_service_client::LogsServiceClient, ExportLogsServiceRequest,
};
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use tonic::{metadata::MetadataMap, transport::Channel, Request};

use super::build_channel;
use crate::exporter::config::Config;
use crate::{Context, Error, LogsClient};

pub(crate) struct TonicLogsClient {
    inner: Mutex<Option<ClientInner>>,
    timeout: Duration,
}

struct ClientInner {
    client: LogsServiceClient<Channel>,
    metadata: MetadataMap,
}

impl fmt::Debug for TonicLogsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TonicLogsClient")
    }
}

impl TonicLogsClient {
    pub(crate) fn new(config: Config) -> Result<Self, Error> {
        let channel = build_channel(config)?;

        let mut client = LogsServiceClient::new(channel.channel);
        if let Some(compression) = channel.compression {
            client = client
                .send_compressed(compression)
                .accept_compressed(compression);
        }

        otel_debug!(name: "TonicLogsClientBuilt");

        Ok(TonicLogsClient {
            inner: Mutex::new(Some(ClientInner {
                client,
                metadata: channel.metadata,
            })),
            timeout: channel.timeout,
        })
    }

    async fn export(&self, logs: Vec<ResourceLogs>) -> Result<(), Error> {
        let (mut client, metadata) = self
            .inner
            .lock()
            .map_err(|e| Error::InternalFailure(format!("Failed to acquire lock: {e:?}")))
            .and_then(|inner| match &*inner {
                Some(inner) => Ok((inner.client.clone(), inner.metadata.clone())),
                None => Err(Error::AlreadyShutdown),
            })?;

        let mut request = Request::new(ExportLogsServiceRequest {
            resource_logs: logs,
        });
        *request.metadata_mut() = metadata;
        request.set_timeout(self.timeout);

        otel_debug!(name: "TonicLogsClient.ExportStarted");

        match client.export(request).await {
            Ok(response) => {
                otel_debug!(name: "TonicLogsClient.ExportSucceeded");

                // partial success is logged, not retried
                if let Some(partial_success) = response.into_inner().partial_success {
                    if partial_success.rejected_log_records > 0
                        || !partial_success.error_message.is_empty()
                    {
                        otel_warn!(
                            name: "TonicLogsClient.PartialSuccess",
                            rejected_log_records = partial_success.rejected_log_records,
                            error_message = partial_success.error_message.as_str(),
                        );
                    }
                }
                Ok(())
            }
            Err(status) => {
                otel_warn!(
                    name: "TonicLogsClient.ExportFailed",
                    grpc_code = format!("{:?}", status.code())
                );
                // the message may carry credentials, keep it at debug level
                otel_debug!(
                    name: "TonicLogsClient.ExportFailedDetails",
                    grpc_message = status.message()
                );
                Err(status.into())
            }
        }
    }
}

#[async_trait]
impl LogsClient for TonicLogsClient {
    async fn upload_logs(&self, ctx: &Context, logs: Vec<ResourceLogs>) -> Result<(), Error> {
        ctx.run(self.export(logs)).await
    }

    async fn stop(&self, _ctx: &Context) -> Result<(), Error> {
        self.inner
            .lock()
            .map_err(|e| Error::InternalFailure(format!("Failed to acquire lock: {e}")))?
            .take();
        otel_debug!(name: "TonicLogsClient.Stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::TonicLogsClient;
    use crate::exporter::config::envconfig::EnvOptionsReader;
    use crate::exporter::config::{options, Config};
    use crate::{Context, ContextError, Error, LogsClient};

    /// A port that was bound and released, so connections to it are refused.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn unreachable_client() -> TonicLogsClient {
        TonicLogsClient::new(Config::new_grpc(
            &EnvOptionsReader::from_map(std::iter::empty(), std::iter::empty()),
            &[
                options::with_endpoint(format!("127.0.0.1:{}", closed_port())),
                options::with_insecure(),
                options::with_timeout(Duration::from_secs(2)),
            ],
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_upload_to_unreachable_collector_fails() {
        let client = unreachable_client();
        let res = client.upload_logs(&Context::background(), vec![]).await;
        assert!(matches!(res, Err(Error::ExportFailed { .. })));
    }

    #[tokio::test]
    async fn test_upload_after_stop() {
        let client = unreachable_client();
        let ctx = Context::background();

        client.stop(&ctx).await.unwrap();
        client.stop(&ctx).await.unwrap();
        assert_eq!(
            client.upload_logs(&ctx, vec![]).await,
            Err(Error::AlreadyShutdown)
        );
    }

    #[tokio::test]
    async fn test_upload_honors_context_deadline() {
        let client = unreachable_client();
        let ctx = Context::background().with_timeout(Duration::ZERO);

        assert_eq!(
            client.upload_logs(&ctx, vec![]).await,
            Err(Error::Context(ContextError::DeadlineExceeded))
        );
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use http::{header::CONTENT_TYPE, Method};
use opentelemetry::otel_debug;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;

use super::HttpLogsClient;
use crate::{Context, Error, LogsClient};

impl HttpLogsClient {
    async fn export(&self, logs: Vec<ResourceLogs>) -> Result<(), Error> {
        let client = self
            .client
            .lock()
            .map_err(|e| Error::InternalFailure(format!("Mutex lock failed: {e}")))
            .and_then(|g| match &*g {
                Some(client) => Ok(Arc::clone(client)),
                _ => Err(Error::AlreadyShutdown),
            })?;

        let (body, content_type) = self.build_logs_export_body(logs)?;
        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri(&self.collector_endpoint)
            .header(CONTENT_TYPE, content_type)
            .body(body.into())?;

        for (k, v) in &self.headers {
            request.headers_mut().insert(k.clone(), v.clone());
        }

        let request_uri = request.uri().to_string();
        otel_debug!(name: "HttpLogsClient.CallingExport", uri = request_uri.as_str());
        let response = tokio::time::timeout(self.timeout, client.send_bytes(request))
            .await
            .map_err(|_| {
                Error::RequestFailed(format!(
                    "no response within {}ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ExportFailed {
                status: response.status().as_u16().to_string(),
                message: format!(
                    "Url: {}, Response: {}",
                    request_uri,
                    String::from_utf8_lossy(response.body())
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl LogsClient for HttpLogsClient {
    async fn upload_logs(&self, ctx: &Context, logs: Vec<ResourceLogs>) -> Result<(), Error> {
        ctx.run(self.export(logs)).await
    }

    async fn stop(&self, _ctx: &Context) -> Result<(), Error> {
        self.client
            .lock()
            .map_err(|e| Error::InternalFailure(format!("Failed to acquire lock: {e}")))?
            .take();
        otel_debug!(name: "HttpLogsClient.Stopped");
        Ok(())
    }
}

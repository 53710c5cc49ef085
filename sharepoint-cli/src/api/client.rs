//! SharePoint / Graph client
//!
//! Owns the transport, the descriptor tables and the connection settings.
//! Queries and CSOM batches are built without I/O; only `DeferredQuery`
//! consumption and `execute_batch` touch the network.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::csom::{CsomBatch, CsomResponse};
use super::error::{Result, TransportError};
use super::metadata::DescriptorProvider;
use super::query::{DeferredQuery, Dialect, Query};
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_APPLICATION_NAME: &str = "sharepoint-cli";

/// Connection settings for both REST dialects and CSOM
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site collection URL, e.g. `https://contoso.sharepoint.com/sites/dev`
    pub site_url: String,
    pub graph_url: String,
    pub sharepoint_token: Option<String>,
    pub graph_token: Option<String>,
    pub timeout: Duration,
    /// Reported in the CSOM envelope's `ApplicationName`
    pub application_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            sharepoint_token: None,
            graph_token: None,
            timeout: Duration::from_secs(30),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Root that collection paths are appended to
    pub fn base_url(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::SharePointRest => format!("{}/_api", self.site_url.trim_end_matches('/')),
            Dialect::Graph => self.graph_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn token(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::SharePointRest => self.sharepoint_token.as_deref(),
            Dialect::Graph => self.graph_token.as_deref(),
        }
    }

    pub fn process_query_url(&self) -> String {
        format!("{}/ProcessQuery", self.base_url(Dialect::SharePointRest))
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_url = url.into();
        self
    }

    pub fn graph_url(mut self, url: impl Into<String>) -> Self {
        self.config.graph_url = url.into();
        self
    }

    pub fn sharepoint_token(mut self, token: impl Into<String>) -> Self {
        self.config.sharepoint_token = Some(token.into());
        self
    }

    pub fn graph_token(mut self, token: impl Into<String>) -> Self {
        self.config.graph_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = name.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by a client and every query it hands out
pub(crate) struct ClientInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) descriptors: Arc<dyn DescriptorProvider>,
    pub(crate) config: ClientConfig,
}

impl ClientInner {
    /// Attach credentials, send, and turn non-success statuses into errors
    pub(crate) async fn send(&self, dialect: Dialect, mut request: HttpRequest) -> Result<HttpResponse> {
        if let Some(token) = self.config.token(dialect) {
            request = request.header("Authorization", format!("Bearer {}", token));
        } else {
            log::warn!("No {} access token configured, sending anonymous request", dialect);
        }

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            log::debug!("{} request failed with HTTP {}", dialect, response.status);
            return Err(TransportError::status(response.status, response.text()).into());
        }
        Ok(response)
    }
}

#[derive(Clone)]
pub struct SharePointClient {
    inner: Arc<ClientInner>,
}

impl SharePointClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        descriptors: Arc<dyn DescriptorProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                descriptors,
                config,
            }),
        }
    }

    /// Client over the default `reqwest` transport
    pub fn with_reqwest(config: ClientConfig, descriptors: Arc<dyn DescriptorProvider>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(config, Arc::new(transport), descriptors))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn descriptors(&self) -> &dyn DescriptorProvider {
        self.inner.descriptors.as_ref()
    }

    /// Start a query over `model`'s collection. Nothing is sent until the
    /// query is consumed.
    pub fn query<T: DeserializeOwned>(&self, model: &str, dialect: Dialect) -> DeferredQuery<T> {
        DeferredQuery {
            client: Arc::clone(&self.inner),
            model: model.to_string(),
            dialect,
            query: Query::new(),
            _marker: PhantomData,
        }
    }

    /// Fresh batch with its own id space
    pub fn batch(&self) -> CsomBatch {
        CsomBatch::new()
    }

    /// Serialize, POST and correlate one batch
    pub async fn execute_batch(&self, batch: CsomBatch) -> Result<CsomResponse> {
        let config = &self.inner.config;
        let body = batch.to_xml(&config.application_name)?;
        log::info!("Executing CSOM batch with {} entries", batch.len());

        let request = HttpRequest::post(config.process_query_url(), body)
            .header("Content-Type", "text/xml")
            .header("Accept", "application/json");
        let response = self.inner.send(Dialect::SharePointRest, request).await?;
        CsomResponse::parse(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Error;
    use crate::api::csom::ObjectRef;
    use crate::api::metadata::DescriptorRegistry;
    use crate::api::transport::mock::MockTransport;

    fn client(mock: &MockTransport) -> SharePointClient {
        let config = ClientConfig::builder()
            .site_url("https://contoso.sharepoint.com/sites/dev/")
            .sharepoint_token("sp-token")
            .application_name("tests")
            .build();
        SharePointClient::new(
            config,
            Arc::new(mock.clone()),
            Arc::new(DescriptorRegistry::builtin()),
        )
    }

    #[test]
    fn test_config_urls() {
        let config = ClientConfig::builder()
            .site_url("https://contoso.sharepoint.com/sites/dev/")
            .graph_url("https://graph.microsoft.com/beta/")
            .build();
        assert_eq!(
            config.base_url(Dialect::SharePointRest),
            "https://contoso.sharepoint.com/sites/dev/_api"
        );
        assert_eq!(config.base_url(Dialect::Graph), "https://graph.microsoft.com/beta");
        assert_eq!(
            config.process_query_url(),
            "https://contoso.sharepoint.com/sites/dev/_api/ProcessQuery"
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_execute_batch_posts_envelope_and_correlates() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            r#"[{"SchemaVersion":"15.0.0.0","LibraryVersion":"16.0.0.0","ErrorInfo":null},5,{"Title":"Dev site"}]"#,
        );
        let client = client(&mock);

        let mut batch = client.batch();
        let web = batch.current_web();
        let query = batch.query_properties(web, &["Title"]);
        assert_eq!(query.id(), 5);

        let response = client.execute_batch(batch).await.unwrap();
        assert_eq!(response.result(query).unwrap()["Title"], "Dev site");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.url, "https://contoso.sharepoint.com/sites/dev/_api/ProcessQuery");
        assert_eq!(request.header_value("Authorization"), Some("Bearer sp-token"));
        assert_eq!(request.header_value("Content-Type"), Some("text/xml"));
        assert!(request.body.as_deref().unwrap().contains(r#"ApplicationName="tests""#));
    }

    #[tokio::test]
    async fn test_encoding_error_prevents_request() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let mut batch = client.batch();
        batch.set_property(ObjectRef::from_id(3), "Title", "x");

        let err = client.execute_batch(batch).await.unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_http_failure_keeps_status_and_body() {
        let mock = MockTransport::new();
        mock.respond(403, "Access denied");
        let client = client(&mock);
        let mut batch = client.batch();
        batch.current_web();

        match client.execute_batch(batch).await {
            Err(Error::Transport(e)) => {
                assert_eq!(e.status, Some(403));
                assert_eq!(e.body.as_deref(), Some("Access denied"));
            }
            other => panic!("expected transport error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_server_fault_surfaces_from_batch() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            r#"[{"SchemaVersion":"15.0.0.0","ErrorInfo":{"ErrorMessage":"Access denied.","ErrorCode":-2147024891,"ErrorTypeName":"System.UnauthorizedAccessException"}}]"#,
        );
        let client = client(&mock);
        let mut batch = client.batch();
        batch.current_web();

        let err = client.execute_batch(batch).await.unwrap_err();
        assert!(matches!(err, Error::ServerFault(ref f) if f.message == "Access denied."));
    }
}

//! PlantUML server client
//!
//! This module provides a blocking client for a
//! [PlantUML server](https://plantuml.com/server). Diagrams travel inside the
//! request path as an [`EncodedPayload`].

use std::time::Duration;

use reqwest::blocking::Client;

use crate::encoding::EncodedPayload;
use crate::error::{DiagramError, Result};
use crate::renderer::{DiagramRenderer, RenderError, RenderResult};
use crate::settings::ServerSettings;
use crate::types::OutputFormat;

/// Client for rendering diagrams via a PlantUML server
#[derive(Debug, Clone)]
pub struct PlantUmlClient {
    /// Base URL of the server, without trailing slash
    base_url: String,
    /// HTTP client
    client: Client,
    /// Request timeout
    timeout: Duration,
}

impl PlantUmlClient {
    /// Create a client from server settings
    pub fn new(settings: &ServerSettings) -> Result<Self> {
        Self::with_url(&settings.url, settings.timeout())
    }

    /// Create a client for a custom server URL and timeout
    pub fn with_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiagramError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate the request URL for a payload (without rendering)
    pub fn diagram_url(&self, payload: &EncodedPayload, format: OutputFormat) -> String {
        format!("{}/{}/{}", self.base_url, format.server_name(), payload)
    }

    fn classify(&self, err: reqwest::Error) -> RenderError {
        if err.is_timeout() {
            RenderError::Timeout(self.timeout)
        } else {
            RenderError::Transport(err.to_string())
        }
    }
}

impl DiagramRenderer for PlantUmlClient {
    fn name(&self) -> &'static str {
        "plantuml-server"
    }

    fn render(&self, payload: &EncodedPayload, format: OutputFormat) -> RenderResult<Vec<u8>> {
        let url = self.diagram_url(payload, format);
        log::debug!("GET {} ({} byte token)", self.base_url, payload.as_str().len());

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(RenderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().map_err(|e| self.classify(e))?;
        if body.is_empty() {
            return Err(RenderError::UnexpectedResponse(
                "server returned an empty body".to_string(),
            ));
        }

        log::debug!("Received {} bytes of {}", body.len(), format.mime_type());
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_payload;
    use crate::settings::DEFAULT_SERVER_URL;

    #[test]
    fn test_client_default_settings() {
        let client = PlantUmlClient::new(&ServerSettings::default()).unwrap();
        assert_eq!(client.base_url(), DEFAULT_SERVER_URL);
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_client_custom_url() {
        let client =
            PlantUmlClient::with_url("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_diagram_url() {
        let client = PlantUmlClient::new(&ServerSettings::default()).unwrap();
        let payload = encode_payload("@startuml\nA -> B\n@enduml").unwrap();
        let url = client.diagram_url(&payload, OutputFormat::Png);

        assert_eq!(
            url,
            format!("http://www.plantuml.com/plantuml/png/{}", payload.as_str())
        );
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        // Port 1 on loopback is not listening
        let client =
            PlantUmlClient::with_url("http://127.0.0.1:1/plantuml", Duration::from_secs(5))
                .unwrap();
        let payload = encode_payload("@startuml\nA -> B\n@enduml").unwrap();

        let err = client.render(&payload, OutputFormat::Png).unwrap_err();
        // A configured HTTP proxy turns the refusal into a gateway error
        assert!(
            matches!(err, RenderError::Transport(_) | RenderError::Status { .. }),
            "got {err:?}"
        );
        assert!(err.is_transient());
    }

    // Requires network access to plantuml.com
    #[test]
    #[ignore]
    fn test_render_public_server() {
        let client = PlantUmlClient::new(&ServerSettings::default()).unwrap();
        let payload = encode_payload("@startuml\nAlice -> Bob: Hello\n@enduml\n").unwrap();

        match client.render(&payload, OutputFormat::Png) {
            Ok(png) => assert!(!png.is_empty()),
            Err(e) => eprintln!("PlantUML test skipped (network error): {}", e),
        }
    }
}

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::capability::{instruction_argument, Capability, CapabilityOutput};

pub const IMAGE_HOST: &str = "https://pollinations.ai";

/// Generates an image for a prompt and returns its URL
pub struct ImageAgent {
    client: Client,
    host: String,
}

impl ImageAgent {
    pub fn new<H: Into<String>>(host: H, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.into(),
        })
    }

    pub fn image_url(&self, prompt: &str) -> String {
        format!(
            "{}/p/{}",
            self.host.trim_end_matches('/'),
            urlencoding::encode(prompt)
        )
    }
}

#[async_trait]
impl Capability for ImageAgent {
    async fn invoke(&self, arguments: Value) -> Result<CapabilityOutput> {
        let prompt = instruction_argument(&arguments)?;
        let url = self.image_url(&prompt);

        // The image is rendered on first request, so fetching it confirms the URL works
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Image generation failed: {}", response.status());
        }

        Ok(CapabilityOutput::Urls(vec![url]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_image_url_encodes_prompt() {
        let agent = ImageAgent::new("https://pollinations.ai/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            agent.image_url("fresh bread & jam"),
            "https://pollinations.ai/p/fresh%20bread%20%26%20jam"
        );
    }

    #[tokio::test]
    async fn test_invoke_returns_url_after_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/croissant"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
            .expect(1)
            .mount(&server)
            .await;
        let agent = ImageAgent::new(server.uri(), Duration::from_secs(5)).unwrap();

        let output = agent.invoke(json!({"instruction": "croissant"})).await.unwrap();

        assert_eq!(
            output,
            CapabilityOutput::Urls(vec![format!("{}/p/croissant", server.uri())])
        );
    }

    #[tokio::test]
    async fn test_invoke_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let agent = ImageAgent::new(server.uri(), Duration::from_secs(5)).unwrap();

        let err = agent.invoke(json!({"instruction": "cake"})).await.unwrap_err();
        assert!(err.to_string().starts_with("Image generation failed: 502"));
    }
}

use async_trait::async_trait;
use reqwest::{multipart, Client};
use std::time::Duration;

use super::{NotifyError, Notifier};

/// LINE Notify style push client: bearer-token authenticated, form-encoded POSTs.
#[derive(Clone)]
pub struct LineNotifyClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl LineNotifyClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, NotifyError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// Send an image with an optional message.
    pub async fn send_file(
        &self,
        name: &str,
        image: Vec<u8>,
        message: Option<&str>,
    ) -> Result<(), NotifyError> {
        let part = multipart::Part::bytes(image).file_name(name.to_string());
        let mut form = multipart::Form::new().part("imageFile", part);
        if let Some(message) = message {
            form = form.text("message", message.to_string());
        }

        let response = self
            .http_client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<(), NotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for LineNotifyClient {
    #[tracing::instrument(skip(self, message))]
    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .form(&[("message", message)])
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        Self::check(response).await?;
        tracing::debug!("Notification delivered");
        Ok(())
    }
}

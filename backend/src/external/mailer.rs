//! Transactional email client
//!
//! Thin client over the email provider's send endpoint. Callers treat every
//! send as best-effort: a failed notification is logged, never propagated
//! into the flow that triggered it.

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Transactional email API client
#[derive(Clone)]
pub struct MailerClient {
    client: Client,
    api_endpoint: String,
    api_key: String,
    from_address: String,
}

/// Send request body
#[derive(Debug, Serialize)]
struct SendRequest {
    from: String,
    to: String,
    subject: String,
    text: String,
}

/// Provider error body
#[derive(Debug, Deserialize)]
struct SendErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

impl MailerClient {
    /// Create a new MailerClient
    pub fn new(api_endpoint: String, api_key: String, from_address: String) -> Self {
        Self {
            client: Client::new(),
            api_endpoint,
            api_key,
            from_address,
        }
    }

    /// Send a plain-text email
    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), String> {
        let request = SendRequest {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        };

        let response = self
            .client
            .post(&self.api_endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to send email: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error: SendErrorResponse = response.json().await.unwrap_or(SendErrorResponse {
                message: Some("Unknown error".to_string()),
            });
            Err(error.message.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}

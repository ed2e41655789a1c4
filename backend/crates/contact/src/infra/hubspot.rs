//! HubSpot CRM Client
//!
//! Upserts a contact keyed by email through the batch upsert endpoint.

use serde_json::{Map, Value, json};

use crate::application::config::CrmConfig;
use crate::domain::gateway::{CrmClient, CrmContact};
use crate::error::CrmError;

const ERROR_BODY_MAX_CHARS: usize = 500;

/// Build the batch upsert payload for one contact
fn upsert_payload(contact: &CrmContact) -> Value {
    let mut properties = Map::new();
    properties.insert("email".into(), json!(contact.email));
    properties.insert("firstname".into(), json!(contact.first_name));
    properties.insert("lastname".into(), json!(contact.last_name));
    if let Some(phone) = &contact.phone {
        properties.insert("phone".into(), json!(phone));
    }
    if let Some(mobile) = &contact.mobile_phone {
        properties.insert("mobilephone".into(), json!(mobile));
    }
    properties.insert("hs_lead_status".into(), json!(contact.subject));
    properties.insert("message".into(), json!(contact.message));

    json!({
        "inputs": [{
            "idProperty": "email",
            "id": contact.email,
            "properties": properties,
        }]
    })
}

#[derive(Clone)]
pub struct HubSpotClient {
    http: reqwest::Client,
    config: CrmConfig,
}

impl HubSpotClient {
    pub fn new(config: CrmConfig) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CrmError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }
}

impl CrmClient for HubSpotClient {
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<(), CrmError> {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(CrmError::NotConfigured);
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&upsert_payload(contact))
            .send()
            .await
            .map_err(|e| CrmError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "CRM contact upserted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(CrmError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_MAX_CHARS).collect(),
        })
    }
}

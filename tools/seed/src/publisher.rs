//! HTTP publisher: sends one `POST /events` per call.

use anyhow::{Context as _, Result, bail};
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

const TENANT_HEADER: &str = "x-tenant-id";

/// Body of a `201 Created` reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queued {
    pub event_id: String,
    pub aggregate_id: i64,
}

pub struct Publisher {
    client: Client,
    base_url: String,
    tenant: String,
}

impl Publisher {
    pub fn new(base_url: &str, tenant: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            tenant: tenant.to_owned(),
        }
    }

    pub async fn publish(&self, text: &str, event_type: Option<&str>) -> Result<Queued> {
        let url = format!("{}/events", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header(TENANT_HEADER, &self.tenant)
            .json(&request_body(text, event_type))
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("POST {url} returned {status}: {body}");
        }
        resp.json().await.context("decode queued response")
    }
}

fn request_body(text: &str, event_type: Option<&str>) -> Value {
    let message = format!(
        "{text} at {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let mut body = json!({ "payload": { "message": message } });
    if let Some(event_type) = event_type {
        body["eventType"] = Value::String(event_type.to_owned());
    }
    body
}

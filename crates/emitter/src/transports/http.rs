use std::time::Duration;

use async_trait::async_trait;
use domain::{EventData, PaymentRequested, ShipmentRequested};

use crate::{EmitError, OutboundMessage, Result, Transport};

/// Downstream endpoints, one per outbound event type.
#[derive(Debug, Clone, Default)]
pub struct HttpEndpoints {
    pub payment_url: Option<String>,
    pub shipment_url: Option<String>,
}

/// Posts each event as a JSON body to the service that handles it.
///
/// Any non-2xx answer is a failed delivery.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: HttpEndpoints,
}

impl HttpTransport {
    /// Creates a transport whose requests give up after `timeout`.
    pub fn new(endpoints: HttpEndpoints, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    fn url_for(&self, event_type: &str) -> Option<&str> {
        if event_type == PaymentRequested::EVENT_TYPE {
            self.endpoints.payment_url.as_deref()
        } else if event_type == ShipmentRequested::EVENT_TYPE {
            self.endpoints.shipment_url.as_deref()
        } else {
            None
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        let url = self
            .url_for(&message.event_type)
            .ok_or_else(|| EmitError::NoRoute(message.event_type.clone()))?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(message.payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

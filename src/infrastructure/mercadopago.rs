use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use log::{error, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{PaymentSettings, Secret};
use crate::domain::errors::DomainError;
use crate::domain::payment::{PreferenceCreated, PreferenceRequest};
use crate::domain::ports::PaymentGateway;

/// Creates checkout preferences through the Mercado Pago REST API.
pub struct MercadoPagoGateway {
    client: Client,
    base_url: String,
    access_token: Secret,
}

impl MercadoPagoGateway {
    pub fn new(settings: &PaymentSettings, access_token: Secret) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap, DomainError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.access_token.expose()))
            .map_err(|_| DomainError::ProviderMisconfigured)?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

#[derive(Debug, Serialize)]
struct PreferenceBody<'a> {
    items: Vec<ItemBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<PayerBody<'a>>,
    back_urls: BackUrlsBody<'a>,
    auto_return: &'static str,
    binary_mode: bool,
    statement_descriptor: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct ItemBody<'a> {
    title: &'a str,
    quantity: i32,
    currency_id: &'a str,
    unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    picture_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PayerBody<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrlsBody<'a> {
    success: &'a str,
    pending: &'a str,
    failure: &'a str,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

fn preference_body(request: &PreferenceRequest) -> Result<PreferenceBody<'_>, DomainError> {
    let items = request
        .items
        .iter()
        .map(|item| {
            let unit_price = item.unit_price.to_f64().ok_or_else(|| {
                DomainError::invalid("items.price", "Price is out of range")
            })?;
            Ok(ItemBody {
                title: &item.title,
                quantity: item.quantity,
                currency_id: &request.currency,
                unit_price,
                picture_url: item.picture_url.as_deref(),
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(PreferenceBody {
        items,
        payer: request
            .payer_email
            .as_deref()
            .map(|email| PayerBody { email }),
        back_urls: BackUrlsBody {
            success: &request.back_urls.success,
            pending: &request.back_urls.pending,
            failure: &request.back_urls.failure,
        },
        auto_return: "approved",
        binary_mode: request.binary_mode,
        statement_descriptor: &request.statement_descriptor,
        notification_url: request.notification_url.as_deref(),
        external_reference: request.external_reference.clone(),
    })
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<PreferenceCreated, DomainError> {
        let body = preference_body(request)?;
        let url = format!("{}/checkout/preferences", self.base_url);

        // Error text carries status and kind only; the token must not leak.
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timeout" } else { "transport" };
                error!("Mercado Pago request failed ({kind})");
                DomainError::ProviderError(format!("payment provider {kind} error"))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Mercado Pago rejected preference: status={status}");
            return Err(DomainError::ProviderError(format!(
                "payment provider answered {status}"
            )));
        }

        let created: PreferenceResponse = response.json().await.map_err(|_| {
            error!("Mercado Pago returned an unreadable preference body");
            DomainError::ProviderError("unreadable payment provider response".to_string())
        })?;
        info!("Created payment preference {}", created.id);

        Ok(PreferenceCreated {
            id: created.id,
            init_point: created.init_point,
            sandbox_init_point: created.sandbox_init_point,
        })
    }
}

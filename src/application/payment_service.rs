use std::sync::Arc;

use log::info;

use crate::config::PaymentSettings;
use crate::domain::errors::DomainError;
use crate::domain::payment::{Checkout, PreferenceItem, PreferenceRequest};
use crate::domain::ports::PaymentGateway;

const REDIRECT_BASE: &str = "https://www.mercadopago.com/checkout/v1/redirect";

pub struct PaymentService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    settings: PaymentSettings,
}

impl PaymentService {
    /// `gateway` is `None` when no provider credentials are configured.
    pub fn new(gateway: Option<Arc<dyn PaymentGateway>>, settings: PaymentSettings) -> Self {
        Self { gateway, settings }
    }

    pub async fn create_preference(
        &self,
        items: Vec<PreferenceItem>,
        payer_email: Option<String>,
        order_ref: Option<String>,
    ) -> Result<Checkout, DomainError> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or(DomainError::ProviderMisconfigured)?;
        if items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        PreferenceItem::validate_all(&items)?;

        let request = PreferenceRequest {
            items,
            currency: self.settings.currency.clone(),
            payer_email: payer_email.filter(|e| !e.trim().is_empty()),
            back_urls: self.settings.back_urls.clone(),
            binary_mode: true,
            statement_descriptor: self.settings.statement_descriptor.clone(),
            notification_url: self.settings.notification_url.clone(),
            external_reference: order_ref.filter(|r| !r.trim().is_empty()),
        };
        let created = gateway.create_preference(&request).await?;
        info!(
            "Checkout preference {} created for order {}",
            created.id,
            request.external_reference.as_deref().unwrap_or("-")
        );

        Ok(Checkout {
            redirect_url: format!("{REDIRECT_BASE}?pref_id={}", created.id),
            preference_id: created.id,
            init_point: created.init_point,
            sandbox_init_point: created.sandbox_init_point,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::payment::PreferenceCreated;

    #[derive(Default)]
    struct RecordingGateway {
        seen: Mutex<Vec<PreferenceRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_preference(
            &self,
            request: &PreferenceRequest,
        ) -> Result<PreferenceCreated, DomainError> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(DomainError::ProviderError(
                    "payment provider answered 401".to_string(),
                ));
            }
            Ok(PreferenceCreated {
                id: "123-abc".to_string(),
                init_point: Some("https://mp/init".to_string()),
                sandbox_init_point: Some("https://mp/sandbox".to_string()),
            })
        }
    }

    fn configured(gateway: Arc<RecordingGateway>) -> PaymentService {
        PaymentService::new(Some(gateway), PaymentSettings::default())
    }

    fn item(title: &str, quantity: i32, price: &str) -> PreferenceItem {
        PreferenceItem {
            title: title.to_string(),
            quantity,
            unit_price: BigDecimal::from_str(price).unwrap(),
            picture_url: None,
        }
    }

    #[tokio::test]
    async fn builds_preference_from_settings_and_items() {
        let gateway = Arc::new(RecordingGateway::default());
        let svc = configured(gateway.clone());
        let order_number = "ORD-240307-0001".to_string();

        let checkout = svc
            .create_preference(
                vec![item("Remera", 2, "1500")],
                Some("ana@example.com".to_string()),
                Some(order_number.clone()),
            )
            .await
            .unwrap();

        assert_eq!(checkout.preference_id, "123-abc");
        assert_eq!(
            checkout.redirect_url,
            "https://www.mercadopago.com/checkout/v1/redirect?pref_id=123-abc"
        );
        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen[0].currency, "ARS");
        assert!(seen[0].binary_mode);
        assert_eq!(seen[0].external_reference, Some(order_number));
        assert_eq!(seen[0].statement_descriptor, "ALMENDRA");
    }

    #[tokio::test]
    async fn missing_credentials_win_over_empty_cart() {
        let svc = PaymentService::new(None, PaymentSettings::default());
        let err = svc.create_preference(vec![], None, None).await.unwrap_err();
        assert!(matches!(err, DomainError::ProviderMisconfigured));
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_calling_out() {
        let gateway = Arc::new(RecordingGateway::default());
        let svc = configured(gateway.clone());

        let err = svc.create_preference(vec![], None, None).await.unwrap_err();
        assert!(matches!(err, DomainError::EmptyCart));
        assert!(gateway.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_lines_are_reported_per_field() {
        let gateway = Arc::new(RecordingGateway::default());
        let svc = configured(gateway);

        let err = svc
            .create_preference(vec![item("", 1, "10"), item("Gorra", 0, "-1")], None, None)
            .await
            .unwrap_err();
        let DomainError::Validation(violations) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["items[0].name", "items[1].qty", "items[1].price"]);
    }

    #[tokio::test]
    async fn provider_failure_is_passed_through() {
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });
        let svc = configured(gateway);

        let err = svc
            .create_preference(vec![item("Remera", 1, "1500")], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ProviderError(_)));
    }

    #[tokio::test]
    async fn blank_order_reference_is_omitted() {
        let gateway = Arc::new(RecordingGateway::default());
        let svc = configured(gateway.clone());

        svc.create_preference(vec![item("Remera", 1, "1500")], None, Some("  ".to_string()))
            .await
            .unwrap();
        assert!(gateway.seen.lock().unwrap()[0].external_reference.is_none());
    }
}

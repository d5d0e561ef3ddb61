use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use refugio_core::payment::{
    CheckoutPreference, GatewayPayment, PaymentGateway, PaymentStatus, PreferenceRequest,
};

/// Scriptable in-memory gateway for tests: payments are registered up front
/// with the status the provider should report, lookups are counted, and the
/// whole backend can be switched to failure mode to exercise the
/// downgrade-to-rejected path.
#[derive(Default)]
pub struct MockGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_payment(
        &self,
        payment_id: &str,
        status: PaymentStatus,
        external_reference: Option<&str>,
    ) {
        let payment = GatewayPayment {
            id: payment_id.to_string(),
            status: status.clone(),
            external_reference: external_reference.map(str::to_string),
            raw: json!({
                "id": payment_id,
                "status": status,
                "external_reference": external_reference,
            }),
        };
        self.payments
            .lock()
            .unwrap()
            .insert(payment_id.to_string(), payment);
    }

    /// Every subsequent lookup errors, as if the provider were unreachable.
    pub fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<CheckoutPreference, Box<dyn std::error::Error + Send + Sync>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("simulated gateway outage".into());
        }
        Ok(CheckoutPreference {
            id: format!("pref_{}", request.external_reference),
            init_point: format!(
                "https://gateway.test/checkout/{}",
                request.external_reference
            ),
        })
    }

    async fn get_payment(
        &self,
        payment_id: &str,
    ) -> Result<GatewayPayment, Box<dyn std::error::Error + Send + Sync>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err("simulated gateway outage".into());
        }
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| format!("unknown payment {}", payment_id).into())
    }
}

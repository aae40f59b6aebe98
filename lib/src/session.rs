// lib/src/session.rs

use std::sync::Arc;

use anyhow::Result;
use log::info;

use models::ResidentId;

use crate::activity::ActivityRegistrationCoordinator;
use crate::backend::{CareBackend, HttpBackend};
use crate::billing::BillingReconciler;
use crate::care_plan::CarePlanLifecycle;
use crate::config::CareConfig;
use crate::loader::{DataLoadCoordinator, ResidentSnapshot};

/// Everything one app surface needs, wired over a single backend.
///
/// All components share the same `DataLoadCoordinator`, so a mutation made
/// through any of them is visible to the others after its reload.
pub struct CareSession {
    pub loader: Arc<DataLoadCoordinator>,
    pub care_plans: CarePlanLifecycle,
    pub billing: BillingReconciler,
    pub activities: ActivityRegistrationCoordinator,
}

impl CareSession {
    /// Opens a session against the HTTP backend named in `config`.
    pub fn connect(config: &CareConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config.backend)?;
        info!("Care session connected to {}", backend.base_url());
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    pub fn with_backend(backend: Arc<dyn CareBackend>, config: &CareConfig) -> Self {
        let loader = Arc::new(DataLoadCoordinator::new(backend));
        CareSession {
            care_plans: CarePlanLifecycle::new(loader.clone(), config.care_plans.clone()),
            billing: BillingReconciler::new(loader.clone(), config.pricing),
            activities: ActivityRegistrationCoordinator::new(loader.clone()),
            loader,
        }
    }

    pub fn backend(&self) -> &dyn CareBackend {
        self.loader.backend()
    }

    pub async fn select_resident(&self, resident_id: ResidentId) -> ResidentSnapshot {
        self.loader.select_resident(resident_id).await
    }

    pub async fn refresh(&self) -> Option<ResidentSnapshot> {
        self.loader.refresh().await
    }

    pub async fn snapshot(&self) -> Option<ResidentSnapshot> {
        self.loader.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::config::BackendConfig;

    #[test]
    fn connect_builds_an_http_backend() {
        let config = CareConfig {
            backend: BackendConfig {
                base_url: "http://care.local/api/".to_string(),
                auth_token: None,
                request_timeout_secs: Some(5),
            },
            ..CareConfig::default()
        };
        assert!(CareSession::connect(&config).is_ok());
    }

    #[tokio::test]
    async fn components_share_one_loader() {
        let backend = Arc::new(InMemoryBackend::new().with_plan(serde_json::json!({
            "planId": 1, "elderlyId": 7, "evaluationStatus": "Unpaid", "priority": "High"
        })));
        let session = CareSession::with_backend(backend, &CareConfig::default());

        session.care_plans.reload(ResidentId(7)).await.unwrap();
        assert_eq!(session.billing.unpaid_total(ResidentId(7)).await.unwrap(), 2000);
    }
}

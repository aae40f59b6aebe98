// lib/src/loader/plan_book.rs

use serde_json::{Map, Value};

use models::medical::CarePlan;
use models::{PlanId, ResidentId, TransportError};

use super::sequence::SliceStore;
use crate::backend::{endpoints, CareBackend};
use crate::normalizer::normalize_entries;

/// A canonical plan together with the record the backend sent for it.
/// Full-record replacements start from `raw` so fields this layer does not
/// know about survive the round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanEntry {
    pub plan: CarePlan,
    pub raw: Map<String, Value>,
}

/// Last loaded plan list per resident.
pub type PlanBook = SliceStore<ResidentId, Vec<PlanEntry>>;

impl PlanBook {
    pub async fn plans(&self, resident_id: ResidentId) -> Option<Vec<CarePlan>> {
        self.with(&resident_id, |entries| entries.iter().map(|e| e.plan.clone()).collect())
            .await
    }

    pub async fn entry(&self, resident_id: ResidentId, plan_id: PlanId) -> Option<PlanEntry> {
        self.with(&resident_id, |entries| entries.iter().find(|e| e.plan.plan_id == plan_id).cloned())
            .await
            .flatten()
    }

    /// Searches every loaded resident list.
    pub async fn locate(&self, plan_id: PlanId) -> Option<PlanEntry> {
        self.find_map(|_, entries| entries.iter().find(|e| e.plan.plan_id == plan_id).cloned())
            .await
    }
}

pub async fn fetch_plan_entries(
    backend: &dyn CareBackend,
    resident_id: ResidentId,
) -> Result<Vec<PlanEntry>, TransportError> {
    let body = backend.get(&endpoints::resident_plans(resident_id)).await?;
    Ok(normalize_entries::<CarePlan>(&body)
        .into_iter()
        .map(|(plan, raw)| PlanEntry { plan, raw })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockCareBackend;
    use models::medical::PlanStatus;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_keeps_raw_records() {
        let mut backend = MockCareBackend::new();
        backend
            .expect_get()
            .withf(|path| path == "/staff-info/nursing-plans/elderly/7")
            .returning(|_| Ok(json!({"data": [{"planId": 1, "elderlyId": 7, "status": "Unpaid", "roomHint": "A"}]})));

        let entries = fetch_plan_entries(&backend, ResidentId(7)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].plan.status, PlanStatus::Unpaid);
        assert_eq!(entries[0].raw["roomHint"], "A");

        let book = PlanBook::new();
        book.apply(ResidentId(7), 1, entries).await;
        assert!(book.entry(ResidentId(7), PlanId(1)).await.is_some());
        assert!(book.locate(PlanId(1)).await.is_some());
        assert!(book.entry(ResidentId(7), PlanId(2)).await.is_none());
    }
}

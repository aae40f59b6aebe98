// lib/src/billing/mod.rs

//! Nursing fees and the room-billing ledger.
//!
//! Nursing fees are derived from plan priorities and never stored. The room
//! ledger is the backend's: the client pays a row's full unpaid amount and
//! reloads, it never recomputes a balance.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use log::{debug, info, warn};

use models::medical::{Actor, CarePlan, PlanStatus, RoomBillingRecord, RoomPayment};
use models::{BillingId, CareError, CareResult, DomainConflict, ResidentId, ShapeError};

use crate::backend::endpoints;
use crate::config::PriceTable;
use crate::loader::{DataLoadCoordinator, SliceStore};
use crate::normalizer::normalize_list;

pub struct BillingReconciler {
    loader: Arc<DataLoadCoordinator>,
    prices: PriceTable,
    ledger: SliceStore<ResidentId, Vec<RoomBillingRecord>>,
    in_flight: Mutex<HashSet<BillingId>>,
}

/// Marks a billing row as being paid for as long as it lives.
struct InFlight<'a> {
    paying: &'a Mutex<HashSet<BillingId>>,
    billing_id: BillingId,
}

impl<'a> InFlight<'a> {
    fn acquire(paying: &'a Mutex<HashSet<BillingId>>, billing_id: BillingId) -> Option<Self> {
        let inserted = paying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(billing_id);
        inserted.then_some(InFlight { paying, billing_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.paying
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.billing_id);
    }
}

impl BillingReconciler {
    pub fn new(loader: Arc<DataLoadCoordinator>, prices: PriceTable) -> Self {
        BillingReconciler {
            loader,
            prices,
            ledger: SliceStore::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn price(&self, plan: &CarePlan) -> u64 {
        self.prices.price(plan.priority)
    }

    /// Sum of the prices of every `Unpaid` plan of `resident_id` in `plans`.
    /// Rows without a resident id are counted as theirs.
    pub fn unpaid_total_of(&self, resident_id: ResidentId, plans: &[CarePlan]) -> u64 {
        plans
            .iter()
            .filter(|plan| plan.resident_id == resident_id || plan.resident_id.is_unset())
            .filter(|plan| plan.status == PlanStatus::Unpaid)
            .map(|plan| self.price(plan))
            .sum()
    }

    /// Outstanding nursing fees of a resident, from the last loaded plan
    /// list. Loads the list when there is none.
    pub async fn unpaid_total(&self, resident_id: ResidentId) -> CareResult<u64> {
        let plans = match self.loader.plan_book().plans(resident_id).await {
            Some(plans) => plans,
            None => {
                self.loader.reload_plans(resident_id).await?;
                self.loader.plan_book().plans(resident_id).await.unwrap_or_default()
            }
        };
        Ok(self.unpaid_total_of(resident_id, &plans))
    }

    pub async fn reload_ledger(&self, resident_id: ResidentId) -> CareResult<Vec<RoomBillingRecord>> {
        let seq = self.loader.sequencer().next();
        let body = self.loader.backend().get(&endpoints::billing_records(resident_id)).await?;
        let records: Vec<RoomBillingRecord> = normalize_list(&body);
        debug!("Loaded {} billing rows for resident {}", records.len(), resident_id);
        self.ledger.apply(resident_id, seq, records).await;
        Ok(self.ledger.get(&resident_id).await.unwrap_or_default())
    }

    pub async fn ledger(&self, resident_id: ResidentId) -> CareResult<Vec<RoomBillingRecord>> {
        match self.ledger.get(&resident_id).await {
            Some(records) => Ok(records),
            None => self.reload_ledger(resident_id).await,
        }
    }

    /// Rows a payer is shown: unpaid or partially paid.
    pub async fn payable(&self, resident_id: ResidentId) -> CareResult<Vec<RoomBillingRecord>> {
        Ok(self
            .ledger(resident_id)
            .await?
            .into_iter()
            .filter(|row| row.payment_status.is_payable())
            .collect())
    }

    /// True while a payment for `billing_id` is outstanding. Surfaces use it
    /// to disable the pay action.
    pub fn is_paying(&self, billing_id: BillingId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&billing_id)
    }

    /// Pays the full unpaid amount of one ledger row, then reloads the
    /// ledger. A second call for the same row while the first is
    /// outstanding is refused.
    pub async fn pay_room_bill(
        &self,
        actor: &Actor,
        resident_id: ResidentId,
        billing_id: BillingId,
        method: &str,
        remarks: &str,
    ) -> CareResult<()> {
        if !actor.may_pay_for(resident_id) {
            return Err(DomainConflict::NotPermitted {
                actor: actor.to_string(),
                operation: "pay room bill",
            }
            .into());
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight, billing_id) else {
            return Err(DomainConflict::PaymentInProgress(billing_id).into());
        };

        let row = self
            .ledger(resident_id)
            .await?
            .into_iter()
            .find(|row| row.billing_id == billing_id)
            .ok_or(DomainConflict::UnknownBilling(billing_id))?;
        if !row.payment_status.is_payable() || row.unpaid_amount <= 0.0 {
            return Err(DomainConflict::NothingToPay(billing_id).into());
        }

        let payment = RoomPayment {
            payment_amount: row.unpaid_amount,
            payment_date: Local::now().naive_local(),
            method: method.to_string(),
            remarks: remarks.to_string(),
        };
        let body = serde_json::to_value(&payment).map_err(ShapeError::from)?;
        match self.loader.backend().put(&endpoints::billing_payment(billing_id), body).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                self.ledger.invalidate(&resident_id).await;
                return Err(DomainConflict::UnknownBilling(billing_id).into());
            }
            Err(e) if e.is_conflict() => {
                warn!("Backend refused payment on billing row {}: {}", billing_id, e);
                self.ledger.invalidate(&resident_id).await;
                return Err(DomainConflict::NothingToPay(billing_id).into());
            }
            Err(e) => return Err(CareError::from(e)),
        }
        info!(
            "{} paid {:.2} on billing row {} for resident {}",
            actor, payment.payment_amount, billing_id, resident_id
        );

        if let Err(e) = self.reload_ledger(resident_id).await {
            warn!("Reloading the ledger of resident {} after payment failed: {}", resident_id, e);
            self.ledger.invalidate(&resident_id).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::medical::{PaymentStatus, Priority};
    use models::PlanId;
    use serde_json::json;

    use crate::backend::{CareBackend, InMemoryBackend, MockCareBackend};

    const RESIDENT: ResidentId = ResidentId(7);

    fn reconciler_over(backend: Arc<dyn CareBackend>, prices: PriceTable) -> BillingReconciler {
        BillingReconciler::new(Arc::new(DataLoadCoordinator::new(backend)), prices)
    }

    fn plan(id: i64, priority: Priority, status: PlanStatus) -> CarePlan {
        CarePlan {
            plan_id: PlanId(id),
            resident_id: RESIDENT,
            priority,
            status,
            ..CarePlan::default()
        }
    }

    fn ledger_backend() -> Arc<InMemoryBackend> {
        Arc::new(
            InMemoryBackend::new()
                .with_billing(json!({
                    "billingId": 11, "elderlyId": 7, "roomNumber": "3-204", "dailyRate": 30,
                    "totalAmount": 900, "paidAmount": 300, "unpaidAmount": 600, "paymentStatus": "PARTIALLY_PAID"
                }))
                .with_billing(json!({
                    "billingId": 12, "elderlyId": 7, "totalAmount": 900, "paidAmount": 900, "paymentStatus": "Paid"
                }))
                .with_billing(json!({"billingId": 13, "elderlyId": 8, "totalAmount": 400})),
        )
    }

    #[test]
    fn prices_follow_priority_tiers() {
        let billing = reconciler_over(Arc::new(MockCareBackend::new()), PriceTable::default());
        assert_eq!(billing.price(&plan(1, Priority::Low, PlanStatus::Unpaid)), 500);
        assert_eq!(billing.price(&plan(1, Priority::Medium, PlanStatus::Unpaid)), 1000);
        assert_eq!(billing.price(&plan(1, Priority::High, PlanStatus::Unpaid)), 2000);
    }

    #[test]
    fn unpaid_total_counts_only_unpaid_plans() {
        let billing = reconciler_over(Arc::new(MockCareBackend::new()), PriceTable::default());
        let plans = vec![
            plan(1, Priority::High, PlanStatus::Unpaid),
            plan(2, Priority::Medium, PlanStatus::Unpaid),
            plan(3, Priority::High, PlanStatus::Pending),
            plan(4, Priority::Low, PlanStatus::Completed),
        ];
        assert_eq!(billing.unpaid_total_of(RESIDENT, &plans), 3000);
        assert_eq!(billing.unpaid_total_of(RESIDENT, &[]), 0);
    }

    #[test]
    fn unpaid_total_skips_other_residents() {
        let billing = reconciler_over(Arc::new(MockCareBackend::new()), PriceTable::default());
        let neighbour = CarePlan {
            resident_id: ResidentId(8),
            ..plan(2, Priority::High, PlanStatus::Unpaid)
        };
        let unassigned = CarePlan {
            resident_id: ResidentId::default(),
            ..plan(3, Priority::Low, PlanStatus::Unpaid)
        };
        let plans = vec![plan(1, Priority::High, PlanStatus::Unpaid), neighbour, unassigned];
        assert_eq!(billing.unpaid_total_of(RESIDENT, &plans), 2500);
        assert_eq!(billing.unpaid_total_of(ResidentId(8), &plans), 2500);
    }

    #[tokio::test]
    async fn payment_settled_elsewhere_invalidates_the_ledger() {
        let backend = ledger_backend();
        let billing = reconciler_over(backend.clone(), PriceTable::default());
        backend.fail("PUT", "/RoomOccupancy/billing/11/payment", 409).await;

        let result = billing
            .pay_room_bill(&Actor::Resident(RESIDENT), RESIDENT, BillingId(11), "cash", "")
            .await;
        let conflict = result.unwrap_err();
        assert!(conflict.is_recoverable());
        assert_eq!(conflict.as_conflict(), Some(&DomainConflict::NothingToPay(BillingId(11))));
        assert!(!billing.ledger.is_loaded(&RESIDENT).await);
        assert!(!billing.is_paying(BillingId(11)));
    }

    #[tokio::test]
    async fn unpaid_total_uses_configured_prices() {
        let backend = InMemoryBackend::new()
            .with_plan(json!({"planId": 1, "elderlyId": 7, "evaluationStatus": "Unpaid", "priority": "Basic"}))
            .with_plan(json!({"planId": 2, "elderlyId": 7, "evaluationStatus": "Unpaid", "priority": "High"}));
        let prices = PriceTable {
            low: 600,
            medium: 1200,
            high: 2400,
        };
        let billing = reconciler_over(Arc::new(backend), prices);
        assert_eq!(billing.unpaid_total(RESIDENT).await.unwrap(), 3000);
    }

    #[tokio::test]
    async fn only_open_rows_are_payable() {
        let billing = reconciler_over(ledger_backend(), PriceTable::default());
        let payable = billing.payable(RESIDENT).await.unwrap();
        assert_eq!(payable.len(), 1);
        assert_eq!(payable[0].billing_id, BillingId(11));
        assert_eq!(payable[0].payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(billing.ledger(RESIDENT).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn paying_settles_the_unpaid_amount_and_reloads() {
        let backend = ledger_backend();
        let billing = reconciler_over(backend.clone(), PriceTable::default());
        let family = Actor::Family { resident_id: RESIDENT };

        billing
            .pay_room_bill(&family, RESIDENT, BillingId(11), "WeChat", "March")
            .await
            .unwrap();

        assert!(billing.payable(RESIDENT).await.unwrap().is_empty());
        let row = billing
            .ledger(RESIDENT)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.billing_id == BillingId(11))
            .unwrap();
        assert_eq!(row.payment_status, PaymentStatus::Paid);
        assert_eq!(row.unpaid_amount, 0.0);
        assert!(!billing.is_paying(BillingId(11)));
    }

    #[tokio::test]
    async fn settled_and_unknown_rows_are_refused() {
        let billing = reconciler_over(ledger_backend(), PriceTable::default());
        let resident = Actor::Resident(RESIDENT);

        let paid = billing.pay_room_bill(&resident, RESIDENT, BillingId(12), "cash", "").await;
        assert_eq!(paid, Err(DomainConflict::NothingToPay(BillingId(12)).into()));

        let unknown = billing.pay_room_bill(&resident, RESIDENT, BillingId(99), "cash", "").await;
        assert_eq!(unknown, Err(DomainConflict::UnknownBilling(BillingId(99)).into()));
    }

    #[tokio::test]
    async fn second_payment_while_outstanding_is_refused() {
        let mut backend = MockCareBackend::new();
        backend.expect_get().never();
        backend.expect_put().never();
        let billing = reconciler_over(Arc::new(backend), PriceTable::default());

        let guard = InFlight::acquire(&billing.in_flight, BillingId(11));
        assert!(guard.is_some());
        assert!(billing.is_paying(BillingId(11)));

        let second = billing
            .pay_room_bill(&Actor::Resident(RESIDENT), RESIDENT, BillingId(11), "cash", "")
            .await;
        assert_eq!(second, Err(DomainConflict::PaymentInProgress(BillingId(11)).into()));

        drop(guard);
        assert!(!billing.is_paying(BillingId(11)));
    }

    #[tokio::test]
    async fn visitors_and_staff_cannot_pay() {
        let billing = reconciler_over(Arc::new(MockCareBackend::new()), PriceTable::default());
        for actor in [Actor::Visitor, Actor::Staff(models::StaffId(40)), Actor::Resident(ResidentId(8))] {
            let result = billing.pay_room_bill(&actor, RESIDENT, BillingId(11), "cash", "").await;
            assert!(matches!(
                result,
                Err(CareError::Conflict(DomainConflict::NotPermitted { .. }))
            ));
        }
    }
}

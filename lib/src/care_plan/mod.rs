// lib/src/care_plan/mod.rs

//! Care plan state machine and its mutations.
//!
//! Every mutation checks the actor and the plan's last loaded status before
//! anything is sent, so an illegal request never reaches the backend. After
//! a successful mutation the resident's plan list is reloaded in full; the
//! result of a mutation is read back from that reload, never patched in
//! locally.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use log::{debug, info, warn};
use serde_json::{json, Map, Value};

use models::medical::{Actor, CarePlan, CareType, PlanStatus, Priority};
use models::{CareError, CareResult, DomainConflict, PlanId, ResidentId, ShapeError, StaffId, TransportError};

use crate::backend::endpoints;
use crate::config::CarePlanConfig;
use crate::loader::{DataLoadCoordinator, PlanEntry};
use crate::normalizer::tables::CARE_PLAN;
use crate::normalizer::transforms::format_timestamp;

/// Field the backend may compare against its own `updatedAt` when
/// `send_last_known_version` is on.
pub const LAST_KNOWN_VERSION_FIELD: &str = "lastKnownUpdatedAt";

/// A resident's request for a new plan.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanApplication {
    pub resident_id: ResidentId,
    pub plan_id: PlanId,
    pub priority: Priority,
    /// Defaults to now.
    pub start_date: Option<NaiveDateTime>,
    /// Defaults to the start plus the configured duration.
    pub end_date: Option<NaiveDateTime>,
}

impl PlanApplication {
    pub fn new(resident_id: ResidentId, plan_id: PlanId, priority: Priority) -> Self {
        PlanApplication {
            resident_id,
            plan_id,
            priority,
            start_date: None,
            end_date: None,
        }
    }

    pub fn starting(mut self, start: NaiveDateTime) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn ending(mut self, end: NaiveDateTime) -> Self {
        self.end_date = Some(end);
        self
    }
}

pub struct CarePlanLifecycle {
    loader: Arc<DataLoadCoordinator>,
    config: CarePlanConfig,
}

impl CarePlanLifecycle {
    pub fn new(loader: Arc<DataLoadCoordinator>, config: CarePlanConfig) -> Self {
        CarePlanLifecycle { loader, config }
    }

    /// Reloads the authoritative plan list of a resident.
    pub async fn reload(&self, resident_id: ResidentId) -> CareResult<Vec<CarePlan>> {
        self.loader.reload_plans(resident_id).await?;
        Ok(self.loader.plan_book().plans(resident_id).await.unwrap_or_default())
    }

    /// The last loaded plan list, loading it first when needed.
    pub async fn plans(&self, resident_id: ResidentId) -> CareResult<Vec<CarePlan>> {
        match self.loader.plan_book().plans(resident_id).await {
            Some(plans) => Ok(plans),
            None => self.reload(resident_id).await,
        }
    }

    pub async fn plan(&self, resident_id: ResidentId, plan_id: PlanId) -> CareResult<Option<CarePlan>> {
        Ok(self.plans(resident_id).await?.into_iter().find(|p| p.plan_id == plan_id))
    }

    /// Submits a new plan as `Pending`, `Normal`, unassigned.
    ///
    /// The plan id is chosen by the caller. A collision with the loaded list
    /// is reported without contacting the backend; a collision the backend
    /// detects is reported the same way.
    pub async fn apply(&self, actor: &Actor, application: PlanApplication) -> CareResult<()> {
        let PlanApplication {
            resident_id,
            plan_id,
            priority,
            start_date,
            end_date,
        } = application;

        if !actor.is_resident(resident_id) {
            return Err(not_permitted(actor, "apply"));
        }
        self.ensure_loaded(resident_id).await?;
        if self.loader.plan_book().entry(resident_id, plan_id).await.is_some() {
            return Err(DomainConflict::DuplicatePlanId(plan_id).into());
        }

        let start = start_date.unwrap_or_else(|| Local::now().naive_local());
        let end = end_date.unwrap_or_else(|| start + Duration::days(self.config.default_duration_days));
        let plan = CarePlan {
            plan_id,
            resident_id,
            staff_id: None,
            start_date: format_timestamp(&start),
            end_date: format_timestamp(&end),
            care_type: CareType::Normal,
            priority,
            status: PlanStatus::Pending,
            updated_at: String::new(),
        };
        let mut body = to_object(&plan)?;
        body.remove("updatedAt");

        self.loader
            .backend()
            .post(endpoints::NURSING_PLANS, Value::Object(body))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    DomainConflict::DuplicatePlanId(plan_id).into()
                } else {
                    CareError::from(e)
                }
            })?;

        info!("Resident {} applied for care plan {} ({})", resident_id, plan_id, priority);
        self.reload_after(resident_id, "apply").await;
        Ok(())
    }

    /// Withdraws a `Pending` plan. The plan is deleted, not moved to another
    /// status.
    pub async fn cancel(&self, actor: &Actor, resident_id: ResidentId, plan_id: PlanId) -> CareResult<()> {
        if !actor.acts_for(resident_id) {
            return Err(not_permitted(actor, "cancel"));
        }
        let entry = self.current_entry(resident_id, plan_id).await?;
        if !entry.plan.status.can_cancel() {
            return Err(illegal(&entry, "cancel"));
        }

        let outcome = self.loader.backend().delete(&endpoints::nursing_plan(plan_id), None).await;
        self.settle(resident_id, plan_id, "cancel", outcome).await?;
        info!("{} cancelled care plan {}", actor, plan_id);
        Ok(())
    }

    /// `Pending → Scheduled`, assigning `staff_id`.
    pub async fn staff_schedule(
        &self,
        actor: &Actor,
        resident_id: ResidentId,
        plan_id: PlanId,
        staff_id: StaffId,
    ) -> CareResult<()> {
        if actor.staff_id().is_none() {
            return Err(not_permitted(actor, "schedule"));
        }
        let entry = self.current_entry(resident_id, plan_id).await?;
        if !entry.plan.status.can_transition_to(PlanStatus::Scheduled) {
            return Err(illegal(&entry, "schedule"));
        }

        let updated = CarePlan {
            staff_id: Some(staff_id),
            status: PlanStatus::Scheduled,
            ..entry.plan.clone()
        };
        self.replace(&entry, &updated, "schedule").await?;
        info!("{} scheduled care plan {} for staff {}", actor, plan_id, staff_id);
        Ok(())
    }

    /// `Scheduled → Completed`.
    pub async fn staff_complete(&self, actor: &Actor, resident_id: ResidentId, plan_id: PlanId) -> CareResult<()> {
        let Some(own_id) = actor.staff_id() else {
            return Err(not_permitted(actor, "complete"));
        };
        let entry = self.current_entry(resident_id, plan_id).await?;
        if entry.plan.status != PlanStatus::Scheduled {
            return Err(illegal(&entry, "complete"));
        }

        let updated = CarePlan {
            staff_id: entry.plan.staff_id.or(Some(own_id)),
            status: PlanStatus::Completed,
            ..entry.plan.clone()
        };
        self.replace(&entry, &updated, "complete").await?;
        info!("{} completed care plan {}", actor, plan_id);
        Ok(())
    }

    /// Settles an `Unpaid` plan. The backend moves it straight to
    /// `Completed`; this path never passes through `Scheduled`.
    pub async fn pay_and_complete(
        &self,
        actor: &Actor,
        resident_id: ResidentId,
        plan_id: PlanId,
        method: &str,
    ) -> CareResult<()> {
        if !actor.may_pay_for(resident_id) {
            return Err(not_permitted(actor, "pay"));
        }
        let entry = self.current_entry(resident_id, plan_id).await?;
        if !entry.plan.is_unpaid() {
            return Err(illegal(&entry, "pay"));
        }

        let mut body = json!({
            "planId": plan_id,
            "elderlyId": resident_id,
            "paymentMethod": method,
            "paymentDate": format_timestamp(&Local::now().naive_local()),
        });
        self.attach_version(&entry, &mut body);
        let outcome = self
            .loader
            .backend()
            .put(&endpoints::nursing_plan_payment(plan_id), body)
            .await;
        self.settle(resident_id, plan_id, "pay", outcome).await?;
        info!("{} paid care plan {}", actor, plan_id);
        Ok(())
    }

    async fn ensure_loaded(&self, resident_id: ResidentId) -> CareResult<()> {
        if !self.loader.plan_book().is_loaded(&resident_id).await {
            debug!("No plan list for resident {}, loading", resident_id);
            self.loader.reload_plans(resident_id).await?;
        }
        Ok(())
    }

    async fn current_entry(&self, resident_id: ResidentId, plan_id: PlanId) -> CareResult<PlanEntry> {
        self.ensure_loaded(resident_id).await?;
        self.loader
            .plan_book()
            .entry(resident_id, plan_id)
            .await
            .ok_or_else(|| DomainConflict::UnknownPlan(plan_id).into())
    }

    /// Submits a full-record replacement built from the last loaded raw
    /// record, with canonical fields overlaid and alias keys dropped.
    async fn replace(&self, entry: &PlanEntry, updated: &CarePlan, operation: &'static str) -> CareResult<()> {
        let mut body = replacement_record(entry, updated)?;
        self.attach_version(entry, &mut body);
        let outcome = self
            .loader
            .backend()
            .put(&endpoints::nursing_plan(updated.plan_id), body)
            .await;
        self.settle(updated.resident_id, updated.plan_id, operation, outcome).await
    }

    fn attach_version(&self, entry: &PlanEntry, body: &mut Value) {
        if !self.config.send_last_known_version || entry.plan.updated_at.is_empty() {
            return;
        }
        if let Value::Object(map) = body {
            map.insert(LAST_KNOWN_VERSION_FIELD.to_string(), json!(entry.plan.updated_at));
        }
    }

    /// Maps the backend's answer to a mutation. 404 and 409 mean someone got
    /// there first: the plan list is dropped so the next call reloads.
    async fn settle(
        &self,
        resident_id: ResidentId,
        plan_id: PlanId,
        operation: &'static str,
        outcome: Result<Value, TransportError>,
    ) -> CareResult<()> {
        match outcome {
            Ok(_) => {
                self.reload_after(resident_id, operation).await;
                Ok(())
            }
            Err(e) if e.is_conflict() || e.is_not_found() => {
                warn!("Backend rejected {} of care plan {}: {}", operation, plan_id, e);
                self.loader.plan_book().invalidate(&resident_id).await;
                Err(DomainConflict::StaleState {
                    plan_id,
                    reason: e.message,
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reload_after(&self, resident_id: ResidentId, operation: &str) {
        if let Err(e) = self.loader.reload_plans(resident_id).await {
            warn!(
                "Reloading care plans of resident {} after {} failed: {}",
                resident_id, operation, e
            );
            self.loader.plan_book().invalidate(&resident_id).await;
        }
    }
}

fn not_permitted(actor: &Actor, operation: &'static str) -> CareError {
    DomainConflict::NotPermitted {
        actor: actor.to_string(),
        operation,
    }
    .into()
}

fn illegal(entry: &PlanEntry, operation: &'static str) -> CareError {
    DomainConflict::IllegalTransition {
        plan_id: entry.plan.plan_id,
        from: entry.plan.status,
        operation,
    }
    .into()
}

fn to_object(plan: &CarePlan) -> CareResult<Map<String, Value>> {
    match serde_json::to_value(plan).map_err(ShapeError::from)? {
        Value::Object(map) => Ok(map),
        other => Err(ShapeError {
            entity: CARE_PLAN.entity,
            message: format!("serialized to {}", other),
        }
        .into()),
    }
}

pub fn replacement_record(entry: &PlanEntry, updated: &CarePlan) -> CareResult<Value> {
    let mut body = entry.raw.clone();
    for rule in CARE_PLAN.fields {
        for alias in rule.aliases() {
            body.remove(alias);
        }
    }
    body.extend(to_object(updated)?);
    body.remove(LAST_KNOWN_VERSION_FIELD);
    Ok(Value::Object(body))
}

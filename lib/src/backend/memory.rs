// lib/src/backend/memory.rs

//! Offline stand-in for the shared backend. It keeps plans, participations
//! and billing rows in memory and enforces the same rules the real server
//! does (duplicate plan ids, cancel only while pending, pay only while
//! unpaid). Everything else is served from fixtures keyed by path.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Local;
use log::debug;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use models::medical::{PaymentStatus, PlanStatus};
use models::TransportError;

use crate::backend::CareBackend;

#[derive(Debug, Default)]
struct MemoryState {
    fixtures: HashMap<String, Value>,
    plans: BTreeMap<i64, Value>,
    activities: Vec<Value>,
    // (activity, resident); uniqueness is not enforced, like the real server
    participations: Vec<(i64, i64)>,
    billing: BTreeMap<i64, Value>,
    failures: HashMap<String, u16>,
    calls: Vec<String>,
    revision: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<MemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `GET path`.
    pub fn with_fixture(mut self, path: impl Into<String>, body: Value) -> Self {
        self.state.get_mut().fixtures.insert(path.into(), body);
        self
    }

    pub fn with_plan(mut self, plan: Value) -> Self {
        if let Some(id) = int_field(&plan, &["planId", "plan_id", "id"]) {
            self.state.get_mut().plans.insert(id, plan);
        }
        self
    }

    pub fn with_activity(mut self, activity: Value) -> Self {
        self.state.get_mut().activities.push(activity);
        self
    }

    pub fn with_participation(mut self, activity_id: i64, resident_id: i64) -> Self {
        self.state.get_mut().participations.push((activity_id, resident_id));
        self
    }

    pub fn with_billing(mut self, record: Value) -> Self {
        if let Some(id) = int_field(&record, &["billingId", "billing_id", "id"]) {
            self.state.get_mut().billing.insert(id, record);
        }
        self
    }

    /// Makes every `method path` call fail with `status` until cleared.
    pub async fn fail(&self, method: &str, path: &str, status: u16) {
        self.state.write().await.failures.insert(format!("{} {}", method, path), status);
    }

    pub async fn clear_failure(&self, method: &str, path: &str) {
        self.state.write().await.failures.remove(&format!("{} {}", method, path));
    }

    /// Every call received so far, as "METHOD path".
    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }

    pub async fn plan(&self, plan_id: i64) -> Option<Value> {
        self.state.read().await.plans.get(&plan_id).cloned()
    }

    pub async fn participation_count(&self, activity_id: i64, resident_id: i64) -> usize {
        self.state
            .read()
            .await
            .participations
            .iter()
            .filter(|(a, r)| *a == activity_id && *r == resident_id)
            .count()
    }

    /// Changes a plan's status behind the client's back, the way another
    /// session would.
    pub async fn set_plan_status(&self, plan_id: i64, status: PlanStatus) {
        let mut state = self.state.write().await;
        let stamp = state.next_stamp();
        if let Some(Value::Object(plan)) = state.plans.get_mut(&plan_id) {
            plan.insert("evaluationStatus".to_string(), json!(status.as_str()));
            plan.remove("status");
            plan.insert("updatedAt".to_string(), json!(stamp));
        }
    }

    async fn dispatch(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
        let mut state = self.state.write().await;
        let call = format!("{} {}", method, path);
        debug!("in-memory backend: {}", call);
        state.calls.push(call.clone());
        if let Some(status) = state.failures.get(&call) {
            return Err(TransportError::new(method, path, Some(*status), "injected failure"));
        }
        state.route(method, path, body)
    }
}

impl MemoryState {
    fn next_stamp(&mut self) -> String {
        self.revision += 1;
        format!("{}.{:06}", Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S"), self.revision)
    }

    fn route(&mut self, method: &'static str, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let fail = |status: u16, message: &str| Err(TransportError::new(method, path, Some(status), message));
        let parse_id = |raw: &str| raw.parse::<i64>().map_err(|_| TransportError::new(method, path, Some(400), "bad id"));

        match (method, segments.as_slice()) {
            ("GET", ["staff-info", "nursing-plans", "elderly", resident]) => {
                let resident = parse_id(resident)?;
                let plans: Vec<Value> = self
                    .plans
                    .values()
                    .filter(|p| int_field(p, &["elderlyId", "elderly_id", "residentId"]) == Some(resident))
                    .cloned()
                    .collect();
                Ok(Value::Array(plans))
            }
            ("POST", ["staff-info", "nursing-plans"]) => {
                let Some(Value::Object(mut plan)) = body else {
                    return fail(400, "plan body required");
                };
                let Some(id) = int_field(&Value::Object(plan.clone()), &["planId"]) else {
                    return fail(400, "planId required");
                };
                if self.plans.contains_key(&id) {
                    return fail(409, "plan id already exists");
                }
                plan.insert("updatedAt".to_string(), json!(self.next_stamp()));
                self.plans.insert(id, Value::Object(plan.clone()));
                Ok(Value::Object(plan))
            }
            ("PUT", ["staff-info", "nursing-plans", id]) => {
                let id = parse_id(id)?;
                let Some(current) = self.plans.get(&id) else {
                    return fail(404, "plan not found");
                };
                let Some(Value::Object(mut plan)) = body else {
                    return fail(400, "full plan record required");
                };
                if let Some(expected) = plan.remove("lastKnownUpdatedAt") {
                    if current.get("updatedAt") != Some(&expected) {
                        return fail(409, "plan was modified");
                    }
                }
                plan.insert("updatedAt".to_string(), json!(self.next_stamp()));
                self.plans.insert(id, Value::Object(plan.clone()));
                Ok(Value::Object(plan))
            }
            ("DELETE", ["staff-info", "nursing-plans", id]) => {
                let id = parse_id(id)?;
                let Some(current) = self.plans.get(&id) else {
                    return fail(404, "plan not found");
                };
                if plan_status(current) != Some(PlanStatus::Pending) {
                    return fail(409, "only pending plans can be cancelled");
                }
                self.plans.remove(&id);
                Ok(Value::Null)
            }
            ("PUT", ["staff-info", "nursing-plans", id, "payment"]) => {
                let id = parse_id(id)?;
                let stamp = self.next_stamp();
                let Some(Value::Object(plan)) = self.plans.get_mut(&id) else {
                    return fail(404, "plan not found");
                };
                if plan_status(&Value::Object(plan.clone())) != Some(PlanStatus::Unpaid) {
                    return fail(409, "plan is not awaiting payment");
                }
                // Payment completes the plan directly.
                plan.remove("status");
                plan.insert("evaluationStatus".to_string(), json!(PlanStatus::Completed.as_str()));
                plan.insert("updatedAt".to_string(), json!(stamp));
                Ok(Value::Object(plan.clone()))
            }
            ("GET", ["Activity", "open"]) => Ok(Value::Array(self.activities.clone())),
            ("GET", ["ActivityParticipation", "elderly", resident]) => {
                let resident = parse_id(resident)?;
                let rows: Vec<Value> = self
                    .participations
                    .iter()
                    .filter(|(_, r)| *r == resident)
                    .map(|(a, r)| json!({ "activityId": a, "elderlyId": r }))
                    .collect();
                Ok(Value::Array(rows))
            }
            ("POST", ["ActivityParticipation"]) => {
                let Some((activity, resident)) = body.as_ref().and_then(participation_key) else {
                    return fail(400, "activityId and elderlyId required");
                };
                self.participations.push((activity, resident));
                Ok(json!({ "activityId": activity, "elderlyId": resident }))
            }
            ("DELETE", ["ActivityParticipation"]) => {
                let Some((activity, resident)) = body.as_ref().and_then(participation_key) else {
                    return fail(400, "activityId and elderlyId required");
                };
                let before = self.participations.len();
                self.participations.retain(|(a, r)| !(*a == activity && *r == resident));
                if self.participations.len() == before {
                    return fail(404, "participation not found");
                }
                Ok(Value::Null)
            }
            ("GET", ["RoomOccupancy", "elderly", resident, "billing", "records"]) => {
                let resident = parse_id(resident)?;
                let rows: Vec<Value> = self
                    .billing
                    .values()
                    .filter(|b| int_field(b, &["elderlyId", "elderly_id"]) == Some(resident))
                    .cloned()
                    .collect();
                Ok(Value::Array(rows))
            }
            ("PUT", ["RoomOccupancy", "billing", id, "payment"]) => {
                let id = parse_id(id)?;
                let amount = body
                    .as_ref()
                    .and_then(|b| b.get("paymentAmount"))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                let Some(Value::Object(record)) = self.billing.get_mut(&id) else {
                    return fail(404, "billing record not found");
                };
                apply_room_payment(record, amount);
                Ok(Value::Object(record.clone()))
            }
            ("GET", _) => match self.fixtures.get(path) {
                Some(body) => Ok(body.clone()),
                None => fail(404, "not found"),
            },
            _ => fail(405, "unsupported route"),
        }
    }
}

fn apply_room_payment(record: &mut Map<String, Value>, amount: f64) {
    let total = record.get("totalAmount").and_then(Value::as_f64).unwrap_or(0.0);
    let paid = record.get("paidAmount").and_then(Value::as_f64).unwrap_or(0.0) + amount;
    let unpaid = (total - paid).max(0.0);
    let status = if unpaid <= 0.0 {
        PaymentStatus::Paid
    } else if paid > 0.0 {
        PaymentStatus::PartiallyPaid
    } else {
        PaymentStatus::Unpaid
    };
    record.insert("paidAmount".to_string(), json!(paid));
    record.insert("unpaidAmount".to_string(), json!(unpaid));
    record.insert("paymentStatus".to_string(), json!(status));
}

fn int_field(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn plan_status(plan: &Value) -> Option<PlanStatus> {
    ["evaluationStatus", "status"]
        .iter()
        .find_map(|key| plan.get(*key)?.as_str().and_then(|s| PlanStatus::from_str(s).ok()))
}

fn participation_key(body: &Value) -> Option<(i64, i64)> {
    Some((int_field(body, &["activityId"])?, int_field(body, &["elderlyId"])?))
}

#[async_trait]
impl CareBackend for InMemoryBackend {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.dispatch("GET", path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.dispatch("POST", path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.dispatch("PUT", path, Some(body)).await
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
        self.dispatch("DELETE", path, body).await
    }
}

// lib/src/loader/mod.rs

//! Loads everything a surface shows for one resident.
//!
//! Selecting a resident (or refreshing) fires every slice concurrently. Each
//! slice lands in the snapshot on its own and fails on its own. Every
//! response carries a ticket; a response older than what the slice already
//! shows, or for a resident that is no longer selected, is dropped.

pub mod plan_book;
pub mod sequence;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::RwLock;

use models::medical::{
    Activity, ActivityParticipation, ActivityView, CarePlan, DietRecommendation, EmergencyRecord, HealthAssessment,
    HealthMonitoringRecord, MedicalOrder, Reminder, ResidentProfile,
};
use models::{ActivityId, ResidentId, TransportError};

use crate::backend::{endpoints, CareBackend};
use crate::normalizer::tables::RESIDENT_PROFILE;
use crate::normalizer::{normalize, normalize_list, probe, resolve_latest, resolve_list, unwrap_envelope};

pub use plan_book::{fetch_plan_entries, PlanBook, PlanEntry};
pub use sequence::{SliceSequencer, SliceStore, Ticket};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Slice {
    Profile,
    Health,
    Assessments,
    MedicalOrders,
    CarePlans,
    Activities,
    Registrations,
    Diet,
    Reminders,
    Emergencies,
}

impl Slice {
    pub const ALL: [Slice; 10] = [
        Slice::Profile,
        Slice::Health,
        Slice::Assessments,
        Slice::MedicalOrders,
        Slice::CarePlans,
        Slice::Activities,
        Slice::Registrations,
        Slice::Diet,
        Slice::Reminders,
        Slice::Emergencies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Slice::Profile => "profile",
            Slice::Health => "health",
            Slice::Assessments => "assessments",
            Slice::MedicalOrders => "medical orders",
            Slice::CarePlans => "care plans",
            Slice::Activities => "activities",
            Slice::Registrations => "registrations",
            Slice::Diet => "diet",
            Slice::Reminders => "reminders",
            Slice::Emergencies => "emergencies",
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SliceState<T> {
    #[default]
    NotLoaded,
    Loaded(T),
    /// The slice's last request failed. Holds a message fit for display.
    Failed(String),
}

impl<T> SliceState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            SliceState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SliceState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SliceState::Loaded(_))
    }
}

/// The open catalog joined with one resident's registrations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityBoard {
    pub catalog: Vec<Activity>,
    pub registered: BTreeSet<ActivityId>,
}

impl ActivityBoard {
    pub fn is_registered(&self, activity_id: ActivityId) -> bool {
        self.registered.contains(&activity_id)
    }

    pub fn views(&self) -> Vec<ActivityView> {
        self.catalog
            .iter()
            .map(|activity| ActivityView {
                registered: self.is_registered(activity.activity_id),
                activity: activity.clone(),
            })
            .collect()
    }
}

/// A successfully loaded slice.
#[derive(Clone, Debug, PartialEq)]
pub enum SlicePayload {
    Profile(ResidentProfile),
    Health(Option<HealthMonitoringRecord>),
    Assessments(Vec<HealthAssessment>),
    MedicalOrders(Vec<MedicalOrder>),
    CarePlans(Vec<CarePlan>),
    Activities(Vec<Activity>),
    Registrations(BTreeSet<ActivityId>),
    Diet(Option<DietRecommendation>),
    Reminders(Vec<Reminder>),
    Emergencies(Vec<EmergencyRecord>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidentSnapshot {
    pub resident_id: ResidentId,
    pub profile: SliceState<ResidentProfile>,
    pub health: SliceState<Option<HealthMonitoringRecord>>,
    pub assessments: SliceState<Vec<HealthAssessment>>,
    pub medical_orders: SliceState<Vec<MedicalOrder>>,
    pub care_plans: SliceState<Vec<CarePlan>>,
    pub activities: SliceState<Vec<Activity>>,
    pub registrations: SliceState<BTreeSet<ActivityId>>,
    pub diet: SliceState<Option<DietRecommendation>>,
    pub reminders: SliceState<Vec<Reminder>>,
    pub emergencies: SliceState<Vec<EmergencyRecord>>,
}

impl ResidentSnapshot {
    pub fn new(resident_id: ResidentId) -> Self {
        ResidentSnapshot {
            resident_id,
            ..Default::default()
        }
    }

    fn store(&mut self, payload: SlicePayload) {
        match payload {
            SlicePayload::Profile(v) => self.profile = SliceState::Loaded(v),
            SlicePayload::Health(v) => self.health = SliceState::Loaded(v),
            SlicePayload::Assessments(v) => self.assessments = SliceState::Loaded(v),
            SlicePayload::MedicalOrders(v) => self.medical_orders = SliceState::Loaded(v),
            SlicePayload::CarePlans(v) => self.care_plans = SliceState::Loaded(v),
            SlicePayload::Activities(v) => self.activities = SliceState::Loaded(v),
            SlicePayload::Registrations(v) => self.registrations = SliceState::Loaded(v),
            SlicePayload::Diet(v) => self.diet = SliceState::Loaded(v),
            SlicePayload::Reminders(v) => self.reminders = SliceState::Loaded(v),
            SlicePayload::Emergencies(v) => self.emergencies = SliceState::Loaded(v),
        }
    }

    fn fail(&mut self, slice: Slice, message: String) {
        match slice {
            Slice::Profile => self.profile = SliceState::Failed(message),
            Slice::Health => self.health = SliceState::Failed(message),
            Slice::Assessments => self.assessments = SliceState::Failed(message),
            Slice::MedicalOrders => self.medical_orders = SliceState::Failed(message),
            Slice::CarePlans => self.care_plans = SliceState::Failed(message),
            Slice::Activities => self.activities = SliceState::Failed(message),
            Slice::Registrations => self.registrations = SliceState::Failed(message),
            Slice::Diet => self.diet = SliceState::Failed(message),
            Slice::Reminders => self.reminders = SliceState::Failed(message),
            Slice::Emergencies => self.emergencies = SliceState::Failed(message),
        }
    }

    pub fn error(&self, slice: Slice) -> Option<&str> {
        match slice {
            Slice::Profile => self.profile.error(),
            Slice::Health => self.health.error(),
            Slice::Assessments => self.assessments.error(),
            Slice::MedicalOrders => self.medical_orders.error(),
            Slice::CarePlans => self.care_plans.error(),
            Slice::Activities => self.activities.error(),
            Slice::Registrations => self.registrations.error(),
            Slice::Diet => self.diet.error(),
            Slice::Reminders => self.reminders.error(),
            Slice::Emergencies => self.emergencies.error(),
        }
    }

    /// Slices whose last request failed, with their messages.
    pub fn failures(&self) -> Vec<(Slice, &str)> {
        Slice::ALL
            .iter()
            .filter_map(|slice| self.error(*slice).map(|message| (*slice, message)))
            .collect()
    }

    pub fn latest_assessment(&self) -> Option<&HealthAssessment> {
        self.assessments.loaded().and_then(|list| list.first())
    }

    pub fn latest_medical_order(&self) -> Option<&MedicalOrder> {
        self.medical_orders.loaded().and_then(|list| list.first())
    }

    /// Available once both the catalog and the registrations are loaded.
    pub fn activity_board(&self) -> Option<ActivityBoard> {
        Some(ActivityBoard {
            catalog: self.activities.loaded()?.clone(),
            registered: self.registrations.loaded()?.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    snapshot: Option<ResidentSnapshot>,
    applied: HashMap<Slice, u64>,
}

pub struct DataLoadCoordinator {
    backend: Arc<dyn CareBackend>,
    sequencer: SliceSequencer,
    state: RwLock<LoaderState>,
    plan_book: PlanBook,
    catalog: SliceStore<(), Vec<Activity>>,
    registrations: SliceStore<ResidentId, BTreeSet<ActivityId>>,
}

impl DataLoadCoordinator {
    pub fn new(backend: Arc<dyn CareBackend>) -> Self {
        DataLoadCoordinator {
            backend,
            sequencer: SliceSequencer::new(),
            state: RwLock::new(LoaderState::default()),
            plan_book: PlanBook::new(),
            catalog: SliceStore::new(),
            registrations: SliceStore::new(),
        }
    }

    pub fn backend(&self) -> &dyn CareBackend {
        self.backend.as_ref()
    }

    pub fn sequencer(&self) -> &SliceSequencer {
        &self.sequencer
    }

    pub fn plan_book(&self) -> &PlanBook {
        &self.plan_book
    }

    pub async fn selected(&self) -> Option<ResidentId> {
        self.state.read().await.snapshot.as_ref().map(|s| s.resident_id)
    }

    pub async fn snapshot(&self) -> Option<ResidentSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    /// Makes `resident_id` the current resident and loads all of its slices.
    /// Re-selecting the current resident keeps what is already shown while
    /// the refresh runs.
    pub async fn select_resident(&self, resident_id: ResidentId) -> ResidentSnapshot {
        {
            let mut state = self.state.write().await;
            if state.snapshot.as_ref().map(|s| s.resident_id) != Some(resident_id) {
                info!("Selected resident {}", resident_id);
                state.snapshot = Some(ResidentSnapshot::new(resident_id));
                state.applied.clear();
            }
        }
        self.refresh()
            .await
            .unwrap_or_else(|| ResidentSnapshot::new(resident_id))
    }

    pub async fn clear_selection(&self) {
        let mut state = self.state.write().await;
        state.snapshot = None;
        state.applied.clear();
    }

    /// Re-issues every slice for the selected resident and returns the
    /// snapshot once all of them settled. `None` when nobody is selected.
    pub async fn refresh(&self) -> Option<ResidentSnapshot> {
        let resident_id = self.selected().await?;
        let seq = self.sequencer.next();
        let ticket = move |slice: Slice| Ticket { slice, resident_id, seq };
        debug!("Refreshing resident {} (batch {})", resident_id, seq);

        let aggregate_slices = async {
            let aggregate = match self.backend.get(&endpoints::elderly_record(resident_id)).await {
                Ok(body) => {
                    let raw = probe(&body, RESIDENT_PROFILE.candidate_keys).unwrap_or_else(|| unwrap_envelope(&body));
                    let mut profile: ResidentProfile = normalize(raw);
                    if profile.resident_id.is_unset() {
                        profile.resident_id = resident_id;
                    }
                    self.apply(ticket(Slice::Profile), Ok(SlicePayload::Profile(profile))).await;
                    body
                }
                Err(e) => {
                    self.apply(ticket(Slice::Profile), Err(e)).await;
                    // Every other slice still has its own endpoint.
                    Value::Null
                }
            };
            self.load_from_aggregate(resident_id, &aggregate, ticket).await;
        };

        futures::join!(
            aggregate_slices,
            self.load_plans(ticket(Slice::CarePlans)),
            self.load_catalog(ticket(Slice::Activities)),
            self.load_registrations(ticket(Slice::Registrations)),
        );

        self.snapshot().await
    }

    async fn load_from_aggregate(&self, resident_id: ResidentId, aggregate: &Value, ticket: impl Fn(Slice) -> Ticket + Copy + Send) {
        let backend = self.backend.as_ref();
        let loads = vec![
            async move {
                let outcome = resolve_latest::<HealthMonitoringRecord>(backend, resident_id, aggregate).await;
                self.apply(ticket(Slice::Health), outcome.map(SlicePayload::Health)).await;
            }
            .boxed(),
            async move {
                let outcome = resolve_list::<HealthAssessment>(backend, resident_id, aggregate).await;
                self.apply(ticket(Slice::Assessments), outcome.map(SlicePayload::Assessments)).await;
            }
            .boxed(),
            async move {
                let outcome = resolve_list::<MedicalOrder>(backend, resident_id, aggregate).await;
                self.apply(ticket(Slice::MedicalOrders), outcome.map(SlicePayload::MedicalOrders)).await;
            }
            .boxed(),
            async move {
                let outcome = resolve_latest::<DietRecommendation>(backend, resident_id, aggregate).await;
                self.apply(ticket(Slice::Diet), outcome.map(SlicePayload::Diet)).await;
            }
            .boxed(),
            async move {
                let outcome = resolve_list::<Reminder>(backend, resident_id, aggregate).await;
                self.apply(ticket(Slice::Reminders), outcome.map(SlicePayload::Reminders)).await;
            }
            .boxed(),
            async move {
                let outcome = resolve_list::<EmergencyRecord>(backend, resident_id, aggregate).await;
                self.apply(ticket(Slice::Emergencies), outcome.map(SlicePayload::Emergencies)).await;
            }
            .boxed(),
        ];
        join_all(loads).await;
    }

    /// Reloads one resident's care plans into the plan book, and into the
    /// snapshot when that resident is selected.
    pub async fn reload_plans(&self, resident_id: ResidentId) -> Result<Vec<CarePlan>, TransportError> {
        self.load_plans(self.sequencer.issue(Slice::CarePlans, resident_id)).await
    }

    pub async fn reload_catalog(&self, resident_id: ResidentId) -> Result<Vec<Activity>, TransportError> {
        self.load_catalog(self.sequencer.issue(Slice::Activities, resident_id)).await
    }

    pub async fn reload_registrations(&self, resident_id: ResidentId) -> Result<BTreeSet<ActivityId>, TransportError> {
        self.load_registrations(self.sequencer.issue(Slice::Registrations, resident_id)).await
    }

    pub async fn catalog(&self) -> Option<Vec<Activity>> {
        self.catalog.get(&()).await
    }

    pub async fn registrations(&self, resident_id: ResidentId) -> Option<BTreeSet<ActivityId>> {
        self.registrations.get(&resident_id).await
    }

    /// Forgets a resident's registrations so the next read reloads them.
    pub async fn invalidate_registrations(&self, resident_id: ResidentId) {
        self.registrations.invalidate(&resident_id).await;
    }

    async fn load_plans(&self, ticket: Ticket) -> Result<Vec<CarePlan>, TransportError> {
        let outcome = match fetch_plan_entries(self.backend.as_ref(), ticket.resident_id).await {
            Ok(entries) => {
                if !self.plan_book.apply(ticket.resident_id, ticket.seq, entries).await {
                    debug!("Discarding stale plan list for resident {}", ticket.resident_id);
                }
                Ok(self.plan_book.plans(ticket.resident_id).await.unwrap_or_default())
            }
            Err(e) => Err(e),
        };
        self.apply(ticket, outcome.clone().map(SlicePayload::CarePlans)).await;
        outcome
    }

    async fn load_catalog(&self, ticket: Ticket) -> Result<Vec<Activity>, TransportError> {
        let outcome = self
            .backend
            .get(endpoints::OPEN_ACTIVITIES)
            .await
            .map(|body| normalize_list::<Activity>(&body));
        let outcome = match outcome {
            Ok(catalog) => {
                if !self.catalog.apply((), ticket.seq, catalog).await {
                    debug!("Discarding stale activity catalog");
                }
                Ok(self.catalog.get(&()).await.unwrap_or_default())
            }
            Err(e) => Err(e),
        };
        self.apply(ticket, outcome.clone().map(SlicePayload::Activities)).await;
        outcome
    }

    async fn load_registrations(&self, ticket: Ticket) -> Result<BTreeSet<ActivityId>, TransportError> {
        let outcome = self
            .backend
            .get(&endpoints::registered_activities(ticket.resident_id))
            .await
            .map(|body| {
                normalize_list::<ActivityParticipation>(&body)
                    .into_iter()
                    .map(|p| p.activity_id)
                    .filter(|id| !id.is_unset())
                    .collect::<BTreeSet<_>>()
            });
        let outcome = match outcome {
            Ok(registered) => {
                if !self.registrations.apply(ticket.resident_id, ticket.seq, registered).await {
                    debug!("Discarding stale registrations for resident {}", ticket.resident_id);
                }
                Ok(self.registrations.get(&ticket.resident_id).await.unwrap_or_default())
            }
            Err(e) => Err(e),
        };
        self.apply(ticket, outcome.clone().map(SlicePayload::Registrations)).await;
        outcome
    }

    /// Applies one slice response to the snapshot. Returns false when the
    /// response was stale or for another resident.
    async fn apply(&self, ticket: Ticket, outcome: Result<SlicePayload, TransportError>) -> bool {
        let mut state = self.state.write().await;
        let LoaderState { snapshot, applied } = &mut *state;
        let Some(snapshot) = snapshot.as_mut().filter(|s| s.resident_id == ticket.resident_id) else {
            debug!(
                "Discarding {} response for resident {}, no longer selected",
                ticket.slice, ticket.resident_id
            );
            return false;
        };
        let last = applied.get(&ticket.slice).copied().unwrap_or(0);
        if ticket.seq < last {
            debug!("Discarding stale {} response ({} < {})", ticket.slice, ticket.seq, last);
            return false;
        }
        applied.insert(ticket.slice, ticket.seq);
        match outcome {
            Ok(payload) => snapshot.store(payload),
            Err(e) => {
                warn!("Loading {} for resident {} failed: {}", ticket.slice, ticket.resident_id, e);
                snapshot.fail(ticket.slice, e.to_string());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use models::medical::{HealthStatus, PlanStatus};
    use serde_json::json;
    use tokio::sync::Semaphore;

    use crate::backend::InMemoryBackend;

    /// Holds the first GET of one path until the test releases it. The
    /// response is computed before waiting, so it carries the data as it was
    /// when the request was issued.
    struct GatedBackend {
        inner: InMemoryBackend,
        gated_path: String,
        gate: Semaphore,
        armed: AtomicBool,
    }

    impl GatedBackend {
        fn new(inner: InMemoryBackend, gated_path: &str) -> Self {
            GatedBackend {
                inner,
                gated_path: gated_path.to_string(),
                gate: Semaphore::new(0),
                armed: AtomicBool::new(true),
            }
        }

        async fn wait_until_gated(&self) {
            let call = format!("GET {}", self.gated_path);
            while !self.inner.calls().await.contains(&call) {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl CareBackend for GatedBackend {
        async fn get(&self, path: &str) -> Result<Value, TransportError> {
            let response = self.inner.get(path).await;
            if path == self.gated_path && self.armed.swap(false, Ordering::SeqCst) {
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }
            response
        }

        async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
            self.inner.post(path, body).await
        }

        async fn put(&self, path: &str, body: Value) -> Result<Value, TransportError> {
            self.inner.put(path, body).await
        }

        async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, TransportError> {
            self.inner.delete(path, body).await
        }
    }

    fn resident_backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_fixture(
                "/ElderlyRecord/7",
                json!({"code": 200, "data": {
                    "elderlyId": 7,
                    "elderlyName": "Li Wei",
                    "healthMonitorings": [
                        {"monitoringId": 1, "monitoringDate": "2026-01-01T08:00:00", "bloodPressure": "120/80"},
                        {"monitoringId": 2, "monitoringDate": "2026-01-02T08:00:00", "abnormalFlag": true},
                    ],
                    "medicalOrders": [{"orderId": 4, "medicineName": "Aspirin", "orderDate": "2026-01-02"}],
                }}),
            )
            .with_fixture("/ElderlyRecord/8", json!({"elderlyId": 8, "name": "Zhao Min"}))
            .with_fixture("/HealthAssessment/elderly/7", json!([{"assessmentId": 3, "healthGrade": "B"}]))
            .with_fixture("/DietRecommendation/7", json!({"dietType": "Low salt"}))
            .with_fixture("/Reminder/elderly/7", json!([]))
            .with_fixture("/EmergencyService/elderly/7", json!(null))
            .with_plan(json!({"planId": 1, "elderlyId": 7, "evaluationStatus": "Pending", "priority": "Low"}))
            .with_plan(json!({"planId": 2, "elderlyId": 8, "evaluationStatus": "Unpaid", "priority": "High"}))
            .with_activity(json!({"activityId": 31, "activityName": "Calligraphy"}))
            .with_activity(json!({"activityId": 32, "activityName": "Tai chi"}))
            .with_participation(32, 7)
    }

    #[tokio::test]
    async fn select_loads_every_slice() {
        let loader = DataLoadCoordinator::new(Arc::new(resident_backend()));
        let snapshot = loader.select_resident(ResidentId(7)).await;

        assert_eq!(snapshot.profile.loaded().map(|p| p.name.as_str()), Some("Li Wei"));
        let health = snapshot.health.loaded().cloned().flatten().unwrap();
        assert_eq!(health.monitoring_id, 2);
        assert_eq!(health.status, HealthStatus::Abnormal);
        assert_eq!(snapshot.latest_assessment().map(|a| a.health_grade.as_str()), Some("B"));
        assert_eq!(snapshot.latest_medical_order().map(|o| o.medicine_name.as_str()), Some("Aspirin"));
        assert_eq!(snapshot.diet.loaded().cloned().flatten().map(|d| d.diet_type), Some("Low salt".to_string()));
        assert_eq!(snapshot.reminders, SliceState::Loaded(vec![]));
        assert_eq!(snapshot.emergencies, SliceState::Loaded(vec![]));
        assert_eq!(snapshot.care_plans.loaded().map(Vec::len), Some(1));

        let board = snapshot.activity_board().unwrap();
        assert!(board.is_registered(ActivityId(32)));
        assert!(!board.is_registered(ActivityId(31)));
        assert!(snapshot.failures().is_empty());
        assert_eq!(loader.plan_book().plans(ResidentId(7)).await.map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn a_failing_slice_does_not_stop_the_others() {
        let backend = resident_backend();
        backend.fail("GET", "/DietRecommendation/7", 500).await;
        backend.fail("GET", "/Activity/open", 503).await;
        let loader = DataLoadCoordinator::new(Arc::new(backend));

        let snapshot = loader.select_resident(ResidentId(7)).await;
        let failed: Vec<Slice> = snapshot.failures().into_iter().map(|(slice, _)| slice).collect();
        assert_eq!(failed, vec![Slice::Activities, Slice::Diet]);
        assert!(snapshot.health.is_loaded());
        assert!(snapshot.registrations.is_loaded());
        assert!(snapshot.activity_board().is_none());
    }

    #[tokio::test]
    async fn aggregate_failure_falls_back_to_dedicated_endpoints() {
        let backend = resident_backend().with_fixture(
            "/HealthMonitoring/elderly/7/history",
            json!([{"monitoringId": 9, "heartRate": 70}]),
        );
        backend.fail("GET", "/ElderlyRecord/7", 502).await;
        let loader = DataLoadCoordinator::new(Arc::new(backend));

        let snapshot = loader.select_resident(ResidentId(7)).await;
        assert!(snapshot.profile.error().is_some_and(|m| m.contains("502")));
        assert_eq!(snapshot.health.loaded().cloned().flatten().map(|h| h.monitoring_id), Some(9));
        assert!(snapshot.medical_orders.error().is_some());
        assert!(snapshot.assessments.is_loaded());
    }

    #[tokio::test]
    async fn stale_plan_response_is_discarded() {
        let backend = Arc::new(GatedBackend::new(resident_backend(), "/staff-info/nursing-plans/elderly/7"));
        let loader = Arc::new(DataLoadCoordinator::new(backend.clone()));

        let first = tokio::spawn({
            let loader = loader.clone();
            async move { loader.select_resident(ResidentId(7)).await }
        });
        backend.wait_until_gated().await;

        backend.inner.set_plan_status(1, PlanStatus::Scheduled).await;
        let second = loader.refresh().await.unwrap();
        assert_eq!(second.care_plans.loaded().unwrap()[0].status, PlanStatus::Scheduled);

        backend.gate.add_permits(1);
        first.await.unwrap();

        let snapshot = loader.snapshot().await.unwrap();
        assert_eq!(snapshot.care_plans.loaded().unwrap()[0].status, PlanStatus::Scheduled);
        let book = loader.plan_book().plans(ResidentId(7)).await.unwrap();
        assert_eq!(book[0].status, PlanStatus::Scheduled);
    }

    #[tokio::test]
    async fn responses_for_a_previous_resident_are_dropped() {
        let backend = Arc::new(GatedBackend::new(resident_backend(), "/staff-info/nursing-plans/elderly/7"));
        let loader = Arc::new(DataLoadCoordinator::new(backend.clone()));

        let first = tokio::spawn({
            let loader = loader.clone();
            async move { loader.select_resident(ResidentId(7)).await }
        });
        backend.wait_until_gated().await;

        let other = loader.select_resident(ResidentId(8)).await;
        assert_eq!(other.resident_id, ResidentId(8));

        backend.gate.add_permits(1);
        first.await.unwrap();

        let snapshot = loader.snapshot().await.unwrap();
        assert_eq!(snapshot.resident_id, ResidentId(8));
        assert_eq!(snapshot.care_plans.loaded().unwrap()[0].plan_id, models::PlanId(2));
        assert_eq!(snapshot.profile.loaded().map(|p| p.name.as_str()), Some("Zhao Min"));
    }

    #[tokio::test]
    async fn late_reload_returns_the_newer_registrations() {
        let backend = Arc::new(GatedBackend::new(resident_backend(), "/ActivityParticipation/elderly/7"));
        let loader = Arc::new(DataLoadCoordinator::new(backend.clone()));

        let first = tokio::spawn({
            let loader = loader.clone();
            async move { loader.reload_registrations(ResidentId(7)).await }
        });
        backend.wait_until_gated().await;

        backend
            .inner
            .post(endpoints::ACTIVITY_PARTICIPATION, json!({"activityId": 31, "elderlyId": 7}))
            .await
            .unwrap();
        let newer = loader.reload_registrations(ResidentId(7)).await.unwrap();
        assert_eq!(newer, BTreeSet::from([ActivityId(31), ActivityId(32)]));

        backend.gate.add_permits(1);
        let late = first.await.unwrap().unwrap();
        assert_eq!(late, newer);
        assert_eq!(loader.registrations(ResidentId(7)).await, Some(newer));
    }

    #[tokio::test]
    async fn refresh_without_selection_is_none() {
        let loader = DataLoadCoordinator::new(Arc::new(InMemoryBackend::new()));
        assert!(loader.refresh().await.is_none());
    }
}

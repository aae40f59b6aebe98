// lib/src/activity/mod.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{info, warn};
use serde_json::json;

use models::medical::{Activity, Actor};
use models::{ActivityId, CareError, CareResult, DomainConflict, ResidentId, TransportError};

use crate::backend::endpoints;
use crate::loader::{ActivityBoard, DataLoadCoordinator};

/// Registers residents for activities and keeps the registered set in step
/// with the backend. Registration is the existence of a participation row;
/// after every change the set is reloaded whole.
pub struct ActivityRegistrationCoordinator {
    loader: Arc<DataLoadCoordinator>,
}

impl ActivityRegistrationCoordinator {
    pub fn new(loader: Arc<DataLoadCoordinator>) -> Self {
        ActivityRegistrationCoordinator { loader }
    }

    pub async fn reload_catalog(&self, resident_id: ResidentId) -> CareResult<Vec<Activity>> {
        Ok(self.loader.reload_catalog(resident_id).await?)
    }

    pub async fn reload_registered(&self, resident_id: ResidentId) -> CareResult<BTreeSet<ActivityId>> {
        Ok(self.loader.reload_registrations(resident_id).await?)
    }

    async fn registered(&self, resident_id: ResidentId) -> CareResult<BTreeSet<ActivityId>> {
        match self.loader.registrations(resident_id).await {
            Some(set) => Ok(set),
            None => self.reload_registered(resident_id).await,
        }
    }

    /// Catalog and registrations, each loaded when missing.
    pub async fn board(&self, resident_id: ResidentId) -> CareResult<ActivityBoard> {
        let catalog = match self.loader.catalog().await {
            Some(catalog) => catalog,
            None => self.reload_catalog(resident_id).await?,
        };
        Ok(ActivityBoard {
            catalog,
            registered: self.registered(resident_id).await?,
        })
    }

    pub async fn is_registered(&self, resident_id: ResidentId, activity_id: ActivityId) -> CareResult<bool> {
        Ok(self.registered(resident_id).await?.contains(&activity_id))
    }

    /// Creates the participation row for `(activity_id, resident_id)`.
    /// Nothing stops two submissions racing each other before the reload.
    pub async fn register(&self, actor: &Actor, activity_id: ActivityId, resident_id: ResidentId) -> CareResult<()> {
        self.check_actor(actor, resident_id, "register")?;
        if self.is_registered(resident_id, activity_id).await? {
            return Err(DomainConflict::AlreadyRegistered {
                activity_id,
                resident_id,
            }
            .into());
        }

        let body = participation_body(activity_id, resident_id);
        if let Err(e) = self.loader.backend().post(endpoints::ACTIVITY_PARTICIPATION, body).await {
            return Err(self
                .rejected(e, resident_id, DomainConflict::AlreadyRegistered { activity_id, resident_id })
                .await);
        }
        info!("Resident {} registered for activity {}", resident_id, activity_id);
        self.reload_after(resident_id).await;
        Ok(())
    }

    /// Deletes the participation row for `(activity_id, resident_id)`.
    pub async fn cancel(&self, actor: &Actor, activity_id: ActivityId, resident_id: ResidentId) -> CareResult<()> {
        self.check_actor(actor, resident_id, "cancel registration")?;
        if !self.is_registered(resident_id, activity_id).await? {
            return Err(DomainConflict::NotRegistered {
                activity_id,
                resident_id,
            }
            .into());
        }

        let body = participation_body(activity_id, resident_id);
        if let Err(e) = self
            .loader
            .backend()
            .delete(endpoints::ACTIVITY_PARTICIPATION, Some(body))
            .await
        {
            return Err(self
                .rejected(e, resident_id, DomainConflict::NotRegistered { activity_id, resident_id })
                .await);
        }
        info!("Resident {} left activity {}", resident_id, activity_id);
        self.reload_after(resident_id).await;
        Ok(())
    }

    fn check_actor(&self, actor: &Actor, resident_id: ResidentId, operation: &'static str) -> CareResult<()> {
        if actor.acts_for(resident_id) {
            return Ok(());
        }
        Err(DomainConflict::NotPermitted {
            actor: actor.to_string(),
            operation,
        }
        .into())
    }

    async fn rejected(&self, error: TransportError, resident_id: ResidentId, conflict: DomainConflict) -> CareError {
        if error.is_conflict() || error.is_not_found() {
            warn!("Backend rejected participation change: {}", error);
            self.loader.invalidate_registrations(resident_id).await;
            conflict.into()
        } else {
            error.into()
        }
    }

    async fn reload_after(&self, resident_id: ResidentId) {
        if let Err(e) = self.loader.reload_registrations(resident_id).await {
            warn!("Reloading registrations of resident {} failed: {}", resident_id, e);
            self.loader.invalidate_registrations(resident_id).await;
        }
    }
}

fn participation_body(activity_id: ActivityId, resident_id: ResidentId) -> serde_json::Value {
    json!({ "activityId": activity_id, "elderlyId": resident_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CareBackend, InMemoryBackend, MockCareBackend};
    use models::StaffId;

    const RESIDENT: ResidentId = ResidentId(7);

    fn coordinator_over(backend: Arc<dyn CareBackend>) -> ActivityRegistrationCoordinator {
        ActivityRegistrationCoordinator::new(Arc::new(DataLoadCoordinator::new(backend)))
    }

    fn club_backend() -> Arc<InMemoryBackend> {
        Arc::new(
            InMemoryBackend::new()
                .with_activity(json!({"activityId": 31, "activityName": "Calligraphy", "activityDate": "2026-04-02"}))
                .with_activity(json!({"id": 32, "name": "Tai chi", "capacity": "20"}))
                .with_participation(32, 7),
        )
    }

    #[tokio::test]
    async fn board_marks_registered_activities() {
        let activities = coordinator_over(club_backend());
        let board = activities.board(RESIDENT).await.unwrap();
        let views = board.views();
        assert_eq!(views.len(), 2);
        let tai_chi = views.iter().find(|v| v.activity.activity_id == ActivityId(32)).unwrap();
        assert!(tai_chi.registered);
        assert_eq!(tai_chi.activity.max_participants, 20);
        assert!(!activities.is_registered(RESIDENT, ActivityId(31)).await.unwrap());
    }

    #[tokio::test]
    async fn register_then_cancel_reloads_the_set() {
        let backend = club_backend();
        let activities = coordinator_over(backend.clone());
        let resident = Actor::Resident(RESIDENT);

        activities.register(&resident, ActivityId(31), RESIDENT).await.unwrap();
        assert!(activities.is_registered(RESIDENT, ActivityId(31)).await.unwrap());
        assert_eq!(backend.participation_count(31, 7).await, 1);

        activities.cancel(&resident, ActivityId(31), RESIDENT).await.unwrap();
        assert!(!activities.is_registered(RESIDENT, ActivityId(31)).await.unwrap());
        assert_eq!(backend.participation_count(31, 7).await, 0);
    }

    #[tokio::test]
    async fn registering_twice_is_caught_locally() {
        let backend = club_backend();
        let activities = coordinator_over(backend.clone());
        let family = Actor::Family { resident_id: RESIDENT };

        let result = activities.register(&family, ActivityId(32), RESIDENT).await;
        assert_eq!(
            result,
            Err(DomainConflict::AlreadyRegistered {
                activity_id: ActivityId(32),
                resident_id: RESIDENT
            }
            .into())
        );
        assert_eq!(backend.participation_count(32, 7).await, 1);
        assert!(!backend.calls().await.iter().any(|c| c.starts_with("POST")));
    }

    #[tokio::test]
    async fn cancelling_an_unregistered_activity() {
        let activities = coordinator_over(club_backend());
        let result = activities.cancel(&Actor::Resident(RESIDENT), ActivityId(31), RESIDENT).await;
        let conflict = result.unwrap_err();
        assert!(conflict.is_recoverable());
        assert!(matches!(conflict.as_conflict(), Some(DomainConflict::NotRegistered { .. })));
    }

    #[tokio::test]
    async fn removed_elsewhere_maps_to_not_registered() {
        let backend = club_backend();
        let activities = coordinator_over(backend.clone());
        activities.reload_registered(RESIDENT).await.unwrap();

        backend.fail("DELETE", "/ActivityParticipation", 404).await;
        let result = activities.cancel(&Actor::Resident(RESIDENT), ActivityId(32), RESIDENT).await;
        assert!(matches!(
            result,
            Err(CareError::Conflict(DomainConflict::NotRegistered { .. }))
        ));
        assert!(activities.loader.registrations(RESIDENT).await.is_none());
    }

    #[tokio::test]
    async fn only_the_resident_or_their_family_may_register() {
        let activities = coordinator_over(Arc::new(MockCareBackend::new()));
        for actor in [Actor::Visitor, Actor::Staff(StaffId(40)), Actor::Family { resident_id: ResidentId(8) }] {
            let result = activities.register(&actor, ActivityId(31), RESIDENT).await;
            assert!(matches!(
                result,
                Err(CareError::Conflict(DomainConflict::NotPermitted { .. }))
            ));
        }
    }
}

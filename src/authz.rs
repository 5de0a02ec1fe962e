use sqlx::types::Uuid;

use crate::db::models::{AvailabilityBlock, RescheduleRequest, ScheduleReservation};

/// Entities with a single owning party for write purposes.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for AvailabilityBlock {
    fn owner_id(&self) -> Uuid {
        self.provider_user_id
    }
}

impl Owned for ScheduleReservation {
    fn owner_id(&self) -> Uuid {
        self.provider_user_id
    }
}

/// Pure ownership predicate composed by the request layer; the core never
/// raises authorization errors itself.
pub fn is_owner(actor_id: Uuid, entity: &impl Owned) -> bool {
    entity.owner_id() == actor_id
}

/// The named counterparty whose approval a reschedule request requires.
pub fn is_counterparty(actor_id: Uuid, request: &RescheduleRequest) -> bool {
    request.requested_for == actor_id
}

/// Either side of a reschedule negotiation.
pub fn is_participant(actor_id: Uuid, request: &RescheduleRequest) -> bool {
    request.requested_by == actor_id || request.requested_for == actor_id
}

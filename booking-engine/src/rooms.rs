use async_trait::async_trait;
use core_types::{CallType, SessionId};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("room provisioning failed: {0}")]
pub struct RoomError(pub String);

/// A provisioned call room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub join_link: String,
}

/// Allocates call rooms. The engine gives an implementor a short window
/// to answer; a slow one is bypassed in favor of the local fallback,
/// while an outright error fails (and rolls back) the booking.
#[async_trait]
pub trait RoomProvisioning: Send + Sync {
    async fn provision(&self, session: &SessionId, call_type: CallType) -> Result<Room, RoomError>;
}

/// Local room provisioner: mints a random room id and builds the join
/// link from the frontend base url. Used both as the default provisioner
/// and as the fallback when an external one is too slow.
pub struct FallbackRoomProvisioner {
    frontend_url: String,
}

impl FallbackRoomProvisioner {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
        }
    }

    pub fn make_room(&self, call_type: CallType) -> Room {
        let room_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        let join_link = format!("{}/{}/{room_id}", self.frontend_url, call_type);
        Room { room_id, join_link }
    }
}

#[async_trait]
impl RoomProvisioning for FallbackRoomProvisioner {
    async fn provision(&self, _session: &SessionId, call_type: CallType) -> Result<Room, RoomError> {
        Ok(self.make_room(call_type))
    }
}

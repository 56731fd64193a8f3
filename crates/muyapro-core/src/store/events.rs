use serde::Serialize;

use crate::models::{RequestStatus, UserMode};

/// Change notifications broadcast to store subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ModeChanged {
        mode: UserMode,
    },
    LoggedIn,
    LoggedOut,
    UserUpdated,
    RequestAdded {
        request_id: String,
    },
    RequestUpdated {
        request_id: String,
        status: RequestStatus,
    },
    NotificationsChanged {
        unread: usize,
    },
    MessageAppended {
        channel_id: String,
        message_id: String,
    },
}

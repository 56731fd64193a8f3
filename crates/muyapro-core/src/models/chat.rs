use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserMode;

/// Channel id of the customer support thread. Every other channel is a job id.
pub const SUPPORT_CHANNEL: &str = "support";

/// Channel id -> chronological message list
pub type Chats = BTreeMap<String, Vec<Message>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Sender {
    Customer,
    Technician,
    Support,
}

impl Sender {
    /// Messages typed by the user are attributed to their current role.
    /// A missing role falls back to technician.
    pub fn for_mode(mode: Option<UserMode>) -> Self {
        match mode {
            Some(UserMode::Customer) => Sender::Customer,
            _ => Sender::Technician,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::Customer => write!(f, "customer"),
            Sender::Technician => write!(f, "technician"),
            Sender::Support => write!(f, "support"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

pub fn is_support_channel(channel_id: &str) -> bool {
    channel_id == SUPPORT_CHANNEL
}

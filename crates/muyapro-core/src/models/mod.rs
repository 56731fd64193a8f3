//! Data models for MuyaPro entities.
//!
//! This module contains the JSON-serializable structures held by the
//! local store and mirrored to the durable cache:
//!
//! - `UserMode`, `UserProfile`, `ProfilePatch`: the signed-in user and edits to it
//! - `ServiceRequest`, `RequestStatus`, `Technician`: customer job requests
//! - `Notification`, `NewNotification`: in-app notices
//! - `Message`, `Chats`: per-channel conversation threads

pub mod chat;
pub mod notification;
pub mod request;
pub mod user;

pub use chat::{is_support_channel, Chats, Message, Sender, SUPPORT_CHANNEL};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use request::{
    Location, RequestStatus, ServiceRequest, ServiceRequestDraft, Technician, Urgency,
};
pub use user::{ProfileError, ProfilePatch, UserMode, UserProfile};

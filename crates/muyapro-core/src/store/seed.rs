//! Sample data written to an empty store when seeding is enabled.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::{
    Chats, Location, Message, Notification, NotificationKind, RequestStatus, Sender,
    ServiceRequest, Technician, SUPPORT_CHANNEL,
};

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .unwrap_or_default()
}

pub fn sample_requests() -> Vec<ServiceRequest> {
    vec![
        ServiceRequest {
            id: "req_1".to_string(),
            category: "IT Support".to_string(),
            service: "Laptop Repair".to_string(),
            description: "Screen is flickering and sometimes goes black.".to_string(),
            status: RequestStatus::Completed,
            date: at(2025, 11, 25, 14, 30),
            technician: Some(Technician::new("Dawit Abraham", "+251911000000")),
            price: Some(1500),
            rating: Some(5),
            urgency: None,
            images: Vec::new(),
            location: Some(Location {
                latitude: 9.0,
                longitude: 38.7,
            }),
            preferred_time: Some("Afternoon".to_string()),
        },
        ServiceRequest {
            id: "req_2".to_string(),
            category: "Plumbing".to_string(),
            service: "Leak Fix".to_string(),
            description: "Kitchen sink pipe is leaking water.".to_string(),
            status: RequestStatus::InProgress,
            date: at(2025, 11, 28, 9, 0),
            technician: Some(Technician::new("Samuel Tadesse", "+251922000000")),
            price: Some(800),
            rating: None,
            urgency: None,
            images: Vec::new(),
            location: Some(Location {
                latitude: 9.01,
                longitude: 38.75,
            }),
            preferred_time: Some("Morning".to_string()),
        },
        ServiceRequest {
            id: "req_3".to_string(),
            category: "Electrical".to_string(),
            service: "Wiring Check".to_string(),
            description: "Living room sockets not working.".to_string(),
            status: RequestStatus::Pending,
            date: at(2025, 11, 28, 10, 30),
            technician: None,
            price: None,
            rating: None,
            urgency: None,
            images: Vec::new(),
            location: Some(Location {
                latitude: 9.02,
                longitude: 38.74,
            }),
            preferred_time: Some("Now".to_string()),
        },
    ]
}

pub fn sample_notifications(now: DateTime<Utc>) -> Vec<Notification> {
    vec![
        Notification {
            id: "notif_1".to_string(),
            title: "Welcome to MuyaPro".to_string(),
            message: "Find the best technicians in town!".to_string(),
            kind: NotificationKind::Info,
            timestamp: now - Duration::days(1),
            read: true,
        },
        Notification {
            id: "notif_2".to_string(),
            title: "Technician Assigned".to_string(),
            message: "Samuel Tadesse has accepted your plumbing request.".to_string(),
            kind: NotificationKind::Success,
            timestamp: now - Duration::hours(1),
            read: false,
        },
    ]
}

pub fn sample_chats(now: DateTime<Utc>) -> Chats {
    let mut chats = Chats::new();
    chats.insert(
        "job_1".to_string(),
        vec![
            Message {
                id: "1".to_string(),
                text: "Hello! I have accepted your request.".to_string(),
                sender: Sender::Technician,
                timestamp: now - Duration::seconds(3600),
            },
            Message {
                id: "2".to_string(),
                text: "Great! When can you arrive?".to_string(),
                sender: Sender::Customer,
                timestamp: now - Duration::seconds(3500),
            },
        ],
    );
    chats.insert(
        SUPPORT_CHANNEL.to_string(),
        vec![Message {
            id: "1".to_string(),
            text: "Welcome to MuyaPro Support! How can we help you today?".to_string(),
            sender: Sender::Support,
            timestamp: now - Duration::days(1),
        }],
    );
    chats
}

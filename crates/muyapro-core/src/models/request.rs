use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a customer service request.
///
/// Requests start `Pending`, move to `Assigned` once a technician accepts,
/// then `In Progress` and `Completed`. `Cancelled` ends a request early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RequestStatus {
    Pending,
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn all() -> [RequestStatus; 5] {
        [
            RequestStatus::Pending,
            RequestStatus::Assigned,
            RequestStatus::InProgress,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ]
    }

    /// Assigned or in progress: a technician is working on it
    pub fn is_active(&self) -> bool {
        matches!(self, RequestStatus::Assigned | RequestStatus::InProgress)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Assigned => write!(f, "Assigned"),
            RequestStatus::InProgress => write!(f, "In Progress"),
            RequestStatus::Completed => write!(f, "Completed"),
            RequestStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "assigned" => Ok(RequestStatus::Assigned),
            "inprogress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            "cancelled" | "canceled" => Ok(RequestStatus::Cancelled),
            _ => Err(format!("unknown request status '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Urgency {
    Low,
    Normal,
    High,
    Urgent,
}

impl Urgency {
    /// Expected response window shown next to the urgency choice
    pub fn description(&self) -> &'static str {
        match self {
            Urgency::Low => "Can wait a few days",
            Urgency::Normal => "Within 24 hours",
            Urgency::High => "Today",
            Urgency::Urgent => "Immediate",
        }
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "normal" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            "urgent" => Ok(Urgency::Urgent),
            other => Err(format!("unknown urgency '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Technician {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl Technician {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            rating: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ServiceRequest {
    pub id: String,
    pub category: String,
    pub service: String,
    #[serde(default)]
    pub description: String,
    pub status: RequestStatus,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub technician: Option<Technician>,
    /// Quoted price in birr
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,
}

impl ServiceRequest {
    pub fn technician_name(&self) -> Option<&str> {
        self.technician.as_ref().map(|t| t.name.as_str())
    }
}

/// Caller-supplied fields for a new request. The store fills in the id and date.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequestDraft {
    pub category: String,
    pub service: String,
    pub description: String,
    pub status: Option<RequestStatus>,
    pub urgency: Option<Urgency>,
    pub images: Vec<String>,
    pub price: Option<u32>,
    pub location: Option<Location>,
    pub preferred_time: Option<String>,
}

impl ServiceRequestDraft {
    pub fn new(
        category: impl Into<String>,
        service: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            service: service.into(),
            description: description.into(),
            status: None,
            urgency: None,
            images: Vec::new(),
            price: None,
            location: None,
            preferred_time: None,
        }
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub(crate) fn into_request(self, id: String, date: DateTime<Utc>) -> ServiceRequest {
        ServiceRequest {
            id,
            category: self.category,
            service: self.service,
            description: self.description,
            status: self.status.unwrap_or(RequestStatus::Pending),
            date,
            technician: None,
            price: self.price,
            rating: None,
            urgency: self.urgency,
            images: self.images,
            location: self.location,
            preferred_time: self.preferred_time,
        }
    }
}

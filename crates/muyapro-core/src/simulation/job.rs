use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::{RequestStatus, ServiceRequest, Technician};
use crate::store::AppStore;
use crate::tasks::TaskScope;

/// Simulated time to find a technician for a pending request.
pub const DEFAULT_ASSIGNMENT_DELAY_MS: u64 = 3000;

/// Progress steps shown while a job is tracked. Strictly linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStage {
    Searching,
    Assigned,
    Arrived,
    Working,
    Completed,
}

impl JobStage {
    pub fn all() -> [JobStage; 5] {
        [
            JobStage::Searching,
            JobStage::Assigned,
            JobStage::Arrived,
            JobStage::Working,
            JobStage::Completed,
        ]
    }

    /// Where tracking starts for a request. Cancelled requests are not tracked.
    pub fn from_status(status: RequestStatus) -> Option<Self> {
        match status {
            RequestStatus::Pending => Some(JobStage::Searching),
            RequestStatus::Assigned => Some(JobStage::Assigned),
            RequestStatus::InProgress => Some(JobStage::Working),
            RequestStatus::Completed => Some(JobStage::Completed),
            RequestStatus::Cancelled => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            JobStage::Searching => Some(JobStage::Assigned),
            JobStage::Assigned => Some(JobStage::Arrived),
            JobStage::Arrived => Some(JobStage::Working),
            JobStage::Working => Some(JobStage::Completed),
            JobStage::Completed => None,
        }
    }

    /// Request status recorded for this stage
    pub fn request_status(self) -> RequestStatus {
        match self {
            JobStage::Searching => RequestStatus::Pending,
            JobStage::Assigned | JobStage::Arrived => RequestStatus::Assigned,
            JobStage::Working => RequestStatus::InProgress,
            JobStage::Completed => RequestStatus::Completed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStage::Searching => "Finding Technician",
            JobStage::Assigned => "Technician Assigned",
            JobStage::Arrived => "Technician Arrived",
            JobStage::Working => "Work in Progress",
            JobStage::Completed => "Job Completed",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Searching => write!(f, "searching"),
            JobStage::Assigned => write!(f, "assigned"),
            JobStage::Arrived => write!(f, "arrived"),
            JobStage::Working => write!(f, "working"),
            JobStage::Completed => write!(f, "completed"),
        }
    }
}

/// The technician every simulated search finds
pub fn mock_technician() -> Technician {
    Technician {
        name: "Dawit Abraham".to_string(),
        phone: "+251911234567".to_string(),
        rating: Some(4.8),
    }
}

/// Follows one request through the job stages.
///
/// A searching job gets the mock technician after the assignment delay.
/// Later stages move only when `advance` is called. The assignment timer
/// belongs to the tracker: dropping the tracker, or logging out, cancels it.
pub struct JobTracker {
    store: AppStore,
    request_id: String,
    stage: Arc<watch::Sender<JobStage>>,
    scope: TaskScope,
}

impl JobTracker {
    /// Start tracking `request`. Returns `None` for cancelled requests.
    pub fn start(
        store: &AppStore,
        request: &ServiceRequest,
        assignment_delay: Duration,
    ) -> Option<Self> {
        let initial = JobStage::from_status(request.status)?;
        let scope = store.session_scope(format!("job-{}", request.id));
        let (tx, _) = watch::channel(initial);
        let stage = Arc::new(tx);

        if initial == JobStage::Searching {
            let store = store.clone();
            let stage = stage.clone();
            let request_id = request.id.clone();
            scope.spawn_after(assignment_delay, async move {
                Self::assign(&store, &stage, &request_id).await;
            });
        }

        debug!(request = %request.id, stage = %initial, "Tracking job");
        Some(Self {
            store: store.clone(),
            request_id: request.id.clone(),
            stage,
            scope,
        })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn stage(&self) -> JobStage {
        *self.stage.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<JobStage> {
        self.stage.subscribe()
    }

    pub fn is_active(&self) -> bool {
        !self.scope.is_cancelled()
    }

    /// Move to the next stage and record it on the request.
    /// Returns the new stage, or `None` once completed.
    pub async fn advance(&self) -> Option<JobStage> {
        let current = self.stage();
        let next = current.next()?;

        if current == JobStage::Searching {
            Self::assign(&self.store, &self.stage, &self.request_id).await;
            return Some(self.stage());
        }

        self.stage.send_replace(next);
        if next.request_status() != current.request_status() {
            self.store
                .update_request_status(&self.request_id, next.request_status())
                .await;
        }
        info!(request = %self.request_id, stage = %next, "Job advanced");
        Some(next)
    }

    /// Stop tracking; a pending assignment will not fire
    pub fn stop(&self) {
        self.scope.cancel();
    }

    async fn assign(store: &AppStore, stage: &watch::Sender<JobStage>, request_id: &str) {
        let moved = stage.send_if_modified(|s| {
            if *s == JobStage::Searching {
                *s = JobStage::Assigned;
                true
            } else {
                false
            }
        });
        if moved {
            store.assign_technician(request_id, mock_technician()).await;
        }
    }
}

//! Local application store.
//!
//! `AppStore` holds the signed-in user, the active mode, and the request,
//! notification, and chat collections in memory. Every mutation rewrites the
//! affected collection to the durable cache. A failed write is logged and the
//! in-memory change stands; only `update_user` reports storage errors to the
//! caller.
//!
//! The store is an explicit handle: construct it once with `AppStore::open`
//! and clone it into whatever needs it. Clones share the same state.
//! Delayed work (the support auto-reply) runs in the session's `TaskScope`
//! and is cancelled on logout.

pub mod error;
pub mod events;
pub mod ids;
pub mod seed;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};

use crate::cache::manager::{
    KEY_CHATS, KEY_NOTIFICATIONS, KEY_REQUESTS, KEY_USER, KEY_USER_MODE,
};
use crate::cache::{CacheManager, CachedData, StorageError};
use crate::models::chat::is_support_channel;
use crate::models::{
    Chats, Message, NewNotification, Notification, NotificationKind, ProfilePatch, RequestStatus,
    Sender, ServiceRequest, ServiceRequestDraft, Technician, UserMode, UserProfile,
};
use crate::tasks::TaskScope;

pub use error::StoreError;
pub use events::StoreEvent;
use ids::IdGenerator;

// ============================================================================
// Constants
// ============================================================================

/// Text of the simulated support agent reply.
pub const SUPPORT_AUTO_REPLY: &str =
    "Thank you for your message. A support agent will get back to you shortly.";

/// Delay before the support auto-reply arrives.
pub const DEFAULT_SUPPORT_REPLY_DELAY_MS: u64 = 1000;

/// Buffer size for the change event broadcast.
/// Subscribers that lag further than this see `RecvError::Lagged` and should re-read state.
const EVENT_CHANNEL_CAPACITY: usize = 64;

const SESSION_SCOPE: &str = "session";

// ============================================================================
// Options & State
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Fill absent collections with sample data and persist it
    pub seed_sample_data: bool,
    pub support_reply_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            seed_sample_data: false,
            support_reply_delay: Duration::from_millis(DEFAULT_SUPPORT_REPLY_DELAY_MS),
        }
    }
}

/// Everything the store holds. Requests and notifications are newest-first;
/// each chat channel is chronological.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub mode: Option<UserMode>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub requests: Vec<ServiceRequest>,
    pub notifications: Vec<Notification>,
    pub chats: Chats,
}

impl StoreState {
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

/// Requests grouped the way a technician's home screen lists them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobBoard {
    pub new_jobs: Vec<ServiceRequest>,
    pub active: Vec<ServiceRequest>,
    pub completed: Vec<ServiceRequest>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarningsSummary {
    pub completed_jobs: usize,
    pub total_birr: u64,
    pub average_rating: Option<f32>,
}

// ============================================================================
// Store
// ============================================================================

struct Inner {
    cache: CacheManager,
    options: StoreOptions,
    state: RwLock<StoreState>,
    session: Mutex<TaskScope>,
    ids: IdGenerator,
    events: broadcast::Sender<StoreEvent>,
}

#[derive(Clone)]
pub struct AppStore {
    inner: Arc<Inner>,
}

impl AppStore {
    /// Load every collection from the cache. Absent collections are seeded
    /// when `options.seed_sample_data` is set; unreadable ones start empty.
    pub fn open(cache: CacheManager, options: StoreOptions) -> Self {
        let state = Self::load_state(&cache, &options);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            requests = state.requests.len(),
            notifications = state.notifications.len(),
            channels = state.chats.len(),
            authenticated = state.is_authenticated,
            "Store opened"
        );

        Self {
            inner: Arc::new(Inner {
                cache,
                options,
                state: RwLock::new(state),
                session: Mutex::new(TaskScope::new(SESSION_SCOPE)),
                ids: IdGenerator::new(),
                events,
            }),
        }
    }

    fn load_state(cache: &CacheManager, options: &StoreOptions) -> StoreState {
        let now = Utc::now();
        let seed_enabled = options.seed_sample_data;
        let mut state = StoreState::default();

        match cache.load_mode() {
            Ok(cached) => state.mode = cached.map(|c| c.data),
            Err(e) => error!(collection = KEY_USER_MODE, error = %e, "Failed to load mode"),
        }

        match cache.load_user() {
            Ok(Some(cached)) => {
                state.user = Some(cached.data);
                state.is_authenticated = true;
            }
            Ok(None) => {}
            Err(e) => error!(collection = KEY_USER, error = %e, "Failed to load user"),
        }

        state.requests = load_collection(
            KEY_REQUESTS,
            cache.load_requests(),
            seed_enabled.then_some(seed::sample_requests),
            |data| cache.save_requests(data),
        );
        state.notifications = load_collection(
            KEY_NOTIFICATIONS,
            cache.load_notifications(),
            seed_enabled.then_some(move || seed::sample_notifications(now)),
            |data| cache.save_notifications(data),
        );
        state.chats = load_collection(
            KEY_CHATS,
            cache.load_chats(),
            seed_enabled.then_some(move || seed::sample_chats(now)),
            |data| cache.save_chats(data),
        );

        state
    }

    // ===== Accessors =====

    pub async fn snapshot(&self) -> StoreState {
        self.inner.state.read().await.clone()
    }

    pub async fn mode(&self) -> Option<UserMode> {
        self.inner.state.read().await.mode
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.inner.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.is_authenticated
    }

    pub async fn requests(&self) -> Vec<ServiceRequest> {
        self.inner.state.read().await.requests.clone()
    }

    pub async fn request(&self, id: &str) -> Option<ServiceRequest> {
        let state = self.inner.state.read().await;
        state.requests.iter().find(|r| r.id == id).cloned()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.state.read().await.notifications.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.inner.state.read().await.unread_count()
    }

    pub async fn chats(&self) -> Chats {
        self.inner.state.read().await.chats.clone()
    }

    /// Messages of one channel, empty if the channel has none yet
    pub async fn messages(&self, channel_id: &str) -> Vec<Message> {
        let state = self.inner.state.read().await;
        state.chats.get(channel_id).cloned().unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn cache(&self) -> &CacheManager {
        &self.inner.cache
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// A task scope cancelled on logout, for screens scheduling delayed work
    pub fn session_scope(&self, name: impl Into<String>) -> TaskScope {
        self.lock_session().child(name)
    }

    // ===== Queries =====

    pub async fn requests_with_status(&self, status: RequestStatus) -> Vec<ServiceRequest> {
        let state = self.inner.state.read().await;
        state
            .requests
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    pub async fn job_board(&self) -> JobBoard {
        let state = self.inner.state.read().await;
        let mut board = JobBoard::default();
        for request in &state.requests {
            match request.status {
                RequestStatus::Pending => board.new_jobs.push(request.clone()),
                RequestStatus::Assigned | RequestStatus::InProgress => {
                    board.active.push(request.clone())
                }
                RequestStatus::Completed => board.completed.push(request.clone()),
                RequestStatus::Cancelled => {}
            }
        }
        board
    }

    pub async fn earnings(&self) -> EarningsSummary {
        let state = self.inner.state.read().await;
        let completed: Vec<&ServiceRequest> = state
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Completed)
            .collect();

        let total_birr = completed.iter().filter_map(|r| r.price).map(u64::from).sum();
        let ratings: Vec<f32> = completed
            .iter()
            .filter_map(|r| r.rating)
            .map(f32::from)
            .collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f32>() / ratings.len() as f32)
        };

        EarningsSummary {
            completed_jobs: completed.len(),
            total_birr,
            average_rating,
        }
    }

    // ===== Session Actions =====

    /// Set and persist the active role
    pub async fn switch_mode(&self, mode: UserMode) {
        {
            let mut state = self.inner.state.write().await;
            state.mode = Some(mode);
            self.log_persist_failure(KEY_USER_MODE, self.inner.cache.save_mode(mode));
        }
        info!(%mode, "Switched mode");
        self.emit(StoreEvent::ModeChanged { mode });
    }

    pub async fn login(&self, profile: UserProfile) {
        {
            let mut state = self.inner.state.write().await;
            self.log_persist_failure(KEY_USER, self.inner.cache.save_user(&profile));
            state.user = Some(profile);
            state.is_authenticated = true;
        }
        info!("User logged in");
        self.emit(StoreEvent::LoggedIn);
    }

    /// Clear the profile and cancel every delayed task of the session
    pub async fn logout(&self) {
        {
            // Reset under the state lock so a concurrent send_message schedules
            // its reply entirely before or entirely after this point
            let mut state = self.inner.state.write().await;
            self.reset_session();
            state.user = None;
            state.is_authenticated = false;
            self.log_persist_failure(KEY_USER, self.inner.cache.remove_user());
        }
        info!("User logged out");
        self.emit(StoreEvent::LoggedOut);
    }

    /// Validate and merge `patch` into the current profile.
    ///
    /// Unlike the other actions this persists before touching memory and
    /// returns storage errors, so the caller can tell the user the edit failed.
    pub async fn update_user(&self, patch: ProfilePatch) -> Result<UserProfile, StoreError> {
        let mut state = self.inner.state.write().await;
        let current = state.user.as_ref().ok_or(StoreError::NotLoggedIn)?;
        let merged = patch.apply_to(current)?;

        self.inner.cache.save_user(&merged)?;
        state.user = Some(merged.clone());
        drop(state);

        debug!("Profile updated");
        self.emit(StoreEvent::UserUpdated);
        Ok(merged)
    }

    // ===== Request Actions =====

    /// Prepend a new request and raise a "Request Submitted" notification
    pub async fn add_request(&self, draft: ServiceRequestDraft) -> ServiceRequest {
        let (request, unread) = {
            let mut state = self.inner.state.write().await;
            let id = self
                .inner
                .ids
                .next_unique(|id| state.requests.iter().any(|r| r.id == id));
            let request = draft.into_request(id, Utc::now());

            state.requests.insert(0, request.clone());
            self.log_persist_failure(KEY_REQUESTS, self.inner.cache.save_requests(&state.requests));

            self.push_notification(
                &mut state,
                NewNotification::new(
                    "Request Submitted",
                    format!("Your request for {} has been received.", request.service),
                ),
            );
            (request, state.unread_count())
        };

        info!(id = %request.id, category = %request.category, "Request added");
        self.emit(StoreEvent::RequestAdded {
            request_id: request.id.clone(),
        });
        self.emit(StoreEvent::NotificationsChanged { unread });
        request
    }

    /// Replace the status of request `id`. Returns `false` (and changes
    /// nothing) when no request has that id.
    pub async fn update_request_status(&self, id: &str, status: RequestStatus) -> bool {
        {
            let mut state = self.inner.state.write().await;
            let Some(request) = state.requests.iter_mut().find(|r| r.id == id) else {
                debug!(id, "Status update for unknown request ignored");
                return false;
            };
            request.status = status;
            self.log_persist_failure(KEY_REQUESTS, self.inner.cache.save_requests(&state.requests));
        }

        info!(id, %status, "Request status updated");
        self.emit(StoreEvent::RequestUpdated {
            request_id: id.to_string(),
            status,
        });
        true
    }

    /// Record the technician on request `id`, mark it `Assigned`, and notify.
    pub async fn assign_technician(&self, id: &str, technician: Technician) -> bool {
        let unread = {
            let mut state = self.inner.state.write().await;
            let Some(request) = state.requests.iter_mut().find(|r| r.id == id) else {
                debug!(id, "Assignment for unknown request ignored");
                return false;
            };
            request.status = RequestStatus::Assigned;
            request.technician = Some(technician.clone());
            let service = request.service.clone();
            self.log_persist_failure(KEY_REQUESTS, self.inner.cache.save_requests(&state.requests));

            self.push_notification(
                &mut state,
                NewNotification::new(
                    "Technician Assigned",
                    format!("{} has accepted your {} request.", technician.name, service),
                )
                .kind(NotificationKind::Success),
            );
            state.unread_count()
        };

        info!(id, technician = %technician.name, "Technician assigned");
        self.emit(StoreEvent::RequestUpdated {
            request_id: id.to_string(),
            status: RequestStatus::Assigned,
        });
        self.emit(StoreEvent::NotificationsChanged { unread });
        true
    }

    // ===== Notification Actions =====

    pub async fn add_notification(&self, new: NewNotification) -> Notification {
        let (notification, unread) = {
            let mut state = self.inner.state.write().await;
            let notification = self.push_notification(&mut state, new);
            (notification, state.unread_count())
        };
        self.emit(StoreEvent::NotificationsChanged { unread });
        notification
    }

    /// Remove notification `id`. Returns whether it existed.
    pub async fn clear_notification(&self, id: &str) -> bool {
        let (removed, unread) = {
            let mut state = self.inner.state.write().await;
            let before = state.notifications.len();
            state.notifications.retain(|n| n.id != id);
            self.log_persist_failure(
                KEY_NOTIFICATIONS,
                self.inner.cache.save_notifications(&state.notifications),
            );
            (state.notifications.len() != before, state.unread_count())
        };
        self.emit(StoreEvent::NotificationsChanged { unread });
        removed
    }

    /// Mark every notification read. Returns how many were unread.
    pub async fn mark_all_notifications_read(&self) -> usize {
        let newly_read = {
            let mut state = self.inner.state.write().await;
            let newly_read = state.unread_count();
            for notification in state.notifications.iter_mut() {
                notification.read = true;
            }
            self.log_persist_failure(
                KEY_NOTIFICATIONS,
                self.inner.cache.save_notifications(&state.notifications),
            );
            newly_read
        };
        self.emit(StoreEvent::NotificationsChanged { unread: 0 });
        newly_read
    }

    // ===== Chat Actions =====

    /// Append a message from the current user. On the support channel one
    /// auto-reply follows after the configured delay.
    pub async fn send_message(&self, channel_id: &str, text: impl Into<String>) -> Message {
        let message = {
            let mut state = self.inner.state.write().await;
            let sender = Sender::for_mode(state.mode);
            let message = self.push_message(&mut state, channel_id, sender, text.into());
            if is_support_channel(channel_id) {
                self.schedule_support_reply(channel_id.to_string());
            }
            message
        };
        self.emit(StoreEvent::MessageAppended {
            channel_id: channel_id.to_string(),
            message_id: message.id.clone(),
        });
        message
    }

    /// Append a message from an explicit sender (incoming replies)
    pub async fn append_message(
        &self,
        channel_id: &str,
        sender: Sender,
        text: impl Into<String>,
    ) -> Message {
        let message = {
            let mut state = self.inner.state.write().await;
            self.push_message(&mut state, channel_id, sender, text.into())
        };
        self.emit(StoreEvent::MessageAppended {
            channel_id: channel_id.to_string(),
            message_id: message.id.clone(),
        });
        message
    }

    // ===== Internals =====

    fn schedule_support_reply(&self, channel_id: String) {
        let store = self.clone();
        let delay = self.inner.options.support_reply_delay;
        debug!(
            channel = %channel_id,
            delay_ms = delay.as_millis() as u64,
            "Scheduling support auto-reply"
        );
        self.lock_session().spawn_after(delay, async move {
            store
                .append_message(&channel_id, Sender::Support, SUPPORT_AUTO_REPLY)
                .await;
        });
    }

    fn push_notification(&self, state: &mut StoreState, new: NewNotification) -> Notification {
        let id = self
            .inner
            .ids
            .next_unique(|id| state.notifications.iter().any(|n| n.id == id));
        let notification = new.into_notification(id, Utc::now());

        state.notifications.insert(0, notification.clone());
        self.log_persist_failure(
            KEY_NOTIFICATIONS,
            self.inner.cache.save_notifications(&state.notifications),
        );
        notification
    }

    fn push_message(
        &self,
        state: &mut StoreState,
        channel_id: &str,
        sender: Sender,
        text: String,
    ) -> Message {
        let thread = state.chats.entry(channel_id.to_string()).or_default();
        let id = self
            .inner
            .ids
            .next_unique(|id| thread.iter().any(|m| m.id == id));
        let message = Message {
            id,
            text,
            sender,
            timestamp: Utc::now(),
        };
        thread.push(message.clone());

        self.log_persist_failure(KEY_CHATS, self.inner.cache.save_chats(&state.chats));
        message
    }

    fn reset_session(&self) {
        let mut session = self.lock_session();
        session.cancel();
        *session = TaskScope::new(SESSION_SCOPE);
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, TaskScope> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn log_persist_failure(&self, collection: &str, result: Result<(), StorageError>) {
        if let Err(e) = result {
            error!(collection, error = %e, "Failed to persist; keeping in-memory state");
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

/// Load one collection, seeding and persisting it when absent and `seed` is given
fn load_collection<T, S, W>(
    name: &str,
    loaded: Result<Option<CachedData<T>>, StorageError>,
    seed: Option<S>,
    save: W,
) -> T
where
    T: Default,
    S: FnOnce() -> T,
    W: FnOnce(&T) -> Result<(), StorageError>,
{
    match loaded {
        Ok(Some(cached)) => {
            debug!(collection = name, cached_at = %cached.cached_at, "Loaded from cache");
            cached.data
        }
        Ok(None) => match seed {
            Some(seed) => {
                let data = seed();
                match save(&data) {
                    Ok(()) => info!(collection = name, "Seeded sample data"),
                    Err(e) => {
                        error!(collection = name, error = %e, "Failed to persist sample data")
                    }
                }
                data
            }
            None => T::default(),
        },
        Err(e) => {
            error!(collection = name, error = %e, "Failed to load collection, starting empty");
            T::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FileStore, KeyValueStore, MemoryStore};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose writes can be switched to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn set_failing(&self, failing: bool) {
            self.fail_writes.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(StorageError::Unavailable("disk full".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.check()?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.check()?;
            self.inner.remove(key)
        }
    }

    fn empty_store() -> (Arc<FlakyStore>, AppStore) {
        let backend = Arc::new(FlakyStore::default());
        let store = AppStore::open(CacheManager::new(backend.clone()), StoreOptions::default());
        (backend, store)
    }

    fn customer() -> UserProfile {
        UserProfile::new(UserMode::Customer, "Abebe Kebede", "0911223344")
            .with_email("abebe@example.com")
    }

    fn leak_fix() -> ServiceRequestDraft {
        ServiceRequestDraft::new("Plumbing", "Leak Fix", "Kitchen sink pipe is leaking")
    }

    #[tokio::test]
    async fn test_add_request_scenario() {
        let (_, store) = empty_store();
        assert!(store.requests().await.is_empty());

        let request = store.add_request(leak_fix()).await;

        let requests = store.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status, RequestStatus::Pending);
        assert_eq!(requests[0].id, request.id);

        let notifications = store.notifications().await;
        assert_eq!(notifications[0].title, "Request Submitted");
        assert_eq!(
            notifications[0].message,
            "Your request for Leak Fix has been received."
        );
        assert!(!notifications[0].read);
    }

    #[tokio::test]
    async fn test_add_request_keeps_caller_status() {
        let (_, store) = empty_store();
        let request = store
            .add_request(leak_fix().with_status(RequestStatus::InProgress))
            .await;
        assert_eq!(request.status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn test_add_requests_newest_first_unique_ids() {
        let (_, store) = empty_store();
        let mut added = Vec::new();
        for i in 0..25 {
            let draft = ServiceRequestDraft::new("Cleaning", format!("Job {}", i), "");
            added.push(store.add_request(draft).await.id);
        }

        let requests = store.requests().await;
        assert_eq!(requests.len(), 25);

        let ids: Vec<String> = requests.iter().map(|r| r.id.clone()).collect();
        added.reverse();
        assert_eq!(ids, added);

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(requests[0].service, "Job 24");
    }

    #[tokio::test]
    async fn test_update_request_status_targets_one_entry() {
        let (_, store) = empty_store();
        let first = store.add_request(leak_fix()).await;
        let second = store
            .add_request(ServiceRequestDraft::new("Electrical", "Wiring Check", ""))
            .await;
        let before = store.requests().await;

        assert!(store.update_request_status(&first.id, RequestStatus::Completed).await);

        let after = store.requests().await;
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0], before[0]);
        assert_eq!(after[0].id, second.id);

        let mut expected = before[1].clone();
        expected.status = RequestStatus::Completed;
        assert_eq!(after[1], expected);
    }

    #[tokio::test]
    async fn test_update_request_status_unknown_id_is_noop() {
        let (_, store) = empty_store();
        store.add_request(leak_fix()).await;
        let before = store.snapshot().await;
        let mut events = store.subscribe();

        assert!(!store.update_request_status("missing", RequestStatus::Completed).await);

        assert_eq!(store.snapshot().await, before);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_assign_technician() {
        let (_, store) = empty_store();
        let request = store.add_request(leak_fix()).await;

        let tech = Technician::new("Dawit Abraham", "+251911234567");
        assert!(store.assign_technician(&request.id, tech.clone()).await);

        let updated = store.request(&request.id).await.unwrap();
        assert_eq!(updated.status, RequestStatus::Assigned);
        assert_eq!(updated.technician, Some(tech));

        let notifications = store.notifications().await;
        assert_eq!(notifications[0].title, "Technician Assigned");
        assert_eq!(notifications[0].kind, NotificationKind::Success);
        assert!(!store.assign_technician("missing", Technician::new("x", "y")).await);
    }

    #[tokio::test]
    async fn test_add_notification_defaults() {
        let (_, store) = empty_store();
        let before = Utc::now();
        let n = store
            .add_notification(NewNotification::new("Payment", "Payment received"))
            .await;
        assert!(!n.read);
        assert!(n.timestamp >= before);
        assert_eq!(store.notifications().await[0], n);
        assert_eq!(store.unread_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_notification() {
        let (_, store) = empty_store();
        let a = store.add_notification(NewNotification::new("A", "a")).await;
        let b = store.add_notification(NewNotification::new("B", "b")).await;

        assert!(store.clear_notification(&a.id).await);
        assert!(!store.clear_notification(&a.id).await);

        let remaining = store.notifications().await;
        assert_eq!(remaining, vec![b]);
    }

    #[tokio::test]
    async fn test_mark_all_read_is_idempotent() {
        let (_, store) = empty_store();
        store.add_notification(NewNotification::new("A", "a")).await;
        store.add_notification(NewNotification::new("B", "b")).await;

        assert_eq!(store.mark_all_notifications_read().await, 2);
        let once = store.notifications().await;
        assert_eq!(store.mark_all_notifications_read().await, 0);
        let twice = store.notifications().await;

        assert_eq!(once, twice);
        assert!(twice.iter().all(|n| n.read));
    }

    #[tokio::test(start_paused = true)]
    async fn test_support_message_gets_exactly_one_reply() {
        let (_, store) = empty_store();
        store.switch_mode(UserMode::Customer).await;

        let sent = store.send_message("support", "My order is late").await;
        assert_eq!(sent.sender, Sender::Customer);
        assert_eq!(store.messages("support").await.len(), 1);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(store.messages("support").await.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let messages = store.messages("support").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Support);
        assert_eq!(messages[1].text, SUPPORT_AUTO_REPLY);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.messages("support").await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_channel_gets_no_reply() {
        let (_, store) = empty_store();
        store.switch_mode(UserMode::Technician).await;

        let sent = store.send_message("job_1", "On my way").await;
        assert_eq!(sent.sender, Sender::Technician);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.messages("job_1").await, vec![sent]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_pending_reply() {
        let (_, store) = empty_store();
        store.login(customer()).await;
        store.send_message("support", "Hello?").await;

        store.logout().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(store.messages("support").await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_scope_survives_until_logout() {
        let (_, store) = empty_store();
        let scope = store.session_scope("job-status");
        assert!(!scope.is_cancelled());
        store.logout().await;
        assert!(scope.is_cancelled());

        // A fresh session hands out live scopes again
        assert!(!store.session_scope("job-status").is_cancelled());
    }

    #[tokio::test]
    async fn test_login_logout_persistence() {
        let (backend, store) = empty_store();
        store.login(customer()).await;
        assert!(store.is_authenticated().await);
        assert!(backend.get(KEY_USER).unwrap().is_some());

        store.logout().await;
        assert!(!store.is_authenticated().await);
        assert!(store.user().await.is_none());
        assert!(backend.get(KEY_USER).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_merges_and_persists() {
        let (_, store) = empty_store();
        store.login(customer()).await;

        let patch = ProfilePatch {
            address: Some("Bole, Addis Ababa".to_string()),
            ..Default::default()
        };
        let updated = store.update_user(patch).await.unwrap();
        assert_eq!(updated.address, "Bole, Addis Ababa");
        assert_eq!(updated.full_name, "Abebe Kebede");

        let cached = store.cache().load_user().unwrap().unwrap();
        assert_eq!(cached.data, updated);
    }

    #[tokio::test]
    async fn test_update_user_requires_login() {
        let (_, store) = empty_store();
        let err = store.update_user(ProfilePatch::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_update_user_rejects_invalid_patch() {
        let (_, store) = empty_store();
        store.login(customer()).await;

        let patch = ProfilePatch {
            email: Some("nope".to_string()),
            bio: Some("ignored".to_string()),
            ..Default::default()
        };
        let err = store.update_user(patch).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidProfile(_)));
        assert_eq!(store.user().await, Some(customer()));
    }

    #[tokio::test]
    async fn test_update_user_propagates_storage_failure() {
        let (backend, store) = empty_store();
        store.login(customer()).await;
        backend.set_failing(true);

        let patch = ProfilePatch {
            bio: Some("Loves fast service".to_string()),
            ..Default::default()
        };
        let err = store.update_user(patch).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.user().await, Some(customer()));
    }

    #[tokio::test]
    async fn test_other_actions_degrade_to_memory_on_storage_failure() {
        let (backend, store) = empty_store();
        backend.set_failing(true);

        store.switch_mode(UserMode::Technician).await;
        store.add_request(leak_fix()).await;
        store.mark_all_notifications_read().await;

        assert_eq!(store.mode().await, Some(UserMode::Technician));
        assert_eq!(store.requests().await.len(), 1);
        assert!(backend.get(KEY_REQUESTS).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let open = || {
            let backend = Arc::new(FileStore::new(tmp.path().to_path_buf()).unwrap());
            AppStore::open(CacheManager::new(backend), StoreOptions::default())
        };

        let store = open();
        store.switch_mode(UserMode::Customer).await;
        store.login(customer()).await;
        let request = store.add_request(leak_fix()).await;
        store.add_request(ServiceRequestDraft::new("IT Support", "Laptop Repair", "")).await;
        store
            .update_request_status(&request.id, RequestStatus::Assigned)
            .await;
        store.send_message("job_1", "See you at 3").await;
        store.add_notification(NewNotification::new("Promo", "10% off")).await;
        let before = store.snapshot().await;
        drop(store);

        let reopened = open();
        assert_eq!(reopened.snapshot().await, before);
        assert!(reopened.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_seeding_populates_and_persists() {
        let backend = Arc::new(MemoryStore::new());
        let options = StoreOptions {
            seed_sample_data: true,
            ..Default::default()
        };
        let store = AppStore::open(CacheManager::new(backend.clone()), options);

        assert_eq!(store.requests().await.len(), 3);
        assert_eq!(store.notifications().await.len(), 2);
        assert_eq!(store.messages("support").await.len(), 1);
        assert_eq!(
            backend.keys(),
            vec![
                KEY_CHATS.to_string(),
                KEY_NOTIFICATIONS.to_string(),
                KEY_REQUESTS.to_string()
            ]
        );
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_seeding_does_not_overwrite_saved_data() {
        let backend = Arc::new(MemoryStore::new());
        CacheManager::new(backend.clone()).save_requests(&[]).unwrap();

        let options = StoreOptions {
            seed_sample_data: true,
            ..Default::default()
        };
        let store = AppStore::open(CacheManager::new(backend), options);
        assert!(store.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_seeding_writes_nothing() {
        let backend = Arc::new(MemoryStore::new());
        let store = AppStore::open(CacheManager::new(backend.clone()), StoreOptions::default());
        assert!(store.requests().await.is_empty());
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_job_board_and_earnings_from_sample_data() {
        let backend = Arc::new(MemoryStore::new());
        let options = StoreOptions {
            seed_sample_data: true,
            ..Default::default()
        };
        let store = AppStore::open(CacheManager::new(backend), options);

        let board = store.job_board().await;
        assert_eq!(board.new_jobs.len(), 1);
        assert_eq!(board.active.len(), 1);
        assert_eq!(board.completed.len(), 1);

        let earnings = store.earnings().await;
        assert_eq!(earnings.completed_jobs, 1);
        assert_eq!(earnings.total_birr, 1500);
        assert_eq!(earnings.average_rating, Some(5.0));

        let pending = store.requests_with_status(RequestStatus::Pending).await;
        assert_eq!(pending[0].id, "req_3");
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (_, store) = empty_store();
        let mut events = store.subscribe();

        store.switch_mode(UserMode::Customer).await;
        let request = store.add_request(leak_fix()).await;

        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::ModeChanged {
                mode: UserMode::Customer
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::RequestAdded {
                request_id: request.id
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::NotificationsChanged { unread: 1 }
        );
    }

    /// Memory store that stalls writes of the customer mode
    #[derive(Default)]
    struct SlowModeStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for SlowModeStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == KEY_USER_MODE && value.contains("customer") {
                std::thread::sleep(Duration::from_millis(200));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_mode_switches_leave_memory_and_disk_equal() {
        let backend = Arc::new(SlowModeStore::default());
        let cache = CacheManager::new(backend.clone());
        let store = AppStore::open(cache.clone(), StoreOptions::default());

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.switch_mode(UserMode::Customer).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.switch_mode(UserMode::Technician).await;
        first.await.unwrap();

        let on_disk = cache.load_mode().unwrap().map(|c| c.data);
        assert_eq!(store.mode().await, on_disk);
        assert_eq!(on_disk, Some(UserMode::Technician));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_visible_support_message_reply_is_cancelled_by_logout() {
        let delay = Duration::from_millis(20);
        for _ in 0..10 {
            let store = AppStore::open(
                CacheManager::new(Arc::new(MemoryStore::new())),
                StoreOptions {
                    support_reply_delay: delay,
                    ..Default::default()
                },
            );
            store.login(customer()).await;

            let sender = {
                let store = store.clone();
                tokio::spawn(async move { store.send_message("support", "Anyone there?").await })
            };
            // Log out as soon as the message shows up; its reply must already be
            // scheduled on the session being cancelled
            while store.messages("support").await.is_empty() {
                tokio::task::yield_now().await;
            }
            store.logout().await;
            sender.await.unwrap();

            tokio::time::sleep(delay * 5).await;
            let messages = store.messages("support").await;
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].sender, Sender::Customer);
        }
    }
}

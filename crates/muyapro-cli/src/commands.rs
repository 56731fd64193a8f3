//! Command handlers. Each one drives the store the way a screen would.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use muyapro_core::models::{
    is_support_channel, Message, ProfilePatch, RequestStatus, ServiceRequest, ServiceRequestDraft,
    UserMode, UserProfile,
};
use muyapro_core::simulation::{login_with_otp, JobStage, JobTracker};
use muyapro_core::utils::{format_date, format_phone, format_price, truncate_string};
use muyapro_core::{AppStore, Config, StoreEvent};

use crate::cli::{ChatAction, Command, NotificationAction, ProfileAction, RequestAction};

/// Width of the description column in request listings
const DESCRIPTION_WIDTH: usize = 40;

pub async fn run(command: Command, store: &AppStore, config: &Config) -> Result<()> {
    match command {
        Command::Mode { mode } => {
            store.switch_mode(mode).await;
            println!("Mode set to {}", mode);
        }
        Command::Login {
            phone,
            name,
            email,
            specializations,
            code,
        } => login(store, config, phone, name, email, specializations, code).await?,
        Command::Logout => {
            store.logout().await;
            println!("Signed out");
        }
        Command::Profile { action } => profile(store, action).await?,
        Command::Request { action } => request(store, config, action).await?,
        Command::Notifications { action } => notifications(store, action).await?,
        Command::Chat { action } => chat(store, action).await?,
        Command::Status => status(store).await,
        Command::Earnings => earnings(store).await,
    }
    Ok(())
}

async fn login(
    store: &AppStore,
    config: &Config,
    phone: Option<String>,
    name: String,
    email: Option<String>,
    specializations: Vec<String>,
    code: Option<String>,
) -> Result<()> {
    let mode = store.mode().await.unwrap_or(UserMode::Customer);
    let otp = config.otp_service();
    let phone = phone
        .or_else(|| config.last_phone.clone())
        .context("No phone number given; pass --phone")?;

    let challenge = otp.send_code(&phone).await?;
    println!(
        "Code sent to {} (simulated SMS: {})",
        format_phone(challenge.phone()),
        challenge.code()
    );

    let code = match code {
        Some(code) => code,
        None => prompt("Enter OTP: ")?,
    };

    let mut profile = UserProfile::new(mode, name, "");
    if let Some(email) = email {
        profile = profile.with_email(email);
    }
    if mode == UserMode::Technician {
        profile.specializations = specializations;
    }

    let user = login_with_otp(store, &otp, &challenge, &code, profile).await?;
    println!("Welcome, {}! Signed in as {}.", user.first_name(), user.mode);

    // Remember the number for next time; only this field is written back
    let mut saved = Config::load().unwrap_or_default();
    saved.last_phone = Some(user.phone_number.clone());
    if let Err(e) = saved.save() {
        warn!(error = %e, "Failed to remember phone number");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

async fn profile(store: &AppStore, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => {
            let Some(user) = store.user().await else {
                println!("Not signed in");
                return Ok(());
            };
            print_profile(&user);
        }
        ProfileAction::Update {
            name,
            email,
            phone,
            address,
            bio,
        } => {
            let patch = ProfilePatch {
                full_name: name,
                email,
                phone_number: phone,
                address,
                bio,
                ..Default::default()
            };
            if patch.is_empty() {
                bail!("Nothing to update");
            }
            let user = store
                .update_user(patch)
                .await
                .context("Failed to update profile")?;
            println!("Profile updated successfully!");
            print_profile(&user);
        }
    }
    Ok(())
}

fn print_profile(user: &UserProfile) {
    println!("{} ({})", user.full_name, user.mode);
    println!("  Phone:   {}", format_phone(&user.phone_number));
    if !user.email.is_empty() {
        println!("  Email:   {}", user.email);
    }
    if !user.address.is_empty() {
        println!("  Address: {}", user.address);
    }
    if !user.bio.is_empty() {
        println!("  Bio:     {}", user.bio);
    }
    if !user.specializations.is_empty() {
        println!("  Skills:  {}", user.specializations.join(", "));
    }
}

async fn request(store: &AppStore, config: &Config, action: RequestAction) -> Result<()> {
    match action {
        RequestAction::New {
            category,
            service,
            description,
            urgency,
        } => {
            let mut draft = ServiceRequestDraft::new(category, service, description);
            draft.urgency = urgency;
            let request = store.add_request(draft).await;
            println!("Request {} submitted. We'll find you a technician shortly.", request.id);
        }
        RequestAction::List { status } => {
            let requests = match status {
                Some(status) => store.requests_with_status(status).await,
                None => store.requests().await,
            };
            if requests.is_empty() {
                println!("No requests");
            }
            for request in &requests {
                print_request(request);
            }
        }
        RequestAction::Status { id, status } => {
            if store.update_request_status(&id, status).await {
                println!("Request {} is now {}", id, status);
            } else {
                bail!("No request with id {}", id);
            }
        }
        RequestAction::Track { id } => track(store, config, &id).await?,
        RequestAction::Advance { id } => {
            let request = find_request(store, &id).await?;
            let Some(tracker) = JobTracker::start(store, &request, config.assignment_delay()) else {
                bail!("Request {} was cancelled", id);
            };
            let stages = advance_stored(&tracker, request.status).await;
            if stages.is_empty() {
                println!("{}: already completed", id);
            }
            for stage in stages {
                println!("{}: {}", id, stage.label());
            }
        }
    }
    Ok(())
}

/// Step the tracker until the stored request status moves away from `from`.
///
/// Stages that share a status with the previous one (assigned, arrived) are
/// not persisted, so a single step would be lost between invocations.
/// Returns the stages passed through, empty when the job was already completed.
async fn advance_stored(tracker: &JobTracker, from: RequestStatus) -> Vec<JobStage> {
    let mut stages = Vec::new();
    while let Some(stage) = tracker.advance().await {
        stages.push(stage);
        if stage.request_status() != from {
            break;
        }
    }
    stages
}

async fn find_request(store: &AppStore, id: &str) -> Result<ServiceRequest> {
    match store.request(id).await {
        Some(request) => Ok(request),
        None => bail!("No request with id {}", id),
    }
}

async fn track(store: &AppStore, config: &Config, id: &str) -> Result<()> {
    let request = find_request(store, id).await?;
    let Some(tracker) = JobTracker::start(store, &request, config.assignment_delay()) else {
        bail!("Request {} was cancelled", id);
    };
    println!("{}: {}", id, tracker.stage().label());

    let mut stage = tracker.watch();
    while *stage.borrow() == JobStage::Searching {
        if stage.changed().await.is_err() {
            break;
        }
    }

    if let Some(request) = store.request(id).await {
        println!("{}: {}", id, tracker.stage().label());
        if let Some(tech) = request.technician {
            println!("  {} - {}", tech.name, format_phone(&tech.phone));
        }
    }
    Ok(())
}

fn print_request(request: &ServiceRequest) {
    let price = request
        .price
        .map(|p| format_price(u64::from(p)))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<16} {:<12} {:<14} {:<20} {:>10}  {}",
        request.id,
        request.status.to_string(),
        format_date(&request.date),
        truncate_string(&format!("{} / {}", request.category, request.service), 20),
        price,
        truncate_string(&request.description, DESCRIPTION_WIDTH),
    );
    if let Some(name) = request.technician_name() {
        println!("{:<16} technician: {}", "", name);
    }
}

async fn notifications(store: &AppStore, action: NotificationAction) -> Result<()> {
    match action {
        NotificationAction::List => {
            let notifications = store.notifications().await;
            if notifications.is_empty() {
                println!("No notifications");
            }
            for n in notifications {
                let marker = if n.read { " " } else { "*" };
                println!("{} {:<14} {} - {}", marker, n.id, n.title, n.message);
            }
        }
        NotificationAction::ReadAll => {
            let count = store.mark_all_notifications_read().await;
            println!("Marked {} notification(s) read", count);
        }
        NotificationAction::Clear { id } => {
            if !store.clear_notification(&id).await {
                bail!("No notification with id {}", id);
            }
            println!("Cleared {}", id);
        }
    }
    Ok(())
}

async fn chat(store: &AppStore, action: ChatAction) -> Result<()> {
    match action {
        ChatAction::Send { channel, text } => {
            let mut events = store.subscribe();
            let sent = store.send_message(&channel, text).await;
            println!("[{}] {}: {}", sent.timestamp.format("%H:%M"), sent.sender, sent.text);

            if is_support_channel(&channel) {
                let limit = store.options().support_reply_delay * 2;
                match wait_for_reply(store, &mut events, &channel, &sent.id, limit).await {
                    Some(reply) => println!(
                        "[{}] {}: {}",
                        reply.timestamp.format("%H:%M"),
                        reply.sender,
                        reply.text
                    ),
                    None => warn!(channel = %channel, "No reply arrived"),
                }
            }
        }
        ChatAction::Show { channel } => {
            let messages = store.messages(&channel).await;
            if messages.is_empty() {
                println!("No messages in {}", channel);
            }
            for m in messages {
                println!("[{}] {}: {}", m.timestamp.format("%H:%M"), m.sender, m.text);
            }
        }
    }
    Ok(())
}

/// Wait for the next message on `channel` other than `sent_id`, up to `limit`
async fn wait_for_reply(
    store: &AppStore,
    events: &mut broadcast::Receiver<StoreEvent>,
    channel: &str,
    sent_id: &str,
    limit: Duration,
) -> Option<Message> {
    let reply_id = tokio::time::timeout(limit, async {
        loop {
            match events.recv().await {
                Ok(StoreEvent::MessageAppended {
                    channel_id,
                    message_id,
                }) if channel_id == channel && message_id != sent_id => return Some(message_id),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event receiver lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()?;

    store
        .messages(channel)
        .await
        .into_iter()
        .find(|m| m.id == reply_id)
}

async fn status(store: &AppStore) {
    let state = store.snapshot().await;
    let ages = store.cache().cache_ages();

    match state.mode {
        Some(mode) => println!("Mode:          {}", mode),
        None => println!("Mode:          not selected"),
    }
    match &state.user {
        Some(user) if state.is_authenticated => {
            println!("Signed in as:  {} ({})", user.full_name, format_phone(&user.phone_number))
        }
        _ => println!("Signed in as:  nobody"),
    }
    println!(
        "Requests:      {} (saved {})",
        state.requests.len(),
        ages.requests_age()
    );
    println!(
        "Notifications: {} ({} unread)",
        state.notifications.len(),
        state.unread_count()
    );
    println!("Chat channels: {}", state.chats.len());
    println!("Last saved:    {}", ages.last_updated());
}

async fn earnings(store: &AppStore) {
    let summary = store.earnings().await;
    let board = store.job_board().await;

    println!("Completed jobs: {}", summary.completed_jobs);
    println!("Total earned:   {}", format_price(summary.total_birr));
    match summary.average_rating {
        Some(rating) => println!("Average rating: {:.1}", rating),
        None => println!("Average rating: -"),
    }
    println!(
        "Open jobs:      {} new, {} active",
        board.new_jobs.len(),
        board.active.len()
    );
}

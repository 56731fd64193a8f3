use std::path::PathBuf;

use clap::{Parser, Subcommand};

use muyapro_core::models::{RequestStatus, Urgency, UserMode};

#[derive(Debug, Parser)]
#[command(name = "muyapro", version, about = "Find and manage local technicians from the terminal")]
pub struct Cli {
    /// Use this data directory instead of the configured one
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Fill an empty store with sample requests, notifications, and chats
    #[arg(long, global = true)]
    pub seed: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select the active role (customer or technician)
    Mode { mode: UserMode },

    /// Sign in with a one-time code sent to your phone
    Login {
        /// Defaults to the last number signed in with
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        /// Technician specialization, repeatable
        #[arg(long = "specialization")]
        specializations: Vec<String>,
        /// Code from the SMS; prompted for when omitted
        #[arg(long)]
        code: Option<String>,
    },

    /// Sign out and forget the stored profile
    Logout,

    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Create and follow service requests
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },

    /// Read and manage notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },

    /// Chat with a technician or support
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Show session state and cache freshness
    Status,

    /// Show technician earnings from completed jobs
    Earnings,
}

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RequestAction {
    /// Submit a new service request
    New {
        #[arg(long)]
        category: String,
        #[arg(long)]
        service: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        urgency: Option<Urgency>,
    },
    /// List requests, newest first
    List {
        #[arg(long)]
        status: Option<RequestStatus>,
    },
    /// Set the status of a request
    Status { id: String, status: RequestStatus },
    /// Wait for a technician to be assigned to a pending request
    Track { id: String },
    /// Move a tracked job to its next stage
    Advance { id: String },
}

#[derive(Debug, Subcommand)]
pub enum NotificationAction {
    List,
    ReadAll,
    Clear { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ChatAction {
    /// Send a message; support answers automatically
    Send { channel: String, text: String },
    /// Print a channel's messages
    Show { channel: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_request_status() {
        let cli = Cli::parse_from(["muyapro", "request", "status", "req_2", "completed"]);
        match cli.command {
            Command::Request {
                action: RequestAction::Status { id, status },
            } => {
                assert_eq!(id, "req_2");
                assert_eq!(status, RequestStatus::Completed);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["muyapro", "status", "--seed", "--data-dir", "/tmp/muya"]);
        assert!(cli.seed);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/muya")));
    }

    #[test]
    fn test_login_specializations_repeat() {
        let cli = Cli::parse_from([
            "muyapro",
            "login",
            "--name",
            "Dawit Abraham",
            "--specialization",
            "Plumbing",
            "--specialization",
            "Electrical",
        ]);
        match cli.command {
            Command::Login {
                phone,
                specializations,
                ..
            } => {
                assert!(phone.is_none());
                assert_eq!(specializations, vec!["Plumbing", "Electrical"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

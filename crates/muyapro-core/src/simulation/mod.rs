//! Simulated back-end services.
//!
//! There is no server behind the app. These services stand in for one with
//! fixed latencies and canned results:
//!
//! - `OtpService`: phone number verification by one-time code
//! - `JobTracker`: technician assignment and the job progress steps

pub mod job;
pub mod otp;

pub use job::{mock_technician, JobStage, JobTracker, DEFAULT_ASSIGNMENT_DELAY_MS};
pub use otp::{login_with_otp, OtpChallenge, OtpError, OtpService, DEFAULT_OTP_DELAY_MS};

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::user::MIN_PHONE_DIGITS;
use crate::models::UserProfile;
use crate::store::AppStore;

/// Simulated SMS round-trip for sending and checking a code.
pub const DEFAULT_OTP_DELAY_MS: u64 = 1500;

/// Digits in a one-time code
pub const OTP_LENGTH: usize = 6;

/// Codes stop being accepted after this long.
const OTP_EXPIRY_MINUTES: i64 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Please enter a valid phone number: {0}")]
    InvalidPhone(String),

    #[error("Please enter a valid 6-digit code")]
    MalformedCode,

    #[error("The code does not match")]
    CodeMismatch,

    #[error("The code has expired, request a new one")]
    Expired,
}

/// An issued code for one phone number.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    phone: String,
    code: String,
    issued_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// The code the simulated SMS carried
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.issued_at + chrono::Duration::minutes(OTP_EXPIRY_MINUTES)
    }
}

#[derive(Debug, Clone)]
pub struct OtpService {
    latency: Duration,
}

impl Default for OtpService {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_OTP_DELAY_MS))
    }
}

impl OtpService {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub async fn send_code(&self, phone: &str) -> Result<OtpChallenge, OtpError> {
        let phone = phone.trim();
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < MIN_PHONE_DIGITS {
            return Err(OtpError::InvalidPhone(phone.to_string()));
        }

        tokio::time::sleep(self.latency).await;

        let challenge = OtpChallenge {
            phone: phone.to_string(),
            code: generate_code(),
            issued_at: Utc::now(),
        };
        info!(phone = %challenge.phone, "OTP sent");
        Ok(challenge)
    }

    pub async fn verify(&self, challenge: &OtpChallenge, code: &str) -> Result<(), OtpError> {
        let code = code.trim();
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpError::MalformedCode);
        }

        tokio::time::sleep(self.latency).await;

        if challenge.is_expired() {
            return Err(OtpError::Expired);
        }
        if code != challenge.code {
            debug!(phone = %challenge.phone, "OTP mismatch");
            return Err(OtpError::CodeMismatch);
        }
        Ok(())
    }
}

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Verify `code` and sign in with `profile`. The verified phone number
/// replaces whatever the profile carried.
pub async fn login_with_otp(
    store: &AppStore,
    otp: &OtpService,
    challenge: &OtpChallenge,
    code: &str,
    mut profile: UserProfile,
) -> Result<UserProfile, OtpError> {
    otp.verify(challenge, code).await?;
    profile.phone_number = challenge.phone().to_string();
    store.login(profile.clone()).await;
    Ok(profile)
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of digits accepted for a phone number.
/// Local numbers are 10 digits (09XXXXXXXX); international form adds the country code.
pub const MIN_PHONE_DIGITS: usize = 10;

/// The active role selected at onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum UserMode {
    Customer,
    Technician,
}

impl std::fmt::Display for UserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserMode::Customer => write!(f, "customer"),
            UserMode::Technician => write!(f, "technician"),
        }
    }
}

impl std::str::FromStr for UserMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(UserMode::Customer),
            "technician" => Ok(UserMode::Technician),
            other => Err(format!("unknown mode '{}' (expected customer or technician)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub mode: UserMode,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub bio: String,
    // Technician-only fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specializations: Vec<String>,
}

impl UserProfile {
    pub fn new(
        mode: UserMode,
        full_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            full_name: full_name.into(),
            phone_number: phone_number.into(),
            email: String::new(),
            address: String::new(),
            bio: String::new(),
            certificates: Vec::new(),
            specializations: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn is_technician(&self) -> bool {
        self.mode == UserMode::Technician
    }

    /// First name for greetings, falling back to "there"
    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("there")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Full name cannot be blank")]
    BlankName,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Phone number must have at least 10 digits: {0}")]
    InvalidPhone(String),
}

/// Explicit edit to a `UserProfile`. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub certificates: Option<Vec<String>>,
    pub specializations: Option<Vec<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() {
                return Err(ProfileError::BlankName);
            }
        }
        if let Some(email) = &self.email {
            // Blank clears the address
            let email = email.trim();
            if !email.is_empty() && !is_plausible_email(email) {
                return Err(ProfileError::InvalidEmail(email.to_string()));
            }
        }
        if let Some(phone) = &self.phone_number {
            let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
            if digits < MIN_PHONE_DIGITS {
                return Err(ProfileError::InvalidPhone(phone.clone()));
            }
        }
        Ok(())
    }

    /// Validate, then return a copy of `profile` with the patch applied.
    pub fn apply_to(&self, profile: &UserProfile) -> Result<UserProfile, ProfileError> {
        self.validate()?;

        let mut merged = profile.clone();
        if let Some(v) = &self.full_name {
            merged.full_name = v.trim().to_string();
        }
        if let Some(v) = &self.phone_number {
            merged.phone_number = v.trim().to_string();
        }
        if let Some(v) = &self.email {
            merged.email = v.trim().to_string();
        }
        if let Some(v) = &self.address {
            merged.address = v.clone();
        }
        if let Some(v) = &self.bio {
            merged.bio = v.clone();
        }
        if let Some(v) = &self.certificates {
            merged.certificates = v.clone();
        }
        if let Some(v) = &self.specializations {
            merged.specializations = v.clone();
        }
        Ok(merged)
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UserProfile {
        UserProfile::new(UserMode::Customer, "Abebe Kebede", "0911223344")
            .with_email("abebe@example.com")
    }

    #[test]
    fn test_user_mode_serde_lowercase() {
        let json = serde_json::to_string(&UserMode::Technician).unwrap();
        assert_eq!(json, "\"technician\"");
        let mode: UserMode = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(mode, UserMode::Customer);
    }

    #[test]
    fn test_user_mode_from_str() {
        assert_eq!("Technician".parse::<UserMode>().unwrap(), UserMode::Technician);
        assert!("admin".parse::<UserMode>().is_err());
    }

    #[test]
    fn test_profile_uses_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["fullName"], "Abebe Kebede");
        assert_eq!(json["phoneNumber"], "0911223344");
        // Technician fields are omitted for customers
        assert!(json.get("specializations").is_none());
    }

    #[test]
    fn test_patch_merges_only_named_fields() {
        let patch = ProfilePatch {
            bio: Some("Homeowner in Bole".to_string()),
            address: Some("Bole, Addis Ababa".to_string()),
            ..Default::default()
        };
        let merged = patch.apply_to(&sample()).unwrap();
        assert_eq!(merged.bio, "Homeowner in Bole");
        assert_eq!(merged.address, "Bole, Addis Ababa");
        assert_eq!(merged.full_name, "Abebe Kebede");
        assert_eq!(merged.email, "abebe@example.com");
    }

    #[test]
    fn test_patch_rejects_blank_name() {
        let patch = ProfilePatch {
            full_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(&sample()), Err(ProfileError::BlankName));
    }

    #[test]
    fn test_patch_rejects_bad_email_and_phone() {
        let bad_email = ProfilePatch {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_email.validate(), Err(ProfileError::InvalidEmail(_))));

        let bad_phone = ProfilePatch {
            phone_number: Some("12345".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_phone.validate(), Err(ProfileError::InvalidPhone(_))));
    }

    #[test]
    fn test_patch_blank_email_clears_address() {
        let patch = ProfilePatch {
            email: Some("   ".to_string()),
            ..Default::default()
        };
        let merged = patch.apply_to(&sample()).unwrap();
        assert_eq!(merged.email, "");
    }

    #[test]
    fn test_patch_rejects_second_at_sign() {
        let patch = ProfilePatch {
            email: Some("a@b@c.d".to_string()),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(ProfileError::InvalidEmail(_))));
    }

    #[test]
    fn test_patch_accepts_international_phone() {
        let patch = ProfilePatch {
            phone_number: Some("+251 911 223 344".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_first_name() {
        assert_eq!(sample().first_name(), "Abebe");
        assert_eq!(UserProfile::new(UserMode::Customer, "", "").first_name(), "there");
    }
}

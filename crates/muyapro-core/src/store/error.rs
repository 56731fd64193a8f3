use thiserror::Error;

use crate::cache::StorageError;
use crate::models::ProfileError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("No user is logged in")]
    NotLoggedIn,

    #[error("Invalid profile update: {0}")]
    InvalidProfile(#[from] ProfileError),
}

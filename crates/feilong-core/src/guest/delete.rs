//! Guest removal.

use super::spec::GuestState;
use crate::error::{ProviderError, Result};
use feilong_api::Gateway;

/// Delete the guest and its disks. Not retried.
pub async fn delete_guest(gateway: &dyn Gateway, state: &GuestState) -> Result<()> {
    tracing::info!(userid = %state.userid, "Deleting guest");
    gateway.delete_guest(&state.userid).await.map_err(|source| {
        tracing::error!(userid = %state.userid, error = %source, "Guest deletion failed");
        ProviderError::Deletion {
            resource: "guest",
            source,
        }
    })?;
    tracing::info!(userid = %state.userid, "Guest deleted");
    Ok(())
}

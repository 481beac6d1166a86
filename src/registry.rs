//! The registered service labels, persisted through the vault.

use anyhow::Result;

use crate::error::ManagerError;
use crate::vault::Vault;

/// Vault key holding the service labels.
pub(crate) const SERVICES_KEY: &str = "services";

/// Returns the registered labels in insertion order.
pub(crate) fn list(vault: &Vault) -> Result<Vec<String>> {
    Ok(vault.read(SERVICES_KEY)?.unwrap_or_default())
}

/// Registers `label` and persists the updated set.
///
/// Rejects the empty label; registering an existing label is a no-op, so
/// the set stays duplicate-free.
pub(crate) fn add(vault: &mut Vault, label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(ManagerError::EmptyServiceLabel.into());
    }

    let mut services = list(vault)?;
    if !services.iter().any(|s| s == label) {
        services.push(label.to_string());
        vault.write(SERVICES_KEY, &services)?;
    }

    Ok(())
}

/// Deregisters `label`; removing an absent label is a no-op.
pub(crate) fn remove(vault: &mut Vault, label: &str) -> Result<()> {
    let mut services = list(vault)?;
    if let Some(position) = services.iter().position(|s| s == label) {
        services.remove(position);
        vault.write(SERVICES_KEY, &services)?;
    }

    Ok(())
}

//! Delivery zone cache commands.

use saffron_storefront::db::PgDeliveryZoneStore;
use saffron_storefront::services::delivery::ZoneEntry;

use super::{CommandError, connect};

fn zone_line(zone: &ZoneEntry) -> String {
    let updated = zone
        .updated_at
        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
    format!(
        "{:<10} {:>4} min  {:<8} {updated}",
        zone.postal_code,
        zone.estimated_minutes,
        if zone.active { "active" } else { "closed" },
    )
}

/// Print every cached postal code.
pub async fn list() -> Result<(), CommandError> {
    let store = PgDeliveryZoneStore::new(connect().await?);
    let zones = store.list().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<10} {:>8}  {:<8} updated", "postal", "drive", "status");
        for zone in &zones {
            println!("{}", zone_line(zone));
        }
    }
    tracing::info!(count = zones.len(), "Listed delivery zones");
    Ok(())
}

/// Mark a postal code inactive so it is rejected without a distance call.
pub async fn deactivate(postal_code: &str) -> Result<(), CommandError> {
    let postal_code = postal_code.trim();
    if postal_code.is_empty() {
        return Err(CommandError::InvalidArgument(
            "postal code cannot be empty".to_string(),
        ));
    }

    let store = PgDeliveryZoneStore::new(connect().await?);
    store.deactivate(postal_code).await?;

    tracing::info!(postal_code, "Delivery zone deactivated");
    Ok(())
}

//! Order reconciliation commands.

use chrono::{TimeDelta, Utc};

use saffron_core::{Order, format_usd};
use saffron_storefront::db::PgOrderStore;

use super::{CommandError, connect};

fn order_line(order: &Order) -> String {
    format!(
        "{}  {}  {:<8} {:>9}  {} <{}>",
        order.order_number,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.order_type,
        format_usd(order.totals.total),
        order.customer.name,
        order.customer.email.as_str(),
    )
}

/// List pending orders older than `minutes`, oldest first.
pub async fn stale(minutes: u32) -> Result<(), CommandError> {
    let age = TimeDelta::try_minutes(i64::from(minutes))
        .ok_or_else(|| CommandError::InvalidArgument(format!("{minutes} minutes")))?;
    let older_than = Utc::now() - age;

    let store = PgOrderStore::new(connect().await?);
    let orders = store.list_stale_pending(older_than).await?;

    #[allow(clippy::print_stdout)]
    for order in &orders {
        println!("{}", order_line(order));
    }
    tracing::info!(count = orders.len(), minutes, "Listed stale pending orders");
    Ok(())
}

use anyhow::{Context, Result};
use rust_i18n::t;

use freerooms::service::RoomFinder;

pub async fn refresh_groups(finder: &RoomFinder) -> Result<()> {
    let outcome = finder
        .refresh_groups()
        .await
        .context("Failed to refresh groups")?;

    if outcome.replaced {
        println!("{}", t!("cli.refresh.groups_saved", count = outcome.count));
    } else {
        println!("{}", t!("cli.refresh.groups_empty", count = outcome.count));
    }
    Ok(())
}

pub async fn refresh_rooms(finder: &RoomFinder) -> Result<()> {
    let outcome = finder
        .refresh_rooms_catalog()
        .await
        .context("Failed to refresh rooms catalog")?;

    if outcome.replaced {
        println!(
            "{}",
            t!(
                "cli.refresh.rooms_saved",
                count = outcome.count,
                fetched = outcome.fetched
            )
        );
    } else {
        println!("{}", t!("cli.refresh.rooms_empty", count = outcome.count));
    }

    if !outcome.failures.is_empty() {
        println!(
            "{}",
            t!("cli.refresh.failures", count = outcome.failures.len())
        );
        for failure in &outcome.failures {
            tracing::warn!(group = %failure.group, reason = %failure.reason, "Group not fetched");
        }
    }
    Ok(())
}

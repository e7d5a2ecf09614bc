use anyhow::Result;
use rust_i18n::t;

use freerooms::error::{ErrorCategory, FreeRoomsErrorTrait};
use freerooms::models::Room;
use freerooms::service::{QueryOptions, RoomFinder};

const ROOMS_PER_LINE: usize = 8;

pub async fn query(
    finder: &RoomFinder,
    day: &str,
    slot: &str,
    page: usize,
    prefix: Option<String>,
) -> Result<()> {
    let options = QueryOptions { prefix };
    let response = match finder
        .query_with_options(day, slot, page.saturating_sub(1), &options)
        .await
    {
        Ok(response) => response,
        Err(e) if e.category() == ErrorCategory::Input => {
            anyhow::bail!("{}", e.localized_desc());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "{}",
        t!(
            "cli.query.header",
            date = response.day.date.format("%d.%m.%Y"),
            weekday = weekday_name(response.day.day_index),
            pair = response.pair.index,
            time = response.pair.label()
        )
    );
    if let Some(prefix) = &response.prefix {
        println!("{}", t!("cli.query.prefix", prefix = prefix));
    }
    println!("================================");

    let availability = &response.availability;
    if availability.free.is_empty() && availability.occupied.is_empty() {
        if finder.catalog().await.is_empty() {
            println!("{}", t!("cli.query.no_catalog"));
        } else {
            println!("{}", t!("cli.query.none"));
        }
    } else if response.page.items.is_empty() {
        println!("{}", t!("cli.query.none"));
    } else {
        print_rooms(&response.page.items);
    }

    println!();
    println!(
        "{}",
        t!(
            "cli.query.page",
            page = response.page.number(),
            pages = response.page.total_pages,
            total = response.page.total_count
        )
    );

    if response.fully_degraded() {
        println!("{}", t!("cli.query.fully_degraded"));
    } else if response.is_degraded() {
        println!(
            "{}",
            t!(
                "cli.query.degraded",
                failed = availability.failed,
                total = availability.fetched + availability.failed
            )
        );
    }
    for failure in &availability.failures {
        tracing::warn!(group = %failure.group, reason = %failure.reason, "Group not checked");
    }

    if !availability.uncatalogued.is_empty() {
        println!(
            "{}",
            t!("cli.query.uncatalogued", count = availability.uncatalogued.len())
        );
    }

    Ok(())
}

fn print_rooms(rooms: &[Room]) {
    for line in rooms.chunks(ROOMS_PER_LINE) {
        let names: Vec<&str> = line.iter().map(|room| room.name.as_str()).collect();
        println!("  {}", names.join("  "));
    }
}

fn weekday_name(day_index: u8) -> String {
    match day_index {
        0 => t!("cli.weekday.mon"),
        1 => t!("cli.weekday.tue"),
        2 => t!("cli.weekday.wed"),
        3 => t!("cli.weekday.thu"),
        4 => t!("cli.weekday.fri"),
        5 => t!("cli.weekday.sat"),
        _ => t!("cli.weekday.sun"),
    }
    .to_string()
}

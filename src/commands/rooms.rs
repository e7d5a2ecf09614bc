use anyhow::Result;
use rust_i18n::t;

use freerooms::service::RoomFinder;

pub async fn rooms(finder: &RoomFinder, prefix: Option<&str>) -> Result<()> {
    let catalog = finder.catalog().await;
    if catalog.is_empty() {
        println!("{}", t!("cli.rooms.none"));
        return Ok(());
    }

    let prefixes = catalog.prefixes();
    if !prefixes.is_empty() {
        println!("{}", t!("cli.rooms.prefixes", prefixes = prefixes.join(", ")));
    }

    let selected = match prefix {
        Some(prefix) => catalog.filter_prefix(prefix),
        None => (*catalog).clone(),
    };
    println!("{}", t!("cli.rooms.total", count = selected.len()));
    for room in selected.rooms() {
        match &room.building {
            Some(building) => println!("  {} ({building})", room.name),
            None => println!("  {}", room.name),
        }
    }
    Ok(())
}

pub fn pairs(finder: &RoomFinder) {
    println!("{}", t!("cli.pairs.header"));
    for pair in finder.mapper().pairs() {
        println!("  {}. {}", pair.index, pair.label());
    }
}

pub mod query;
pub mod refresh;
pub mod rooms;

// Re-export command functions for convenience
pub use query::query;
pub use refresh::{refresh_groups, refresh_rooms};
pub use rooms::{pairs, rooms};

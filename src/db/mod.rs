pub mod connection;
pub mod migrations;
pub mod queries;
pub mod store;

pub use connection::Database;
pub use store::{PlanStore, ProfileStore, Store};

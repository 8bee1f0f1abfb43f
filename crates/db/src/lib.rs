pub mod connection;
pub mod desk;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use desk::QuotationDesk;
pub use fixtures::{DemoSeedDataset, SeedResult};

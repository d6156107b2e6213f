pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{ClientSeedInfo, DemoClientDataset, SeedResult, VerificationResult};
pub use repositories::{
    ClientConfigRepository, LeadRepository, QuoteLogRepository, RepositoryError,
};

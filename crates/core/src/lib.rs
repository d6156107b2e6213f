pub mod client_cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ingest;
pub mod orchestrator;
pub mod pricing;

pub use client_cache::{
    ClientConfigCache, ClientConfigSource, ConfigLookupError, InvalidateScope, SourceError,
};
pub use domain::client::{Branding, ClientConfig, ClientId, QuoteSchema};
pub use domain::fields::{FieldError, FieldSet, FieldValue};
pub use domain::lead::{Lead, LeadId};
pub use domain::quote::{CustomerDetails, QuoteId, QuoteRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ingest::{parse_upload, IngestError};
pub use orchestrator::{QuoteComputation, QuoteOrchestrator};
pub use pricing::{PricingError, SchemaRegistry, SchemaStrategy};

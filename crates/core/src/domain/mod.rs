pub mod client;
pub mod fields;
pub mod lead;
pub mod quote;

pub mod analysis;
pub mod auth;
pub mod deadlines;
pub mod enrichment;
pub mod extraction;

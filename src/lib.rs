//! Normalizes machine-generated test reports (JUnit XML, TRX, Jest JSON,
//! Mocha JSON) into one result model, then projects that model into a
//! bounded set of inline annotations and a size-capped markdown summary.
//!
//! ```text
//! report files ──> decoders ──> TestRunResult* ──┬──> annotation selector
//!                                                └──> report renderer
//!                                                          │
//!                                                      publisher
//! ```

pub mod annotate;
pub mod config;
pub mod decoders;
pub mod discover;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod resolve;

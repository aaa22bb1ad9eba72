//! Upstream client implementations for finwatch.
//!
//! This crate provides concrete implementations of the traits in
//! `finwatch-abstraction`.
//!
//! # Supported Backends
//!
//! - **AWS**: Cost Explorer, AWS Config, S3 and SES v2 via the AWS SDK
//! - **Memory**: In-process fakes for tests and local dry runs

pub mod aws;
pub mod memory;

pub use aws::{ConfigServiceCompliance, CostExplorerBilling, S3ObjectStore, SesNotifier};
pub use memory::{InMemoryBilling, InMemoryCompliance, InMemoryObjectStore, RecordingNotifier};

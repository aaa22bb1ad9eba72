//! AWS SDK backed clients.
//!
//! All clients are built from one shared `SdkConfig`, loaded once per cold start:
//!
//! ```rust,no_run
//! # async fn example() {
//! let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
//! let billing = finwatch_clients::CostExplorerBilling::new(&sdk_config);
//! # }
//! ```

mod config_service;
mod cost_explorer;
mod s3;
mod ses;

pub use config_service::ConfigServiceCompliance;
pub use cost_explorer::CostExplorerBilling;
pub use s3::S3ObjectStore;
pub use ses::SesNotifier;

use aws_sdk_config::error::{DisplayErrorContext, ProvideErrorMetadata};

/// Renders an SDK error as `code: message`, falling back to the full error chain
/// when the service returned no metadata (e.g., dispatch or timeout failures).
pub(crate) fn describe_sdk_error<E>(err: &E) -> String
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(err).to_string(),
    }
}

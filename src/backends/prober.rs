//! # Status prober.

use async_trait::async_trait;

use crate::model::{RuntimeStatus, Target};

/// Looks up the runtime status of one target.
///
/// Called from a probe worker while it holds an admission token. The call may
/// take as long as it needs (an SSH round trip, a `compose ps`); errors are
/// reported inside the returned status via [`RuntimeStatus::error`].
#[async_trait]
pub trait StatusProber: Send + Sync + 'static {
    async fn status(&self, target: &Target) -> RuntimeStatus;
}

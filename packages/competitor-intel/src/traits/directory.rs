//! Company directory boundary used by deduplication.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::types::entity::CompanyIdentity;

/// Read access to the companies that already exist.
///
/// The snapshot is fetched fresh for every dedup check rather than
/// cached; the storage layer behind it owns the records.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    async fn companies(&self) -> ServiceResult<Vec<CompanyIdentity>>;
}

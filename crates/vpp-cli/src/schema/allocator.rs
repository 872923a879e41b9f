use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vpp_analysis::allocation::PossessionAllocator;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllocatorFile {
    pub fitted_at: DateTime<Utc>,
    pub allocator: PossessionAllocator,
}

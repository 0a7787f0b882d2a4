use serde::{Deserialize, Serialize};

/// Follow statistics for a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub following_count: u64,
    pub followers_count: u64,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use miser_core::{Id, Millionths};

/// A balance snapshot: the value of one account immediately after one
/// transaction touching it. There is exactly one visible snapshot per
/// `(account, transaction)` pair; later snapshots on the same pair
/// overwrite earlier ones on replay (see `miser_registry::BalanceRegistry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub id: Id,
    pub account: Id,
    pub transaction: Id,
    pub value: Millionths,
    pub instant: DateTime<Utc>,
}

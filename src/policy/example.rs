//! `example_policy_v1`: a demonstration policy that alternates between one and
//! two days of retention.
//!
//! The choice is driven by the parity of the transaction seed, never by a
//! local clock read, so replicas agree.

use std::time::Duration;

use crate::core::Result;
use crate::model::ChunkData;
use crate::policy::{Policy, PolicyContext, PolicyId};

pub const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const TWO_DAYS: Duration = Duration::from_secs(48 * 60 * 60);

pub const EXAMPLE_POLICY: Policy = Policy::new(
    PolicyId::ExamplePolicyV1,
    "This is a sample policy.",
    evaluate,
);

fn evaluate(_chunk: &ChunkData, ctx: &PolicyContext) -> Result<Duration> {
    if ctx.seed % 2 == 0 {
        Ok(TWO_DAYS)
    } else {
        Ok(ONE_DAY)
    }
}

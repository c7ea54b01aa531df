//! String-argument entry point for hosts.
//!
//! A host receives a function name and positional string arguments from the
//! outside world and forwards them to [`invoke`], which dispatches to the
//! [`Watchdog`] engine and serializes the result as JSON. Unit results are
//! `null`. Array arguments of `AddChunkWithPolicyBatch` are JSON string
//! arrays.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Serialize;

use crate::core::{Error, Result};
use crate::ledger::Stub;
use crate::lifecycle::Watchdog;

/// Public operations, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    AddChunk,
    AddChunkWithPolicy,
    AddChunkWithPolicyBatch,
    ApplyPolicy,
    UpdateChunkExpiryDate,
    GetExpiredChunks,
    DeleteChunkIfExpired,
    GetAllAssets,
    ChunkExisted,
    ReadChunk,
    GetChunkHistory,
    GetAvailablePolicies,
}

impl Function {
    pub const ALL: [Function; 12] = [
        Function::AddChunk,
        Function::AddChunkWithPolicy,
        Function::AddChunkWithPolicyBatch,
        Function::ApplyPolicy,
        Function::UpdateChunkExpiryDate,
        Function::GetExpiredChunks,
        Function::DeleteChunkIfExpired,
        Function::GetAllAssets,
        Function::ChunkExisted,
        Function::ReadChunk,
        Function::GetChunkHistory,
        Function::GetAvailablePolicies,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::AddChunk => "AddChunk",
            Function::AddChunkWithPolicy => "AddChunkWithPolicy",
            Function::AddChunkWithPolicyBatch => "AddChunkWithPolicyBatch",
            Function::ApplyPolicy => "ApplyPolicy",
            Function::UpdateChunkExpiryDate => "UpdateChunkExpiryDate",
            Function::GetExpiredChunks => "GetExpiredChunks",
            Function::DeleteChunkIfExpired => "DeleteChunkIfExpired",
            Function::GetAllAssets => "GetAllAssets",
            Function::ChunkExisted => "ChunkExisted",
            Function::ReadChunk => "ReadChunk",
            Function::GetChunkHistory => "GetChunkHistory",
            Function::GetAvailablePolicies => "GetAvailablePolicies",
        }
    }

    /// Number of positional arguments.
    pub fn arity(self) -> usize {
        match self {
            Function::GetAllAssets | Function::GetAvailablePolicies => 0,
            Function::UpdateChunkExpiryDate
            | Function::GetExpiredChunks
            | Function::DeleteChunkIfExpired
            | Function::ChunkExisted
            | Function::ReadChunk
            | Function::GetChunkHistory => 1,
            Function::AddChunk => 2,
            Function::AddChunkWithPolicy
            | Function::AddChunkWithPolicyBatch
            | Function::ApplyPolicy => 3,
        }
    }

    /// True for functions that never write.
    pub fn is_query(self) -> bool {
        matches!(
            self,
            Function::GetExpiredChunks
                | Function::GetAllAssets
                | Function::ChunkExisted
                | Function::ReadChunk
                | Function::GetChunkHistory
                | Function::GetAvailablePolicies
        )
    }
}

impl FromStr for Function {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Function::ALL
            .into_iter()
            .find(|function| function.name() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown function {s:?}")))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize)]
struct PolicyView {
    id: &'static str,
    description: &'static str,
}

/// Run `function` against `stub` and return its JSON-encoded result.
pub fn invoke<S: Stub + ?Sized>(
    engine: &Watchdog,
    stub: &mut S,
    function: &str,
    args: &[String],
) -> Result<Vec<u8>> {
    let function: Function = function.parse()?;
    if args.len() != function.arity() {
        return Err(Error::InvalidArgument(format!(
            "{function} takes {} argument(s), got {}",
            function.arity(),
            args.len()
        )));
    }
    debug!("tx {}: invoke {function}", stub.tx_id());

    match function {
        Function::AddChunk => to_json(&engine.add_chunk(stub, &args[0], &args[1])?),
        Function::AddChunkWithPolicy => {
            to_json(&engine.add_chunk_with_policy(stub, &args[0], &args[1], &args[2])?)
        }
        Function::AddChunkWithPolicyBatch => {
            let ids = string_array("ids", &args[0])?;
            let data = string_array("data", &args[1])?;
            let policies = string_array("policyIds", &args[2])?;
            to_json(&engine.add_chunk_with_policy_batch(stub, &ids, &data, &policies)?)
        }
        Function::ApplyPolicy => {
            to_json(&engine.apply_policy(stub, &args[0], &args[1], &args[2])?)
        }
        Function::UpdateChunkExpiryDate => {
            to_json(&engine.update_chunk_expiry_date(stub, &args[0])?)
        }
        Function::GetExpiredChunks => to_json(&engine.get_expired_chunks(stub, &args[0])?),
        Function::DeleteChunkIfExpired => {
            to_json(&engine.delete_chunk_if_expired(stub, &args[0])?)
        }
        Function::GetAllAssets => to_json(&engine.get_all_assets(stub)?),
        Function::ChunkExisted => to_json(&engine.chunk_existed(stub, &args[0])?),
        Function::ReadChunk => to_json(&engine.read_chunk(stub, &args[0])?),
        Function::GetChunkHistory => to_json(&engine.get_chunk_history(stub, &args[0])?),
        Function::GetAvailablePolicies => {
            let policies: Vec<PolicyView> = engine
                .available_policies()
                .into_iter()
                .map(|policy| PolicyView {
                    id: policy.id.as_str(),
                    description: policy.description,
                })
                .collect();
            to_json(&policies)
        }
    }
}

fn string_array(name: &str, arg: &str) -> Result<Vec<String>> {
    serde_json::from_str(arg).map_err(|err| {
        Error::InvalidArgument(format!("{name} must be a JSON array of strings: {err}"))
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|err| Error::Encode(format!("unable to encode result: {err}")))
}

//!
//! Two-hop provenance check.
//!
//! An output is trusted to descend from a genesis issuance when the transaction that created it
//! (the parent) spent either another output of the same covenant or the genesis itself. Each
//! spend checks exactly one such hop, so an arbitrarily long history is covered by induction
//! without any spend ever walking more than two transactions.
//!

use serde::{Deserialize, Serialize};
use tessera_consensus_core::{
    hashing::{sighash::SigHashFields, tx::id_from_bytes},
    tx::{Transaction, TransactionOutpoint},
};
use tessera_core::{debug, trace};
use tessera_hashes::Hash;
use tessera_txscript_errors::{VerificationError, VerificationResult};

/// Where a lineage may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenesisAnchor {
    /// The parent must have spent exactly this outpoint. Used by minters.
    Outpoint(TransactionOutpoint),
    /// The grandparent output must be locked by this script. Used by tokens, anchored at their minter.
    Script(Hash),
}

/// Raw ancestry of the spent output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktraceInfo {
    pub parent_tx: Vec<u8>,
    /// The parent input through which the lineage continues.
    pub parent_input_index: u32,
    pub grandparent_tx: Vec<u8>,
}

impl BacktraceInfo {
    pub fn new(parent: &Transaction, parent_input_index: u32, grandparent: &Transaction) -> Self {
        Self { parent_tx: parent.to_bytes(), parent_input_index, grandparent_tx: grandparent.to_bytes() }
    }
}

/// Verifies one hop of the lineage of the output spent by the input `fields` belong to.
pub fn backtrace(info: &BacktraceInfo, fields: &SigHashFields, anchor: &GenesisAnchor) -> VerificationResult<()> {
    let result = backtrace_inner(info, fields, anchor);
    match &result {
        Ok(()) => trace!("backtrace of {} accepted", fields.outpoint),
        Err(err) => debug!("backtrace of {} rejected ({:?}): {}", fields.outpoint, err.reason(), err),
    }
    result
}

fn backtrace_inner(info: &BacktraceInfo, fields: &SigHashFields, anchor: &GenesisAnchor) -> VerificationResult<()> {
    let self_script_hash = fields.spent_script_hash;

    // The parent is the transaction which created the spent output
    let parent_id = id_from_bytes(&info.parent_tx);
    if parent_id != fields.outpoint.transaction_id {
        return Err(VerificationError::ParentIdMismatch { expected: fields.outpoint.transaction_id, computed: parent_id });
    }
    let parent = Transaction::from_bytes(&info.parent_tx)?;
    match parent.outputs.get(fields.outpoint.index as usize) {
        Some(output) if output.script_public_key.script_hash() == self_script_hash => {}
        _ => return Err(VerificationError::ParentOutputMismatch(fields.outpoint.index)),
    }

    let parent_input =
        parent.inputs.get(info.parent_input_index as usize).ok_or(VerificationError::ParentInputOutOfRange(info.parent_input_index))?;
    let lineage_outpoint = parent_input.previous_outpoint;

    let grandparent_id = id_from_bytes(&info.grandparent_tx);
    if grandparent_id != lineage_outpoint.transaction_id {
        return Err(VerificationError::GrandparentIdMismatch { expected: lineage_outpoint.transaction_id, computed: grandparent_id });
    }
    let grandparent = Transaction::from_bytes(&info.grandparent_tx)?;
    let grandparent_output = grandparent
        .outputs
        .get(lineage_outpoint.index as usize)
        .ok_or(VerificationError::GrandparentOutputOutOfRange(lineage_outpoint.index))?;
    let grandparent_script_hash = grandparent_output.script_public_key.script_hash();

    // Induction step: the parent continued the same covenant
    if grandparent_script_hash == self_script_hash {
        return Ok(());
    }

    let reaches_genesis = match anchor {
        GenesisAnchor::Outpoint(genesis) => lineage_outpoint == *genesis,
        GenesisAnchor::Script(genesis_script_hash) => grandparent_script_hash == *genesis_script_hash,
    };
    if reaches_genesis { Ok(()) } else { Err(VerificationError::BrokenLineage(lineage_outpoint)) }
}

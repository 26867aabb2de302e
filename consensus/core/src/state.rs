//!
//! Application records carried by state-bearing outputs.
//!
//! A record is committed to by its state hash: the `StateHash` domain digest of its borsh
//! encoding. The record itself never appears on the ledger; spenders resupply it as witness
//! data and covenants recompute the hash.
//!

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tessera_hashes::{Hash, Hasher, HasherBase, OwnerKeyHash, StateHash};

/// Adapts a hasher to `io::Write` so records can be encoded straight into it.
struct HashWriter<H: HasherBase>(H);

impl<H: HasherBase> Write for HashWriter<H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub trait StateRecord: BorshSerialize {
    /// Prefix separating record kinds which share a field layout.
    const KIND: u8;

    fn state_hash(&self) -> Hash {
        let mut writer = HashWriter(StateHash::new());
        writer.0.update([Self::KIND]);
        self.serialize(&mut writer).expect("writing into a hasher never fails");
        writer.0.finalize()
    }
}

/// Who may spend a token output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "hash")]
pub enum OwnerAddress {
    /// Hash of a public key; spending requires a signature by that key.
    Key(Hash),
    /// Script hash of a contract; spending requires that contract to be co-spent.
    Contract(Hash),
}

impl OwnerAddress {
    pub fn from_pubkey(pubkey: &[u8]) -> Self {
        Self::Key(OwnerKeyHash::hash(pubkey))
    }
}

/// A fungible token balance.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct FtState {
    pub owner: OwnerAddress,
    pub amount: i64,
}

impl StateRecord for FtState {
    const KIND: u8 = 1;
}

/// A non-fungible token identity.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftState {
    pub owner: OwnerAddress,
    pub local_id: i64,
}

impl StateRecord for NftState {
    const KIND: u8 = 2;
}

/// State of an open minter: the allocation tree root and the next identity to hand out.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftOpenMinterState {
    pub nft_script_hash: Hash,
    pub merkle_root: Hash,
    pub next_local_id: i64,
}

impl StateRecord for NftOpenMinterState {
    const KIND: u8 = 3;
}

/// State of a closed (issuer-only) minter.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftClosedMinterState {
    pub nft_script_hash: Hash,
    pub max_count: i64,
    pub next_local_id: i64,
}

impl StateRecord for NftClosedMinterState {
    const KIND: u8 = 4;
}

/// State of a fungible token minter: the supply cap and the amount issued so far.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtClosedMinterState {
    pub token_script_hash: Hash,
    pub max_supply: i64,
    pub minted: i64,
}

impl StateRecord for FtClosedMinterState {
    const KIND: u8 = 7;
}

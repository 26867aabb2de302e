use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Formatter},
    str::{self, FromStr},
};
use tessera_hashes::{Hash, Hasher, ScriptHash};

/// Represents the ScriptPublicKey Version
pub type ScriptPublicKeyVersion = u16;

/// Marker script of the state root output (output 0). Its payload lives in the output data
/// field, the script itself only makes the output unspendable.
pub const STATE_ROOT_SCRIPT: &[u8] = &[0x6a, 0x74, 0x73, 0x72];

/// A locking script together with its version.
#[derive(Default, PartialEq, Eq, Clone, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPublicKey {
    pub version: ScriptPublicKeyVersion,
    script: Vec<u8>, // Kept private to preserve read-only semantics
}

impl Debug for ScriptPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = vec![0u8; self.script.len() * 2];
        let hex = faster_hex::hex_encode(&self.script, &mut hex).map_err(|_| std::fmt::Error)?;
        f.debug_struct("ScriptPublicKey").field("version", &self.version).field("script", &hex).finish()
    }
}

impl ScriptPublicKey {
    pub fn new(version: ScriptPublicKeyVersion, script: Vec<u8>) -> Self {
        Self { version, script }
    }

    pub fn from_vec(version: ScriptPublicKeyVersion, script: Vec<u8>) -> Self {
        Self::new(version, script)
    }

    pub fn state_root() -> Self {
        Self::new(0, STATE_ROOT_SCRIPT.to_vec())
    }

    pub fn version(&self) -> ScriptPublicKeyVersion {
        self.version
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// The hash by which covenants whitelist each other.
    pub fn script_hash(&self) -> Hash {
        ScriptHash::hash(&self.script)
    }

    pub fn is_state_root(&self) -> bool {
        self.script == STATE_ROOT_SCRIPT
    }
}

impl FromStr for ScriptPublicKey {
    type Err = faster_hex::Error;

    /// Parses a hex-encoded version 0 script.
    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        let mut script = vec![0u8; hex_str.len() / 2];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut script)?;
        Ok(Self::new(0, script))
    }
}

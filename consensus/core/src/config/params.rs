use serde::{Deserialize, Serialize};
use tessera_core::debug;
use tessera_hashes::Hash;

use super::constants::MERKLE_TREE_MAX_LEAVES;
use crate::{
    errors::{ParamsError, ParamsResult},
    state::OwnerAddress,
    tx::TransactionOutpoint,
};

/// How identities of a collection are handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinterKind {
    /// Anyone may claim the next pre-allocated identity by proving it unminted.
    Open,
    /// Only the issuer may mint.
    Closed,
}

/// Deploy-time parameters of a collection. These are baked into the minter, token and guard
/// covenants of the collection and never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionParams {
    pub name: String,
    pub minter_kind: MinterKind,
    /// The one-time outpoint consumed by the collection genesis. Minter backtraces terminate here.
    pub genesis_outpoint: TransactionOutpoint,
    /// Number of identities the collection may ever allocate.
    pub max_count: i64,
    /// Required for closed minters.
    #[serde(default)]
    pub issuer: Option<OwnerAddress>,
    /// Script hashes of every guard variant the collection tokens accept as a co-spend.
    pub guard_script_hashes: Vec<Hash>,
}

impl CollectionParams {
    pub fn validate(&self) -> ParamsResult<()> {
        let max = MERKLE_TREE_MAX_LEAVES as i64;
        if !(1..=max).contains(&self.max_count) {
            return Err(ParamsError::MaxCountOutOfRange(self.max_count, max));
        }
        if self.guard_script_hashes.is_empty() {
            return Err(ParamsError::NoGuardScripts);
        }
        if self.minter_kind == MinterKind::Closed && self.issuer.is_none() {
            return Err(ParamsError::MissingIssuer);
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> ParamsResult<Self> {
        let params: Self = serde_json::from_str(json).map_err(|err| ParamsError::Parse(err.to_string()))?;
        params.validate()?;
        debug!("loaded params of collection {} ({:?} minter, max count {})", params.name, params.minter_kind, params.max_count);
        Ok(params)
    }
}

pub struct CollectionParamsBuilder {
    params: CollectionParams,
}

impl CollectionParamsBuilder {
    pub fn new(name: &str, genesis_outpoint: TransactionOutpoint) -> Self {
        Self {
            params: CollectionParams {
                name: name.to_string(),
                minter_kind: MinterKind::Open,
                genesis_outpoint,
                max_count: 1,
                issuer: None,
                guard_script_hashes: vec![],
            },
        }
    }

    pub fn max_count(mut self, max_count: i64) -> Self {
        self.params.max_count = max_count;
        self
    }

    pub fn closed(mut self, issuer: OwnerAddress) -> Self {
        self.params.minter_kind = MinterKind::Closed;
        self.params.issuer = Some(issuer);
        self
    }

    pub fn accept_guard(mut self, guard_script_hash: Hash) -> Self {
        self.params.guard_script_hashes.push(guard_script_hash);
        self
    }

    pub fn edit<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut CollectionParams),
    {
        edit_func(&mut self.params);
        self
    }

    pub fn build(self) -> ParamsResult<CollectionParams> {
        self.params.validate()?;
        Ok(self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_validation() {
        let genesis = TransactionOutpoint::new(1.into(), 0);
        let params = CollectionParamsBuilder::new("cats", genesis).max_count(100).accept_guard(3.into()).build().unwrap();
        assert_eq!(params.minter_kind, MinterKind::Open);
        assert_eq!(params.max_count, 100);

        assert_eq!(CollectionParamsBuilder::new("cats", genesis).max_count(100).build(), Err(ParamsError::NoGuardScripts));
        assert_eq!(
            CollectionParamsBuilder::new("cats", genesis).max_count(0).accept_guard(3.into()).build(),
            Err(ParamsError::MaxCountOutOfRange(0, MERKLE_TREE_MAX_LEAVES as i64))
        );
        assert_eq!(
            CollectionParamsBuilder::new("cats", genesis)
                .max_count(MERKLE_TREE_MAX_LEAVES as i64 + 1)
                .accept_guard(3.into())
                .build()
                .map(|p| p.max_count),
            Err(ParamsError::MaxCountOutOfRange(MERKLE_TREE_MAX_LEAVES as i64 + 1, MERKLE_TREE_MAX_LEAVES as i64))
        );
        assert_eq!(
            CollectionParamsBuilder::new("cats", genesis).accept_guard(3.into()).edit(|p| p.minter_kind = MinterKind::Closed).build(),
            Err(ParamsError::MissingIssuer)
        );
    }

    #[test]
    fn test_from_toml() {
        let params: CollectionParams = toml::from_str(
            r#"
            name = "dogs"
            minterKind = "closed"
            maxCount = 10
            guardScriptHashes = ["0100000000000000000000000000000000000000000000000000000000000000"]

            [genesisOutpoint]
            transactionId = "0200000000000000000000000000000000000000000000000000000000000000"
            index = 3

            [issuer]
            type = "key"
            hash = "0400000000000000000000000000000000000000000000000000000000000000"
            "#,
        )
        .unwrap();
        params.validate().unwrap();
        assert_eq!(params.genesis_outpoint, TransactionOutpoint::new(2.into(), 3));
        assert_eq!(params.issuer, Some(OwnerAddress::Key(4.into())));
        assert_eq!(params.guard_script_hashes, vec![Hash::from(1u64)]);
    }

    #[test]
    fn test_from_json_round_trip() {
        let genesis = TransactionOutpoint::new(9.into(), 1);
        let params = CollectionParamsBuilder::new("cats", genesis).max_count(5).accept_guard(3.into()).build().unwrap();
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(CollectionParams::from_json(&json).unwrap(), params);
        assert!(matches!(CollectionParams::from_json("{}"), Err(ParamsError::Parse(_))));
    }
}

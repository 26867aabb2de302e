use crate::{HASH_SIZE, Hash, Hasher, HasherBase};
use sha2::{Digest, Sha256};

macro_rules! blake2b_hasher {
    ($(struct $name:ident => $domain_sep:literal),+ $(,)? ) => {$(
        #[derive(Clone)]
        pub struct $name(blake2b_simd::State);

        impl $name {
            #[inline(always)]
            pub fn new() -> Self {
                Self(blake2b_simd::Params::new().hash_length(HASH_SIZE).key($domain_sep).to_state())
            }

            pub fn write<A: AsRef<[u8]>>(&mut self, data: A) {
                self.0.update(data.as_ref());
            }

            #[inline(always)]
            pub fn finalize(self) -> Hash {
                let mut out = [0u8; HASH_SIZE];
                out.copy_from_slice(self.0.finalize().as_bytes());
                Hash::from_bytes(out)
            }
        }
    impl_hasher!{ struct $name }
    )*};
}

macro_rules! sha256_hasher {
    ($(struct $name:ident),+ $(,)? ) => {$(
        #[derive(Clone)]
        pub struct $name(Sha256);

        impl $name {
            #[inline(always)]
            pub fn new() -> Self {
                Self(Sha256::new())
            }

            pub fn write<A: AsRef<[u8]>>(&mut self, data: A) {
                self.0.update(data.as_ref());
            }

            #[inline(always)]
            pub fn finalize(self) -> Hash {
                Hash::from_bytes(self.0.finalize().into())
            }
        }
    impl_hasher!{ struct $name }
    )*};
}

macro_rules! impl_hasher {
    (struct $name:ident) => {
        impl HasherBase for $name {
            #[inline(always)]
            fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
                self.write(data);
                self
            }
        }
        impl Hasher for $name {
            #[inline(always)]
            fn finalize(self) -> Hash {
                // Call the method
                $name::finalize(self)
            }
            #[inline(always)]
            fn reset(&mut self) {
                *self = Self::new();
            }
        }
        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

blake2b_hasher! {
    struct TransactionHash => b"TransactionHash",
    struct TransactionSigningHash => b"TransactionSigningHash",
    struct StateHash => b"StateHash",
    struct StateSlotHash => b"StateSlotHash",
    struct StateHashRoot => b"StateHashRoot",
    struct MerkleLeafFieldHash => b"MerkleLeafFieldHash",
    struct MerkleLeafHash => b"MerkleLeafHash",
    struct MerkleBranchHash => b"MerkleBranchHash",
}

sha256_hasher! {
    struct ScriptHash,
    struct OwnerKeyHash,
}

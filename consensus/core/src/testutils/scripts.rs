use crate::tx::ScriptPublicKey;

/// An anyone-can-spend script used for fee and change outputs in tests.
pub fn op_true_script() -> ScriptPublicKey {
    ScriptPublicKey::new(0, vec![0x51])
}

/// A stand-in locking script for a named covenant. Distinct names yield distinct script hashes.
pub fn covenant_script(name: &str) -> ScriptPublicKey {
    let mut script = vec![0xc0];
    script.extend_from_slice(name.as_bytes());
    ScriptPublicKey::new(0, script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covenant_scripts_are_distinct() {
        assert_ne!(covenant_script("token").script_hash(), covenant_script("guard").script_hash());
        assert_ne!(covenant_script("").script_hash(), op_true_script().script_hash());
    }
}

//! Shared fixtures for unit tests

use crate::compiler::CompiledArtifact;
use crate::signer::SignerKey;

/// ABI of the sample `Greeter` contract, as solc prints it
pub const GREETER_ABI: &str = r#"[{"inputs":[{"internalType":"string","name":"_greeting","type":"string"}],"stateMutability":"nonpayable","type":"constructor"},{"inputs":[],"name":"greet","outputs":[{"internalType":"string","name":"","type":"string"}],"stateMutability":"view","type":"function"},{"inputs":[{"internalType":"string","name":"_greeting","type":"string"}],"name":"setGreeting","outputs":[],"stateMutability":"nonpayable","type":"function"}]"#;

/// Creation bytecode prefix; enough to exercise hex handling
pub const GREETER_BIN: &str = "608060405234801561001057600080fd5b50";

/// First well-known development account key of local test nodes
pub const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from [`DEV_KEY`]
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// `solc --combined-json abi,bin contracts/Greeter.sol` output
pub fn greeter_combined_json() -> String {
    let abi: serde_json::Value = serde_json::from_str(GREETER_ABI).unwrap();
    serde_json::json!({
        "contracts": {
            "contracts/Greeter.sol:Greeter": {
                "abi": abi,
                "bin": GREETER_BIN
            }
        },
        "version": "0.8.24+commit.e11b9ed9.Linux.g++"
    })
    .to_string()
}

pub fn greeter_artifact() -> CompiledArtifact {
    CompiledArtifact::new("Greeter", GREETER_BIN, GREETER_ABI.as_bytes().to_vec())
}

pub fn dev_key() -> SignerKey {
    SignerKey::from_hex(DEV_KEY).unwrap()
}

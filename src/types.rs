//! Chain JSON-RPC types
//!
//! Type definitions for block overviews, transactions, contract receipts
//! and contract call results returned by the node.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Satoshis per whole coin.
pub const COIN: u64 = 100_000_000;

/// Script type tag of a contract creation output.
pub const SCRIPT_TYPE_CREATE: &str = "create";
/// Script type tag of a contract call output.
pub const SCRIPT_TYPE_CALL: &str = "call";
/// Script type tag of a pay-to-pubkey-hash output.
pub const SCRIPT_TYPE_PUBKEYHASH: &str = "pubkeyhash";

/// Consensus flavour of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlags {
    ProofOfWork,
    ProofOfStake,
}

impl BlockFlags {
    pub fn is_proof_of_stake(self) -> bool {
        self == BlockFlags::ProofOfStake
    }
}

/// Block overview: header fields plus the ordered transaction ids.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockOverview {
    pub hash: String,

    pub height: u64,

    /// Block timestamp (Unix epoch seconds)
    pub time: u64,

    #[serde(rename = "flags", default = "default_flags", deserialize_with = "deserialize_flags")]
    pub flags: BlockFlags,

    /// Ordered transaction ids
    #[serde(rename = "tx", default)]
    pub txids: Vec<String>,

    /// Difficulty as the node printed it, kept as text for exact arithmetic
    #[serde(default = "zero_string", deserialize_with = "deserialize_number_string")]
    pub difficulty: String,

    #[serde(default)]
    pub size: u64,
}

/// Raw transaction with resolved inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    #[serde(rename = "txid")]
    pub hash: String,

    /// Transaction time (absent for mempool-only nodes, defaults to 0)
    #[serde(default)]
    pub time: u64,

    #[serde(rename = "vin", default)]
    pub inputs: Vec<TxInput>,

    #[serde(rename = "vout", default)]
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Outputs whose script creates or calls a contract.
    pub fn contract_outputs(&self) -> impl Iterator<Item = &TxOutput> {
        self.outputs.iter().filter(|o| o.script_pub_key.is_contract())
    }
}

/// Transaction input.
///
/// `address` and `value_sat` describe the output being spent. Nodes with an
/// address index report them directly; otherwise the RPC client fills them in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxInput {
    #[serde(default)]
    pub txid: Option<String>,

    #[serde(default)]
    pub vout: Option<u32>,

    /// Present only on coinbase inputs
    #[serde(default)]
    pub coinbase: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(rename = "valueSat", default)]
    pub value_sat: Option<u64>,
}

impl TxInput {
    pub fn is_coinbase(&self) -> bool {
        self.coinbase.is_some()
    }
}

/// Transaction output.
#[derive(Debug, Clone, Deserialize)]
pub struct TxOutput {
    /// Output value in satoshis (coin amount in JSON)
    #[serde(rename = "value", deserialize_with = "deserialize_coin_to_sat")]
    pub value_sat: u64,

    pub n: u32,

    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// Locking script of an output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub hex: String,

    #[serde(rename = "type", default)]
    pub script_type: String,

    #[serde(default)]
    pub addresses: Vec<String>,

    /// Newer nodes report a single `address` instead of `addresses`
    #[serde(default)]
    pub address: Option<String>,
}

impl ScriptPubKey {
    pub fn is_create(&self) -> bool {
        self.script_type == SCRIPT_TYPE_CREATE
    }

    pub fn is_call(&self) -> bool {
        self.script_type == SCRIPT_TYPE_CALL
    }

    pub fn is_contract(&self) -> bool {
        self.is_create() || self.is_call()
    }

    pub fn is_pubkeyhash(&self) -> bool {
        self.script_type == SCRIPT_TYPE_PUBKEYHASH
    }

    /// All destination addresses, whichever field the node used.
    pub fn destinations(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.addresses.iter().map(String::as_str).collect();
        if let Some(addr) = &self.address {
            if !out.contains(&addr.as_str()) {
                out.push(addr);
            }
        }
        out
    }
}

/// One contract execution receipt, aligned with a contract-bearing output.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptEntry {
    /// Resulting contract address (hex, 40 chars; all zeros if creation failed)
    #[serde(rename = "contractAddress", default)]
    pub contract_address: String,

    #[serde(rename = "log", default)]
    pub logs: Vec<LogEntry>,

    #[serde(default)]
    pub excepted: Option<String>,
}

/// Log entry emitted during contract execution.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    /// Emitting contract (hex), when reported
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub data: String,
}

/// Result of a read-only contract call.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractCallResult {
    #[serde(rename = "executionResult")]
    pub execution_result: ExecutionResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub output: String,

    #[serde(default)]
    pub excepted: Option<String>,
}

/// Address index balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressBalance {
    /// Confirmed balance in satoshis
    pub balance: i64,
}

// Deserialization helpers

fn default_flags() -> BlockFlags {
    BlockFlags::ProofOfWork
}

fn zero_string() -> String {
    "0".to_string()
}

/// Deserialize the node's flag string ("proof-of-stake" / "proof-of-work").
fn deserialize_flags<'de, D>(deserializer: D) -> Result<BlockFlags, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(match s {
        Some(s) if s.contains("proof-of-stake") => BlockFlags::ProofOfStake,
        _ => BlockFlags::ProofOfWork,
    })
}

/// Deserialize a JSON number (or numeric string) into its textual form.
fn deserialize_number_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(zero_string()),
        other => Err(serde::de::Error::custom(format!(
            "Expected number, got {}",
            other
        ))),
    }
}

/// Convert a coin amount as printed by the node into satoshis, exactly.
pub fn coin_text_to_sat(text: &str) -> Option<u64> {
    let amount = BigDecimal::from_str(text).ok()?;
    (amount * BigDecimal::from(COIN)).with_scale(0).to_u64()
}

/// Render satoshis as a coin amount without trailing zeros ("12.5", "4").
pub fn sat_to_coin_text(sats: u64) -> String {
    let whole = sats / COIN;
    let frac = sats % COIN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:08}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Deserialize a coin amount (JSON number) to satoshis.
fn deserialize_coin_to_sat<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let text = deserialize_number_string(deserializer)?;
    coin_text_to_sat(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid coin amount: {}", text)))
}

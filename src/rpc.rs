//! JSON-RPC client for the chain node
//!
//! Implements [`ChainSource`] over the node's JSON-RPC interface. Inputs the
//! node reports without an address or value are resolved from the
//! transaction they spend.

use crate::address::to_hex;
use crate::chain::ChainSource;
use crate::types::{
    AddressBalance, BlockOverview, ContractCallResult, ReceiptEntry, Transaction,
};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

/// JSON-RPC client for the node.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
}

impl RpcClient {
    pub fn new(url: String, auth: Option<(String, String)>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            auth,
        }
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some((user, password)) = &self.auth {
            builder = builder.basic_auth(user, Some(password));
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send RPC request {}", method))?;

        // Error responses come with HTTP 500 and a JSON body
        let json: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse RPC response to {}", method))?;

        extract_result(method, json)
    }

    async fn fetch_transaction(&self, tx_hash: &str) -> Result<Transaction> {
        let result = self
            .call("getrawtransaction", json!([tx_hash, true]))
            .await?;
        serde_json::from_value(result)
            .with_context(|| format!("Failed to deserialize transaction {}", tx_hash))
    }

    /// Fill in address and value of inputs from the outputs they spend.
    async fn resolve_inputs(&self, tx: &mut Transaction) -> Result<()> {
        let mut spent: HashMap<String, Transaction> = HashMap::new();

        for input in tx.inputs.iter_mut() {
            if input.is_coinbase() || (input.address.is_some() && input.value_sat.is_some()) {
                continue;
            }
            let (Some(prev_txid), Some(vout)) = (input.txid.clone(), input.vout) else {
                continue;
            };

            if !spent.contains_key(&prev_txid) {
                let prev = self.fetch_transaction(&prev_txid).await?;
                spent.insert(prev_txid.clone(), prev);
            }
            let output = spent
                .get(&prev_txid)
                .and_then(|prev| prev.outputs.iter().find(|o| o.n == vout))
                .with_context(|| format!("Input spends missing output {}:{}", prev_txid, vout))?;

            if input.value_sat.is_none() {
                input.value_sat = Some(output.value_sat);
            }
            if input.address.is_none() {
                input.address = output
                    .script_pub_key
                    .destinations()
                    .first()
                    .map(|a| a.to_string());
            }
        }
        Ok(())
    }
}

/// Pull `result` out of a response, turning a non-null `error` into an Err.
fn extract_result(method: &str, json: Value) -> Result<Value> {
    if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
        anyhow::bail!("RPC error from {}: {}", method, error);
    }
    json.get("result")
        .cloned()
        .with_context(|| format!("RPC response to {} missing 'result' field", method))
}

#[async_trait]
impl ChainSource for RpcClient {
    async fn tip_height(&self) -> Result<u64> {
        let result = self.call("getblockcount", json!([])).await?;
        result.as_u64().context("Block count is not an integer")
    }

    async fn block_overview(&self, height: u64) -> Result<BlockOverview> {
        let hash = self.call("getblockhash", json!([height])).await?;
        let hash = hash.as_str().context("Block hash is not a string")?;
        let result = self.call("getblock", json!([hash])).await?;
        serde_json::from_value(result)
            .with_context(|| format!("Failed to deserialize block {}", height))
    }

    async fn raw_transaction(&self, tx_hash: &str) -> Result<Transaction> {
        let mut tx = self.fetch_transaction(tx_hash).await?;
        self.resolve_inputs(&mut tx)
            .await
            .with_context(|| format!("Failed to resolve inputs of {}", tx_hash))?;
        Ok(tx)
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Vec<ReceiptEntry>> {
        let result = self.call("gettransactionreceipt", json!([tx_hash])).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result)
            .with_context(|| format!("Failed to deserialize receipt of {}", tx_hash))
    }

    async fn call_contract(&self, contract: Address, data_hex: &str) -> Result<ContractCallResult> {
        let result = self
            .call("callcontract", json!([to_hex(contract), data_hex]))
            .await?;
        serde_json::from_value(result).context("Failed to deserialize contract call result")
    }

    async fn address_balance(&self, address: &str) -> Result<u64> {
        let result = self
            .call("getaddressbalance", json!([{ "addresses": [address] }]))
            .await?;
        let balance: AddressBalance =
            serde_json::from_value(result).context("Failed to deserialize address balance")?;
        Ok(u64::try_from(balance.balance).unwrap_or(0))
    }
}

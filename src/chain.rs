//! Chain data source abstraction
//!
//! Everything an indexer reads from the node goes through [`ChainSource`].
//! The production implementation is [`crate::rpc::RpcClient`]; tests script
//! a [`mock::MockChain`].

use crate::supply;
use crate::types::{BlockOverview, ContractCallResult, ReceiptEntry, Transaction};
use alloy_primitives::Address;
use anyhow::Result;
use async_trait::async_trait;

/// Read-only access to chain data, shared by all indexers.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current best height.
    async fn tip_height(&self) -> Result<u64>;

    /// Block header fields and ordered txids at `height`.
    async fn block_overview(&self, height: u64) -> Result<BlockOverview>;

    /// Transaction by hash, with inputs resolved to the outputs they spend.
    async fn raw_transaction(&self, tx_hash: &str) -> Result<Transaction>;

    /// Contract receipts of a transaction (empty for plain transfers).
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Vec<ReceiptEntry>>;

    /// Read-only contract call; `data_hex` is selector plus arguments.
    async fn call_contract(&self, contract: Address, data_hex: &str)
        -> Result<ContractCallResult>;

    /// Confirmed balance of a native address, in satoshis.
    async fn address_balance(&self, address: &str) -> Result<u64>;

    /// Block subsidy in satoshis.
    async fn block_subsidy(&self, height: u64) -> Result<u64> {
        Ok(supply::block_subsidy(height))
    }
}

#[cfg(test)]
pub mod mock {
    //! Scripted in-memory chain for tests.

    use super::*;
    use crate::types::{
        BlockFlags, ExecutionResult, LogEntry, ScriptPubKey, TxInput, TxOutput,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct State {
        tip: u64,
        blocks: HashMap<u64, BlockOverview>,
        transactions: HashMap<String, Transaction>,
        receipts: HashMap<String, Vec<ReceiptEntry>>,
        calls: HashMap<(Address, String), String>,
        balances: HashMap<String, u64>,
        failing_blocks: HashSet<u64>,
        fetched_blocks: Vec<u64>,
        call_log: Vec<(Address, String)>,
    }

    /// In-memory [`ChainSource`] whose answers are set up by the test.
    #[derive(Default)]
    pub struct MockChain {
        state: Mutex<State>,
    }

    impl MockChain {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_tip(&self, tip: u64) {
            self.state.lock().unwrap().tip = tip;
        }

        pub fn add_block(&self, block: BlockOverview) {
            let mut state = self.state.lock().unwrap();
            state.tip = state.tip.max(block.height);
            state.blocks.insert(block.height, block);
        }

        pub fn add_transaction(&self, tx: Transaction) {
            self.state
                .lock()
                .unwrap()
                .transactions
                .insert(tx.hash.clone(), tx);
        }

        pub fn set_receipts(&self, tx_hash: &str, receipts: Vec<ReceiptEntry>) {
            self.state
                .lock()
                .unwrap()
                .receipts
                .insert(tx_hash.to_string(), receipts);
        }

        /// Answer `data_hex` calls on `contract` with `output_hex`.
        pub fn set_call(&self, contract: Address, data_hex: &str, output_hex: &str) {
            self.state
                .lock()
                .unwrap()
                .calls
                .insert((contract, data_hex.to_string()), output_hex.to_string());
        }

        pub fn set_balance(&self, address: &str, sats: u64) {
            self.state
                .lock()
                .unwrap()
                .balances
                .insert(address.to_string(), sats);
        }

        /// Make `block_overview(height)` fail until cleared.
        pub fn fail_block(&self, height: u64) {
            self.state.lock().unwrap().failing_blocks.insert(height);
        }

        pub fn clear_failures(&self) {
            self.state.lock().unwrap().failing_blocks.clear();
        }

        /// Heights requested through `block_overview`, in order.
        pub fn fetched_blocks(&self) -> Vec<u64> {
            self.state.lock().unwrap().fetched_blocks.clone()
        }

        /// Contract calls issued so far, in order.
        pub fn call_log(&self) -> Vec<(Address, String)> {
            self.state.lock().unwrap().call_log.clone()
        }
    }

    #[async_trait]
    impl ChainSource for MockChain {
        async fn tip_height(&self) -> Result<u64> {
            Ok(self.state.lock().unwrap().tip)
        }

        async fn block_overview(&self, height: u64) -> Result<BlockOverview> {
            let mut state = self.state.lock().unwrap();
            state.fetched_blocks.push(height);
            if state.failing_blocks.contains(&height) {
                anyhow::bail!("Block {} unavailable", height);
            }
            match state.blocks.get(&height) {
                Some(block) => Ok(block.clone()),
                // Empty block so tests only script the heights they care about
                None => Ok(block(height, 1_600_000_000 + height * 128, BlockFlags::ProofOfStake, vec![])),
            }
        }

        async fn raw_transaction(&self, tx_hash: &str) -> Result<Transaction> {
            let state = self.state.lock().unwrap();
            state
                .transactions
                .get(tx_hash)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("No such transaction: {}", tx_hash))
        }

        async fn transaction_receipt(&self, tx_hash: &str) -> Result<Vec<ReceiptEntry>> {
            let state = self.state.lock().unwrap();
            Ok(state.receipts.get(tx_hash).cloned().unwrap_or_default())
        }

        async fn call_contract(
            &self,
            contract: Address,
            data_hex: &str,
        ) -> Result<ContractCallResult> {
            let mut state = self.state.lock().unwrap();
            state.call_log.push((contract, data_hex.to_string()));
            let output = state
                .calls
                .get(&(contract, data_hex.to_string()))
                .cloned()
                .unwrap_or_default();
            Ok(ContractCallResult {
                execution_result: ExecutionResult {
                    output,
                    excepted: None,
                },
            })
        }

        async fn address_balance(&self, address: &str) -> Result<u64> {
            let state = self.state.lock().unwrap();
            Ok(state.balances.get(address).copied().unwrap_or(0))
        }
    }

    // Builders

    pub fn block(height: u64, time: u64, flags: BlockFlags, txids: Vec<&str>) -> BlockOverview {
        BlockOverview {
            hash: format!("{:064x}", height),
            height,
            time,
            flags,
            txids: txids.into_iter().map(String::from).collect(),
            difficulty: "1.5".to_string(),
            size: 256,
        }
    }

    pub fn transaction(hash: &str, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            hash: hash.to_string(),
            time: 0,
            inputs,
            outputs,
        }
    }

    pub fn coinbase_input() -> TxInput {
        TxInput {
            coinbase: Some("00".to_string()),
            ..TxInput::default()
        }
    }

    pub fn input(address: &str, value_sat: u64) -> TxInput {
        TxInput {
            txid: Some("00".repeat(32)),
            vout: Some(0),
            coinbase: None,
            address: Some(address.to_string()),
            value_sat: Some(value_sat),
        }
    }

    pub fn output(n: u32, value_sat: u64, script_type: &str, hex: &str, addresses: Vec<&str>) -> TxOutput {
        TxOutput {
            value_sat,
            n,
            script_pub_key: ScriptPubKey {
                hex: hex.to_string(),
                script_type: script_type.to_string(),
                addresses: addresses.into_iter().map(String::from).collect(),
                address: None,
            },
        }
    }

    pub fn pay(n: u32, value_sat: u64, address: &str) -> TxOutput {
        output(n, value_sat, crate::types::SCRIPT_TYPE_PUBKEYHASH, "76a914", vec![address])
    }

    pub fn receipt(contract_address: &str, logs: Vec<LogEntry>) -> ReceiptEntry {
        ReceiptEntry {
            contract_address: contract_address.to_string(),
            logs,
            excepted: None,
        }
    }

    pub fn log(address: Option<&str>, topics: Vec<String>, data: &str) -> LogEntry {
        LogEntry {
            address: address.map(String::from),
            topics,
            data: data.to_string(),
        }
    }
}

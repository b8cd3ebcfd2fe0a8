//! Token contract watcher
//!
//! Discovers fungible-token contracts from creation outputs whose bytecode
//! carries the full token interface, records decoded Transfer events, and
//! reconciles holder balances against the contract's own `balanceOf`.
//! Balances are never derived from event values.

use crate::abi::{
    bytecode_has, decode_address, decode_string, decode_uint256, decode_uint8, encode_balance_of,
    encode_call, is_token_bytecode, is_transfer_topic, SIG_DECIMALS, SIG_NAME, SIG_SYMBOL,
    SIG_TOTAL_SUPPLY, SIG_VERSION,
};
use crate::address::{contract_address, native_address, parse_hex_address};
use crate::chain::ChainSource;
use crate::records::{ContractRecord, TokenBalanceRecord, TransferRecord};
use crate::store::{ContractRepository, TokenBalanceRepository, TransferRepository};
use crate::tracker::BlockProcessor;
use crate::types::{BlockOverview, ReceiptEntry, Transaction, TxOutput};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cursor name of the token watcher.
pub const TOKEN_WATCHER: &str = "erc20_watcher";

pub struct TokenWatcher {
    chain: Arc<dyn ChainSource>,
    contracts: Arc<dyn ContractRepository>,
    transfers: Arc<dyn TransferRepository>,
    balances: Arc<dyn TokenBalanceRepository>,
    /// Pubkey-hash version byte for native addresses
    address_version: u8,
}

impl TokenWatcher {
    pub fn new<S>(chain: Arc<dyn ChainSource>, store: Arc<S>, address_version: u8) -> Self
    where
        S: ContractRepository + TransferRepository + TokenBalanceRepository + 'static,
    {
        Self {
            chain,
            contracts: store.clone(),
            transfers: store.clone(),
            balances: store,
            address_version,
        }
    }

    async fn call_output(&self, contract: Address, data_hex: &str) -> Result<String> {
        let result = self
            .chain
            .call_contract(contract, data_hex)
            .await
            .with_context(|| format!("Contract call {} on {:x} failed", data_hex, contract))?;
        Ok(result.execution_result.output)
    }

    async fn process_transaction(&self, block: &BlockOverview, tx: &Transaction) -> Result<()> {
        // Receipts line up with contract-bearing outputs in output order
        let contract_outputs: Vec<(usize, &TxOutput)> = tx.contract_outputs().enumerate().collect();

        let create_vouts: Vec<(usize, &TxOutput)> = contract_outputs
            .iter()
            .copied()
            .filter(|(_, o)| o.script_pub_key.is_create() && is_token_bytecode(&o.script_pub_key.hex))
            .collect();
        let call_vouts: Vec<(usize, &TxOutput)> = contract_outputs
            .iter()
            .copied()
            .filter(|(_, o)| o.script_pub_key.is_call())
            .collect();

        if create_vouts.is_empty() && call_vouts.is_empty() {
            return Ok(());
        }

        let receipts = self
            .chain
            .transaction_receipt(&tx.hash)
            .await
            .with_context(|| format!("Failed to fetch receipt for {}", tx.hash))?;
        if receipts.is_empty() {
            return Ok(());
        }

        for (receipt_idx, vout) in &create_vouts {
            match receipts.get(*receipt_idx) {
                Some(receipt) => self.discover_contract(block.height, tx, vout, receipt).await?,
                None => warn!(tx = %tx.hash, vout = vout.n, "Missing receipt for create output"),
            }
        }

        if !call_vouts.is_empty() {
            for (receipt_idx, _) in &call_vouts {
                if let Some(receipt) = receipts.get(*receipt_idx) {
                    if !receipt.logs.is_empty() {
                        self.refresh_total_supply(receipt).await?;
                    }
                }
            }
            self.record_transfers(block, tx, &receipts).await?;
        }

        Ok(())
    }

    /// Upsert the contract created by `vout`, reading its metadata getters.
    async fn discover_contract(
        &self,
        height: u64,
        tx: &Transaction,
        vout: &TxOutput,
        receipt: &ReceiptEntry,
    ) -> Result<()> {
        let address = contract_address(&tx.hash, vout.n)?;
        let mut record = ContractRecord::new(
            height,
            tx.hash.clone(),
            vout.n,
            address,
            native_address(address, self.address_version),
        );

        if parse_hex_address(&receipt.contract_address) == Some(Address::ZERO) {
            record.exception = true;
            self.contracts.put_contract(&record)?;
            info!(tx = %tx.hash, vout = vout.n, "Token contract creation failed");
            return Ok(());
        }

        let code = &vout.script_pub_key.hex;

        let output = self.call_output(address, &encode_call(SIG_TOTAL_SUPPLY)).await?;
        match decode_uint256(&output) {
            Some(supply) => record.total_supply = supply,
            None => debug!(contract = %address, "Undecodable totalSupply"),
        }

        if bytecode_has(code, SIG_DECIMALS) {
            let output = self.call_output(address, &encode_call(SIG_DECIMALS)).await?;
            match decode_uint8(&output) {
                Some(decimals) => record.decimals = decimals,
                None => debug!(contract = %address, "Undecodable decimals"),
            }
        }
        if bytecode_has(code, SIG_NAME) {
            let output = self.call_output(address, &encode_call(SIG_NAME)).await?;
            record.name = decode_string(&output).unwrap_or_default();
        }
        if bytecode_has(code, SIG_VERSION) {
            let output = self.call_output(address, &encode_call(SIG_VERSION)).await?;
            record.version = decode_string(&output).unwrap_or_default();
        }
        if bytecode_has(code, SIG_SYMBOL) {
            let output = self.call_output(address, &encode_call(SIG_SYMBOL)).await?;
            record.symbol = decode_string(&output).unwrap_or_default();
        }

        self.contracts.put_contract(&record)?;
        info!(
            contract = %address,
            symbol = %record.symbol,
            decimals = record.decimals,
            "Discovered token contract"
        );
        Ok(())
    }

    /// Re-read `totalSupply()` of a tracked contract touched by a call.
    async fn refresh_total_supply(&self, receipt: &ReceiptEntry) -> Result<()> {
        let Some(address) = parse_hex_address(&receipt.contract_address) else {
            return Ok(());
        };
        let Some(mut contract) = self.contracts.get_contract_by_address(address)? else {
            return Ok(());
        };

        let output = self.call_output(address, &encode_call(SIG_TOTAL_SUPPLY)).await?;
        let Some(supply) = decode_uint256(&output) else {
            debug!(contract = %address, "Undecodable totalSupply, keeping stored value");
            return Ok(());
        };
        if supply != contract.total_supply {
            debug!(contract = %address, %supply, "Total supply changed");
            contract.total_supply = supply;
            self.contracts.put_contract(&contract)?;
        }
        Ok(())
    }

    /// Record every Transfer log of the transaction and reconcile both parties.
    async fn record_transfers(
        &self,
        block: &BlockOverview,
        tx: &Transaction,
        receipts: &[ReceiptEntry],
    ) -> Result<()> {
        let logs = receipts
            .iter()
            .flat_map(|receipt| receipt.logs.iter().map(move |log| (receipt, log)))
            .collect::<Vec<_>>();

        for (log_idx, (receipt, log)) in logs.into_iter().enumerate() {
            if log.topics.len() != 3 || !is_transfer_topic(&log.topics[0]) {
                continue;
            }

            let emitter = log
                .address
                .as_deref()
                .filter(|a| !a.is_empty())
                .unwrap_or(&receipt.contract_address);
            let Some(contract) = parse_hex_address(emitter) else {
                warn!(tx = %tx.hash, log_idx, emitter, "Transfer log without a contract address");
                continue;
            };

            let from_eth = decode_address(&log.topics[1]);
            let to_eth = decode_address(&log.topics[2]);
            let value = decode_uint256(&log.data).unwrap_or_else(|| {
                debug!(tx = %tx.hash, log_idx, "Undecodable transfer value");
                U256::ZERO
            });

            let transfer = TransferRecord {
                tx_hash: tx.hash.clone(),
                log_idx: log_idx as u32,
                block_height: block.height,
                block_time: block.time,
                tx_time: tx.time,
                contract_address: contract,
                contract_address_base: native_address(contract, self.address_version),
                from_eth,
                to_eth,
                from: from_eth.map(|a| native_address(a, self.address_version)),
                to: to_eth.map(|a| native_address(a, self.address_version)),
                value,
            };
            self.transfers.put_transfer(&transfer)?;

            if let (Some(from), Some(to)) = (from_eth, to_eth) {
                self.reconcile_balance(contract, from).await?;
                self.reconcile_balance(contract, to).await?;
            }
        }
        Ok(())
    }

    /// Mirror the contract's `balanceOf(holder)`; zero or undecodable deletes.
    async fn reconcile_balance(&self, contract: Address, holder: Address) -> Result<()> {
        let output = self.call_output(contract, &encode_balance_of(holder)).await?;
        match decode_uint256(&output) {
            Some(amount) if amount > U256::ZERO => {
                self.balances.put_token_balance(&TokenBalanceRecord {
                    contract_address: contract,
                    address_eth: holder,
                    address: native_address(holder, self.address_version),
                    amount,
                })?;
            }
            _ => self.balances.delete_token_balance(contract, holder)?,
        }
        Ok(())
    }
}

#[async_trait]
impl BlockProcessor for TokenWatcher {
    fn name(&self) -> &'static str {
        TOKEN_WATCHER
    }

    async fn process_block(&self, height: u64) -> Result<()> {
        let block = self
            .chain
            .block_overview(height)
            .await
            .with_context(|| format!("Failed to fetch block {}", height))?;

        for txid in &block.txids {
            let tx = self
                .chain
                .raw_transaction(txid)
                .await
                .with_context(|| format!("Failed to fetch transaction {}", txid))?;
            self.process_transaction(&block, &tx)
                .await
                .with_context(|| format!("Failed to process transaction {}", txid))?;
        }

        debug!(height, txs = block.txids.len(), "Token watcher processed block");
        Ok(())
    }
}

//! Block fee and output volume calculation
//!
//! Works on fully resolved transactions (inputs carry the value of the
//! output they spend) in block order.

use crate::types::{BlockOverview, Transaction};

/// Fee figure of a block, in satoshis.
///
/// Proof of work: coinbase output 0 minus the subsidy, floored at zero.
/// Proof of stake: coinstake (tx 1) output 1, plus output 2 when it is not a
/// pay-to-pubkey-hash output, minus the value spent by coinstake input 0.
/// Stake blocks whose spent value is unknown report zero.
pub fn block_fee(block: &BlockOverview, txs: &[Transaction], subsidy: u64) -> i128 {
    if block.flags.is_proof_of_stake() {
        return stake_fee(txs);
    }

    let Some(output0) = txs.first().and_then(|tx| tx.outputs.first()) else {
        return 0;
    };
    let fee = i128::from(output0.value_sat) - i128::from(subsidy);
    fee.max(0)
}

fn stake_fee(txs: &[Transaction]) -> i128 {
    let Some(coinstake) = txs.get(1) else {
        return 0;
    };
    let Some(output1) = coinstake.outputs.get(1) else {
        return 0;
    };

    let mut produced = i128::from(output1.value_sat);
    if let Some(output2) = coinstake.outputs.get(2) {
        if !output2.script_pub_key.is_pubkeyhash() {
            produced += i128::from(output2.value_sat);
        }
    }

    match coinstake.inputs.first().and_then(|input| input.value_sat) {
        Some(spent) => produced - i128::from(spent),
        None => 0,
    }
}

/// Sum of all outputs except the coinbase (and the coinstake on PoS blocks).
pub fn output_volume(block: &BlockOverview, txs: &[Transaction]) -> u128 {
    let skip = if block.flags.is_proof_of_stake() { 2 } else { 1 };
    txs.iter()
        .skip(skip)
        .flat_map(|tx| tx.outputs.iter())
        .map(|output| u128::from(output.value_sat))
        .sum()
}

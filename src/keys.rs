//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! Integers are big-endian so RocksDB's lexicographic order is numeric order.

use alloy_primitives::{Address, U256};

/// Encode a cursor key.
///
/// Format: byte 'K' + indexer name (UTF-8)
pub fn encode_cursor_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(b'K');
    key.extend_from_slice(name.as_bytes());
    key
}

/// Encode a contract key.
///
/// Format: byte 'C' + tx hash (hex text) + vout (4 bytes, big-endian)
pub fn encode_contract_key(tx_hash: &str, vout: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + tx_hash.len() + 4);
    key.push(b'C');
    key.extend_from_slice(tx_hash.as_bytes());
    key.extend_from_slice(&vout.to_be_bytes());
    key
}

/// Encode a contract-by-address index key.
///
/// Format: byte 'c' + contract address (20 bytes)
/// Total length: 21 bytes
pub fn encode_contract_index_key(contract: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(b'c');
    key.extend_from_slice(contract.as_slice());
    key
}

/// Encode the prefix shared by all transfers of one contract.
///
/// Format: byte 'T' + contract address (20 bytes)
pub fn encode_transfer_prefix(contract: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(b'T');
    key.extend_from_slice(contract.as_slice());
    key
}

/// Encode a transfer key.
///
/// Format: transfer prefix + block height (8 bytes, BE) + tx hash (hex text)
/// + log index (4 bytes, BE)
pub fn encode_transfer_key(contract: Address, height: u64, tx_hash: &str, log_idx: u32) -> Vec<u8> {
    let mut key = encode_transfer_prefix(contract);
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(tx_hash.as_bytes());
    key.extend_from_slice(&log_idx.to_be_bytes());
    key
}

/// Encode the prefix shared by all holder balances of one contract.
///
/// Format: byte 'B' + contract address (20 bytes)
pub fn encode_token_balance_prefix(contract: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(41);
    key.push(b'B');
    key.extend_from_slice(contract.as_slice());
    key
}

/// Encode a holder balance key.
///
/// Format: byte 'B' + contract address (20 bytes) + holder address (20 bytes)
/// Total length: 41 bytes
pub fn encode_token_balance_key(contract: Address, holder: Address) -> Vec<u8> {
    let mut key = encode_token_balance_prefix(contract);
    key.extend_from_slice(holder.as_slice());
    key
}

/// Encode the prefix of the per-contract balance ranking.
///
/// Format: byte 'R' + contract address (20 bytes)
pub fn encode_token_rank_prefix(contract: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(73);
    key.push(b'R');
    key.extend_from_slice(contract.as_slice());
    key
}

/// Encode a balance ranking key.
///
/// Format: rank prefix + amount (32 bytes, BE) + holder address (20 bytes)
/// Total length: 73 bytes
pub fn encode_token_rank_key(contract: Address, amount: U256, holder: Address) -> Vec<u8> {
    let mut key = encode_token_rank_prefix(contract);
    key.extend_from_slice(&amount.to_be_bytes::<32>());
    key.extend_from_slice(holder.as_slice());
    key
}

/// Encode a daily statistic key.
///
/// Format: byte 'D' + date text (`YYYY-MM-DD`)
pub fn encode_daily_key(date: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + date.len());
    key.push(b'D');
    key.extend_from_slice(date.as_bytes());
    key
}

/// Encode a total statistic key.
///
/// Format: byte 'S' + counter name
pub fn encode_total_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(b'S');
    key.extend_from_slice(name.as_bytes());
    key
}

/// Encode an address balance key.
///
/// Format: byte 'A' + native address (text)
pub fn encode_address_balance_key(address: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + address.len());
    key.push(b'A');
    key.extend_from_slice(address.as_bytes());
    key
}

/// Encode an address balance ranking key.
///
/// Format: byte 'r' + balance (8 bytes, BE satoshis) + native address (text)
pub fn encode_address_rank_key(balance_sat: u64, address: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(9 + address.len());
    key.push(b'r');
    key.extend_from_slice(&balance_sat.to_be_bytes());
    key.extend_from_slice(address.as_bytes());
    key
}

/// Decode (balance, address) from an address balance ranking key.
pub fn decode_address_rank_key(key: &[u8]) -> Option<(u64, String)> {
    if key.len() < 9 || key[0] != b'r' {
        return None;
    }
    let balance = u64::from_be_bytes(key[1..9].try_into().ok()?);
    let address = String::from_utf8(key[9..].to_vec()).ok()?;
    Some((balance, address))
}

/// Encode a mined blocks key.
///
/// Format: byte 'M' + native address (text)
pub fn encode_mined_key(address: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + address.len());
    key.push(b'M');
    key.extend_from_slice(address.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_transfer_keys_sort_by_height() {
        let contract = address!("64d7140c2a6c36a8a0b102ccd14a92f937db070f");
        let low = encode_transfer_key(contract, 9, "ff", 0);
        let high = encode_transfer_key(contract, 256, "00", 0);
        assert!(low < high);
        assert!(low.starts_with(&encode_transfer_prefix(contract)));
    }

    #[test]
    fn test_token_rank_key_encoding() {
        let contract = address!("64d7140c2a6c36a8a0b102ccd14a92f937db070f");
        let holder = address!("e3ea0b4b2c2a1ac2a8e2c5b9f21d0cbb7bc6d4a1");
        let small = encode_token_rank_key(contract, U256::from(5u64), holder);
        let big = encode_token_rank_key(contract, U256::from(1u64) << 200usize, Address::ZERO);
        assert_eq!(small.len(), 73);
        assert!(small < big);
        assert_eq!(&small[53..], holder.as_slice());
    }

    #[test]
    fn test_address_rank_key_roundtrip() {
        let key = encode_address_rank_key(123_456, "QhP5sWoWu9PnYN2Kg9PkrMz4uQtMt5KUwZ");
        assert_eq!(key[0], b'r');
        assert_eq!(
            decode_address_rank_key(&key),
            Some((123_456, "QhP5sWoWu9PnYN2Kg9PkrMz4uQtMt5KUwZ".to_string()))
        );
        assert!(encode_address_rank_key(99, "z") < encode_address_rank_key(100, "a"));
    }

    #[test]
    fn test_contract_key_encoding() {
        let key = encode_contract_key("abcd", 2);
        assert_eq!(key[0], b'C');
        assert_eq!(&key[1..5], b"abcd");
        assert_eq!(&key[5..], &2u32.to_be_bytes());
    }
}

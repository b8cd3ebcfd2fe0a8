//! Contract and native address derivation
//!
//! A contract created by output `n` of transaction `h` lives at
//! `RIPEMD160(SHA256(reverse(h) || u32_le(n)))`. The native form of any
//! 20-byte address is base58check over `version || addr`.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Derive the contract address created by output `vout` of `tx_hash`.
///
/// `tx_hash` is the display (big-endian) hex form reported by the node.
pub fn contract_address(tx_hash: &str, vout: u32) -> Result<Address> {
    let hash = tx_hash.strip_prefix("0x").unwrap_or(tx_hash);
    let mut bytes =
        hex::decode(hash).with_context(|| format!("Invalid transaction hash: {}", tx_hash))?;
    if bytes.len() != 32 {
        anyhow::bail!(
            "Transaction hash must be 32 bytes (64 hex chars), got {} bytes",
            bytes.len()
        );
    }
    bytes.reverse();
    bytes.extend_from_slice(&vout.to_le_bytes());

    let sha = Sha256::digest(&bytes);
    let ripe = Ripemd160::digest(sha);
    Ok(Address::from_slice(&ripe))
}

/// Base58check native address for a 20-byte VM address.
pub fn native_address(addr: Address, version: u8) -> String {
    let mut payload = Vec::with_capacity(25);
    payload.push(version);
    payload.extend_from_slice(addr.as_slice());

    let checksum = Sha256::digest(Sha256::digest(&payload));
    payload.extend_from_slice(&checksum[..4]);
    bs58::encode(payload).into_string()
}

/// Decode a native address back to its version byte and VM address.
///
/// Returns `None` if the text is not valid base58check of 25 bytes.
pub fn decode_native_address(native: &str) -> Option<(u8, Address)> {
    let bytes = bs58::decode(native).into_vec().ok()?;
    if bytes.len() != 25 {
        return None;
    }
    let (body, checksum) = bytes.split_at(21);
    let expected = Sha256::digest(Sha256::digest(body));
    if &expected[..4] != checksum {
        return None;
    }
    Some((body[0], Address::from_slice(&body[1..])))
}

/// Parse a 40-char hex VM address, with or without `0x`.
pub fn parse_hex_address(s: &str) -> Option<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 40 {
        return None;
    }
    let bytes = hex::decode(s).ok()?;
    Some(Address::from_slice(&bytes))
}

/// Lowercase hex without prefix, the form contract addresses are stored in.
pub fn to_hex(addr: Address) -> String {
    hex::encode(addr.as_slice())
}

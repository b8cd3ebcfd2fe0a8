//! Minimal contract ABI codec
//!
//! Encodes call data and decodes return values / log words for the handful of
//! types the token watcher needs: `address`, `uint256`, `uint8` and `string`.
//! Decoders are best-effort and return `None` on malformed input.

use alloy_primitives::{keccak256, Address, B256, U256};

/// Size of one ABI word in bytes.
pub const WORD: usize = 32;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: [u8; 32] = [
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d,
    0xaa, 0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23,
    0xb3, 0xef,
];

pub const SIG_ALLOWANCE: &str = "allowance(address,address)";
pub const SIG_APPROVE: &str = "approve(address,uint256)";
pub const SIG_BALANCE_OF: &str = "balanceOf(address)";
pub const SIG_TOTAL_SUPPLY: &str = "totalSupply()";
pub const SIG_TRANSFER: &str = "transfer(address,uint256)";
pub const SIG_TRANSFER_FROM: &str = "transferFrom(address,address,uint256)";
pub const SIG_TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";
pub const SIG_DECIMALS: &str = "decimals()";
pub const SIG_NAME: &str = "name()";
pub const SIG_SYMBOL: &str = "symbol()";
pub const SIG_VERSION: &str = "version()";

/// Signatures whose 4-byte ids must all occur in a token contract's bytecode.
pub const TOKEN_SIGNATURES: [&str; 7] = [
    SIG_ALLOWANCE,
    SIG_APPROVE,
    SIG_BALANCE_OF,
    SIG_TOTAL_SUPPLY,
    SIG_TRANSFER,
    SIG_TRANSFER_FROM,
    SIG_TRANSFER_EVENT,
];

/// 4-byte function selector of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Selector as lowercase hex (8 chars).
pub fn selector_hex(signature: &str) -> String {
    hex::encode(selector(signature))
}

/// 32-byte event topic of a canonical event signature.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Whether bytecode (hex) contains the selector of every token signature.
///
/// Matches by substring over the hex text, the same way the bytecode is
/// scanned for optional getters.
pub fn is_token_bytecode(bytecode_hex: &str) -> bool {
    let code = bytecode_hex.to_ascii_lowercase();
    TOKEN_SIGNATURES
        .iter()
        .all(|sig| code.contains(&selector_hex(sig)))
}

/// Whether bytecode (hex) mentions the selector of `signature`.
pub fn bytecode_has(bytecode_hex: &str, signature: &str) -> bool {
    bytecode_hex
        .to_ascii_lowercase()
        .contains(&selector_hex(signature))
}

/// Encode an address as one left-padded word.
pub fn encode_address(addr: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(addr.as_slice());
    word
}

/// Call data (hex, no prefix) for a zero-argument method.
pub fn encode_call(signature: &str) -> String {
    selector_hex(signature)
}

/// Call data (hex, no prefix) for `balanceOf(owner)`.
pub fn encode_balance_of(owner: Address) -> String {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&selector(SIG_BALANCE_OF));
    data.extend_from_slice(&encode_address(owner));
    hex::encode(data)
}

/// Decode hex text, tolerating a `0x` prefix and odd length.
fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 == 1 {
        hex::decode(format!("0{}", s)).ok()
    } else {
        hex::decode(s).ok()
    }
}

fn word_at(bytes: &[u8], index: usize) -> Option<&[u8]> {
    let start = index.checked_mul(WORD)?;
    bytes.get(start..start.checked_add(WORD)?)
}

fn word_as_usize(word: &[u8]) -> Option<usize> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(buf)).ok()
}

/// Decode an `address` from the first word (last 20 bytes).
pub fn decode_address(hex_data: &str) -> Option<Address> {
    let bytes = decode_hex(hex_data)?;
    let word = word_at(&bytes, 0)?;
    Some(Address::from_slice(&word[12..]))
}

/// Decode a `uint256` from the first word.
pub fn decode_uint256(hex_data: &str) -> Option<U256> {
    let bytes = decode_hex(hex_data)?;
    let word = word_at(&bytes, 0)?;
    Some(U256::from_be_slice(word))
}

/// Decode a `uint8` from the first word; rejects values that overflow.
pub fn decode_uint8(hex_data: &str) -> Option<u8> {
    let bytes = decode_hex(hex_data)?;
    let word = word_at(&bytes, 0)?;
    if word[..WORD - 1].iter().any(|b| *b != 0) {
        return None;
    }
    Some(word[WORD - 1])
}

/// Decode a dynamic `string` return value (offset, length, bytes).
pub fn decode_string(hex_data: &str) -> Option<String> {
    let bytes = decode_hex(hex_data)?;
    let offset = word_as_usize(word_at(&bytes, 0)?)?;
    let len_word = bytes.get(offset..offset.checked_add(WORD)?)?;
    let len = word_as_usize(len_word)?;
    let start = offset + WORD;
    let raw = bytes.get(start..start.checked_add(len)?)?;
    String::from_utf8(raw.to_vec()).ok()
}

/// Whether a log topic (hex) equals the Transfer event topic.
pub fn is_transfer_topic(topic_hex: &str) -> bool {
    match decode_hex(topic_hex) {
        Some(bytes) => bytes.as_slice() == TRANSFER_TOPIC,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_known_selectors() {
        assert_eq!(selector_hex(SIG_ALLOWANCE), "dd62ed3e");
        assert_eq!(selector_hex(SIG_APPROVE), "095ea7b3");
        assert_eq!(selector_hex(SIG_BALANCE_OF), "70a08231");
        assert_eq!(selector_hex(SIG_TOTAL_SUPPLY), "18160ddd");
        assert_eq!(selector_hex(SIG_TRANSFER), "a9059cbb");
        assert_eq!(selector_hex(SIG_TRANSFER_FROM), "23b872dd");
        assert_eq!(selector_hex(SIG_DECIMALS), "313ce567");
        assert_eq!(selector_hex(SIG_NAME), "06fdde03");
        assert_eq!(selector_hex(SIG_SYMBOL), "95d89b41");
        assert_eq!(selector_hex(SIG_VERSION), "54fd4d50");
    }

    #[test]
    fn test_transfer_topic() {
        assert_eq!(event_topic(SIG_TRANSFER_EVENT).as_slice(), &TRANSFER_TOPIC);
        assert!(is_transfer_topic(
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        ));
        assert!(is_transfer_topic(
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        ));
        assert!(!is_transfer_topic("ddf252ad"));
        assert!(!is_transfer_topic("zz"));
    }

    #[test]
    fn test_token_bytecode_detection() {
        let all: String = TOKEN_SIGNATURES
            .iter()
            .map(|s| format!("60{}56", selector_hex(s)))
            .collect();
        assert!(is_token_bytecode(&all));
        assert!(is_token_bytecode(&all.to_uppercase()));

        let missing_approve = all.replace(&selector_hex(SIG_APPROVE), "00000000");
        assert!(!is_token_bytecode(&missing_approve));

        assert!(!bytecode_has(&all, SIG_DECIMALS));
        assert!(bytecode_has(&format!("{}313ce567", all), SIG_DECIMALS));
    }

    #[test]
    fn test_balance_of_call_data() {
        let owner = address!("e3ea0b4b2c2a1ac2a8e2c5b9f21d0cbb7bc6d4a1");
        assert_eq!(
            encode_balance_of(owner),
            "70a08231000000000000000000000000e3ea0b4b2c2a1ac2a8e2c5b9f21d0cbb7bc6d4a1"
        );
    }

    #[test]
    fn test_decode_address_from_topic() {
        let topic = "0x000000000000000000000000e3ea0b4b2c2a1ac2a8e2c5b9f21d0cbb7bc6d4a1";
        assert_eq!(
            decode_address(topic),
            Some(address!("e3ea0b4b2c2a1ac2a8e2c5b9f21d0cbb7bc6d4a1"))
        );
        assert_eq!(decode_address("1234"), None);
    }

    #[test]
    fn test_decode_uint256() {
        let data = "00000000000000000000000000000000000000000000000000000000000f4240";
        assert_eq!(decode_uint256(data), Some(U256::from(1_000_000u64)));
        let max = "ff".repeat(32);
        assert_eq!(decode_uint256(&max), Some(U256::MAX));
        assert_eq!(decode_uint256(""), None);
    }

    #[test]
    fn test_decode_uint8() {
        let eight = format!("{}08", "00".repeat(31));
        assert_eq!(decode_uint8(&eight), Some(8));
        let overflow = format!("{}0100", "00".repeat(30));
        assert_eq!(decode_uint8(&overflow), None);
    }

    #[test]
    fn test_decode_string() {
        // offset 0x20, length 3, "QTC"
        let data = format!(
            "{}{}{}",
            "0000000000000000000000000000000000000000000000000000000000000020",
            "0000000000000000000000000000000000000000000000000000000000000003",
            "5154430000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(decode_string(&data), Some("QTC".to_string()));

        // Length runs past the payload
        let truncated = format!(
            "{}{}",
            "0000000000000000000000000000000000000000000000000000000000000020",
            "00000000000000000000000000000000000000000000000000000000000000ff"
        );
        assert_eq!(decode_string(&truncated), None);
        assert_eq!(decode_string("00"), None);
    }
}

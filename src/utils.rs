use crate::error::{Error, Result};

/// Canonical form of an address: lowercase, `0x`-prefixed. All proof table
/// keys and response strings use this form regardless of input casing.
pub fn canonical_address(address: &str) -> String {
    let hex_part = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")).unwrap_or(address);
    format!("0x{}", hex_part.to_ascii_lowercase())
}

/// Decode an address string into its raw 20 bytes. Casing and the optional
/// `0x` prefix do not affect the result.
pub fn decode_address(address: &str) -> Result<[u8; 20]> {
    let hex_part = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")).unwrap_or(address);
    let bytes = hex::decode(hex_part)?;
    let raw: [u8; 20] = bytes
        .try_into()
        .map_err(|_| Error::Hex(format!("address is not 20 bytes: {address}")))?;
    Ok(raw)
}

/// Hex-encode a digest with a `0x` prefix, the form the whitelist contract
/// and the JSON output use.
pub fn encode_digest(digest: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(digest))
}

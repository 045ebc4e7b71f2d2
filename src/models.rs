use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct GenerateRequest {
    /// Addresses in the exact order the whitelist was supplied; the order
    /// determines the tree shape and must not be changed between runs.
    pub addresses: Vec<String>,
    pub max_workers: Option<usize>,
    pub desired_chunk_size: Option<usize>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    /// `0x`-prefixed root digest, ready to publish on-chain.
    pub root: String,
    /// Canonical lowercase address -> `0x`-prefixed sibling hashes.
    pub proofs: BTreeMap<String, Vec<String>>,
    pub address_count: usize,
    pub generation_duration_ms: u128,
}

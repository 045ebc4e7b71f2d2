//! Binary Merkle tree over whitelist addresses.
//!
//! Leaf formula: `keccak256(address_bytes)` where `address_bytes` is the
//! hex-decoded 20-byte address.
//! Internal nodes: `keccak256(min(a, b) || max(a, b))` — siblings are sorted
//! bytewise before hashing so proof verification never needs to know
//! left/right position. This MUST match the on-chain verifier
//! (OpenZeppelin `MerkleProof.verify` with sorted pairs).
//!
//! If a level has an odd number of nodes, the last node is promoted to the
//! next level unchanged. No zero-padding, no self-pairing; the promotion
//! rule changes the root value and breaks proof compatibility if altered.

use tiny_keccak::{Hasher as _, Keccak};

use crate::error::{Error, Result};
use crate::utils::{decode_address, encode_digest};

/// Keccak-256 of an arbitrary byte slice.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut output = [0u8; 32];
    keccak.finalize(&mut output);
    output
}

/// Compute the leaf hash for one address.
///
/// Hashes the decoded 20 raw bytes, not the string, so `0xAB..` and
/// `0xab..` map to the same leaf and the digest matches what
/// `keccak256(abi.encodePacked(addr))` produces on-chain.
pub fn leaf_hash(address: &str) -> Result<[u8; 32]> {
    let raw = decode_address(address)?;
    Ok(keccak256(&raw))
}

/// Hash two sibling nodes into their parent, sorting first.
pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 64];
    if a <= b {
        data[..32].copy_from_slice(a);
        data[32..].copy_from_slice(b);
    } else {
        data[..32].copy_from_slice(b);
        data[32..].copy_from_slice(a);
    }
    keccak256(&data)
}

/// A binary Merkle tree, immutable once built.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes stored level by level, bottom-up. `layers[0]` = leaves,
    /// the last layer holds exactly the root.
    layers: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree from pre-hashed leaves in sequence order.
    ///
    /// Pairing is position-based: building from a reordered copy of the
    /// same leaf set yields a different tree, so the sequence used here
    /// must be the same one proofs are extracted against.
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut layers = vec![leaves];
        while layers[layers.len() - 1].len() > 1 {
            let prev = &layers[layers.len() - 1];
            let mut next = Vec::with_capacity(prev.len().div_ceil(2));
            for pair in prev.chunks(2) {
                match *pair {
                    [left, right] => next.push(hash_pair(&left, &right)),
                    // Odd node out: promoted unchanged.
                    [last] => next.push(last),
                    _ => unreachable!("chunks(2) yields one- or two-element slices"),
                }
            }
            layers.push(next);
        }

        Ok(Self { layers })
    }

    /// Build a tree from address strings (hashing each into a leaf first).
    pub fn from_addresses(addresses: &[String]) -> Result<Self> {
        let leaves = addresses
            .iter()
            .map(|addr| leaf_hash(addr))
            .collect::<Result<Vec<_>>>()?;
        Self::from_leaves(leaves)
    }

    /// The Merkle root.
    pub fn root(&self) -> [u8; 32] {
        self.layers[self.layers.len() - 1][0]
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// Derive the sibling path for `leaf`, bottom-up, excluding the root.
    ///
    /// A node promoted past an odd level has no sibling there and
    /// contributes nothing to the proof at that level.
    pub fn proof(&self, leaf: &[u8; 32]) -> Result<Vec<[u8; 32]>> {
        let mut idx = self.layers[0]
            .iter()
            .position(|node| node == leaf)
            .ok_or_else(|| Error::LeafNotFound(encode_digest(leaf)))?;

        let mut siblings = Vec::with_capacity(self.layers.len().saturating_sub(1));
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling_idx = idx ^ 1;
            if sibling_idx < layer.len() {
                siblings.push(layer[sibling_idx]);
            }
            idx /= 2;
        }
        Ok(siblings)
    }
}

/// Recompute the root from a leaf and its sibling path; mirrors the
/// on-chain verification exactly.
pub fn verify(root: &[u8; 32], leaf: &[u8; 32], proof: &[[u8; 32]]) -> bool {
    let mut current = *leaf;
    for sibling in proof {
        current = hash_pair(&current, sibling);
    }
    current == *root
}

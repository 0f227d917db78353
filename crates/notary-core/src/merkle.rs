//! Binary Merkle tree over ordered leaf digests.
//!
//! Internal nodes are `H(left || right)`. A level with an odd node count
//! pairs its last node with itself; verifiers depend on this exact rule to
//! reproduce published roots bit for bit. The empty tree's root is
//! `H("empty")`, and a single-leaf tree's root is the leaf itself.

use tracing::debug;

use notary_contracts::{
    batch::{MerkleProof, ProofStep, Side},
    error::{NotaryError, NotaryResult},
    Digest,
};

use crate::crypto::{hash_pair, sha256};

/// Input hashed to obtain the root of an empty tree.
pub const EMPTY_TREE_MARKER: &[u8] = b"empty";

pub fn empty_root() -> Digest {
    sha256(EMPTY_TREE_MARKER)
}

fn next_level(level: &[Digest]) -> Vec<Digest> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_pair(left, right)
        })
        .collect()
}

/// Compute the root over `leaves` in order.
pub fn build_root(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return empty_root();
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Build the inclusion proof for `leaves[index]`, siblings bottom to top.
///
/// Returns `InvalidProof` when `index` is out of range.
pub fn build_proof(index: usize, leaves: &[Digest]) -> NotaryResult<MerkleProof> {
    if index >= leaves.len() {
        return Err(NotaryError::InvalidProof {
            reason: format!("leaf index {index} out of range for {} leaves", leaves.len()),
        });
    }

    let mut steps = Vec::new();
    let mut level = leaves.to_vec();
    let mut idx = index;

    while level.len() > 1 {
        let step = if idx % 2 == 0 {
            // Last node of an odd level is its own sibling.
            let sibling = level.get(idx + 1).copied().unwrap_or(level[idx]);
            ProofStep { sibling, side: Side::Right }
        } else {
            ProofStep { sibling: level[idx - 1], side: Side::Left }
        };
        steps.push(step);
        level = next_level(&level);
        idx /= 2;
    }

    debug!(leaf_index = index, depth = steps.len(), "built merkle proof");
    Ok(MerkleProof { leaf_index: index, steps })
}

/// Fold `leaf` through `proof` and compare with `root`.
///
/// Each step's side must agree with the corresponding bit of
/// `proof.leaf_index`, which binds the proof to a single position.
pub fn verify_proof(leaf: &Digest, proof: &MerkleProof, root: &Digest) -> bool {
    let depth = proof.steps.len();
    if depth < usize::BITS as usize && proof.leaf_index >> depth != 0 {
        return false;
    }

    let mut current = *leaf;
    let mut idx = proof.leaf_index;
    for step in &proof.steps {
        let expected_side = if idx % 2 == 0 { Side::Right } else { Side::Left };
        if step.side != expected_side {
            return false;
        }
        current = match step.side {
            Side::Left => hash_pair(&step.sibling, &current),
            Side::Right => hash_pair(&current, &step.sibling),
        };
        idx /= 2;
    }
    &current == root
}

// ── Tests ─────────────────────────────────────────────────────────────────────

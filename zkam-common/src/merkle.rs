// zkam/zkam-common/src/merkle.rs

//! Merkle inclusion replay over the accounts tree.

use anyhow::{ensure, Result};
use halo2curves_axiom::{bn256::Fr, ff::Field};

use crate::{
    error::ProofError,
    hash::hash2,
    schema::names::{PATH_ELEMENTS, PATH_INDICES},
};

/// Largest tree depth a path may describe.
pub const MAX_TREE_DEPTH: usize = 32;

/// Position of the running node at one level of the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathSide {
    /// Index bit 0: the running node is the left child, sibling on the right.
    Left,
    /// Index bit 1: the running node is the right child, sibling on the left.
    Right,
}

impl PathSide {
    pub fn from_bit(bit: &Fr) -> Option<Self> {
        if *bit == Fr::ZERO {
            Some(Self::Left)
        } else if *bit == Fr::ONE {
            Some(Self::Right)
        } else {
            None
        }
    }

    pub fn as_bit(self) -> Fr {
        match self {
            Self::Left => Fr::ZERO,
            Self::Right => Fr::ONE,
        }
    }
}

/// Sibling path from a leaf to the root, leaf level first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    siblings: Vec<Fr>,
    sides: Vec<PathSide>,
}

impl MerklePath {
    /// Pair up sibling elements with index bits. Unequal lengths and any index
    /// other than 0 or 1 are shape errors; nothing is truncated.
    pub fn new(elements: Vec<Fr>, indices: &[Fr]) -> Result<Self, ProofError> {
        check_depth(elements.len())?;
        if indices.len() != elements.len() {
            return Err(ProofError::length_mismatch(
                PATH_INDICES,
                elements.len(),
                indices.len(),
            ));
        }
        let sides = indices
            .iter()
            .enumerate()
            .map(|(i, bit)| {
                PathSide::from_bit(bit)
                    .ok_or_else(|| ProofError::not_a_bit(format!("{PATH_INDICES}[{i}]")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            siblings: elements,
            sides,
        })
    }

    pub fn from_sides(siblings: Vec<Fr>, sides: Vec<PathSide>) -> Result<Self, ProofError> {
        check_depth(siblings.len())?;
        if sides.len() != siblings.len() {
            return Err(ProofError::length_mismatch(
                PATH_INDICES,
                siblings.len(),
                sides.len(),
            ));
        }
        Ok(Self { siblings, sides })
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    pub fn siblings(&self) -> &[Fr] {
        &self.siblings
    }

    pub fn sides(&self) -> &[PathSide] {
        &self.sides
    }

    pub fn index_bits(&self) -> Vec<Fr> {
        self.sides.iter().map(|side| side.as_bit()).collect()
    }

    /// Leaf position encoded by the index bits, least significant bit first.
    pub fn leaf_index(&self) -> u64 {
        self.sides
            .iter()
            .enumerate()
            .filter(|(_, side)| **side == PathSide::Right)
            .fold(0u64, |acc, (level, _)| acc | (1u64 << level))
    }
}

fn check_depth(depth: usize) -> Result<(), ProofError> {
    if depth > MAX_TREE_DEPTH {
        return Err(ProofError::length_mismatch(PATH_ELEMENTS, MAX_TREE_DEPTH, depth));
    }
    Ok(())
}

pub fn compute_root(leaf: &Fr, path: &MerklePath) -> Fr {
    fold_root(leaf, path.siblings.iter().copied(), path.sides.iter().copied())
}

pub(crate) fn fold_root(
    leaf: &Fr,
    siblings: impl IntoIterator<Item = Fr>,
    sides: impl IntoIterator<Item = PathSide>,
) -> Fr {
    siblings
        .into_iter()
        .zip(sides)
        .fold(*leaf, |current, (sibling, side)| match side {
            PathSide::Left => hash2(&current, &sibling),
            PathSide::Right => hash2(&sibling, &current),
        })
}

pub fn verify_membership(leaf: &Fr, path: &MerklePath, expected_root: &Fr) -> bool {
    compute_root(leaf, path) == *expected_root
}

/// Fixed-depth tree over a leaf list, padded on the right with zero leaves.
///
/// Only populated nodes are materialised; empty subtrees collapse to their
/// precomputed zero hash, so deep trees with few leaves stay cheap.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    depth: usize,
    levels: Vec<Vec<Fr>>,
    zeros: Vec<Fr>,
}

impl MerkleTree {
    pub fn from_leaves(depth: usize, leaves: &[Fr]) -> Result<Self> {
        ensure!(
            (1..=MAX_TREE_DEPTH).contains(&depth),
            "tree depth {depth} outside 1..={MAX_TREE_DEPTH}"
        );
        let capacity = 1u64 << depth;
        ensure!(
            (leaves.len() as u64) <= capacity,
            "{} leaves do not fit a depth-{depth} tree",
            leaves.len()
        );

        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(Fr::ZERO);
        for level in 0..depth {
            let below = zeros[level];
            zeros.push(hash2(&below, &below));
        }

        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(leaves.to_vec());
        for level in 0..depth {
            let current = &levels[level];
            let next = current
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(zeros[level]);
                    hash2(&pair[0], &right)
                })
                .collect::<Vec<_>>();
            levels.push(next);
        }

        Ok(Self {
            depth,
            levels,
            zeros,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root(&self) -> Fr {
        self.levels[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn leaf(&self, index: usize) -> Option<Fr> {
        self.levels[0].get(index).copied()
    }

    /// Inclusion path for the leaf at `index`; `None` past the populated range.
    pub fn path(&self, index: usize) -> Option<MerklePath> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut sides = Vec::with_capacity(self.depth);
        let mut position = index;
        for level in 0..self.depth {
            let sibling = self.levels[level]
                .get(position ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            siblings.push(sibling);
            sides.push(if position & 1 == 0 {
                PathSide::Left
            } else {
                PathSide::Right
            });
            position >>= 1;
        }
        Some(MerklePath { siblings, sides })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn leaves(n: u64) -> Vec<Fr> {
        (0..n).map(|i| Fr::from(1000 + i)).collect()
    }

    #[test]
    fn depth_two_path_for_third_leaf() {
        let c = leaves(4);
        let tree = MerkleTree::from_leaves(2, &c).unwrap();
        let root = hash2(&hash2(&c[0], &c[1]), &hash2(&c[2], &c[3]));
        assert_eq!(tree.root(), root);

        let elements = vec![c[3], hash2(&c[0], &c[1])];
        let path = MerklePath::new(elements.clone(), &[Fr::ZERO, Fr::ONE]).unwrap();
        assert!(verify_membership(&c[2], &path, &root));
        assert_eq!(tree.path(2).unwrap(), path);
        assert_eq!(path.leaf_index(), 2);

        let flipped = MerklePath::new(elements, &[Fr::ONE, Fr::ONE]).unwrap();
        assert!(!verify_membership(&c[2], &flipped, &root));
    }

    #[test]
    fn unequal_lengths_are_shape_errors() {
        let err = MerklePath::new(vec![Fr::ONE; 3], &[Fr::ZERO; 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert!(err.to_string().contains(PATH_INDICES));
    }

    #[test]
    fn non_bit_index_names_the_position() {
        let err = MerklePath::new(vec![Fr::ONE; 3], &[Fr::ZERO, Fr::from(2u64), Fr::ONE])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert!(err.to_string().contains("accountMerklePathIndices[1]"));
    }

    #[test]
    fn paths_deeper_than_the_limit_are_shape_errors() {
        let too_deep = MAX_TREE_DEPTH + 40;
        let err = MerklePath::new(vec![Fr::ONE; too_deep], &vec![Fr::ZERO; too_deep]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        let err = MerklePath::from_sides(vec![Fr::ONE; too_deep], vec![PathSide::Right; too_deep])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        let deepest =
            MerklePath::from_sides(vec![Fr::ONE; MAX_TREE_DEPTH], vec![PathSide::Right; MAX_TREE_DEPTH])
                .unwrap();
        assert_eq!(deepest.leaf_index(), (1u64 << MAX_TREE_DEPTH) - 1);
    }

    #[test]
    fn sparse_tree_pads_with_zero_subtrees() {
        let c = leaves(3);
        let tree = MerkleTree::from_leaves(3, &c).unwrap();
        let dense = {
            let mut padded = c.clone();
            padded.resize(8, Fr::ZERO);
            let l1: Vec<Fr> = padded.chunks(2).map(|p| hash2(&p[0], &p[1])).collect();
            let l2: Vec<Fr> = l1.chunks(2).map(|p| hash2(&p[0], &p[1])).collect();
            hash2(&l2[0], &l2[1])
        };
        assert_eq!(tree.root(), dense);
        assert!(tree.path(3).is_none());
    }

    #[test]
    fn rejects_overfull_tree() {
        assert!(MerkleTree::from_leaves(2, &leaves(5)).is_err());
        assert!(MerkleTree::from_leaves(0, &leaves(1)).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn every_leaf_round_trips(count in 1u64..=16, depth in 4usize..=6) {
            let c = leaves(count);
            let tree = MerkleTree::from_leaves(depth, &c).unwrap();
            for (i, leaf) in c.iter().enumerate() {
                let path = tree.path(i).unwrap();
                prop_assert_eq!(path.depth(), depth);
                prop_assert_eq!(path.leaf_index(), i as u64);
                prop_assert!(verify_membership(leaf, &path, &tree.root()));
            }
        }

        #[test]
        fn tampering_breaks_membership(
            count in 2u64..=8,
            pick in any::<prop::sample::Index>(),
            level in 0usize..3,
            flip_side in any::<bool>(),
        ) {
            let c = leaves(count);
            let tree = MerkleTree::from_leaves(3, &c).unwrap();
            let i = pick.index(c.len());
            let path = tree.path(i).unwrap();

            let mut siblings = path.siblings().to_vec();
            let mut sides = path.sides().to_vec();
            if flip_side {
                sides[level] = match sides[level] {
                    PathSide::Left => PathSide::Right,
                    PathSide::Right => PathSide::Left,
                };
            } else {
                siblings[level] += Fr::ONE;
            }
            let tampered = MerklePath::from_sides(siblings, sides).unwrap();
            prop_assert!(!verify_membership(&c[i], &tampered, &tree.root()));
        }
    }
}

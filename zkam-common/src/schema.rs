// zkam/zkam-common/src/schema.rs
// Numan Thabit 2025

//! Ordered, versioned layout of the signal vector handed to the circuit.
//!
//! Private signals come first, public signals last. The circuit reads the
//! vector positionally, so any change to the order or to a field's width must
//! bump [`SCHEMA_VERSION`]; the fingerprint changes with the layout either way.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u16 = 1;

const FINGERPRINT_DOMAIN: &[u8] = b"zkam-signal-schema";

/// Field names at the input boundary.
pub mod names {
    pub const SOURCE_IDENTIFIER: &str = "sourceIdentifier";
    pub const SOURCE_SECRET: &str = "sourceSecret";
    pub const COMMITMENT_RECEIPT: &str = "sourceCommitmentReceipt";
    pub const PATH_ELEMENTS: &str = "accountMerklePathElements";
    pub const PATH_INDICES: &str = "accountMerklePathIndices";
    pub const ACCOUNTS_TREE_ROOT: &str = "accountsTreeRoot";
    pub const DESTINATION_IDENTIFIER: &str = "destinationIdentifier";
    pub const MAPPER_PUBKEY: &str = "commitmentMapperPubKey";
    pub const EXTERNAL_NULLIFIER: &str = "externalNullifier";
    pub const NULLIFIER: &str = "nullifier";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    SourceIdentifier,
    SourceSecret,
    CommitmentReceipt(usize),
    PathElement(usize),
    PathIndex(usize),
    AccountsTreeRoot,
    DestinationIdentifier,
    MapperPubKey(usize),
    ExternalNullifier,
    Nullifier,
}

impl SignalKind {
    pub fn field(self) -> &'static str {
        match self {
            Self::SourceIdentifier => names::SOURCE_IDENTIFIER,
            Self::SourceSecret => names::SOURCE_SECRET,
            Self::CommitmentReceipt(_) => names::COMMITMENT_RECEIPT,
            Self::PathElement(_) => names::PATH_ELEMENTS,
            Self::PathIndex(_) => names::PATH_INDICES,
            Self::AccountsTreeRoot => names::ACCOUNTS_TREE_ROOT,
            Self::DestinationIdentifier => names::DESTINATION_IDENTIFIER,
            Self::MapperPubKey(_) => names::MAPPER_PUBKEY,
            Self::ExternalNullifier => names::EXTERNAL_NULLIFIER,
            Self::Nullifier => names::NULLIFIER,
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            Self::CommitmentReceipt(i)
            | Self::PathElement(i)
            | Self::PathIndex(i)
            | Self::MapperPubKey(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_public(self) -> bool {
        matches!(
            self,
            Self::DestinationIdentifier
                | Self::MapperPubKey(_)
                | Self::ExternalNullifier
                | Self::Nullifier
        )
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{}[{i}]", self.field()),
            None => f.write_str(self.field()),
        }
    }
}

/// Concrete layout for one deployment: tree depth and mapper scheme widths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSchema {
    version: u16,
    tree_depth: usize,
    receipt_len: usize,
    pubkey_len: usize,
}

impl SignalSchema {
    pub fn new(tree_depth: usize, receipt_len: usize, pubkey_len: usize) -> Self {
        Self {
            version: SCHEMA_VERSION,
            tree_depth,
            receipt_len,
            pubkey_len,
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn tree_depth(&self) -> usize {
        self.tree_depth
    }

    pub fn receipt_len(&self) -> usize {
        self.receipt_len
    }

    pub fn pubkey_len(&self) -> usize {
        self.pubkey_len
    }

    /// Signals in vector order.
    pub fn kinds(&self) -> Vec<SignalKind> {
        let mut kinds = Vec::with_capacity(self.len());
        kinds.push(SignalKind::SourceIdentifier);
        kinds.push(SignalKind::SourceSecret);
        kinds.extend((0..self.receipt_len).map(SignalKind::CommitmentReceipt));
        kinds.extend((0..self.tree_depth).map(SignalKind::PathElement));
        kinds.extend((0..self.tree_depth).map(SignalKind::PathIndex));
        kinds.push(SignalKind::AccountsTreeRoot);
        kinds.extend(self.public_kinds());
        kinds
    }

    pub fn public_kinds(&self) -> Vec<SignalKind> {
        let mut kinds = Vec::with_capacity(self.public_len());
        kinds.push(SignalKind::DestinationIdentifier);
        kinds.extend((0..self.pubkey_len).map(SignalKind::MapperPubKey));
        kinds.push(SignalKind::ExternalNullifier);
        kinds.push(SignalKind::Nullifier);
        kinds
    }

    pub fn private_len(&self) -> usize {
        3 + self.receipt_len + 2 * self.tree_depth
    }

    pub fn public_len(&self) -> usize {
        3 + self.pubkey_len
    }

    pub fn len(&self) -> usize {
        self.private_len() + self.public_len()
    }

    /// Offset of `kind` in the full signal vector.
    pub fn position(&self, kind: SignalKind) -> Option<usize> {
        let d = self.tree_depth;
        let r = self.receipt_len;
        let k = self.pubkey_len;
        let base = self.private_len();
        let in_range = |i: usize, len: usize| (i < len).then_some(i);
        match kind {
            SignalKind::SourceIdentifier => Some(0),
            SignalKind::SourceSecret => Some(1),
            SignalKind::CommitmentReceipt(i) => in_range(i, r).map(|i| 2 + i),
            SignalKind::PathElement(i) => in_range(i, d).map(|i| 2 + r + i),
            SignalKind::PathIndex(i) => in_range(i, d).map(|i| 2 + r + d + i),
            SignalKind::AccountsTreeRoot => Some(2 + r + 2 * d),
            SignalKind::DestinationIdentifier => Some(base),
            SignalKind::MapperPubKey(i) => in_range(i, k).map(|i| base + 1 + i),
            SignalKind::ExternalNullifier => Some(base + 1 + k),
            SignalKind::Nullifier => Some(base + 2 + k),
        }
    }

    /// Offset of `kind` within the public tail (the circuit's instance column).
    pub fn public_position(&self, kind: SignalKind) -> Option<usize> {
        if !kind.is_public() {
            return None;
        }
        self.position(kind).map(|pos| pos - self.private_len())
    }

    pub fn kind_at(&self, position: usize) -> Option<SignalKind> {
        self.kinds().get(position).copied()
    }

    /// blake3 over the version and the rendered layout.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(&self.version.to_le_bytes());
        for kind in self.kinds() {
            hasher.update(kind.to_string().as_bytes());
            hasher.update(&[0u8]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_declared_order() {
        let schema = SignalSchema::new(2, 4, 4);
        let rendered: Vec<String> = schema.kinds().iter().map(|k| k.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "sourceIdentifier",
                "sourceSecret",
                "sourceCommitmentReceipt[0]",
                "sourceCommitmentReceipt[1]",
                "sourceCommitmentReceipt[2]",
                "sourceCommitmentReceipt[3]",
                "accountMerklePathElements[0]",
                "accountMerklePathElements[1]",
                "accountMerklePathIndices[0]",
                "accountMerklePathIndices[1]",
                "accountsTreeRoot",
                "destinationIdentifier",
                "commitmentMapperPubKey[0]",
                "commitmentMapperPubKey[1]",
                "commitmentMapperPubKey[2]",
                "commitmentMapperPubKey[3]",
                "externalNullifier",
                "nullifier",
            ]
        );
        assert_eq!(schema.len(), rendered.len());
        assert_eq!(schema.public_len(), 7);
    }

    #[test]
    fn positions_agree_with_layout() {
        let schema = SignalSchema::new(3, 4, 4);
        for (pos, kind) in schema.kinds().into_iter().enumerate() {
            assert_eq!(schema.position(kind), Some(pos), "{kind}");
            assert_eq!(schema.kind_at(pos), Some(kind));
        }
        assert_eq!(schema.position(SignalKind::PathElement(3)), None);
        assert_eq!(schema.public_position(SignalKind::Nullifier), Some(6));
        assert_eq!(schema.public_position(SignalKind::SourceSecret), None);
    }

    #[test]
    fn fingerprint_tracks_layout() {
        let a = SignalSchema::new(20, 4, 4);
        assert_eq!(a.fingerprint(), SignalSchema::new(20, 4, 4).fingerprint());
        assert_ne!(a.fingerprint(), SignalSchema::new(19, 4, 4).fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}

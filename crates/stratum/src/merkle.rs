use super::*;

/// A merkle step as it goes over the wire: internal byte order, hex encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct MerkleNode(TxMerkleNode);

impl FromStr for MerkleNode {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = <[u8; 32]>::from_hex(s).context(error::HexSnafu {
            field: "merkle node",
        })?;
        Ok(Self(TxMerkleNode::from_byte_array(bytes)))
    }
}

impl Display for MerkleNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.as_byte_array()))
    }
}

impl From<TxMerkleNode> for MerkleNode {
    fn from(node: TxMerkleNode) -> Self {
        Self(node)
    }
}

impl From<MerkleNode> for TxMerkleNode {
    fn from(node: MerkleNode) -> Self {
        node.0
    }
}

/// Merkle tree over a block's transactions with the coinbase slot left open.
///
/// Only the siblings along the coinbase branch are kept. Given the coinbase
/// hash, [`MerkleTree::with_first`] folds them into the block's merkle root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    steps: Vec<TxMerkleNode>,
}

impl MerkleTree {
    /// Builds the steps from the non-coinbase transaction hashes. Odd levels
    /// duplicate their last node.
    pub fn new(mut level: Vec<TxMerkleNode>) -> Self {
        let mut steps = Vec::new();

        while !level.is_empty() {
            steps.push(level[0]);

            // The open coinbase slot makes the level odd when `level` is even.
            if level.len() % 2 == 0 {
                level.push(level[level.len() - 1]);
            }

            level = level[1..]
                .chunks_exact(2)
                .map(|pair| hash_pair(pair[0], pair[1]))
                .collect();
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[TxMerkleNode] {
        &self.steps
    }

    pub fn branch(&self) -> Vec<MerkleNode> {
        self.steps.iter().copied().map(MerkleNode::from).collect()
    }

    pub fn with_first(&self, first: TxMerkleNode) -> TxMerkleNode {
        self.steps
            .iter()
            .fold(first, |running, step| hash_pair(running, *step))
    }
}

fn hash_pair(left: TxMerkleNode, right: TxMerkleNode) -> TxMerkleNode {
    let mut concat = [0u8; 64];
    concat[..32].copy_from_slice(left.as_byte_array());
    concat[32..].copy_from_slice(right.as_byte_array());
    TxMerkleNode::from_raw_hash(sha256d::Hash::hash(&concat))
}

#[cfg(test)]
mod tests {
    use {super::*, bitcoin::merkle_tree::calculate_root};

    fn leaf(n: u32) -> TxMerkleNode {
        TxMerkleNode::from_raw_hash(sha256d::Hash::hash(&n.to_le_bytes()))
    }

    #[test]
    fn coinbase_only_is_identity() {
        let tree = MerkleTree::new(Vec::new());
        assert!(tree.steps().is_empty());
        assert_eq!(tree.with_first(leaf(7)), leaf(7));
    }

    #[test]
    fn with_first_matches_full_reconstruction() {
        for count in 0..40 {
            let leaves = (1..=count).map(leaf).collect::<Vec<_>>();
            let tree = MerkleTree::new(leaves.clone());
            let coinbase = leaf(0xc0ffee);

            let expected =
                calculate_root(std::iter::once(coinbase).chain(leaves.iter().copied())).unwrap();

            assert_eq!(
                tree.with_first(coinbase),
                expected,
                "root mismatch with {count} ordinary transactions"
            );
        }
    }

    #[test]
    fn step_count_is_tree_depth() {
        assert_eq!(MerkleTree::new(vec![leaf(1)]).steps().len(), 1);
        assert_eq!(MerkleTree::new(vec![leaf(1), leaf(2)]).steps().len(), 2);
        assert_eq!(MerkleTree::new((1..=3).map(leaf).collect()).steps().len(), 2);
        assert_eq!(MerkleTree::new((1..=4).map(leaf).collect()).steps().len(), 3);
    }

    #[test]
    fn first_step_is_first_transaction() {
        let tree = MerkleTree::new(vec![leaf(1), leaf(2), leaf(3)]);
        assert_eq!(tree.steps()[0], leaf(1));
        assert_eq!(tree.steps()[1], hash_pair(leaf(2), leaf(3)));
    }

    #[test]
    fn with_first_is_pure() {
        let tree = MerkleTree::new((1..=5).map(leaf).collect());
        let before = tree.clone();
        assert_eq!(tree.with_first(leaf(9)), tree.with_first(leaf(9)));
        assert_eq!(tree, before);
    }

    #[test]
    fn node_hex_is_internal_byte_order() {
        let node = MerkleNode::from(TxMerkleNode::from_byte_array([0xab; 32]));
        assert_eq!(node.to_string(), "ab".repeat(32));
        assert_eq!(node.to_string().parse::<MerkleNode>().unwrap(), node);
    }
}

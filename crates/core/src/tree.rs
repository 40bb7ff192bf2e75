//! Prefix-code tree: the decoding structure behind every prefix code.
//!
//! Each edge carries one channel symbol and each leaf holds one source
//! symbol. The root-to-leaf path of a leaf is its codeword.
//!
//! # Invariants
//!
//! - No codeword is a prefix of another: a node holding a symbol never has
//!   children, and a node with children never holds a symbol.
//! - Every codeword is distinct and non-empty, so the root never holds a symbol.
//! - Every non-root node lies on the path to some leaf.
//!
//! Insertion checks all of this before touching the tree. A rejected insert
//! leaves the tree exactly as it was, and decoding never re-validates.
//!
//! # Layout
//!
//! Nodes live in a flat `Vec` and refer to their children by index. Child
//! lists are small (one entry per channel symbol in use), so a linear scan
//! beats hashing and keeps insertion order for deterministic traversal.

use crate::error::{DecodeError, TreeError};
use crate::message::Symbol;

/// Index of a node inside its tree.
pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone)]
struct Node<S, C> {
    /// Source symbol for leaves; `None` for the root and internal nodes
    symbol: Option<S>,
    /// Outgoing edges in insertion order
    children: Vec<(C, NodeId)>,
    depth: usize,
}

impl<S, C> Node<S, C> {
    fn empty(depth: usize) -> Self {
        Self {
            symbol: None,
            children: Vec::new(),
            depth,
        }
    }
}

/// Read-only view of one node, for external traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView<'a, S> {
    pub id: NodeId,
    pub depth: usize,
    /// Present exactly when the node is a leaf
    pub symbol: Option<&'a S>,
}

/// Read-only view of one labelled edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a, C> {
    pub parent: NodeId,
    pub child: NodeId,
    pub label: &'a C,
}

/// Trie mapping channel-symbol codewords to source symbols.
#[derive(Debug, Clone)]
pub struct PrefixCodeTree<S, C> {
    nodes: Vec<Node<S, C>>,
}

impl<S: Symbol, C: Symbol> PrefixCodeTree<S, C> {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::empty(0)],
        }
    }

    fn child(&self, node: NodeId, label: &C) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .find(|(edge, _)| edge == label)
            .map(|&(_, id)| id)
    }

    /// Insert `codeword` as the path to a new leaf holding `symbol`.
    ///
    /// # Errors
    /// - `PrefixViolation` if the codeword is empty, passes through an
    ///   existing leaf, or ends on an internal node (it would be a prefix of
    ///   codewords already present).
    /// - `DuplicateCodeword` if the exact codeword already ends in a leaf.
    ///
    /// On error the tree is unchanged.
    pub fn insert_code(&mut self, codeword: &[C], symbol: S) -> Result<(), TreeError> {
        let len = codeword.len();
        if len == 0 {
            return Err(TreeError::PrefixViolation { depth: 0, len });
        }

        // Walk the existing part of the path first; nothing is mutated until
        // the whole codeword is known to fit.
        let mut node = ROOT;
        let mut matched = 0;
        for label in codeword {
            let Some(next) = self.child(node, label) else {
                break;
            };
            node = next;
            matched += 1;

            if self.nodes[node].symbol.is_some() {
                return Err(if matched == len {
                    TreeError::DuplicateCodeword { len }
                } else {
                    TreeError::PrefixViolation {
                        depth: matched,
                        len,
                    }
                });
            }
        }

        if matched == len {
            // Ended on an internal node: the new codeword would prefix others.
            return Err(TreeError::PrefixViolation {
                depth: matched,
                len,
            });
        }

        for label in &codeword[matched..] {
            let id = self.nodes.len();
            let depth = self.nodes[node].depth + 1;
            self.nodes.push(Node::empty(depth));
            self.nodes[node].children.push((label.clone(), id));
            node = id;
        }
        self.nodes[node].symbol = Some(symbol);

        Ok(())
    }

    /// Decode one codeword starting at `start_pos`.
    ///
    /// Walks from the root, consuming one symbol per edge until a leaf is
    /// reached. Returns the leaf's symbol and the position just past the
    /// consumed codeword.
    ///
    /// # Errors
    /// - `OutOfRange` if `start_pos >= sequence.len()`
    /// - `IncompleteCodeword` if the input ends before a leaf
    /// - `InvalidSymbol` if the next input symbol has no edge
    pub fn decode(&self, sequence: &[C], start_pos: usize) -> Result<(S, usize), DecodeError> {
        if start_pos >= sequence.len() {
            return Err(DecodeError::OutOfRange {
                position: start_pos,
                len: sequence.len(),
            });
        }

        let mut node = ROOT;
        let mut pos = start_pos;
        loop {
            if let Some(symbol) = &self.nodes[node].symbol {
                return Ok((symbol.clone(), pos));
            }

            let Some(label) = sequence.get(pos) else {
                return Err(DecodeError::IncompleteCodeword {
                    start: start_pos,
                    len: sequence.len(),
                });
            };

            node = self
                .child(node, label)
                .ok_or(DecodeError::InvalidSymbol { position: pos })?;
            pos += 1;
        }
    }

    /// Lazily decode `sequence` from the beginning.
    pub fn decode_all<'a>(&'a self, sequence: &'a [C]) -> Decoded<'a, S, C> {
        self.decode_from(sequence, 0)
    }

    /// Lazily decode `sequence` starting at `pos`.
    ///
    /// The iterator yields `(symbol, next_pos)` pairs and ends after the
    /// input is exhausted or after the first error.
    pub fn decode_from<'a>(&'a self, sequence: &'a [C], pos: usize) -> Decoded<'a, S, C> {
        Decoded {
            tree: self,
            sequence,
            pos,
            failed: false,
        }
    }

    /// All codewords with their symbols, depth-first in edge insertion order.
    pub fn codewords(&self) -> Vec<(Vec<C>, &S)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_codewords(ROOT, &mut path, &mut out);
        out
    }

    fn collect_codewords<'a>(
        &'a self,
        node: NodeId,
        path: &mut Vec<C>,
        out: &mut Vec<(Vec<C>, &'a S)>,
    ) {
        let node = &self.nodes[node];
        if let Some(symbol) = &node.symbol {
            out.push((path.clone(), symbol));
        }
        for (label, child) in &node.children {
            path.push(label.clone());
            self.collect_codewords(*child, path, out);
            path.pop();
        }
    }

    /// Every node in creation order (root first).
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'_, S>> + '_ {
        self.nodes.iter().enumerate().map(|(id, node)| NodeView {
            id,
            depth: node.depth,
            symbol: node.symbol.as_ref(),
        })
    }

    /// Every edge, grouped by parent in creation order.
    pub fn edges(&self) -> impl Iterator<Item = Edge<'_, C>> + '_ {
        self.nodes.iter().enumerate().flat_map(|(parent, node)| {
            node.children.iter().map(move |(label, child)| Edge {
                parent,
                child: *child,
                label,
            })
        })
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of codewords.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.symbol.is_some()).count()
    }

    /// Length of the longest codeword (0 for an empty tree).
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// True if no codeword has been inserted.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// True if every internal node uses all `arity` channel symbols.
    ///
    /// A complete tree satisfies the Kraft inequality with equality: every
    /// infinite channel stream decodes without `InvalidSymbol`.
    pub fn is_complete(&self, arity: usize) -> bool {
        !self.is_empty()
            && self
                .nodes
                .iter()
                .filter(|n| n.symbol.is_none())
                .all(|n| n.children.len() == arity)
    }
}

impl<S: Symbol, C: Symbol> Default for PrefixCodeTree<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy decoder over a channel sequence; see [`PrefixCodeTree::decode_from`].
#[derive(Debug, Clone)]
pub struct Decoded<'a, S, C> {
    tree: &'a PrefixCodeTree<S, C>,
    sequence: &'a [C],
    pos: usize,
    failed: bool,
}

impl<S, C> Decoded<'_, S, C> {
    /// Position of the next codeword to decode.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<S: Symbol, C: Symbol> Iterator for Decoded<'_, S, C> {
    type Item = Result<(S, usize), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.sequence.len() {
            return None;
        }

        match self.tree.decode(self.sequence, self.pos) {
            Ok((symbol, next)) => {
                self.pos = next;
                Some(Ok((symbol, next)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

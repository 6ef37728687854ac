//! In-memory B+Tree nodes and their page images.
//!
//! Node page layout:
//! ```text
//! +--------------------+ 0
//! | node_type: u8      | 1 = leaf, 2 = internal
//! | reserved: u8       |
//! | count: u16         | entries (leaf) or keys (internal)
//! | next_leaf: u32     | leaves only, u32::MAX for none
//! | key_size: u16      |
//! | reserved: [u8; 6]  | 16 (NODE_HEADER_SIZE)
//! +--------------------+
//! | leaf:     (key [N], row_id u64) x count
//! | internal: child u32 x (count + 1), key [N] x count
//! +--------------------+
//! ```
//! All integers are little-endian.

use super::constants::{
    CHILD_SIZE, NO_NEXT_LEAF, NODE_HEADER_SIZE, NODE_TYPE_INTERNAL, NODE_TYPE_LEAF,
};
use super::key::{GenericComparator, GenericKey};
use crate::tuple::RowId;
use bytes::{Buf, BufMut};
use std::cmp::Ordering;
use zyron_common::page::PAGE_SIZE;
use zyron_common::{Result, ZyronError};

/// Leaf node: sorted keys with their row ids.
#[derive(Debug, Clone)]
pub(crate) struct LeafNode<const N: usize> {
    pub keys: Vec<GenericKey<N>>,
    pub values: Vec<RowId>,
    pub next: Option<u32>,
}

impl<const N: usize> LeafNode<N> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
        }
    }

    /// Binary search. Ok(index) if found, Err(index) for insertion point.
    #[inline]
    pub fn search(
        &self,
        key: &GenericKey<N>,
        cmp: &GenericComparator<N>,
    ) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|k| cmp.compare(k, key))
    }

    /// Moves the upper half into a new leaf that becomes this leaf's successor.
    /// `new_id` is the node number the new leaf will get.
    pub fn split(&mut self, new_id: u32) -> LeafNode<N> {
        let mid = self.keys.len() / 2;
        let right = LeafNode {
            keys: self.keys.split_off(mid),
            values: self.values.split_off(mid),
            next: self.next,
        };
        self.next = Some(new_id);
        right
    }
}

/// Internal node: `keys.len() + 1` children, keys act as separators.
#[derive(Debug, Clone)]
pub(crate) struct InternalNode<const N: usize> {
    pub keys: Vec<GenericKey<N>>,
    pub children: Vec<u32>,
}

impl<const N: usize> InternalNode<N> {
    /// Index of the child whose subtree covers `key`.
    /// Keys equal to a separator live to its right.
    #[inline]
    pub fn route(&self, key: &GenericKey<N>, cmp: &GenericComparator<N>) -> usize {
        self.keys
            .partition_point(|k| cmp.compare(k, key) != Ordering::Greater)
    }

    /// Moves the upper half into a new node and returns it with the separator
    /// promoted to the parent.
    pub fn split(&mut self) -> (GenericKey<N>, InternalNode<N>) {
        let mid = self.keys.len() / 2;
        let mut right_keys = self.keys.split_off(mid);
        // keys[mid] moves up; the left node keeps keys[..mid]
        let promoted = right_keys.remove(0);
        let right = InternalNode {
            keys: right_keys,
            children: self.children.split_off(mid + 1),
        };
        (promoted, right)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node<const N: usize> {
    Leaf(LeafNode<N>),
    Internal(InternalNode<N>),
}

impl<const N: usize> Node<N> {
    /// Writes the page image of this node into `page`.
    ///
    /// `page` must be at least `PAGE_SIZE` bytes and the node must respect
    /// the fanout limits derived from it.
    pub fn write_to(&self, page: &mut [u8]) {
        let mut out = page;
        match self {
            Node::Leaf(leaf) => {
                out.put_u8(NODE_TYPE_LEAF);
                out.put_u8(0);
                out.put_u16_le(leaf.keys.len() as u16);
                out.put_u32_le(leaf.next.unwrap_or(NO_NEXT_LEAF));
                out.put_u16_le(N as u16);
                out.put_bytes(0, 6);
                for (key, row_id) in leaf.keys.iter().zip(&leaf.values) {
                    out.put_slice(key.as_bytes());
                    out.put_u64_le(row_id.as_u64());
                }
            }
            Node::Internal(internal) => {
                out.put_u8(NODE_TYPE_INTERNAL);
                out.put_u8(0);
                out.put_u16_le(internal.keys.len() as u16);
                out.put_u32_le(NO_NEXT_LEAF);
                out.put_u16_le(N as u16);
                out.put_bytes(0, 6);
                for &child in &internal.children {
                    out.put_u32_le(child);
                }
                for key in &internal.keys {
                    out.put_slice(key.as_bytes());
                }
            }
        }
    }

    /// Parses a node page image.
    pub fn read_from(page: &[u8]) -> Result<Self> {
        if page.len() < PAGE_SIZE {
            return Err(ZyronError::BTreeCorrupted(format!(
                "node page of {} bytes",
                page.len()
            )));
        }

        let mut input = &page[..PAGE_SIZE];
        let node_type = input.get_u8();
        input.advance(1);
        let count = input.get_u16_le() as usize;
        let next = input.get_u32_le();
        let key_size = input.get_u16_le() as usize;
        input.advance(6);

        if key_size != N {
            return Err(ZyronError::BTreeCorrupted(format!(
                "node written with {}-byte keys, expected {}",
                key_size, N
            )));
        }

        match node_type {
            NODE_TYPE_LEAF => {
                if NODE_HEADER_SIZE + count * (N + RowId::SIZE) > PAGE_SIZE {
                    return Err(ZyronError::BTreeCorrupted(format!(
                        "leaf claims {} entries",
                        count
                    )));
                }
                let mut leaf = LeafNode::new();
                leaf.next = (next != NO_NEXT_LEAF).then_some(next);
                for _ in 0..count {
                    leaf.keys.push(GenericKey::from_bytes(&input[..N])?);
                    input.advance(N);
                    leaf.values.push(RowId::from_u64(input.get_u64_le()));
                }
                Ok(Node::Leaf(leaf))
            }
            NODE_TYPE_INTERNAL => {
                if NODE_HEADER_SIZE + (count + 1) * CHILD_SIZE + count * N > PAGE_SIZE {
                    return Err(ZyronError::BTreeCorrupted(format!(
                        "internal node claims {} keys",
                        count
                    )));
                }
                let children = (0..=count).map(|_| input.get_u32_le()).collect();
                let mut keys = Vec::with_capacity(count);
                for _ in 0..count {
                    keys.push(GenericKey::from_bytes(&input[..N])?);
                    input.advance(N);
                }
                Ok(Node::Internal(InternalNode { keys, children }))
            }
            other => Err(ZyronError::BTreeCorrupted(format!(
                "unknown node type {}",
                other
            ))),
        }
    }

    /// Node numbers this node refers to (children or next leaf).
    pub fn links(&self) -> Vec<u32> {
        match self {
            Node::Leaf(leaf) => leaf.next.into_iter().collect(),
            Node::Internal(internal) => internal.children.clone(),
        }
    }
}

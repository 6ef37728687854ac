//! B+Tree index with fixed-capacity keys.

use super::constants::{
    META_HEADER_SIZE, META_MAGIC, MAX_KEY_SIZE, internal_capacity, leaf_capacity,
};
use super::key::{GenericComparator, GenericKey};
use super::node::{InternalNode, LeafNode, Node};
use crate::index::Index;
use crate::schema::Schema;
use crate::tuple::{Row, RowId};
use bytes::{Buf, BufMut};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};
use zyron_buffer::{BufferPool, EvictedPage};
use zyron_common::page::PageId;
use zyron_common::{IndexConfig, Result, ZyronError};

/// B+Tree mapping `N`-byte keys to row ids.
///
/// Keys are unique. Nodes live in memory in a node vector addressed by node
/// number; `flush` writes node `i` to page `PageId(index_id, i + 1)` of the
/// shared buffer pool and a header to page `PageId(index_id, 0)`. Building a
/// tree whose header page is resident in the pool reloads it from there.
///
/// Deletion does not rebalance. Leaves may become empty; separators stay
/// valid routing keys.
pub struct BPlusTreeIndex<const N: usize> {
    index_id: u32,
    key_schema: Arc<Schema>,
    comparator: GenericComparator<N>,
    pool: Arc<BufferPool>,
    state: RwLock<TreeState<N>>,
}

struct TreeState<const N: usize> {
    nodes: Vec<Node<N>>,
    root: u32,
    len: usize,
    leaf_max: usize,
    internal_max: usize,
}

/// Decoded index header page.
struct MetaPage {
    key_size: usize,
    root: u32,
    node_count: u32,
    len: u64,
    leaf_max: u32,
    internal_max: u32,
}

impl MetaPage {
    fn write_to(&self, page: &mut [u8]) {
        let mut out = page;
        out.put_u32_le(META_MAGIC);
        out.put_u16_le(self.key_size as u16);
        out.put_u16_le(0);
        out.put_u32_le(self.root);
        out.put_u32_le(self.node_count);
        out.put_u64_le(self.len);
        out.put_u32_le(self.leaf_max);
        out.put_u32_le(self.internal_max);
    }

    fn read_from(page: &[u8]) -> Result<Self> {
        if page.len() < META_HEADER_SIZE {
            return Err(ZyronError::BTreeCorrupted("short header page".to_string()));
        }
        let mut input = page;
        let magic = input.get_u32_le();
        if magic != META_MAGIC {
            return Err(ZyronError::BTreeCorrupted(format!(
                "bad header magic {:#x}",
                magic
            )));
        }
        let key_size = input.get_u16_le() as usize;
        input.advance(2);
        Ok(Self {
            key_size,
            root: input.get_u32_le(),
            node_count: input.get_u32_le(),
            len: input.get_u64_le(),
            leaf_max: input.get_u32_le(),
            internal_max: input.get_u32_le(),
        })
    }
}

impl<const N: usize> TreeState<N> {
    fn empty(leaf_max: usize, internal_max: usize) -> Self {
        Self {
            nodes: vec![Node::Leaf(LeafNode::new())],
            root: 0,
            len: 0,
            leaf_max,
            internal_max,
        }
    }

    fn node(&self, id: u32) -> Result<&Node<N>> {
        self.nodes
            .get(id as usize)
            .ok_or_else(|| ZyronError::BTreeCorrupted(format!("dangling node {}", id)))
    }

    /// Descends from the root to the leaf covering `key`.
    fn find_leaf(&self, key: &GenericKey<N>, cmp: &GenericComparator<N>) -> Result<u32> {
        let mut current = self.root;
        loop {
            match self.node(current)? {
                Node::Leaf(_) => return Ok(current),
                Node::Internal(internal) => current = internal.children[internal.route(key, cmp)],
            }
        }
    }

    fn leftmost_leaf(&self) -> Result<u32> {
        let mut current = self.root;
        loop {
            match self.node(current)? {
                Node::Leaf(_) => return Ok(current),
                Node::Internal(internal) => current = internal.children[0],
            }
        }
    }

    fn leaf(&self, id: u32) -> Result<&LeafNode<N>> {
        match self.node(id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(ZyronError::BTreeCorrupted(format!(
                "node {} is not a leaf",
                id
            ))),
        }
    }

    fn leaf_mut(&mut self, id: u32) -> Result<&mut LeafNode<N>> {
        match self.nodes.get_mut(id as usize) {
            Some(Node::Leaf(leaf)) => Ok(leaf),
            _ => Err(ZyronError::BTreeCorrupted(format!(
                "node {} is not a leaf",
                id
            ))),
        }
    }

    fn insert(
        &mut self,
        key: GenericKey<N>,
        row_id: RowId,
        cmp: &GenericComparator<N>,
    ) -> Result<()> {
        let root = self.root;
        if let Some((separator, right)) = self.insert_into(root, key, row_id, cmp)? {
            let new_root = self.nodes.len() as u32;
            self.nodes.push(Node::Internal(InternalNode {
                keys: vec![separator],
                children: vec![root, right],
            }));
            self.root = new_root;
        }
        self.len += 1;
        Ok(())
    }

    /// Inserts below `node_id`. Returns the separator and node number of the
    /// new right sibling if `node_id` split.
    fn insert_into(
        &mut self,
        node_id: u32,
        key: GenericKey<N>,
        row_id: RowId,
        cmp: &GenericComparator<N>,
    ) -> Result<Option<(GenericKey<N>, u32)>> {
        let next_id = self.nodes.len() as u32;
        let leaf_max = self.leaf_max;

        let (slot, child) = match self.nodes.get_mut(node_id as usize) {
            Some(Node::Leaf(leaf)) => {
                let pos = match leaf.search(&key, cmp) {
                    Ok(_) => return Err(ZyronError::DuplicateKey),
                    Err(pos) => pos,
                };
                leaf.keys.insert(pos, key);
                leaf.values.insert(pos, row_id);

                if leaf.keys.len() <= leaf_max {
                    return Ok(None);
                }
                let right = leaf.split(next_id);
                let separator = right.keys[0];
                self.nodes.push(Node::Leaf(right));
                return Ok(Some((separator, next_id)));
            }
            Some(Node::Internal(internal)) => {
                let slot = internal.route(&key, cmp);
                (slot, internal.children[slot])
            }
            None => {
                return Err(ZyronError::BTreeCorrupted(format!(
                    "dangling node {}",
                    node_id
                )));
            }
        };

        let Some((separator, right_child)) = self.insert_into(child, key, row_id, cmp)? else {
            return Ok(None);
        };

        let next_id = self.nodes.len() as u32;
        let internal_max = self.internal_max;
        let Some(Node::Internal(internal)) = self.nodes.get_mut(node_id as usize) else {
            return Err(ZyronError::BTreeCorrupted(format!(
                "node {} changed kind during insert",
                node_id
            )));
        };
        internal.keys.insert(slot, separator);
        internal.children.insert(slot + 1, right_child);

        if internal.children.len() <= internal_max {
            return Ok(None);
        }
        let (promoted, right) = internal.split();
        self.nodes.push(Node::Internal(right));
        Ok(Some((promoted, next_id)))
    }

    fn remove(&mut self, key: &GenericKey<N>, cmp: &GenericComparator<N>) -> Result<bool> {
        let leaf_id = self.find_leaf(key, cmp)?;
        let leaf = self.leaf_mut(leaf_id)?;
        match leaf.search(key, cmp) {
            Ok(pos) => {
                leaf.keys.remove(pos);
                leaf.values.remove(pos);
                self.len -= 1;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn get(&self, key: &GenericKey<N>, cmp: &GenericComparator<N>) -> Result<Option<RowId>> {
        let leaf = self.leaf(self.find_leaf(key, cmp)?)?;
        Ok(leaf.search(key, cmp).ok().map(|pos| leaf.values[pos]))
    }

    fn range(
        &self,
        low: Option<&GenericKey<N>>,
        high: Option<&GenericKey<N>>,
        cmp: &GenericComparator<N>,
    ) -> Result<Vec<RowId>> {
        let mut results = Vec::new();
        let mut current = match low {
            Some(low) => Some(self.find_leaf(low, cmp)?),
            None => Some(self.leftmost_leaf()?),
        };

        while let Some(leaf_id) = current {
            let leaf = self.leaf(leaf_id)?;
            let start = match low {
                Some(low) => leaf.keys.partition_point(|k| cmp.compare(k, low).is_lt()),
                None => 0,
            };
            for (key, row_id) in leaf.keys[start..].iter().zip(&leaf.values[start..]) {
                if let Some(high) = high {
                    if cmp.compare(key, high).is_gt() {
                        return Ok(results);
                    }
                }
                results.push(*row_id);
            }
            current = leaf.next;
        }
        Ok(results)
    }

    fn height(&self) -> Result<usize> {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(internal) = self.node(current)? {
            current = internal.children[0];
            height += 1;
        }
        Ok(height)
    }

    fn meta(&self) -> MetaPage {
        MetaPage {
            key_size: N,
            root: self.root,
            node_count: self.nodes.len() as u32,
            len: self.len as u64,
            leaf_max: self.leaf_max as u32,
            internal_max: self.internal_max as u32,
        }
    }
}

impl<const N: usize> BPlusTreeIndex<N> {
    /// Builds the index `index_id` over keys of `key_schema`.
    ///
    /// Fanout comes from the page size unless `config` overrides it. If the
    /// header page of this index is resident in `pool` the tree is loaded from
    /// the pool instead of starting empty.
    pub fn new(
        index_id: u32,
        key_schema: Arc<Schema>,
        pool: Arc<BufferPool>,
        config: &IndexConfig,
    ) -> Result<Self> {
        if N == 0 || N > MAX_KEY_SIZE {
            return Err(ZyronError::ConfigError(format!(
                "key capacity {} outside 1..={}",
                N, MAX_KEY_SIZE
            )));
        }
        config.validate()?;
        let leaf_max = Self::fanout("leaf_max_size", config.leaf_max_size, leaf_capacity(N))?;
        let internal_max =
            Self::fanout("internal_max_size", config.internal_max_size, internal_capacity(N))?;

        let state = match Self::load(index_id, &pool)? {
            Some(state) => {
                debug!(
                    index_id,
                    key_size = N,
                    nodes = state.nodes.len(),
                    len = state.len,
                    "loaded B+ tree from buffer pool"
                );
                state
            }
            None => TreeState::empty(leaf_max, internal_max),
        };

        Ok(Self {
            index_id,
            key_schema,
            comparator: GenericComparator::new(),
            pool,
            state: RwLock::new(state),
        })
    }

    fn fanout(name: &str, requested: Option<usize>, capacity: usize) -> Result<usize> {
        match requested {
            None => Ok(capacity),
            Some(value) if value <= capacity => Ok(value),
            Some(value) => Err(ZyronError::ConfigError(format!(
                "{} {} exceeds page capacity {} for {}-byte keys",
                name, value, capacity, N
            ))),
        }
    }

    /// Copies a resident page through `parse`, leaving it unpinned.
    fn read_page<T>(
        pool: &BufferPool,
        page_id: PageId,
        parse: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Option<Result<T>> {
        let frame = pool.fetch_page(page_id)?;
        let parsed = parse(&frame.read_data()[..]);
        pool.unpin_page(page_id, false);
        Some(parsed)
    }

    fn load(index_id: u32, pool: &BufferPool) -> Result<Option<TreeState<N>>> {
        let meta_id = PageId::new(index_id, 0);
        let Some(meta) = Self::read_page(pool, meta_id, MetaPage::read_from) else {
            return Ok(None);
        };
        let meta = meta?;

        if meta.key_size != N {
            return Err(ZyronError::BTreeCorrupted(format!(
                "index {} was written with {}-byte keys, expected {}",
                index_id, meta.key_size, N
            )));
        }
        if meta.node_count == 0 || meta.root >= meta.node_count {
            return Err(ZyronError::BTreeCorrupted(format!(
                "root {} of {} nodes",
                meta.root, meta.node_count
            )));
        }

        for (name, value, capacity) in [
            ("leaf fanout", meta.leaf_max as usize, leaf_capacity(N)),
            ("internal fanout", meta.internal_max as usize, internal_capacity(N)),
        ] {
            if !(IndexConfig::MIN_FANOUT..=capacity).contains(&value) {
                return Err(ZyronError::BTreeCorrupted(format!(
                    "{} {} outside {}..={} for {}-byte keys",
                    name,
                    value,
                    IndexConfig::MIN_FANOUT,
                    capacity,
                    N
                )));
            }
        }

        let mut nodes = Vec::with_capacity(meta.node_count as usize);
        for i in 0..meta.node_count {
            let page_id = PageId::new(index_id, i + 1);
            let node = Self::read_page(pool, page_id, Node::<N>::read_from).ok_or(
                ZyronError::PageNotFound {
                    page_id: page_id.as_u64(),
                },
            )??;
            if node.links().iter().any(|&link| link >= meta.node_count) {
                return Err(ZyronError::BTreeCorrupted(format!(
                    "node {} links outside the tree",
                    i
                )));
            }
            nodes.push(node);
        }

        Ok(Some(TreeState {
            nodes,
            root: meta.root,
            len: meta.len as usize,
            leaf_max: meta.leaf_max as usize,
            internal_max: meta.internal_max as usize,
        }))
    }

    fn encode(&self, key: &Row) -> Result<GenericKey<N>> {
        GenericKey::serialize_from_key(key, &self.key_schema)
    }

    /// Number of levels, 1 when the root is a leaf.
    pub fn height(&self) -> Result<usize> {
        self.state.read().height()
    }

    /// Number of nodes, including emptied leaves.
    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    fn write_page(
        &self,
        page_id: PageId,
        evicted: &mut Vec<EvictedPage>,
        fill: impl FnOnce(&mut [u8]),
    ) -> Result<()> {
        let (frame, displaced) = self.pool.new_page(page_id)?;
        if let Some(page) = displaced {
            trace!(index_id = self.index_id, page = %page.page_id, "flush displaced dirty page");
            evicted.push(page);
        }
        {
            let mut data = frame.write_data();
            data.fill(0);
            fill(&mut data[..]);
        }
        self.pool.unpin_page(page_id, true);
        Ok(())
    }
}

impl<const N: usize> Index for BPlusTreeIndex<N> {
    fn index_id(&self) -> u32 {
        self.index_id
    }

    fn key_capacity(&self) -> usize {
        N
    }

    fn key_schema(&self) -> &Arc<Schema> {
        &self.key_schema
    }

    fn insert_entry(&self, key: &Row, row_id: RowId) -> Result<()> {
        let key = self.encode(key)?;
        self.state.write().insert(key, row_id, &self.comparator)
    }

    fn remove_entry(&self, key: &Row) -> Result<bool> {
        let key = self.encode(key)?;
        self.state.write().remove(&key, &self.comparator)
    }

    fn scan_key(&self, key: &Row) -> Result<Option<RowId>> {
        let key = self.encode(key)?;
        self.state.read().get(&key, &self.comparator)
    }

    fn range_scan(&self, low: Option<&Row>, high: Option<&Row>) -> Result<Vec<RowId>> {
        let low = low.map(|row| self.encode(row)).transpose()?;
        let high = high.map(|row| self.encode(row)).transpose()?;
        self.state
            .read()
            .range(low.as_ref(), high.as_ref(), &self.comparator)
    }

    fn len(&self) -> usize {
        self.state.read().len
    }

    fn flush(&self) -> Result<Vec<EvictedPage>> {
        let state = self.state.read();
        let mut evicted = Vec::new();

        let meta = state.meta();
        self.write_page(PageId::new(self.index_id, 0), &mut evicted, |page| {
            meta.write_to(page)
        })?;
        for (i, node) in state.nodes.iter().enumerate() {
            self.write_page(PageId::new(self.index_id, i as u32 + 1), &mut evicted, |page| {
                node.write_to(page)
            })?;
        }

        debug!(
            index_id = self.index_id,
            nodes = state.nodes.len(),
            evicted = evicted.len(),
            "flushed B+ tree"
        );
        Ok(evicted)
    }
}

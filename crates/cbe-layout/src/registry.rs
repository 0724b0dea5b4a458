//! Block registry: id → metadata.
//!
//! Lets externally triggered work (resize, visibility, context menu,
//! snapshot) find a block's cached line texts without re-reading its DOM.
//! Entries leave only through `unregister`; there is no eviction.

use ahash::AHashMap;

use crate::block::{BlockId, CodeBlockMeta};

#[derive(Debug, Default)]
pub struct BlockRegistry {
    blocks: AHashMap<BlockId, CodeBlockMeta>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `meta` under its own id and return that id.
    pub fn register(&mut self, meta: CodeBlockMeta) -> BlockId {
        let id = meta.id;
        if self.blocks.insert(id, meta).is_some() {
            tracing::warn!(target: "layout.block", %id, "block_reregistered");
        }
        id
    }

    pub fn lookup(&self, id: BlockId) -> Option<&CodeBlockMeta> {
        self.blocks.get(&id)
    }

    pub(crate) fn lookup_mut(&mut self, id: BlockId) -> Option<&mut CodeBlockMeta> {
        self.blocks.get_mut(&id)
    }

    pub fn unregister(&mut self, id: BlockId) -> Option<CodeBlockMeta> {
        self.blocks.remove(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }
}

use std::collections::HashMap;

use super::batch::Batch;

/// Definition content of a named block: the batches drawn at every placement.
///
/// Filled once during load, before any placement is expanded, and never
/// modified afterwards. Placements refer to it by name.
#[derive(Debug, Default)]
pub struct Block {
    batches: Vec<Batch>,
}

impl Block {
    pub(crate) fn push_batch(&mut self, batch: Batch) {
        debug_assert!(
            !batch.key().is_instance(),
            "block definitions hold geometry batches only"
        );
        self.batches.push(batch);
    }

    #[inline]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }
}

/// Blocks of the loaded document, keyed by block name.
pub type BlockRegistry = HashMap<String, Block>;

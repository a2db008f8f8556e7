//! Membership of resources in a tracker.

use bit_vec::BitVec;

/// The resources a tracker holds, keyed by tracker index.
///
/// Storage grows with the largest index inserted. Occupancy lives in a bit
/// vector so walking the members skips unused blocks of indices whole.
#[derive(Debug)]
pub(super) struct ResourceMetadata<T: Clone> {
    owned: BitVec<usize>,
    resources: Vec<Option<T>>,
}

impl<T: Clone> ResourceMetadata<T> {
    pub(super) fn new() -> Self {
        Self {
            owned: BitVec::default(),
            resources: Vec::new(),
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.owned.none()
    }

    pub(super) fn contains(&self, index: usize) -> bool {
        self.owned.get(index).unwrap_or(false)
    }

    /// Stores `resource` at `index`, replacing any previous member there.
    pub(super) fn insert(&mut self, index: usize, resource: T) -> &T {
        if index >= self.resources.len() {
            self.resources.resize(index + 1, None);
            self.owned.grow(index + 1 - self.owned.len(), false);
        }
        self.owned.set(index, true);
        self.resources[index].insert(resource)
    }

    pub(super) fn get_resource(&self, index: usize) -> Option<&T> {
        self.resources.get(index)?.as_ref()
    }

    pub(super) fn owned_resources(&self) -> impl Iterator<Item = T> + '_ {
        self.owned_indices()
            .filter_map(move |index| self.resources[index].clone())
    }

    pub(super) fn owned_indices(&self) -> impl Iterator<Item = usize> + '_ {
        set_bits(&self.owned)
    }
}

/// Indices of the set bits of `bits`, in increasing order.
fn set_bits(bits: &BitVec<usize>) -> impl Iterator<Item = usize> + '_ {
    const BLOCK_BITS: usize = usize::BITS as usize;

    bits.blocks()
        .enumerate()
        .flat_map(|(block_index, mut block)| {
            std::iter::from_fn(move || {
                if block == 0 {
                    return None;
                }
                let bit = block.trailing_zeros() as usize;
                // Clear the lowest set bit.
                block &= block - 1;
                Some(block_index * BLOCK_BITS + bit)
            })
        })
}

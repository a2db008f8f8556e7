use std::marker::PhantomData;

use parking_lot::Mutex;

use crate::{
    id::{Id, Marker},
    Epoch, Index,
};

#[derive(Debug, Default)]
struct FreeList {
    /// Released indices with the epoch they were last used at.
    free: Vec<(Index, Epoch)>,
    /// One past the highest index ever handed out.
    next_index: Index,
    live: usize,
}

/// Hands out the ids of one resource type.
///
/// Indices stay dense: a released index is reused, with its epoch bumped,
/// before a new index is taken. This keeps the registry's storage vector no
/// longer than the peak number of live resources, and makes a stale id
/// distinguishable from the resource that later reuses its slot.
#[derive(Debug)]
pub struct IdentityManager<T: Marker> {
    list: Mutex<FreeList>,
    _phantom: PhantomData<T>,
}

impl<T: Marker> IdentityManager<T> {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(FreeList::default()),
            _phantom: PhantomData,
        }
    }

    pub fn alloc(&self) -> Id<T> {
        let mut list = self.list.lock();
        list.live += 1;
        if let Some((index, epoch)) = list.free.pop() {
            return Id::zip(index, epoch + 1);
        }
        let index = list.next_index;
        list.next_index += 1;
        Id::zip(index, 1)
    }

    /// Returns the index of `id` to the pool.
    ///
    /// An index whose epoch can't be bumped again is never reused.
    pub fn release(&self, id: Id<T>) {
        let (index, epoch) = id.unzip();
        let mut list = self.list.lock();
        if epoch < Epoch::MAX {
            list.free.push((index, epoch));
        }
        list.live -= 1;
    }

    /// Number of ids allocated and not yet released.
    pub fn count(&self) -> usize {
        self.list.lock().live
    }
}

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::{
    id::Id,
    identity::IdentityManager,
    resource::{Fallible, ParentDevice},
    storage::{Storage, StorageItem},
    Label, LabelHelpers as _,
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryReport {
    pub num_allocated: usize,
    pub num_kept_from_user: usize,
    pub element_size: usize,
}

impl RegistryReport {
    pub fn is_empty(&self) -> bool {
        self.num_allocated + self.num_kept_from_user == 0
    }
}

/// Registry is the primary holder of each resource type.
///
/// Every resource is stored behind an `Arc`, or as a [`Fallible`] entry that
/// remembers the label of a failed creation. Dropping the id from user code
/// removes the entry; other resources may still hold their own `Arc`.
///
/// [`Fallible`]: crate::resource::Fallible
#[derive(Debug)]
pub(crate) struct Registry<T: StorageItem> {
    identity: Arc<IdentityManager<T::Marker>>,
    storage: RwLock<Storage<T>>,
}

impl<T: StorageItem> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            identity: Arc::new(IdentityManager::new()),
            storage: RwLock::new(Storage::new()),
        }
    }
}

#[must_use]
pub(crate) struct FutureId<'a, T: StorageItem> {
    id: Id<T::Marker>,
    data: &'a RwLock<Storage<T>>,
}

impl<T: StorageItem> FutureId<'_, T> {
    /// Assign a new resource to this ID.
    ///
    /// Registers it with the registry.
    pub fn assign(self, value: T) -> Id<T::Marker> {
        let mut data = self.data.write();
        data.insert(self.id, value);
        self.id
    }
}

impl<T: ParentDevice + StorageItem> FutureId<'_, Fallible<T>> {
    /// Registers an error object in place of a resource that failed to be
    /// created.
    pub fn assign_invalid(self, label: &Label) -> Id<T::Marker> {
        self.assign(Fallible::Invalid(Arc::new(label.to_string())))
    }
}

impl<T: StorageItem> Registry<T> {
    pub(crate) fn prepare(&self) -> FutureId<T> {
        FutureId {
            id: self.identity.alloc(),
            data: &self.storage,
        }
    }

    pub(crate) fn read<'a>(&'a self) -> RwLockReadGuard<'a, Storage<T>> {
        self.storage.read()
    }

    pub(crate) fn remove(&self, id: Id<T::Marker>) -> T {
        let value = self.storage.write().remove(id);
        // Free the id only once the storage slot is vacant again.
        self.identity.release(id);
        value
    }

    pub(crate) fn count(&self) -> usize {
        self.identity.count()
    }

    pub(crate) fn generate_report(&self) -> RegistryReport {
        let storage = self.storage.read();
        RegistryReport {
            num_allocated: self.identity.count(),
            num_kept_from_user: storage.iter().count(),
            element_size: std::mem::size_of::<T>(),
        }
    }
}

impl<T: StorageItem + Clone> Registry<T> {
    pub(crate) fn get(&self, id: Id<T::Marker>) -> T {
        self.read().get(id)
    }
}

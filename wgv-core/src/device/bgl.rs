use crate::{
    binding_model::{self, ResolvedBindGroupLayoutEntry},
    FastIndexMap,
};

/// Where a given BGL came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The bind group layout was created by the user and is present in the BGL resource pool.
    Pool,
    /// The bind group layout was derived from a shader interface when a
    /// pipeline was created without a layout.
    Derived,
}

/// A map of the resolved entries of a bind group layout, keyed by binding index.
///
/// Entries are kept sorted by binding so that iterating two equivalent
/// layouts visits their entries in the same order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryMap {
    inner: FastIndexMap<u32, ResolvedBindGroupLayoutEntry>,
}

impl EntryMap {
    /// Builds a map from resolved entries.
    ///
    /// Errors if an entry's binding range leaves the device limits or overlaps
    /// the range of another entry. A binding array of `n` elements occupies
    /// the binding numbers `binding..binding + n`.
    pub fn from_entries(
        device_limits: &wgt::Limits,
        entries: impl IntoIterator<Item = ResolvedBindGroupLayoutEntry>,
    ) -> Result<Self, binding_model::CreateBindGroupLayoutError> {
        let mut inner = FastIndexMap::default();
        for entry in entries {
            let maximum = device_limits.max_bindings_per_bind_group;
            match entry.binding.checked_add(entry.array_len() - 1) {
                Some(last) if last < maximum => {}
                _ => {
                    return Err(
                        binding_model::CreateBindGroupLayoutError::InvalidBindingIndex {
                            binding: entry.binding,
                            maximum,
                        },
                    )
                }
            }
            if inner.insert(entry.binding, entry).is_some() {
                return Err(binding_model::CreateBindGroupLayoutError::ConflictBinding(
                    entry.binding,
                ));
            }
        }
        inner.sort_unstable_keys();

        // Sorted by start, so only neighbors can overlap.
        let mut previous_end = None;
        for entry in inner.values() {
            if let Some(end) = previous_end {
                if entry.binding < end {
                    return Err(binding_model::CreateBindGroupLayoutError::ConflictBinding(
                        entry.binding,
                    ));
                }
            }
            previous_end = Some(entry.binding + entry.array_len());
        }

        Ok(Self { inner })
    }

    /// Restores the binding order after entries were added through [`EntryMap::entry`].
    pub fn sort(&mut self) {
        self.inner.sort_unstable_keys();
    }

    /// Get the count of entries in this map.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Get the entry declared at exactly the given binding index.
    pub fn get(&self, binding: u32) -> Option<&ResolvedBindGroupLayoutEntry> {
        self.inner.get(&binding)
    }

    /// Finds the entry whose binding range contains `binding`, together with
    /// the element index within a binding array.
    pub fn find_slot(&self, binding: u32) -> Option<(&ResolvedBindGroupLayoutEntry, u32)> {
        self.inner.values().find_map(|entry| {
            let index = binding.checked_sub(entry.binding)?;
            (index < entry.array_len()).then_some((entry, index))
        })
    }

    /// Iterator over all the binding indices in this map.
    pub fn indices(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.inner.keys().copied()
    }

    /// Iterator over all the entries in this map.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &ResolvedBindGroupLayoutEntry> + '_ {
        self.inner.values()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: u32) -> bool {
        self.inner.contains_key(&key)
    }

    pub fn entry(
        &mut self,
        key: u32,
    ) -> indexmap::map::Entry<'_, u32, ResolvedBindGroupLayoutEntry> {
        self.inner.entry(key)
    }

    /// Lists every way `self`, the layout a bind group was created with, falls
    /// short of the `expected` layout of a pipeline.
    ///
    /// An empty list means a bind group of layout `self` can be used where
    /// `expected` is required.
    pub(crate) fn compatibility_diff(&self, expected: &Self) -> Vec<String> {
        let mut diff = Vec::new();

        for expected_entry in expected.values() {
            let binding = expected_entry.binding;
            let Some(assigned) = self.get(binding) else {
                diff.push(format!(
                    "Binding {binding} is required by the pipeline layout but missing from the bind group layout"
                ));
                continue;
            };
            if !assigned.visibility.contains(expected_entry.visibility) {
                diff.push(format!(
                    "Binding {binding} is visible to {:?} in the bind group layout but the pipeline layout requires {:?}",
                    assigned.visibility, expected_entry.visibility
                ));
            }
            if !binding_model::binding_types_compatible(&assigned.ty, &expected_entry.ty) {
                diff.push(format!(
                    "Binding {binding} has type {:?} in the bind group layout but the pipeline layout expects {:?}",
                    assigned.ty, expected_entry.ty
                ));
            }
            if assigned.array_len() < expected_entry.array_len()
                || (assigned.array_len() > 1 && expected_entry.count.is_none())
            {
                diff.push(format!(
                    "Binding {binding} has {} array elements in the bind group layout but the pipeline layout expects {:?}",
                    assigned.array_len(),
                    expected_entry.count
                ));
            }
            if assigned.static_sampler != expected_entry.static_sampler {
                diff.push(format!(
                    "Binding {binding} static sampler mismatch: bind group layout {}, pipeline layout {}",
                    assigned.static_sampler, expected_entry.static_sampler
                ));
            }
        }

        for binding in self.indices() {
            if !expected.contains_key(binding) {
                diff.push(format!(
                    "Binding {binding} is declared by the bind group layout but not by the pipeline layout"
                ));
            }
        }

        diff
    }
}

use std::sync::Arc;

use thiserror::Error;

use crate::{
    binding_model::{BindGroup, LateMinBufferBindingSizeMismatch, PipelineLayout},
    pipeline::LateSizedBufferGroup,
    resource::{Labeled, ResourceErrorIdent},
};

mod compat {
    use std::sync::Arc;

    use crate::binding_model::BindGroupLayout;

    /// Layout compatibility as seen by the binder.
    pub(crate) trait Compatible {
        /// Every way `self` fails to satisfy `expected`. Empty when compatible.
        fn diff(&self, expected: &Self) -> Vec<String>;
    }

    impl Compatible for Arc<BindGroupLayout> {
        fn diff(&self, expected: &Self) -> Vec<String> {
            self.compatibility_diff(expected)
        }
    }

    #[derive(Debug)]
    struct Entry<T> {
        assigned: Option<T>,
        expected: Option<T>,
    }

    impl<T> Default for Entry<T> {
        fn default() -> Self {
            Entry {
                assigned: None,
                expected: None,
            }
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    pub(crate) enum EntryError {
        Missing,
        Incompatible(Vec<String>),
    }

    impl<T: Compatible> Entry<T> {
        fn check(&self) -> Result<(), EntryError> {
            match (&self.assigned, &self.expected) {
                (_, None) => Ok(()),
                (None, Some(_)) => Err(EntryError::Missing),
                (Some(assigned), Some(expected)) => {
                    let diff = assigned.diff(expected);
                    if diff.is_empty() {
                        Ok(())
                    } else {
                        Err(EntryError::Incompatible(diff))
                    }
                }
            }
        }
    }

    #[derive(Debug)]
    pub(crate) struct Manager<T> {
        entries: [Entry<T>; wgt::MAX_BIND_GROUPS],
    }

    impl<T: Compatible> Manager<T> {
        pub fn new() -> Self {
            Manager {
                entries: Default::default(),
            }
        }

        /// Replaces the layouts the current pipeline expects. Slots past the
        /// end of `expectations` accept anything.
        pub fn update_expectations(&mut self, expectations: impl IntoIterator<Item = Option<T>>) {
            let mut expectations = expectations.into_iter();
            for entry in self.entries.iter_mut() {
                entry.expected = expectations.next().flatten();
            }
        }

        pub fn assign(&mut self, index: usize, value: T) {
            self.entries[index].assigned = Some(value);
        }

        /// Returns the first slot that does not satisfy its expectation.
        pub fn check_compatibility(&self) -> Result<(), (usize, EntryError)> {
            for (index, entry) in self.entries.iter().enumerate() {
                entry.check().map_err(|e| (index, e))?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_compatibility() {
        impl Compatible for i32 {
            fn diff(&self, expected: &Self) -> Vec<String> {
                if self == expected {
                    Vec::new()
                } else {
                    vec![format!("{self} != {expected}")]
                }
            }
        }

        let mut man = Manager::<i32>::new();
        // nothing expected, nothing bound
        assert_eq!(man.check_compatibility(), Ok(()));

        man.update_expectations([Some(3), None, Some(4)]);
        assert_eq!(man.check_compatibility(), Err((0, EntryError::Missing)));

        man.assign(0, 3);
        assert_eq!(man.check_compatibility(), Err((2, EntryError::Missing)));

        // the empty slot accepts anything
        man.assign(1, 7);
        man.assign(2, 5);
        assert_eq!(
            man.check_compatibility(),
            Err((2, EntryError::Incompatible(vec!["5 != 4".to_string()])))
        );

        man.assign(2, 4);
        assert_eq!(man.check_compatibility(), Ok(()));

        // a shorter layout drops trailing expectations
        man.update_expectations([Some(3)]);
        man.assign(2, 9);
        assert_eq!(man.check_compatibility(), Ok(()));
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum BinderError {
    #[error("The pipeline layout, associated with the current {pipeline}, expects a bind group at index {index}, but none was set")]
    MissingBindGroup {
        index: usize,
        pipeline: ResourceErrorIdent,
    },
    #[error("The {bind_group} set at index {index} is incompatible with the pipeline layout of the current {pipeline}:\n{}", diff.join("\n"))]
    IncompatibleBindGroup {
        index: usize,
        pipeline: ResourceErrorIdent,
        bind_group: ResourceErrorIdent,
        diff: Vec<String>,
    },
}

/// Bind groups set on a pass, against the layout of the current pipeline.
#[derive(Debug)]
pub(super) struct Binder {
    pipeline_layout: Option<Arc<PipelineLayout>>,
    manager: compat::Manager<Arc<crate::binding_model::BindGroupLayout>>,
    payloads: [Option<Arc<BindGroup>>; wgt::MAX_BIND_GROUPS],
}

impl Binder {
    pub(super) fn new() -> Self {
        Binder {
            pipeline_layout: None,
            manager: compat::Manager::new(),
            payloads: Default::default(),
        }
    }

    pub(super) fn reset(&mut self) {
        self.pipeline_layout = None;
        self.manager = compat::Manager::new();
        for payload in self.payloads.iter_mut() {
            *payload = None;
        }
    }

    pub(super) fn change_pipeline_layout(&mut self, new: &Arc<PipelineLayout>) {
        if let Some(ref old) = self.pipeline_layout {
            if Arc::ptr_eq(old, new) {
                return;
            }
        }
        self.pipeline_layout = Some(new.clone());
        self.manager.update_expectations(
            (0..new.bind_group_layouts.len()).map(|index| new.group_layout(index).cloned()),
        );
    }

    pub(super) fn assign_group(&mut self, index: usize, bind_group: &Arc<BindGroup>) {
        log::trace!("\tBinding [{index}] = {}", bind_group.error_ident());
        self.payloads[index] = Some(bind_group.clone());
        self.manager.assign(index, bind_group.layout.clone());
    }

    /// Every bind group currently set, whether or not the pipeline reads it.
    pub(super) fn bound_groups(&self) -> impl Iterator<Item = &Arc<BindGroup>> + '_ {
        self.payloads.iter().flatten()
    }

    pub(super) fn check_compatibility<T: Labeled>(&self, pipeline: &T) -> Result<(), BinderError> {
        self.manager
            .check_compatibility()
            .map_err(|(index, error)| match error {
                compat::EntryError::Missing => BinderError::MissingBindGroup {
                    index,
                    pipeline: pipeline.error_ident(),
                },
                compat::EntryError::Incompatible(diff) => BinderError::IncompatibleBindGroup {
                    index,
                    pipeline: pipeline.error_ident(),
                    bind_group: self.payloads[index]
                        .as_ref()
                        .map(|group| group.error_ident())
                        .unwrap_or_else(|| pipeline.error_ident()),
                    diff,
                },
            })
    }

    /// Checks buffers bound without a layout `min_binding_size` against the
    /// sizes the pipeline's shaders need.
    pub(super) fn check_late_buffer_bindings(
        &self,
        late_sized_groups: &[LateSizedBufferGroup],
    ) -> Result<(), LateMinBufferBindingSizeMismatch> {
        for (group_index, late) in late_sized_groups.iter().enumerate() {
            let Some(group) = self.payloads[group_index].as_ref() else {
                continue;
            };
            for &(binding, shader_size) in late.shader_sizes.iter() {
                let Some(bound_size) = group.late_buffer_binding_sizes.get(&binding) else {
                    continue;
                };
                if bound_size.get() < shader_size {
                    return Err(LateMinBufferBindingSizeMismatch {
                        group_index: group_index as u32,
                        binding,
                        shader_size,
                        bound_size: bound_size.get(),
                    });
                }
            }
        }
        Ok(())
    }
}

//! Texture Trackers
//!
//! Texture state is tracked per mip level and per aspect plane. Within a
//! plane, array layers that share a usage are stored as one range, so the
//! common case of a whole-texture use costs a single entry per plane.
//!
//! Combined depth-stencil formats have two planes (depth then stencil), so a
//! read-only depth attachment and a stencil write can share a layer.

use super::{layers::LayerUsages, ResourceMetadata, TextureUses, UsageConflict};
use crate::resource::{FormatAspects, Labeled, Texture, TextureView, Trackable};

use arrayvec::ArrayVec;

use std::{ops::Range, sync::Arc};

/// Specifies a particular set of subresources in a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSelector {
    pub mips: Range<u32>,
    pub layers: Range<u32>,
}

type PlaneStates = LayerUsages<TextureUses>;

/// Usage of every subresource of one texture within a scope.
#[derive(Clone, Debug)]
struct TextureState {
    mips: ArrayVec<ArrayVec<PlaneStates, 2>, { wgt::MAX_MIP_LEVELS as usize }>,
}

impl TextureState {
    fn new(texture: &Texture) -> Self {
        let plane_count = plane_count(texture.format_aspects);
        let layers = texture.full_range.layers.clone();
        let mips = texture
            .full_range
            .mips
            .clone()
            .take(wgt::MAX_MIP_LEVELS as usize)
            .map(|_| {
                (0..plane_count)
                    .map(|_| PlaneStates::new(layers.clone(), TextureUses::empty()))
                    .collect()
            })
            .collect();
        Self { mips }
    }
}

fn plane_count(texture_aspects: FormatAspects) -> usize {
    if texture_aspects == FormatAspects::DEPTH_STENCIL {
        2
    } else {
        1
    }
}

/// Planes of a texture with aspects `texture_aspects` that `selected` touches.
fn selected_planes(
    texture_aspects: FormatAspects,
    selected: FormatAspects,
) -> ArrayVec<usize, 2> {
    let mut planes = ArrayVec::new();
    if texture_aspects == FormatAspects::DEPTH_STENCIL {
        if selected.contains(FormatAspects::DEPTH) {
            planes.push(0);
        }
        if selected.contains(FormatAspects::STENCIL) {
            planes.push(1);
        }
    } else if !selected.is_empty() {
        planes.push(0);
    }
    planes
}

/// Stores all the texture views that a bind group stores.
#[derive(Debug, Default)]
pub(crate) struct TextureBindGroupState {
    views: Vec<(Arc<TextureView>, TextureUses)>,
}

impl TextureBindGroupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a list of all views tracked. May contain duplicates.
    pub fn used_views(&self) -> impl Iterator<Item = &Arc<TextureView>> + '_ {
        self.views.iter().map(|(view, _)| view)
    }

    /// Adds the given view with the given usage.
    pub fn insert_single(&mut self, view: Arc<TextureView>, usage: TextureUses) {
        self.views.push((view, usage));
    }
}

/// Container for corresponding simple and complex texture states.
#[derive(Debug)]
pub(crate) struct TextureUsageScope {
    set: Vec<Option<TextureState>>,
    metadata: ResourceMetadata<Arc<Texture>>,
}

impl TextureUsageScope {
    pub fn new() -> Self {
        Self {
            set: Vec::new(),
            metadata: ResourceMetadata::new(),
        }
    }

    /// Returns true if the scope uses no texture.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Returns a list of all textures tracked.
    pub fn used_resources(&self) -> impl Iterator<Item = Arc<Texture>> + '_ {
        self.metadata.owned_resources()
    }

    fn state_mut(&mut self, texture: &Arc<Texture>) -> &mut TextureState {
        let index = texture.tracker_index().as_usize();
        if index >= self.set.len() {
            self.set.resize_with(index + 1, || None);
        }
        if !self.metadata.contains(index) {
            self.metadata.insert(index, texture.clone());
            self.set[index] = None;
        }
        self.set[index].get_or_insert_with(|| TextureState::new(texture))
    }

    /// Merge `new_state` into the given layers of one plane of one mip.
    fn merge_plane(
        &mut self,
        texture: &Arc<Texture>,
        mip: u32,
        plane: usize,
        layers: &Range<u32>,
        new_state: TextureUses,
    ) -> Result<(), UsageConflict> {
        let state = self.state_mut(texture);
        let Some(plane_states) = state
            .mips
            .get_mut(mip as usize)
            .and_then(|planes| planes.get_mut(plane))
        else {
            return Ok(());
        };

        plane_states
            .merge(layers, new_state)
            .map_err(|(layers, current_state)| {
                UsageConflict::from_texture(
                    texture.error_ident(),
                    TextureSelector {
                        mips: mip..mip + 1,
                        layers,
                    },
                    current_state,
                    new_state,
                )
            })
    }

    /// Merge a single state into the UsageScope.
    ///
    /// If the resulting state is invalid, returns a usage
    /// conflict with the details of the invalid state.
    pub fn merge_single(
        &mut self,
        texture: &Arc<Texture>,
        selector: &TextureSelector,
        aspects: FormatAspects,
        new_state: TextureUses,
    ) -> Result<(), UsageConflict> {
        log::trace!(
            "\ttex {}: merge {selector:?} {aspects:?} + {new_state:?}",
            texture.tracker_index().as_usize()
        );
        for mip in selector.mips.clone() {
            for plane in selected_planes(texture.format_aspects, aspects) {
                self.merge_plane(texture, mip, plane, &selector.layers, new_state)?;
            }
        }

        Ok(())
    }

    /// Merge the subresources a view selects.
    pub fn merge_view(
        &mut self,
        view: &Arc<TextureView>,
        new_state: TextureUses,
    ) -> Result<(), UsageConflict> {
        self.merge_single(&view.parent, &view.selector, view.format_aspects, new_state)
    }

    /// Merge every view of a bind group into the scope.
    pub fn merge_bind_group(&mut self, bind_group: &TextureBindGroupState) -> Result<(), UsageConflict> {
        for &(ref view, usage) in bind_group.views.iter() {
            self.merge_view(view, usage)?;
        }

        Ok(())
    }

    /// Merge the states of another usage scope into this one.
    pub fn merge_usage_scope(&mut self, scope: &Self) -> Result<(), UsageConflict> {
        for index in scope.metadata.owned_indices() {
            let (Some(texture), Some(Some(state))) =
                (scope.metadata.get_resource(index), scope.set.get(index))
            else {
                continue;
            };
            for (mip, planes) in state.mips.iter().enumerate() {
                for (plane, plane_states) in planes.iter().enumerate() {
                    for &(ref layers, usage) in plane_states.iter() {
                        if usage.is_empty() {
                            continue;
                        }
                        self.merge_plane(texture, mip as u32, plane, layers, usage)?;
                    }
                }
            }
        }

        Ok(())
    }
}

use std::ops::Range;

use smallvec::SmallVec;

use super::{invalid_resource_state, ResourceUses};

/// Usage of every array layer of one texture plane.
///
/// Neighbouring layers with the same usage share a run, so a plane used as a
/// whole costs a single entry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LayerUsages<U> {
    /// Ordered, non-empty, adjacent runs covering every layer.
    runs: SmallVec<[(Range<u32>, U); 1]>,
}

impl<U: ResourceUses> LayerUsages<U> {
    pub fn new(layers: Range<u32>, unused: U) -> Self {
        let mut runs = SmallVec::new();
        if !layers.is_empty() {
            runs.push((layers, unused));
        }
        Self { runs }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Range<u32>, U)> + '_ {
        self.runs.iter()
    }

    /// Makes `layer` the first layer of a run.
    fn split_at(&mut self, layer: u32) {
        let Some(pos) = self
            .runs
            .iter()
            .position(|(range, _)| range.start < layer && layer < range.end)
        else {
            return;
        };
        let (range, usage) = self.runs[pos].clone();
        self.runs[pos].0.end = layer;
        self.runs.insert(pos + 1, (layer..range.end, usage));
    }

    fn coalesce(&mut self) {
        let mut runs = SmallVec::<[(Range<u32>, U); 1]>::with_capacity(self.runs.len());
        for (range, usage) in self.runs.drain(..) {
            match runs.last_mut() {
                Some((last, last_usage)) if last.end == range.start && *last_usage == usage => {
                    last.end = range.end;
                }
                _ => runs.push((range, usage)),
            }
        }
        self.runs = runs;
    }

    /// Adds `usage` to every layer in `layers`.
    ///
    /// On failure, returns the first run the usage can't join, along with the
    /// usage that run already had. Layers past the plane are ignored.
    pub fn merge(&mut self, layers: &Range<u32>, usage: U) -> Result<(), (Range<u32>, U)> {
        self.split_at(layers.start);
        self.split_at(layers.end);

        for (range, current) in self.runs.iter_mut() {
            if range.end <= layers.start || range.start >= layers.end {
                continue;
            }
            let merged = *current | usage;
            if invalid_resource_state(merged) {
                return Err((range.clone(), *current));
            }
            *current = merged;
        }

        self.coalesce();
        Ok(())
    }
}

/*! This library validates the usage of resources in a WebGPU-style API.
 *  It never talks to a GPU: every entry point takes descriptors or recorded
 *  commands and decides whether they are well-formed, reporting failures
 *  through returned errors and through the device error sink.
 */

#![allow(
    // Labeled blocks double as early exits from creation entry points.
    clippy::never_loop,
    // Registries are built with `new`, never defaulted.
    clippy::new_without_default,
    clippy::too_many_arguments,
    // Error enums carry whole resource idents.
    clippy::result_large_err,
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_qualifications,
)]
#![forbid(unsafe_code)]

#[macro_use]
mod macros {
    #[cfg(feature = "api_log_info")]
    macro_rules! api_log {
        ($($arg:tt)+) => (log::info!($($arg)+))
    }
    #[cfg(not(feature = "api_log_info"))]
    macro_rules! api_log {
        ($($arg:tt)+) => (log::trace!($($arg)+))
    }

    #[cfg(feature = "resource_log_info")]
    macro_rules! resource_log {
        ($($arg:tt)+) => (log::info!($($arg)+))
    }
    #[cfg(not(feature = "resource_log_info"))]
    macro_rules! resource_log {
        ($($arg:tt)+) => (log::trace!($($arg)+))
    }
}

pub mod binding_model;
pub mod command;
mod conv;
pub mod device;
pub mod error;
pub mod global;
pub mod hub;
pub mod id;
pub mod identity;
pub mod pipeline;
mod registry;
pub mod resource;
mod storage;
mod track;
pub mod validation;

pub use wgt::{MAX_BIND_GROUPS, MAX_COLOR_ATTACHMENTS, MAX_VERTEX_BUFFERS};

use std::borrow::Cow;

type Index = u32;
type Epoch = u32;

pub type Label<'a> = Option<Cow<'a, str>>;

trait LabelHelpers<'a> {
    fn to_string(&self) -> String;
}
impl<'a> LabelHelpers<'a> for Label<'a> {
    fn to_string(&self) -> String {
        self.as_ref().map(|cow| cow.to_string()).unwrap_or_default()
    }
}

type FxBuild = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
type FastHashSet<K> = rustc_hash::FxHashSet<K>;
/// Keeps insertion order, for maps whose iteration order shows up in errors.
type FastIndexMap<K, V> = indexmap::IndexMap<K, V, FxBuild>;

mod bind_groups;
mod buffer;
mod debug_groups;
mod encoder;
mod error_scopes;
mod indirect;
mod render_bundles;
mod resource_usage;
mod texture;
mod vertex_state;

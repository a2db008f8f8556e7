use crate::{
    resource,
    track::{BufferUses, TextureUses},
};

pub fn is_power_of_two_u16(val: u16) -> bool {
    val != 0 && (val & (val - 1)) == 0
}

pub fn is_power_of_two_u32(val: u32) -> bool {
    val != 0 && (val & (val - 1)) == 0
}

/// Sample counts a texture or pipeline may use.
pub fn is_valid_sample_count(count: u32) -> bool {
    count == 1 || count == 4
}

pub fn map_binding_buffer_uses(ty: wgt::BufferBindingType) -> BufferUses {
    match ty {
        wgt::BufferBindingType::Uniform => BufferUses::UNIFORM,
        wgt::BufferBindingType::Storage { read_only: true } => BufferUses::STORAGE_READ_ONLY,
        wgt::BufferBindingType::Storage { read_only: false } => BufferUses::STORAGE_READ_WRITE,
    }
}

pub fn map_storage_texture_uses(access: wgt::StorageTextureAccess) -> TextureUses {
    match access {
        wgt::StorageTextureAccess::ReadOnly => TextureUses::STORAGE_READ_ONLY,
        wgt::StorageTextureAccess::WriteOnly => TextureUses::STORAGE_WRITE_ONLY,
        wgt::StorageTextureAccess::ReadWrite => TextureUses::STORAGE_READ_WRITE,
    }
}

pub fn check_texture_dimension_size(
    dimension: wgt::TextureDimension,
    wgt::Extent3d {
        width,
        height,
        depth_or_array_layers,
    }: wgt::Extent3d,
    sample_size: u32,
    limits: &wgt::Limits,
) -> Result<(), resource::TextureDimensionError> {
    use resource::{TextureDimensionError as Tde, TextureErrorDimension as Ted};
    use wgt::TextureDimension::*;

    let (extent_limits, sample_limit) = match dimension {
        D1 => ([limits.max_texture_dimension_1d, 1, 1], 1),
        D2 => (
            [
                limits.max_texture_dimension_2d,
                limits.max_texture_dimension_2d,
                limits.max_texture_array_layers,
            ],
            4,
        ),
        D3 => (
            [
                limits.max_texture_dimension_3d,
                limits.max_texture_dimension_3d,
                limits.max_texture_dimension_3d,
            ],
            1,
        ),
    };

    for (&dim, (&given, &limit)) in [Ted::X, Ted::Y, Ted::Z].iter().zip(
        [width, height, depth_or_array_layers]
            .iter()
            .zip(extent_limits.iter()),
    ) {
        if given == 0 {
            return Err(Tde::Zero(dim));
        }
        if given > limit {
            return Err(Tde::LimitExceeded { dim, given, limit });
        }
    }
    if !is_valid_sample_count(sample_size) || sample_size > sample_limit {
        return Err(Tde::InvalidSampleCount(sample_size));
    }

    Ok(())
}

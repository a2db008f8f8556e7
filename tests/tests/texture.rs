use wgt::{TextureFormat as Tf, TextureUsages as Tu};
use wgv_test::{fail, fail_if, valid, TestParameters, TestingContext};

fn descriptor(format: Tf, usage: Tu) -> wgt::TextureDescriptor<wgc::Label<'static>> {
    wgt::TextureDescriptor {
        label: None,
        size: wgt::Extent3d {
            width: 16,
            height: 16,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgt::TextureDimension::D2,
        format,
        usage,
    }
}

fn create(ctx: &TestingContext, desc: &wgt::TextureDescriptor<wgc::Label>) -> wgc::id::TextureId {
    let (texture, _) = ctx.global.device_create_texture(ctx.device, desc);
    texture
}

#[test]
fn texture_usage_and_size() {
    let ctx = TestingContext::new(TestParameters::default());
    let base = descriptor(Tf::Rgba8Unorm, Tu::TEXTURE_BINDING);

    valid(&ctx, || create(&ctx, &base));
    fail(
        &ctx,
        || create(&ctx, &descriptor(Tf::Rgba8Unorm, Tu::empty())),
        Some("Invalid usage flags"),
    );

    let mut zero = base.clone();
    zero.size.height = 0;
    fail(&ctx, || create(&ctx, &zero), Some("is zero"));

    let mut too_wide = base.clone();
    too_wide.size.width = ctx.device_limits.max_texture_dimension_2d + 1;
    fail(&ctx, || create(&ctx, &too_wide), Some("exceeds the limit"));

    let mut one_d = base.clone();
    one_d.dimension = wgt::TextureDimension::D1;
    one_d.size.height = 1;
    valid(&ctx, || create(&ctx, &one_d));
}

#[test]
fn mip_level_count() {
    let ctx = TestingContext::new(TestParameters::default());

    // 16x16 has five levels down to 1x1.
    for (mips, should_fail) in [(1, false), (5, false), (0, true), (6, true)] {
        let mut desc = descriptor(Tf::Rgba8Unorm, Tu::TEXTURE_BINDING);
        desc.mip_level_count = mips;
        fail_if(
            &ctx,
            should_fail,
            || create(&ctx, &desc),
            Some("mip level count"),
        );
    }
}

#[test]
fn multisampled_textures() {
    let ctx = TestingContext::new(TestParameters::default());
    let multisampled = |format, usage| {
        let mut desc = descriptor(format, usage);
        desc.sample_count = 4;
        desc
    };

    valid(&ctx, || {
        create(&ctx, &multisampled(Tf::Rgba8Unorm, Tu::RENDER_ATTACHMENT))
    });
    fail(
        &ctx,
        || create(&ctx, &multisampled(Tf::Rgba8Unorm, Tu::TEXTURE_BINDING)),
        Some("must have RENDER_ATTACHMENT usage"),
    );
    fail(
        &ctx,
        || {
            create(
                &ctx,
                &multisampled(Tf::Rgba8Unorm, Tu::RENDER_ATTACHMENT | Tu::STORAGE_BINDING),
            )
        },
        Some("not allowed for multisampled textures"),
    );
    fail(
        &ctx,
        || create(&ctx, &multisampled(Tf::Rgba32Float, Tu::RENDER_ATTACHMENT)),
        Some("does not support multisampling"),
    );

    let mut layered = multisampled(Tf::Rgba8Unorm, Tu::RENDER_ATTACHMENT);
    layered.size.depth_or_array_layers = 2;
    fail(&ctx, || create(&ctx, &layered), Some("must be 1, got 2"));

    let mut mipped = multisampled(Tf::Rgba8Unorm, Tu::RENDER_ATTACHMENT);
    mipped.mip_level_count = 2;
    fail(&ctx, || create(&ctx, &mipped), Some("maximum allowed is 1"));

    let mut odd = multisampled(Tf::Rgba8Unorm, Tu::RENDER_ATTACHMENT);
    odd.sample_count = 3;
    fail(&ctx, || create(&ctx, &odd), Some("Sample count 3 is invalid"));
}

#[test]
fn format_usages() {
    let ctx = TestingContext::new(TestParameters::default());

    valid(&ctx, || {
        create(&ctx, &descriptor(Tf::R32Float, Tu::STORAGE_BINDING))
    });
    fail(
        &ctx,
        || create(&ctx, &descriptor(Tf::Bgra8Unorm, Tu::STORAGE_BINDING)),
        Some("are not allowed on a texture of type"),
    );

    let mut depth_3d = descriptor(Tf::Depth24Plus, Tu::TEXTURE_BINDING);
    depth_3d.dimension = wgt::TextureDimension::D3;
    fail(&ctx, || create(&ctx, &depth_3d), Some("Depth texture"));

    let mut render_3d = descriptor(Tf::Rgba8Unorm, Tu::RENDER_ATTACHMENT);
    render_3d.dimension = wgt::TextureDimension::D3;
    fail(
        &ctx,
        || create(&ctx, &render_3d),
        Some("not allowed on a texture of dimensions"),
    );
}

#[test]
fn compressed_formats() {
    let ctx = TestingContext::new(TestParameters::default());
    fail(
        &ctx,
        || create(&ctx, &descriptor(Tf::Bc1RgbaUnorm, Tu::TEXTURE_BINDING)),
        Some("TEXTURE_COMPRESSION_BC"),
    );

    let ctx = TestingContext::new(
        TestParameters::default().features(wgt::Features::TEXTURE_COMPRESSION_BC),
    );
    valid(&ctx, || {
        create(&ctx, &descriptor(Tf::Bc1RgbaUnorm, Tu::TEXTURE_BINDING))
    });

    let mut unaligned = descriptor(Tf::Bc1RgbaUnorm, Tu::TEXTURE_BINDING);
    unaligned.size.width = 6;
    fail(
        &ctx,
        || create(&ctx, &unaligned),
        Some("is not a multiple of Bc1RgbaUnorm's block width"),
    );
}

#[test]
fn view_ranges() {
    let ctx = TestingContext::new(TestParameters::default());
    let mut desc = descriptor(Tf::Rgba8Unorm, Tu::TEXTURE_BINDING);
    desc.mip_level_count = 3;
    desc.size.depth_or_array_layers = 6;
    let texture = create(&ctx, &desc);

    let view = |dimension, range| {
        let (view, _) = ctx.global.texture_create_view(
            texture,
            &wgc::resource::TextureViewDescriptor {
                label: None,
                format: None,
                dimension,
                range,
            },
        );
        view
    };

    use wgt::{ImageSubresourceRange as Range, TextureViewDimension as Tvd};

    valid(&ctx, || view(None, Range::default()));
    valid(&ctx, || view(Some(Tvd::Cube), Range::default()));
    // The default dimension of a layered texture is an array over the
    // remaining layers.
    valid(&ctx, || {
        view(
            None,
            Range {
                base_array_layer: 2,
                ..Default::default()
            },
        )
    });
    fail(
        &ctx,
        || {
            view(
                Some(Tvd::Cube),
                Range {
                    base_array_layer: 2,
                    ..Default::default()
                },
            )
        },
        Some("Invalid texture depth `4`"),
    );
    valid(&ctx, || {
        view(
            Some(Tvd::D2),
            Range {
                base_mip_level: 2,
                base_array_layer: 5,
                ..Default::default()
            },
        )
    });
    fail(
        &ctx,
        || {
            view(
                None,
                Range {
                    base_mip_level: 1,
                    mip_level_count: Some(3),
                    ..Default::default()
                },
            )
        },
        Some("must be <= Texture mip level count 3"),
    );
    fail(
        &ctx,
        || {
            view(
                None,
                Range {
                    mip_level_count: Some(0),
                    ..Default::default()
                },
            )
        },
        Some("Mip level count is 0"),
    );
    fail(
        &ctx,
        || {
            view(
                Some(Tvd::D2Array),
                Range {
                    base_array_layer: 4,
                    array_layer_count: Some(3),
                    ..Default::default()
                },
            )
        },
        Some("must be <= Texture depth/array layer count 6"),
    );
    fail(
        &ctx,
        || {
            view(
                Some(Tvd::D2),
                Range {
                    array_layer_count: Some(2),
                    ..Default::default()
                },
            )
        },
        Some("is not valid for the target view dimension"),
    );
    fail(&ctx, || view(Some(Tvd::D3), Range::default()), Some("Invalid texture view dimension"));
}

#[test]
fn view_aspects_and_formats() {
    let ctx = TestingContext::new(TestParameters::default());
    let color = ctx.create_texture(Tf::Rgba8Unorm, Tu::TEXTURE_BINDING, 4, 4);
    let depth_stencil = ctx.create_texture(Tf::Depth24PlusStencil8, Tu::TEXTURE_BINDING, 4, 4);

    let view = |texture, format, aspect| {
        let (view, _) = ctx.global.texture_create_view(
            texture,
            &wgc::resource::TextureViewDescriptor {
                label: None,
                format,
                dimension: None,
                range: wgt::ImageSubresourceRange {
                    aspect,
                    ..Default::default()
                },
            },
        );
        view
    };

    valid(&ctx, || view(depth_stencil, None, wgt::TextureAspect::DepthOnly));
    valid(&ctx, || view(depth_stencil, None, wgt::TextureAspect::StencilOnly));
    fail(
        &ctx,
        || view(color, None, wgt::TextureAspect::DepthOnly),
        Some("is not in the source texture format"),
    );
    fail(
        &ctx,
        || view(color, Some(Tf::Rgba8UnormSrgb), wgt::TextureAspect::All),
        Some("Unable to view texture"),
    );
}

#[test]
fn view_of_destroyed_texture() {
    let ctx = TestingContext::new(TestParameters::default());
    let texture = ctx.create_texture(Tf::Rgba8Unorm, Tu::TEXTURE_BINDING, 4, 4);
    ctx.global.texture_destroy(texture);

    fail(&ctx, || ctx.create_view(texture), Some("has been destroyed"));
}

// ============================================================================
// WGSL SHADERS
// ============================================================================

/// 4×5 color matrix over straight-alpha RGBA.
///
/// `rows[i]` holds the RGBA coefficients of output channel `i`; `offset`
/// holds the translation column in normalized units.  The rgba8unorm store
/// clamps and rounds.
pub const COLOR_MATRIX_SHADER: &str = r#"
struct MatrixParams {
    width:  u32,
    height: u32,
    _pad0:  u32,
    _pad1:  u32,
    rows:   array<vec4<f32>, 4>,
    offset: vec4<f32>,
};

@group(0) @binding(0) var input_tex:  texture_2d<f32>;
@group(0) @binding(1) var output_tex: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2) var<uniform> params: MatrixParams;

@compute @workgroup_size(16, 16)
fn cs_color_matrix(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.width || gid.y >= params.height) { return; }

    let px = textureLoad(input_tex, vec2<u32>(gid.x, gid.y), 0);
    let color = vec4<f32>(
        dot(params.rows[0], px) + params.offset.x,
        dot(params.rows[1], px) + params.offset.y,
        dot(params.rows[2], px) + params.offset.z,
        dot(params.rows[3], px) + params.offset.w,
    );
    textureStore(output_tex, vec2<u32>(gid.x, gid.y), clamp(color, vec4<f32>(0.0), vec4<f32>(1.0)));
}
"#;

// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! End-to-end pipeline scenarios: whole frames through the public API, with
//! literal pixel expectations.

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec4;

use rastra_common::{FrontFace, PixelFormat, PsInput, PsOutput, VertexAttributes, VsInput};
use rastra_render::shader::{
    DepthOnlyPixelShader, DepthOnlyVertexShader, PixelShader, PixelShaderContext,
    SimpleMeshPixelShader, SimpleMeshVertexShader, SimplePixelShader, SimpleVertexShader,
};
use rastra_render::{Buffer2D, Material, Mesh, RenderContext, Renderer, SubMesh};

const CLEAR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

fn make_context(width: u32, height: u32, msaa: bool) -> RenderContext {
    let mut ctx = RenderContext::new();
    ctx.set_render_target(width, height, 1, msaa).unwrap();
    ctx.set_viewport(0, 0, width, height);
    ctx.begin_frame();
    ctx.clear_render_target(CLEAR);
    ctx.set_shader(Arc::new(SimpleVertexShader), Arc::new(SimplePixelShader));
    ctx
}

fn colored_vertex(x: f32, y: f32, z: f32, color: Vec4) -> VsInput {
    let mut attributes = VertexAttributes::new();
    attributes.push(color);
    VsInput {
        position: Vec4::new(x, y, z, 1.0),
        attributes,
    }
}

fn assert_rgba_close(got: [f32; 4], want: [f32; 4], tolerance: f32) {
    for k in 0..4 {
        assert!(
            (got[k] - want[k]).abs() <= tolerance,
            "channel {k}: got {got:?}, want {want:?}"
        );
    }
}

/// Set of pixels whose color differs from the clear color.
fn coverage(buffer: &Buffer2D) -> HashSet<(u32, u32)> {
    let clear = CLEAR.to_array();
    let mut covered = HashSet::new();
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            if buffer.read_rgba(x, y).unwrap() != clear {
                covered.insert((x, y));
            }
        }
    }
    covered
}

// Scenario 1: single triangle, no transform. 600x600, cull CW, identity mvp.
// The red corner (-0.5, -0.5) lands at screen (150, 450), green at
// (150, 150), blue at (450, 150); corner-adjacent interior pixels carry the
// corner color to within a couple of 8-bit steps.
#[test]
fn test_single_triangle_no_transform() {
    let mut ctx = make_context(600, 600, false);

    let v0 = colored_vertex(-0.5, -0.5, 1.0, Vec4::new(1.0, 0.0, 0.0, 1.0));
    let v1 = colored_vertex(-0.5, 0.5, 1.0, Vec4::new(0.0, 1.0, 0.0, 1.0));
    let v2 = colored_vertex(0.5, 0.5, 1.0, Vec4::new(0.0, 0.0, 1.0, 1.0));
    Renderer::draw_triangle(&ctx, &v0, &v1, &v2);
    ctx.end_frame();

    let color = ctx.color_buffer(0).unwrap();
    let tol = 3.0 / 255.0;
    assert_rgba_close(
        color.read_rgba(150, 448).unwrap(),
        [1.0, 0.0, 0.0, 1.0],
        tol,
    );
    assert_rgba_close(
        color.read_rgba(150, 151).unwrap(),
        [0.0, 1.0, 0.0, 1.0],
        tol,
    );
    assert_rgba_close(
        color.read_rgba(447, 151).unwrap(),
        [0.0, 0.0, 1.0, 1.0],
        tol,
    );
    // Far corner untouched by the draw.
    assert_eq!(color.read_rgba(0, 0).unwrap(), CLEAR.to_array());
}

// Scenario 2: the same triangle with reversed winding is back-face culled.
#[test]
fn test_back_face_cull() {
    let mut ctx = make_context(600, 600, false);
    assert_eq!(ctx.viewport().width(), 600.0);

    let v0 = colored_vertex(-0.5, -0.5, 1.0, Vec4::ONE);
    let v1 = colored_vertex(-0.5, 0.5, 1.0, Vec4::ONE);
    let v2 = colored_vertex(0.5, 0.5, 1.0, Vec4::ONE);
    // Reversed order flips the screen winding.
    Renderer::draw_triangle(&ctx, &v2, &v1, &v0);
    ctx.end_frame();

    assert!(coverage(ctx.color_buffer(0).unwrap()).is_empty());
    assert_eq!(ctx.stats().culled_triangles, 1);
    assert_eq!(ctx.stats().pixels_shaded, 0);
}

// Culling is relative to the configured front face.
#[test]
fn test_cull_mode_ccw_flips_acceptance() {
    let mut ctx = make_context(600, 600, false);
    ctx.set_cull_face(FrontFace::Ccw);

    let v0 = colored_vertex(-0.5, -0.5, 1.0, Vec4::ONE);
    let v1 = colored_vertex(-0.5, 0.5, 1.0, Vec4::ONE);
    let v2 = colored_vertex(0.5, 0.5, 1.0, Vec4::ONE);
    // The winding that renders under CW is culled under CCW and vice versa.
    Renderer::draw_triangle(&ctx, &v0, &v1, &v2);
    assert_eq!(ctx.stats().culled_triangles, 1);
    Renderer::draw_triangle(&ctx, &v2, &v1, &v0);
    ctx.end_frame();
    assert!(!coverage(ctx.color_buffer(0).unwrap()).is_empty());
}

// Scenario 3: depth ordering. A at depth 0.5 (red) then B at depth 0.2
// (green) over the same footprint: green wins everywhere and the depth
// buffer holds 0.2.
#[test]
fn test_depth_ordering() {
    let mut ctx = make_context(600, 600, false);

    // NDC z maps to depth (z + 1) / 2: z = 0 -> 0.5, z = -0.6 -> 0.2.
    let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let green = Vec4::new(0.0, 1.0, 0.0, 1.0);
    let tri = |z: f32, c: Vec4| {
        [
            colored_vertex(-0.5, -0.5, z, c),
            colored_vertex(-0.5, 0.5, z, c),
            colored_vertex(0.5, 0.5, z, c),
        ]
    };

    let a = tri(0.0, red);
    Renderer::draw_triangle(&ctx, &a[0], &a[1], &a[2]);
    let b = tri(-0.6, green);
    Renderer::draw_triangle(&ctx, &b[0], &b[1], &b[2]);
    // Behind both: must not show through.
    let c = tri(0.4, red);
    Renderer::draw_triangle(&ctx, &c[0], &c[1], &c[2]);
    ctx.end_frame();

    let color = ctx.color_buffer(0).unwrap();
    let depth = ctx.depth_buffer().unwrap();
    for &(x, y) in &[(250u32, 250u32), (200, 300), (160, 420)] {
        assert_rgba_close(color.read_rgba(x, y).unwrap(), [0.0, 1.0, 0.0, 1.0], 1.0 / 255.0);
        let d = depth.read_scalar(x, y).unwrap();
        assert!((d - 0.2).abs() < 1e-6, "depth at ({x},{y}) = {d}");
    }
}

/// Writes the interpolated slot-0 attribute out as a color, for float-exact
/// attribute inspection through an RGBA-F32 target.
struct AttributeColorShader;

impl PixelShader for AttributeColorShader {
    fn process(&self, _ctx: &PixelShaderContext, input: &PsInput, output: &mut PsOutput) {
        output.colors[0] = input.attributes.members[0];
    }
}

// Scenario 4: perspective-correct UV. A trapezoid receding from w = 2 to
// w = 6; the quad's 3D midpoint projects to the exact center pixel, where
// the interpolated UV must be (0.5, 0.5) to 1e-4. Screen-linear
// interpolation would give 0.75 there.
#[test]
fn test_perspective_correct_uv() {
    let mut ctx = RenderContext::new();
    // 601 px so NDC (0, 0) falls exactly on the center of pixel (300, 300).
    ctx.set_render_target_with_format(601, 601, 1, false, PixelFormat::RgbaF32)
        .unwrap();
    ctx.set_viewport(0, 0, 601, 601);
    ctx.begin_frame();
    ctx.clear_render_target(CLEAR);
    ctx.set_shader(Arc::new(SimpleVertexShader), Arc::new(AttributeColorShader));

    let vertex = |x: f32, y: f32, w: f32, u: f32, v: f32| {
        let mut attributes = VertexAttributes::new();
        attributes.push(Vec4::new(u, v, 0.0, 0.0));
        VsInput {
            position: Vec4::new(x, y, 0.0, w),
            attributes,
        }
    };

    // A view-space quad spanning z = -2 (bottom) to z = -6 (top), projected
    // with w = -z.
    let a = vertex(-1.0, -1.0, 2.0, 0.0, 0.0);
    let b = vertex(1.0, -1.0, 2.0, 1.0, 0.0);
    let c = vertex(1.0, 1.0, 6.0, 1.0, 1.0);
    let d = vertex(-1.0, 1.0, 6.0, 0.0, 1.0);
    // Clockwise halves sharing the a-c diagonal, which passes through the
    // center pixel.
    Renderer::draw_triangle(&ctx, &a, &d, &c);
    Renderer::draw_triangle(&ctx, &a, &c, &b);
    ctx.end_frame();

    let got = ctx.color_buffer(0).unwrap().read_rgba(300, 300).unwrap();
    assert!((got[0] - 0.5).abs() < 1e-4, "u = {}", got[0]);
    assert!((got[1] - 0.5).abs() < 1e-4, "v = {}", got[1]);
}

// Scenario 5: clipping against the near plane. One vertex behind the near
// plane turns the triangle into a quad; rasterizing it covers exactly the
// pixels of the analytically clipped reference geometry.
#[test]
fn test_near_plane_clip_matches_reference() {
    let white = Vec4::ONE;
    let a = colored_vertex(-0.5, -0.5, 0.0, white);
    let b = colored_vertex(0.5, -0.5, 0.0, white);
    // Behind the near plane: z + w = -1.
    let c = colored_vertex(0.0, 0.5, -2.0, white);

    let mut clipped_ctx = make_context(400, 400, false);
    Renderer::draw_triangle(&clipped_ctx, &a, &c, &b);
    clipped_ctx.end_frame();
    assert_eq!(clipped_ctx.stats().rejected_triangles, 0);

    // The near plane (z + w = 0) splits edges a-c and c-b at t = 0.5; the
    // clipper emits the quad [a, i_ac, i_cb, b] and fans it from a.
    let i_ac = colored_vertex(-0.25, 0.0, -1.0, white);
    let i_cb = colored_vertex(0.25, 0.0, -1.0, white);
    let mut reference_ctx = make_context(400, 400, false);
    Renderer::draw_triangle(&reference_ctx, &a, &i_ac, &i_cb);
    Renderer::draw_triangle(&reference_ctx, &a, &i_cb, &b);
    reference_ctx.end_frame();

    let clipped = coverage(clipped_ctx.color_buffer(0).unwrap());
    let reference = coverage(reference_ctx.color_buffer(0).unwrap());
    assert!(!clipped.is_empty());
    assert_eq!(clipped, reference);
}

// Clipping property: a triangle wholly outside one plane draws nothing.
#[test]
fn test_fully_outside_triangle_rejected() {
    let mut ctx = make_context(100, 100, false);
    let v = |x: f32| colored_vertex(x, 0.0, 0.0, Vec4::ONE);
    // x + w < 0 for every vertex: outside the left plane.
    Renderer::draw_triangle(&ctx, &v(-3.0), &v(-2.0), &v(-4.0));
    ctx.end_frame();

    assert_eq!(ctx.stats().rejected_triangles, 1);
    assert!(coverage(ctx.color_buffer(0).unwrap()).is_empty());
}

// Top-left rule: two triangles sharing the exact same diagonal cover every
// quad pixel exactly once between them.
#[test]
fn test_shared_edge_covered_exactly_once() {
    let white = Vec4::ONE;
    let bl = colored_vertex(-0.5, -0.5, 0.0, white);
    let tl = colored_vertex(-0.5, 0.5, 0.0, white);
    let tr = colored_vertex(0.5, 0.5, 0.0, white);
    let br = colored_vertex(0.5, -0.5, 0.0, white);

    let mut ctx_one = make_context(200, 200, false);
    Renderer::draw_triangle(&ctx_one, &bl, &tl, &tr);
    ctx_one.end_frame();

    let mut ctx_two = make_context(200, 200, false);
    Renderer::draw_triangle(&ctx_two, &bl, &tr, &br);
    ctx_two.end_frame();

    let first = coverage(ctx_one.color_buffer(0).unwrap());
    let second = coverage(ctx_two.color_buffer(0).unwrap());

    // No pixel on the shared diagonal rasterizes twice.
    assert!(first.is_disjoint(&second), "shared edge drawn twice");

    // And together the halves tile the quad: every interior pixel of the
    // screen square [50, 150) x [50, 150) is covered.
    let union: HashSet<_> = first.union(&second).copied().collect();
    for y in 50..150 {
        for x in 50..150 {
            assert!(union.contains(&(x, y)), "gap at ({x},{y})");
        }
    }
    assert_eq!(union.len(), 100 * 100);
}

// Scenario 6: MSAA. A half-covered pixel resolves to the midpoint between
// triangle color and clear color; fully covered pixels resolve to the exact
// shader output with uniform depth.
#[test]
fn test_msaa_edge_resolve() {
    let mut ctx = make_context(600, 600, true);

    // Rectangle from NDC x = -1 to x = 1/600, i.e. screen x = 300.5: a
    // vertical edge through the center of pixel column 300, covering the
    // two left samples of the rotated grid.
    let edge = 1.0 / 600.0;
    let white = Vec4::ONE;
    let r1 = colored_vertex(-1.0, -1.0, 0.0, white);
    let r2 = colored_vertex(edge, -1.0, 0.0, white);
    let r3 = colored_vertex(edge, 1.0, 0.0, white);
    let r4 = colored_vertex(-1.0, 1.0, 0.0, white);
    Renderer::draw_triangle(&ctx, &r1, &r4, &r3);
    Renderer::draw_triangle(&ctx, &r1, &r3, &r2);
    ctx.end_frame();

    let color = ctx.color_buffer(0).unwrap();
    let depth = ctx.depth_buffer().unwrap();

    // Fully covered pixel: resolve equals the shader output, depth is the
    // uniform per-sample depth (z = 0 -> 0.5).
    assert_rgba_close(color.read_rgba(150, 300).unwrap(), [1.0; 4], 1.0 / 255.0);
    assert!((depth.read_scalar(150, 300).unwrap() - 0.5).abs() < 1e-6);

    // Edge pixel: two of four samples covered.
    let quantum = 1.0 / 255.0;
    assert_rgba_close(
        color.read_rgba(300, 300).unwrap(),
        [0.5, 0.5, 0.5, 1.0],
        quantum,
    );
    // Depth averages two written samples with two cleared ones.
    let edge_depth = depth.read_scalar(300, 300).unwrap();
    assert!((edge_depth - 0.75).abs() < 1e-6, "depth = {edge_depth}");

    // Uncovered pixel: untouched clear color and depth.
    assert_eq!(color.read_rgba(450, 300).unwrap(), CLEAR.to_array());
    assert_eq!(depth.read_scalar(450, 300), Some(1.0));
}

// Depth-only pass: depth is written, color targets stay untouched.
#[test]
fn test_depth_only_pass() {
    let mut ctx = make_context(200, 200, false);
    ctx.set_shader(Arc::new(DepthOnlyVertexShader), Arc::new(DepthOnlyPixelShader));

    let v0 = colored_vertex(-0.5, -0.5, 0.0, Vec4::ONE);
    let v1 = colored_vertex(-0.5, 0.5, 0.0, Vec4::ONE);
    let v2 = colored_vertex(0.5, 0.5, 0.0, Vec4::ONE);
    Renderer::draw_triangle(&ctx, &v0, &v1, &v2);
    ctx.end_frame();

    assert!(coverage(ctx.color_buffer(0).unwrap()).is_empty());
    // Interior pixel got depth 0.5.
    let d = ctx.depth_buffer().unwrap().read_scalar(90, 90).unwrap();
    assert!((d - 0.5).abs() < 1e-6, "depth = {d}");
    assert!(ctx.stats().depth_passes > 0);
}

// draw_mesh binds each submesh's material before drawing its range.
#[test]
fn test_draw_mesh_switches_materials() {
    let solid_texture = |rgba: [f32; 4]| {
        let tex = Buffer2D::new(1, 1, PixelFormat::Rgba8).unwrap();
        tex.write_rgba(0, 0, rgba);
        Arc::new(Material::with_diffuse(Arc::new(tex)))
    };

    let vertex = |x: f32, y: f32| {
        let mut attributes = VertexAttributes::new();
        attributes.push(Vec4::new(0.0, 0.0, 1.0, 0.0)); // normal
        attributes.push(Vec4::new(0.5, 0.5, 1.0, 0.0)); // uv
        VsInput {
            position: Vec4::new(x, y, 0.0, 1.0),
            attributes,
        }
    };

    let mesh = Mesh {
        vertices: vec![
            vertex(-0.8, -0.5),
            vertex(-0.8, 0.5),
            vertex(-0.2, 0.5),
            vertex(0.2, -0.5),
            vertex(0.2, 0.5),
            vertex(0.8, 0.5),
        ],
        indices: vec![0, 1, 2, 3, 4, 5],
        materials: vec![
            solid_texture([1.0, 0.0, 0.0, 1.0]),
            solid_texture([0.0, 1.0, 0.0, 1.0]),
        ],
        submeshes: vec![
            SubMesh {
                index_offset: 0,
                index_count: 3,
                material_index: Some(0),
            },
            SubMesh {
                index_offset: 3,
                index_count: 3,
                material_index: Some(1),
            },
        ],
    };
    mesh.validate().unwrap();

    let mut ctx = make_context(200, 200, false);
    ctx.set_shader(
        Arc::new(SimpleMeshVertexShader),
        Arc::new(SimpleMeshPixelShader),
    );
    Renderer::draw_mesh(&mut ctx, &mesh);
    ctx.end_frame();

    let color = ctx.color_buffer(0).unwrap();
    assert_eq!(color.read_rgba(40, 80).unwrap(), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(color.read_rgba(140, 80).unwrap(), [0.0, 1.0, 0.0, 1.0]);
}

// The tile worker path produces the same frame as inline rasterization:
// per-tile FIFO ordering makes the depth race-free and deterministic.
#[test]
fn test_multithreaded_matches_inline() {
    let draw_scene = |ctx: &RenderContext| {
        // Deterministic pseudo-random triangle soup.
        let mut state = 0x2545_f491u32;
        let mut rand = move || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / 16_777_216.0
        };
        for i in 0..40 {
            let cx = rand() * 1.6 - 0.8;
            let cy = rand() * 1.6 - 0.8;
            let z = rand() * 1.4 - 0.7;
            let color = Vec4::new(rand(), rand(), rand(), 1.0);
            let size = 0.1 + rand() * 0.4;
            let (v0, v1, v2) = (
                colored_vertex(cx - size, cy - size, z, color),
                colored_vertex(cx - size, cy + size, z, color),
                colored_vertex(cx + size, cy + size, z, color),
            );
            if i % 2 == 0 {
                Renderer::draw_triangle(ctx, &v0, &v1, &v2);
            } else {
                Renderer::draw_triangle(ctx, &v1, &v0, &v2);
            }
        }
    };

    let mut inline_ctx = make_context(240, 240, false);
    draw_scene(&inline_ctx);
    inline_ctx.end_frame();

    let mut threaded_ctx = make_context(240, 240, false);
    threaded_ctx.enable_multi_threads();
    assert!(threaded_ctx.is_multi_threaded());
    draw_scene(&threaded_ctx);
    threaded_ctx.end_frame();

    let a = inline_ctx.color_buffer(0).unwrap();
    let b = threaded_ctx.color_buffer(0).unwrap();
    assert_eq!(a.bytes(), b.bytes());

    let da = inline_ctx.depth_buffer().unwrap();
    let db = threaded_ctx.depth_buffer().unwrap();
    assert_eq!(da.bytes(), db.bytes());
}

// Rebinding shaders and materials between draws must not disturb commands
// already in flight: each command carries its own snapshot.
#[test]
fn test_state_rebind_between_draws_is_safe() {
    let mut ctx = make_context(200, 200, false);
    ctx.enable_multi_threads();

    let left = [
        colored_vertex(-0.9, -0.5, 0.0, Vec4::new(1.0, 0.0, 0.0, 1.0)),
        colored_vertex(-0.9, 0.5, 0.0, Vec4::new(1.0, 0.0, 0.0, 1.0)),
        colored_vertex(-0.1, 0.5, 0.0, Vec4::new(1.0, 0.0, 0.0, 1.0)),
    ];
    Renderer::draw_triangle(&ctx, &left[0], &left[1], &left[2]);

    // Rebind to the depth-only pair mid-frame; the first draw keeps its
    // simple shader snapshot.
    ctx.set_shader(Arc::new(DepthOnlyVertexShader), Arc::new(DepthOnlyPixelShader));
    let right = [
        colored_vertex(0.1, -0.5, 0.0, Vec4::ONE),
        colored_vertex(0.1, 0.5, 0.0, Vec4::ONE),
        colored_vertex(0.9, 0.5, 0.0, Vec4::ONE),
    ];
    Renderer::draw_triangle(&ctx, &right[0], &right[1], &right[2]);
    ctx.end_frame();

    let color = ctx.color_buffer(0).unwrap();
    // Left triangle shaded red, right triangle depth-only (no color).
    assert_eq!(color.read_rgba(20, 70).unwrap(), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(color.read_rgba(140, 70).unwrap(), CLEAR.to_array());
}

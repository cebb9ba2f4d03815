// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The triangle pipeline.
//!
//! `draw_triangle` runs the vertex shader, rejects triangles wholly outside
//! the frustum, clips the survivors against the six clip planes, fans the
//! resulting polygon back into triangles, and rasterizes each one: divide by
//! w, map to screen, cull, bin over the tile grid, then walk pixels with
//! incremental edge functions, the top-left fill rule, a LESS_EQUAL depth
//! test and perspective-correct attribute interpolation.
//!
//! Clipping an edge against a plane uses the standard parametric split: with
//! `D1 = plane . P1` and `D2 = plane . P2`, the crossing point sits at
//! `t = D1 / (D1 - D2)`, and per edge the Sutherland-Hodgman emit rules are
//!   both inside       -> emit P2
//!   inside -> outside -> emit intersection
//!   outside -> inside -> emit intersection, then P2
//!   both outside      -> emit nothing

use glam::{Vec3, Vec4};

use rastra_common::simd::{dot3, mul_vec4_scalar};
use rastra_common::{
    FrontFace, PsInput, PsOutput, Rect, VertexAttributes, VsInput, VsOutput,
    MAX_CLIP_VERTEX_COUNT, MSAA_SAMPLE_OFFSETS,
};

use crate::context::RenderContext;
use crate::mesh::Mesh;
use crate::shader::PixelShaderContext;
use crate::tiles::{self, TileCommand, TileContext, TileRect};

/// The view-volume planes in homogeneous clip space. A vertex is inside a
/// plane when `plane . v >= 0`.
const CLIP_PLANES: [Vec4; 6] = [
    Vec4::new(1.0, 0.0, 0.0, 1.0),  // left
    Vec4::new(-1.0, 0.0, 0.0, 1.0), // right
    Vec4::new(0.0, 0.0, 1.0, 1.0),  // near
    Vec4::new(0.0, 0.0, -1.0, 1.0), // far
    Vec4::new(0.0, -1.0, 0.0, 1.0), // top
    Vec4::new(0.0, 1.0, 0.0, 1.0),  // bottom
];

/// A vertex after perspective divide and viewport mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenVertex {
    /// Screen-space position; z is post-divide NDC z mapped to [0, 1].
    pub screen: Vec3,
    /// 1 / clip-space w, kept for perspective-correct interpolation.
    pub inv_w: f32,
}

/// Immutable per-triangle snapshot handed to tile rasterization: the three
/// screen vertices in raster order, their attributes pre-divided by w, and
/// the reciprocal of the (positive) triangle area.
#[derive(Debug, Clone, Copy)]
pub struct TriangleSetup {
    pub v: [ScreenVertex; 3],
    pub attributes: [VertexAttributes; 3],
    pub attribute_count: u32,
    pub inv_area: f32,
}

/// Edge function: twice the signed area of triangle ABP. Zero on the edge,
/// one consistent sign per side.
#[inline]
pub(crate) fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// True when all three vertices sit on the negative side of one frustum
/// plane. The homogeneous forms avoid the divide.
fn outside_frustum(v0: Vec4, v1: Vec4, v2: Vec4) -> bool {
    let left = |v: Vec4| v.x + v.w < 0.0;
    let right = |v: Vec4| v.w - v.x < 0.0;
    let near = |v: Vec4| v.z + v.w < 0.0;
    let far = |v: Vec4| v.w - v.z < 0.0;
    let top = |v: Vec4| v.w - v.y < 0.0;
    let bottom = |v: Vec4| v.w + v.y < 0.0;

    (left(v0) && left(v1) && left(v2))
        || (right(v0) && right(v1) && right(v2))
        || (near(v0) && near(v1) && near(v2))
        || (far(v0) && far(v1) && far(v2))
        || (top(v0) && top(v1) && top(v2))
        || (bottom(v0) && bottom(v1) && bottom(v2))
}

/// Linear interpolation of position and all attributes at parameter `t`.
fn lerp_vertex(p1: &VsOutput, p2: &VsOutput, t: f32) -> VsOutput {
    debug_assert_eq!(p1.attributes.count, p2.attributes.count);

    let mut out = VsOutput {
        position: p1.position.lerp(p2.position, t),
        attributes: VertexAttributes::new(),
    };
    out.attributes.count = p1.attributes.count;
    for k in 0..p1.attributes.count as usize {
        out.attributes.members[k] = p1.attributes.members[k].lerp(p2.attributes.members[k], t);
    }
    out
}

/// Clip a convex polygon against one plane (Sutherland-Hodgman). Returns the
/// number of vertices written to `out`.
fn clip_polygon_against_plane(
    input: &[VsOutput],
    plane: Vec4,
    out: &mut [VsOutput; MAX_CLIP_VERTEX_COUNT],
) -> usize {
    debug_assert!(input.len() >= 2);

    let mut count = 0;
    let mut emit = |v: VsOutput, count: &mut usize| {
        debug_assert!(*count < MAX_CLIP_VERTEX_COUNT);
        out[*count] = v;
        *count += 1;
    };

    let mut p1 = &input[input.len() - 1];
    let mut d1 = plane.dot(p1.position);
    for p2 in input {
        let d2 = plane.dot(p2.position);
        if d2 >= 0.0 {
            // P2 in front of the plane.
            if d2 == 0.0 || d1 >= 0.0 {
                emit(*p2, &mut count);
            } else {
                let t = d1 / (d1 - d2);
                emit(lerp_vertex(p1, p2, t), &mut count);
                emit(*p2, &mut count);
            }
        } else if d1 > 0.0 {
            // P2 behind, P1 in front: keep the crossing point only.
            let t = d1 / (d1 - d2);
            emit(lerp_vertex(p1, p2, t), &mut count);
        }
        p1 = p2;
        d1 = d2;
    }

    count
}

/// Screen AABB of a triangle.
fn triangle_bounds(v0: Vec3, v1: Vec3, v2: Vec3) -> Rect {
    Rect::new(
        v0.x.min(v1.x).min(v2.x),
        v0.y.min(v1.y).min(v2.y),
        v0.x.max(v1.x).max(v2.x),
        v0.y.max(v1.y).max(v2.y),
    )
}

/// Divide every attribute by w (multiply by `inv_w`); the rasterizer then
/// interpolates `attr / w` linearly and rescales by the interpolated w.
fn divide_attributes(attrs: &VertexAttributes, inv_w: f32) -> VertexAttributes {
    let mut out = VertexAttributes::new();
    out.count = attrs.count;
    for k in 0..attrs.count as usize {
        out.members[k] = Vec4::from_array(mul_vec4_scalar(attrs.members[k].to_array(), inv_w));
    }
    out
}

/// Perspective-correct attribute blend at barycentric weights `w`, with
/// `big_w = 1 / (w0 * inv_w0 + w1 * inv_w1 + w2 * inv_w2)`.
fn interpolate_attributes(
    attrs: &[VertexAttributes; 3],
    count: u32,
    w: [f32; 3],
    big_w: f32,
) -> VertexAttributes {
    let ww = [w[0] * big_w, w[1] * big_w, w[2] * big_w, 0.0];

    let mut out = VertexAttributes::new();
    out.count = count;
    for k in 0..count as usize {
        let a = attrs[0].members[k];
        let b = attrs[1].members[k];
        let c = attrs[2].members[k];
        out.members[k] = Vec4::new(
            dot3([a.x, b.x, c.x, 0.0], ww),
            dot3([a.y, b.y, c.y, 0.0], ww),
            dot3([a.z, b.z, c.z, 0.0], ww),
            dot3([a.w, b.w, c.w, 0.0], ww),
        );
    }
    out
}

/// Coverage of one pixel against the three edge values.
enum Coverage {
    /// Outside, and the x step can never bring this scanline back inside.
    Break,
    /// Outside this pixel only, or excluded by the fill rule.
    Skip,
    Inside,
}

/// Inside test plus the top-left fill rule: a pixel exactly on an edge
/// counts only when that edge is a top edge (dy = 0, dx > 0) or a left edge
/// (dy > 0), so an edge shared by two triangles is rasterized exactly once.
#[inline]
fn coverage(e: &[f32; 3], d: &[Vec3; 3]) -> Coverage {
    for k in 0..3 {
        if e[k] < 0.0 {
            return if d[k].y <= 0.0 {
                Coverage::Break
            } else {
                Coverage::Skip
            };
        }
    }
    for k in 0..3 {
        if e[k] == 0.0 {
            let top = d[k].y == 0.0 && d[k].x > 0.0;
            let left = d[k].y > 0.0;
            if !(top || left) {
                return Coverage::Skip;
            }
        }
    }
    Coverage::Inside
}

/// Rasterize one triangle within one tile rectangle.
///
/// Edge values step incrementally: +dy per pixel along x, -dx per row along
/// y, so the inner loop is add-only.
pub(crate) fn rasterize_tile(tc: &TileContext) {
    let setup = &tc.setup;
    let sv = &setup.v;
    let ps = tc.pixel_shader.as_ref();

    let mut input = PsInput {
        attributes: VertexAttributes::new(),
    };
    let mut output = PsOutput::new();
    output.color_count = ps.output_color_count();

    let d = [
        sv[2].screen - sv[1].screen,
        sv[0].screen - sv[2].screen,
        sv[1].screen - sv[0].screen,
    ];
    let origin = Vec3::new(tc.rect.x0 as f32 + 0.5, tc.rect.y0 as f32 + 0.5, 0.0);
    let mut row = [
        edge_function(sv[1].screen, sv[2].screen, origin),
        edge_function(sv[2].screen, sv[0].screen, origin),
        edge_function(sv[0].screen, sv[1].screen, origin),
    ];

    let mut depth_tests = 0u64;
    let mut depth_passes = 0u64;
    let mut shaded = 0u64;

    for cy in tc.rect.y0..tc.rect.y1 {
        let mut e = row;
        for cx in tc.rect.x0..tc.rect.x1 {
            match coverage(&e, &d) {
                Coverage::Break => break,
                Coverage::Skip => {}
                Coverage::Inside => {
                    let w0 = e[0] * setup.inv_area;
                    let w1 = e[1] * setup.inv_area;
                    // The closed form keeps the weights summing to exactly 1.
                    let w2 = 1.0 - w0 - w1;

                    let depth =
                        w0 * sv[0].screen.z + w1 * sv[1].screen.z + w2 * sv[2].screen.z;
                    depth_tests += 1;
                    if tc.targets.depth_test_and_override(cx as u32, cy as u32, depth) {
                        depth_passes += 1;
                        let big_w =
                            1.0 / (w0 * sv[0].inv_w + w1 * sv[1].inv_w + w2 * sv[2].inv_w);
                        input.attributes = interpolate_attributes(
                            &setup.attributes,
                            setup.attribute_count,
                            [w0, w1, w2],
                            big_w,
                        );
                        ps.process(&tc.shader_ctx, &input, &mut output);
                        shaded += 1;
                        tc.targets.write_colors(cx as u32, cy as u32, &output);
                    }
                }
            }
            e[0] += d[0].y;
            e[1] += d[1].y;
            e[2] += d[2].y;
        }
        row[0] -= d[0].x;
        row[1] -= d[1].x;
        row[2] -= d[2].x;
    }

    tc.stats.add_tile_totals(depth_tests, depth_passes, shaded);
}

/// MSAA variant: coverage and depth at the rotated-grid sample positions,
/// shading once at the pixel center, sidecar writes masked by the covered
/// samples.
pub(crate) fn rasterize_tile_msaa(tc: &TileContext) {
    let setup = &tc.setup;
    let sv = &setup.v;
    let ps = tc.pixel_shader.as_ref();

    let mut input = PsInput {
        attributes: VertexAttributes::new(),
    };
    let mut output = PsOutput::new();
    output.color_count = ps.output_color_count();

    let d = [
        sv[2].screen - sv[1].screen,
        sv[0].screen - sv[2].screen,
        sv[1].screen - sv[0].screen,
    ];

    let mut depth_tests = 0u64;
    let mut depth_passes = 0u64;
    let mut shaded = 0u64;

    for cy in tc.rect.y0..tc.rect.y1 {
        for cx in tc.rect.x0..tc.rect.x1 {
            let mut mask = 0u32;
            for (sample, [ox, oy]) in MSAA_SAMPLE_OFFSETS.iter().enumerate() {
                let p = Vec3::new(cx as f32 + ox, cy as f32 + oy, 0.0);
                let e = [
                    edge_function(sv[1].screen, sv[2].screen, p),
                    edge_function(sv[2].screen, sv[0].screen, p),
                    edge_function(sv[0].screen, sv[1].screen, p),
                ];
                match coverage(&e, &d) {
                    Coverage::Inside => {}
                    _ => continue,
                }

                let w0 = e[0] * setup.inv_area;
                let w1 = e[1] * setup.inv_area;
                let w2 = 1.0 - w0 - w1;
                let depth = w0 * sv[0].screen.z + w1 * sv[1].screen.z + w2 * sv[2].screen.z;

                depth_tests += 1;
                if tc
                    .targets
                    .depth_test_and_override_msaa(cx as u32, cy as u32, depth, sample)
                {
                    depth_passes += 1;
                    mask |= 1 << sample;
                }
            }

            if mask == 0 {
                continue;
            }

            // Attributes are interpolated once, at the pixel center.
            let center = Vec3::new(cx as f32 + 0.5, cy as f32 + 0.5, 0.0);
            let e = [
                edge_function(sv[1].screen, sv[2].screen, center),
                edge_function(sv[2].screen, sv[0].screen, center),
                edge_function(sv[0].screen, sv[1].screen, center),
            ];
            let w0 = e[0] * setup.inv_area;
            let w1 = e[1] * setup.inv_area;
            let w2 = 1.0 - w0 - w1;
            let big_w = 1.0 / (w0 * sv[0].inv_w + w1 * sv[1].inv_w + w2 * sv[2].inv_w);
            input.attributes = interpolate_attributes(
                &setup.attributes,
                setup.attribute_count,
                [w0, w1, w2],
                big_w,
            );

            ps.process(&tc.shader_ctx, &input, &mut output);
            shaded += 1;
            tc.targets
                .write_colors_msaa(cx as u32, cy as u32, &output, mask);
        }
    }

    tc.stats.add_tile_totals(depth_tests, depth_passes, shaded);
}

/// The drawing front end.
pub struct Renderer;

impl Renderer {
    /// Submit one triangle. Requires a bound shader pair and render target;
    /// drawing without them is a caller bug and panics.
    pub fn draw_triangle(ctx: &RenderContext, a: &VsInput, b: &VsInput, c: &VsInput) {
        let vs = ctx
            .vertex_shader
            .as_ref()
            .expect("draw_triangle: no vertex shader bound");

        ctx.stats.add_triangle();

        let mut polygon = [[VsOutput::default(); MAX_CLIP_VERTEX_COUNT]; 2];
        polygon[0][0] = vs.process(&ctx.matrices, a);
        polygon[0][1] = vs.process(&ctx.matrices, b);
        polygon[0][2] = vs.process(&ctx.matrices, c);

        if outside_frustum(
            polygon[0][0].position,
            polygon[0][1].position,
            polygon[0][2].position,
        ) {
            ctx.stats.add_rejected();
            return;
        }

        // Clip against each plane in turn, ping-ponging between the two
        // polygon buffers.
        let mut current = 0;
        let mut count = 3;
        for plane in CLIP_PLANES {
            if count < 3 {
                break;
            }
            let (first, second) = polygon.split_at_mut(1);
            let (src, dst) = if current == 0 {
                (&first[0], &mut second[0])
            } else {
                (&second[0], &mut first[0])
            };
            count = clip_polygon_against_plane(&src[..count], plane, dst);
            current ^= 1;
        }
        if count < 3 {
            ctx.stats.add_rejected();
            return;
        }

        // Fan triangulation of the clipped polygon.
        let verts = &polygon[current][..count];
        for i in 2..count {
            Self::rasterize_triangle(ctx, &verts[0], &verts[i - 1], &verts[i]);
        }
    }

    /// Submit every submesh of a mesh, binding its material first.
    pub fn draw_mesh(ctx: &mut RenderContext, mesh: &Mesh) {
        for sub in &mesh.submeshes {
            if let Some(index) = sub.material_index {
                ctx.set_material(Some(mesh.materials[index].clone()));
            }

            let triangle_count = sub.index_count / 3;
            for t in 0..triangle_count {
                let base = (sub.index_offset + t * 3) as usize;
                let v0 = &mesh.vertices[mesh.indices[base] as usize];
                let v1 = &mesh.vertices[mesh.indices[base + 1] as usize];
                let v2 = &mesh.vertices[mesh.indices[base + 2] as usize];
                Self::draw_triangle(ctx, v0, v1, v2);
            }
        }
    }

    /// Screen-space setup and tile dispatch for one clipped triangle.
    fn rasterize_triangle(ctx: &RenderContext, a: &VsOutput, b: &VsOutput, c: &VsOutput) {
        let ps = ctx
            .pixel_shader
            .as_ref()
            .expect("draw_triangle: no pixel shader bound");

        let clip = [a, b, c];
        let mut sv = [ScreenVertex::default(); 3];
        for (out, v) in sv.iter_mut().zip(clip) {
            let inv_w = 1.0 / v.position.w;
            let ndc = v.position.truncate() * inv_w;
            *out = ScreenVertex {
                screen: ctx.ndc_to_screen(ndc),
                inv_w,
            };
        }

        let mut e012 = edge_function(sv[0].screen, sv[1].screen, sv[2].screen);
        if e012 > -1.0 && e012 < 1.0 {
            // Degenerate in screen space.
            ctx.stats.add_rejected();
            return;
        }

        // With the y-down screen convention a clockwise triangle has negative
        // area under the edge function.
        let front_facing = match ctx.front_face {
            FrontFace::Cw => e012 < 0.0,
            FrontFace::Ccw => e012 > 0.0,
        };
        if !front_facing {
            ctx.stats.add_culled();
            return;
        }

        // Reorder so the interior has non-negative edge values.
        let order: [usize; 3] = if e012 < 0.0 {
            e012 = -e012;
            [0, 2, 1]
        } else {
            [0, 1, 2]
        };

        let Some(bounds) = triangle_bounds(sv[0].screen, sv[1].screen, sv[2].screen)
            .intersect(&ctx.viewport)
        else {
            ctx.stats.add_rejected();
            return;
        };

        let setup = TriangleSetup {
            v: [sv[order[0]], sv[order[1]], sv[order[2]]],
            attributes: [
                divide_attributes(&clip[order[0]].attributes, sv[order[0]].inv_w),
                divide_attributes(&clip[order[1]].attributes, sv[order[1]].inv_w),
                divide_attributes(&clip[order[2]].attributes, sv[order[2]].inv_w),
            ],
            attribute_count: a.attributes.count,
            inv_area: 1.0 / e012,
        };

        // Snap the bounding box to whole pixels before binning so tile
        // rectangles stay integral; edge values are then re-derived at each
        // tile origin, making the tiled and inline paths bit-identical.
        let snapped = Rect::new(
            bounds.min_x.floor(),
            bounds.min_y.floor(),
            bounds.max_x.ceil(),
            bounds.max_y.ceil(),
        );

        let targets = ctx
            .targets()
            .expect("draw_triangle: no render target bound");
        let base = TileContext {
            setup,
            rect: TileRect {
                x0: snapped.min_x as i32,
                y0: snapped.min_y as i32,
                x1: snapped.max_x as i32,
                y1: snapped.max_y as i32,
            },
            targets,
            pixel_shader: ps.clone(),
            shader_ctx: PixelShaderContext {
                matrices: ctx.matrices,
                material: ctx.material.clone(),
                light: ctx.light,
            },
            stats: ctx.stats.clone(),
        };
        let msaa = ctx.msaa_enabled();

        let mut dispatched = 0;
        if let Some(scheduler) = &ctx.scheduler {
            tiles::for_each_tile(&ctx.viewport, &snapped, |tx, ty, rect| {
                let mut command_ctx = base.clone();
                command_ctx.rect = rect;
                let cmd = if msaa {
                    TileCommand::RasterizeMsaa(command_ctx)
                } else {
                    TileCommand::Rasterize(command_ctx)
                };
                scheduler.enqueue(tx, ty, cmd);
                dispatched += 1;
            });
        } else {
            tiles::for_each_tile(&ctx.viewport, &snapped, |_tx, _ty, rect| {
                let mut command_ctx = base.clone();
                command_ctx.rect = rect;
                if msaa {
                    rasterize_tile_msaa(&command_ctx);
                } else {
                    rasterize_tile(&command_ctx);
                }
                dispatched += 1;
            });
        }
        ctx.stats.add_tiles_dispatched(dispatched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vs_out(x: f32, y: f32, z: f32, w: f32) -> VsOutput {
        VsOutput {
            position: Vec4::new(x, y, z, w),
            attributes: VertexAttributes::new(),
        }
    }

    fn clip_all(input: [VsOutput; 3]) -> Vec<VsOutput> {
        let mut polygon = [[VsOutput::default(); MAX_CLIP_VERTEX_COUNT]; 2];
        polygon[0][..3].copy_from_slice(&input);
        let mut current = 0;
        let mut count = 3;
        for plane in CLIP_PLANES {
            if count < 3 {
                break;
            }
            let (first, second) = polygon.split_at_mut(1);
            let (src, dst) = if current == 0 {
                (&first[0], &mut second[0])
            } else {
                (&second[0], &mut first[0])
            };
            count = clip_polygon_against_plane(&src[..count], plane, dst);
            current ^= 1;
        }
        polygon[current][..count].to_vec()
    }

    #[test]
    fn test_edge_function_sign_and_zero() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        // On the edge.
        assert_eq!(edge_function(a, b, Vec3::new(5.0, 0.0, 0.0)), 0.0);
        // Opposite signs on opposite sides.
        let below = edge_function(a, b, Vec3::new(5.0, 1.0, 0.0));
        let above = edge_function(a, b, Vec3::new(5.0, -1.0, 0.0));
        assert!(below > 0.0 && above < 0.0 || below < 0.0 && above > 0.0);
    }

    #[test]
    fn test_outside_frustum_detects_all_planes() {
        // Entirely beyond the right plane: w - x < 0 for all three.
        let v = |x| Vec4::new(x, 0.0, 0.0, 1.0);
        assert!(outside_frustum(v(2.0), v(3.0), v(4.0)));
        // Straddling: not rejected.
        assert!(!outside_frustum(v(2.0), v(0.0), v(4.0)));
        // Behind the near plane: z + w < 0.
        let n = |z| Vec4::new(0.0, 0.0, z, 1.0);
        assert!(outside_frustum(n(-2.0), n(-3.0), n(-1.5)));
    }

    #[test]
    fn test_clip_fully_inside_is_identity() {
        let tri = [
            vs_out(-0.5, -0.5, 0.0, 1.0),
            vs_out(0.5, -0.5, 0.0, 1.0),
            vs_out(0.0, 0.5, 0.0, 1.0),
        ];
        let out = clip_all(tri);
        assert_eq!(out.len(), 3);
        for (o, i) in out.iter().zip(&tri) {
            assert_eq!(o.position, i.position);
        }
    }

    #[test]
    fn test_clip_fully_outside_one_plane_is_empty() {
        // All vertices left of the left plane: x + w < 0.
        let tri = [
            vs_out(-3.0, 0.0, 0.0, 1.0),
            vs_out(-2.5, 0.5, 0.0, 1.0),
            vs_out(-4.0, -0.5, 0.0, 1.0),
        ];
        let mut out = [VsOutput::default(); MAX_CLIP_VERTEX_COUNT];
        let count = clip_polygon_against_plane(&tri, CLIP_PLANES[0], &mut out);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_clip_near_plane_makes_quad() {
        // One vertex behind the near plane (z + w < 0) becomes a quad.
        let tri = [
            vs_out(-0.5, -0.5, 0.0, 1.0),
            vs_out(0.5, -0.5, 0.0, 1.0),
            vs_out(0.0, 0.5, -2.0, 1.0),
        ];
        let mut out = [VsOutput::default(); MAX_CLIP_VERTEX_COUNT];
        let count = clip_polygon_against_plane(&tri, CLIP_PLANES[2], &mut out);
        assert_eq!(count, 4);
        // Every emitted vertex is on or in front of the plane.
        for v in &out[..count] {
            assert!(CLIP_PLANES[2].dot(v.position) >= -1e-6);
        }
    }

    #[test]
    fn test_clip_interpolates_attributes() {
        let mut a = vs_out(0.0, 0.0, 1.0, 1.0);
        a.attributes.push(Vec4::new(1.0, 0.0, 0.0, 0.0));
        let mut b = vs_out(0.0, 0.0, -3.0, 1.0);
        b.attributes.push(Vec4::new(0.0, 1.0, 0.0, 0.0));

        // Edge crosses the near plane at t where D1 = 2, D2 = -2 -> t = 0.5.
        let d1 = CLIP_PLANES[2].dot(a.position);
        let d2 = CLIP_PLANES[2].dot(b.position);
        let t = d1 / (d1 - d2);
        assert_eq!(t, 0.5);

        let mid = lerp_vertex(&a, &b, t);
        assert_eq!(mid.position.z, -1.0);
        assert_eq!(mid.attributes.members[0], Vec4::new(0.5, 0.5, 0.0, 0.0));
    }

    #[test]
    fn test_divide_and_interpolate_round_trip() {
        let mut attrs = VertexAttributes::new();
        attrs.push(Vec4::new(0.2, 0.4, 0.6, 0.8));
        let divided = divide_attributes(&attrs, 0.5); // w = 2
        assert_eq!(divided.members[0], Vec4::new(0.1, 0.2, 0.3, 0.4));

        // A constant attribute across the triangle survives interpolation.
        let tri = [divided, divided, divided];
        let big_w = 1.0 / (0.2 * 0.5 + 0.3 * 0.5 + 0.5 * 0.5);
        let out = interpolate_attributes(&tri, 1, [0.2, 0.3, 0.5], big_w);
        let got = out.members[0];
        let want = Vec4::new(0.2, 0.4, 0.6, 0.8);
        assert!((got - want).length() < 1e-5, "{got:?}");
    }

    #[test]
    fn test_coverage_top_left_rule() {
        // Horizontal top edge: d = (+x, 0) includes pixels exactly on it.
        let top = [Vec3::new(5.0, 0.0, 0.0); 3];
        assert!(matches!(coverage(&[0.0, 1.0, 1.0], &top), Coverage::Inside));

        // Horizontal bottom edge: d = (-x, 0) excludes them.
        let bottom = [Vec3::new(-5.0, 0.0, 0.0); 3];
        assert!(matches!(coverage(&[0.0, 1.0, 1.0], &bottom), Coverage::Skip));

        // Left edge: d.y > 0 includes.
        let left = [Vec3::new(0.0, 5.0, 0.0); 3];
        assert!(matches!(coverage(&[0.0, 1.0, 1.0], &left), Coverage::Inside));

        // Right edge: d.y < 0 excludes (and signals the scanline break when
        // the value goes negative).
        let right = [Vec3::new(0.0, -5.0, 0.0); 3];
        assert!(matches!(coverage(&[0.0, 1.0, 1.0], &right), Coverage::Skip));
        assert!(matches!(coverage(&[-1.0, 1.0, 1.0], &right), Coverage::Break));
    }

    #[test]
    fn test_triangle_bounds() {
        let r = triangle_bounds(
            Vec3::new(10.0, 20.0, 0.0),
            Vec3::new(-5.0, 8.0, 0.0),
            Vec3::new(3.0, 40.0, 0.0),
        );
        assert_eq!(r, Rect::new(-5.0, 8.0, 10.0, 40.0));
    }
}

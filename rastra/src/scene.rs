// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Built-in demo scenes: procedural geometry and textures only, so the demo
//! needs no asset files.

use std::sync::Arc;

use anyhow::Result;
use glam::{Mat4, Vec3, Vec4};

use rastra_common::{PixelFormat, VertexAttributes, VsInput};
use rastra_render::shader::{
    LitMeshPixelShader, LitMeshVertexShader, SimplePixelShader, SimpleVertexShader,
};
use rastra_render::{Buffer2D, Light, Material, Mesh, Renderer, RenderContext, SubMesh, Vertex};

/// One clip-space triangle with red, green and blue corners.
pub fn draw_triangle_scene(ctx: &mut RenderContext) {
    ctx.set_modelview(Mat4::IDENTITY);
    ctx.set_projection(Mat4::IDENTITY);
    ctx.set_shader(Arc::new(SimpleVertexShader), Arc::new(SimplePixelShader));

    let vertex = |x: f32, y: f32, color: Vec4| {
        let mut attributes = VertexAttributes::new();
        attributes.push(color);
        VsInput {
            position: Vec4::new(x, y, 1.0, 1.0),
            attributes,
        }
    };

    let v0 = vertex(-0.5, -0.5, Vec4::new(1.0, 0.0, 0.0, 1.0));
    let v1 = vertex(-0.5, 0.5, Vec4::new(0.0, 1.0, 0.0, 1.0));
    let v2 = vertex(0.5, 0.5, Vec4::new(0.0, 0.0, 1.0, 1.0));
    Renderer::draw_triangle(ctx, &v0, &v1, &v2);
}

/// A rotating checkerboard-textured cube under a perspective camera, lit by
/// one directional light.
pub fn draw_cube_scene(ctx: &mut RenderContext, aspect: f32, angle: f32) -> Result<()> {
    ctx.set_projection(Mat4::perspective_rh_gl(
        std::f32::consts::FRAC_PI_3,
        aspect,
        0.1,
        100.0,
    ));
    ctx.set_modelview(
        Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0))
            * Mat4::from_rotation_y(angle)
            * Mat4::from_rotation_x(0.45),
    );
    ctx.set_shader(Arc::new(LitMeshVertexShader), Arc::new(LitMeshPixelShader));
    ctx.set_light(Some(Light::directional(
        Vec3::new(0.4, 0.7, 0.6).normalize(),
        Vec3::splat(0.9),
    )));

    let mesh = cube_mesh()?;
    Renderer::draw_mesh(ctx, &mesh);
    Ok(())
}

/// Three spinning cubes with per-face colors, shaded by the simple
/// pass-through pair.
pub fn draw_cubes_scene(ctx: &mut RenderContext, aspect: f32, angle: f32) {
    ctx.set_projection(Mat4::perspective_rh_gl(
        std::f32::consts::FRAC_PI_3,
        aspect,
        0.1,
        100.0,
    ));
    ctx.set_shader(Arc::new(SimpleVertexShader), Arc::new(SimplePixelShader));

    let face_colors = [
        Vec4::new(0.0, 0.0, 1.0, 1.0),
        Vec4::new(0.0, 1.0, 0.0, 1.0),
        Vec4::new(0.0, 1.0, 1.0, 1.0),
        Vec4::new(1.0, 1.0, 1.0, 1.0),
        Vec4::new(1.0, 0.0, 1.0, 1.0),
        Vec4::new(1.0, 1.0, 0.0, 1.0),
    ];

    let view = Mat4::from_translation(Vec3::new(0.0, -0.5, -8.0));
    let placements = [
        (Vec3::new(-2.5, 0.0, 0.0), 1.0f32),
        (Vec3::new(0.0, 0.0, 0.0), 1.4),
        (Vec3::new(2.5, 0.0, 0.0), 0.7),
    ];

    for (offset, speed) in placements {
        ctx.set_modelview(
            view * Mat4::from_translation(offset)
                * Mat4::from_rotation_y(angle * speed)
                * Mat4::from_rotation_x(0.35),
        );

        for (face, color) in cube_faces().iter().zip(face_colors) {
            let corner = |index: usize| {
                let mut attributes = VertexAttributes::new();
                attributes.push(color);
                VsInput {
                    position: face.1[index].extend(1.0),
                    attributes,
                }
            };
            let (c0, c1, c2, c3) = (corner(0), corner(1), corner(2), corner(3));
            Renderer::draw_triangle(ctx, &c0, &c1, &c2);
            Renderer::draw_triangle(ctx, &c0, &c2, &c3);
        }
    }
}

/// 8x8 checkerboard, white and slate blue.
fn checkerboard_texture(size: u32) -> Result<Buffer2D> {
    let texture = Buffer2D::new(size, size, PixelFormat::Rgba8)?;
    let cell = (size / 8).max(1);
    for y in 0..size {
        for x in 0..size {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            let color = if even {
                [0.9, 0.9, 0.9, 1.0]
            } else {
                [0.2, 0.3, 0.6, 1.0]
            };
            texture.write_rgba(x, y, color);
        }
    }
    Ok(texture)
}

/// Per face: outward normal and the four corners in clockwise order
/// (top-left, top-right, bottom-right, bottom-left seen from outside),
/// matching the default front-face mode.
fn cube_faces() -> [(Vec3, [Vec3; 4]); 6] {
    [
        (
            Vec3::Z,
            [
                Vec3::new(-1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(-1.0, -1.0, 1.0),
            ],
        ),
        (
            Vec3::NEG_Z,
            [
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
            ],
        ),
        (
            Vec3::X,
            [
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, 1.0),
            ],
        ),
        (
            Vec3::NEG_X,
            [
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(-1.0, 1.0, 1.0),
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, -1.0, -1.0),
            ],
        ),
        (
            Vec3::Y,
            [
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
        ),
        (
            Vec3::NEG_Y,
            [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(-1.0, -1.0, -1.0),
            ],
        ),
    ]
}

/// Unit cube with per-face normals and UVs, one submesh, one material.
/// UVs are stored pre-flipped (`1 - v`) so v = 0 is the texture's top row.
fn cube_mesh() -> Result<Mesh> {
    let mut mesh = Mesh::default();

    // OBJ-style corner UVs (v grows upward); the vertex stores (u, 1 - v, 1).
    let corner_uvs = [[0.0f32, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    for (normal, corners) in cube_faces() {
        let base = mesh.vertices.len() as u32;
        for (corner, [u, v]) in corners.iter().zip(corner_uvs) {
            let mut attributes = VertexAttributes::new();
            attributes.push(normal.extend(0.0));
            attributes.push(Vec4::new(u, 1.0 - v, 1.0, 0.0));
            mesh.vertices.push(Vertex {
                position: corner.extend(1.0),
                attributes,
            });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    mesh.materials = vec![Arc::new(Material::with_diffuse(Arc::new(
        checkerboard_texture(64)?,
    )))];
    mesh.submeshes = vec![SubMesh {
        index_offset: 0,
        index_count: mesh.indices.len() as u32,
        material_index: Some(0),
    }];

    mesh.validate()?;
    Ok(mesh)
}

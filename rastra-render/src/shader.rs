// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shader contract and the built-in shader set.
//!
//! Vertex shaders run on the submitting thread, once per triangle corner.
//! Pixel shaders run on tile workers, concurrently across pixels, against a
//! by-value [`PixelShaderContext`] snapshot; both stages must be free of
//! mutable state, which the `Send + Sync` bounds enforce at the seam.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use rastra_common::{
    MatrixGroup, PsInput, PsOutput, VsInput, VsOutput, MESH_NORMAL_ATTRIB, MESH_UV_ATTRIB,
};

use crate::light::{Light, LightKind};
use crate::material::Material;

/// Snapshot of the state a pixel shader may read: the matrix group at draw
/// time (including the normal matrix), the bound material, and the bound
/// light.
#[derive(Clone)]
pub struct PixelShaderContext {
    pub matrices: MatrixGroup,
    pub material: Option<Arc<Material>>,
    pub light: Option<Light>,
}

/// Transforms one vertex from object space to clip space.
pub trait VertexShader: Send + Sync {
    fn process(&self, matrices: &MatrixGroup, input: &VsInput) -> VsOutput;
}

/// Shades one pixel from interpolated attributes.
pub trait PixelShader: Send + Sync {
    fn process(&self, ctx: &PixelShaderContext, input: &PsInput, output: &mut PsOutput);

    /// How many MRT slots this shader writes; must not exceed the number of
    /// bound color targets.
    fn output_color_count(&self) -> u32 {
        1
    }
}

// ── Built-in shaders ────────────────────────────────────────────────────────

/// MVP transform, attributes passed through.
pub struct SimpleVertexShader;

impl VertexShader for SimpleVertexShader {
    fn process(&self, matrices: &MatrixGroup, input: &VsInput) -> VsOutput {
        VsOutput {
            position: matrices.mvp * input.position,
            attributes: input.attributes,
        }
    }
}

/// Attribute slot 0 written out as an opaque color.
pub struct SimplePixelShader;

impl PixelShader for SimplePixelShader {
    fn process(&self, _ctx: &PixelShaderContext, input: &PsInput, output: &mut PsOutput) {
        let rgb: Vec3 = input.attributes.members[0].truncate();
        output.colors[0] = rgb.extend(1.0);
    }
}

/// MVP transform for mesh drawing; attributes (normal, UV) pass through.
pub struct SimpleMeshVertexShader;

impl VertexShader for SimpleMeshVertexShader {
    fn process(&self, matrices: &MatrixGroup, input: &VsInput) -> VsOutput {
        VsOutput {
            position: matrices.mvp * input.position,
            attributes: input.attributes,
        }
    }
}

/// Samples the material's diffuse texture at the slot-1 UV.
pub struct SimpleMeshPixelShader;

impl PixelShader for SimpleMeshPixelShader {
    fn process(&self, ctx: &PixelShaderContext, input: &PsInput, output: &mut PsOutput) {
        let uv = input.attributes.members[MESH_UV_ATTRIB];
        let rgba = ctx
            .material
            .as_ref()
            .and_then(|m| m.diffuse_texture.as_ref())
            .map(|tex| tex.sample_nearest(uv.x, uv.y))
            .unwrap_or([0.0; 4]);
        output.colors[0] = Vec4::from_array(rgba);
    }
}

/// Ambient floor of the lit shaders.
const LIT_AMBIENT: f32 = 0.15;

/// Mesh vertex shader for the lit path. Rotates the slot-0 normal with the
/// normal matrix, passes the slot-1 UV through, and appends the view-space
/// position in slot 2 for point-light attenuation directions.
pub struct LitMeshVertexShader;

impl VertexShader for LitMeshVertexShader {
    fn process(&self, matrices: &MatrixGroup, input: &VsInput) -> VsOutput {
        let mut output = VsOutput {
            position: matrices.mvp * input.position,
            attributes: input.attributes,
        };
        let normal: Vec3 = input.attributes.members[MESH_NORMAL_ATTRIB].truncate();
        output.attributes.members[MESH_NORMAL_ATTRIB] =
            (matrices.normal_matrix * normal).extend(0.0);
        let view_pos = matrices.modelview * input.position;
        if output.attributes.count as usize <= 2 {
            output.attributes.count = 3;
        }
        output.attributes.members[2] = view_pos;
        output
    }
}

/// Lambert-lit diffuse: ambient + max(0, N . L) modulating the sampled
/// diffuse color. Without a bound light the surface is ambient-only.
pub struct LitMeshPixelShader;

impl PixelShader for LitMeshPixelShader {
    fn process(&self, ctx: &PixelShaderContext, input: &PsInput, output: &mut PsOutput) {
        let uv = input.attributes.members[MESH_UV_ATTRIB];
        let base = ctx
            .material
            .as_ref()
            .and_then(|m| m.diffuse_texture.as_ref())
            .map(|tex| tex.sample_nearest(uv.x, uv.y))
            .unwrap_or([1.0; 4]);

        let normal: Vec3 = input.attributes.members[MESH_NORMAL_ATTRIB]
            .truncate()
            .normalize_or_zero();

        let mut intensity = Vec3::splat(LIT_AMBIENT);
        if let Some(light) = &ctx.light {
            let toward_light = match light.kind {
                LightKind::Directional => light.position.truncate().normalize_or_zero(),
                LightKind::Point => {
                    let frag_pos: Vec3 = input.attributes.members[2].truncate();
                    (light.position.truncate() - frag_pos).normalize_or_zero()
                }
            };
            intensity += light.color * normal.dot(toward_light).max(0.0);
        }

        let lit = (Vec3::new(base[0], base[1], base[2]) * intensity).min(Vec3::ONE);
        output.colors[0] = lit.extend(base[3]);
    }
}

/// MVP transform only; attributes are dropped.
pub struct DepthOnlyVertexShader;

impl VertexShader for DepthOnlyVertexShader {
    fn process(&self, matrices: &MatrixGroup, input: &VsInput) -> VsOutput {
        VsOutput {
            position: matrices.mvp * input.position,
            attributes: Default::default(),
        }
    }
}

/// Writes no color; only the depth test side effect remains.
pub struct DepthOnlyPixelShader;

impl PixelShader for DepthOnlyPixelShader {
    fn process(&self, _ctx: &PixelShaderContext, _input: &PsInput, _output: &mut PsOutput) {}

    fn output_color_count(&self) -> u32 {
        0
    }
}

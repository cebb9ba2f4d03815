// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Indexed triangle meshes.
//!
//! The host supplies vertex, index and material data already in memory; the
//! core only walks it. By convention attribute slot 0 carries the normal and
//! slot 1 the UV with V flipped at build time (`(u, 1 - v, 1)`) so textures
//! address from their top-left corner.

use std::sync::Arc;

use rastra_common::{RenderError, VsInput};

use crate::material::Material;

/// One mesh vertex: object-space position (w = 1) plus attributes. Meshes
/// store vertices in vertex-shader input form so drawing never repacks them.
pub type Vertex = VsInput;

/// A contiguous index range drawn with one material.
#[derive(Debug, Clone, Copy)]
pub struct SubMesh {
    /// Offset into the mesh index buffer.
    pub index_offset: u32,
    /// Number of indices; always a multiple of 3.
    pub index_count: u32,
    /// Index into the mesh material list, or `None` for the bound material.
    pub material_index: Option<usize>,
}

/// Vertex/index buffers plus materials and submesh ranges.
#[derive(Default, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub materials: Vec<Arc<Material>>,
    pub submeshes: Vec<SubMesh>,
}

impl Mesh {
    /// Check the structural invariants: triangle-multiple index counts,
    /// in-range indices and material references, and submeshes sorted by
    /// material index (minimizes material flips during drawing).
    pub fn validate(&self) -> Result<(), RenderError> {
        let vertex_count = self.vertices.len() as u32;

        let mut prev_material: Option<usize> = None;
        for (i, sub) in self.submeshes.iter().enumerate() {
            if sub.index_count % 3 != 0 {
                return Err(RenderError::InvalidMesh {
                    reason: format!("submesh {i} index count {} not a multiple of 3", sub.index_count),
                });
            }
            let end = sub.index_offset as usize + sub.index_count as usize;
            if end > self.indices.len() {
                return Err(RenderError::InvalidMesh {
                    reason: format!("submesh {i} range ends at {end}, index buffer has {}", self.indices.len()),
                });
            }
            if let Some(mat) = sub.material_index {
                if mat >= self.materials.len() {
                    return Err(RenderError::InvalidMesh {
                        reason: format!("submesh {i} references material {mat} of {}", self.materials.len()),
                    });
                }
                if prev_material.is_some_and(|prev| mat < prev) {
                    return Err(RenderError::InvalidMesh {
                        reason: format!("submesh {i} breaks material ordering"),
                    });
                }
                prev_material = Some(mat);
            }
        }

        if let Some(&bad) = self.indices.iter().find(|&&idx| idx >= vertex_count) {
            return Err(RenderError::InvalidMesh {
                reason: format!("index {bad} out of range for {vertex_count} vertices"),
            });
        }

        Ok(())
    }
}

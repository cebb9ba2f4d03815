// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tiled multithreaded CPU software rasterizer.
//!
//! The pipeline consumes triangles with programmable per-vertex attributes
//! and a pair of user-supplied shader stages, and produces pixels in typed
//! framebuffers: homogeneous clipping against the six frustum planes,
//! perspective divide, back-face culling, screen-space setup, tile binning,
//! edge-function rasterization with the top-left fill rule,
//! perspective-correct attribute interpolation, LESS_EQUAL depth testing,
//! optional 4x MSAA with end-of-frame resolve, and a fixed grid of worker
//! threads fed through bounded per-tile command queues.

pub mod buffer;
pub mod context;
pub mod light;
pub mod material;
pub mod mesh;
pub mod pipeline;
pub mod shader;
pub mod stats;
pub mod tiles;

pub use buffer::Buffer2D;
pub use context::RenderContext;
pub use light::{Light, LightKind};
pub use material::Material;
pub use mesh::{Mesh, SubMesh, Vertex};
pub use pipeline::Renderer;
pub use shader::{PixelShader, PixelShaderContext, VertexShader};

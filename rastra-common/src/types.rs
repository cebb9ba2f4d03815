// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::{Mat3, Mat4, Vec4};

/// Maximum number of simultaneously bound color render targets (MRT).
pub const MAX_COLOR_TARGETS: usize = 4;

/// Maximum number of per-vertex attribute slots.
pub const MAX_ATTRIBUTE_COUNT: usize = 4;

/// MSAA sample count. Coverage uses a rotated-grid pattern; sidecar buffers
/// store the samples of pixel `x` in columns `x * MSAA_SAMPLE_COUNT ..`.
pub const MSAA_SAMPLE_COUNT: usize = 4;

/// Sub-pixel sample offsets of the rotated-grid MSAA pattern.
pub const MSAA_SAMPLE_OFFSETS: [[f32; 2]; MSAA_SAMPLE_COUNT] =
    [[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75]];

/// Upper bound on polygon size during clipping: six planes can each add one
/// vertex to the initial three.
pub const MAX_CLIP_VERTEX_COUNT: usize = 9;

/// Attribute slot carrying the vertex normal when drawing meshes.
pub const MESH_NORMAL_ATTRIB: usize = 0;

/// Attribute slot carrying the vertex UV when drawing meshes.
pub const MESH_UV_ATTRIB: usize = 1;

/// Pixel format of a [`Buffer2D`]-style 2D pixel store.
///
/// The format fixes the byte width of one pixel; rows are tightly packed at
/// `width * bytes_per_pixel` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One u16 channel.
    U16,
    /// One f32 channel (depth buffers).
    F32,
    /// 8-bit RGB, 3 bytes.
    Rgb8,
    /// 8-bit RGBA, 4 bytes.
    Rgba8,
    /// Three f32 channels, 12 bytes.
    RgbF32,
    /// Four f32 channels, 16 bytes.
    RgbaF32,
}

impl PixelFormat {
    /// Byte width of a single pixel in this format.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::U16 => 2,
            PixelFormat::F32 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::RgbF32 => 12,
            PixelFormat::RgbaF32 => 16,
        }
    }
}

/// Winding considered front-facing in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Cw,
    Ccw,
}

/// Axis-aligned screen-space rectangle, `min` inclusive / `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Intersection of two rectangles, or `None` when it is empty.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);

        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some(Rect::new(min_x, min_y, max_x, max_y))
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Fixed-capacity ordered bundle of 4-component vertex attributes.
///
/// Slot meanings are an agreement between the bound vertex and pixel shader
/// (e.g. slot 0 = color or normal, slot 1 = UV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexAttributes {
    pub members: [Vec4; MAX_ATTRIBUTE_COUNT],
    pub count: u32,
}

impl VertexAttributes {
    pub const fn new() -> Self {
        Self {
            members: [Vec4::ZERO; MAX_ATTRIBUTE_COUNT],
            count: 0,
        }
    }

    /// Append an attribute. Panics when all slots are in use; the slot
    /// layout is fixed at mesh-build time, so overflow is a caller bug.
    pub fn push(&mut self, value: Vec4) {
        assert!((self.count as usize) < MAX_ATTRIBUTE_COUNT);
        self.members[self.count as usize] = value;
        self.count += 1;
    }
}

impl Default for VertexAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertex shader input: object-space position (w = 1) plus attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VsInput {
    pub position: Vec4,
    pub attributes: VertexAttributes,
}

/// Vertex shader output: clip-space position plus attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VsOutput {
    pub position: Vec4,
    pub attributes: VertexAttributes,
}

impl VsOutput {
    pub const fn new() -> Self {
        Self {
            position: Vec4::ZERO,
            attributes: VertexAttributes::new(),
        }
    }
}

impl Default for VsOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel shader input: attributes interpolated at the pixel center.
#[derive(Debug, Clone, Copy)]
pub struct PsInput {
    pub attributes: VertexAttributes,
}

/// Pixel shader output: up to [`MAX_COLOR_TARGETS`] RGBA colors.
///
/// `color_count` must not exceed the number of bound color targets.
#[derive(Debug, Clone, Copy)]
pub struct PsOutput {
    pub colors: [Vec4; MAX_COLOR_TARGETS],
    pub color_count: u32,
}

impl PsOutput {
    pub const fn new() -> Self {
        Self {
            colors: [Vec4::ZERO; MAX_COLOR_TARGETS],
            color_count: 0,
        }
    }
}

impl Default for PsOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Transform state derived from the modelview and projection matrices.
///
/// `normal_matrix` is the upper 3x3 of the transposed inverse modelview,
/// suitable for transforming normals under non-uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixGroup {
    pub modelview: Mat4,
    pub modelview_inv: Mat4,
    pub normal_matrix: Mat3,
    pub projection: Mat4,
    pub projection_inv: Mat4,
    pub mvp: Mat4,
    pub mvp_inv: Mat4,
}

impl MatrixGroup {
    pub fn identity() -> Self {
        Self {
            modelview: Mat4::IDENTITY,
            modelview_inv: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            projection: Mat4::IDENTITY,
            projection_inv: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
            mvp_inv: Mat4::IDENTITY,
        }
    }

    /// Replace the modelview matrix and refresh every derived matrix.
    pub fn set_modelview(&mut self, modelview: Mat4) {
        self.modelview = modelview;
        self.modelview_inv = modelview.inverse();
        self.normal_matrix = Mat3::from_mat4(self.modelview_inv).transpose();
        self.update_mvp();
    }

    /// Replace the projection matrix and refresh every derived matrix.
    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
        self.projection_inv = projection.inverse();
        self.update_mvp();
    }

    fn update_mvp(&mut self) {
        self.mvp = self.projection * self.modelview;
        self.mvp_inv = self.mvp.inverse();
    }
}

impl Default for MatrixGroup {
    fn default() -> Self {
        Self::identity()
    }
}

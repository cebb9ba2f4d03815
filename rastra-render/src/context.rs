// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Render context: pipeline state and framebuffer ownership.
//!
//! The context owns the render targets, the transform state, the bound
//! shader pair and material, the frame counters, and (when multithreading is
//! enabled) the tile scheduler. Draw submission reads the context; tile
//! commands carry by-value snapshots plus `Arc` references, so the host may
//! rebind state between draws while earlier commands are still in flight.

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use log::debug;

use rastra_common::{
    FrontFace, MatrixGroup, PixelFormat, PsOutput, Rect, RenderError, MAX_COLOR_TARGETS,
    MSAA_SAMPLE_COUNT,
};

use crate::buffer::Buffer2D;
use crate::light::Light;
use crate::material::Material;
use crate::shader::{PixelShader, VertexShader};
use crate::stats::{RenderStats, StatsSnapshot};
use crate::tiles::TileScheduler;

/// Shared references to the bound render targets, as carried by tile
/// commands. Valid for the lifetime of the frame that snapshotted them.
#[derive(Clone)]
pub struct RenderTargets {
    pub depth: Arc<Buffer2D>,
    pub colors: [Option<Arc<Buffer2D>>; MAX_COLOR_TARGETS],
    pub depth_msaa: Option<Arc<Buffer2D>>,
    pub colors_msaa: [Option<Arc<Buffer2D>>; MAX_COLOR_TARGETS],
}

impl RenderTargets {
    /// LESS_EQUAL depth test with write-on-pass.
    ///
    /// Unsynchronized read-then-write per cell; sound because each pixel
    /// belongs to exactly one tile worker.
    #[inline]
    pub fn depth_test_and_override(&self, x: u32, y: u32, depth: f32) -> bool {
        match self.depth.read_scalar(x, y) {
            Some(prev) if depth <= prev => {
                self.depth.write_scalar(x, y, depth);
                true
            }
            Some(_) => false,
            None => false,
        }
    }

    /// LESS_EQUAL depth test against one MSAA sample of pixel `(x, y)`.
    #[inline]
    pub fn depth_test_and_override_msaa(&self, x: u32, y: u32, depth: f32, sample: usize) -> bool {
        let Some(depth_msaa) = &self.depth_msaa else {
            return false;
        };
        let sx = x * MSAA_SAMPLE_COUNT as u32 + sample as u32;
        match depth_msaa.read_scalar(sx, y) {
            Some(prev) if depth <= prev => {
                depth_msaa.write_scalar(sx, y, depth);
                true
            }
            _ => false,
        }
    }

    /// Write each shader output color to its render target (overwrite, no
    /// blending).
    #[inline]
    pub fn write_colors(&self, x: u32, y: u32, output: &PsOutput) {
        for k in 0..output.color_count as usize {
            if let Some(rt) = &self.colors[k] {
                rt.write_rgba(x, y, output.colors[k].to_array());
            }
        }
    }

    /// Write shader output colors into the MSAA sidecar sub-columns selected
    /// by `sample_mask`.
    #[inline]
    pub fn write_colors_msaa(&self, x: u32, y: u32, output: &PsOutput, sample_mask: u32) {
        let base = x * MSAA_SAMPLE_COUNT as u32;
        for k in 0..output.color_count as usize {
            if let Some(rt) = &self.colors_msaa[k] {
                let rgba = output.colors[k].to_array();
                for sample in 0..MSAA_SAMPLE_COUNT as u32 {
                    if sample_mask & (1 << sample) != 0 {
                        rt.write_rgba(base + sample, y, rgba);
                    }
                }
            }
        }
    }
}

/// Pipeline state and framebuffer owner. See the module docs.
pub struct RenderContext {
    pub(crate) viewport: Rect,
    pub(crate) matrices: MatrixGroup,
    pub(crate) front_face: FrontFace,

    msaa_enabled: bool,
    rt_depth: Option<Arc<Buffer2D>>,
    rt_colors: [Option<Arc<Buffer2D>>; MAX_COLOR_TARGETS],
    rt_depth_msaa: Option<Arc<Buffer2D>>,
    rt_colors_msaa: [Option<Arc<Buffer2D>>; MAX_COLOR_TARGETS],

    pub(crate) material: Option<Arc<Material>>,
    pub(crate) light: Option<Light>,
    pub(crate) vertex_shader: Option<Arc<dyn VertexShader>>,
    pub(crate) pixel_shader: Option<Arc<dyn PixelShader>>,

    pub(crate) stats: Arc<RenderStats>,
    pub(crate) scheduler: Option<TileScheduler>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            viewport: Rect::new(0.0, 0.0, 1.0, 1.0),
            matrices: MatrixGroup::identity(),
            front_face: FrontFace::Cw,
            msaa_enabled: false,
            rt_depth: None,
            rt_colors: Default::default(),
            rt_depth_msaa: None,
            rt_colors_msaa: Default::default(),
            material: None,
            light: None,
            vertex_shader: None,
            pixel_shader: None,
            stats: Arc::new(RenderStats::new()),
            scheduler: None,
        }
    }

    /// Spawn the tile worker grid. Without this, draws rasterize inline on
    /// the submitting thread.
    pub fn enable_multi_threads(&mut self) {
        if self.scheduler.is_none() {
            self.scheduler = Some(TileScheduler::start());
        }
    }

    pub fn is_multi_threaded(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Allocate one F32 depth target and `color_count` RGBA8 color targets of
    /// `width x height`. With MSAA, sidecar targets of `width * S` physical
    /// columns become the authoritative buffers during rasterization and are
    /// resolved into the primaries at `end_frame`.
    ///
    /// On error no context state changes.
    pub fn set_render_target(
        &mut self,
        width: u32,
        height: u32,
        color_count: u32,
        enable_msaa: bool,
    ) -> Result<(), RenderError> {
        self.set_render_target_with_format(width, height, color_count, enable_msaa, PixelFormat::Rgba8)
    }

    /// [`RenderContext::set_render_target`] with an explicit color format;
    /// `Rgba8` or `RgbaF32` only.
    pub fn set_render_target_with_format(
        &mut self,
        width: u32,
        height: u32,
        color_count: u32,
        enable_msaa: bool,
        color_format: PixelFormat,
    ) -> Result<(), RenderError> {
        if color_count as usize > MAX_COLOR_TARGETS {
            return Err(RenderError::TooManyRenderTargets {
                requested: color_count,
                maximum: MAX_COLOR_TARGETS as u32,
            });
        }
        if !matches!(color_format, PixelFormat::Rgba8 | PixelFormat::RgbaF32) {
            return Err(RenderError::UnsupportedFormat(color_format));
        }

        let depth = Arc::new(Buffer2D::new(width, height, PixelFormat::F32)?);
        let mut colors: [Option<Arc<Buffer2D>>; MAX_COLOR_TARGETS] = Default::default();
        for slot in colors.iter_mut().take(color_count as usize) {
            *slot = Some(Arc::new(Buffer2D::new(width, height, color_format)?));
        }

        let mut depth_msaa = None;
        let mut colors_msaa: [Option<Arc<Buffer2D>>; MAX_COLOR_TARGETS] = Default::default();
        if enable_msaa {
            let samples = MSAA_SAMPLE_COUNT as u32;
            depth_msaa = Some(Arc::new(Buffer2D::new(
                width * samples,
                height,
                PixelFormat::F32,
            )?));
            for slot in colors_msaa.iter_mut().take(color_count as usize) {
                *slot = Some(Arc::new(Buffer2D::new(
                    width * samples,
                    height,
                    color_format,
                )?));
            }
        }

        debug!(
            "set_render_target {width}x{height}, {color_count} color target(s), msaa={enable_msaa}"
        );

        self.msaa_enabled = enable_msaa;
        self.rt_depth = Some(depth);
        self.rt_colors = colors;
        self.rt_depth_msaa = depth_msaa;
        self.rt_colors_msaa = colors_msaa;
        Ok(())
    }

    /// Screen-space rectangle used for the NDC-to-screen mapping.
    pub fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.viewport = Rect::new(
            x as f32,
            y as f32,
            (x + width) as f32,
            (y + height) as f32,
        );
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_cull_face(&mut self, mode: FrontFace) {
        self.front_face = mode;
    }

    pub fn set_modelview(&mut self, modelview: Mat4) {
        self.matrices.set_modelview(modelview);
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.matrices.set_projection(projection);
    }

    pub fn matrices(&self) -> &MatrixGroup {
        &self.matrices
    }

    pub fn set_material(&mut self, material: Option<Arc<Material>>) {
        self.material = material;
    }

    pub fn set_light(&mut self, light: Option<Light>) {
        self.light = light;
    }

    pub fn set_shader(&mut self, vs: Arc<dyn VertexShader>, ps: Arc<dyn PixelShader>) {
        self.vertex_shader = Some(vs);
        self.pixel_shader = Some(ps);
    }

    /// Clear depth to 1.0 and every color target (and MSAA sidecar) to
    /// `color`. Depth does not use the clear color.
    pub fn clear_render_target(&self, color: Vec4) {
        let rgba = color.to_array();
        if let Some(depth) = &self.rt_depth {
            depth.clear([1.0, 1.0, 1.0, 1.0]);
        }
        for rt in self.rt_colors.iter().flatten() {
            rt.clear(rgba);
        }
        if let Some(depth_msaa) = &self.rt_depth_msaa {
            depth_msaa.clear([1.0, 1.0, 1.0, 1.0]);
        }
        for rt in self.rt_colors_msaa.iter().flatten() {
            rt.clear(rgba);
        }
    }

    /// Reset the frame counters.
    pub fn begin_frame(&self) {
        self.stats.reset();
    }

    /// Drain all tile queues (frame barrier), then resolve MSAA sidecars
    /// into the primary targets.
    pub fn end_frame(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.drain();
        }
        if self.msaa_enabled {
            self.resolve_msaa();
        }
    }

    pub fn depth_buffer(&self) -> Option<&Arc<Buffer2D>> {
        self.rt_depth.as_ref()
    }

    pub fn color_buffer(&self, index: usize) -> Option<&Arc<Buffer2D>> {
        self.rt_colors.get(index).and_then(|rt| rt.as_ref())
    }

    pub fn msaa_color_buffer(&self, index: usize) -> Option<&Arc<Buffer2D>> {
        self.rt_colors_msaa.get(index).and_then(|rt| rt.as_ref())
    }

    pub fn msaa_enabled(&self) -> bool {
        self.msaa_enabled
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Snapshot the bound targets for a tile command, or `None` before
    /// `set_render_target`.
    pub(crate) fn targets(&self) -> Option<RenderTargets> {
        Some(RenderTargets {
            depth: self.rt_depth.clone()?,
            colors: self.rt_colors.clone(),
            depth_msaa: self.rt_depth_msaa.clone(),
            colors_msaa: self.rt_colors_msaa.clone(),
        })
    }

    /// Map NDC to screen coordinates.
    ///
    /// Viewport y grows downward while NDC y grows upward; this mapping is
    /// the single place the y axis flips. z maps from [-1, 1] to [0, 1].
    #[inline]
    pub fn ndc_to_screen(&self, ndc: Vec3) -> Vec3 {
        let vp = &self.viewport;
        Vec3::new(
            vp.min_x + (vp.max_x - vp.min_x) * (ndc.x + 1.0) * 0.5,
            vp.max_y + (vp.min_y - vp.max_y) * (ndc.y + 1.0) * 0.5,
            (ndc.z + 1.0) * 0.5,
        )
    }

    /// LESS_EQUAL depth test with write-on-pass against the primary depth
    /// buffer; the raster path runs the same test through its
    /// [`RenderTargets`] snapshot. Returns `false` when no depth target is
    /// bound.
    pub fn depth_test_and_override(&self, x: u32, y: u32, depth: f32) -> bool {
        match self.targets() {
            Some(targets) => targets.depth_test_and_override(x, y, depth),
            None => false,
        }
    }

    /// Average the S samples of every pixel into the primary depth and color
    /// targets.
    fn resolve_msaa(&self) {
        let (Some(depth), Some(depth_msaa)) = (&self.rt_depth, &self.rt_depth_msaa) else {
            return;
        };
        let width = depth.width();
        let height = depth.height();
        let samples = MSAA_SAMPLE_COUNT as u32;
        let factor = 1.0 / MSAA_SAMPLE_COUNT as f32;

        for y in 0..height {
            for x in 0..width {
                let mut sum = 0.0;
                for s in 0..samples {
                    sum += depth_msaa.read_scalar(x * samples + s, y).unwrap_or(1.0);
                }
                depth.write_scalar(x, y, sum * factor);
            }
        }

        for (rt, rt_msaa) in self.rt_colors.iter().zip(&self.rt_colors_msaa) {
            let (Some(rt), Some(rt_msaa)) = (rt, rt_msaa) else {
                continue;
            };
            for y in 0..height {
                for x in 0..width {
                    let mut sum = [0.0f32; 4];
                    for s in 0..samples {
                        let rgba = rt_msaa.read_rgba(x * samples + s, y).unwrap_or([0.0; 4]);
                        for k in 0..4 {
                            sum[k] += rgba[k];
                        }
                    }
                    for v in sum.iter_mut() {
                        *v *= factor;
                    }
                    rt.write_rgba(x, y, sum);
                }
            }
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_render_target_allocates() {
        let mut ctx = RenderContext::new();
        ctx.set_render_target(16, 8, 2, false).unwrap();

        let depth = ctx.depth_buffer().unwrap();
        assert_eq!(depth.width(), 16);
        assert_eq!(depth.format(), PixelFormat::F32);
        assert!(ctx.color_buffer(0).is_some());
        assert!(ctx.color_buffer(1).is_some());
        assert!(ctx.color_buffer(2).is_none());
        assert!(ctx.msaa_color_buffer(0).is_none());
    }

    #[test]
    fn test_set_render_target_msaa_sidecars() {
        let mut ctx = RenderContext::new();
        ctx.set_render_target(16, 8, 1, true).unwrap();
        let msaa = ctx.msaa_color_buffer(0).unwrap();
        assert_eq!(msaa.width(), 16 * MSAA_SAMPLE_COUNT as u32);
        assert_eq!(msaa.height(), 8);
    }

    #[test]
    fn test_set_render_target_too_many_mrt() {
        let mut ctx = RenderContext::new();
        let err = ctx.set_render_target(16, 16, 5, false);
        assert!(err.is_err());
        // No state mutated on failure.
        assert!(ctx.depth_buffer().is_none());
    }

    #[test]
    fn test_set_render_target_zero_dims() {
        let mut ctx = RenderContext::new();
        assert!(ctx.set_render_target(0, 16, 1, false).is_err());
        assert!(ctx.depth_buffer().is_none());
    }

    #[test]
    fn test_set_render_target_rejects_non_color_format() {
        let mut ctx = RenderContext::new();
        assert!(ctx
            .set_render_target_with_format(8, 8, 1, false, PixelFormat::U16)
            .is_err());
        assert!(ctx.depth_buffer().is_none());

        ctx.set_render_target_with_format(8, 8, 1, false, PixelFormat::RgbaF32)
            .unwrap();
        assert_eq!(
            ctx.color_buffer(0).unwrap().format(),
            PixelFormat::RgbaF32
        );
    }

    #[test]
    fn test_clear_separates_depth_from_color() {
        let mut ctx = RenderContext::new();
        ctx.set_render_target(4, 4, 1, false).unwrap();
        ctx.clear_render_target(Vec4::new(0.2, 0.4, 0.6, 1.0));

        assert_eq!(ctx.depth_buffer().unwrap().read_scalar(2, 2), Some(1.0));
        let c = ctx.color_buffer(0).unwrap().read_rgba(2, 2).unwrap();
        assert!((c[0] - 0.2).abs() <= 1.0 / 255.0);
        assert!((c[1] - 0.4).abs() <= 1.0 / 255.0);
        assert!((c[2] - 0.6).abs() <= 1.0 / 255.0);
    }

    #[test]
    fn test_ndc_to_screen_flips_y_once() {
        let mut ctx = RenderContext::new();
        ctx.set_viewport(0, 0, 600, 600);

        // NDC (-0.5, -0.5) lands at (150, 450): x maps directly, y flips.
        let s = ctx.ndc_to_screen(Vec3::new(-0.5, -0.5, 1.0));
        assert!((s.x - 150.0).abs() < 1e-4);
        assert!((s.y - 450.0).abs() < 1e-4);
        assert!((s.z - 1.0).abs() < 1e-6);

        let top = ctx.ndc_to_screen(Vec3::new(0.0, 1.0, 0.0));
        assert!((top.y - 0.0).abs() < 1e-4);
        assert!((top.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_depth_test_less_equal() {
        let mut ctx = RenderContext::new();
        // Unbound target: nothing to test against.
        assert!(!ctx.depth_test_and_override(0, 0, 0.5));

        ctx.set_render_target(4, 4, 1, false).unwrap();
        ctx.clear_render_target(Vec4::ZERO);

        assert!(ctx.depth_test_and_override(1, 1, 0.5));
        assert!(!ctx.depth_test_and_override(1, 1, 0.7));
        // Equal depth passes and the later write wins.
        assert!(ctx.depth_test_and_override(1, 1, 0.5));
        assert!(ctx.depth_test_and_override(1, 1, 0.2));
        assert_eq!(ctx.depth_buffer().unwrap().read_scalar(1, 1), Some(0.2));
    }

    #[test]
    fn test_resolve_averages_samples() {
        let mut ctx = RenderContext::new();
        ctx.set_render_target(2, 1, 1, true).unwrap();
        ctx.clear_render_target(Vec4::ZERO);

        let targets = ctx.targets().unwrap();
        // Cover half the samples of pixel 0 with white.
        let mut out = PsOutput::new();
        out.color_count = 1;
        out.colors[0] = Vec4::ONE;
        targets.write_colors_msaa(0, 0, &out, 0b0011);
        targets.depth_test_and_override_msaa(0, 0, 0.5, 0);
        targets.depth_test_and_override_msaa(0, 0, 0.5, 1);

        ctx.end_frame();

        let c = ctx.color_buffer(0).unwrap().read_rgba(0, 0).unwrap();
        assert!((c[0] - 0.5).abs() <= 1.0 / 255.0, "{c:?}");
        let d = ctx.depth_buffer().unwrap().read_scalar(0, 0).unwrap();
        assert!((d - 0.75).abs() < 1e-6); // (0.5 + 0.5 + 1 + 1) / 4
    }

    #[test]
    fn test_matrices_update() {
        let mut ctx = RenderContext::new();
        let mv = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        ctx.set_modelview(mv);
        assert_eq!(ctx.matrices().mvp, mv);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        ctx.set_projection(proj);
        assert_eq!(ctx.matrices().mvp, proj * mv);
    }
}

// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Frame performance counters.
//!
//! Tile workers accumulate per-command totals locally and publish them with
//! one atomic add per command, so the counters never serialize the pipeline.
//! `begin_frame` resets everything; `snapshot` returns plain numbers for
//! host logging.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared frame counters. All updates use relaxed ordering; the frame drain
/// barrier orders them before the host reads a snapshot.
#[derive(Default)]
pub struct RenderStats {
    triangles: AtomicU64,
    vertices: AtomicU64,
    rejected_triangles: AtomicU64,
    culled_triangles: AtomicU64,
    tiles_dispatched: AtomicU64,
    depth_tests: AtomicU64,
    depth_passes: AtomicU64,
    pixels_shaded: AtomicU64,
}

/// Plain-number view of [`RenderStats`] at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub triangles: u64,
    pub vertices: u64,
    pub rejected_triangles: u64,
    pub culled_triangles: u64,
    pub tiles_dispatched: u64,
    pub depth_tests: u64,
    pub depth_passes: u64,
    pub pixels_shaded: u64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.triangles.store(0, Ordering::Relaxed);
        self.vertices.store(0, Ordering::Relaxed);
        self.rejected_triangles.store(0, Ordering::Relaxed);
        self.culled_triangles.store(0, Ordering::Relaxed);
        self.tiles_dispatched.store(0, Ordering::Relaxed);
        self.depth_tests.store(0, Ordering::Relaxed);
        self.depth_passes.store(0, Ordering::Relaxed);
        self.pixels_shaded.store(0, Ordering::Relaxed);
    }

    pub fn add_triangle(&self) {
        self.triangles.fetch_add(1, Ordering::Relaxed);
        self.vertices.fetch_add(3, Ordering::Relaxed);
    }

    /// Triangle discarded before setup (frustum, clip, degenerate, empty
    /// bounding box).
    pub fn add_rejected(&self) {
        self.rejected_triangles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_culled(&self) {
        self.culled_triangles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tiles_dispatched(&self, count: u64) {
        self.tiles_dispatched.fetch_add(count, Ordering::Relaxed);
    }

    /// Publish the totals a worker accumulated over one tile command.
    pub fn add_tile_totals(&self, depth_tests: u64, depth_passes: u64, pixels_shaded: u64) {
        self.depth_tests.fetch_add(depth_tests, Ordering::Relaxed);
        self.depth_passes.fetch_add(depth_passes, Ordering::Relaxed);
        self.pixels_shaded.fetch_add(pixels_shaded, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            triangles: self.triangles.load(Ordering::Relaxed),
            vertices: self.vertices.load(Ordering::Relaxed),
            rejected_triangles: self.rejected_triangles.load(Ordering::Relaxed),
            culled_triangles: self.culled_triangles.load(Ordering::Relaxed),
            tiles_dispatched: self.tiles_dispatched.load(Ordering::Relaxed),
            depth_tests: self.depth_tests.load(Ordering::Relaxed),
            depth_passes: self.depth_passes.load(Ordering::Relaxed),
            pixels_shaded: self.pixels_shaded.load(Ordering::Relaxed),
        }
    }
}

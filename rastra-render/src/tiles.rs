// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tile scheduler: a fixed grid of worker threads fed through bounded
//! per-tile command queues.
//!
//! The screen is split into a `TILE_GRID_X x TILE_GRID_Y` grid; each tile
//! owns one single-producer/single-consumer ring and one worker thread. The
//! producer (draw submission) blocks while a ring is full, workers block
//! while theirs is empty, and `drain` blocks the producer until every ring
//! has emptied (the frame barrier). Shutdown is cooperative: a `Terminate`
//! sentinel per queue, then join.
//!
//! Because a pixel belongs to exactly one tile, workers never write the same
//! framebuffer cell; within one tile, commands run in enqueue order, which
//! makes the per-pixel depth result deterministic.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use rastra_common::Rect;

use crate::context::RenderTargets;
use crate::pipeline::{self, TriangleSetup};
use crate::shader::{PixelShader, PixelShaderContext};
use crate::stats::RenderStats;

/// Horizontal tile count.
pub const TILE_GRID_X: usize = 6;
/// Vertical tile count.
pub const TILE_GRID_Y: usize = 6;
/// Commands a tile ring holds before the producer blocks.
pub const TILE_QUEUE_CAPACITY: usize = 32;

/// Integer pixel bounds of a tile job, `x0/y0` inclusive, `x1/y1` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

/// Immutable snapshot a tile worker needs to rasterize one triangle within
/// one tile rectangle. The producer may rebind context state for subsequent
/// draws while workers still hold earlier snapshots.
#[derive(Clone)]
pub struct TileContext {
    pub setup: TriangleSetup,
    pub rect: TileRect,
    pub targets: RenderTargets,
    pub pixel_shader: Arc<dyn PixelShader>,
    pub shader_ctx: PixelShaderContext,
    pub stats: Arc<RenderStats>,
}

/// One unit of tile work.
pub enum TileCommand {
    Rasterize(TileContext),
    RasterizeMsaa(TileContext),
    Terminate,
}

struct RingState {
    queue: VecDeque<TileCommand>,
    /// The worker has dequeued a command and not yet finished it. `drain`
    /// must also wait for this, or the frame barrier could return while the
    /// last command of a tile is still shading pixels.
    busy: bool,
}

/// Bounded SPSC command ring guarded by a mutex + condvar pair. All three
/// waits (full, empty, drain) share the one condvar; every transition
/// notifies.
pub(crate) struct CommandRing {
    state: Mutex<RingState>,
    cond: Condvar,
}

impl CommandRing {
    fn new() -> Self {
        Self {
            state: Mutex::new(RingState {
                queue: VecDeque::with_capacity(TILE_QUEUE_CAPACITY),
                busy: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Append a command, blocking while the ring is full.
    pub(crate) fn enqueue(&self, cmd: TileCommand) {
        let mut state = self.state.lock();
        while state.queue.len() >= TILE_QUEUE_CAPACITY {
            self.cond.wait(&mut state);
        }
        state.queue.push_back(cmd);
        self.cond.notify_all();
    }

    /// Remove the oldest command, blocking while the ring is empty. Marks
    /// the ring busy until [`CommandRing::complete`].
    pub(crate) fn dequeue(&self) -> TileCommand {
        let mut state = self.state.lock();
        while state.queue.is_empty() {
            self.cond.wait(&mut state);
        }
        let cmd = state.queue.pop_front().expect("ring not empty");
        state.busy = true;
        self.cond.notify_all();
        cmd
    }

    /// Mark the previously dequeued command finished.
    pub(crate) fn complete(&self) {
        let mut state = self.state.lock();
        state.busy = false;
        self.cond.notify_all();
    }

    /// Block until the ring is empty and its worker idle.
    pub(crate) fn wait_empty(&self) {
        let mut state = self.state.lock();
        while !state.queue.is_empty() || state.busy {
            self.cond.wait(&mut state);
        }
    }
}

/// The worker grid. Owned by the render context; dropping it terminates and
/// joins every worker.
pub struct TileScheduler {
    queues: Arc<Vec<CommandRing>>,
    workers: Vec<JoinHandle<()>>,
}

impl TileScheduler {
    /// Spawn one worker per tile.
    pub fn start() -> Self {
        let queues: Arc<Vec<CommandRing>> =
            Arc::new((0..TILE_GRID_X * TILE_GRID_Y).map(|_| CommandRing::new()).collect());

        let workers = (0..TILE_GRID_X * TILE_GRID_Y)
            .map(|index| {
                let queues = queues.clone();
                std::thread::Builder::new()
                    .name(format!("tile-{}-{}", index % TILE_GRID_X, index / TILE_GRID_X))
                    .spawn(move || worker_loop(&queues[index]))
                    .expect("spawn tile worker")
            })
            .collect();

        log::debug!("tile scheduler started ({TILE_GRID_X}x{TILE_GRID_Y} workers)");
        Self { queues, workers }
    }

    /// Enqueue a command onto tile `(tx, ty)`.
    pub(crate) fn enqueue(&self, tx: usize, ty: usize, cmd: TileCommand) {
        self.queues[ty * TILE_GRID_X + tx].enqueue(cmd);
    }

    /// Block until every tile ring is empty.
    pub fn drain(&self) {
        for queue in self.queues.iter() {
            queue.wait_empty();
        }
    }

    fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for queue in self.queues.iter() {
            queue.enqueue(TileCommand::Terminate);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        log::debug!("tile scheduler stopped");
    }
}

impl Drop for TileScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(queue: &CommandRing) {
    loop {
        let cmd = queue.dequeue();
        let terminate = matches!(cmd, TileCommand::Terminate);
        match &cmd {
            TileCommand::Rasterize(ctx) => pipeline::rasterize_tile(ctx),
            TileCommand::RasterizeMsaa(ctx) => pipeline::rasterize_tile_msaa(ctx),
            TileCommand::Terminate => {}
        }
        queue.complete();
        if terminate {
            break;
        }
    }
}

/// Pixel column boundaries of the tile grid over a viewport: `TILE_GRID_X + 1`
/// ascending edges, tile `j` spanning `[x[j], x[j + 1])`. The step truncates
/// to whole pixels; the last tile absorbs the remainder, so every pixel falls
/// in exactly one tile.
pub(crate) fn tile_edges(min: f32, max: f32, tiles: usize) -> Vec<f32> {
    let step = ((max - min) / tiles as f32).floor();
    let mut edges = Vec::with_capacity(tiles + 1);
    edges.push(min);
    for k in 1..tiles {
        edges.push(edges[k - 1] + step);
    }
    edges.push(max);
    edges
}

/// Bin a screen rectangle over the tile grid of `viewport`, yielding
/// `(tx, ty, clipped_rect)` for every tile the rectangle touches.
pub(crate) fn for_each_tile(
    viewport: &Rect,
    bounds: &Rect,
    mut f: impl FnMut(usize, usize, TileRect),
) {
    let xs = tile_edges(viewport.min_x, viewport.max_x, TILE_GRID_X);
    let ys = tile_edges(viewport.min_y, viewport.max_y, TILE_GRID_Y);

    for ty in 0..TILE_GRID_Y {
        let row = Rect::new(viewport.min_x, ys[ty], viewport.max_x, ys[ty + 1]);
        if row.intersect(bounds).is_none() {
            continue;
        }
        for tx in 0..TILE_GRID_X {
            let tile = Rect::new(xs[tx], ys[ty], xs[tx + 1], ys[ty + 1]);
            if let Some(hit) = tile.intersect(bounds) {
                f(
                    tx,
                    ty,
                    TileRect {
                        x0: hit.min_x as i32,
                        y0: hit.min_y as i32,
                        x1: hit.max_x as i32,
                        y1: hit.max_y as i32,
                    },
                );
            }
        }
    }
}

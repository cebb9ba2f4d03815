// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Demo host for the rastra software rasterizer.
//!
//! Renders a built-in scene offline and writes color target 0 as a PNG.
//! This binary plays the host role end to end: configure the context, tick
//! frames, submit draws, then read the resolved color buffer back.

mod scene;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use glam::Vec4;
use log::info;

use rastra_render::{Buffer2D, RenderContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SceneKind {
    /// A single colored triangle in clip space.
    Triangle,
    /// A rotating lit, textured cube under a perspective camera.
    Cube,
    /// Three spinning cubes with per-face colors.
    Cubes,
}

/// rastra - CPU software rasterizer demo
#[derive(Parser, Debug)]
#[command(name = "rastra", version, about = "CPU software rasterizer demo")]
struct Args {
    /// Render target width in pixels
    #[arg(long, default_value_t = 600)]
    width: u32,

    /// Render target height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Scene to render
    #[arg(long, value_enum, default_value_t = SceneKind::Cube)]
    scene: SceneKind,

    /// Number of frames to render (the cube rotates per frame; the last
    /// frame is written to the output file)
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Enable 4x MSAA
    #[arg(long)]
    msaa: bool,

    /// Rasterize on the tile worker grid instead of the calling thread
    #[arg(long)]
    multithread: bool,

    /// Output PNG path
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!(
        "rastra demo: {:?} scene, {}x{}, msaa={}, multithread={}",
        args.scene, args.width, args.height, args.msaa, args.multithread
    );

    let mut ctx = RenderContext::new();
    ctx.set_render_target(args.width, args.height, 1, args.msaa)
        .context("allocating render targets")?;
    ctx.set_viewport(0, 0, args.width, args.height);
    if args.multithread {
        ctx.enable_multi_threads();
    }

    let aspect = args.width as f32 / args.height as f32;
    for frame in 0..args.frames.max(1) {
        let frame_start = std::time::Instant::now();
        let angle = frame as f32 * 0.05;

        ctx.begin_frame();
        ctx.clear_render_target(Vec4::new(0.05, 0.05, 0.08, 1.0));

        match args.scene {
            SceneKind::Triangle => scene::draw_triangle_scene(&mut ctx),
            SceneKind::Cube => scene::draw_cube_scene(&mut ctx, aspect, angle)?,
            SceneKind::Cubes => scene::draw_cubes_scene(&mut ctx, aspect, angle),
        }

        ctx.end_frame();

        let stats = ctx.stats();
        info!(
            "frame {frame}: {:.2} ms, {} triangles, {} tiles, {} depth tests, {} pixels shaded",
            frame_start.elapsed().as_secs_f64() * 1000.0,
            stats.triangles,
            stats.tiles_dispatched,
            stats.depth_tests,
            stats.pixels_shaded
        );
    }

    let color = ctx
        .color_buffer(0)
        .context("no color buffer to write out")?;
    save_png(color, &args.output)?;
    info!("wrote {}", args.output.display());

    Ok(())
}

/// Write an RGBA8 color buffer as a PNG. Buffer rows already run top-down.
fn save_png(buffer: &Buffer2D, path: &PathBuf) -> Result<()> {
    let image = image::RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.bytes().to_vec())
        .context("color buffer size mismatch")?;
    image.save(path).context("writing PNG")?;
    Ok(())
}

// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

/// Configuration errors surfaced by setup calls.
///
/// Per-pixel operations never return these; they report failure through
/// `Option`/`bool` so the hot path stays branch-cheap. A failed setup call
/// leaves the context unchanged.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render target dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("requested {requested} color targets, maximum is {maximum}")]
    TooManyRenderTargets { requested: u32, maximum: u32 },

    #[error("pixel format {0:?} does not support this operation")]
    UnsupportedFormat(crate::types::PixelFormat),

    #[error("invalid mesh: {reason}")]
    InvalidMesh { reason: String },
}

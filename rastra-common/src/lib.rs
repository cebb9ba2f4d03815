// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod error;
pub mod simd;
pub mod types;

pub use error::RenderError;
pub use types::*;

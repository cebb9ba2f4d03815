// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Materials bound alongside the shader pair.
//!
//! The core only interprets the diffuse texture; any further meaning of a
//! material is an agreement between the host and its pixel shaders.

use std::sync::Arc;

use crate::buffer::Buffer2D;

/// Texture set referenced by the bound pixel shader.
#[derive(Default, Clone)]
pub struct Material {
    pub diffuse_texture: Option<Arc<Buffer2D>>,
    pub normal_texture: Option<Arc<Buffer2D>>,
}

impl Material {
    /// Material with a single diffuse texture.
    pub fn with_diffuse(texture: Arc<Buffer2D>) -> Self {
        Self {
            diffuse_texture: Some(texture),
            normal_texture: None,
        }
    }
}

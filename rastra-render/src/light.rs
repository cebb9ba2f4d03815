// SPDX-FileCopyrightText: 2025 rastra contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Light sources consumed by the lit shader pair.

use glam::{Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
}

/// A single light, bound on the context and snapshotted into pixel-shader
/// state. For point lights `position` is a view-space location (w = 1); for
/// directional lights it holds the direction toward the light (w = 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub position: Vec4,
}

impl Light {
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            position: position.extend(1.0),
        }
    }

    pub fn directional(toward_light: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            position: toward_light.extend(0.0),
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::point(Vec3::ZERO, Vec3::ONE)
    }
}

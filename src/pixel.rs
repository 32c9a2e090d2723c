// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

//! Per-pixel life-cycle encoding.
//!
//! Every grid cell is one RGBA8 texel:
//! - R: life stage (255 alive, 1..=254 dying countdown, 0 dead)
//! - G: stage timer (dead pixels count it down to zombification)
//! - B: 255 marks a zombie, anything else is harmless
//! - A: always 255
//!
//! The functions here are the CPU reference of `shaders/pixel_life.wgsl` and
//! must stay in lock-step with it.

pub type Texel = [u8; 4];

pub const BYTES_PER_TEXEL: usize = 4;

pub const ALIVE: Texel = [255, 255, 127, 255];
pub const DYING: Texel = [254, 255, 0, 255];
pub const DEAD: Texel = [0, 255, 0, 255];
pub const ZOMBIE: Texel = [0, 0, 255, 255];

pub const ALIVE_STAGE: u8 = 255;
pub const ZOMBIE_FLAG: u8 = 255;

/// Fixed Moore neighborhood, row-major around the centre.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelState {
    Alive,
    Dying,
    Dead,
    Zombie,
}

impl PixelState {
    #[inline]
    pub fn of(texel: Texel) -> Self {
        if texel[2] == ZOMBIE_FLAG {
            PixelState::Zombie
        } else if texel[0] == ALIVE_STAGE {
            PixelState::Alive
        } else if texel[0] > 0 {
            PixelState::Dying
        } else {
            PixelState::Dead
        }
    }
}

#[inline]
pub fn is_alive(texel: Texel) -> bool {
    texel[0] == ALIVE_STAGE
}

#[inline]
pub fn is_zombie(texel: Texel) -> bool {
    texel[2] == ZOMBIE_FLAG
}

/// Timer decrement applied to dead pixels each step.
///
/// Zero disables zombification. NaN counts as zero.
#[inline]
pub fn zombify_step(speed: f32) -> u8 {
    if speed.is_nan() {
        return 0;
    }
    (speed.clamp(0.0, 1.0) * 255.0).floor() as u8
}

/// Next state of one texel given its zombie-neighbor count.
pub fn transition(texel: Texel, zombie_neighbors: u32, step: u8) -> Texel {
    if is_zombie(texel) {
        return texel;
    }
    let [r, g, _, a] = texel;
    if r == ALIVE_STAGE {
        return if zombie_neighbors > 0 { DYING } else { texel };
    }
    if r > 0 {
        return [r - 1, g, 0, a];
    }
    if step == 0 {
        return texel;
    }
    let timer = g.saturating_sub(step);
    if timer == 0 {
        ZOMBIE
    } else {
        [0, timer, 0, a]
    }
}

/// Whether a texel centre lies inside the kill brush.
///
/// `point` is normalized over the grid, distances are aspect-corrected so the
/// brush stays round on non-square grids.
#[inline]
pub fn inside_kill_brush(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    point: [f32; 2],
    radius: f32,
) -> bool {
    let aspect = width as f32 / height as f32;
    let u = (x as f32 + 0.5) / width as f32;
    let v = (y as f32 + 0.5) / height as f32;
    let dx = (u - point[0]) * aspect;
    let dy = v - point[1];
    (dx * dx + dy * dy).sqrt() < radius
}

/// Signed distance to a rounded box centred on the origin.
#[inline]
pub fn sd_rounded_box(p: [f32; 2], half_extent: [f32; 2], corner: f32) -> f32 {
    let corner = corner.min(half_extent[0]).min(half_extent[1]).max(0.0);
    let qx = p[0].abs() - half_extent[0] + corner;
    let qy = p[1].abs() - half_extent[1] + corner;
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - corner
}

/// Axis-aligned heal rectangle in grid pixels, `(x, y)` is its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub corner_radius: f32,
}

impl HealRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            corner_radius: 0.0,
        }
    }

    pub fn with_corner_radius(mut self, corner_radius: f32) -> Self {
        self.corner_radius = corner_radius;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> [f32; 2] {
        [
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        ]
    }

    pub fn half_extent(&self) -> [f32; 2] {
        [self.width.max(0) as f32 * 0.5, self.height.max(0) as f32 * 0.5]
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if self.is_empty() {
            return false;
        }
        let c = self.center();
        let p = [x as f32 + 0.5 - c[0], y as f32 + 0.5 - c[1]];
        sd_rounded_box(p, self.half_extent(), self.corner_radius) < 0.0
    }
}

// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

use crate::error::{Result, SimulationError};
use crate::pixel::{HealRect, ALIVE, BYTES_PER_TEXEL, DEAD};

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const MAX_SIDE: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
            return Err(SimulationError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_TEXEL
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Dead pixels stamped into a fresh grid.
///
/// No randomness: the same size and seed list always produce the same image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPattern {
    points: Vec<[u32; 2]>,
}

impl SeedPattern {
    /// Single dead pixel in the middle of the grid.
    pub fn centered(size: GridSize) -> Self {
        Self {
            points: vec![[size.width / 2, size.height / 2]],
        }
    }

    /// Explicit seed list; points outside the grid and duplicates are dropped.
    pub fn from_points(size: GridSize, points: &[[u32; 2]]) -> Self {
        let mut kept: Vec<[u32; 2]> = Vec::with_capacity(points.len());
        for p in points {
            if p[0] < size.width && p[1] < size.height && !kept.contains(p) {
                kept.push(*p);
            }
        }
        Self { points: kept }
    }

    pub fn points(&self) -> &[[u32; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Alive everywhere except the seed pixels, which start dead with a full timer.
pub fn initial_image(size: GridSize, seeds: &SeedPattern) -> Vec<u8> {
    let mut data = Vec::with_capacity(size.byte_len());
    for _ in 0..size.pixel_count() {
        data.extend_from_slice(&ALIVE);
    }
    for &[x, y] in seeds.points() {
        let i = size.index(x, y) * BYTES_PER_TEXEL;
        data[i..i + BYTES_PER_TEXEL].copy_from_slice(&DEAD);
    }
    data
}

/// Kill brush in normalized grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillBrush {
    pub point: [f32; 2],
    pub radius: f32,
}

/// A pair of read/write state surfaces plus the passes that mutate them.
///
/// Every mutating pass reads the committed surface, writes the other one, and
/// swaps roles when done, so no pass observes its own writes.
pub trait GridBackend {
    fn size(&self) -> GridSize;

    /// Overwrite the committed surface with `data` (RGBA8, row-major).
    fn upload(&mut self, data: &[u8]) -> Result<()>;

    /// One full-grid transition step with the given dead-timer decrement.
    fn simulate(&mut self, zombify_step: u8) -> Result<()>;

    fn kill(&mut self, brush: KillBrush) -> Result<()>;

    fn heal(&mut self, rect: HealRect) -> Result<()>;

    /// Blocking copy of the committed surface into `out` (resized to fit).
    fn read_back(&mut self, out: &mut Vec<u8>) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

use crate::grid::GridSize;
use crate::pixel::{PixelState, Texel, ALIVE_STAGE, BYTES_PER_TEXEL};

/// Fraction of alive pixels under which the screen counts as lost.
pub const DEFAULT_MOST_DEAD_ALIVE_FRACTION: f32 = 0.1;

/// Aggregates derived from one full read-back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    pub total: u32,
    pub alive: u32,
}

impl PixelStats {
    /// Full scan; alive means `R == 255`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let alive = bytes
            .chunks_exact(BYTES_PER_TEXEL)
            .filter(|t| t[0] == ALIVE_STAGE)
            .count() as u32;
        Self {
            total: (bytes.len() / BYTES_PER_TEXEL) as u32,
            alive,
        }
    }

    pub fn dead(&self) -> u32 {
        self.total - self.alive
    }

    pub fn dead_ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.dead() as f32 / self.total as f32
    }

    pub fn all_alive(&self) -> bool {
        self.alive == self.total
    }

    pub fn most_dead(&self, alive_fraction: f32) -> bool {
        (self.alive as f32) < self.total as f32 * alive_fraction
    }
}

/// Host copy of the committed grid, valid until the next mutating call.
#[derive(Debug, Clone)]
pub struct Snapshot {
    size: GridSize,
    bytes: Vec<u8>,
}

impl Snapshot {
    pub fn new(size: GridSize, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), size.byte_len());
        Self { size, bytes }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Texel at `(x, y)`, `None` outside the grid.
    pub fn texel(&self, x: u32, y: u32) -> Option<Texel> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = self.size.index(x, y) * BYTES_PER_TEXEL;
        let t = self.bytes.get(i..i + BYTES_PER_TEXEL)?;
        Some([t[0], t[1], t[2], t[3]])
    }

    pub fn state(&self, x: u32, y: u32) -> Option<PixelState> {
        self.texel(x, y).map(PixelState::of)
    }

    /// Square neighborhood of `2 * half + 1` pixels per side around `(cx, cy)`,
    /// row-major, coordinates clamped to the grid.
    pub fn crop(&self, cx: i32, cy: i32, half: u32) -> Vec<PixelState> {
        let half = half as i32;
        let max_x = self.size.width as i32 - 1;
        let max_y = self.size.height as i32 - 1;
        let mut out = Vec::with_capacity(((2 * half + 1) * (2 * half + 1)) as usize);
        for dy in -half..=half {
            for dx in -half..=half {
                let x = (cx + dx).clamp(0, max_x) as u32;
                let y = (cy + dy).clamp(0, max_y) as u32;
                let i = self.size.index(x, y) * BYTES_PER_TEXEL;
                out.push(PixelState::of([
                    self.bytes[i],
                    self.bytes[i + 1],
                    self.bytes[i + 2],
                    self.bytes[i + 3],
                ]));
            }
        }
        out
    }

    pub fn count(&self, state: PixelState) -> usize {
        self.bytes
            .chunks_exact(BYTES_PER_TEXEL)
            .filter(|t| PixelState::of([t[0], t[1], t[2], t[3]]) == state)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{ALIVE, DEAD, DYING, ZOMBIE};

    fn snapshot_of(size: GridSize, texels: &[Texel]) -> Snapshot {
        Snapshot::new(size, texels.iter().flatten().copied().collect())
    }

    #[test]
    fn stats_count_alive_by_red_channel() {
        let stats = PixelStats::from_bytes(&[ALIVE, DYING, DEAD, ZOMBIE].concat());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.alive, 1);
        assert_eq!(stats.dead(), 3);
        assert!((stats.dead_ratio() - 0.75).abs() < f32::EPSILON);
        assert!(!stats.all_alive());
    }

    #[test]
    fn most_dead_threshold_is_strict() {
        let stats = PixelStats { total: 100, alive: 10 };
        assert!(!stats.most_dead(0.1));
        let stats = PixelStats { total: 100, alive: 9 };
        assert!(stats.most_dead(0.1));
    }

    #[test]
    fn crop_clamps_at_edges() {
        let size = GridSize::new(2, 2).unwrap();
        let snap = snapshot_of(size, &[ZOMBIE, ALIVE, ALIVE, DEAD]);
        let crop = snap.crop(0, 0, 1);
        assert_eq!(crop.len(), 9);
        // Top-left 2x2 of the crop all clamp to (0, 0).
        assert_eq!(crop[0], PixelState::Zombie);
        assert_eq!(crop[1], PixelState::Zombie);
        assert_eq!(crop[3], PixelState::Zombie);
        assert_eq!(crop[8], PixelState::Dead);
    }

    #[test]
    fn texel_outside_grid_is_none() {
        let size = GridSize::new(2, 1).unwrap();
        let snap = snapshot_of(size, &[ALIVE, DEAD]);
        assert_eq!(snap.state(1, 0), Some(PixelState::Dead));
        assert_eq!(snap.texel(2, 0), None);
        assert_eq!(snap.count(PixelState::Alive), 1);
    }
}

// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

//! Host-memory backend.
//!
//! Same passes as the GPU version, executed as a sequential stencil over two
//! byte buffers. Used for headless runs, tests and as the parity reference.

use crate::error::{Result, SimulationError};
use crate::grid::{GridBackend, GridSize, KillBrush};
use crate::pixel::{
    self, HealRect, Texel, ALIVE, BYTES_PER_TEXEL, DYING, NEIGHBOR_OFFSETS,
};

pub struct CpuGrid {
    size: GridSize,
    front: Vec<u8>,
    back: Vec<u8>,
}

impl CpuGrid {
    pub fn new(size: GridSize, initial: &[u8]) -> Result<Self> {
        let mut grid = Self {
            size,
            front: vec![0; size.byte_len()],
            back: vec![0; size.byte_len()],
        };
        grid.upload(initial)?;
        Ok(grid)
    }

    /// Committed state, valid until the next pass.
    pub fn current(&self) -> &[u8] {
        &self.front
    }

    #[inline]
    fn texel(&self, x: u32, y: u32) -> Texel {
        let i = self.size.index(x, y) * BYTES_PER_TEXEL;
        [
            self.front[i],
            self.front[i + 1],
            self.front[i + 2],
            self.front[i + 3],
        ]
    }

    /// Zombie count over the Moore neighborhood, clamp-to-edge addressing.
    fn zombie_neighbors(&self, x: u32, y: u32) -> u32 {
        let max_x = self.size.width as i32 - 1;
        let max_y = self.size.height as i32 - 1;
        NEIGHBOR_OFFSETS
            .iter()
            .filter(|(dx, dy)| {
                let nx = (x as i32 + dx).clamp(0, max_x) as u32;
                let ny = (y as i32 + dy).clamp(0, max_y) as u32;
                pixel::is_zombie(self.texel(nx, ny))
            })
            .count() as u32
    }

    /// Writes `f(x, y, old)` for every texel into the back buffer, then swaps.
    fn run_pass<F>(&mut self, mut f: F)
    where
        F: FnMut(&Self, u32, u32, Texel) -> Texel,
    {
        let mut back = std::mem::take(&mut self.back);
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                let next = f(self, x, y, self.texel(x, y));
                let i = self.size.index(x, y) * BYTES_PER_TEXEL;
                back[i..i + BYTES_PER_TEXEL].copy_from_slice(&next);
            }
        }
        self.back = std::mem::replace(&mut self.front, back);
    }
}

impl GridBackend for CpuGrid {
    fn size(&self) -> GridSize {
        self.size
    }

    fn upload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.size.byte_len() {
            return Err(SimulationError::Settings(format!(
                "upload of {} bytes into a {}x{} grid",
                data.len(),
                self.size.width,
                self.size.height
            )));
        }
        self.front.copy_from_slice(data);
        Ok(())
    }

    fn simulate(&mut self, zombify_step: u8) -> Result<()> {
        self.run_pass(|grid, x, y, old| {
            // Only alive pixels care about their neighbors.
            let zombies = if pixel::is_alive(old) && !pixel::is_zombie(old) {
                grid.zombie_neighbors(x, y)
            } else {
                0
            };
            pixel::transition(old, zombies, zombify_step)
        });
        Ok(())
    }

    fn kill(&mut self, brush: KillBrush) -> Result<()> {
        let GridSize { width, height } = self.size;
        self.run_pass(|_, x, y, old| {
            if pixel::inside_kill_brush(x, y, width, height, brush.point, brush.radius) {
                DYING
            } else {
                old
            }
        });
        Ok(())
    }

    fn heal(&mut self, rect: HealRect) -> Result<()> {
        self.run_pass(|_, x, y, old| if rect.contains(x, y) { ALIVE } else { old });
        Ok(())
    }

    fn read_back(&mut self, out: &mut Vec<u8>) -> Result<()> {
        out.clear();
        out.extend_from_slice(&self.front);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "cpu"
    }
}

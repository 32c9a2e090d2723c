// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

//! Per-frame orchestration of the pixel passes.
//!
//! Every mutating call runs its pass and then commits: a blocking read-back of
//! the new state followed by a full recount. Queries only ever read the values
//! cached at the last successful commit.

use std::collections::VecDeque;

use crate::cpu::CpuGrid;
use crate::error::Result;
use crate::gpu::GpuGrid;
use crate::grid::{initial_image, GridBackend, GridSize, KillBrush, SeedPattern};
use crate::pixel::{self, HealRect};
use crate::settings::SimulationSettings;
use crate::snapshot::{PixelStats, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    /// Kill around a normalized point.
    Press { x: f32, y: f32 },
    /// Heal a rectangle in grid pixels.
    Heal { x: i32, y: i32, width: i32, height: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Net alive-pixel change from heals applied this frame.
    pub healed: i64,
    pub outcome: Outcome,
}

pub struct Simulation<B: GridBackend> {
    backend: B,
    seeds: SeedPattern,
    kill_radius: f32,
    heal_corner_radius: f32,
    most_dead_alive_fraction: f32,

    snapshot: Snapshot,
    scratch: Vec<u8>,
    stats: PixelStats,
    generation: u64,
    last_commit_failed: bool,
    pending: VecDeque<Interaction>,
}

impl Simulation<CpuGrid> {
    pub fn cpu(settings: &SimulationSettings) -> Result<Self> {
        let size = settings.grid_size()?;
        let seeds = settings.seed_pattern(size);
        let backend = CpuGrid::new(size, &initial_image(size, &seeds))?;
        Self::new(backend, seeds, settings)
    }
}

impl Simulation<GpuGrid> {
    pub fn gpu(settings: &SimulationSettings) -> Result<Self> {
        let size = settings.grid_size()?;
        let seeds = settings.seed_pattern(size);
        let backend = GpuGrid::new(size, &initial_image(size, &seeds))?;
        Self::new(backend, seeds, settings)
    }

    /// State texture most recently committed, for display and lens shaders.
    pub fn texture(&self) -> &wgpu::Texture {
        self.backend.current_texture()
    }
}

impl<B: GridBackend> Simulation<B> {
    /// Wraps an already seeded backend and performs the first commit.
    ///
    /// A failed first read-back is fatal: there is nothing to fall back to.
    pub fn new(mut backend: B, seeds: SeedPattern, settings: &SimulationSettings) -> Result<Self> {
        let size = backend.size();
        let mut bytes = Vec::with_capacity(size.byte_len());
        backend.read_back(&mut bytes)?;
        let stats = PixelStats::from_bytes(&bytes);
        log::info!(
            "Simulation ready on {} backend: {}x{}, {} seed pixel(s), {} alive",
            backend.backend_name(),
            size.width,
            size.height,
            seeds.len(),
            stats.alive
        );
        Ok(Self {
            backend,
            seeds,
            kill_radius: settings.kill_radius,
            heal_corner_radius: settings.heal_corner_radius,
            most_dead_alive_fraction: settings.most_dead_alive_fraction,
            snapshot: Snapshot::new(size, bytes),
            scratch: Vec::with_capacity(size.byte_len()),
            stats,
            generation: 0,
            last_commit_failed: false,
            pending: VecDeque::new(),
        })
    }

    /// Advance the automaton one step. `zombification_speed` is clamped to [0, 1].
    pub fn simulate(&mut self, zombification_speed: f32) {
        let step = pixel::zombify_step(zombification_speed);
        if let Err(err) = self.backend.simulate(step) {
            log::warn!("Transition pass failed: {}", err);
            return;
        }
        self.generation += 1;
        self.commit();
    }

    /// Kill around a normalized click position.
    pub fn press_screen(&mut self, normalized_x: f32, normalized_y: f32) {
        let brush = KillBrush {
            point: [normalized_x, normalized_y],
            radius: self.kill_radius,
        };
        if let Err(err) = self.backend.kill(brush) {
            log::warn!("Kill pass failed: {}", err);
            return;
        }
        self.commit();
    }

    /// Heal the rectangle whose top-left corner is `(x, y)`.
    ///
    /// Returns the alive count after the pass minus the alive count before it.
    pub fn heal_pixels_at_position(&mut self, x: i32, y: i32, width: i32, height: i32) -> i64 {
        // Delta is measured against a fresh count.
        if self.last_commit_failed {
            self.commit();
        }
        let before = self.stats.alive as i64;
        let rect = HealRect::new(x, y, width, height).with_corner_radius(self.heal_corner_radius);
        if let Err(err) = self.backend.heal(rect) {
            log::warn!("Heal pass failed: {}", err);
            return 0;
        }
        self.commit();
        self.stats.alive as i64 - before
    }

    pub fn queue_press(&mut self, normalized_x: f32, normalized_y: f32) {
        self.pending.push_back(Interaction::Press {
            x: normalized_x,
            y: normalized_y,
        });
    }

    pub fn queue_heal(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.pending.push_back(Interaction::Heal { x, y, width, height });
    }

    pub fn pending_interactions(&self) -> usize {
        self.pending.len()
    }

    /// One host frame: queued interactions in arrival order, then the transition.
    pub fn step_frame(&mut self, zombification_speed: f32) -> FrameReport {
        let mut healed = 0;
        while let Some(interaction) = self.pending.pop_front() {
            match interaction {
                Interaction::Press { x, y } => self.press_screen(x, y),
                Interaction::Heal { x, y, width, height } => {
                    healed += self.heal_pixels_at_position(x, y, width, height);
                }
            }
        }
        self.simulate(zombification_speed);
        FrameReport {
            healed,
            outcome: self.outcome(),
        }
    }

    /// Re-seed the grid with the initial pattern.
    pub fn reset(&mut self) -> Result<()> {
        let size = self.backend.size();
        self.backend.upload(&initial_image(size, &self.seeds))?;
        self.pending.clear();
        self.generation = 0;
        self.commit();
        Ok(())
    }

    fn commit(&mut self) {
        match self.backend.read_back(&mut self.scratch) {
            Ok(()) => {
                std::mem::swap(self.snapshot.bytes_mut(), &mut self.scratch);
                self.stats = PixelStats::from_bytes(self.snapshot.bytes());
                self.last_commit_failed = false;
                log::debug!(
                    "Committed generation {}: {} alive / {}",
                    self.generation,
                    self.stats.alive,
                    self.stats.total
                );
            }
            Err(err) => {
                // Keep the previous stats; the grid itself is untouched by read-back.
                log::warn!("Keeping stale pixel stats: {}", err);
                self.last_commit_failed = true;
            }
        }
    }

    pub fn are_all_pixels_alive(&self) -> bool {
        self.stats.all_alive()
    }

    pub fn are_most_pixels_dead(&self) -> bool {
        self.stats.most_dead(self.most_dead_alive_fraction)
    }

    pub fn num_alive_pixels(&self) -> u32 {
        self.stats.alive
    }

    pub fn num_dead_pixels(&self) -> u32 {
        self.stats.dead()
    }

    pub fn dead_pixel_ratio(&self) -> f32 {
        self.stats.dead_ratio()
    }

    pub fn stats(&self) -> PixelStats {
        self.stats
    }

    pub fn outcome(&self) -> Outcome {
        if self.are_all_pixels_alive() {
            Outcome::Won
        } else if self.are_most_pixels_dead() {
            Outcome::Lost
        } else {
            Outcome::Running
        }
    }

    /// Most recent read-back, valid until the next mutating call.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn cpu_snapshot(&self) -> &[u8] {
        self.snapshot.bytes()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_commit_failed(&self) -> bool {
        self.last_commit_failed
    }

    pub fn size(&self) -> GridSize {
        self.backend.size()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;

    /// Wraps the CPU grid and fails read-backs on demand.
    struct FlakyGrid {
        inner: CpuGrid,
        fail_reads: bool,
    }

    impl GridBackend for FlakyGrid {
        fn size(&self) -> GridSize {
            self.inner.size()
        }
        fn upload(&mut self, data: &[u8]) -> Result<()> {
            self.inner.upload(data)
        }
        fn simulate(&mut self, step: u8) -> Result<()> {
            self.inner.simulate(step)
        }
        fn kill(&mut self, brush: KillBrush) -> Result<()> {
            self.inner.kill(brush)
        }
        fn heal(&mut self, rect: HealRect) -> Result<()> {
            self.inner.heal(rect)
        }
        fn read_back(&mut self, out: &mut Vec<u8>) -> Result<()> {
            if self.fail_reads {
                return Err(SimulationError::Readback("injected".into()));
            }
            self.inner.read_back(out)
        }
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    fn flaky(settings: &SimulationSettings) -> Simulation<FlakyGrid> {
        let size = settings.grid_size().unwrap();
        let seeds = settings.seed_pattern(size);
        let inner = CpuGrid::new(size, &initial_image(size, &seeds)).unwrap();
        Simulation::new(
            FlakyGrid {
                inner,
                fail_reads: false,
            },
            seeds,
            settings,
        )
        .unwrap()
    }

    #[test]
    fn failed_readback_keeps_previous_stats() {
        let settings = SimulationSettings::with_size(10, 10);
        let mut sim = flaky(&settings);
        let before = sim.stats();
        let snapshot_before = sim.cpu_snapshot().to_vec();

        sim.backend.fail_reads = true;
        sim.press_screen(0.25, 0.25);
        assert!(sim.last_commit_failed());
        assert_eq!(sim.stats(), before);
        assert_eq!(sim.cpu_snapshot(), &snapshot_before[..]);

        sim.backend.fail_reads = false;
        sim.simulate(0.0);
        assert!(!sim.last_commit_failed());
        assert!(sim.num_alive_pixels() < before.alive);
    }

    #[test]
    fn heal_after_failed_readback_reports_only_its_own_change() {
        let settings = SimulationSettings::with_size(10, 10);
        let mut sim = flaky(&settings);
        assert_eq!(sim.num_alive_pixels(), 99);

        sim.backend.fail_reads = true;
        sim.press_screen(0.15, 0.15);
        assert!(sim.last_commit_failed());
        assert_eq!(sim.num_alive_pixels(), 99);

        sim.backend.fail_reads = false;
        assert_eq!(sim.heal_pixels_at_position(9, 9, 1, 1), 0);
        assert_eq!(sim.num_alive_pixels(), 98);
        assert!(!sim.last_commit_failed());

        // The pixel killed while reads were failing still counts when healed.
        assert_eq!(sim.heal_pixels_at_position(1, 1, 1, 1), 1);
    }

    #[test]
    fn first_commit_failure_is_fatal() {
        let settings = SimulationSettings::with_size(4, 4);
        let size = settings.grid_size().unwrap();
        let seeds = settings.seed_pattern(size);
        let inner = CpuGrid::new(size, &initial_image(size, &seeds)).unwrap();
        let result = Simulation::new(
            FlakyGrid {
                inner,
                fail_reads: true,
            },
            seeds,
            &settings,
        );
        assert!(matches!(result, Err(SimulationError::Readback(_))));
    }

    #[test]
    fn queued_interactions_apply_before_transition() {
        let mut settings = SimulationSettings::with_size(10, 10);
        settings.seeds = vec![[0, 0]];
        let mut sim = Simulation::cpu(&settings).unwrap();
        // Heal the seed, then step: nothing is left to decay.
        sim.queue_heal(0, 0, 1, 1);
        assert_eq!(sim.pending_interactions(), 1);
        let report = sim.step_frame(1.0);
        assert_eq!(sim.pending_interactions(), 0);
        assert_eq!(report.healed, 1);
        assert_eq!(report.outcome, Outcome::Won);
        assert_eq!(sim.generation(), 1);
    }

    #[test]
    fn reset_restores_seeded_state() {
        let settings = SimulationSettings::with_size(12, 8);
        let mut sim = Simulation::cpu(&settings).unwrap();
        let initial = sim.cpu_snapshot().to_vec();
        sim.press_screen(0.5, 0.5);
        for _ in 0..5 {
            sim.simulate(1.0);
        }
        assert_ne!(sim.cpu_snapshot(), &initial[..]);
        sim.reset().unwrap();
        assert_eq!(sim.cpu_snapshot(), &initial[..]);
        assert_eq!(sim.generation(), 0);
    }
}

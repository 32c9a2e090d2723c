// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

//! Pixel health automaton for a simulated tablet screen.
//!
//! Each screen pixel lives through alive → dying → dead → zombie, zombies
//! contaminate their alive neighbors, and the player kills or heals regions of
//! the screen. The state lives in RGBA8 textures advanced by compute passes
//! (`GpuGrid`), with a byte-for-byte CPU twin (`CpuGrid`) for headless use.

pub mod cpu;
pub mod error;
pub mod gpu;
pub mod grid;
pub mod pixel;
pub mod settings;
pub mod simulation;
pub mod snapshot;

pub use cpu::CpuGrid;
pub use error::{Result, SimulationError};
pub use gpu::GpuGrid;
pub use grid::{GridBackend, GridSize, KillBrush, SeedPattern};
pub use pixel::{HealRect, PixelState, Texel};
pub use settings::{BackendKind, SimulationSettings, ZombificationRamp};
pub use simulation::{FrameReport, Interaction, Outcome, Simulation};
pub use snapshot::{PixelStats, Snapshot};

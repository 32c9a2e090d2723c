// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{GridSize, SeedPattern, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_SIDE};
use crate::snapshot::DEFAULT_MOST_DEAD_ALIVE_FRACTION;

pub const SETTINGS_FILE_NAME: &str = "zombie_screen_settings.json";
pub const DEFAULT_KILL_RADIUS: f32 = 0.02;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Gpu,
    Cpu,
}

/// Time-varying zombification speed handed to each simulation step.
///
/// Zero until `delay_seconds`, then grows by `per_second` up to `max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZombificationRamp {
    pub start: f32,
    pub per_second: f32,
    pub max: f32,
    pub delay_seconds: f32,
}

impl Default for ZombificationRamp {
    fn default() -> Self {
        Self {
            start: 0.0,
            per_second: 0.002,
            max: 0.05,
            delay_seconds: 2.0,
        }
    }
}

impl ZombificationRamp {
    pub fn speed_at(&self, elapsed_seconds: f32) -> f32 {
        if !(elapsed_seconds >= self.delay_seconds) {
            return 0.0;
        }
        let ramped = self.start + (elapsed_seconds - self.delay_seconds) * self.per_second;
        ramped.clamp(0.0, self.max)
    }

    fn sanitize(&mut self) {
        self.start = finite_or(self.start, 0.0).clamp(0.0, 1.0);
        self.per_second = finite_or(self.per_second, 0.0).clamp(0.0, 1.0);
        self.max = finite_or(self.max, 0.0).clamp(0.0, 1.0);
        self.delay_seconds = finite_or(self.delay_seconds, 0.0).max(0.0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub width: u32,
    pub height: u32,
    pub seeds: Vec<[u32; 2]>,         // Empty = one seed in the middle
    pub kill_radius: f32,             // Normalized, aspect-corrected
    pub heal_corner_radius: f32,      // Grid pixels, 0 = sharp rectangle
    pub heal_brush: [u32; 2],         // Heal rectangle size used by the host
    pub most_dead_alive_fraction: f32,
    pub zombification: ZombificationRamp,
    pub backend: BackendKind,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seeds: Vec::new(),
            kill_radius: DEFAULT_KILL_RADIUS,
            heal_corner_radius: 0.0,
            heal_brush: [24, 24],
            most_dead_alive_fraction: DEFAULT_MOST_DEAD_ALIVE_FRACTION,
            zombification: ZombificationRamp::default(),
            backend: BackendKind::Gpu,
        }
    }
}

impl SimulationSettings {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn default_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn load_from_disk(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&data)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn save_to_disk(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from `path`, falling back to defaults when the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_disk(path) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("Ignoring settings file {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn sanitize(&mut self) {
        self.width = self.width.clamp(1, MAX_SIDE);
        self.height = self.height.clamp(1, MAX_SIDE);
        let (w, h) = (self.width, self.height);
        self.seeds.retain(|p| p[0] < w && p[1] < h);
        self.kill_radius = finite_or(self.kill_radius, DEFAULT_KILL_RADIUS).clamp(0.0, 1.0);
        self.heal_corner_radius = finite_or(self.heal_corner_radius, 0.0).clamp(0.0, 64.0);
        self.heal_brush[0] = self.heal_brush[0].clamp(1, MAX_SIDE);
        self.heal_brush[1] = self.heal_brush[1].clamp(1, MAX_SIDE);
        self.most_dead_alive_fraction =
            finite_or(self.most_dead_alive_fraction, DEFAULT_MOST_DEAD_ALIVE_FRACTION).clamp(0.0, 1.0);
        self.zombification.sanitize();
    }

    /// Heal rectangle size fitted to the grid. The stored brush is left as configured.
    pub fn heal_brush_in(&self, size: GridSize) -> [u32; 2] {
        [
            self.heal_brush[0].clamp(1, size.width),
            self.heal_brush[1].clamp(1, size.height),
        ]
    }

    pub fn grid_size(&self) -> Result<GridSize> {
        GridSize::new(self.width, self.height)
    }

    pub fn seed_pattern(&self, size: GridSize) -> SeedPattern {
        if self.seeds.is_empty() {
            SeedPattern::centered(size)
        } else {
            SeedPattern::from_points(size, &self.seeds)
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
        // Smaller than the default 24x24 heal brush.
        let mut settings = SimulationSettings::with_size(32, 16);
        assert!(settings.heal_brush[1] > settings.height);
        settings.seeds = vec![[3, 4]];
        settings.backend = BackendKind::Cpu;
        settings.save_to_disk(&path).unwrap();
        let loaded = SimulationSettings::load_from_disk(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: SimulationSettings = serde_json::from_str(r#"{ "width": 10 }"#).unwrap();
        assert_eq!(settings.width, 10);
        assert_eq!(settings.height, DEFAULT_HEIGHT);
        assert_eq!(settings.kill_radius, DEFAULT_KILL_RADIUS);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut settings = SimulationSettings {
            width: 0,
            height: 100_000,
            seeds: vec![[0, 0], [5, 5]],
            kill_radius: f32::NAN,
            heal_brush: [0, 99_999],
            most_dead_alive_fraction: 3.0,
            ..SimulationSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.width, 1);
        assert_eq!(settings.height, MAX_SIDE);
        assert_eq!(settings.seeds, vec![[0, 0]]);
        assert_eq!(settings.kill_radius, DEFAULT_KILL_RADIUS);
        assert_eq!(settings.heal_brush, [1, MAX_SIDE]);
        assert_eq!(settings.most_dead_alive_fraction, 1.0);
    }

    #[test]
    fn heal_brush_is_fitted_to_the_grid_on_use() {
        let settings = SimulationSettings::with_size(32, 16);
        let size = settings.grid_size().unwrap();
        assert_eq!(settings.heal_brush_in(size), [24, 16]);
        assert_eq!(settings.heal_brush, [24, 24]);

        let big = SimulationSettings::default();
        let size = big.grid_size().unwrap();
        assert_eq!(big.heal_brush_in(size), [24, 24]);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SimulationSettings::load_or_default(&path), SimulationSettings::default());
    }

    #[test]
    fn ramp_waits_then_caps() {
        let ramp = ZombificationRamp {
            start: 0.1,
            per_second: 0.5,
            max: 0.6,
            delay_seconds: 1.0,
        };
        assert_eq!(ramp.speed_at(0.5), 0.0);
        assert!((ramp.speed_at(1.0) - 0.1).abs() < 1e-6);
        assert!((ramp.speed_at(2.0) - 0.6).abs() < 1e-6);
        assert_eq!(ramp.speed_at(100.0), 0.6);
    }

    #[test]
    fn empty_seed_list_means_centre() {
        let settings = SimulationSettings::with_size(10, 10);
        let size = settings.grid_size().unwrap();
        assert_eq!(settings.seed_pattern(size).points(), &[[5, 5]]);
    }
}

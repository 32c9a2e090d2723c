// Zombie Screen - GPU pixel health automaton
// Copyright (c) 2025 Zombie Screen contributors
// Licensed under MIT License

use thiserror::Error;

/// Errors raised by the pixel simulation.
///
/// Construction failures (adapter, device, shaders, grid size) are fatal to the
/// subsystem. `Readback` is recoverable: the orchestrator logs it and keeps the
/// previous snapshot.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("shader `{label}` failed validation: {message}")]
    Shader { label: &'static str, message: String },

    #[error("state read-back failed: {0}")]
    Readback(String),

    #[error("invalid grid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimulationError>;

//! Error types for dispersal.
//!
//! This module provides error types for loading the target image, reading
//! configuration, recording frames, exporting the video and bringing up the
//! display window.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors that can occur while loading the target image.
#[derive(Debug, Error)]
pub enum TargetImageError {
    /// No image path was configured.
    #[error("No target image given. Pass one with -i <path>.")]
    Missing,
    /// The file could not be opened or decoded.
    #[error("Failed to load target image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The image has no pixels.
    #[error("Target image is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Errors that can occur while reading startup parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A flag that takes a value was the last argument.
    #[error("Flag '{0}' expects a value")]
    MissingValue(String),
    /// Failed to read a config file from disk.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid JSON for [`crate::Config`].
    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while writing captured frames.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The output directory could not be cleared or created.
    #[error("Failed to prepare frame directory '{path}': {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A frame could not be encoded or written.
    #[error("Failed to write frame '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors that can occur when handing the frame sequence to the encoder.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The encoder executable could not be started.
    #[error("Failed to run encoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The encoder ran but reported failure.
    #[error("Encoder exited with {0}")]
    Failed(ExitStatus),
}

/// Errors that can occur during display initialization.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Failed to create a surface for the window.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support, or run with --headless.")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reports no usable format.
    #[error("GPU surface has no supported texture format")]
    NoSurfaceFormat,
    /// Presenting a frame failed in a way that reconfiguring cannot fix.
    #[error("Failed to present frame: {0}")]
    Present(#[from] wgpu::SurfaceError),
}

/// Errors that can occur when running the sequence.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to create event loop.
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// The worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Display initialization failed.
    #[error("Display error: {0}")]
    Display(#[from] DisplayError),
    /// Frame capture failed.
    #[error("Recording error: {0}")]
    Record(#[from] RecordError),
    /// The window was closed before the sequence finished.
    #[error("Window closed before the sequence finished")]
    Interrupted,
}

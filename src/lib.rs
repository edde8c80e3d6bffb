//! Deterministic wallpaper synthesis for multi-monitor Wayland desktops
//!
//! The pipeline derives a time-sliced seed per monitor, resolves a themed
//! prompt template against reusable atom files, injects the resolved sections
//! into a ComfyUI workflow graph, drives the remote generation queue, and
//! installs the finished image through an external setter.

#![forbid(unsafe_code)]

/// ComfyUI HTTP transport and the generation driver state machine
pub mod comfy;
/// Input/output operations, configuration, and error handling
pub mod io;
/// Mathematical utilities for weighted sampling and solar geometry
pub mod math;
/// Monitor detection, rotation state, and wallpaper setters
pub mod monitor;
/// Pipeline orchestration wiring the components into a single-shot run
pub mod pipeline;
/// Seed derivation, atom storage, and template parsing/resolution
pub mod prompt;
/// Solar-driven theme scheduling with probabilistic blending
pub mod schedule;
/// Workflow registry and placeholder injection
pub mod workflow;

pub use io::error::{PipelineError, Result};

//! # dual-capture-windows
//!
//! Windows WASAPI backend for dual-capture.
//!
//! Provides:
//! - `WasapiInputProvider`: blocking microphone stream on the default capture endpoint
//! - `WasapiLoopbackProvider`: callback-driven system audio stream via loopback on the default render endpoint
//!
//! Both open their endpoint on a dedicated COM thread and report setup
//! failures synchronously from the `open_*` call. Device frames (32-bit float
//! at the mix format) are converted to the requested rate and channel count.
//!
//! ## Platform Requirements
//! - Windows 10 1703+ (build 15063)
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use dual_capture_core::{Recorder, RecorderConfiguration};
//! use dual_capture_windows::{WasapiInputProvider, WasapiLoopbackProvider};
//!
//! let mut recorder = Recorder::new(
//!     WasapiInputProvider::default_device(),
//!     WasapiLoopbackProvider::default_device(),
//!     RecorderConfiguration::default(),
//! )?;
//! recorder.start()?;
//! ```

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
mod chunker;
#[cfg(target_os = "windows")]
mod endpoint;
#[cfg(target_os = "windows")]
pub mod wasapi_loopback;
#[cfg(target_os = "windows")]
pub mod wasapi_mic;

#[cfg(target_os = "windows")]
pub use wasapi_loopback::{WasapiLoopbackProvider, WasapiLoopbackStream};
#[cfg(target_os = "windows")]
pub use wasapi_mic::{WasapiInputProvider, WasapiInputStream};

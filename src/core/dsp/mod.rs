//! Digital Signal Processing utilities

pub mod fft;
pub mod filters;
pub mod stats;
pub mod windows;

pub use fft::{PowerSpectrum, SpectralPowerComputer, SpectrumConfig};
pub use filters::{block_downsample, decimate, interpolate};
pub use stats::OnlineStats;
pub use windows::WindowFunction;

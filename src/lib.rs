//! Click-to-place binary classification demo.
//!
//! Points of two classes are collected on a canvas, a small network is
//! trained on them, and the learned decision boundary is rasterized as a
//! translucent overlay underneath the point markers.

pub mod classifier;
pub mod config;
pub mod logging;
pub mod raster;
pub mod session;
pub mod training;

pub use classifier::{BinaryClassifier, ClassifierError};
pub use config::{AppConfig, ConfigError};
pub use planefit_helpers::{normalize, Class, Float, Point};
pub use raster::{render_boundary, BoundaryStyle, MarkerStyle, RenderError, RenderTarget};
pub use session::{Session, Status};
pub use training::{Progress, TrainingError, TrainingRun};

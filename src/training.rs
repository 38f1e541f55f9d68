use crate::config::TrainingConfig;
use crate::raster::{render_boundary, BoundaryStyle, RenderError, RenderTarget};
use mlp::{sequential, Activation, AdamConfig, FitOptions, Loss, MlpError, Sequential};
use ndarray::Array2;
use planefit_helpers::{Float, Point};
use thiserror::Error;

/// Errors that can stop a training run before or while it executes.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Not enough data to train: have {found} points, need {required}")]
    NotEnoughData { found: usize, required: usize },
    #[error("Canvas must be non-empty, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
    #[error(transparent)]
    Model(#[from] MlpError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Snapshot reported each time the boundary should be redrawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub epoch: u32,
    pub total_epochs: u32,
    /// Mean training loss of the last epoch.
    pub loss: f64,
}

/// One training session: a freshly built network, the points it was started
/// with, and an epoch counter.
///
/// Epochs are run one `fit` call at a time. [`step`](TrainingRun::step)
/// stops at every `update_interval`-th epoch and at the last epoch so the
/// caller can redraw before continuing.
#[derive(Debug)]
pub struct TrainingRun<F: Float> {
    model: Sequential<F>,
    xs: Array2<F>,
    ys: Array2<F>,
    fit: FitOptions,
    epoch: u32,
    total_epochs: u32,
    update_interval: u32,
}

impl<F: Float> TrainingRun<F> {
    /// Builds a `2 -> hidden (ReLU) -> 1 (sigmoid)` network for `points`.
    ///
    /// Points are normalized with the real canvas size. The point list is
    /// copied, so points added later are drawn but not trained on.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::NotEnoughData` when there are fewer than
    /// `config.min_points` points.
    pub fn new(
        points: &[Point],
        width: u32,
        height: u32,
        epochs: u32,
        config: &TrainingConfig,
    ) -> Result<Self, TrainingError> {
        let required = config.min_points.max(1);
        if points.len() < required {
            return Err(TrainingError::NotEnoughData {
                found: points.len(),
                required,
            });
        }
        if width == 0 || height == 0 {
            return Err(TrainingError::EmptyCanvas { width, height });
        }

        let mut xs = Array2::zeros((points.len(), 2));
        let mut ys = Array2::zeros((points.len(), 1));
        for (row, point) in points.iter().enumerate() {
            let [nx, ny] = point.normalized::<F>(width, height);
            xs[[row, 0]] = nx;
            xs[[row, 1]] = ny;
            ys[[row, 0]] = point.class.label();
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        let model = sequential(2)
            .dense(config.hidden_units, Activation::Relu)
            .dense(1, Activation::Sigmoid)
            .build(
                AdamConfig::with_learning_rate(F::lit(config.learning_rate)),
                Loss::BinaryCrossEntropy,
                seed,
            )?;

        let total_epochs = epochs.max(1);
        tracing::info!(
            points = points.len(),
            epochs = total_epochs,
            seed,
            "Training started"
        );
        Ok(Self {
            model,
            xs,
            ys,
            fit: FitOptions {
                epochs: 1,
                batch_size: config.batch_size.max(1),
                shuffle: config.shuffle,
            },
            epoch: 0,
            total_epochs,
            update_interval: config.update_interval.max(1),
        })
    }

    pub fn model(&self) -> &Sequential<F> {
        &self.model
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn total_epochs(&self) -> u32 {
        self.total_epochs
    }

    pub fn is_finished(&self) -> bool {
        self.epoch >= self.total_epochs
    }

    /// Trains until the next redraw point.
    ///
    /// Returns `None` once every epoch has run.
    pub fn step(&mut self) -> Result<Option<Progress>, TrainingError> {
        if self.is_finished() {
            return Ok(None);
        }
        let mut loss = F::zero();
        loop {
            let history = self.model.fit(self.xs.view(), self.ys.view(), &self.fit)?;
            loss = history.last_loss().unwrap_or(loss);
            self.epoch += 1;
            if self.epoch % self.update_interval == 0 || self.epoch == self.total_epochs {
                break;
            }
        }
        let progress = Progress {
            epoch: self.epoch,
            total_epochs: self.total_epochs,
            loss: loss.to_f64_lossy(),
        };
        tracing::debug!(
            epoch = progress.epoch,
            total = progress.total_epochs,
            loss = progress.loss,
            "Updating boundary"
        );
        if self.is_finished() {
            tracing::info!(loss = progress.loss, "Training complete");
        }
        Ok(Some(progress))
    }

    /// Runs every remaining epoch, redrawing `target` at each redraw point
    /// before training continues.
    pub fn run_to_completion<P>(
        &mut self,
        target: &mut RenderTarget,
        points: &[Point],
        style: &BoundaryStyle,
        mut on_progress: P,
    ) -> Result<(), TrainingError>
    where
        P: FnMut(&Progress),
    {
        while let Some(progress) = self.step()? {
            on_progress(&progress);
            render_boundary(&self.model, target, points, style)?;
        }
        Ok(())
    }
}

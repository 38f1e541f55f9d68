use crate::config::AppConfig;
use crate::raster::{draw_point, MarkerStyle, RenderTarget};
use crate::training::{Progress, TrainingError, TrainingRun};
use planefit_helpers::{Class, Float, Point};
use std::fmt::{Display, Formatter};

/// The message shown under the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Cleared,
    NotEnoughData,
    Training { total_epochs: u32 },
    Epoch { epoch: u32, total_epochs: u32 },
    Complete,
    Failed(String),
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ready => write!(f, "Click on the canvas to add data points."),
            Status::Cleared => write!(f, "Canvas cleared. Add new data points!"),
            Status::NotEnoughData => write!(f, "Not enough data to train!"),
            Status::Training { total_epochs } => write!(f, "Training for {total_epochs} epochs..."),
            Status::Epoch {
                epoch,
                total_epochs,
            } => write!(f, "Epoch {epoch}/{total_epochs}. Updating boundary..."),
            Status::Complete => write!(f, "Training Complete!"),
            Status::Failed(msg) => write!(f, "Training failed: {msg}"),
        }
    }
}

/// Everything the click handlers read and write: the placed points, the
/// class new points get, and the status line.
#[derive(Debug, Clone, Default)]
pub struct Session {
    points: Vec<Point>,
    active_class: Class,
    status: Status,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn active_class(&self) -> Class {
        self.active_class
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Label for the class toggle button.
    pub fn class_button_label(&self) -> String {
        format!("Current Class: {}", self.active_class)
    }

    /// Records a click at pixel `(x, y)` with the current class.
    pub fn add_point(&mut self, x: f32, y: f32) -> Point {
        let point = Point::new(x, y, self.active_class);
        self.points.push(point);
        point
    }

    /// Records a click and draws its marker straight onto `target`.
    pub fn place_point(
        &mut self,
        x: f32,
        y: f32,
        target: &mut RenderTarget,
        marker: &MarkerStyle,
    ) -> Point {
        let point = self.add_point(x, y);
        draw_point(target, &point, marker);
        point
    }

    pub fn toggle_class(&mut self) -> Class {
        self.active_class = self.active_class.toggled();
        self.active_class
    }

    /// Drops every point and blanks the canvas.
    pub fn restart(&mut self, target: &mut RenderTarget) {
        self.points.clear();
        target.clear();
        self.status = Status::Cleared;
        tracing::info!("Canvas cleared");
    }

    /// Validates the point count and starts a run.
    ///
    /// `epoch_input` is the raw text of the epoch field; see [`parse_epochs`].
    pub fn begin_training<F: Float>(
        &mut self,
        epoch_input: &str,
        config: &AppConfig,
    ) -> Result<TrainingRun<F>, TrainingError> {
        let epochs = parse_epochs(epoch_input, config.training.default_epochs);
        let run = TrainingRun::new(
            &self.points,
            config.canvas.width,
            config.canvas.height,
            epochs,
            &config.training,
        );
        match &run {
            Ok(run) => {
                self.status = Status::Training {
                    total_epochs: run.total_epochs(),
                }
            }
            Err(TrainingError::NotEnoughData { found, .. }) => {
                tracing::warn!(points = found, "Not enough data to train");
                self.status = Status::NotEnoughData;
            }
            Err(err) => self.fail(err),
        }
        run
    }

    pub fn record_progress(&mut self, progress: &Progress) {
        self.status = Status::Epoch {
            epoch: progress.epoch,
            total_epochs: progress.total_epochs,
        };
    }

    pub fn finish_training(&mut self) {
        self.status = Status::Complete;
    }

    pub fn fail(&mut self, err: &dyn std::error::Error) {
        tracing::error!("Training stopped: {err}");
        self.status = Status::Failed(err.to_string());
    }
}

/// Reads the epoch count the way a browser's `parseInt` would: leading
/// whitespace and sign are allowed and trailing junk is ignored. Anything
/// that does not give a positive count falls back to `default`.
pub fn parse_epochs(input: &str, default: u32) -> u32 {
    let trimmed = input.trim_start();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    match digits[..end].parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.canvas.width = 100;
        config.canvas.height = 100;
        config.training.seed = Some(4);
        config
    }

    #[test]
    fn test_points_take_active_class() {
        let mut session = Session::new();
        assert_eq!(session.active_class(), Class::Blue);
        assert_eq!(session.class_button_label(), "Current Class: Blue");
        session.add_point(1.0, 2.0);
        assert_eq!(session.toggle_class(), Class::Red);
        assert_eq!(session.class_button_label(), "Current Class: Red");
        session.add_point(3.0, 4.0);
        assert_eq!(
            session.points(),
            &[
                Point::new(1.0, 2.0, Class::Blue),
                Point::new(3.0, 4.0, Class::Red)
            ]
        );
    }

    #[test]
    fn test_place_point_draws_marker() {
        let mut session = Session::new();
        let mut target = RenderTarget::new(50, 50);
        session.place_point(25.0, 25.0, &mut target, &MarkerStyle::default());
        assert_eq!(target.pixel(25, 25).0, [0, 0, 255, 255]);
        assert_eq!(session.points().len(), 1);
    }

    #[test]
    fn test_restart_clears_points_and_canvas() {
        let mut session = Session::new();
        let mut target = RenderTarget::new(50, 50);
        session.place_point(10.0, 10.0, &mut target, &MarkerStyle::default());
        session.restart(&mut target);
        assert!(session.points().is_empty());
        assert_eq!(target.pixel(10, 10).0, [0, 0, 0, 0]);
        assert_eq!(session.status().to_string(), "Canvas cleared. Add new data points!");
    }

    #[test]
    fn test_training_needs_two_points() {
        let config = test_config();
        let mut session = Session::new();
        session.add_point(5.0, 5.0);
        let result = session.begin_training::<f32>("100", &config);
        assert!(matches!(result, Err(TrainingError::NotEnoughData { .. })));
        assert_eq!(session.status(), &Status::NotEnoughData);
        assert_eq!(session.status().to_string(), "Not enough data to train!");
    }

    #[test]
    fn test_training_status_flow() {
        let config = test_config();
        let mut session = Session::new();
        session.add_point(10.0, 10.0);
        session.toggle_class();
        session.add_point(90.0, 90.0);

        let mut run = session.begin_training::<f32>("12 epochs", &config).unwrap();
        assert_eq!(session.status().to_string(), "Training for 12 epochs...");

        let progress = run.step().unwrap().unwrap();
        session.record_progress(&progress);
        assert_eq!(session.status().to_string(), "Epoch 10/12. Updating boundary...");

        let progress = run.step().unwrap().unwrap();
        session.record_progress(&progress);
        assert_eq!(session.status().to_string(), "Epoch 12/12. Updating boundary...");
        assert!(run.step().unwrap().is_none());

        session.finish_training();
        assert_eq!(session.status().to_string(), "Training Complete!");
    }

    #[test]
    fn test_fail_sets_status_text() {
        let mut session = Session::new();
        session.fail(&crate::raster::RenderError::ZeroResolution);
        assert!(matches!(session.status(), Status::Failed(_)));
        assert_eq!(
            session.status().to_string(),
            "Training failed: grid resolution must be positive"
        );
    }

    #[test]
    fn test_parse_epochs() {
        assert_eq!(parse_epochs("250", 1000), 250);
        assert_eq!(parse_epochs("  42abc", 1000), 42);
        assert_eq!(parse_epochs("+7", 1000), 7);
        assert_eq!(parse_epochs("", 1000), 1000);
        assert_eq!(parse_epochs("abc", 1000), 1000);
        assert_eq!(parse_epochs("0", 1000), 1000);
        assert_eq!(parse_epochs("-5", 1000), 1000);
        assert_eq!(parse_epochs("99999999999", 1000), 1000);
    }
}

use crate::ui;

use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use eframe::{App, Frame};
use planefit::{
    render_boundary, AppConfig, BoundaryStyle, Class, RenderTarget, Session, TrainingRun,
};

/// The main application struct.
/// It holds the high-level state and delegates drawing to the `ui` module.
pub struct VisualizerApp {
    // --- Core State ---
    pub config: AppConfig,
    /// Points, current class toggle and status line.
    pub session: Session,
    /// Pixel buffer behind the canvas. Only this struct writes to it.
    pub target: RenderTarget,
    pub style: BoundaryStyle,
    /// The run in progress, if any. One epoch batch is trained per frame.
    pub training: Option<TrainingRun<f32>>,

    // --- UI State ---
    pub epoch_input: String,
    /// GPU copy of `target`. Re-uploaded when `canvas_dirty` is set.
    pub canvas_texture: Option<TextureHandle>,
    pub canvas_dirty: bool,
}

impl VisualizerApp {
    pub fn new(config: AppConfig) -> Self {
        let target = RenderTarget::new(config.canvas.width, config.canvas.height);
        let style = config.boundary_style();
        let epoch_input = config.training.default_epochs.to_string();
        Self {
            config,
            session: Session::new(),
            target,
            style,
            training: None,
            epoch_input,
            canvas_texture: None,
            canvas_dirty: true,
        }
    }

    pub fn is_training(&self) -> bool {
        self.training.is_some()
    }

    /// Adds a point of the current class at canvas pixel `(x, y)`.
    pub fn add_point(&mut self, x: f32, y: f32) {
        let point = self
            .session
            .place_point(x, y, &mut self.target, &self.style.marker);
        tracing::debug!(x = point.x, y = point.y, class = %point.class, "Point added");
        self.canvas_dirty = true;
    }

    pub fn toggle_class(&mut self) -> Class {
        self.session.toggle_class()
    }

    /// Clears points and canvas. A run in progress is dropped with them.
    pub fn restart(&mut self) {
        self.training = None;
        self.session.restart(&mut self.target);
        self.canvas_dirty = true;
    }

    pub fn start_training(&mut self) {
        if self.is_training() {
            return;
        }
        // On failure the session has already set the status line.
        if let Ok(run) = self
            .session
            .begin_training::<f32>(&self.epoch_input, &self.config)
        {
            self.training = Some(run);
        }
    }

    /// Trains up to the next redraw point and repaints the boundary.
    pub fn advance_training(&mut self) {
        let Some(mut run) = self.training.take() else {
            return;
        };
        match run.step() {
            Ok(Some(progress)) => {
                self.session.record_progress(&progress);
                let rendered = render_boundary(
                    run.model(),
                    &mut self.target,
                    self.session.points(),
                    &self.style,
                );
                self.canvas_dirty = true;
                match rendered {
                    Ok(()) => self.training = Some(run),
                    Err(err) => self.session.fail(&err),
                }
            }
            Ok(None) => self.session.finish_training(),
            Err(err) => self.session.fail(&err),
        }
    }

    /// Returns the canvas texture, uploading the pixel buffer if it changed.
    pub fn canvas_texture(&mut self, ctx: &egui::Context) -> egui::TextureId {
        let size = [self.target.width() as usize, self.target.height() as usize];
        let dirty = std::mem::take(&mut self.canvas_dirty);
        match &mut self.canvas_texture {
            Some(texture) => {
                if dirty {
                    let image = ColorImage::from_rgba_unmultiplied(size, self.target.as_rgba());
                    texture.set(image, TextureOptions::NEAREST);
                }
                texture.id()
            }
            None => {
                let image = ColorImage::from_rgba_unmultiplied(size, self.target.as_rgba());
                let texture = ctx.load_texture("boundary-canvas", image, TextureOptions::NEAREST);
                let id = texture.id();
                self.canvas_texture = Some(texture);
                id
            }
        }
    }
}

impl App for VisualizerApp {
    /// Called by eframe on every frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        if self.is_training() {
            self.advance_training();
            ctx.request_repaint();
        }
        ui::draw_side_panel(self, ctx);
        ui::draw_central_panel(self, ctx);
    }
}

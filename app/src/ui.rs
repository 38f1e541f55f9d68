use crate::app::VisualizerApp;

use eframe::egui::{self, Button, Color32, Pos2, Rect, RichText, Sense, Ui, Vec2};
use planefit::Class;

fn class_color(class: Class) -> Color32 {
    let [r, g, b] = class.rgb();
    Color32::from_rgb(r, g, b)
}

/// Draws the left-side panel with all the controls.
pub fn draw_side_panel(app: &mut VisualizerApp, ctx: &egui::Context) {
    egui::SidePanel::left("controls_panel").show(ctx, |ui| {
        ui.heading("Decision Boundary");
        ui.separator();

        draw_class_toggle(app, ui);
        ui.separator();

        draw_training_controls(app, ui);
        ui.separator();

        ui.label(app.session.status().to_string());
        ui.label(format!("Points: {}", app.session.points().len()));
    });
}

fn draw_class_toggle(app: &mut VisualizerApp, ui: &mut Ui) {
    let class = app.session.active_class();
    let label = RichText::new(app.session.class_button_label()).color(Color32::WHITE);
    if ui.add(Button::new(label).fill(class_color(class))).clicked() {
        let class = app.toggle_class();
        tracing::debug!(%class, "Active class toggled");
    }
}

fn draw_training_controls(app: &mut VisualizerApp, ui: &mut Ui) {
    ui.horizontal(|ui| {
        ui.label("Epochs:");
        ui.add(egui::TextEdit::singleline(&mut app.epoch_input).desired_width(80.0));
    });

    ui.horizontal(|ui| {
        let train = ui.add_enabled(!app.is_training(), Button::new("Train"));
        if train.clicked() {
            app.start_training();
        }
        if ui.button("Restart").clicked() {
            app.restart();
        }
    });
}

/// Draws the canvas. Clicks inside it add a point of the active class.
pub fn draw_central_panel(app: &mut VisualizerApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::both().show(ui, |ui| {
            let size = Vec2::new(app.target.width() as f32, app.target.height() as f32);
            let (response, painter) = ui.allocate_painter(size, Sense::click());
            let rect = response.rect;

            painter.rect_filled(rect, 0.0, Color32::WHITE);
            let texture = app.canvas_texture(ctx);
            painter.image(
                texture,
                rect,
                Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let local = pos - rect.min;
                    if local.x >= 0.0 && local.y >= 0.0 && local.x < size.x && local.y < size.y {
                        app.add_point(local.x, local.y);
                    }
                }
            }
        });
    });
}

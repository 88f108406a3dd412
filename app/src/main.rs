use std::future::Future;
use std::path::PathBuf;

use eframe::{App, Frame, NativeOptions, egui, run_native};
use egui::{
    Color32, ColorImage, Pos2, Rect, Response, Sense, Shape, Stroke, StrokeKind, TextureHandle,
    TextureOptions, Vec2,
};
use env_logger::Env;
use image::RgbImage;
use log::{info, warn};
use relief_core::input::{Modifiers, PointerButton, PointerEvent};
use relief_core::{
    EditOutcome, EditorConfig, MaskEditor, ProjectionAdapter, RectProjection, ReliefBuffer,
    ReliefMask, ScreenPos, Surface, SurfacePos,
};
use relief_storage::MaskStore;

const DB_URI: &str = "mongodb://localhost:27017";
const DB_NAME: &str = "relief_db";
const DB_COLLECTION: &str = "masks";

// Default volume footprint
const DEFAULT_WIDTH: usize = 640;
const DEFAULT_HEIGHT: usize = 420;

// Inset so boundary handles stay grabbable
const VIEW_MARGIN: f32 = 10.0;
const HANDLE_RADIUS: f32 = 4.0;

fn surface_color(surface: Surface) -> Color32 {
    match surface {
        Surface::Top => Color32::from_rgb(235, 90, 80),
        Surface::Bottom => Color32::from_rgb(90, 200, 110),
    }
}

fn to_egui_button(button: PointerButton) -> egui::PointerButton {
    match button {
        PointerButton::Primary => egui::PointerButton::Primary,
        PointerButton::Secondary => egui::PointerButton::Secondary,
        PointerButton::Middle => egui::PointerButton::Middle,
    }
}

fn screen_pos(p: Pos2) -> ScreenPos {
    ScreenPos::new(p.x as f64, p.y as f64)
}

fn egui_pos(view: &RectProjection, pos: SurfacePos) -> Pos2 {
    let p = view.surface_space_to_point(pos);
    egui::pos2(p.x as f32, p.y as f32)
}

// Runs one database action on a throwaway current-thread runtime
fn run_db<T>(fut: impl Future<Output = relief_storage::Result<T>>) -> Result<T, String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("runtime error: {e}"))?;
    rt.block_on(fut).map_err(|e| e.to_string())
}

struct ReliefApp {
    editor: MaskEditor<ReliefMask>,

    // size for the next "New Mask"
    new_width: usize,
    new_height: usize,

    // name used for database save/load
    mask_name: String,

    preview: Option<TextureHandle>,
    status_message: String,
}

impl ReliefApp {
    fn new(config: EditorConfig) -> relief_core::Result<Self> {
        Ok(Self {
            editor: MaskEditor::new(ReliefMask::new(DEFAULT_WIDTH, DEFAULT_HEIGHT), config)?,
            new_width: DEFAULT_WIDTH,
            new_height: DEFAULT_HEIGHT,
            mask_name: "mask".to_string(),
            preview: None,
            status_message: String::new(),
        })
    }

    // Upload the rows the rasterizer touched since the last frame
    fn sync_preview(&mut self, ctx: &egui::Context) {
        let Some(rows) = self.editor.mask_mut().take_pending_rows() else {
            return;
        };
        let mask = self.editor.mask();
        let (w, h) = (mask.width(), mask.height());
        let full = self.preview.as_ref().is_none_or(|tex| tex.size() != [w, h]);
        let rows = if full { 0..=h - 1 } else { rows };

        let band: RgbImage = mask.preview_rows(rows.clone());
        let image = ColorImage::from_rgb([w, band.height() as usize], band.as_raw());
        match self.preview.as_mut() {
            Some(tex) if !full => tex.set_partial([0, *rows.start()], image, TextureOptions::NEAREST),
            _ => {
                self.preview = Some(ctx.load_texture("relief_mask", image, TextureOptions::NEAREST))
            }
        }
    }

    fn handle_outcome(&mut self, ctx: &egui::Context, outcome: EditOutcome) {
        if outcome.mask_changed() {
            ctx.request_repaint();
        }
    }

    // Route egui pointer activity on a view into the editor
    fn route_pointer(&mut self, ctx: &egui::Context, response: &Response, view: &RectProjection) {
        let config = self.editor.config().clone();
        let modifiers = ctx.input(|i| Modifiers {
            shift: i.modifiers.shift,
            ctrl: i.modifiers.ctrl || i.modifiers.command,
            alt: i.modifiers.alt,
        });
        let drag_button = config.drag_binding.button;

        if response.drag_started_by(to_egui_button(drag_button)) {
            let origin = ctx.input(|i| i.pointer.press_origin());
            if let Some(origin) = origin.or(response.interact_pointer_pos()) {
                let event =
                    PointerEvent::new(screen_pos(origin), drag_button).with_modifiers(modifiers);
                let outcome = self.editor.pointer_down(view, &event);
                self.handle_outcome(ctx, outcome);
            }
        }
        if response.dragged_by(to_egui_button(drag_button)) {
            if let Some(pos) = response.interact_pointer_pos() {
                let event = PointerEvent::new(screen_pos(pos), drag_button).with_modifiers(modifiers);
                let outcome = self.editor.pointer_move(view, &event);
                self.handle_outcome(ctx, outcome);
            }
        }
        if response.drag_stopped() {
            let outcome = self.editor.pointer_up();
            self.handle_outcome(ctx, outcome);
        }
        if response.clicked_by(to_egui_button(config.toggle_button)) {
            if let Some(pos) = response.interact_pointer_pos() {
                let event = PointerEvent::new(screen_pos(pos), config.toggle_button)
                    .with_modifiers(modifiers);
                let outcome = self.editor.click(view, &event);
                self.handle_outcome(ctx, outcome);
            }
        }
    }

    fn view_frame(ui: &mut egui::Ui, size: Vec2) -> (Response, egui::Painter, Rect) {
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, Color32::from_gray(24));
        let inner = rect.shrink(VIEW_MARGIN);
        painter.rect_stroke(inner, 0.0, Stroke::new(1.0, Color32::from_gray(70)), StrokeKind::Inside);
        (response, painter, inner)
    }

    // Top view: the cross-section row, columns left to right
    fn primary_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, size: Vec2) {
        let (response, painter, inner) = Self::view_frame(ui, size);
        let view = RectProjection::primary(screen_pos(inner.min), screen_pos(inner.max));

        let field = self.editor.field();
        let cross = self.editor.cross_section();
        let last_x = (field.xdim() - 1) as f64;

        let marker = cross.x as f64 / last_x;
        painter.line_segment(
            [
                egui_pos(&view, SurfacePos::new(marker, 0.0)),
                egui_pos(&view, SurfacePos::new(marker, 1.0)),
            ],
            Stroke::new(1.0, Color32::from_gray(110)),
        );

        for surface in Surface::BOTH {
            let color = surface_color(surface);
            let editable = field.has_ridge(cross.y, surface);
            let profile = field.mask_profile(cross.y, surface);
            let points: Vec<Pos2> = profile
                .points()
                .map(|(loc, h)| {
                    egui_pos(&view, SurfacePos::new(loc as f64 / last_x, surface.height_to_depth(h)))
                })
                .collect();
            let width = if editable { 2.0 } else { 1.0 };
            painter.add(Shape::line(points.clone(), Stroke::new(width, color)));
            if editable {
                for p in points {
                    painter.circle_filled(p, HANDLE_RADIUS, color);
                }
            }
        }

        self.route_pointer(ctx, &response, &view);
    }

    // Side view: the cross-section column, rows top to bottom
    fn secondary_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, size: Vec2) {
        let (response, painter, inner) = Self::view_frame(ui, size);
        let view = RectProjection::secondary(screen_pos(inner.min), screen_pos(inner.max));

        let field = self.editor.field();
        let mask = self.editor.mask();
        let cross = self.editor.cross_section();
        let last_y = (field.ydim() - 1) as f64;

        let marker = cross.y as f64 / last_y;
        painter.line_segment(
            [
                egui_pos(&view, SurfacePos::new(marker, 0.0)),
                egui_pos(&view, SurfacePos::new(marker, 1.0)),
            ],
            Stroke::new(1.0, Color32::from_gray(110)),
        );

        let step = (field.ydim() / inner.height().max(1.0) as usize).max(1);
        for surface in Surface::BOTH {
            let color = surface_color(surface);
            let mut points: Vec<Pos2> = (0..field.ydim())
                .step_by(step)
                .chain(std::iter::once(field.ydim() - 1))
                .map(|y| {
                    let h = mask.get(cross.x, y, surface.channel()) as f64 / 65535.0;
                    egui_pos(&view, SurfacePos::new(y as f64 / last_y, surface.height_to_depth(h)))
                })
                .collect();
            points.dedup();
            painter.add(Shape::line(points, Stroke::new(1.5, color)));

            for (row, ridge) in field.ridges(surface) {
                let depth = surface.height_to_depth(ridge.height(cross.x));
                let p = egui_pos(&view, SurfacePos::new(row as f64 / last_y, depth));
                painter.circle_filled(p, HANDLE_RADIUS, color);
            }
        }

        self.route_pointer(ctx, &response, &view);
    }

    // Plan view of the rasterized mask; clicking picks the cross-section
    fn plan_view(&mut self, ui: &mut egui::Ui, size: Vec2) {
        let Some(tex) = &self.preview else {
            ui.label("no preview");
            return;
        };
        let response = ui.add(egui::Image::new((tex.id(), size)).sense(Sense::click()));
        let rect = response.rect;
        let (w, h) = (self.editor.field().xdim(), self.editor.field().ydim());
        let cross = self.editor.cross_section();

        let cx = rect.left() + rect.width() * (cross.x as f32 + 0.5) / w as f32;
        let cy = rect.top() + rect.height() * (cross.y as f32 + 0.5) / h as f32;
        let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 140));
        let painter = ui.painter();
        painter.line_segment([egui::pos2(cx, rect.top()), egui::pos2(cx, rect.bottom())], stroke);
        painter.line_segment([egui::pos2(rect.left(), cy), egui::pos2(rect.right(), cy)], stroke);

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let u = ((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0);
                let v = ((pos.y - rect.top()) / rect.height()).clamp(0.0, 1.0);
                let x = (u * (w - 1) as f32).round() as usize;
                let y = (v * (h - 1) as f32).round() as usize;
                self.editor.set_cross_section(x, y);
            }
        }
    }

    fn mask_controls(&mut self, ui: &mut egui::Ui) {
        ui.label("New mask size");
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut self.new_width).range(2..=4096));
            ui.label("×");
            ui.add(egui::DragValue::new(&mut self.new_height).range(2..=4096));
        });
        if ui.button("New Mask").clicked() {
            self.status_message = match self
                .editor
                .replace_volume(ReliefMask::new(self.new_width, self.new_height))
            {
                Ok(_) => format!("New {}×{} mask", self.new_width, self.new_height),
                Err(e) => format!("New mask failed: {e}"),
            };
        }

        ui.separator();

        let field = self.editor.field();
        let (xdim, ydim) = (field.xdim(), field.ydim());
        let mut cross = self.editor.cross_section();
        ui.label("Cross-section");
        ui.add(egui::Slider::new(&mut cross.x, 0..=xdim - 1).text("x"));
        ui.add(egui::Slider::new(&mut cross.y, 0..=ydim - 1).text("y"));
        if cross != self.editor.cross_section() {
            self.editor.set_cross_section(cross.x, cross.y);
        }

        let mut active = self.editor.active_surface();
        ui.horizontal(|ui| {
            ui.radio_value(&mut active, Surface::Top, "Top");
            ui.radio_value(&mut active, Surface::Bottom, "Bottom");
        });
        self.editor.select_surface(active);

        let cross = self.editor.cross_section();
        let restorable = self.editor.undo_slot().is_some_and(|slot| slot.row == cross.y);
        let removable = cross.y != 0
            && cross.y != ydim - 1
            && self.editor.field().has_ridge(cross.y, active);

        ui.horizontal(|ui| {
            if ui.button("◀ Prev").clicked() {
                let _ = self.editor.previous_ridge();
            }
            if ui.button("Next ▶").clicked() {
                let _ = self.editor.next_ridge();
            }
        });
        ui.horizontal(|ui| {
            let can_add = !self.editor.field().has_ridge(cross.y, active);
            if ui.add_enabled(can_add, egui::Button::new("Add Ridge")).clicked() {
                let _ = self.editor.add_ridge();
            }
            if restorable {
                if ui.button("Restore Ridge").clicked() {
                    let _ = self.editor.restore_ridge();
                }
            } else if ui
                .add_enabled(removable, egui::Button::new("Remove Ridge"))
                .clicked()
            {
                let _ = self.editor.remove_ridge();
            }
        });
    }

    fn file_controls(&mut self, ui: &mut egui::Ui) {
        if ui.button("Load JSON…").clicked() {
            if let Some(path) = rfd::FileDialog::new().add_filter("mask", &["json"]).pick_file() {
                self.status_message = match std::fs::read_to_string(&path) {
                    Ok(text) => match self.editor.load_json(&text) {
                        Ok(()) => format!("Loaded {}", path.display()),
                        Err(e) => format!("Load failed: {e}"),
                    },
                    Err(e) => format!("Read failed: {e}"),
                };
            }
        }

        if ui.button("Save JSON…").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("mask", &["json"])
                .set_file_name("mask.json")
                .save_file()
            {
                let written = self
                    .editor
                    .save_json()
                    .map_err(|e| e.to_string())
                    .and_then(|text| std::fs::write(&path, text).map_err(|e| e.to_string()));
                self.status_message = match written {
                    Ok(()) => format!("Saved {}", path.display()),
                    Err(e) => format!("Save failed: {e}"),
                };
            }
        }

        if ui.button("Save PNG…").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("png", &["png"])
                .set_file_name("mask16.png")
                .save_file()
            {
                self.status_message = match self.editor.mask().save_png(&path) {
                    Ok(()) => format!("Saved {}", path.display()),
                    Err(e) => format!("PNG error: {e}"),
                };
            }
        }
    }

    fn db_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut self.mask_name);
        });

        if ui.button("Save to DB…").clicked() {
            let name = self.mask_name.clone();
            let field = self.editor.field();
            let res = run_db(async {
                let store = MaskStore::init(DB_URI, DB_NAME, DB_COLLECTION).await?;
                store.save(&name, field).await
            });
            self.status_message = match res {
                Ok(()) => format!("Saved {name:?} to MongoDB"),
                Err(e) => format!("DB error: {e}"),
            };
        }

        if ui.button("Load from DB…").clicked() {
            let name = self.mask_name.clone();
            let res = run_db(async {
                let store = MaskStore::init(DB_URI, DB_NAME, DB_COLLECTION).await?;
                store.load(&name).await
            });
            self.status_message = match res {
                Ok(Some(field)) => match self.editor.install_field(field) {
                    Ok(()) => format!("Loaded {name:?} from MongoDB"),
                    Err(e) => format!("Load failed: {e}"),
                },
                Ok(None) => format!("No mask named {name:?}"),
                Err(e) => format!("DB error: {e}"),
            };
        }
    }
}

impl App for ReliefApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.sync_preview(ctx);

        egui::SidePanel::left("controls").show(ctx, |ui| {
            ui.heading("Relief Mask Editor");
            ui.separator();
            self.mask_controls(ui);
            ui.separator();
            self.file_controls(ui);
            ui.separator();
            self.db_controls(ui);
            ui.separator();
            if self.editor.is_void() {
                ui.label("Mask is empty");
            }
            ui.label(&self.status_message);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            let view_height = avail.y * 0.5;
            ui.horizontal(|ui| {
                self.primary_view(ctx, ui, Vec2::new(avail.x * 0.62, view_height));
                self.secondary_view(ctx, ui, Vec2::new(avail.x * 0.36, view_height));
            });
            ui.separator();
            let plan = ui.available_size();
            self.plan_view(ui, plan);
        });
    }
}

fn load_config() -> EditorConfig {
    let Some(path) = std::env::var_os("RELIEF_CONFIG").map(PathBuf::from) else {
        return EditorConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("editor config from {}", path.display());
            EditorConfig::from_json_or_default(Some(&text))
        }
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            EditorConfig::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config();
    let opts = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };
    run_native(
        "Relief Mask Editor",
        opts,
        Box::new(|_cc| Ok(Box::new(ReliefApp::new(config)?))),
    )
}

use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, RichText};
use pyviz_lang::{BACKGROUND, ElementKind, EngineConfig, ExecutionResult, Rgb, Session};
use pyviz_surface::{CallLog, DrawCall, DrawSurface, RecordSurface, SurfaceError, render_elements};
use tracing::{debug, warn};

use crate::watch::{DEFAULT_INTERVAL, FileWatcher};

const CANVAS_SIZE: egui::Vec2 = egui::vec2(800.0, 600.0);

const SAMPLE: &str = "\
numbers = [3, 1, 4, 1, 5]
total = 0
for n in numbers:
    total += n
if total > 10:
    print(f\"big: {total}\")
else:
    print(\"small\")
";

pub fn run(file: Option<PathBuf>, config: EngineConfig) -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("pyviz", options, Box::new(move |_cc| Ok(Box::new(App::new(file, config)))))
}

fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.r, c.g, c.b)
}

// ─── Painter surface ──────────────────────────────────────────────────────────

/// Draws onto an egui painter, offset to the allocated canvas rect.
struct PainterSurface<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
    font: egui::FontId,
}

impl PainterSurface<'_> {
    fn pos(&self, x: i32, y: i32) -> egui::Pos2 {
        self.origin + egui::vec2(x as f32, y as f32)
    }
}

impl DrawSurface for PainterSurface<'_> {
    fn clear(&mut self, color: Rgb) -> Result<(), SurfaceError> {
        self.painter.rect_filled(self.painter.clip_rect(), 0.0, color32(color));
        Ok(())
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) -> Result<(), SurfaceError> {
        let rect = egui::Rect::from_min_size(self.pos(x, y), egui::vec2(w.max(0) as f32, h.max(0) as f32));
        self.painter.rect_filled(rect, 0.0, color32(color));
        Ok(())
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb) -> Result<(), SurfaceError> {
        self.painter.text(self.pos(x, y), egui::Align2::LEFT_CENTER, text, self.font.clone(), color32(color));
        Ok(())
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<(), SurfaceError> {
        self.rect(x, y, 1, 1, color)
    }

    fn commit(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

// ─── App state ────────────────────────────────────────────────────────────────

#[derive(PartialEq)]
enum Tab { Canvas, Elements, Variables, Operations, Errors }

struct App {
    source: String,
    session: Session,
    /// Keep variables and elements across edits.
    live: bool,
    result: ExecutionResult,
    /// The rendered frame as draw calls, and as an operation log.
    frame: Vec<DrawCall>,
    operations: String,
    errors: Vec<String>,
    tab: Tab,
    watcher: Option<FileWatcher>,
    last_poll: Instant,
}

impl App {
    fn new(file: Option<PathBuf>, config: EngineConfig) -> Self {
        let mut watcher = file.map(|path| FileWatcher::new(path, DEFAULT_INTERVAL));
        let mut load_error = None;
        let source = match watcher.as_mut().map(FileWatcher::poll) {
            Some(Ok(Some(source))) => source,
            Some(Ok(None)) | None => SAMPLE.to_string(),
            Some(Err(e)) => {
                load_error = Some(e.to_string());
                String::new()
            }
        };

        let mut session = Session::new(config);
        let result = session.execute(&source);
        let mut app = Self {
            source,
            session,
            live: false,
            result,
            frame: Vec::new(),
            operations: String::new(),
            errors: Vec::new(),
            tab: Tab::Canvas,
            watcher,
            last_poll: Instant::now(),
        };
        app.record_frame();
        app.errors.extend(load_error);
        app
    }

    fn rerun(&mut self) {
        self.result = if self.live {
            self.session.execute_live(&self.source)
        } else {
            self.session.execute(&self.source)
        };
        self.record_frame();
    }

    /// Renders the current elements once through a recorder, keeping both the
    /// calls (for the canvas) and the CSV text (for the operations tab).
    fn record_frame(&mut self) {
        self.errors.clear();
        self.errors.extend(self.result.error.clone());
        self.errors.extend(
            self.result.elements.iter().filter(|el| el.kind == ElementKind::Error).map(|el| el.text.clone()),
        );

        let recorded = RecordSurface::new(CallLog::new(), Vec::new()).and_then(|mut rec| {
            render_elements(&self.result.elements, &mut rec, BACKGROUND)?;
            Ok(rec.into_parts())
        });
        match recorded {
            Ok((log, csv)) => {
                self.frame = log.calls;
                self.operations = String::from_utf8_lossy(&csv).into_owned();
            }
            Err(e) => self.errors.push(format!("[render] {e}")),
        }
    }

    fn poll_file(&mut self) {
        let Some(watcher) = &mut self.watcher else { return };
        if self.last_poll.elapsed() < watcher.interval() {
            return;
        }
        self.last_poll = Instant::now();
        match watcher.poll() {
            Ok(Some(source)) => {
                debug!(path = %watcher.path().display(), "reloading");
                self.source = source;
                self.rerun();
            }
            Ok(None) => {}
            Err(e) => warn!(path = %watcher.path().display(), error = %e, "cannot reload"),
        }
    }
}

// ─── UI ───────────────────────────────────────────────────────────────────────

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_file();
        if self.watcher.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |cols| {
                // ── Left: editor ──────────────────────────────────────────────
                cols[0].vertical(|ui| {
                    let label = match &self.watcher {
                        Some(w) => format!("Source ({})", w.path().display()),
                        None => "Source".into(),
                    };
                    ui.label(label);
                    let response = ui.add(
                        egui::TextEdit::multiline(&mut self.source)
                            .font(egui::TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .desired_rows(44),
                    );
                    if response.changed() {
                        self.rerun();
                    }
                });

                // ── Right: output ─────────────────────────────────────────────
                cols[1].vertical(|ui| {
                    // ── Status bar ────────────────────────────────────────────
                    ui.horizontal(|ui| {
                        if self.errors.is_empty() {
                            ui.label(RichText::new("✓  ok").color(Color32::from_rgb(80, 200, 80)));
                        } else {
                            ui.label(
                                RichText::new(format!("✗  {} error(s)", self.errors.len()))
                                    .color(Color32::from_rgb(220, 80, 80)),
                            );
                        }
                        ui.label(
                            RichText::new(format!(
                                "{} elements  {:.2} ms",
                                self.result.elements.len(),
                                self.result.elapsed_ms,
                            ))
                            .monospace()
                            .color(Color32::GRAY),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("reset").clicked() {
                                self.session.reset();
                                self.rerun();
                            }
                            if ui.button("run").clicked() {
                                self.rerun();
                            }
                            ui.checkbox(&mut self.live, "live session");
                        });
                    });

                    ui.separator();

                    // ── Tab bar ───────────────────────────────────────────────
                    ui.horizontal(|ui| {
                        let err_label = if self.errors.is_empty() {
                            "Errors".into()
                        } else {
                            format!("Errors ({})", self.errors.len())
                        };
                        ui.selectable_value(&mut self.tab, Tab::Canvas, "Canvas");
                        ui.selectable_value(&mut self.tab, Tab::Elements, "Elements");
                        ui.selectable_value(&mut self.tab, Tab::Variables, "Variables");
                        ui.selectable_value(&mut self.tab, Tab::Operations, "Operations");
                        ui.selectable_value(&mut self.tab, Tab::Errors, err_label);
                    });

                    ui.separator();

                    // ── Tab content ───────────────────────────────────────────
                    egui::ScrollArea::both().show(ui, |ui| match self.tab {
                        Tab::Canvas => self.show_canvas(ui),
                        Tab::Elements => self.show_elements(ui),
                        Tab::Variables => self.show_variables(ui),
                        Tab::Operations => self.show_operations(ui),
                        Tab::Errors => self.show_errors(ui),
                    });
                });
            });
        });
    }
}

impl App {
    fn show_canvas(&self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(CANVAS_SIZE, egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let mut surface = PainterSurface {
            painter: &painter,
            origin: rect.min,
            font: egui::FontId::monospace(13.0),
        };
        for call in &self.frame {
            if let Err(e) = call.apply(&mut surface) {
                warn!(call = call.name(), error = %e, "canvas draw failed");
            }
        }
    }

    fn show_elements(&self, ui: &mut egui::Ui) {
        if self.result.elements.is_empty() {
            ui.label(RichText::new("No elements.").color(Color32::GRAY));
            return;
        }
        egui::Grid::new("elements_grid").striped(true).min_col_width(60.0).show(ui, |ui| {
            ui.label(RichText::new("#").strong());
            ui.label(RichText::new("kind").strong());
            ui.label(RichText::new("pos").strong());
            ui.label(RichText::new("text").strong());
            ui.end_row();

            for (i, el) in self.result.elements.iter().enumerate() {
                ui.label(RichText::new(i.to_string()).monospace().color(Color32::GRAY));
                ui.label(RichText::new(el.kind.as_str()).monospace().color(Color32::from_rgb(180, 140, 255)));
                ui.label(RichText::new(format!("({}, {})", el.x, el.y)).monospace());
                let text = match el.kind {
                    ElementKind::VariableBar => el
                        .meta("bar_width")
                        .map(|w| format!("bar {}px", w.repr()))
                        .unwrap_or_default(),
                    _ => el.text.clone(),
                };
                ui.label(RichText::new(text).monospace().color(color32(el.color)));
                ui.end_row();
            }
        });
    }

    fn show_variables(&self, ui: &mut egui::Ui) {
        if self.result.variables.is_empty() {
            ui.label(RichText::new("No variables.").color(Color32::GRAY));
            return;
        }
        egui::Grid::new("variables_grid").striped(true).min_col_width(80.0).show(ui, |ui| {
            ui.label(RichText::new("name").strong());
            ui.label(RichText::new("type").strong());
            ui.label(RichText::new("value").strong());
            ui.end_row();

            for (name, value) in &self.result.variables {
                ui.label(RichText::new(name).monospace());
                ui.label(RichText::new(value.type_name()).monospace().color(Color32::from_rgb(100, 180, 255)));
                ui.label(RichText::new(value.repr()).monospace().color(Color32::from_rgb(210, 210, 170)));
                ui.end_row();
            }
        });
    }

    fn show_operations(&self, ui: &mut egui::Ui) {
        ui.add(
            egui::TextEdit::multiline(&mut self.operations.as_str())
                .font(egui::TextStyle::Monospace)
                .desired_width(f32::INFINITY),
        );
    }

    fn show_errors(&self, ui: &mut egui::Ui) {
        if self.errors.is_empty() {
            ui.label(RichText::new("No errors.").color(Color32::GRAY));
            return;
        }
        for msg in &self.errors {
            ui.label(RichText::new(msg).monospace().color(Color32::from_rgb(220, 80, 80)));
        }
    }
}

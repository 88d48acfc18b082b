use anyhow::{Context as _, Result};
use chrono::Local;
use eframe::egui::{self, Context as EguiContext, Key, RichText, TopBottomPanel};
use eframe::{App, Frame};

use crate::action_bar;
use crate::annotation::Tool;
use crate::canvas::{self, CanvasInput};
use crate::config::{Command, StoreConfig, UserSettings};
use crate::flatten;
use crate::gesture::{self, GestureState};
use crate::model::AnnotationSet;
use crate::properties;
use crate::state::{AppUiFlags, EditorSession, PhotoImage, ToastKind, ToolStyle};
use crate::store::{HttpStore, StoreEvent, StoreRequest, StoreWorker};
use crate::theme;
use crate::toolbar;
use crate::ui_controls;
use crate::viewer::{self, DetailAction, DetailView, ShareView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpenMode {
    Edit,
    View,
}

struct EditorScreen {
    photo_id: String,
    caption: Option<String>,
    /// Last set known to be in the store; restored on cancel.
    saved: AnnotationSet,
    session: EditorSession,
    photo: PhotoImage,
    input: CanvasInput,
}

enum Screen {
    Loading(String),
    Editor(Box<EditorScreen>),
    Detail(DetailView),
    Share(ShareView),
    Failed(String),
}

pub struct SiteMarkApp {
    screen: Screen,
    pending_open: Option<OpenMode>,
    worker: StoreWorker,
    settings: UserSettings,
    ui_flags: AppUiFlags,
    theme: theme::AppTheme,
}

impl SiteMarkApp {
    pub fn new(cc: &eframe::CreationContext<'_>, command: Command, store: StoreConfig) -> Self {
        let theme = theme::field_dark_theme();
        theme::apply_theme(&cc.egui_ctx, &theme);

        let settings = UserSettings::load().unwrap_or_else(|err| {
            tracing::debug!(error = %err, "using default settings");
            UserSettings::default()
        });

        let mut app = Self::with_worker(StoreWorker::spawn(HttpStore::new(store)), settings);
        app.theme = theme;
        app.open(command);
        app
    }

    fn with_worker(worker: StoreWorker, settings: UserSettings) -> Self {
        Self {
            screen: Screen::Loading(String::new()),
            pending_open: None,
            worker,
            settings,
            ui_flags: AppUiFlags::new(),
            theme: theme::field_dark_theme(),
        }
    }

    fn open(&mut self, command: Command) {
        let (label, request) = match command {
            Command::Edit { photo_id } => {
                self.pending_open = Some(OpenMode::Edit);
                (format!("Loading photo {photo_id}…"), StoreRequest::LoadPhoto { photo_id })
            }
            Command::View { photo_id } => {
                self.pending_open = Some(OpenMode::View);
                (format!("Loading photo {photo_id}…"), StoreRequest::LoadPhoto { photo_id })
            }
            Command::Share { token } => {
                self.pending_open = None;
                ("Loading shared project…".to_owned(), StoreRequest::LoadShared { token })
            }
        };
        self.screen = if self.worker.request(request) {
            Screen::Loading(label)
        } else {
            Screen::Failed("Store worker is not running".to_owned())
        };
    }

    fn tool_style(&self) -> ToolStyle {
        ToolStyle::from(&self.settings)
    }

    fn remember_style(&mut self, style: &ToolStyle) {
        self.settings.last_color = style.color.as_str().to_owned();
        self.settings.last_font_size = style.font_size;
        self.settings.last_line_width = style.line_width;
        if let Err(err) = self.settings.save() {
            tracing::warn!(error = %err, "cannot persist settings");
        }
    }

    fn process_store_events(&mut self, ctx: &EguiContext) {
        let now = ctx.input(|input| input.time);
        while let Some(event) = self.worker.try_recv() {
            self.apply_store_event(now, event);
        }
    }

    fn apply_store_event(&mut self, now: f64, event: StoreEvent) {
        match event {
            StoreEvent::PhotoLoaded {
                record,
                annotations,
                image,
            } => {
                let photo = PhotoImage::new(image);
                self.screen = match self.pending_open.take() {
                    Some(OpenMode::Edit) => Screen::Editor(Box::new(EditorScreen {
                        photo_id: record.id,
                        caption: record.caption,
                        saved: annotations.clone(),
                        session: EditorSession::new(annotations, self.tool_style()),
                        photo,
                        input: CanvasInput::default(),
                    })),
                    Some(OpenMode::View) | None => Screen::Detail(DetailView {
                        photo_id: record.id,
                        caption: record.caption,
                        annotations,
                        photo,
                    }),
                };
            }
            StoreEvent::SharedLoaded { project, photos } => {
                self.screen = Screen::Share(ShareView::new(project, photos));
            }
            StoreEvent::Saved {
                photo_id,
                annotations,
            } => self.finish_save(now, photo_id, annotations),
            StoreEvent::Failed { action, error } => {
                let message = format!("Failed to {action}: {error}");
                self.ui_flags.notify(now, ToastKind::Error, message.clone());
                if matches!(self.screen, Screen::Loading(_)) {
                    self.pending_open = None;
                    self.screen = Screen::Failed(message);
                } else if let Screen::Editor(editor) = &mut self.screen {
                    if editor.session.saving {
                        editor.session.finish_save(false);
                    }
                }
            }
        }
    }

    /// Shows the detail view of the photo with the saved set. A detail view
    /// already open for the photo takes the saved set too.
    fn finish_save(&mut self, now: f64, photo_id: String, annotations: AnnotationSet) {
        let screen = std::mem::replace(&mut self.screen, Screen::Loading(String::new()));
        self.screen = match screen {
            Screen::Editor(mut editor) if editor.photo_id == photo_id => {
                editor.session.finish_save(true);
                Screen::Detail(DetailView {
                    photo_id: editor.photo_id,
                    caption: editor.caption,
                    annotations,
                    photo: editor.photo,
                })
            }
            Screen::Detail(mut view) if view.photo_id == photo_id => {
                view.annotations = annotations;
                Screen::Detail(view)
            }
            other => other,
        };
        tracing::info!(%photo_id, "save confirmed");
        self.ui_flags
            .notify(now, ToastKind::Success, "Annotations saved");
    }

    fn start_save(&mut self, now: f64) {
        let Screen::Editor(editor) = &mut self.screen else {
            return;
        };
        gesture::abandon_gesture(&mut editor.session);
        if !editor.session.begin_save() {
            return;
        }
        let request = StoreRequest::SaveAnnotations {
            photo_id: editor.photo_id.clone(),
            annotations: editor.session.model.annotations().clone(),
        };
        if !self.worker.request(request) {
            editor.session.finish_save(false);
            self.ui_flags
                .notify(now, ToastKind::Error, "Failed to save annotations");
        }
    }

    fn close_editor(&mut self) {
        let screen = std::mem::replace(&mut self.screen, Screen::Loading(String::new()));
        self.screen = match screen {
            Screen::Editor(editor) => {
                if editor.session.dirty {
                    tracing::info!(photo_id = %editor.photo_id, "discarding unsaved annotations");
                }
                Screen::Detail(DetailView {
                    photo_id: editor.photo_id,
                    caption: editor.caption,
                    annotations: editor.saved,
                    photo: editor.photo,
                })
            }
            other => other,
        };
    }

    fn open_editor_from_detail(&mut self) {
        let style = self.tool_style();
        let screen = std::mem::replace(&mut self.screen, Screen::Loading(String::new()));
        self.screen = match screen {
            Screen::Detail(view) => Screen::Editor(Box::new(EditorScreen {
                photo_id: view.photo_id,
                caption: view.caption,
                saved: view.annotations.clone(),
                session: EditorSession::new(view.annotations, style),
                photo: view.photo,
                input: CanvasInput::default(),
            })),
            other => other,
        };
    }

    fn export(&mut self, now: f64) {
        let Screen::Editor(editor) = &self.screen else {
            return;
        };
        match export_dialog(editor) {
            Ok(Some(path)) => self.ui_flags.notify(
                now,
                ToastKind::Success,
                format!("Exported to {}", path.display()),
            ),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "export failed");
                self.ui_flags
                    .notify(now, ToastKind::Error, format!("Export failed: {err:#}"));
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &EguiContext) {
        let now = ctx.input(|input| input.time);
        let Screen::Editor(editor) = &mut self.screen else {
            return;
        };
        if editor.session.prompt.is_some() || ctx.wants_keyboard_input() {
            return;
        }
        let session = &mut editor.session;
        let cmd = ctx.input(|input| input.modifiers.command || input.modifiers.ctrl);
        let pressed = |key: Key| ctx.input(|input| input.key_pressed(key));

        if cmd {
            if pressed(Key::Z) {
                session.undo_last();
            }
            if pressed(Key::S) {
                self.start_save(now);
            }
            return;
        }

        if pressed(Key::Escape) {
            if !matches!(session.gesture, GestureState::Idle) {
                gesture::abandon_gesture(session);
            } else if session.tool != Tool::Select {
                session.set_tool(Tool::Select);
            } else {
                session.model.clear_selection();
            }
        }
        for (key, tool) in [
            (Key::V, Tool::Select),
            (Key::M, Tool::Dimension),
            (Key::T, Tool::Text),
            (Key::D, Tool::Freehand),
        ] {
            if pressed(key) {
                session.set_tool(tool);
            }
        }
        if pressed(Key::Delete) || pressed(Key::Backspace) {
            session.delete_selected();
        }
        if pressed(Key::Num0) {
            session.viewport.reset();
        }
    }

    fn show_toast(&self, ctx: &EguiContext) {
        let now = ctx.input(|input| input.time);
        let Some(toast) = self.ui_flags.active_toast(now) else {
            return;
        };
        let color = match toast.kind {
            ToastKind::Success => self.theme.text.accent,
            ToastKind::Error => self.theme.text.error,
        };
        egui::Area::new(egui::Id::new("sitemark_toast"))
            .order(egui::Order::Tooltip)
            .anchor(
                egui::Align2::CENTER_BOTTOM,
                egui::vec2(0.0, -(self.theme.layout.action_bar_height + 16.0)),
            )
            .show(ctx, |ui| {
                ui_controls::card_frame(&self.theme).show(ui, |ui| {
                    ui.label(RichText::new(&toast.message).color(color).strong());
                });
            });
    }

    fn show_editor(&mut self, ctx: &EguiContext) {
        let now = ctx.input(|input| input.time);
        let Screen::Editor(editor) = &mut self.screen else {
            return;
        };

        let style_changed = TopBottomPanel::top("toolbar")
            .exact_height(self.theme.layout.toolbar_height)
            .frame(ui_controls::toolbar_frame(&self.theme))
            .show(ctx, |ui| {
                let width_class = self.theme.width_class(ui.available_width());
                if editor.session.model.selected().is_some() {
                    properties::show_properties(ui, &mut editor.session);
                    false
                } else {
                    toolbar::show_toolbar(ui, &mut editor.session, width_class)
                }
            })
            .inner;

        let actions = TopBottomPanel::bottom("action_bar")
            .exact_height(self.theme.layout.action_bar_height)
            .frame(ui_controls::action_bar_frame(&self.theme))
            .show(ctx, |ui| {
                let width_class = self.theme.width_class(ui.available_width());
                action_bar::show_action_bar(ui, &editor.session, width_class)
            })
            .inner;

        egui::CentralPanel::default()
            .frame(central_frame(&self.theme))
            .show(ctx, |ui| {
                canvas::show_canvas(
                    ui,
                    ctx,
                    &mut editor.session,
                    &mut editor.photo,
                    &mut editor.input,
                );
            });

        if actions.fit {
            editor.session.viewport.reset();
        }
        if actions.undo {
            editor.session.undo_last();
        }
        if style_changed {
            let style = editor.session.style.clone();
            self.remember_style(&style);
        }
        if actions.export {
            self.export(now);
        }
        if actions.save {
            self.start_save(now);
        }
        if actions.cancel {
            self.close_editor();
        }
    }
}

fn central_frame(theme: &theme::AppTheme) -> egui::Frame {
    egui::Frame::none()
        .fill(theme.surfaces.app_bg)
        .inner_margin(egui::Margin::symmetric(
            theme.layout.panel_padding_x,
            theme.layout.panel_padding_y + 2.0,
        ))
}

fn export_dialog(editor: &EditorScreen) -> Result<Option<std::path::PathBuf>> {
    let default_name = format!(
        "photo-{}-{}.png",
        editor.photo_id,
        Local::now().format("%Y%m%d-%H%M%S")
    );
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export annotated photo")
        .set_file_name(&default_name)
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .save_file()
    else {
        return Ok(None);
    };
    flatten::export_to_path(
        &editor.photo.dynamic,
        editor.session.model.annotations(),
        &path,
    )
    .context("export failed")?;
    Ok(Some(path))
}

impl App for SiteMarkApp {
    fn update(&mut self, ctx: &EguiContext, _frame: &mut Frame) {
        theme::apply_theme(ctx, &self.theme);
        self.process_store_events(ctx);
        self.handle_shortcuts(ctx);

        match self.screen {
            Screen::Editor(_) => self.show_editor(ctx),
            Screen::Detail(ref mut view) => {
                let action = egui::CentralPanel::default()
                    .frame(central_frame(&self.theme))
                    .show(ctx, |ui| {
                        viewer::show_detail(ui, ctx, view, &mut self.ui_flags.show_annotations)
                    })
                    .inner;
                if action == DetailAction::Annotate {
                    self.open_editor_from_detail();
                }
            }
            Screen::Share(ref mut view) => {
                egui::CentralPanel::default()
                    .frame(central_frame(&self.theme))
                    .show(ctx, |ui| {
                        viewer::show_share(ui, ctx, view, &mut self.ui_flags.show_annotations);
                    });
            }
            Screen::Loading(ref label) => {
                egui::CentralPanel::default()
                    .frame(central_frame(&self.theme))
                    .show(ctx, |ui| {
                        ui.centered_and_justified(|ui| {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label(RichText::new(label.as_str()).color(self.theme.text.secondary));
                            });
                        });
                    });
            }
            Screen::Failed(ref message) => {
                egui::CentralPanel::default()
                    .frame(central_frame(&self.theme))
                    .show(ctx, |ui| {
                        ui.centered_and_justified(|ui| {
                            ui.label(RichText::new(message.as_str()).color(self.theme.text.error));
                        });
                    });
            }
        }

        self.show_toast(ctx);
        ctx.request_repaint_after(std::time::Duration::from_millis(
            self.theme.motion.fast_ms as u64,
        ));
    }
}

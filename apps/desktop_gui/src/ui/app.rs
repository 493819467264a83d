//! Application shell: directory tree panel, photo grid, filter bar, status line.

use std::collections::{HashMap, HashSet};

use client_core::{GridPhoto, PhotoTree, SortDirection, StatusFilter};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::{DirectoryNode, PhotoStatus};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{PreviewImage, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

pub const SETTINGS_STORAGE_KEY: &str = "photo_moderation_desktop_settings";

const CARD_WIDTH: f32 = 184.0;
const THUMBNAIL_DISPLAY_WIDTH: f32 = 168.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDesktopSettings {
    pub server_url: String,
    pub root_path: String,
}

impl Default for PersistedDesktopSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            root_path: String::new(),
        }
    }
}

enum ThumbnailState {
    Loading,
    Ready {
        image: PreviewImage,
        texture: Option<egui::TextureHandle>,
    },
    Failed,
}

pub struct ModerationGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    server_url: String,
    root_path: String,
    connected: bool,

    tree: Option<PhotoTree>,
    tree_error: Option<String>,
    selected_dir: Option<String>,

    grid: Vec<GridPhoto>,
    pending_count: usize,
    selected_photos: HashSet<String>,
    filter: StatusFilter,
    sort: SortDirection,
    saving: bool,

    thumbnails: HashMap<String, ThumbnailState>,
    status: String,
}

impl ModerationGuiApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: PersistedDesktopSettings,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            server_url: settings.server_url,
            root_path: settings.root_path,
            connected: false,
            tree: None,
            tree_error: None,
            selected_dir: None,
            grid: Vec::new(),
            pending_count: 0,
            selected_photos: HashSet::new(),
            filter: StatusFilter::All,
            sort: SortDirection::Ascending,
            saving: false,
            thumbnails: HashMap::new(),
            status: "Not connected".to_string(),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => self.status = message,
                UiEvent::TreeLoaded { root } => {
                    self.tree = Some(PhotoTree::new(root));
                    self.tree_error = None;
                    self.connected = true;
                    self.selected_dir = None;
                    self.grid.clear();
                    self.selected_photos.clear();
                    self.thumbnails.clear();
                    self.pending_count = 0;
                    self.filter = StatusFilter::All;
                    self.status = "Directory tree loaded".to_string();
                }
                UiEvent::DirectorySelected { path, photo_count } => {
                    self.selected_dir = Some(path.clone());
                    self.selected_photos.clear();
                    self.thumbnails.clear();
                    self.filter = StatusFilter::All;
                    self.status = format!("{path}: {photo_count} photos");
                }
                UiEvent::GridUpdated {
                    photos,
                    pending_count,
                } => {
                    self.grid = photos;
                    self.pending_count = pending_count;
                }
                UiEvent::SaveCompleted { applied } => {
                    self.saving = false;
                    self.status = format!("Saved {} status change(s)", applied.len());
                }
                UiEvent::ThumbnailLoaded { path, image } => {
                    self.thumbnails.insert(
                        path,
                        ThumbnailState::Ready {
                            image,
                            texture: None,
                        },
                    );
                }
                UiEvent::ThumbnailFailed { path, reason } => {
                    tracing::debug!(%path, %reason, "thumbnail fetch failed");
                    self.thumbnails.insert(path, ThumbnailState::Failed);
                }
                UiEvent::Error(err) => {
                    if err.replaces_workspace() {
                        self.tree = None;
                        self.grid.clear();
                        self.tree_error = Some(err.message().to_string());
                    }
                    if matches!(err.context(), UiErrorContext::Save) {
                        self.saving = false;
                    }
                    self.status = format!("Error: {}", err.message());
                }
            }
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Server");
                ui.add(egui::TextEdit::singleline(&mut self.server_url).desired_width(240.0));
                ui.label("Library root");
                ui.add(egui::TextEdit::singleline(&mut self.root_path).desired_width(180.0));
                if ui.button("Connect").clicked() {
                    let root_path = if self.root_path.trim().is_empty() {
                        None
                    } else {
                        Some(self.root_path.trim().to_string())
                    };
                    let cmd = BackendCommand::Connect {
                        server_url: self.server_url.trim().to_string(),
                        root_path,
                    };
                    dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
                    self.status = "Connecting...".to_string();
                }
                if self.connected && ui.button("Reload tree").clicked() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ReloadTree,
                        &mut self.status,
                    );
                }
            });
        });
    }

    fn tree_panel(&mut self, ctx: &egui::Context) {
        let mut toggled: Vec<String> = Vec::new();
        let mut clicked: Option<String> = None;
        let mut retry = false;

        egui::SidePanel::left("directory_tree_panel")
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.heading("Photo sessions");
                ui.separator();
                if let Some(error) = &self.tree_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, error);
                    if ui.button("Retry").clicked() {
                        retry = true;
                    }
                    return;
                }
                let Some(tree) = &self.tree else {
                    ui.label("Not connected");
                    return;
                };
                egui::ScrollArea::vertical().show(ui, |ui| {
                    render_tree_level(
                        ui,
                        tree,
                        tree.root(),
                        "",
                        &self.selected_dir,
                        &mut toggled,
                        &mut clicked,
                    );
                });
            });

        if retry {
            dispatch_backend_command(&self.cmd_tx, BackendCommand::ReloadTree, &mut self.status);
        }
        if let Some(tree) = &mut self.tree {
            for path in toggled {
                tree.toggle_expanded(&path);
            }
        }
        if let Some(path) = clicked {
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::SelectDirectory { path },
                &mut self.status,
            );
        }
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.saving {
                        ui.label("Saving...");
                    } else if self.pending_count > 0 {
                        ui.colored_label(
                            egui::Color32::GOLD,
                            format!("{} unsaved change(s)", self.pending_count),
                        );
                    }
                });
            });
        });
    }

    fn grid_panel(&mut self, ctx: &egui::Context) {
        let mut filter_clicked: Option<StatusFilter> = None;
        let mut sort_clicked = false;
        let mut save_clicked = false;
        let mut cycle_clicked: Option<String> = None;
        let mut select_toggled: Option<String> = None;
        let mut requested: Vec<String> = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                let all_selected = self.filter == StatusFilter::All;
                if ui.selectable_label(all_selected, "All").clicked() {
                    filter_clicked = Some(StatusFilter::All);
                }
                for status in PhotoStatus::ALL {
                    let selected = self.filter == StatusFilter::Only(status);
                    if ui.selectable_label(selected, status.label()).clicked() {
                        filter_clicked = Some(StatusFilter::Only(status));
                    }
                }
                ui.separator();
                let sort_label = match self.sort {
                    SortDirection::Ascending => "Sort A-Z",
                    SortDirection::Descending => "Sort Z-A",
                };
                if ui.button(sort_label).clicked() {
                    sort_clicked = true;
                }
                ui.separator();
                let can_save = self.pending_count > 0 && !self.saving;
                let save_label = if self.saving {
                    "Saving...".to_string()
                } else {
                    format!("Apply changes ({})", self.pending_count)
                };
                if ui
                    .add_enabled(can_save, egui::Button::new(save_label))
                    .clicked()
                {
                    save_clicked = true;
                }
            });
            ui.separator();

            if self.selected_dir.is_none() {
                ui.label("Select a directory on the left");
                return;
            }
            if self.grid.is_empty() {
                ui.label("No photos in this directory");
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for item in &self.grid {
                        let path = item.photo.path.clone();
                        ui.group(|ui| {
                            ui.set_width(CARD_WIDTH);
                            ui.vertical(|ui| {
                                match self.thumbnails.get_mut(&path) {
                                    None => {
                                        requested.push(path.clone());
                                        ui.label("Loading preview...");
                                    }
                                    Some(ThumbnailState::Loading) => {
                                        ui.label("Loading preview...");
                                    }
                                    Some(ThumbnailState::Failed) => {
                                        ui.weak("No preview");
                                    }
                                    Some(ThumbnailState::Ready { image, texture }) => {
                                        if texture.is_none() {
                                            let color_image =
                                                egui::ColorImage::from_rgba_unmultiplied(
                                                    [image.width, image.height],
                                                    &image.rgba,
                                                );
                                            *texture = Some(ui.ctx().load_texture(
                                                format!("thumbnail:{path}"),
                                                color_image,
                                                egui::TextureOptions::LINEAR,
                                            ));
                                        }
                                        if let Some(texture) = texture {
                                            let scale = (THUMBNAIL_DISPLAY_WIDTH
                                                / image.width.max(1) as f32)
                                                .min(1.0);
                                            let size = egui::vec2(
                                                image.width as f32 * scale,
                                                image.height as f32 * scale,
                                            );
                                            ui.image((texture.id(), size));
                                        }
                                    }
                                }

                                let selected = self.selected_photos.contains(&path);
                                if ui
                                    .selectable_label(selected, item.photo.file_name())
                                    .clicked()
                                {
                                    select_toggled = Some(path.clone());
                                }

                                let chip = egui::RichText::new(item.status.label())
                                    .color(status_color(item.status));
                                if ui.button(chip).clicked() {
                                    cycle_clicked = Some(path.clone());
                                }

                                ui.horizontal(|ui| {
                                    if item.pending {
                                        ui.colored_label(egui::Color32::GOLD, "unsaved");
                                    }
                                    if item.photo.has_face {
                                        ui.weak("face");
                                    }
                                    if item.photo.is_nude {
                                        ui.colored_label(egui::Color32::LIGHT_RED, "18+");
                                    }
                                    if let Some(score) = item.photo.nsfw_score {
                                        ui.weak(format!("nsfw {score:.2}"));
                                    }
                                });
                            });
                        });
                    }
                });
            });
        });

        if let Some(filter) = filter_clicked {
            self.filter = filter;
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::SetFilter { filter },
                &mut self.status,
            );
        }
        if sort_clicked {
            self.sort = self.sort.toggled();
            dispatch_backend_command(&self.cmd_tx, BackendCommand::ToggleSort, &mut self.status);
        }
        if save_clicked {
            self.saving = true;
            dispatch_backend_command(&self.cmd_tx, BackendCommand::Save, &mut self.status);
        }
        if let Some(path) = cycle_clicked {
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::CycleStatus { path },
                &mut self.status,
            );
        }
        if let Some(path) = select_toggled {
            if !self.selected_photos.remove(&path) {
                self.selected_photos.insert(path);
            }
        }
        for path in requested {
            self.thumbnails
                .insert(path.clone(), ThumbnailState::Loading);
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::FetchThumbnail { path },
                &mut self.status,
            );
        }
    }
}

fn render_tree_level(
    ui: &mut egui::Ui,
    tree: &PhotoTree,
    node: &DirectoryNode,
    parent_path: &str,
    selected: &Option<String>,
    toggled: &mut Vec<String>,
    clicked: &mut Option<String>,
) {
    for (name, child) in &node.dirs {
        let path = if parent_path.is_empty() {
            name.clone()
        } else {
            format!("{parent_path}/{name}")
        };
        let expanded = tree.is_expanded(&path);
        ui.horizontal(|ui| {
            if child.dirs.is_empty() {
                ui.add_space(18.0);
            } else {
                let marker = if expanded { "-" } else { "+" };
                if ui.small_button(marker).clicked() {
                    toggled.push(path.clone());
                }
            }
            let is_selected = selected.as_deref() == Some(path.as_str());
            if ui
                .selectable_label(is_selected, directory_label(name, child))
                .clicked()
            {
                *clicked = Some(path.clone());
            }
        });
        if expanded && !child.dirs.is_empty() {
            ui.indent(path.clone(), |ui| {
                render_tree_level(ui, tree, child, &path, selected, toggled, clicked);
            });
        }
    }
}

fn directory_label(name: &str, node: &DirectoryNode) -> String {
    let stats = node.stats();
    format!(
        "{name}  ({} photos, {} nude, {} faces)",
        stats.total_files, stats.nude_files, stats.face_files
    )
}

fn status_color(status: PhotoStatus) -> egui::Color32 {
    match status {
        PhotoStatus::Normal => egui::Color32::GRAY,
        PhotoStatus::Pending => egui::Color32::from_rgb(205, 170, 60),
        PhotoStatus::Approved => egui::Color32::from_rgb(100, 170, 100),
        PhotoStatus::Rejected => egui::Color32::from_rgb(200, 95, 95),
        PhotoStatus::Published => egui::Color32::from_rgb(95, 140, 205),
    }
}

impl eframe::App for ModerationGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.top_bar(ctx);
        self.tree_panel(ctx);
        self.status_bar(ctx);
        self.grid_panel(ctx);
        // Poll the backend queue even when the user is idle.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDesktopSettings {
            server_url: self.server_url.clone(),
            root_path: self.root_path.clone(),
        };
        if let Ok(text) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, text);
        }
    }
}

//! Desktop front end for the photo moderation service.

mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use backend_bridge::commands::BackendCommand;
use backend_bridge::runtime::spawn_backend_worker;
use controller::events::UiEvent;
use ui::{ModerationGuiApp, PersistedDesktopSettings, SETTINGS_STORAGE_KEY};

#[derive(Debug, Parser)]
#[command(name = "photo-moderation-desk", version)]
struct Args {
    /// Backend base URL, e.g. http://127.0.0.1:5000
    #[arg(long)]
    server_url: Option<String>,

    /// Library subdirectory to scope the session to.
    #[arg(long)]
    root: Option<String>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_worker(cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Photo Moderation Desk")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Photo Moderation Desk",
        options,
        Box::new(move |cc| {
            let mut settings = cc
                .storage
                .and_then(|storage| {
                    storage
                        .get_string(SETTINGS_STORAGE_KEY)
                        .and_then(|text| {
                            serde_json::from_str::<PersistedDesktopSettings>(&text).ok()
                        })
                })
                .unwrap_or_default();
            if let Some(server_url) = args.server_url {
                settings.server_url = server_url;
            }
            if let Some(root) = args.root {
                settings.root_path = root;
            }
            Ok(Box::new(ModerationGuiApp::new(cmd_tx, ui_rx, settings)))
        }),
    )
}

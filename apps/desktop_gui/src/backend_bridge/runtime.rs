//! Backend worker: owns the tokio runtime and drives the moderation client.
//!
//! Commands from the UI are processed strictly in order on this thread;
//! client events are forwarded back through the bounded UI queue.

use std::sync::Arc;
use std::thread;

use client_core::{ClientEvent, ModerationClient, ThumbnailResolver};
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{PreviewImage, UiError, UiErrorContext, UiEvent};

const THUMBNAIL_MAX_EDGE: u32 = 360;

pub fn spawn_backend_worker(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_worker(cmd_rx, ui_tx));
    });
}

async fn run_worker(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    let http = reqwest::Client::new();
    let mut client: Option<Arc<ModerationClient>> = None;
    let mut thumbnails: Option<ThumbnailResolver> = None;
    let mut event_task: Option<JoinHandle<()>> = None;
    let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::Connect {
                server_url,
                root_path,
            } => {
                if let Some(task) = event_task.take() {
                    task.abort();
                }
                let fresh = Arc::new(ModerationClient::with_root(server_url, root_path));
                thumbnails = Some(ThumbnailResolver::proxy(fresh.server_url()));
                event_task = Some(forward_client_events(&fresh, ui_tx.clone()));
                if let Err(err) = fresh.load_tree().await {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::TreeLoad,
                        err.to_string(),
                    )));
                }
                client = Some(fresh);
            }
            BackendCommand::ReloadTree => {
                let Some(client) = client.as_ref() else {
                    continue;
                };
                if let Err(err) = client.load_tree().await {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::TreeLoad,
                        err.to_string(),
                    )));
                }
            }
            BackendCommand::SelectDirectory { path } => {
                let Some(client) = client.as_ref() else {
                    continue;
                };
                if let Err(err) = client.select_directory(&path).await {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Selection,
                        err.to_string(),
                    )));
                }
            }
            BackendCommand::CycleStatus { path } => {
                let Some(client) = client.as_ref() else {
                    continue;
                };
                if let Err(err) = client.cycle_status(&path).await {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::General,
                        err.to_string(),
                    )));
                }
            }
            BackendCommand::SetFilter { filter } => {
                let Some(client) = client.as_ref() else {
                    continue;
                };
                client.set_filter(filter).await;
            }
            BackendCommand::ToggleSort => {
                let Some(client) = client.as_ref() else {
                    continue;
                };
                client.toggle_sort().await;
            }
            BackendCommand::Save => {
                let Some(client) = client.as_ref() else {
                    continue;
                };
                if let Err(err) = client.save().await {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::Save,
                        err.to_string(),
                    )));
                }
            }
            BackendCommand::FetchThumbnail { path } => {
                let Some(resolver) = thumbnails.as_ref() else {
                    continue;
                };
                match fetch_thumbnail(&http, resolver, &path).await {
                    Ok(image) => {
                        let _ = ui_tx.send(UiEvent::ThumbnailLoaded { path, image });
                    }
                    Err(err) => {
                        let _ = ui_tx.send(UiEvent::ThumbnailFailed {
                            path,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
    }
}

/// Forwards client broadcasts to the UI queue. Error broadcasts are skipped:
/// the command loop above already reports every failure with its context.
fn forward_client_events(client: &Arc<ModerationClient>, ui_tx: Sender<UiEvent>) -> JoinHandle<()> {
    let mut events = client.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ClientEvent::TreeLoaded { root }) => {
                    if ui_tx.send(UiEvent::TreeLoaded { root }).is_err() {
                        break;
                    }
                }
                Ok(ClientEvent::DirectorySelected { path, photos }) => {
                    let forwarded = UiEvent::DirectorySelected {
                        path,
                        photo_count: photos.len(),
                    };
                    if ui_tx.send(forwarded).is_err() {
                        break;
                    }
                }
                Ok(ClientEvent::GridUpdated {
                    photos,
                    pending_count,
                }) => {
                    let forwarded = UiEvent::GridUpdated {
                        photos,
                        pending_count,
                    };
                    if ui_tx.send(forwarded).is_err() {
                        break;
                    }
                }
                Ok(ClientEvent::SaveCompleted { applied }) => {
                    if ui_tx.send(UiEvent::SaveCompleted { applied }).is_err() {
                        break;
                    }
                }
                Ok(ClientEvent::Error(message)) => {
                    tracing::debug!(%message, "client error broadcast");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dropped client events under load");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn fetch_thumbnail(
    http: &reqwest::Client,
    resolver: &ThumbnailResolver,
    path: &str,
) -> anyhow::Result<PreviewImage> {
    let url = resolver.url(path);
    let bytes = http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let decoded =
        image::load_from_memory(&bytes)?.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE);
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(PreviewImage {
        width: width as usize,
        height: height as usize,
        rgba: rgba.into_raw(),
    })
}

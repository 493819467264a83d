//! Command orchestration helpers from UI actions to the backend queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::Connect { .. } => "connect",
        BackendCommand::ReloadTree => "reload_tree",
        BackendCommand::SelectDirectory { .. } => "select_directory",
        BackendCommand::CycleStatus { .. } => "cycle_status",
        BackendCommand::SetFilter { .. } => "set_filter",
        BackendCommand::ToggleSort => "toggle_sort",
        BackendCommand::Save => "save",
        BackendCommand::FetchThumbnail { .. } => "fetch_thumbnail",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "Command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker disconnected (possible startup failure); restart the app"
                .to_string();
        }
    }
}

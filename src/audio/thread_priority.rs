// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Raises the priority of the calling render thread to the configured value (0-99).
/// Does nothing when no priority is configured. Failure is logged and otherwise
/// ignored, since rendering still works at normal priority.
pub fn configure_render_thread_priority(priority: Option<u8>) {
    let Some(priority) = priority else {
        return;
    };

    let value = match ThreadPriorityValue::try_from(priority) {
        Ok(value) => value,
        Err(e) => {
            warn!(priority, error = ?e, "Invalid render thread priority");
            return;
        }
    };

    match set_current_thread_priority(ThreadPriority::Crossplatform(value)) {
        Ok(()) => info!(priority, "Raised render thread priority"),
        Err(e) => warn!(priority, error = ?e, "Failed to raise render thread priority"),
    }
}

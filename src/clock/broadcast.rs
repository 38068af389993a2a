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
use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, span, trace, Instrument, Level};

use super::ClockSource;
use crate::engine::Event;

/// Periodically reads a clock and sends the value out as
/// [`Event::AudioClockUpdate`]. At most one loop runs at a time.
pub struct ClockLoop {
    clock: Arc<dyn ClockSource>,
    interval: Duration,
    events: mpsc::Sender<Event>,
    /// The running loop, if any.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ClockLoop {
    pub fn new(
        clock: Arc<dyn ClockSource>,
        interval: Duration,
        events: mpsc::Sender<Event>,
    ) -> ClockLoop {
        ClockLoop {
            clock,
            interval,
            events,
            task: Mutex::new(None),
        }
    }

    /// Starts broadcasting. Does nothing if the loop is already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Audio clock already running");
            return;
        }

        let clock = self.clock.clone();
        let events = self.events.clone();
        let interval = self.interval;
        let span = span!(Level::INFO, "clock loop");
        *task = Some(tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    match events.try_send(Event::AudioClockUpdate(clock.now())) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            trace!("Event channel full, dropping clock tick");
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("Event receiver gone, ending clock loop");
                            return;
                        }
                    }
                }
            }
            .instrument(span),
        ));
        info!(interval = ?self.interval, "Audio clock started");
    }

    /// Stops broadcasting. Does nothing if the loop isn't running.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Audio clock stopped");
        }
    }

    /// Returns true while the loop is broadcasting.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ClockLoop {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

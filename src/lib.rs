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

//! A sample cache and playback scheduler.
//!
//! Samples are fetched over HTTP, decoded into memory and cached by key, then
//! played at precise times on the audio clock: the count of frames the output
//! device has rendered. The clock itself can be broadcast at a fixed refresh
//! rate to whatever drives the engine.
//!
//! Everything is driven through an [`Engine`] with [`Command`]s; clock updates
//! come back as [`Event`]s.

pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod samples;
#[cfg(test)]
mod testutil;

pub use engine::{Command, Engine, EngineError, Event};

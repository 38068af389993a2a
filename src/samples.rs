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

//! Sample loading, caching and playback.
//!
//! Samples are fetched once, decoded entirely into memory at the output
//! sample rate, and shared between every voice that plays them.

mod cache;
mod decode;
mod error;
mod loader;
mod scheduler;

pub use cache::{LoadClaim, SampleCache};
pub use decode::{decode, DecodedSample};
pub use error::{DecodeError, LoadError};
pub use loader::{FailureHook, SampleLoader};
pub use scheduler::PlaybackScheduler;

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
use std::{io, path::PathBuf};

use thiserror::Error;

/// Why a sample payload couldn't be turned into a playable buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("no audio track found")]
    NoTrack,

    #[error("sample rate not specified")]
    NoSampleRate,

    #[error("no audio frames decoded")]
    NoFrames,

    #[error(transparent)]
    Symphonia(#[from] symphonia::core::errors::Error),

    #[error("decode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A failed sample load. Never escapes `SampleLoader::load`, which reports
/// failures through the failure hook instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid sample URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unable to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },

    #[error("unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}


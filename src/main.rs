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
use std::error::Error;
use std::path::Path;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use samplecue::{audio, config, Command, Engine, Event};

/// The key the play subcommand caches its sample under.
const PLAY_KEY: &str = "sample";

/// Extra time given to the output after a sample should have finished.
const PLAY_TAIL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample cache and playback scheduler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads a sample and plays it through the configured device.
    Play {
        /// The path to the engine config.
        config_path: String,
        /// The URL of the sample. Relative URLs use the configured base URL.
        url: String,
        /// How long to wait before playing, e.g. 500ms.
        #[arg[short, long]]
        delay: Option<String>,
    },
    /// Starts the audio clock and prints every update.
    Clock {
        /// The path to the engine config.
        config_path: String,
        /// How long to run the clock for (default: 5s).
        #[arg[short, long]]
        duration: Option<String>,
    },
}

fn parse_duration(value: Option<String>, default: Duration) -> Result<Duration, Box<dyn Error>> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|e| format!("invalid duration {}: {}", value, e))?
            .into()),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            config_path,
            url,
            delay,
        } => {
            let delay = parse_duration(delay, Duration::ZERO)?;
            let config = config::Engine::deserialize(Path::new(&config_path))?;
            let (engine, _events) = Engine::new(&config)?;

            engine.loader().try_load(PLAY_KEY, &url).await?;
            let sample = engine
                .cache()
                .get(PLAY_KEY)
                .ok_or("sample was not cached")?;

            engine.handle(Command::PlaySample {
                key: PLAY_KEY.to_string(),
                when: engine.now() + delay.as_secs_f64(),
            });
            println!(
                "Playing {} on {} ({} channels, {:.2}s)",
                url,
                engine.device(),
                sample.channel_count(),
                sample.duration().as_secs_f64()
            );
            tokio::time::sleep(delay + sample.duration() + PLAY_TAIL).await;
        }
        Commands::Clock {
            config_path,
            duration,
        } => {
            let duration = parse_duration(duration, Duration::from_secs(5))?;
            let config = config::Engine::deserialize(Path::new(&config_path))?;
            let (engine, mut events) = Engine::new(&config)?;

            engine.handle(Command::StartAudioClock);
            let deadline = tokio::time::sleep(duration);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    event = events.recv() => match event {
                        Some(Event::AudioClockUpdate(ts)) => println!("{:.6}", ts),
                        None => break,
                    },
                }
            }
            engine.handle(Command::StopAudioClock);
        }
    }

    Ok(())
}

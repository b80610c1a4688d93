// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Headless HKO radar viewer.
//!
//! Runs one radar card against the system clock and prints the selected
//! image whenever it changes.
//!
//! Usage: `hko-radar [--size 256] [--slots 20] [--auto-refresh] [--slider N] [--once]`

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{debug, info, warn};
use radar_client::{
    CardRegistry, CardView, HttpPrefetcher, NoopPrefetcher, Prefetcher, RadarCard, Resolution,
    RuntimeTimer, SystemClock,
};
use tokio::runtime::Handle;

use crate::config::AppConfig;

/// How often the viewer checks the card for a new selection.
const VIEW_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "hko-radar", version)]
#[command(about = "Follow the Hong Kong Observatory radar images from the terminal")]
struct Cli {
    /// Image size: 064/128/256 or S/M/L
    #[arg(long)]
    size: Option<Resolution>,

    /// Number of time slots in the window
    #[arg(long)]
    slots: Option<u32>,

    /// Follow new images as they are published
    #[arg(long)]
    auto_refresh: bool,

    /// Select slot N of the window (0 is the oldest)
    #[arg(long)]
    slider: Option<i64>,

    /// Do not download images, only compute URLs
    #[arg(long)]
    offline: bool,

    /// Print the initial view and exit
    #[arg(long)]
    once: bool,

    /// Print the config file path and exit
    #[arg(long)]
    print_config_path: bool,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(size) = self.size {
            config.card.default_size = size;
        }
        if let Some(slots) = self.slots {
            config.card.time_slot_count = slots;
        }
        if self.auto_refresh {
            config.card.auto_refresh = true;
        }
        if self.offline {
            config.offline = true;
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn print_view(view: &CardView) {
    println!(
        "[{:>2}/{}] {} ({}) {}",
        view.slider_value,
        view.slider_max,
        view.selected_label,
        view.resolution.display_name(),
        view.image_url
    );
}

fn build_prefetcher(
    config: &AppConfig,
    runtime: Handle,
) -> Result<Arc<dyn Prefetcher>, Box<dyn std::error::Error>> {
    if config.offline {
        info!("Offline mode, images will not be downloaded");
        return Ok(Arc::new(NoopPrefetcher));
    }
    Ok(Arc::new(HttpPrefetcher::new(runtime, config.prefetch_timeout())?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.print_config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let mut app_config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        }
    };
    cli.apply_to(&mut app_config);

    if cli.save {
        app_config.save()?;
        info!("Saved configuration to {}", AppConfig::get_config_path()?.display());
    }

    let mut registry = CardRegistry::new();
    registry.register(&RadarCard::descriptor())?;
    debug!("Card picker entries: {}", registry.to_json()?);

    let runtime = Handle::current();
    let card = RadarCard::new(
        Arc::new(SystemClock),
        Arc::new(RuntimeTimer::new(runtime.clone())),
        build_prefetcher(&app_config, runtime)?,
        app_config.card_options(),
    )?;

    card.apply_config(Some(app_config.card.clone()))?;
    card.on_attach();
    if let Some(index) = cli.slider {
        card.on_slider_moved(index)?;
    }

    let mut shown = card.view();
    if let Some(view) = &shown {
        print_view(view);
    }
    if cli.once {
        return Ok(());
    }

    let mut poll = tokio::time::interval(VIEW_POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let view = card.view();
                let changed = match (&view, &shown) {
                    (Some(new), Some(old)) => new.image_url != old.image_url,
                    (new, old) => new.is_some() != old.is_some(),
                };
                if changed {
                    if let Some(view) = &view {
                        print_view(view);
                    }
                }
                shown = view;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for ctrl-c: {}", e);
                }
                break;
            }
        }
    }

    card.on_detach();
    info!("Stopped");
    Ok(())
}

mod app;
mod fetcher;
mod icon;
mod status;

use std::{path::PathBuf, sync::mpsc, thread, time::Duration};

use clap::Parser;
use eframe::egui;
use env_logger::Env;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// The following define polling and query behaviour.
const UPS_TARGET: &str = "ups@192.168.0.146"; // UPS to query, as NAME[@HOST].
const QUERY_COMMAND: &str = "upsc"; // External status-query binary.
const POLL_DELAY: u64 = 5; // Seconds to wait between polls.
const COMMAND_TIMEOUT: u64 = 30; // Seconds before a hung query is killed.

#[derive(Deserialize, Serialize, Debug)]
struct Settings {
    ups: String,
    command: String,
    poll_delay: u64,
    command_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ups: UPS_TARGET.to_string(),
            command: QUERY_COMMAND.to_string(),
            poll_delay: POLL_DELAY,
            command_timeout: COMMAND_TIMEOUT,
        }
    }
}

/// Desktop status monitor for NUT-managed UPS units.
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Args {
    /// UPS to query, as NAME[@HOST] understood by the query command.
    #[clap(value_parser)]
    ups: Option<String>,

    /// Alternate config file.
    #[clap(short, long, value_parser, default_value = "upsmon.toml")]
    config: PathBuf,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&args.config))
        .extract()
        .expect("Failed to read upsmon config.");
    if let Some(ups) = args.ups {
        settings.ups = ups;
    }

    if cfg!(debug_assertions) {
        println!("{:#?}", settings);
    }

    log::info!(
        "Monitoring {} every {}s via '{}'.",
        settings.ups,
        settings.poll_delay,
        settings.command
    );

    let fetcher = fetcher::Fetcher::new(
        settings.ups.clone(),
        Box::new(fetcher::QueryCommand::new(
            settings.command.clone(),
            Duration::from_secs(settings.command_timeout),
        )),
    );
    let poll_delay = Duration::from_secs(settings.poll_delay);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([400.0, 500.0])
            .with_resizable(false)
            .with_title("UPS Status")
            .with_icon(icon::battery_icon(0)),
        ..Default::default()
    };

    eframe::run_native(
        "UPS Status",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());

            // One fetch in flight at a time; a slow query just delays the
            // next poll.
            let (tx, rx) = mpsc::channel();
            let repaint = cc.egui_ctx.clone();
            thread::spawn(move || loop {
                let snapshot = fetcher.fetch();
                if tx.send(snapshot).is_err() {
                    break;
                }
                repaint.request_repaint();
                thread::sleep(poll_delay);
            });

            Ok(Box::new(app::MonitorApp::new(rx)))
        }),
    )
}

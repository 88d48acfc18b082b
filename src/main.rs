mod action_bar;
mod annotation;
mod app;
mod canvas;
mod config;
mod error;
mod flatten;
mod geometry;
mod gesture;
mod model;
mod persist;
mod properties;
mod render;
mod state;
mod store;
mod theme;
mod toolbar;
mod ui_controls;
mod viewer;

use clap::Parser;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Cli;

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitemark=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let store = cli.store_config();
    tracing::info!(command = ?cli.command, api = %store.api_url, "starting sitemark");

    let viewport = egui::ViewportBuilder::default()
        .with_title("SiteMark")
        .with_inner_size([1180.0, 820.0])
        .with_min_inner_size([640.0, 480.0]);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "SiteMark",
        options,
        Box::new(move |cc| Box::new(app::SiteMarkApp::new(cc, cli.command, store))),
    )
}

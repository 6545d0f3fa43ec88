// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk: document load/render coordination.
//
// Entry point. Initialises logging and the engine config, then loads one
// page of a document and dispatches it to the render surfaces, logging every
// observer notification along the way.

mod paths;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use blattwerk_bridge::{PageTextSurface, StubRasterSurface, default_engine};
use blattwerk_core::types::{GeometryOverrides, LoadState, PageLocator};
use blattwerk_document::{
    DocumentCallbacks, DocumentController, PageCallbacks, PageController, RenderCallbacks,
    RenderDispatch, Source,
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Load a document, load one of its pages, and hand it to the render surfaces.
#[derive(Debug, Parser)]
#[command(name = "blattwerk", version, about)]
struct Args {
    /// File path, URL, or data URI of the document.
    source: String,

    /// One-based page number.
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Fit the page to this rendered width.
    #[arg(long)]
    width: Option<f64>,

    /// Base scale factor.
    #[arg(long)]
    scale: Option<f64>,

    /// Rotation in degrees, replacing the page's own rotation.
    #[arg(long, allow_negative_numbers = true)]
    rotate: Option<i32>,

    /// Engine config (JSON). Defaults to the platform config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the page text to stdout.
    #[arg(long)]
    text: bool,
}

/// Notifications the driver waits on.
enum Finished {
    Page,
    Surface,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Blattwerk starting");

    let config = match paths::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "could not load engine config");
            return ExitCode::FAILURE;
        }
    };
    let engine = match default_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "could not start document engine");
            return ExitCode::FAILURE;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();

    let document = DocumentController::new(engine, config, document_callbacks());
    let dispatch = RenderDispatch::new(
        Arc::new(StubRasterSurface),
        Arc::new(PageTextSurface),
        render_callbacks(tx.clone(), args.text),
    );
    let page = PageController::new(page_callbacks(tx), Some(dispatch));
    page.set_overrides(GeometryOverrides {
        scale: args.scale,
        rotate: args.rotate,
        width: args.width,
    });
    page.set_locator(Some(PageLocator::Number(args.page)));
    document.attach(&page);

    let Some(load) = document.set_source(source_for(&args.source)) else {
        info!("no source given, nothing to show");
        return ExitCode::SUCCESS;
    };
    if let Err(e) = load.await {
        error!(error = %e, "document load task did not complete");
        return ExitCode::FAILURE;
    }

    match document.state() {
        LoadState::Loaded(handle) => {
            if PageLocator::Number(args.page)
                .resolve(handle.page_count())
                .is_none()
            {
                warn!(
                    page = args.page,
                    pages = handle.page_count(),
                    "page not in document, nothing to render"
                );
                return ExitCode::SUCCESS;
            }
        }
        LoadState::Failed => return ExitCode::FAILURE,
        LoadState::Empty | LoadState::Loading => {
            info!("source resolved to nothing, nothing to show");
            return ExitCode::SUCCESS;
        }
    }

    // The page reports once, then each surface reports once.
    let mut surfaces = 0;
    while let Some(event) = rx.recv().await {
        match event {
            Finished::Page if page.state().is_failed() => return ExitCode::FAILURE,
            Finished::Page => {}
            Finished::Surface => {
                surfaces += 1;
                if surfaces == 2 {
                    break;
                }
            }
        }
    }

    document.dispose();
    info!("Blattwerk done");
    ExitCode::SUCCESS
}

/// Existing paths are read as file blobs; anything else is a URL or data URI.
fn source_for(raw: &str) -> Source {
    if Path::new(raw).is_file() {
        Source::file(raw)
    } else {
        Source::from(raw)
    }
}

fn document_callbacks() -> DocumentCallbacks {
    DocumentCallbacks::new()
        .on_source_success(|| info!("source accepted"))
        .on_source_error(|e| error!(error = %e, "source rejected"))
        .on_load_progress(|progress| {
            debug!(loaded = progress.loaded, total = ?progress.total, "loading")
        })
        .on_load_success(|_, info| {
            info!(
                pages = info.page_count,
                fingerprint = %info.fingerprint,
                "document ready"
            )
        })
        .on_load_error(|e| error!(error = %e, "document failed"))
}

fn page_callbacks(tx: mpsc::UnboundedSender<Finished>) -> PageCallbacks {
    let failed = tx.clone();
    PageCallbacks::new()
        .on_load_success(move |page| {
            match serde_json::to_string(page) {
                Ok(json) => info!(page = %json, "page ready"),
                Err(e) => warn!(error = %e, "page ready, but its info could not be serialised"),
            }
            let _ = tx.send(Finished::Page);
        })
        .on_load_error(move |e| {
            error!(error = %e, "page failed");
            let _ = failed.send(Finished::Page);
        })
}

fn render_callbacks(tx: mpsc::UnboundedSender<Finished>, print_text: bool) -> RenderCallbacks {
    let (rendered, render_failed, text_failed) = (tx.clone(), tx.clone(), tx.clone());
    RenderCallbacks::new()
        .on_render_success(move || {
            info!("raster render complete");
            let _ = rendered.send(Finished::Surface);
        })
        .on_render_error(move |e| {
            warn!(error = %e, "raster render unavailable");
            let _ = render_failed.send(Finished::Surface);
        })
        .on_get_text_success(move |items| {
            info!(items = items.len(), "text layer ready");
            if print_text {
                for item in items {
                    println!("{}", item.text);
                }
            }
            let _ = tx.send(Finished::Surface);
        })
        .on_get_text_error(move |e| {
            warn!(error = %e, "text layer unavailable");
            let _ = text_failed.send(Finished::Surface);
        })
}

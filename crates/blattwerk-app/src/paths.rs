// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware config file resolution.

use std::path::{Path, PathBuf};

use blattwerk_core::EngineConfig;
use blattwerk_core::error::Result;
use tracing::{debug, info};

const CONFIG_FILE: &str = "config.json";

/// Default engine config location: `$XDG_CONFIG_HOME/blattwerk/config.json`,
/// falling back to `~/.config/blattwerk/config.json`.
pub fn config_path() -> Option<PathBuf> {
    config_path_from(
        std::env::var("XDG_CONFIG_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn config_path_from(xdg: Option<String>, home: Option<String>) -> Option<PathBuf> {
    let base = match (xdg.filter(|dir| !dir.is_empty()), home) {
        (Some(xdg), _) => PathBuf::from(xdg),
        (None, Some(home)) => PathBuf::from(home).join(".config"),
        (None, None) => return None,
    };
    Some(base.join("blattwerk").join(CONFIG_FILE))
}

/// Load the engine config.
///
/// An explicit path must exist. Without one, the default location is used if
/// a file is there, and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading engine config");
        return EngineConfig::from_json_file(path);
    }
    match config_path().filter(|path| path.is_file()) {
        Some(path) => {
            info!(path = %path.display(), "loading engine config");
            EngineConfig::from_json_file(path)
        }
        None => {
            debug!("no config file, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

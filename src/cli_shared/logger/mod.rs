// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use tracing_subscriber::{EnvFilter, Registry, prelude::*};

use crate::cli_shared::LogConfig;
use crate::utils::misc::LoggingColor;

pub fn setup_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = match &config.filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => default_env_filter(),
    };
    let layer: Box<dyn tracing_subscriber::layer::Layer<Registry> + Send + Sync> = match config
        .json
    {
        true => Box::new(
            tracing_subscriber::fmt::Layer::new()
                .json()
                .with_filter(get_env_filter(filter)),
        ),
        false => Box::new(
            tracing_subscriber::fmt::Layer::new()
                .with_ansi(config.color.coloring_enabled())
                .with_filter(get_env_filter(filter)),
        ),
    };
    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}

// Log warnings to stderr
pub fn setup_minimal_logger() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::new()
                .with_ansi(LoggingColor::Auto.coloring_enabled())
                .with_writer(std::io::stderr)
                .with_filter(get_env_filter(default_tool_filter())),
        )
        .try_init();
}

/// Returns an [`EnvFilter`] according to the `RUST_LOG` environment variable, or a default
/// - see [`default_env_filter`] and [`default_tool_filter`]
///
/// Note that [`tracing_subscriber::filter::Builder`] only allows a single default directive,
/// whereas we want to provide multiple.
/// See also <https://github.com/tokio-rs/tracing/blob/27f688efb72316a26f3ec1f952c82626692c08ff/tracing-subscriber/src/filter/env/builder.rs#L189-L194>
fn get_env_filter(def: EnvFilter) -> EnvFilter {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV) {
        Ok(s) => EnvFilter::new(s),
        Err(NotPresent) => def,
        Err(NotUnicode(_)) => EnvFilter::default(),
    }
}

fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}

fn default_tool_filter() -> EnvFilter {
    EnvFilter::new("warn,forest_chainstore::chain=info")
}

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod facets;
pub mod format;
pub mod guard;
pub mod pagination;
pub mod session;

#[cfg(feature = "native")]
pub mod cli;
#[cfg(feature = "native")]
pub mod commands;
#[cfg(feature = "native")]
pub mod http;
#[cfg(feature = "native")]
pub mod render;
#[cfg(feature = "native")]
pub mod session_file;

#[cfg(feature = "native")]
pub use native::run;

#[cfg(feature = "native")]
mod native {
  use std::ffi::OsString;

  use anyhow::Context;
  use clap::Parser;
  use tracing::{
    debug,
    info
  };

  use crate::cli;
  use crate::commands;
  use crate::config::{
    self,
    ClientConfig
  };
  use crate::http::ReqwestTaskApi;
  use crate::render::Renderer;

  #[tracing::instrument(skip_all)]
  pub fn run(
    raw_args: Vec<OsString>
  ) -> anyhow::Result<()> {
    let cli =
      cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(
      cli.verbose,
      cli.quiet
    )?;

    info!(
      verbose = cli.verbose,
      quiet = cli.quiet,
      "starting taskdesk CLI"
    );

    let mut cfg = ClientConfig::load(
      cli.config.as_deref()
    )?;
    cfg.apply_api_url_override(
      cli.api_url.as_deref()
    );
    debug!(
      api = %cfg.api_base_url,
      timeout_secs = cfg.timeout.as_secs(),
      "resolved client config"
    );

    let data_dir =
      config::resolve_data_dir(
        &cfg,
        cli.data.as_deref()
      )
      .context(
        "failed to resolve data \
         directory"
      )?;

    let api = ReqwestTaskApi::new(
      cfg.endpoints()?,
      cfg.timeout
    )?;
    let ctx = commands::CommandContext {
      api,
      data_dir,
      renderer: Renderer::new(
        !cli.no_color
      )
    };

    let runtime =
      tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context(
          "failed to start async runtime"
        )?;

    runtime.block_on(commands::dispatch(
      &ctx,
      cli.command
    ))
  }
}

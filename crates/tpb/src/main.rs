//! One polling batch per invocation; schedule it externally (cron, timer).

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use tracing::{error, info};

use tpb_core::{
    config::Config, dispatch::DispatchLoop, formatting::ResponseFormatter,
    offset::FileOffsetStore, Error,
};
use tpb_packagist::PackagistClient;
use tpb_telegram::{HttpUpdatePoller, TelegramMessenger};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = tpb_core::logging::init("tpb") {
        eprintln!("{e}");
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // A fatal poll is an expected outcome (bad token, API outage):
            // report it without a panic and leave the cursor untouched.
            if let Some(Error::FatalPoll(reason)) = e.downcast_ref::<Error>() {
                error!(%reason, "getUpdates failed, batch aborted");
            } else {
                error!("{e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    info!(bot = %cfg.bot_name, offset_file = %cfg.offset_file.display(), "starting batch");

    let registry = Arc::new(PackagistClient::from_config(&cfg).context("packagist client")?);
    let source = Arc::new(HttpUpdatePoller::from_config(&cfg).context("update poller")?);
    let messenger = Arc::new(TelegramMessenger::from_config(&cfg).context("telegram client")?);
    let offsets = Arc::new(FileOffsetStore::new(cfg.offset_file.clone()));

    let formatter = ResponseFormatter::from_config(&cfg, registry);
    let dispatch = DispatchLoop::new(source, messenger, offsets, formatter);

    dispatch.run_once().await?;
    Ok(())
}

use std::{future::Future, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_base_url, load_settings, CancelHandle, DirectorySink, HttpDeckServices,
    StateTag, WorkflowController,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod render;
mod repl;
mod upload;

#[derive(Parser, Debug)]
#[command(name = "notes2deck", about = "Turn a PDF of study notes into an Anki deck")]
struct Args {
    /// Base URL of the extraction/packaging service.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Directory decks are saved into.
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Upload a PDF, optionally drop cards, and download the deck.
    Convert {
        pdf: PathBuf,
        #[arg(long)]
        deck_name: Option<String>,
        /// 1-based card number to leave out; repeatable.
        #[arg(long = "drop", value_name = "N")]
        drop: Vec<usize>,
        /// Show the extracted cards without downloading.
        #[arg(long)]
        dry_run: bool,
    },
    /// Review and edit cards interactively before downloading.
    Review { pdf: Option<PathBuf> },
    /// Check that the service is reachable.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = normalize_base_url(&api_url)?;
    }
    if let Some(out_dir) = args.out_dir {
        settings.output_dir = out_dir;
    }

    let services = Arc::new(HttpDeckServices::from_settings(&settings)?);
    if let Cmd::Health = args.command {
        let health = services
            .health()
            .await
            .with_context(|| format!("health check against {} failed", services.base_url()))?;
        println!("{}: {}", services.base_url(), health.status);
        return Ok(());
    }

    let sink = Arc::new(DirectorySink::new(settings.output_dir.clone()));
    let mut controller = WorkflowController::with_http(services, sink);

    match args.command {
        Cmd::Convert {
            pdf,
            deck_name,
            drop,
            dry_run,
        } => convert(&mut controller, pdf, deck_name, drop, dry_run).await,
        Cmd::Review { pdf } => repl::run(&mut controller, pdf).await,
        Cmd::Health => Ok(()),
    }
}

async fn convert(
    controller: &mut WorkflowController,
    pdf: PathBuf,
    deck_name: Option<String>,
    mut drop: Vec<usize>,
    dry_run: bool,
) -> Result<()> {
    let cancel = controller.cancel_handle();
    let upload = upload::read_pdf(&pdf).await?;
    interruptible(&cancel, controller.select_file(upload)).await;
    if let Some(err) = controller.session().error() {
        bail!("{err}");
    }
    if controller.session().state() != StateTag::Preview {
        bail!("upload cancelled");
    }

    drop.sort_unstable();
    drop.dedup();
    let count = controller.session().card_count();
    for number in drop.into_iter().rev() {
        if number == 0 || number > count {
            warn!(card = number, count, "no such card; not dropping");
            continue;
        }
        controller.delete_card(number - 1);
    }
    if let Some(deck_name) = deck_name {
        controller.rename_deck(deck_name);
    }

    print!("{}", render::render(controller.session()));
    if dry_run || !controller.session().can_download() {
        return Ok(());
    }

    interruptible(&cancel, controller.download()).await;
    let session = controller.session();
    if let Some(err) = session.error() {
        bail!("{err}");
    }
    match session.last_saved() {
        Some(path) => println!("Saved deck to {}", path.display()),
        None => bail!("download cancelled"),
    }
    Ok(())
}

/// Awaits a controller call; Ctrl-C cancels the request in flight.
pub(crate) async fn interruptible<F: Future>(cancel: &CancelHandle, call: F) -> F::Output {
    tokio::pin!(call);
    loop {
        tokio::select! {
            output = &mut call => return output,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    eprintln!("Cancelling...");
                    cancel.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "ctrl-c handler unavailable");
                    return call.await;
                }
            },
        }
    }
}

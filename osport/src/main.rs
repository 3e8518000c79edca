//! osport: reconciles one OpenStack network port.
//!
//! Prints a JSON result document on stdout; logs go to stderr.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osport::cli::Args;
use osport::cloud::CloudConfig;
use osport::output;
use osport::{NeutronClient, Outcome, PortReconciler, Reconciler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Exit status 2 is reserved for --detailed-exitcode changes.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => return fail(&anyhow::Error::from(e)),
    };
    let detailed = args.detailed_exitcode;

    match run(args).await {
        Ok(outcome) => match output::success_payload(&outcome) {
            Ok(payload) => {
                println!("{payload}");
                ExitCode::from(output::exit_status(&outcome, detailed))
            }
            Err(e) => fail(&anyhow::Error::from(e)),
        },
        Err(e) => fail(&e),
    }
}

async fn run(args: Args) -> Result<Outcome> {
    let spec = args.port.into_options()?.into_spec()?;
    debug!("Desired port: {:?}", spec);

    let cloud = CloudConfig::resolve(args.cloud.into())?;
    let client = NeutronClient::connect(&cloud).await?;
    debug!("Using Neutron API at {}", client.base());

    let reconciler = PortReconciler::new(client);
    Ok(reconciler.reconcile(&spec, args.check).await?)
}

fn fail(err: &anyhow::Error) -> ExitCode {
    let msg = format!("{err:#}").trim().to_string();
    if err
        .downcast_ref::<osport::Error>()
        .is_some_and(osport::Error::is_config)
    {
        warn!("Invalid port options: {}", msg);
    } else {
        error!("{}", msg);
    }
    println!("{}", output::failure_payload(&msg));
    ExitCode::from(output::EXIT_FAILED)
}

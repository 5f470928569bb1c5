/*!

This [controller] runs in a Kubernetes cluster and keeps the eevee bot's workers running. For every
`ConnectorIrc` and `Toolbox` object it maintains a worker `Deployment` (and, for connectors, a
configuration `Secret`) and reports progress through the object's status conditions.

[controller]: https://kubernetes.io/docs/concepts/architecture/controller/

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

use crate::config::{Args, ReconcileConfig};
use crate::reconcile::run_controller;
use crate::synthesis::{ConnectorIrcStrategy, ToolboxStrategy};
use clap::Parser;
use env_logger::Builder;
use futures::join;
use kube::Client;
use log::{error, info, LevelFilter};

mod action;
mod config;
mod constants;
mod context;
mod error;
mod events;
mod reconcile;
mod secret;
mod store;
mod synthesis;
mod teardown;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    info!("Starting");

    // Initialize the k8s client from in-cluster variables or KUBECONFIG.
    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to create k8s client: {}", e);
            std::process::exit(1);
        }
    };

    let config = ReconcileConfig::from(&args);
    match &args.namespace {
        Some(namespace) => info!("Watching namespace '{}'", namespace),
        None => info!("Watching all namespaces"),
    }

    // Run the controllers.
    let future_1 = run_controller(
        client.clone(),
        ConnectorIrcStrategy::new(args.connectorirc_finalizer.clone()),
        config,
        args.namespace.clone(),
    );
    let future_2 = run_controller(
        client,
        ToolboxStrategy::new(args.toolbox_finalizer.clone()),
        config,
        args.namespace.clone(),
    );

    let _ = join!(future_1, future_2);
    info!("Stopped");
}

/// Extract the value of `RUST_LOG` if it exists, otherwise log this crate and the model crate at
/// `level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use the requested log level for our crates only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("eevee_model"), level)
                .init();
        }
    }
}

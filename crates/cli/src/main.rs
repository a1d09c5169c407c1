//! Nodeflow CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** from flags and `NODEFLOW_*` environment variables.
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer
//!    and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the YAML template store, the template
//!    cache, the HTTP generation client and the credential verifier, injected
//!    into the node registry and dispatcher.
//! 4. **Run the subcommand** and print its result document to stdout. `serve`
//!    keeps one pipeline alive and answers a request per stdin line.

mod config;
mod envelope;
mod input;
mod serve;
mod service;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use llm::CancellationToken;
use nodes::BUILT_IN_NODES;
use pipeline::{CorrelationId, Identity, TenantId, UserId};
use tracing::{error, warn};

use crate::config::{Cli, Command, InvokeArgs, IssueTokenArgs, ServeArgs};
use crate::envelope::{Envelope, Health};
use crate::service::{verifier, Service};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let guard = match telemetry::init(&cli.telemetry) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(2);
        }
    };

    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    };

    guard.shutdown();
    code
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Invoke(args) => invoke(args).await,
        Command::Serve(args) => serve(args).await,
        Command::IssueToken(args) => issue_token(args),
        Command::Nodes => {
            for name in BUILT_IN_NODES {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            print!("{}", serde_yaml::to_string(&Health::ok())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn invoke(args: InvokeArgs) -> anyhow::Result<ExitCode> {
    let text = input::read_payload(args.payload.as_deref()).await?;
    let cancel = CancellationToken::new();
    let service = Service::build(args.pipeline, cancel.clone()).await?;

    let correlation_id = args
        .correlation_id
        .and_then(CorrelationId::new)
        .unwrap_or_else(CorrelationId::generate);

    let watchdog = tokio::spawn(cancel_on_deadline_or_interrupt(
        cancel.clone(),
        service.deadline(),
    ));

    let outcome = service
        .handle(
            &args.node,
            args.token.as_deref(),
            || input::parse_payload(&text),
            correlation_id,
        )
        .await;

    cancel.cancel();
    let _ = watchdog.await;

    match outcome {
        Ok(data) => {
            print!("{}", Envelope::success(data).to_yaml()?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            warn!(code = err.code(), status = err.status(), "Invocation failed");
            print!("{}", Envelope::error(&err).to_yaml()?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    let service = Arc::new(Service::build(args.pipeline, cancel.clone()).await?);

    let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));
    let served = serve::run(service, args.max_in_flight, cancel.clone()).await;
    cancel.cancel();
    let _ = interrupt.await;

    served?;
    Ok(ExitCode::SUCCESS)
}

/// Cancels `cancel` when `deadline` passes or on Ctrl-C. Returns once the
/// token is cancelled from anywhere.
async fn cancel_on_deadline_or_interrupt(cancel: CancellationToken, deadline: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(deadline) => {
            warn!(deadline_secs = deadline.as_secs(), "Call deadline expired; cancelling");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; cancelling");
        }
    }
    cancel.cancel();
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; cancelling in-flight requests");
        }
    }
    cancel.cancel();
}

fn issue_token(args: IssueTokenArgs) -> anyhow::Result<ExitCode> {
    let identity = Identity {
        id: UserId::new(args.user_id).context("user id must not be empty")?,
        tenant_id: TenantId::new(args.tenant_id).context("tenant id must not be empty")?,
        email: args.email,
        permissions: args.permissions.into_iter().collect(),
    };
    let token = verifier(args.signing)?.issue(&identity, Duration::from_secs(args.ttl_secs))?;
    println!("{token}");
    Ok(ExitCode::SUCCESS)
}

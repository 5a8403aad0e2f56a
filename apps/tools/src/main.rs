use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classifier_integration::{ClassifierConfig, HttpPoClassifier};
use server_api::{create_session, submit_classification, update_form, ApiContext};
use shared::{
    domain::ClassificationResult,
    protocol::{ClassifyOutcome, UpdateFormRequest},
};
use url::Url;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8000/classify")]
    classifier_url: String,
    #[arg(long, default_value_t = 30)]
    timeout_seconds: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify one PO description and print the summary and full JSON.
    Classify {
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        supplier: String,
        /// Print the raw classifier response when it is not valid JSON.
        #[arg(long)]
        debug_raw: bool,
    },
    /// List the built-in example descriptions.
    Examples,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Examples => {
            for (idx, example) in server_api::examples().iter().enumerate() {
                println!("Example {}: {example}", idx + 1);
            }
        }
        Command::Classify {
            description,
            supplier,
            debug_raw,
        } => {
            let endpoint = Url::parse(&cli.classifier_url)
                .with_context(|| format!("invalid classifier url '{}'", cli.classifier_url))?;
            let classifier = HttpPoClassifier::new(&ClassifierConfig {
                endpoint,
                timeout: Duration::from_secs(cli.timeout_seconds),
            })?;
            let api = ApiContext::new(Arc::new(classifier), 1);
            let session_id = create_session(&api).await;
            update_form(
                &api,
                session_id,
                UpdateFormRequest {
                    description: Some(description),
                    supplier: Some(supplier),
                    debug_raw: Some(debug_raw),
                },
            )
            .await?;

            match submit_classification(&api, session_id).await {
                Ok(outcome) => print_outcome(&outcome),
                Err(err) => {
                    if let Some(raw) = &err.raw_response {
                        eprintln!("{raw}");
                    }
                    return Err(err.into());
                }
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ClassifyOutcome) {
    if let ClassifyOutcome::Displayed { summary, result } = outcome {
        if let Some(summary) = summary {
            for line in summary.lines() {
                println!("{line}");
            }
            println!();
        }
        println!("{}", ClassificationResult(result.clone()).to_pretty_json());
    }
}

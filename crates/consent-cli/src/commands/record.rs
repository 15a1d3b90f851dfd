//! Record command - store and log one consent action.

use anyhow::Context;
use consent_ledger::ActionType;
use consent_recorder::RecordResult;
use serde_json::Value;

use super::OutputFormat;
use crate::context::App;
use crate::theme::Theme;

/// Arguments of `consentctl record`.
pub(crate) struct RecordArgs<'a> {
    pub(crate) identifier: &'a str,
    pub(crate) counterparty: &'a str,
    pub(crate) action: &'a str,
    pub(crate) details: Option<&'a str>,
    pub(crate) connect: bool,
}

/// Record one action and print the result.
pub(crate) async fn run(
    app: &App,
    args: RecordArgs<'_>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let details: Value = match args.details {
        Some(raw) => serde_json::from_str(raw).context("--details must be valid JSON")?,
        None => Value::Object(serde_json::Map::new()),
    };
    if args.connect && !app.connect().await {
        eprintln!("{}", Theme::warning("Wallet connection failed, continuing without a session"));
    }

    let action = ActionType::parse(args.action);
    let result = app
        .recorder
        .record(args.identifier, args.counterparty, &action, details)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Pretty => print_result(app, &action, &result),
    }
    Ok(())
}

fn print_result(app: &App, action: &ActionType, result: &RecordResult) {
    println!("\n{}", Theme::header("Consent action recorded"));
    println!("{}", Theme::separator());
    println!("{}", Theme::field("action", action.as_str()));
    println!("{}", Theme::field("subject", &result.subject.to_hex()));
    println!("{}", Theme::field("origin", &Theme::origin(result.origin)));
    println!("{}", Theme::field("tx", &result.receipt.tx_id().to_hex()));
    println!(
        "{}",
        Theme::field("block", &result.receipt.block_number.to_string())
    );
    println!("{}", Theme::field("gas", &result.receipt.gas_used.to_string()));
    println!("{}", Theme::field("document", result.content_ref.as_str()));
    if !app.recorder.blob_store().is_degraded() {
        println!(
            "{}",
            Theme::field("link", &app.recorder.blob_store().gateway_url(&result.content_ref))
        );
    }
    if result.origin.is_synthetic() {
        println!(
            "\n{}",
            Theme::info("Not written to the ledger; the receipt above is synthetic")
        );
    }
    println!();
}

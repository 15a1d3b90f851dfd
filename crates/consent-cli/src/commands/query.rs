//! Query command - show an audit trail.

use colored::Colorize;
use consent_ledger::{AuditEvent, ConsentState, ConsentSummary, summarize};

use super::OutputFormat;
use crate::context::App;
use crate::theme::Theme;

/// Print the audit trail for `identifier`, or for everyone.
pub(crate) async fn run(
    app: &App,
    identifier: Option<&str>,
    summary: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if summary {
        let summary = match identifier {
            Some(identifier) => app.recorder.summary(identifier).await?,
            None => summarize(&app.recorder.all_events().await?),
        };
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Pretty => print_summary(&summary),
        }
        return Ok(());
    }

    let events = match identifier {
        Some(identifier) => app.recorder.history(identifier).await?,
        None => app.recorder.all_events().await?,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&events)?),
        OutputFormat::Pretty => print_events(&events),
    }
    Ok(())
}

fn print_events(events: &[AuditEvent]) {
    if events.is_empty() {
        println!("{}", Theme::info("No events"));
        return;
    }

    println!("\n{}", Theme::header("Audit Trail"));
    println!(
        "{:<20} {:>10} {:<24} {:<28} {}",
        "TIME".dimmed(),
        "BLOCK".dimmed(),
        "ACTION".dimmed(),
        "COUNTERPARTY".dimmed(),
        "ORIGIN".dimmed()
    );
    println!("{}", Theme::separator());
    for event in events {
        println!(
            "{:<20} {:>10} {:<24} {:<28} {}",
            event.occurred_at.format("%Y-%m-%d %H:%M:%S"),
            event.block_number,
            event.action.as_str(),
            event.counterparty,
            Theme::origin(event.origin)
        );
    }
    if events.iter().any(|event| event.origin.is_synthetic()) {
        println!("\n{}", Theme::warning("Ledger unavailable or empty; showing synthetic data"));
    }
    println!();
}

fn print_summary(summary: &ConsentSummary) {
    println!("\n{}", Theme::header("Consent Summary"));
    println!(
        "{:<28} {:<10} {:>6}",
        "COUNTERPARTY".dimmed(),
        "CONSENT".dimmed(),
        "USES".dimmed()
    );
    println!("{}", Theme::separator());
    for (name, entry) in &summary.counterparties {
        let consent = match entry.consent {
            ConsentState::Granted => "granted".green().to_string(),
            ConsentState::Revoked => "revoked".red().to_string(),
            ConsentState::Unknown => Theme::dimmed("-"),
        };
        println!("{name:<28} {consent:<10} {:>6}", entry.usage_count);
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} events summarised", summary.total_events))
    );
    if summary.includes_synthetic {
        println!("{}", Theme::warning("Includes synthetic data"));
    }
    println!();
}

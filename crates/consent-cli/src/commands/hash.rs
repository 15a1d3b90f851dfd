//! Hash command - derive a subject handle.

use consent_crypto::SubjectHandle;

use super::OutputFormat;
use crate::theme::Theme;

/// Print the subject handle for an identifier.
pub(crate) fn run(identifier: &str, format: OutputFormat) -> anyhow::Result<()> {
    let handle = SubjectHandle::hash(identifier)?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "subjectHandle": handle }));
        },
        OutputFormat::Pretty => {
            println!("{}", Theme::field("subject", &handle.to_hex()));
        },
    }
    Ok(())
}

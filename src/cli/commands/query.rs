//! One-shot fused query command.

use console::style;

use crate::config::Settings;
use crate::fusion::SearchQuery;

/// Run a single fused query and print the document to stdout.
///
/// Fails when neither provider answered, matching the server's 502/504.
pub async fn cmd_query(
    settings: &Settings,
    query: SearchQuery,
    pretty: bool,
) -> anyhow::Result<()> {
    let fuser = super::build_fuser(settings)?;
    let result = fuser.fuse(&query).await;

    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);

    let status = result.status();
    if !status.is_success() {
        anyhow::bail!("All providers failed ({})", status);
    }
    if !result.is_complete() {
        eprintln!("{} Partial result: one provider failed", style("!").yellow());
    }
    Ok(())
}

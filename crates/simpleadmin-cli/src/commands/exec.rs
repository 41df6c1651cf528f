//! Exec command - run raw AT commands

use anyhow::Result;
use simpleadmin_client::{AtClient, ExecOptions};

use super::ensure_ok;
use crate::output::{LineRow, OutputContext, OutputFormat};

/// Run the commands as one batch and print the response lines
pub async fn exec(
    client: &AtClient,
    commands: &[String],
    recover: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let options = ExecOptions::new();
    let result = if recover {
        client.execute_with_recovery(commands, &options).await
    } else {
        client.execute(commands, &options).await
    };
    ensure_ok(&result, ctx)?;

    let rows: Vec<LineRow> = result
        .lines()
        .into_iter()
        .enumerate()
        .map(|(i, text)| LineRow {
            line: i + 1,
            text: text.to_string(),
        })
        .collect();
    ctx.print(&rows);

    if ctx.format == OutputFormat::Table && result.attempts > 1 {
        ctx.success(&format!("OK after {} attempts", result.attempts));
    }
    Ok(())
}

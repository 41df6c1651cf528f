//! APN command - list PDP contexts or set the APN

use anyhow::Result;
use simpleadmin_client::parse::{parse_apn_contexts, APN_CONTEXTS_QUERY};
use simpleadmin_client::radio::{apply_apn, PdpType};
use simpleadmin_client::{AtClient, AtTransport, ExecOptions};

use super::ensure_ok;
use crate::output::{ApnRow, OutputContext};

pub async fn apn<T: AtTransport>(client: &AtClient<T>, ctx: &OutputContext) -> Result<()> {
    let result = client.execute(APN_CONTEXTS_QUERY, &ExecOptions::new()).await;
    ensure_ok(&result, ctx)?;

    let rows: Vec<ApnRow> = parse_apn_contexts(&result.data)
        .into_iter()
        .map(|context| ApnRow {
            cid: context.cid,
            pdp_type: context.pdp_type,
            apn: context.apn,
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// Make `apn` the only APN; the radio restarts to apply it
pub async fn set_apn<T: AtTransport>(
    client: &AtClient<T>,
    apn: &str,
    pdp_type: PdpType,
    ctx: &OutputContext,
) -> Result<()> {
    let result = apply_apn(client, apn, pdp_type, &ExecOptions::new()).await?;
    ensure_ok(&result, ctx)?;
    ctx.success(&format!("APN set to {} ({})", apn.trim(), pdp_type.as_str()));
    Ok(())
}

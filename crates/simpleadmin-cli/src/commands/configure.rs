//! Configuration commands - cell locks, band and network preferences,
//! NR5G mode and SIM slot

use anyhow::Result;
use simpleadmin_client::parse::{parse_current_settings, LteCellLock, NrCellLock, NETWORK_MODE_QUERY};
use simpleadmin_client::radio::{self, BandClass, Nr5gMode, Rat};
use simpleadmin_client::{AtClient, AtTransport, Command, ExecOptions};
use tracing::debug;

use super::ensure_ok;
use crate::output::OutputContext;

/// Parse an `EARFCN:PCI` pair
pub fn parse_lte_cell(value: &str) -> std::result::Result<LteCellLock, String> {
    let (earfcn, pci) = value
        .split_once(':')
        .ok_or_else(|| format!("expected EARFCN:PCI, got {:?}", value))?;
    let earfcn = earfcn
        .trim()
        .parse()
        .map_err(|_| format!("invalid EARFCN {:?}", earfcn))?;
    let pci = pci
        .trim()
        .parse()
        .map_err(|_| format!("invalid PCI {:?}", pci))?;
    Ok(LteCellLock { pci, earfcn })
}

/// Run a setting with recovery and report the outcome
async fn apply<T: AtTransport>(
    client: &AtClient<T>,
    command: Command,
    ctx: &OutputContext,
) -> Result<()> {
    debug!(command = %command, "Applying setting");
    let result = client
        .execute_with_recovery(&command, &ExecOptions::new())
        .await;
    ensure_ok(&result, ctx)?;
    ctx.success(&format!("Applied {}", command));
    Ok(())
}

/// Lock LTE to the given cells; `None` clears the lock
pub async fn lte_lock<T: AtTransport>(
    client: &AtClient<T>,
    cells: Option<&[LteCellLock]>,
    ctx: &OutputContext,
) -> Result<()> {
    let command = match cells {
        Some(cells) => radio::lte_cell_lock(cells)?,
        None => radio::lte_cell_unlock(),
    };
    apply(client, command, ctx).await
}

/// Lock NR5G-SA to one cell; `None` clears the lock
pub async fn nr_lock<T: AtTransport>(
    client: &AtClient<T>,
    lock: Option<&NrCellLock>,
    ctx: &OutputContext,
) -> Result<()> {
    let command = match lock {
        Some(lock) => radio::nr_cell_lock(lock)?,
        None => radio::nr_cell_unlock(),
    };
    apply(client, command, ctx).await
}

pub async fn bands<T: AtTransport>(
    client: &AtClient<T>,
    class: BandClass,
    bands: &[u32],
    ctx: &OutputContext,
) -> Result<()> {
    apply(client, radio::band_preference(class, bands)?, ctx).await
}

/// Set the preferred RATs, keeping the modem's acquisition order.
/// An empty selection means automatic.
pub async fn network_mode<T: AtTransport>(
    client: &AtClient<T>,
    selected: &[Rat],
    ctx: &OutputContext,
) -> Result<()> {
    let current = client.execute(NETWORK_MODE_QUERY, &ExecOptions::new()).await;
    let order: Vec<Rat> = parse_current_settings(&current.data)
        .rat_acq_order
        .iter()
        .filter_map(|rat| rat.parse().ok())
        .collect();
    if order.is_empty() {
        debug!("No acquisition order reported, using the default");
    }

    apply(client, radio::network_mode(selected, &order), ctx).await
}

pub async fn nr5g_mode<T: AtTransport>(
    client: &AtClient<T>,
    mode: Nr5gMode,
    ctx: &OutputContext,
) -> Result<()> {
    apply(client, radio::set_nr5g_mode(mode), ctx).await
}

pub async fn sim_slot<T: AtTransport>(
    client: &AtClient<T>,
    slot: u8,
    ctx: &OutputContext,
) -> Result<()> {
    apply(client, radio::sim_slot(slot)?, ctx).await
}

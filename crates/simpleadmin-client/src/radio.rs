//! Radio settings: reading the current configuration and building the
//! commands that change it
//!
//! Each builder validates its input and returns a canonical [`Command`].
//! Run them through [`AtClient::execute_with_recovery`]; the modem often
//! drops the channel briefly while it applies a setting.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument, warn};

use crate::client::AtClient;
use crate::command::Command;
use crate::config::ExecOptions;
use crate::error::{AtClientError, Result};
use crate::parse::settings::{
    APN_CONTEXTS_QUERY, APN_INFO_QUERY, CELL_LOCK_QUERY, NETWORK_MODE_QUERY, SIM_SLOT_QUERY,
    SIM_STATUS_QUERY,
};
use crate::parse::{parse_apn_contexts, parse_current_settings, CurrentSettings, LteCellLock, NrCellLock};
use crate::result::ExecutionResult;
use crate::transport::AtTransport;

/// Most LTE cells one lock command accepts
pub const MAX_LTE_LOCK_CELLS: usize = 10;

/// Longest APN the modem accepts
pub const MAX_APN_LEN: usize = 63;

/// Power the baseband down
pub const RADIO_OFF: &str = "AT+CFUN=0";
/// Power the baseband back up
pub const RADIO_ON: &str = "AT+CFUN=1";

fn invalid(message: impl Into<String>) -> AtClientError {
    AtClientError::InvalidSetting(message.into())
}

/// Radio access technology as named by `+QNWPREFCFG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rat {
    Wcdma,
    Lte,
    Nr5g,
}

impl Rat {
    /// Acquisition order used when the modem did not report one
    pub const DEFAULT_ORDER: [Rat; 3] = [Rat::Nr5g, Rat::Lte, Rat::Wcdma];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wcdma => "WCDMA",
            Self::Lte => "LTE",
            Self::Nr5g => "NR5G",
        }
    }
}

impl fmt::Display for Rat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rat {
    type Err = AtClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WCDMA" | "3G" => Ok(Self::Wcdma),
            "LTE" | "4G" => Ok(Self::Lte),
            "NR5G" | "5G" => Ok(Self::Nr5g),
            other => Err(invalid(format!("unknown RAT {:?}", other))),
        }
    }
}

/// Which band list a band preference applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandClass {
    Lte,
    /// NR5G bands used in non-standalone mode
    Nsa,
    /// NR5G bands used in standalone mode
    Sa,
}

impl BandClass {
    fn key(&self) -> &'static str {
        match self {
            Self::Lte => "lte_band",
            Self::Nsa => "nsa_nr5g_band",
            Self::Sa => "nr5g_band",
        }
    }
}

impl FromStr for BandClass {
    type Err = AtClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LTE" => Ok(Self::Lte),
            "NSA" => Ok(Self::Nsa),
            "SA" => Ok(Self::Sa),
            other => Err(invalid(format!("unknown band class {:?}", other))),
        }
    }
}

/// NR5G operating mode for `AT^NR5G_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nr5gMode {
    Auto = 0,
    Nsa = 1,
    Sa = 2,
}

impl FromStr for Nr5gMode {
    type Err = AtClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" | "0" => Ok(Self::Auto),
            "NSA" | "1" => Ok(Self::Nsa),
            "SA" | "2" => Ok(Self::Sa),
            other => Err(invalid(format!("unknown NR5G mode {:?}", other))),
        }
    }
}

/// PDP type of an APN context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdpType {
    Ip,
    Ipv6,
    #[default]
    Ipv4v6,
    Ppp,
}

impl PdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "IP",
            Self::Ipv6 => "IPV6",
            Self::Ipv4v6 => "IPV4V6",
            Self::Ppp => "PPP",
        }
    }
}

impl FromStr for PdpType {
    type Err = AtClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IP" | "IPV4" => Ok(Self::Ip),
            "IPV6" => Ok(Self::Ipv6),
            "IPV4V6" => Ok(Self::Ipv4v6),
            "PPP" => Ok(Self::Ppp),
            other => Err(invalid(format!("unknown PDP type {:?}", other))),
        }
    }
}

/// Lock LTE to up to [`MAX_LTE_LOCK_CELLS`] cells
pub fn lte_cell_lock(cells: &[LteCellLock]) -> Result<Command> {
    if cells.is_empty() {
        return Err(invalid("at least one LTE cell is required"));
    }
    if cells.len() > MAX_LTE_LOCK_CELLS {
        return Err(invalid(format!(
            "at most {} LTE cells can be locked",
            MAX_LTE_LOCK_CELLS
        )));
    }

    let pairs: Vec<String> = cells
        .iter()
        .map(|cell| format!("{},{}", cell.earfcn, cell.pci))
        .collect();
    Ok(Command::from_canonical(format!(
        "AT+QNWLOCK=\"common/4g\",{},{}",
        cells.len(),
        pairs.join(",")
    )))
}

pub fn lte_cell_unlock() -> Command {
    Command::from_canonical("AT+QNWLOCK=\"common/4g\",0".to_string())
}

/// Subcarrier spacing in kHz for an SCS code; values above the code range
/// are taken as kHz already
pub fn scs_khz(scs: u32) -> u32 {
    match scs {
        0 => 15,
        1 => 30,
        2 => 60,
        3 => 120,
        4 => 240,
        khz => khz,
    }
}

/// Lock NR5G-SA to one cell
pub fn nr_cell_lock(lock: &NrCellLock) -> Result<Command> {
    if lock.band == 0 {
        return Err(invalid("NR5G band is required"));
    }
    Ok(Command::from_canonical(format!(
        "AT+QNWLOCK=\"common/5g\",{},{},{},{}",
        lock.pci,
        lock.arfcn,
        scs_khz(lock.scs),
        lock.band
    )))
}

pub fn nr_cell_unlock() -> Command {
    Command::from_canonical("AT+QNWLOCK=\"common/5g\",0".to_string())
}

/// Restrict a band class to the given bands (sorted, duplicates dropped)
pub fn band_preference(class: BandClass, bands: &[u32]) -> Result<Command> {
    let mut bands: Vec<u32> = bands.iter().copied().filter(|b| *b > 0).collect();
    bands.sort_unstable();
    bands.dedup();

    if bands.is_empty() {
        return Err(invalid("at least one band is required"));
    }

    let list: Vec<String> = bands.iter().map(u32::to_string).collect();
    Ok(Command::from_canonical(format!(
        "AT+QNWPREFCFG=\"{}\",{}",
        class.key(),
        list.join(":")
    )))
}

/// `mode_pref` value for a RAT selection: `AUTO` when nothing is
/// selected, otherwise the selected RATs in acquisition order
pub fn mode_pref_value(selected: &[Rat], acquisition_order: &[Rat]) -> String {
    if selected.is_empty() {
        return "AUTO".to_string();
    }

    let order = if acquisition_order.is_empty() {
        &Rat::DEFAULT_ORDER[..]
    } else {
        acquisition_order
    };

    let mut tokens: Vec<&str> = order
        .iter()
        .filter(|rat| selected.contains(rat))
        .map(Rat::as_str)
        .collect();
    // Selected RATs missing from the reported order go last
    for rat in Rat::DEFAULT_ORDER {
        if selected.contains(&rat) && !order.contains(&rat) {
            tokens.push(rat.as_str());
        }
    }
    tokens.join(":")
}

/// Set the preferred network (RAT) mode
pub fn network_mode(selected: &[Rat], acquisition_order: &[Rat]) -> Command {
    Command::from_canonical(format!(
        "AT+QNWPREFCFG=\"mode_pref\",{}",
        mode_pref_value(selected, acquisition_order)
    ))
}

pub fn set_nr5g_mode(mode: Nr5gMode) -> Command {
    Command::from_canonical(format!("AT^NR5G_MODE={}", mode as u8))
}

/// Switch the active SIM slot (1 or 2)
pub fn sim_slot(slot: u8) -> Result<Command> {
    if !(1..=2).contains(&slot) {
        return Err(invalid(format!("SIM slot {}", slot)));
    }
    Ok(Command::from_canonical(format!("AT+QUIMSLOT={}", slot)))
}

/// Check an APN: 1 to 63 letters, digits, `.`, `_` or `-`
pub fn validate_apn(apn: &str) -> Result<&str> {
    let apn = apn.trim();
    let valid = !apn.is_empty()
        && apn.len() <= MAX_APN_LEN
        && apn
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(apn)
    } else {
        Err(invalid(format!(
            "APN {:?} may only use letters, digits, '.', '_' and '-' (max {} characters)",
            apn, MAX_APN_LEN
        )))
    }
}

/// Configure the primary PDP context
pub fn set_apn(apn: &str, pdp_type: PdpType) -> Result<Command> {
    let apn = validate_apn(apn)?;
    Ok(Command::from_canonical(format!(
        "AT+CGDCONT=1,\"{}\",\"{}\"",
        pdp_type.as_str(),
        apn
    )))
}

/// Delete a PDP context
pub fn delete_pdp_context(cid: u32) -> Command {
    Command::from_canonical(format!("AT+CGDCONT={}", cid))
}

// =============================================================================
// Client operations
// =============================================================================

/// A settings query that did not complete
#[derive(Debug, Clone, PartialEq)]
pub struct FailedQuery {
    pub query: &'static str,
    pub error: AtClientError,
}

/// Outcome of [`read_current_settings`]
#[derive(Debug, Clone, Default)]
pub struct SettingsReport {
    /// Parsed from every response received, including partial ones
    pub settings: CurrentSettings,
    pub failed: Vec<FailedQuery>,
    /// Queries that ran, in order
    pub queried: Vec<&'static str>,
}

impl SettingsReport {
    /// True when at least one query ran and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.queried.is_empty() && self.failed.len() == self.queried.len()
    }
}

/// Read the radio configuration with independent queries
///
/// A failing query is recorded and the others still run. The APN and cell
/// lock queries are skipped unless the SIM reports `READY`.
#[instrument(skip_all)]
pub async fn read_current_settings<T: AtTransport>(
    client: &AtClient<T>,
    options: &ExecOptions,
) -> SettingsReport {
    let mut report = SettingsReport::default();
    let mut text = String::new();

    for query in [SIM_SLOT_QUERY, SIM_STATUS_QUERY] {
        run_query(client, query, options, &mut report, &mut text).await;
    }

    let sim_ready = parse_current_settings(&text).sim_ready == Some(true);
    if sim_ready {
        run_query(client, APN_INFO_QUERY, options, &mut report, &mut text).await;
    } else {
        debug!("SIM not ready, skipping APN and cell lock queries");
    }

    run_query(client, NETWORK_MODE_QUERY, options, &mut report, &mut text).await;

    if sim_ready {
        run_query(client, CELL_LOCK_QUERY, options, &mut report, &mut text).await;
    }

    report.settings = parse_current_settings(&text);
    report
}

async fn run_query<T: AtTransport>(
    client: &AtClient<T>,
    query: &'static str,
    options: &ExecOptions,
    report: &mut SettingsReport,
    text: &mut String,
) {
    let result = client.execute(query, options).await;
    report.queried.push(query);

    if !result.data.is_empty() {
        text.push_str(&result.data);
        text.push('\n');
    }

    if !result.ok {
        let error = result.error.unwrap_or(AtClientError::ModemError);
        warn!("Settings query {} failed: {}", query, error);
        report.failed.push(FailedQuery { query, error });
    }
}

/// Make `apn` the only configured APN and restart the radio
///
/// Lists the PDP contexts, deletes every context except 1, writes context 1
/// and cycles `CFUN`. Each step runs with recovery; the first step that
/// still fails ends the sequence and its result is returned. Attempts are
/// summed over all steps.
#[instrument(skip(client, options))]
pub async fn apply_apn<T: AtTransport>(
    client: &AtClient<T>,
    apn: &str,
    pdp_type: PdpType,
    options: &ExecOptions,
) -> Result<ExecutionResult> {
    let set = set_apn(apn, pdp_type)?;

    let listing = client.execute(APN_CONTEXTS_QUERY, options).await;
    if !listing.ok {
        return Ok(listing);
    }

    let mut steps: Vec<Command> = parse_apn_contexts(&listing.data)
        .into_iter()
        .filter(|context| context.cid != 1)
        .map(|context| delete_pdp_context(context.cid))
        .collect();
    steps.push(set);
    steps.push(Command::from_canonical(RADIO_OFF.to_string()));
    steps.push(Command::from_canonical(RADIO_ON.to_string()));

    let mut attempts = listing.attempts;
    let mut data = Vec::new();
    for step in steps {
        let result = client.execute_with_recovery(&step, options).await;
        attempts += result.attempts;
        if !result.ok {
            return Ok(ExecutionResult { attempts, ..result });
        }

        let trimmed = result.data.trim();
        if !trimmed.is_empty() {
            data.push(trimmed.to_string());
        }
    }

    Ok(ExecutionResult::success(data.join("\n"), attempts))
}

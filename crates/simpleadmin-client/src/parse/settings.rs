//! Current radio settings: SIM slot, APN, cell locks, network preference
//! and active bands
//!
//! The parser understands the Quectel query replies (`+QUIMSLOT`,
//! `+QNWPREFCFG`, `+QNWLOCK`) as well as the `^`-style replies
//! (`SIMn ENABLE`, `^LTE_LOCK`, `^SLMODE`, `^NR5G_MODE`, CA info) some
//! firmwares give for the same settings. Text from several independent
//! queries can simply be concatenated before parsing.

use serde::Serialize;

use super::{field_after_colon, leading_int, payload, strip_quotes};
use crate::command::split_lines;

/// Active SIM slot
pub const SIM_SLOT_QUERY: &str = "AT+QUIMSLOT?";
/// SIM PIN state; APN and cell lock queries are only useful when `READY`
pub const SIM_STATUS_QUERY: &str = "AT+CPIN?";
/// Configured contexts plus the APN of the active bearer
pub const APN_INFO_QUERY: &str = "AT+CGDCONT?;AT+CGCONTRDP=1";
/// Configured PDP contexts only
pub const APN_CONTEXTS_QUERY: &str = "AT+CGDCONT?";
/// Preferred network mode and RAT acquisition order
pub const NETWORK_MODE_QUERY: &str =
    "AT+QNWPREFCFG=\"mode_pref\";AT+QNWPREFCFG=\"rat_acq_order\"";
/// LTE and NR5G-SA cell locks
pub const CELL_LOCK_QUERY: &str = "AT+QNWLOCK=\"common/4g\";AT+QNWLOCK=\"common/5g\"";

const NO_LOCK_MARKER: &str = "have not set cell lock before";

/// LTE cell lock entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LteCellLock {
    pub pci: u32,
    pub earfcn: u32,
}

/// NR5G-SA cell lock entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NrCellLock {
    pub band: u32,
    /// Subcarrier spacing code, see [`describe_scs`]
    pub scs: u32,
    pub arfcn: u32,
    pub pci: u32,
}

/// Snapshot of the radio configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentSettings {
    pub sim_slot: Option<u32>,
    /// Whether `+CPIN` reported `READY`
    pub sim_ready: Option<bool>,
    pub apn: Option<String>,
    /// PDP type of the primary context (e.g. `IPV4V6`)
    pub apn_pdp_type: Option<String>,
    pub lte_locks: Vec<LteCellLock>,
    pub nr_locks: Vec<NrCellLock>,
    /// `^SLMODE` preferred network code
    pub pref_network: Option<u32>,
    /// `+QNWPREFCFG` mode preference, e.g. `AUTO` or `NR5G:LTE`
    pub mode_pref: Option<String>,
    /// RAT acquisition order, most preferred first
    pub rat_acq_order: Vec<String>,
    pub nr5g_mode: Option<u32>,
    /// PCC band first, then SCC bands
    pub bands: Vec<String>,
}

impl CurrentSettings {
    /// Human readable summary of the active cell locks
    pub fn cell_lock_status(&self) -> String {
        let mut parts = Vec::new();

        if !self.lte_locks.is_empty() {
            let formatted: Vec<String> = self
                .lte_locks
                .iter()
                .map(|l| format!("PCI {} / EARFCN {}", l.pci, l.earfcn))
                .collect();
            parts.push(format!("LTE ({}): {}", self.lte_locks.len(), formatted.join(" · ")));
        }

        if !self.nr_locks.is_empty() {
            let formatted: Vec<String> = self
                .nr_locks
                .iter()
                .map(|l| {
                    format!(
                        "Band {} ({}) / PCI {} / NR-ARFCN {}",
                        l.band,
                        describe_scs(l.scs),
                        l.pci,
                        l.arfcn
                    )
                })
                .collect();
            parts.push(format!(
                "NR5G-SA ({}): {}",
                self.nr_locks.len(),
                formatted.join(" · ")
            ));
        }

        if parts.is_empty() {
            "Not Locked".to_string()
        } else {
            parts.join(" | ")
        }
    }

    pub fn pref_network_label(&self) -> String {
        match (&self.mode_pref, self.pref_network) {
            (Some(mode), _) => describe_mode_pref(mode),
            (None, Some(code)) => describe_pref_network(code).to_string(),
            (None, None) => "Unknown".to_string(),
        }
    }

    pub fn nr5g_mode_label(&self) -> &'static str {
        self.nr5g_mode.map(describe_nr5g_mode).unwrap_or("Unknown")
    }
}

/// Label for a preferred network (RAT) mode value
pub fn describe_pref_network(value: u32) -> &'static str {
    match value {
        0 => "Auto",
        1 => "3G Only",
        2 => "4G / LTE Only",
        3 => "3G + 4G / LTE",
        4 => "5G Only",
        5 => "3G + 5G",
        6 => "4G / LTE + 5G",
        7 => "3G + 4G / LTE + 5G",
        _ => "Unknown",
    }
}

/// Label for a `+QNWPREFCFG` mode preference such as `NR5G:LTE`
pub fn describe_mode_pref(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return "Unknown".to_string();
    }
    if value.eq_ignore_ascii_case("AUTO") {
        return "Auto".to_string();
    }

    let tokens: Vec<String> = value
        .split(':')
        .map(|t| t.trim().to_ascii_uppercase())
        .collect();
    let labels: Vec<&str> = [("WCDMA", "3G"), ("LTE", "4G"), ("NR5G", "5G")]
        .iter()
        .filter(|(rat, _)| tokens.iter().any(|t| t == rat))
        .map(|(_, label)| *label)
        .collect();

    if labels.is_empty() {
        value.to_string()
    } else {
        labels.join(" + ")
    }
}

/// Label for an NR5G mode value
pub fn describe_nr5g_mode(value: u32) -> &'static str {
    match value {
        0 => "Auto",
        1 => "NSA",
        2 => "SA",
        _ => "Unknown",
    }
}

/// Label for a subcarrier spacing code
pub fn describe_scs(value: u32) -> String {
    match value {
        0 => "15kHz".to_string(),
        1 => "30kHz".to_string(),
        2 => "60kHz".to_string(),
        3 => "120kHz".to_string(),
        4 => "240kHz".to_string(),
        other => format!("SCS {}", other),
    }
}

/// `+PREFIX: 1...` line if present, otherwise the first `+PREFIX:` line
fn first_profile_line<'a>(lines: &[&'a str], prefix: &str) -> Option<&'a str> {
    let tag = format!("+{}:", prefix.to_ascii_uppercase());
    let primary = format!("{} 1", tag);

    lines
        .iter()
        .find(|l| l.to_ascii_uppercase().starts_with(&primary))
        .or_else(|| lines.iter().find(|l| l.to_ascii_uppercase().starts_with(&tag)))
        .copied()
}

/// Parenthesized groups of exactly `arity` comma-separated integers
fn tuples(payload: &str, arity: usize) -> Vec<Vec<u32>> {
    let mut groups = Vec::new();
    let mut rest = payload;

    while let Some(start) = rest.find('(') {
        let after = &rest[start + 1..];
        let Some(end) = after.find(')') else {
            break;
        };

        let values: Vec<&str> = after[..end].split(',').collect();
        if values.len() == arity {
            let parsed: Option<Vec<u32>> = values.iter().map(|v| v.trim().parse().ok()).collect();
            if let Some(parsed) = parsed {
                groups.push(parsed);
            }
        }

        rest = &after[end + 1..];
    }

    groups
}

/// Flat comma-separated integers; entries that are not numbers are dropped
fn flat_numbers(payload: &str) -> Vec<u32> {
    payload.split(',').filter_map(leading_int).collect()
}

fn lock_payload(line: &str) -> Option<&str> {
    let payload = payload(line);
    if payload.is_empty() || payload.to_lowercase().contains(NO_LOCK_MARKER) {
        None
    } else {
        Some(payload)
    }
}

fn parse_lte_locks(line: &str) -> Vec<LteCellLock> {
    let Some(payload) = lock_payload(line) else {
        return Vec::new();
    };

    let grouped = tuples(payload, 2);
    let values: Vec<Vec<u32>> = if grouped.is_empty() {
        flat_numbers(payload)
            .chunks_exact(2)
            .map(|c| c.to_vec())
            .collect()
    } else {
        grouped
    };

    values
        .into_iter()
        .map(|v| LteCellLock {
            pci: v[0],
            earfcn: v[1],
        })
        .collect()
}

fn parse_nr_locks(line: &str) -> Vec<NrCellLock> {
    let Some(payload) = lock_payload(line) else {
        return Vec::new();
    };

    let grouped = tuples(payload, 4);
    let values: Vec<Vec<u32>> = if grouped.is_empty() {
        flat_numbers(payload)
            .chunks_exact(4)
            .map(|c| c.to_vec())
            .collect()
    } else {
        grouped
    };

    values
        .into_iter()
        .map(|v| NrCellLock {
            band: v[0],
            scs: v[1],
            arfcn: v[2],
            pci: v[3],
        })
        .collect()
}

/// Subcarrier spacing code for a spacing given in kHz
fn scs_code(khz: u32) -> u32 {
    match khz {
        15 => 0,
        30 => 1,
        60 => 2,
        120 => 3,
        240 => 4,
        other => other,
    }
}

/// Numbers after the quoted mode of a `+QNWLOCK: "common/..."` line
fn qnwlock_numbers(line: &str) -> Vec<u32> {
    payload(line)
        .split_once(',')
        .map(|(_, rest)| flat_numbers(rest))
        .unwrap_or_default()
}

/// `+QNWLOCK: "common/4g",<count>,<earfcn>,<pci>,...`
fn parse_qnwlock_4g(line: &str) -> Vec<LteCellLock> {
    let numbers = qnwlock_numbers(line);
    let Some((&count, pairs)) = numbers.split_first() else {
        return Vec::new();
    };

    pairs
        .chunks_exact(2)
        .take(count as usize)
        .map(|pair| LteCellLock {
            earfcn: pair[0],
            pci: pair[1],
        })
        .collect()
}

/// `+QNWLOCK: "common/5g",<pci>,<arfcn>,<scs kHz>,<band>`
fn parse_qnwlock_5g(line: &str) -> Vec<NrCellLock> {
    match qnwlock_numbers(line)[..] {
        [pci, arfcn, scs, band, ..] => vec![NrCellLock {
            band,
            scs: scs_code(scs),
            arfcn,
            pci,
        }],
        _ => Vec::new(),
    }
}

/// Value of a `+QNWPREFCFG: "<key>",<value>` line
fn qnwprefcfg_value(lines: &[&str], key: &str) -> Option<String> {
    let tag = format!("+qnwprefcfg: \"{}\"", key);
    let line = lines.iter().find(|l| l.to_lowercase().contains(&tag))?;
    let (_, value) = line.split_once(',')?;
    let value = strip_quotes(value);
    if value.is_empty() {
        None
    } else {
        Some(value.to_ascii_uppercase())
    }
}

/// Digits of the `_`-delimited token in a `PCC info:` / `SCC` line
fn band_of(line: &str) -> Option<String> {
    let digits: String = field_after_colon(line)?
        .split('_')
        .nth(1)?
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Parse the concatenated responses of the settings queries
pub fn parse_current_settings(text: &str) -> CurrentSettings {
    let lines = split_lines(text);
    let mut settings = CurrentSettings::default();

    if let Some(line) = lines.iter().find(|l| l.starts_with("+QUIMSLOT:")) {
        settings.sim_slot = leading_int(payload(line));
    }

    if let Some(line) = lines.iter().find(|l| l.starts_with("+CPIN:")) {
        settings.sim_ready = Some(payload(line).to_ascii_uppercase().contains("READY"));
    }

    if let Some(line) = lines
        .iter()
        .find(|l| l.contains("SIM1 ENABLE") || l.contains("SIM2 ENABLE"))
        .filter(|_| settings.sim_slot.is_none())
    {
        let digits: String = line
            .split(' ')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        settings.sim_slot = digits.parse().ok();
    }

    if let Some(line) = first_profile_line(&lines, "CGCONTRDP") {
        settings.apn = line.split(',').nth(2).map(strip_quotes);
    }

    if let Some(line) = first_profile_line(&lines, "CGDCONT") {
        settings.apn_pdp_type = line.split(',').nth(1).map(strip_quotes);
    }

    let upper: Vec<String> = lines.iter().map(|l| l.to_ascii_uppercase()).collect();

    if let Some(index) = upper.iter().position(|l| l.contains("LTE_LOCK:")) {
        settings.lte_locks = parse_lte_locks(lines[index]);
    }

    if let Some(index) = upper.iter().position(|l| l.contains("NR5G_LOCK:")) {
        settings.nr_locks = parse_nr_locks(lines[index]);
    }

    if let Some(line) = lines.iter().find(|l| l.contains("+QNWLOCK: \"common/4g\"")) {
        settings.lte_locks = parse_qnwlock_4g(line);
    }

    if let Some(line) = lines.iter().find(|l| l.contains("+QNWLOCK: \"common/5g\"")) {
        settings.nr_locks = parse_qnwlock_5g(line);
    }

    settings.mode_pref = qnwprefcfg_value(&lines, "mode_pref");
    if let Some(order) = qnwprefcfg_value(&lines, "rat_acq_order") {
        settings.rat_acq_order = order
            .split(':')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(line) = lines.iter().find(|l| l.contains("^SLMODE:")) {
        settings.pref_network = field_after_colon(line)
            .and_then(|v| v.split(',').nth(1))
            .and_then(|v| leading_int(&strip_quotes(v)));
    }

    if let Some(line) = lines.iter().find(|l| l.contains("^NR5G_MODE:")) {
        settings.nr5g_mode = field_after_colon(line).and_then(|v| leading_int(&strip_quotes(v)));
    }

    if let Some(pcc) = lines.iter().find(|l| l.contains("PCC info:")) {
        if let Some(band) = band_of(pcc) {
            settings.bands.push(band);
        }
        settings.bands.extend(
            lines
                .iter()
                .filter(|l| l.contains("SCC"))
                .filter_map(|l| band_of(l)),
        );
    }

    settings
}

/// One PDP context from `AT+CGDCONT?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnContext {
    pub cid: u32,
    pub pdp_type: String,
    pub apn: String,
}

/// Next `"..."` value at the start of `input`, and what follows it
fn quoted(input: &str) -> Option<(&str, &str)> {
    let inner = input.strip_prefix('"')?;
    let end = inner.find('"')?;
    Some((&inner[..end], &inner[end + 1..]))
}

fn parse_cgdcont_line(line: &str) -> Option<ApnContext> {
    let rest = line.strip_prefix("+CGDCONT:")?.trim_start();
    let (cid, rest) = rest.split_once(',')?;
    let cid = cid.parse().ok()?;
    let (pdp_type, rest) = quoted(rest)?;
    let (apn, _) = quoted(rest.strip_prefix(',')?)?;

    Some(ApnContext {
        cid,
        pdp_type: pdp_type.to_string(),
        apn: apn.to_string(),
    })
}

/// PDP contexts from an `AT+CGDCONT?` response, sorted by context id
pub fn parse_apn_contexts(text: &str) -> Vec<ApnContext> {
    let mut contexts: Vec<ApnContext> = split_lines(text)
        .into_iter()
        .filter_map(parse_cgdcont_line)
        .collect();
    contexts.sort_by_key(|c| c.cid);
    contexts
}

//! Parsers for the response text of known AT command batches
//!
//! All parsers are total: lines they do not recognize are skipped and
//! missing values are left as `None` or empty.

pub mod device;
pub mod settings;

pub use device::{parse_device_info, DeviceInfo, DEVICE_INFO_COMMANDS};
pub use settings::{
    describe_mode_pref, describe_nr5g_mode, describe_pref_network, describe_scs,
    parse_apn_contexts, parse_current_settings, ApnContext, CurrentSettings, LteCellLock,
    NrCellLock, APN_CONTEXTS_QUERY, APN_INFO_QUERY, CELL_LOCK_QUERY, NETWORK_MODE_QUERY,
    SIM_SLOT_QUERY, SIM_STATUS_QUERY,
};

/// Text between the first and second `:` of a line, trimmed
fn field_after_colon(line: &str) -> Option<&str> {
    line.split(':').nth(1).map(str::trim)
}

/// Everything after the first `:`, trimmed
fn payload(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

fn strip_quotes(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

/// Leading decimal digits of a trimmed value
fn leading_int(value: &str) -> Option<u32> {
    let value = value.trim();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

//! Device identity from the `ATI` / `+CGMI` / `+CIMI` / ... batch

use serde::Serialize;

use super::{field_after_colon, is_digits, strip_quotes};
use crate::command::split_lines;

/// Batch that produces everything [`parse_device_info`] understands
pub const DEVICE_INFO_COMMANDS: &str =
    "ATI;AT+CGMI;AT+CGMM;AT+CIMI;AT+ICCID;AT+CGSN;AT+CNUM;AT+CGCONTRDP=1";

const KNOWN_VENDORS: [&str; 5] = ["QUALCOMM", "QUECTEL", "HUAWEI", "FIBOCOM", "SIERRA"];

/// Modem and subscription identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub imsi: Option<String>,
    pub iccid: Option<String>,
    pub imei: Option<String>,
    pub phone_number: Option<String>,
    pub wwan_ipv4: Option<String>,
    pub wwan_ipv6: Option<String>,
}

/// Which echoed command the following lines belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Ati,
    Cgmi,
    Cgmm,
    Cimi,
    Cgsn,
    Other,
}

impl Context {
    fn from_echo(line: &str) -> Option<Self> {
        if line.starts_with("ATI") {
            Some(Self::Ati)
        } else if let Some(rest) = line.strip_prefix("AT+") {
            Some(match rest {
                r if r.starts_with("CGMI") => Self::Cgmi,
                r if r.starts_with("CGMM") => Self::Cgmm,
                r if r.starts_with("CIMI") => Self::Cimi,
                r if r.starts_with("CGSN") => Self::Cgsn,
                _ => Self::Other,
            })
        } else {
            None
        }
    }
}

/// First run of at least 15 digits, cut to 15
fn imei_in(line: &str) -> Option<String> {
    line.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() >= 15)
        .map(|run| run[..15].to_string())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse the response of [`DEVICE_INFO_COMMANDS`]
pub fn parse_device_info(text: &str) -> DeviceInfo {
    let mut info = DeviceInfo::default();
    let mut context: Option<Context> = None;
    let mut ati_stage = 0u8;

    for line in split_lines(text).into_iter().filter(|l| *l != "OK") {
        if let Some(echo) = Context::from_echo(line) {
            context = Some(echo);
            continue;
        }

        if line.starts_with("^VERSION:") {
            let version = field_after_colon(line).unwrap_or(line).to_string();
            if info.model.is_none() {
                let end = version
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
                    .unwrap_or(version.len());
                info.model = non_empty(version[..end].to_string());
            }
            info.firmware = non_empty(version);
            continue;
        }

        if line.starts_with("Revision:") {
            if let Some(revision) = field_after_colon(line).filter(|r| !r.is_empty()) {
                info.firmware = Some(revision.to_string());
            }
            continue;
        }

        if line.starts_with("+CGCONTRDP:") {
            let parts: Vec<&str> = line.split(',').collect();
            info.wwan_ipv4 = parts.get(3).and_then(|p| non_empty(strip_quotes(p)));
            info.wwan_ipv6 = parts.get(4).and_then(|p| non_empty(strip_quotes(p)));
            continue;
        }

        if let Some(rest) = line.strip_prefix("ICCID:") {
            info.iccid = non_empty(rest.trim().to_string());
            continue;
        }
        if line.starts_with("+ICCID:") {
            if let Some(iccid) = field_after_colon(line).and_then(|v| non_empty(strip_quotes(v))) {
                info.iccid = Some(iccid);
            }
            continue;
        }

        let is_imsi_shaped = line.len() == 15 && is_digits(line);
        if context == Some(Context::Cimi) && is_imsi_shaped {
            info.imsi = Some(line.to_string());
            continue;
        }
        if info.imsi.is_none()
            && is_imsi_shaped
            && !line.starts_with("89")
            && info.imei.as_deref() != Some(line)
        {
            info.imsi = Some(line.to_string());
            continue;
        }

        if context == Some(Context::Cgsn) || line.starts_with("+CGSN:") {
            if let Some(imei) = imei_in(line) {
                info.imei = Some(imei);
            }
            continue;
        }
        if info.imei.is_none()
            && (15..=17).contains(&line.len())
            && is_digits(line)
            && !line.starts_with("89")
            && info.imsi.as_deref() != Some(line)
        {
            info.imei = Some(line[..15].to_string());
            continue;
        }

        if line.starts_with("+CNUM:") {
            if let Some(number) = line.split(',').nth(1).and_then(|n| non_empty(strip_quotes(n))) {
                info.phone_number = Some(number);
            }
            continue;
        }

        match context {
            Some(Context::Cgmi) => {
                info.manufacturer = Some(line.to_string());
                context = None;
                continue;
            }
            Some(Context::Ati) => {
                if info.manufacturer.is_none() {
                    info.manufacturer = Some(line.to_string());
                    ati_stage = ati_stage.max(1);
                    continue;
                }
                if info.model.is_none() && ati_stage >= 1 {
                    info.model = Some(line.to_string());
                    ati_stage = 2;
                    continue;
                }
            }
            Some(Context::Cgmm) => {
                info.model = Some(line.to_string());
                context = None;
                continue;
            }
            _ => {}
        }

        let upper = line.to_ascii_uppercase();
        if info.manufacturer.is_none() && KNOWN_VENDORS.iter().any(|v| upper.contains(v)) {
            info.manufacturer = Some(line.to_string());
        } else if info.model.is_none()
            && info.manufacturer.is_some()
            && line
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            info.model = Some(line.to_string());
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUECTEL_RESPONSE: &str = "ATI\r\n\
        Quectel\r\n\
        RM520N-GL\r\n\
        Revision: RM520NGLAAR03A03M4G\r\n\
        \r\n\
        OK\r\n\
        AT+CGMI\r\n\
        Quectel\r\n\
        OK\r\n\
        AT+CGMM\r\n\
        RM520N-GL\r\n\
        OK\r\n\
        AT+CIMI\r\n\
        310260123456789\r\n\
        OK\r\n\
        AT+ICCID\r\n\
        +ICCID: 8901260123456789012\r\n\
        OK\r\n\
        AT+CGSN\r\n\
        861234567890123\r\n\
        OK\r\n\
        AT+CNUM\r\n\
        +CNUM: ,\"+15551234567\",145\r\n\
        OK\r\n\
        AT+CGCONTRDP=1\r\n\
        +CGCONTRDP: 1,5,\"fast.t-mobile.com\",\"10.20.30.40\",\"2607:fb90::1\"\r\n\
        OK\r\n";

    #[test]
    fn test_parse_echoed_batch() {
        let info = parse_device_info(QUECTEL_RESPONSE);
        assert_eq!(
            info,
            DeviceInfo {
                manufacturer: Some("Quectel".into()),
                model: Some("RM520N-GL".into()),
                firmware: Some("RM520NGLAAR03A03M4G".into()),
                imsi: Some("310260123456789".into()),
                iccid: Some("8901260123456789012".into()),
                imei: Some("861234567890123".into()),
                phone_number: Some("+15551234567".into()),
                wwan_ipv4: Some("10.20.30.40".into()),
                wwan_ipv6: Some("2607:fb90::1".into()),
            }
        );
    }

    #[test]
    fn test_parse_without_echo_uses_fallbacks() {
        let text = "QUECTEL\nRM502Q-AE\n310260123456789\n86123456789012345\nICCID: 89012601\n";
        let info = parse_device_info(text);
        assert_eq!(info.manufacturer.as_deref(), Some("QUECTEL"));
        assert_eq!(info.model.as_deref(), Some("RM502Q-AE"));
        assert_eq!(info.imsi.as_deref(), Some("310260123456789"));
        assert_eq!(info.imei.as_deref(), Some("861234567890123"));
        assert_eq!(info.iccid.as_deref(), Some("89012601"));
    }

    #[test]
    fn test_version_line_sets_model_and_firmware() {
        let info = parse_device_info("^VERSION: SIM8380G-M2_V1.2\r\nOK\r\n");
        assert_eq!(info.firmware.as_deref(), Some("SIM8380G-M2_V1.2"));
        assert_eq!(info.model.as_deref(), Some("SIM8380G-M2_V1"));
    }

    #[test]
    fn test_cgsn_prefixed_imei() {
        let info = parse_device_info("+CGSN: \"8612345678901234\"\r\nOK");
        assert_eq!(info.imei.as_deref(), Some("861234567890123"));
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(parse_device_info(""), DeviceInfo::default());
        assert_eq!(parse_device_info("OK\r\n"), DeviceInfo::default());
    }
}

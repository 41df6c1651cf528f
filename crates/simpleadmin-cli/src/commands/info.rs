//! Info command - show modem and SIM identity

use anyhow::Result;
use simpleadmin_client::parse::{parse_device_info, DeviceInfo, DEVICE_INFO_COMMANDS};
use simpleadmin_client::{AtClient, AtTransport, ExecOptions, ExecutionResult};

use super::check;
use crate::output::{or_dash, OutputContext};

/// Run the identity batch and parse whatever came back, even when a later
/// command in the batch failed
async fn query_device_info<T: AtTransport>(client: &AtClient<T>) -> (DeviceInfo, ExecutionResult) {
    let result = client.execute(DEVICE_INFO_COMMANDS, &ExecOptions::new()).await;
    (parse_device_info(&result.data), result)
}

fn device_pairs(info: &DeviceInfo) -> Vec<(&'static str, String)> {
    vec![
        ("Manufacturer", or_dash(info.manufacturer.clone())),
        ("Model", or_dash(info.model.clone())),
        ("Firmware", or_dash(info.firmware.clone())),
        ("IMEI", or_dash(info.imei.clone())),
        ("IMSI", or_dash(info.imsi.clone())),
        ("ICCID", or_dash(info.iccid.clone())),
        ("Phone Number", or_dash(info.phone_number.clone())),
        ("WWAN IPv4", or_dash(info.wwan_ipv4.clone())),
        ("WWAN IPv6", or_dash(info.wwan_ipv6.clone())),
    ]
}

/// Print the identity fields that were found, then report a failed batch
pub async fn info<T: AtTransport>(client: &AtClient<T>, ctx: &OutputContext) -> Result<()> {
    let (info, result) = query_device_info(client).await;

    if result.ok || info != DeviceInfo::default() {
        ctx.print_kv(&device_pairs(&info));
    }
    if !result.ok {
        ctx.warn("Some identity fields could not be read");
    }
    check(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simpleadmin_client::testing::{ScriptedModem, TestServer};

    fn modem_without_phone_number() -> ScriptedModem {
        // AT+CNUM is not registered, so the scripted modem answers ERROR
        ScriptedModem::new()
            .respond("ATI", "Quectel\r\nRM520N-GL\r\nRevision: RM520NGLAAR03A03M4G\r\n\r\nOK\r\n")
            .respond("AT+CGMI", "Quectel\r\nOK\r\n")
            .respond("AT+CGMM", "RM520N-GL\r\nOK\r\n")
            .respond("AT+CIMI", "310260123456789\r\nOK\r\n")
            .respond("AT+ICCID", "+ICCID: 8901260123456789012\r\nOK\r\n")
            .respond("AT+CGSN", "861234567890123\r\nOK\r\n")
    }

    #[tokio::test]
    async fn test_identity_survives_failed_phone_number_query() {
        let modem = modem_without_phone_number();
        let server = TestServer::start(modem.router()).await.unwrap();

        let (info, result) = query_device_info(&server.client).await;

        assert!(!result.ok);
        assert_eq!(info.imei.as_deref(), Some("861234567890123"));
        assert_eq!(info.imsi.as_deref(), Some("310260123456789"));
        assert_eq!(info.iccid.as_deref(), Some("8901260123456789012"));
        assert_eq!(info.model.as_deref(), Some("RM520N-GL"));
        assert_eq!(info.phone_number, None);

        // The batch stops at the failing command
        assert_eq!(modem.received().last().map(String::as_str), Some("AT+CNUM"));

        let pairs = device_pairs(&info);
        assert!(pairs.contains(&("IMEI", "861234567890123".to_string())));
        assert!(pairs.contains(&("Phone Number", "-".to_string())));
    }

    #[tokio::test]
    async fn test_info_reports_failure_after_printing() {
        let server = TestServer::start(modem_without_phone_number().router())
            .await
            .unwrap();
        let ctx = OutputContext::new(Default::default(), true, true);

        let err = info(&server.client, &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "The modem returned ERROR. (7 attempts)");
    }
}

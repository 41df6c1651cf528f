//! Settings command - show the current network configuration

use anyhow::{bail, Result};
use simpleadmin_client::parse::CurrentSettings;
use simpleadmin_client::radio::{read_current_settings, SettingsReport};
use simpleadmin_client::{AtClient, AtTransport, ExecOptions};

use crate::output::{or_dash, OutputContext};

const NOT_AVAILABLE: &str = "Not Available";

fn settings_pairs(settings: &CurrentSettings) -> Vec<(&'static str, String)> {
    let sim_missing = settings.sim_ready != Some(true);
    let sim_dependent = |value: String| {
        if sim_missing && value == "-" {
            NOT_AVAILABLE.to_string()
        } else {
            value
        }
    };

    let bands = if settings.bands.is_empty() {
        "-".to_string()
    } else {
        settings.bands.join(", ")
    };
    let cell_lock = if sim_missing && settings.lte_locks.is_empty() && settings.nr_locks.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        settings.cell_lock_status()
    };

    vec![
        ("SIM Slot", or_dash(settings.sim_slot)),
        (
            "SIM",
            match settings.sim_ready {
                Some(true) => "Ready".to_string(),
                Some(false) => "Not Ready".to_string(),
                None => "-".to_string(),
            },
        ),
        ("APN", sim_dependent(or_dash(settings.apn.clone()))),
        ("PDP Type", sim_dependent(or_dash(settings.apn_pdp_type.clone()))),
        ("Network Mode", settings.pref_network_label()),
        ("NR5G Mode", settings.nr5g_mode_label().to_string()),
        ("Cell Lock", cell_lock),
        ("Active Bands", bands),
    ]
}

/// Print what the settings queries returned; fail only when none answered
fn report(report: &SettingsReport, ctx: &OutputContext) -> Result<()> {
    if report.all_failed() {
        let first = report
            .failed
            .first()
            .map(|f| f.error.to_string())
            .unwrap_or_default();
        bail!("No settings could be read: {}", first);
    }

    ctx.print_kv(&settings_pairs(&report.settings));
    for failed in &report.failed {
        ctx.warn(&format!("{} failed: {}", failed.query, failed.error));
    }
    Ok(())
}

pub async fn settings<T: AtTransport>(client: &AtClient<T>, ctx: &OutputContext) -> Result<()> {
    let result = read_current_settings(client, &ExecOptions::new()).await;
    report(&result, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simpleadmin_client::parse::{SIM_SLOT_QUERY, SIM_STATUS_QUERY};
    use simpleadmin_client::testing::{ScriptedModem, TestServer};

    fn value<'a>(pairs: &'a [(&str, String)], key: &str) -> &'a str {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[tokio::test]
    async fn test_settings_tolerates_failed_queries() {
        // Only the SIM slot and mode queries are answered; the rest get ERROR
        let modem = ScriptedModem::new()
            .respond(SIM_SLOT_QUERY, "+QUIMSLOT: 2\r\nOK\r\n")
            .respond("AT+QNWPREFCFG=\"mode_pref\"", "+QNWPREFCFG: \"mode_pref\",LTE:NR5G\r\nOK\r\n")
            .respond(
                "AT+QNWPREFCFG=\"rat_acq_order\"",
                "+QNWPREFCFG: \"rat_acq_order\",NR5G:LTE:WCDMA\r\nOK\r\n",
            );
        let server = TestServer::start(modem.router()).await.unwrap();
        let ctx = OutputContext::new(Default::default(), true, true);

        settings(&server.client, &ctx).await.unwrap();

        let result = read_current_settings(&server.client, &ExecOptions::new()).await;
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].query, SIM_STATUS_QUERY);

        let pairs = settings_pairs(&result.settings);
        assert_eq!(value(&pairs, "SIM Slot"), "2");
        assert_eq!(value(&pairs, "Network Mode"), "4G + 5G");
        assert_eq!(value(&pairs, "APN"), NOT_AVAILABLE);
        assert_eq!(value(&pairs, "Cell Lock"), NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_settings_fails_when_nothing_answers() {
        let server = TestServer::start(ScriptedModem::new().router()).await.unwrap();
        let ctx = OutputContext::new(Default::default(), true, true);

        let err = settings(&server.client, &ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No settings could be read: The modem returned ERROR."
        );
    }

    #[test]
    fn test_settings_pairs_with_sim_ready() {
        let settings = CurrentSettings {
            sim_ready: Some(true),
            apn: Some("internet".into()),
            ..Default::default()
        };
        let pairs = settings_pairs(&settings);
        assert_eq!(value(&pairs, "APN"), "internet");
        assert_eq!(value(&pairs, "PDP Type"), "-");
        assert_eq!(value(&pairs, "Cell Lock"), "Not Locked");
        assert_eq!(value(&pairs, "SIM"), "Ready");
    }
}

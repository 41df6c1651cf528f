//! Command implementations for simpleadmin-cli

pub mod apn;
pub mod configure;
pub mod exec;
pub mod info;
pub mod settings;

pub use apn::{apn, set_apn};
pub use configure::{bands, lte_lock, network_mode, nr5g_mode, nr_lock, sim_slot};
pub use exec::exec;
pub use info::info;
pub use settings::settings;

use anyhow::{bail, Result};
use simpleadmin_client::ExecutionResult;

use crate::output::OutputContext;

/// Message for a failed execution; busy modems get their own wording
fn failure_message(result: &ExecutionResult) -> String {
    let error = result
        .error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "AT command failed.".to_string());
    let attempts = match result.attempts {
        1 => "1 attempt".to_string(),
        n => format!("{} attempts", n),
    };

    if result.busy {
        format!("Modem busy after {}: {}", attempts, error)
    } else {
        format!("{} ({})", error, attempts)
    }
}

/// Fail unless the execution succeeded
fn check(result: &ExecutionResult) -> Result<()> {
    if result.ok {
        return Ok(());
    }
    bail!("{}", failure_message(result))
}

/// Like [`check`], but the raw partial response is shown on stderr first
fn ensure_ok(result: &ExecutionResult, ctx: &OutputContext) -> Result<()> {
    if !result.ok && !result.data.is_empty() && !ctx.quiet {
        ctx.warn(&result.data);
    }
    check(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simpleadmin_client::AtClientError;

    #[test]
    fn test_failure_message_busy() {
        let result = ExecutionResult::failure("", AtClientError::Busy, true, 3);
        assert_eq!(
            failure_message(&result),
            "Modem busy after 3 attempts: The modem is busy. Try again later."
        );
    }

    #[test]
    fn test_failure_message_modem_error() {
        let result = ExecutionResult::failure("ERROR", AtClientError::ModemError, false, 1);
        assert_eq!(
            failure_message(&result),
            "The modem returned ERROR. (1 attempt)"
        );
    }

    #[test]
    fn test_check() {
        assert!(check(&ExecutionResult::success("OK", 2)).is_ok());

        let result = ExecutionResult::failure("partial", AtClientError::Timeout, false, 3);
        assert_eq!(
            check(&result).unwrap_err().to_string(),
            "AT request timed out. (3 attempts)"
        );
    }

    #[test]
    fn test_ensure_ok() {
        let ctx = OutputContext::new(Default::default(), true, true);
        assert!(ensure_ok(&ExecutionResult::success("OK", 1), &ctx).is_ok());

        let err = ensure_ok(&ExecutionResult::empty_command(), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "Empty or invalid AT command. (0 attempts)");
    }
}

//! AT command client: sequencing, retries and result aggregation

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::command::{normalize_commands, sanitize, CommandInput};
use crate::config::{ClientConfig, ExecOptions, ResolvedOptions};
use crate::error::{AtClientError, Result};
use crate::result::{AttemptOutcome, ExecutionResult};
use crate::transport::{AtTransport, HttpTransport};

/// Upper bound of the linear retry backoff
const MAX_BACKOFF: Duration = Duration::from_millis(2000);
/// Backoff step per attempt
const BACKOFF_STEP: Duration = Duration::from_millis(500);
/// Pause before probing the modem after a failed command
const RECOVERY_PAUSE: Duration = Duration::from_millis(300);
/// Command used to check that the modem still answers
pub const HEALTH_CHECK_COMMAND: &str = "ATI";

/// Delay before the attempt following attempt number `attempt` (1-based)
pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_STEP.saturating_mul(attempt).min(MAX_BACKOFF)
}

/// AT command client
///
/// Sends commands one at a time over an [`AtTransport`], retrying
/// transient failures (busy, empty, timeout, HTTP/network errors) with a
/// linear backoff. Holds no state between calls; every failure is reported
/// inside the returned [`ExecutionResult`].
#[derive(Debug, Clone)]
pub struct AtClient<T = HttpTransport> {
    transport: T,
    defaults: ExecOptions,
}

impl AtClient<HttpTransport> {
    /// Create a client for the router at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the router web server (e.g., "http://192.168.225.1")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(&ClientConfig::new(base_url))
    }

    /// Create a client from a full configuration, using its `exec` section
    /// as per-call defaults
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::with_config(config)?;
        Ok(Self::with_transport(transport).with_defaults(config.exec.clone()))
    }
}

impl<T: AtTransport> AtClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            defaults: ExecOptions::default(),
        }
    }

    /// Options used for fields a call leaves unset
    pub fn with_defaults(mut self, defaults: ExecOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn defaults(&self) -> &ExecOptions {
        &self.defaults
    }

    fn resolve(&self, options: &ExecOptions) -> ResolvedOptions {
        options.clone().or(&self.defaults).resolve()
    }

    /// Execute one command or a batch and return the aggregated result
    pub async fn execute(
        &self,
        input: impl Into<CommandInput>,
        options: &ExecOptions,
    ) -> ExecutionResult {
        self.execute_sequence(input, options).await
    }

    /// Normalize the input into a batch and run it in order, stopping at
    /// the first failing command
    #[instrument(skip_all)]
    pub async fn execute_sequence(
        &self,
        input: impl Into<CommandInput>,
        options: &ExecOptions,
    ) -> ExecutionResult {
        let batch = normalize_commands(input);

        if batch.is_empty() {
            debug!("Rejecting empty command input");
            return ExecutionResult::empty_command();
        }

        if batch.len() == 1 {
            let command = batch.iter().next().map(|c| c.as_str()).unwrap_or_default();
            return self.execute_single(command, options).await;
        }

        debug!("Executing batch of {} commands", batch.len());

        let mut aggregated: Vec<String> = Vec::new();
        let mut attempts = 0u32;
        let mut busy = false;

        for command in &batch {
            let result = self.execute_single(command.as_str(), options).await;
            attempts = attempts.saturating_add(result.attempts.max(1));
            busy |= result.busy;

            let chunk = result.data.trim();

            if !result.ok {
                if !chunk.is_empty() {
                    aggregated.push(chunk.to_string());
                }
                warn!("Batch stopped at {}: {:?}", command, result.error);

                return ExecutionResult {
                    ok: false,
                    data: aggregated.join("\n"),
                    error: result.error,
                    busy,
                    attempts,
                };
            }

            if !chunk.is_empty() {
                aggregated.push(chunk.to_string());
            }
        }

        ExecutionResult::success(aggregated.join("\n"), attempts)
    }

    /// Execute a single command with the retry policy
    ///
    /// The command is only trimmed; callers going through [`execute`]
    /// get the `AT` prefix applied during normalization.
    ///
    /// [`execute`]: AtClient::execute
    #[instrument(skip(self, options))]
    pub async fn execute_single(&self, command: &str, options: &ExecOptions) -> ExecutionResult {
        let command = sanitize(command);
        if command.is_empty() {
            return ExecutionResult::empty_command();
        }

        let resolved = self.resolve(options);
        let max_attempts = resolved.retries.saturating_add(1);

        let mut last_outcome = AttemptOutcome::Timeout;
        let mut last_data = String::new();
        let mut busy = false;
        let mut attempt = 0u32;

        while attempt < max_attempts {
            attempt += 1;

            let outcome = self.attempt(command, &resolved).await;
            debug!(attempt, outcome = outcome.label(), "AT attempt finished");

            if let Some(body) = outcome.body() {
                last_data = body.to_string();
            }

            match outcome {
                AttemptOutcome::Ok(body) => return ExecutionResult::success(body, attempt),
                AttemptOutcome::SemanticError(body) => {
                    return ExecutionResult::failure(body, AtClientError::ModemError, false, attempt)
                }
                other => {
                    busy |= other.is_busy();
                    last_outcome = other;
                }
            }

            if attempt < max_attempts {
                let delay = backoff_delay(attempt);
                warn!(
                    "{} failed ({}), retrying in {:?}",
                    command,
                    last_outcome.label(),
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        let error = last_outcome.error().unwrap_or(AtClientError::Timeout);
        warn!("{} gave up after {} attempts: {}", command, attempt, error);
        ExecutionResult::failure(last_data, error, busy, attempt)
    }

    /// Execute, and after a failure re-run the input once if the modem
    /// still answers a health check
    #[instrument(skip_all)]
    pub async fn execute_with_recovery(
        &self,
        input: impl Into<CommandInput>,
        options: &ExecOptions,
    ) -> ExecutionResult {
        let input = input.into();
        let first = self.execute(input.clone(), options).await;
        if first.ok {
            return first;
        }

        tokio::time::sleep(RECOVERY_PAUSE).await;

        let check_options = ExecOptions {
            retries: Some(1),
            timeout_ms: Some(5000.0),
            endpoint: options.endpoint.clone(),
        };
        let check = self.execute(HEALTH_CHECK_COMMAND, &check_options).await;
        if !check.ok {
            warn!("Modem health check failed after command error: {:?}", check.error);
            return first;
        }

        debug!("Modem answered health check, retrying command");
        self.execute(input, options).await
    }

    /// One round trip bounded by the per-attempt timeout
    async fn attempt(&self, command: &str, options: &ResolvedOptions) -> AttemptOutcome {
        let request = self.transport.send(&options.endpoint, command);
        match tokio::time::timeout(options.timeout, request).await {
            Ok(result) => AttemptOutcome::from_transport(result),
            Err(_) => AttemptOutcome::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{ScriptedTransport, Step};
    use crate::transport::HttpReply;

    fn scripted_client(transport: &Arc<ScriptedTransport>) -> AtClient<Arc<ScriptedTransport>> {
        AtClient::with_transport(Arc::clone(transport))
    }

    #[test]
    fn test_client_creation() {
        assert!(AtClient::new("http://192.168.225.1").is_ok());
        assert!(AtClient::new("not a url").is_err());
    }

    #[test]
    fn test_backoff_delay() {
        let delays: Vec<u128> = (1..=5).map(|k| backoff_delay(k).as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 1500, 2000, 2000]);
        assert_eq!(backoff_delay(u32::MAX), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let transport = Arc::new(ScriptedTransport::replying("OK"));
        let client = scripted_client(&transport);

        for input in [CommandInput::from("   "), CommandInput::from(None::<&str>), CommandInput::from(" ;\r\n")] {
            let result = client.execute(input, &ExecOptions::new()).await;
            assert!(!result.ok);
            assert_eq!(result.attempts, 0);
            assert!(!result.busy);
            assert_eq!(result.error, Some(AtClientError::EmptyCommand));
        }

        let result = client.execute_single("", &ExecOptions::new()).await;
        assert_eq!(result.error, Some(AtClientError::EmptyCommand));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_single_success() {
        let transport = Arc::new(ScriptedTransport::replying("Quectel\r\nRM520N-GL\r\nOK\r\n"));
        let client = scripted_client(&transport);

        let result = client.execute("I", &ExecOptions::new()).await;
        assert!(result.ok);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.data, "Quectel\r\nRM520N-GL\r\nOK\r\n");
        assert_eq!(result.error, None);
        assert_eq!(transport.commands(), vec!["ATI"]);
        assert_eq!(transport.calls()[0].endpoint, "/cgi-bin/get_atcommand");
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_then_ok_is_not_sticky() {
        let transport = Arc::new(
            ScriptedTransport::replying("OK")
                .then(Step::reply("Modem busy"))
                .then(Step::reply("AT port in use")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute_single("AT+CSQ", &ExecOptions::new().retries(3))
            .await;
        assert!(result.ok);
        assert_eq!(result.attempts, 3);
        assert!(!result.busy);
        assert_eq!(result.data, "OK");
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_exhausts_retries() {
        let transport = Arc::new(ScriptedTransport::replying("channel locked"));
        let client = scripted_client(&transport);

        let result = client
            .execute_single("AT+CSQ", &ExecOptions::new().retries(1))
            .await;
        assert!(!result.ok);
        assert!(result.busy);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.error, Some(AtClientError::Busy));
        assert_eq!(result.data, "channel locked");
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_timing_out() {
        let transport = Arc::new(ScriptedTransport::new(Step::Hang));
        let client = scripted_client(&transport);
        let started = tokio::time::Instant::now();

        let result = client
            .execute_single("AT+COPS?", &ExecOptions::new().retries(2).timeout_ms(1000.0))
            .await;
        assert!(!result.ok);
        assert!(!result.busy);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.error, Some(AtClientError::Timeout));
        assert_eq!(result.data, "");
        // three timeouts plus the 500 ms and 1000 ms waits
        assert_eq!(started.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_follow_formula() {
        let transport = Arc::new(ScriptedTransport::replying("busy"));
        let client = scripted_client(&transport);

        let result = client
            .execute_single("ATI", &ExecOptions::new().retries(5))
            .await;
        assert_eq!(result.attempts, 6);

        let calls = transport.calls();
        let waits: Vec<u128> = calls
            .windows(2)
            .map(|pair| (pair[1].at - pair[0].at).as_millis())
            .collect();
        assert_eq!(waits, vec![500, 1000, 1500, 2000, 2000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_token_is_terminal() {
        let transport = Arc::new(ScriptedTransport::replying("+CME ERROR: 10"));
        let client = scripted_client(&transport);

        let result = client
            .execute_single("AT+CPIN?", &ExecOptions::new().retries(4))
            .await;
        assert!(!result.ok);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.error, Some(AtClientError::ModemError));
        assert_eq!(result.data, "+CME ERROR: 10");
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_and_transport_errors_are_retried() {
        let transport = Arc::new(
            ScriptedTransport::replying("")
                .then(Step::Reply(HttpReply::new(502, "")))
                .then(Step::fail("connection reset by peer")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute_single("ATI", &ExecOptions::new().retries(2))
            .await;
        assert!(!result.ok);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.error, Some(AtClientError::EmptyResponse));

        let transport = Arc::new(
            ScriptedTransport::new(Step::fail("connection refused"))
                .then(Step::Reply(HttpReply::new(500, ""))),
        );
        let result = scripted_client(&transport)
            .execute_single("ATI", &ExecOptions::new().retries(1))
            .await;
        assert_eq!(result.error, Some(AtClientError::Transport("connection refused".into())));
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_body_survives_later_http_error() {
        let transport = Arc::new(
            ScriptedTransport::new(Step::Reply(HttpReply::new(500, "")))
                .then(Step::reply("modem busy")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute_single("ATI", &ExecOptions::new().retries(1))
            .await;
        assert_eq!(result.error, Some(AtClientError::Http { status: 500 }));
        assert_eq!(result.data, "modem busy");
        assert!(result.busy);
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let transport = Arc::new(ScriptedTransport::replying(""));
        let client = scripted_client(&transport);

        let result = client
            .execute_single("ATI", &ExecOptions::new().retries(0))
            .await;
        assert_eq!(result.attempts, 1);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_all_succeed() {
        let transport = Arc::new(
            ScriptedTransport::replying("C\r\n")
                .then(Step::reply("  A  "))
                .then(Step::reply("B")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute("ATI;AT+CGMI\nAT+CGMM", &ExecOptions::new())
            .await;
        assert!(result.ok);
        assert_eq!(result.data, "A\nB\nC");
        assert_eq!(result.attempts, 3);
        assert_eq!(result.error, None);
        assert_eq!(transport.commands(), vec!["ATI", "AT+CGMI", "AT+CGMM"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_sums_attempts_across_members() {
        let transport = Arc::new(
            ScriptedTransport::replying("C")
                .then(Step::reply("A"))
                .then(Step::reply("busy"))
                .then(Step::reply("B")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute(vec!["ATI", "AT+CGMI", "AT+CGMM"], &ExecOptions::new())
            .await;
        assert!(result.ok);
        assert_eq!(result.data, "A\nB\nC");
        assert_eq!(result.attempts, 4);
        assert!(!result.busy);
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let transport = Arc::new(
            ScriptedTransport::replying("C")
                .then(Step::reply("A\r\nOK\r\n"))
                .then(Step::reply("ERROR")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute("ATI;AT+QNWLOCK=\"common/4g\";AT+CGMM", &ExecOptions::new())
            .await;
        assert!(!result.ok);
        assert_eq!(result.data, "A\r\nOK\nERROR");
        assert_eq!(result.error, Some(AtClientError::ModemError));
        assert_eq!(result.attempts, 2);
        // the third command is never sent
        assert_eq!(transport.commands(), vec!["ATI", "AT+QNWLOCK=\"common/4g\""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_failure_keeps_busy_flag() {
        let transport = Arc::new(ScriptedTransport::replying("busy").then(Step::reply("A")));
        let client = scripted_client(&transport);

        let result = client
            .execute("ATI;AT+CSQ", &ExecOptions::new().retries(1))
            .await;
        assert!(!result.ok);
        assert!(result.busy);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.data, "A\nbusy");
        assert_eq!(result.error, Some(AtClientError::Busy));
    }

    #[tokio::test]
    async fn test_endpoint_from_defaults_and_options() {
        let transport = Arc::new(ScriptedTransport::replying("OK"));
        let client = scripted_client(&transport).with_defaults(ExecOptions::new().endpoint("/cgi-bin/at"));

        client.execute("ATI", &ExecOptions::new()).await;
        client
            .execute("ATI", &ExecOptions::new().endpoint(" /cgi-bin/other "))
            .await;

        let endpoints: Vec<String> = transport.calls().into_iter().map(|c| c.endpoint).collect();
        assert_eq!(endpoints, vec!["/cgi-bin/at", "/cgi-bin/other"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_retries_after_successful_health_check() {
        let transport = Arc::new(
            ScriptedTransport::replying("OK")
                .then(Step::reply("ERROR"))
                .then(Step::reply("Quectel\r\nOK")),
        );
        let client = scripted_client(&transport);

        let result = client
            .execute_with_recovery("AT+QUIMSLOT=2", &ExecOptions::new())
            .await;
        assert!(result.ok);
        assert_eq!(
            transport.commands(),
            vec!["AT+QUIMSLOT=2", "ATI", "AT+QUIMSLOT=2"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_returns_first_failure_when_health_check_fails() {
        let transport = Arc::new(ScriptedTransport::replying("ERROR"));
        let client = scripted_client(&transport);

        let result = client
            .execute_with_recovery("AT+CFUN=1", &ExecOptions::new())
            .await;
        assert!(!result.ok);
        assert_eq!(result.attempts, 1);
        assert_eq!(transport.commands(), vec!["AT+CFUN=1", "ATI"]);
    }

    #[tokio::test]
    async fn test_recovery_skips_health_check_on_success() {
        let transport = Arc::new(ScriptedTransport::replying("OK"));
        let client = scripted_client(&transport);

        let result = client
            .execute_with_recovery("AT+CFUN=1", &ExecOptions::new())
            .await;
        assert!(result.ok);
        assert_eq!(transport.commands(), vec!["AT+CFUN=1"]);
    }
}

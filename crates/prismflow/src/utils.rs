use colored::Colorize;
use prismflow_api::{ApiClient, ClientConfig, Ndb, Prism, SelfService};
use prismflow_config::{EndpointSettings, Settings};
use prismflow_converge::{CancellationToken, PollOutcome};
use std::path::Path;
use tracing::debug;

/// Load the given config file, or discover one, then apply env overrides
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::discover()?,
    };
    settings.apply_env()?;

    if let Some(source) = &settings.source {
        debug!("Loaded settings from {}", source.display());
    }
    Ok(settings)
}

/// Settings plus a Ctrl-C cancellation token for one command run
pub fn session(path: Option<&Path>) -> anyhow::Result<(Settings, CancellationToken)> {
    let settings = load_settings(path)?;
    Ok((settings, cancel_on_ctrl_c()))
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "⚠ Interrupted, stop waiting...".yellow());
            child.cancel();
        }
    });
    token
}

fn client_config(section: Option<&EndpointSettings>, name: &str) -> anyhow::Result<ClientConfig> {
    let section = section
        .filter(|s| !s.endpoint.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} endpoint not configured", name))?;
    let username = section
        .username
        .clone()
        .ok_or_else(|| anyhow::anyhow!("{} username not configured", name))?;
    let password = section
        .password
        .clone()
        .ok_or_else(|| anyhow::anyhow!("{} password not configured", name))?;

    let mut config = ClientConfig::new(section.endpoint.clone(), username, password)
        .with_insecure(section.insecure);
    if let Some(port) = section.port {
        config = config.with_port(port);
    }
    if let Some(timeout) = section.request_timeout() {
        config = config.with_request_timeout(timeout);
    }
    Ok(config)
}

pub fn selfservice(settings: &Settings) -> anyhow::Result<SelfService> {
    let config = client_config(settings.selfservice.as_ref(), "selfservice")?;
    Ok(SelfService::new(ApiClient::new(config)?))
}

/// Prism tasks are served by the same endpoint as self-service
pub fn prism(settings: &Settings) -> anyhow::Result<Prism> {
    let config = client_config(settings.selfservice.as_ref(), "selfservice")?;
    Ok(Prism::new(ApiClient::new(config)?))
}

pub fn ndb(settings: &Settings) -> anyhow::Result<Ndb> {
    let config = client_config(settings.ndb.as_ref(), "ndb")?;
    Ok(Ndb::new(ApiClient::new(config)?))
}

/// Print the outcome; anything but success becomes an error
pub fn report_outcome<T>(outcome: PollOutcome<T>, what: &str) -> anyhow::Result<T> {
    match outcome {
        PollOutcome::Success(payload) => {
            println!("{}", format!("✓ {} succeeded", what).green().bold());
            Ok(payload)
        }
        PollOutcome::Failure(detail) => {
            eprintln!("{}", format!("✗ {} failed", what).red().bold());
            Err(anyhow::anyhow!("{}", detail))
        }
        PollOutcome::TimedOut(detail) => {
            eprintln!("{}", format!("✗ {} timed out", what).red().bold());
            if let Some(state) = &detail.last_state {
                eprintln!("  last state: {}", state.yellow());
            }
            Err(anyhow::anyhow!(
                "operation {} did not converge within {}s ({} queries)",
                detail.handle,
                detail.timeout.as_secs(),
                detail.attempts
            ))
        }
        PollOutcome::Aborted(detail) => {
            eprintln!("{}", format!("ℹ {} aborted", what).dimmed());
            Err(anyhow::anyhow!(
                "stopped waiting for operation {} after {} queries",
                detail.handle,
                detail.attempts
            ))
        }
    }
}

/// Parse a `NAME=VALUE` argument
pub fn parse_var(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prismflow_converge::{FailureDetail, OperationHandle, TimeoutDetail};
    use std::time::Duration;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("size=10=GB").unwrap(),
            ("size".to_string(), "10=GB".to_string())
        );
        assert_eq!(parse_var("empty=").unwrap().1, "");
        assert!(parse_var("noequals").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_client_config_requires_endpoint() {
        let err = client_config(None, "selfservice").unwrap_err();
        assert_eq!(err.to_string(), "selfservice endpoint not configured");

        let section = EndpointSettings {
            endpoint: "prism.example.com".to_string(),
            username: Some("admin".to_string()),
            ..Default::default()
        };
        let err = client_config(Some(&section), "selfservice").unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_client_config_from_section() {
        let section = EndpointSettings {
            endpoint: "prism.example.com".to_string(),
            port: Some(9441),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            insecure: true,
            request_timeout_secs: Some(5),
        };
        let config = client_config(Some(&section), "selfservice").unwrap();
        assert_eq!(config.base_url(), "https://prism.example.com:9441");
        assert!(config.insecure);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_report_outcome_classes() {
        assert_eq!(report_outcome(PollOutcome::Success(7), "task").unwrap(), 7);

        let failure: PollOutcome<()> =
            PollOutcome::Failure(FailureDetail::vanished(OperationHandle::new("t-1"), "prism-task"));
        let err = report_outcome(failure, "task").unwrap_err();
        assert!(err.to_string().contains("invalid handle"));

        let timed_out: PollOutcome<()> = PollOutcome::TimedOut(TimeoutDetail {
            handle: OperationHandle::new("t-2"),
            timeout: Duration::from_secs(30),
            elapsed: Duration::from_secs(31),
            attempts: 4,
            last_state: Some("RUNNING".to_string()),
        });
        let err = report_outcome(timed_out, "task").unwrap_err();
        assert!(err.to_string().contains("within 30s"));
    }
}

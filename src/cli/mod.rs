use clap::{Parser, Subcommand};

use crate::config::ReimburseConfig;

#[derive(Parser, Debug)]
#[command(name = "slash-reimburse")]
#[command(about = "Compute slashing reimbursements for operator owners and delegators", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "reimburse.toml")]
    pub config: String,
    /// Block index subgraph URL (overrides the config file)
    #[arg(long, global = true)]
    pub block_index_url: Option<String>,
    /// Staking registry subgraph URL (overrides the config file)
    #[arg(long, global = true)]
    pub staking_registry_url: Option<String>,
    /// Conservation tolerance in wei (overrides the config file)
    #[arg(long, global = true)]
    pub tolerance: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reimburse every slashing event in a time window
    Run {
        /// Window start, Unix seconds or RFC 3339
        #[arg(long, value_parser = parse_time)]
        start: u64,
        /// Window end (inclusive), Unix seconds or RFC 3339
        #[arg(long, value_parser = parse_time)]
        end: u64,
        /// Skip events slashing less than this many wei
        #[arg(long)]
        min_amount: Option<String>,
    },
    /// Reimburse a single slashing event
    Event {
        #[arg(long)]
        operator: String,
        /// Event time, Unix seconds or RFC 3339
        #[arg(long, value_parser = parse_time)]
        date: u64,
        /// Slashed amount in wei
        #[arg(long)]
        amount: String,
    },
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut ReimburseConfig) {
        if let Some(url) = &self.block_index_url {
            config.sources.block_index_url = url.clone();
        }
        if let Some(url) = &self.staking_registry_url {
            config.sources.staking_registry_url = url.clone();
        }
        if let Some(tolerance) = &self.tolerance {
            config.allocation.tolerance_wei = tolerance.clone();
        }
        if let Commands::Run {
            min_amount: Some(min),
            ..
        } = &self.command
        {
            config.allocation.min_amount_wei = min.clone();
        }
    }
}

/// Accepts Unix seconds or an RFC 3339 timestamp.
pub fn parse_time(s: &str) -> Result<u64, String> {
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    let dt = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| format!("expected Unix seconds or RFC 3339, got {:?}: {}", s, e))?;
    u64::try_from(dt.timestamp()).map_err(|_| format!("{} is before the Unix epoch", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("2023-11-14T22:13:20Z").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("2023-11-15T00:13:20+02:00").unwrap(), 1_700_000_000);
        assert!(parse_time("1969-12-31T23:59:59Z").is_err());
        assert!(parse_time("last tuesday").is_err());
    }

    #[test]
    fn test_run_command_overrides_config() {
        let cli = Cli::try_parse_from([
            "slash-reimburse",
            "--tolerance",
            "42",
            "run",
            "--start",
            "1700000000",
            "--end",
            "2023-12-01T00:00:00Z",
            "--min-amount",
            "1000",
            "--staking-registry-url",
            "http://registry",
        ])
        .unwrap();

        let mut config = ReimburseConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.allocation.tolerance_wei, "42");
        assert_eq!(config.allocation.min_amount_wei, "1000");
        assert_eq!(config.sources.staking_registry_url, "http://registry");
        match cli.command {
            Commands::Run { start, end, .. } => {
                assert_eq!(start, 1_700_000_000);
                assert_eq!(end, 1_701_388_800);
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_event_command() {
        let cli = Cli::try_parse_from([
            "slash-reimburse",
            "event",
            "--operator",
            "0xOp",
            "--date",
            "1700000000",
            "--amount",
            "32000000000000000000",
        ])
        .unwrap();
        assert_eq!(cli.config, "reimburse.toml");
        assert!(matches!(cli.command, Commands::Event { date: 1_700_000_000, .. }));
    }
}

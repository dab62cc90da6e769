use std::env;

use anyhow::{Context, Result, bail};
use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub clinic: ClinicConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct ClinicConfig {
    /// The clinic's local UTC offset, e.g. "+05:30". All day-bucket
    /// queries and booking conversions run in this offset.
    pub utc_offset: FixedOffset,
}

pub fn load() -> Result<Config> {
    let database = DatabaseConfig {
        url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
    };
    let server = ServerConfig {
        bind_addr: env::var("BIND_ADDR").unwrap_or("0.0.0.0:3000".to_string()),
    };
    let auth = AuthConfig {
        token_secret: env::var("AUTH_TOKEN_SECRET").context("AUTH_TOKEN_SECRET must be set")?,
        token_ttl_hours: env::var("AUTH_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24),
    };
    let offset_raw = env::var("CLINIC_UTC_OFFSET").unwrap_or("+05:30".to_string());
    let clinic = ClinicConfig {
        utc_offset: parse_utc_offset(&offset_raw)
            .with_context(|| format!("Invalid CLINIC_UTC_OFFSET '{offset_raw}'"))?,
    };

    Ok(Config {
        database,
        server,
        auth,
        clinic,
    })
}

/// Parses offsets of the form "+05:30" / "-08:00".
fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("expected a sign followed by HH:MM"),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .context("expected a sign followed by HH:MM")?;
    let hours: i32 = hours.parse().context("invalid hours")?;
    let minutes: i32 = minutes.parse().context("invalid minutes")?;
    if !(0..=14).contains(&hours) || !(0..=59).contains(&minutes) {
        bail!("offset out of range");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).context("offset out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("+05:30", 5 * 3600 + 30 * 60; "india")]
    #[test_case("-08:00", -8 * 3600; "pacific")]
    #[test_case("+00:00", 0; "utc")]
    fn parses_valid_offsets(raw: &str, seconds: i32) {
        assert_eq!(
            parse_utc_offset(raw).unwrap(),
            FixedOffset::east_opt(seconds).unwrap()
        );
    }

    #[test_case("05:30"; "missing sign")]
    #[test_case("+0530"; "missing colon")]
    #[test_case("+99:00"; "hours out of range")]
    #[test_case(""; "empty")]
    fn rejects_invalid_offsets(raw: &str) {
        assert!(parse_utc_offset(raw).is_err());
    }
}

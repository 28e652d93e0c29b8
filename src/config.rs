use std::{collections::HashSet, env, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::{common::privilege::PrivilegeLevel, error::ConfigError, pug::player::PlayerId};

/// Seconds players get to volunteer as captain before captains are assigned at random.
pub const DEFAULT_CAPTAIN_WAIT_SECS: u64 = 30;
/// Seconds between a pickup game ending and sign-ups reopening.
pub const DEFAULT_RESET_DELAY_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct PickupConfig {
    pub teamsize: usize,
    pub captain_wait: Duration,
    pub reset_delay: Duration,
    /// No-shows tolerated before a ban is issued
    pub max_no_shows: u32,
    pub no_show_ban: Duration,
    /// Substitutions tolerated before a ban is issued
    pub max_subs: u32,
    pub sub_ban: Duration,
    /// Accounts at or above this level are never punished
    pub exempt_level: PrivilegeLevel,
    /// Level required for `start`, `stop`, `reset` and `unban`
    pub manage_level: PrivilegeLevel,
    /// Names always treated as [`PrivilegeLevel::Owner`]
    pub owners: HashSet<PlayerId>,
}

impl Default for PickupConfig {
    fn default() -> Self {
        PickupConfig {
            teamsize: 4,
            captain_wait: Duration::from_secs(DEFAULT_CAPTAIN_WAIT_SECS),
            reset_delay: Duration::from_secs(DEFAULT_RESET_DELAY_SECS),
            max_no_shows: 3,
            no_show_ban: Duration::from_secs(24 * 3600),
            max_subs: 5,
            sub_ban: Duration::from_secs(3 * 3600),
            exempt_level: PrivilegeLevel::SuperUser,
            manage_level: PrivilegeLevel::SuperUser,
            owners: HashSet::default(),
        }
    }
}

impl PickupConfig {
    /// Reads the pickup settings from the environment, falling back to defaults
    /// for anything not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PickupConfig::default();

        let teamsize = parse_or(&lookup, "PICKUP_TEAMSIZE", defaults.teamsize, "a number")?;
        if teamsize == 0 {
            return Err(ConfigError::Invalid {
                name: "PICKUP_TEAMSIZE",
                value: "0".to_string(),
                expected: "at least 1",
            });
        }

        let owners: HashSet<PlayerId> = match lookup("PICKUP_OWNERS") {
            Some(owners) => owners
                .split_terminator(',')
                .filter(|name| !name.trim().is_empty())
                .map(PlayerId::new)
                .collect(),
            None => {
                warn!(
                    "PICKUP_OWNERS was not found in the environment, \
                    so privileges come from the user store alone"
                );
                HashSet::default()
            }
        };

        let config = PickupConfig {
            teamsize,
            captain_wait: seconds(parse_or(
                &lookup,
                "PICKUP_CAPTAIN_WAIT_SECS",
                DEFAULT_CAPTAIN_WAIT_SECS,
                "a number of seconds",
            )?),
            reset_delay: seconds(parse_or(
                &lookup,
                "PICKUP_RESET_DELAY_SECS",
                DEFAULT_RESET_DELAY_SECS,
                "a number of seconds",
            )?),
            max_no_shows: parse_or(&lookup, "PICKUP_MAX_NO_SHOWS", defaults.max_no_shows, "a number")?,
            no_show_ban: hours(
                "PICKUP_NO_SHOW_BAN_HOURS",
                parse_or(&lookup, "PICKUP_NO_SHOW_BAN_HOURS", 24, "a number of hours")?,
            )?,
            max_subs: parse_or(&lookup, "PICKUP_MAX_SUBS", defaults.max_subs, "a number")?,
            sub_ban: hours(
                "PICKUP_SUB_BAN_HOURS",
                parse_or(&lookup, "PICKUP_SUB_BAN_HOURS", 3, "a number of hours")?,
            )?,
            exempt_level: parse_level(&lookup, "PICKUP_EXEMPT_LEVEL", defaults.exempt_level)?,
            manage_level: parse_level(&lookup, "PICKUP_MANAGE_LEVEL", defaults.manage_level)?,
            owners,
        };
        info!("Pickup settings: {:?}", config);
        Ok(config)
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// A century, so that ban expiry dates stay representable.
const MAX_BAN_HOURS: u64 = 100 * 365 * 24;

fn hours(name: &'static str, hours: u64) -> Result<Duration, ConfigError> {
    hours
        .checked_mul(3600)
        .filter(|_| hours <= MAX_BAN_HOURS)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: hours.to_string(),
            expected: "a number of hours no larger than 876000",
        })
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            expected,
        }),
        None => Ok(default),
    }
}

fn parse_level<F>(
    lookup: &F,
    name: &'static str,
    default: PrivilegeLevel,
) -> Result<PrivilegeLevel, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(
        lookup,
        name,
        default,
        "one of none, user, superuser, admin, owner",
    )
}

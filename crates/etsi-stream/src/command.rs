//! ETSI Stream Command Grammar
//!
//! Parser for client command frames. Verbs are case-insensitive, payloads
//! keep their case and runs of whitespace collapse. Malformed `data`
//! parameters fall back to their defaults and are reported as warnings.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::ProtocolError;
use chrono::{DateTime, NaiveDateTime};
use std::time::Duration;

pub const MAX_INTERVAL_SECS: f64 = 3600.0;
pub const MAX_LIMIT: u32 = 1_000_000;
pub const MAX_LOOP: u32 = 1_000_000;

/// Grammar sent as the first frame of every connection.
pub const GRAMMAR: &str = "commands: login <name> | groups | group.device <group> \
| timeseries <group.device> | count <group.device> \
| data <group.device> [interval <seconds>] [format csv|json] [limit <n>] \
[startdate yyyy-MM-ddThh:mm:ssZ] [enddate yyyy-MM-ddThh:mm:ssZ] [loop <n>] \
| logout | stop";

// =============================================================================
// Commands
// =============================================================================

/// A parsed client command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login(String),
    Groups,
    GroupDevice(String),
    Timeseries(Target),
    Count(Target),
    Data(Target, DataParams),
    Logout,
    Stop,
}

impl Command {
    /// Lower-case verb, used as the prefix of diagnostic frames.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Groups => "groups",
            Self::GroupDevice(_) => "group.device",
            Self::Timeseries(_) => "timeseries",
            Self::Count(_) => "count",
            Self::Data(..) => "data",
            Self::Logout => "logout",
            Self::Stop => "stop",
        }
    }

    /// Returns true for verbs that run a TSDB query and stream a result.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::Groups
                | Self::GroupDevice(_)
                | Self::Timeseries(_)
                | Self::Count(_)
                | Self::Data(..)
        )
    }
}

/// A `<group>.<device>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub group: String,
    pub device: String,
}

impl Target {
    fn parse(verb: &'static str, raw: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidTarget {
            verb,
            target: raw.to_string(),
        };
        let (group, device) = raw.split_once('.').ok_or_else(invalid)?;
        if !is_node(group) || !is_node(device) {
            return Err(invalid());
        }
        Ok(Self {
            group: group.to_string(),
            device: device.to_string(),
        })
    }

    /// `<group>.<device>` path suffix.
    pub fn path(&self) -> String {
        format!("{}.{}", self.group, self.device)
    }
}

/// Output encoding of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Csv,
    Json,
}

/// Parameters of a `data` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataParams {
    pub interval: Duration,
    pub format: Format,
    /// Row limit; `None` when absent or zero.
    pub limit: Option<u32>,
    /// Inclusive lower bound, epoch seconds.
    pub start: Option<i64>,
    /// Inclusive upper bound, epoch seconds.
    pub end: Option<i64>,
    /// Number of extra passes over the rows.
    pub loop_count: u32,
}

impl DataParams {
    /// Parse `key value` pairs. Bad values keep their default; every
    /// dropped token is returned as a warning.
    pub fn parse(tokens: &[&str]) -> (Self, Vec<ProtocolError>) {
        let mut params = Self::default();
        let mut warnings = Vec::new();
        let mut iter = tokens.iter();

        while let Some(key) = iter.next() {
            let lower = key.to_ascii_lowercase();
            let name: &'static str = match lower.as_str() {
                "interval" => "interval",
                "format" => "format",
                "limit" => "limit",
                "startdate" => "startdate",
                "enddate" => "enddate",
                "loop" => "loop",
                _ => {
                    warnings.push(ProtocolError::UnknownParameter(key.to_string()));
                    continue;
                }
            };
            let Some(value) = iter.next() else {
                warnings.push(ProtocolError::MissingValue(name.to_string()));
                break;
            };

            if let Err(reason) = params.apply(name, value) {
                warnings.push(ProtocolError::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason,
                });
            }
        }

        (params, warnings)
    }

    fn apply(&mut self, name: &'static str, value: &str) -> Result<(), &'static str> {
        match name {
            "interval" => {
                let secs: f64 = value.parse().map_err(|_| "not a number")?;
                if !(0.0..=MAX_INTERVAL_SECS).contains(&secs) {
                    return Err("out of range");
                }
                self.interval = Duration::from_secs_f64(secs);
            }
            "format" => {
                self.format = match value.to_ascii_lowercase().as_str() {
                    "csv" => Format::Csv,
                    "json" => Format::Json,
                    _ => return Err("unsupported format"),
                };
            }
            "limit" => {
                let limit = parse_bounded(value, MAX_LIMIT)?;
                self.limit = (limit > 0).then_some(limit);
            }
            "loop" => self.loop_count = parse_bounded(value, MAX_LOOP)?,
            "startdate" => self.start = Some(parse_date(value).ok_or("not yyyy-MM-ddThh:mm:ssZ")?),
            "enddate" => self.end = Some(parse_date(value).ok_or("not yyyy-MM-ddThh:mm:ssZ")?),
            _ => return Err("unknown parameter"),
        }
        Ok(())
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse one command frame. Parameter warnings of a `data` command are
/// returned alongside the command.
pub fn parse_command(frame: &str) -> Result<(Command, Vec<ProtocolError>), ProtocolError> {
    let tokens: Vec<&str> = frame.split_whitespace().collect();
    let (verb, args) = tokens.split_first().ok_or(ProtocolError::Empty)?;
    let mut warnings = Vec::new();

    let command = match verb.to_ascii_lowercase().as_str() {
        "login" => Command::Login(single(args, "login", &mut warnings)?.to_string()),
        "groups" => {
            no_args(args, "groups", &mut warnings);
            Command::Groups
        }
        "group.device" => {
            let group = single(args, "group.device", &mut warnings)?;
            if !is_node(group) {
                return Err(ProtocolError::InvalidTarget {
                    verb: "group.device",
                    target: group.to_string(),
                });
            }
            Command::GroupDevice(group.to_string())
        }
        "timeseries" => Command::Timeseries(Target::parse(
            "timeseries",
            single(args, "timeseries", &mut warnings)?,
        )?),
        "count" => Command::Count(Target::parse("count", single(args, "count", &mut warnings)?)?),
        "data" => {
            let (target, rest) = args
                .split_first()
                .ok_or(ProtocolError::MissingArgument("data"))?;
            let target = Target::parse("data", target)?;
            let (params, param_warnings) = DataParams::parse(rest);
            warnings.extend(param_warnings);
            Command::Data(target, params)
        }
        "logout" => {
            no_args(args, "logout", &mut warnings);
            Command::Logout
        }
        "stop" => {
            no_args(args, "stop", &mut warnings);
            Command::Stop
        }
        _ => return Err(ProtocolError::UnknownVerb(verb.to_string())),
    };

    Ok((command, warnings))
}

fn single<'a>(
    args: &[&'a str],
    verb: &'static str,
    warnings: &mut Vec<ProtocolError>,
) -> Result<&'a str, ProtocolError> {
    let (first, rest) = args
        .split_first()
        .ok_or(ProtocolError::MissingArgument(verb))?;
    no_args(rest, verb, warnings);
    Ok(first)
}

fn no_args(args: &[&str], verb: &'static str, warnings: &mut Vec<ProtocolError>) {
    warnings.extend(args.iter().map(|token| ProtocolError::UnexpectedToken {
        verb,
        token: token.to_string(),
    }));
}

fn parse_bounded(value: &str, max: u32) -> Result<u32, &'static str> {
    let parsed: u64 = value.parse().map_err(|_| "not a non-negative integer")?;
    if parsed > u64::from(max) {
        return Err("out of range");
    }
    Ok(parsed as u32)
}

/// Parse a `yyyy-MM-ddThh:mm:ssZ` timestamp into epoch seconds.
pub fn parse_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc().timestamp())
        })
}

/// A single path node: letters, digits and underscores, or a back-quoted
/// node produced for numeric device keys.
fn is_node(node: &str) -> bool {
    let inner = node
        .strip_prefix('`')
        .and_then(|n| n.strip_suffix('`'))
        .unwrap_or(node);
    !inner.is_empty() && inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(frame: &str) -> Command {
        parse_command(frame).unwrap().0
    }

    #[test]
    fn test_simple_verbs() {
        assert_eq!(parse("login alice"), Command::Login("alice".to_string()));
        assert_eq!(parse("  GROUPS "), Command::Groups);
        assert_eq!(parse("Group.Device synthetic"), Command::GroupDevice("synthetic".to_string()));
        assert_eq!(parse("logout"), Command::Logout);
        assert_eq!(parse("STOP"), Command::Stop);
    }

    #[test]
    fn test_payload_keeps_case() {
        let Command::Timeseries(target) = parse("timeseries synthetic.IoT_Weather") else {
            panic!("expected timeseries");
        };
        assert_eq!(target.group, "synthetic");
        assert_eq!(target.device, "IoT_Weather");
        assert_eq!(target.path(), "synthetic.IoT_Weather");
    }

    #[test]
    fn test_data_parameters() {
        let (command, warnings) =
            parse_command("data synthetic.IoT_Weather interval 0.5 format csv limit 100").unwrap();
        assert!(warnings.is_empty());
        let Command::Data(_, params) = command else {
            panic!("expected data");
        };
        assert_eq!(params.interval, Duration::from_millis(500));
        assert_eq!(params.format, Format::Csv);
        assert_eq!(params.limit, Some(100));
        assert_eq!(params.loop_count, 0);
    }

    #[test]
    fn test_data_dates_and_loop() {
        let Command::Data(_, params) = parse(
            "data g.d startdate 2023-11-14T22:13:20Z enddate 2023-11-15T00:00:00Z loop 3 format JSON",
        ) else {
            panic!("expected data");
        };
        assert_eq!(params.start, Some(1_700_000_000));
        assert_eq!(params.end, Some(1_700_006_400));
        assert_eq!(params.loop_count, 3);
        assert_eq!(params.format, Format::Json);
    }

    #[test]
    fn test_bad_parameters_fall_back() {
        let (command, warnings) = parse_command(
            "data g.d interval 9999 limit -1 loop many format xml startdate yesterday bogus",
        )
        .unwrap();
        assert_eq!(command, Command::Data(
            Target { group: "g".into(), device: "d".into() },
            DataParams::default(),
        ));
        assert_eq!(warnings.len(), 6);
        assert!(matches!(
            warnings[0],
            ProtocolError::InvalidParameter { name: "interval", .. }
        ));
        assert!(matches!(warnings[5], ProtocolError::UnknownParameter(_)));
    }

    #[test]
    fn test_limit_zero_means_unlimited() {
        let (params, warnings) = DataParams::parse(&["limit", "0"]);
        assert!(warnings.is_empty());
        assert_eq!(params.limit, None);
    }

    #[test]
    fn test_missing_value() {
        let (params, warnings) = DataParams::parse(&["interval"]);
        assert_eq!(params, DataParams::default());
        assert_eq!(warnings, vec![ProtocolError::MissingValue("interval".into())]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_command("   ").unwrap_err(), ProtocolError::Empty);
        assert!(parse_command("select * from x").unwrap_err().is_silent());
        assert_eq!(
            parse_command("login").unwrap_err(),
            ProtocolError::MissingArgument("login")
        );
        assert!(matches!(
            parse_command("count nodot").unwrap_err(),
            ProtocolError::InvalidTarget { verb: "count", .. }
        ));
        assert!(matches!(
            parse_command("data g.d;drop").unwrap_err(),
            ProtocolError::InvalidTarget { .. }
        ));
    }

    #[test]
    fn test_extra_tokens_are_dropped() {
        let (command, warnings) = parse_command("groups now please").unwrap();
        assert_eq!(command, Command::Groups);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_quoted_device_target() {
        let Command::Count(target) = parse("count meters.`101`") else {
            panic!("expected count");
        };
        assert_eq!(target.device, "`101`");
    }
}

//! ETSI Stream Query Compiler
//!
//! Turns query commands into TSDB SQL under the configured identifier
//! root.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::command::{Command, DataParams, Target};

/// SQL for a query command; `None` for session verbs.
pub fn compile(command: &Command, root: &str) -> Option<String> {
    match command {
        Command::Groups => Some(groups(root)),
        Command::GroupDevice(group) => Some(devices(root, group)),
        Command::Timeseries(target) => Some(timeseries(root, target)),
        Command::Count(target) => Some(count(root, target)),
        Command::Data(target, params) => Some(data(root, target, params)),
        Command::Login(_) | Command::Logout | Command::Stop => None,
    }
}

pub fn groups(root: &str) -> String {
    format!("SHOW TIMESERIES {}.**", root)
}

pub fn devices(root: &str, group: &str) -> String {
    format!("SHOW TIMESERIES {}.{}.**", root, group)
}

pub fn timeseries(root: &str, target: &Target) -> String {
    format!("SHOW TIMESERIES {}.{}.*", root, target.path())
}

pub fn count(root: &str, target: &Target) -> String {
    format!("SELECT COUNT(*) FROM {}.{}", root, target.path())
}

/// `SELECT * FROM <path>[ WHERE …] ORDER BY Time ASC [ LIMIT n] ;`
pub fn data(root: &str, target: &Target, params: &DataParams) -> String {
    let mut bounds = Vec::new();
    if let Some(start) = params.start {
        bounds.push(format!("Time >= {}", start));
    }
    if let Some(end) = params.end {
        bounds.push(format!("Time <= {}", end));
    }
    let filter = if bounds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", bounds.join(" AND "))
    };
    let limit = params
        .limit
        .map(|n| format!(" LIMIT {}", n))
        .unwrap_or_default();

    format!(
        "SELECT * FROM {}.{}{} ORDER BY Time ASC {} ;",
        root,
        target.path(),
        filter,
        limit
    )
}

// =============================================================================
// Tests
// =============================================================================

//! ETSI Schema Sidecar Parser
//!
//! Parser for the `ncdump`-style CDL text that accompanies NetCDF derived
//! datasets. Only the parts the synthesizer consumes are modelled:
//! dimensions, variable declarations with their attributes, global
//! attributes and the `data:` block.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{Result, SchemaError};
use std::path::Path;

// =============================================================================
// Sidecar Types
// =============================================================================

/// A declared variable and its attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidecarVariable {
    pub name: String,
    pub type_name: String,
    pub dimensions: Vec<String>,
    /// Position of the declaration within the `variables:` section.
    pub index: usize,
    pub attributes: Vec<(String, String)>,
}

impl SidecarVariable {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn units(&self) -> Option<&str> {
        self.attribute("units").filter(|u| !u.trim().is_empty())
    }
}

/// A parsed CDL sidecar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidecar {
    pub dimensions: Vec<(String, usize)>,
    pub variables: Vec<SidecarVariable>,
    pub globals: Vec<(String, String)>,
    pub data: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Dimensions,
    Variables,
    Data,
}

impl Sidecar {
    /// Read a sidecar from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse CDL text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut sidecar = Sidecar::default();
        let mut section = Section::Preamble;
        let mut pending: Option<(usize, String)> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();

            if section == Section::Data {
                if let Some((start, mut buffer)) = pending.take() {
                    buffer.push(' ');
                    buffer.push_str(line);
                    if line.ends_with(';') {
                        sidecar.push_data(start, &buffer)?;
                    } else {
                        pending = Some((start, buffer));
                    }
                    continue;
                }
            }

            match line {
                "" | "}" => continue,
                "dimensions:" => {
                    section = Section::Dimensions;
                    continue;
                }
                "variables:" => {
                    section = Section::Variables;
                    continue;
                }
                "data:" => {
                    section = Section::Data;
                    continue;
                }
                _ => {}
            }
            if line.starts_with("netcdf ") || line.starts_with("// global attributes") {
                continue;
            }

            match section {
                Section::Preamble => {}
                Section::Dimensions => sidecar.push_dimension(line_no, line)?,
                Section::Variables => sidecar.push_variable_line(line_no, line)?,
                Section::Data => {
                    if line.ends_with(';') {
                        sidecar.push_data(line_no, line)?;
                    } else {
                        pending = Some((line_no, line.to_string()));
                    }
                }
            }
        }

        if let Some((line, _)) = pending {
            return Err(sidecar_error(line, "unterminated data entry"));
        }

        Ok(sidecar)
    }

    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|(dim, _)| dim == name)
            .map(|(_, size)| *size)
    }

    pub fn variable(&self, name: &str) -> Option<&SidecarVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn data(&self, name: &str) -> Option<&[String]> {
        self.data
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Device keys listed for the `id` dimension, in order.
    pub fn device_ids(&self) -> Vec<String> {
        self.data("id").map(|ids| ids.to_vec()).unwrap_or_default()
    }

    // `time = UNLIMITED ; // (4 currently)` or `id = 3 ;`
    fn push_dimension(&mut self, line_no: usize, line: &str) -> Result<()> {
        let (name, rest) = line
            .split_once('=')
            .ok_or_else(|| sidecar_error(line_no, "expected '<dimension> = <size> ;'"))?;
        let (value, comment) = match rest.split_once("//") {
            Some((value, comment)) => (value, Some(comment)),
            None => (rest, None),
        };
        let value = value.trim().trim_end_matches(';').trim();

        let size = if value.eq_ignore_ascii_case("UNLIMITED") {
            comment
                .and_then(currently)
                .ok_or_else(|| sidecar_error(line_no, "UNLIMITED dimension without current size"))?
        } else {
            value
                .parse::<usize>()
                .map_err(|_| sidecar_error(line_no, &format!("invalid dimension size '{}'", value)))?
        };

        self.dimensions.push((name.trim().to_string(), size));
        Ok(())
    }

    fn push_variable_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let body = line.trim_end_matches(';').trim();

        // Global attribute: `:title = "..." ;`
        if let Some(global) = body.strip_prefix(':') {
            let (key, value) = split_attribute(line_no, global)?;
            self.globals.push((key, value));
            return Ok(());
        }

        // Variable attribute: `Temperature:units = "degC" ;`
        if let Some((target, attr)) = body.split_once(':') {
            if !target.contains(' ') && !target.contains('(') {
                let (key, value) = split_attribute(line_no, attr)?;
                let variable = self
                    .variables
                    .iter_mut()
                    .rev()
                    .find(|v| v.name == target)
                    .ok_or_else(|| {
                        sidecar_error(line_no, &format!("attribute for undeclared variable '{}'", target))
                    })?;
                variable.attributes.push((key, value));
                return Ok(());
            }
        }

        // Declaration: `float Temperature(id, time) ;`
        let (type_name, rest) = body
            .split_once(char::is_whitespace)
            .ok_or_else(|| sidecar_error(line_no, "expected variable declaration"))?;
        let rest = rest.trim();
        let (name, dimensions) = match rest.split_once('(') {
            Some((name, dims)) => (
                name.trim(),
                dims.trim_end_matches(')')
                    .split(',')
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect(),
            ),
            None => (rest, Vec::new()),
        };

        let index = self.variables.len();
        self.variables.push(SidecarVariable {
            name: name.to_string(),
            type_name: type_name.to_string(),
            dimensions,
            index,
            attributes: Vec::new(),
        });
        Ok(())
    }

    fn push_data(&mut self, line_no: usize, entry: &str) -> Result<()> {
        let entry = entry.trim().trim_end_matches(';');
        let (name, values) = entry
            .split_once('=')
            .ok_or_else(|| sidecar_error(line_no, "expected '<name> = <values> ;'"))?;
        let values = split_values(values).into_iter().map(clean_value).collect();
        self.data.push((name.trim().to_string(), values));
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn sidecar_error(line: usize, message: &str) -> SchemaError {
    SchemaError::Sidecar {
        line,
        message: message.to_string(),
    }
}

/// Extract `N` from `(N currently)`.
fn currently(comment: &str) -> Option<usize> {
    let inner = comment.trim().trim_start_matches('(');
    inner.split_whitespace().next()?.parse().ok()
}

fn split_attribute(line_no: usize, text: &str) -> Result<(String, String)> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| sidecar_error(line_no, "expected '<attribute> = <value>'"))?;
    Ok((key.trim().to_string(), clean_value(value.trim())))
}

/// Split a comma separated value list, keeping commas inside quotes.
fn split_values(text: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => values.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        values.push(current);
    }
    values
}

/// Strip quotes and CDL numeric type suffixes (`-999.f`, `10s`, `3L`).
fn clean_value(value: impl AsRef<str>) -> String {
    let value = value.as_ref().trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return value[1..value.len() - 1].to_string();
    }

    let numeric_start = value
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false);
    if numeric_start {
        let stripped = value
            .trim_end_matches(|c: char| matches!(c, 'f' | 'F' | 'd' | 'D' | 's' | 'S' | 'b' | 'B' | 'l' | 'L' | 'u' | 'U'))
            .trim_end_matches('.');
        if !stripped.is_empty() && stripped.parse::<f64>().is_ok() {
            return stripped.to_string();
        }
    }
    value.to_string()
}

// =============================================================================
// Tests
// =============================================================================

//! Output formatting for simpleadmin-cli (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let table = Table::new(data).to_string();
                    println!("{}", table);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => {
                print!("{}", render_csv(data));
            }
        }
    }

    /// Print key-value pairs (for info and settings)
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
                for (key, value) in pairs {
                    println!("{:width$}  {}", key.bold(), value, width = width);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => {
                let keys: Vec<String> = pairs.iter().map(|(k, _)| escape_csv(k)).collect();
                println!("{}", keys.join(","));
                let values: Vec<String> = pairs.iter().map(|(_, v)| escape_csv(v)).collect();
                println!("{}", values.join(","));
            }
        }
    }
}

/// Render rows as CSV, header first
fn render_csv<T: Serialize>(data: &[T]) -> String {
    let Some(first) = data.first() else {
        return String::new();
    };

    let mut out = String::new();
    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(first) {
        let headers: Vec<String> = map.keys().cloned().collect();
        out.push_str(&headers.join(","));
        out.push('\n');

        for item in data {
            if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
                let values: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        row.get(h)
                            .map(|v| match v {
                                serde_json::Value::String(s) => escape_csv(s),
                                other => escape_csv(&other.to_string()),
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                out.push_str(&values.join(","));
                out.push('\n');
            }
        }
    }
    out
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Placeholder for values the modem did not report
pub fn or_dash(value: Option<impl ToString>) -> String {
    value
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// One response line for the exec command
#[derive(Debug, Tabled, Serialize)]
pub struct LineRow {
    #[tabled(rename = "#")]
    pub line: usize,
    #[tabled(rename = "Response")]
    pub text: String,
}

/// APN context for the apn command
#[derive(Debug, Tabled, Serialize)]
pub struct ApnRow {
    #[tabled(rename = "CID")]
    pub cid: u32,
    #[tabled(rename = "PDP Type")]
    pub pdp_type: String,
    #[tabled(rename = "APN")]
    pub apn: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("+CGDCONT: 1,\"IP\""), "\"+CGDCONT: 1,\"\"IP\"\"\"");
    }

    #[test]
    fn test_render_csv() {
        let rows = vec![
            ApnRow {
                cid: 1,
                pdp_type: "IPV4V6".into(),
                apn: "fast.t-mobile.com".into(),
            },
            ApnRow {
                cid: 2,
                pdp_type: "IP".into(),
                apn: "ims".into(),
            },
        ];
        let csv = render_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);

        // Values follow the header's column order
        let headers: Vec<&str> = lines[0].split(',').collect();
        let apn_col = headers.iter().position(|h| *h == "apn").unwrap();
        let cid_col = headers.iter().position(|h| *h == "cid").unwrap();
        assert_eq!(lines[1].split(',').nth(apn_col), Some("fast.t-mobile.com"));
        assert_eq!(lines[2].split(',').nth(cid_col), Some("2"));
        assert_eq!(render_csv::<ApnRow>(&[]), "");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(Some("x")), "x");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(None::<u32>), "-");
        assert_eq!(or_dash(Some(2u32)), "2");
    }
}

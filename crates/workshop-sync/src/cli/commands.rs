//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::{Collection, Equipment};
use crate::remote::ExportScope;

/// Capture command arguments.
#[derive(Debug, Args)]
pub struct CaptureCommand {
    /// Collection to file the record under (e.g. eng_supply, gen_inspect)
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Form field as key=value (repeatable)
    #[arg(short, long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

/// Pending command arguments.
#[derive(Debug, Args)]
pub struct PendingCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Engine serial number or generator code
    pub key: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Recent command arguments.
#[derive(Debug, Args)]
pub struct RecentCommand {
    /// Which equipment to list
    #[arg(value_enum)]
    pub equipment: EquipmentArg,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Records to include
    #[arg(short, long, value_enum, default_value = "engines")]
    pub scope: ScopeArg,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Directory to save the report in
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Persist an API base URL that overrides the configured one
    SetApiBase {
        /// Absolute http(s) URL of the remote API
        url: String,
    },

    /// Forget the persisted API base URL
    UnsetApiBase,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Equipment argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EquipmentArg {
    /// Engines
    Engines,
    /// Generators
    Generators,
}

impl From<EquipmentArg> for Equipment {
    fn from(arg: EquipmentArg) -> Self {
        match arg {
            EquipmentArg::Engines => Self::Engine,
            EquipmentArg::Generators => Self::Generator,
        }
    }
}

/// Export scope argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScopeArg {
    /// Engine records
    #[default]
    Engines,
    /// Generator records
    Generators,
    /// Both
    Both,
}

impl From<ScopeArg> for ExportScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Engines => Self::Engines,
            ScopeArg::Generators => Self::Generators,
            ScopeArg::Both => Self::Both,
        }
    }
}

/// Parse a collection name.
///
/// # Errors
///
/// Returns a message listing the valid names if `s` is not one of them.
pub fn parse_collection(s: &str) -> Result<Collection, String> {
    s.parse().map_err(|_| {
        let names: Vec<&str> = Collection::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown collection '{s}' (expected one of: {})", names.join(", "))
    })
}

/// Parse a `key=value` form field. The value may be empty or contain `=`.
///
/// # Errors
///
/// Returns a message if there is no `=` or the key is blank.
pub fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("field name missing in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection() {
        assert_eq!(parse_collection("eng_lathe"), Ok(Collection::EngLathe));
        assert_eq!(parse_collection("gen_inspect"), Ok(Collection::GenInspect));
    }

    #[test]
    fn test_parse_collection_lists_choices() {
        let err = parse_collection("eng_paint").unwrap_err();
        assert!(err.contains("eng_paint"));
        assert!(err.contains("eng_supply"));
        assert!(err.contains("gen_inspect"));
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("serial=111"),
            Ok(("serial".to_string(), "111".to_string()))
        );
        assert_eq!(
            parse_field("notes=a=b"),
            Ok(("notes".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_field(" notes ="),
            Ok(("notes".to_string(), String::new()))
        );
    }

    #[test]
    fn test_parse_field_rejects_malformed() {
        assert!(parse_field("serial").is_err());
        assert!(parse_field("=111").is_err());
    }

    #[test]
    fn test_equipment_arg_conversion() {
        assert_eq!(Equipment::from(EquipmentArg::Engines), Equipment::Engine);
        assert_eq!(
            Equipment::from(EquipmentArg::Generators),
            Equipment::Generator
        );
    }

    #[test]
    fn test_scope_arg_conversion() {
        assert_eq!(ExportScope::from(ScopeArg::Engines), ExportScope::Engines);
        assert_eq!(
            ExportScope::from(ScopeArg::Generators),
            ExportScope::Generators
        );
        assert_eq!(ExportScope::from(ScopeArg::Both), ExportScope::Both);
    }

    #[test]
    fn test_scope_arg_default() {
        assert_eq!(ScopeArg::default(), ScopeArg::Engines);
    }
}

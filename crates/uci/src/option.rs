//! Engine option declarations (`option name ... type ...`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::UciError;

/// Type and constraints of an engine option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OptionKind {
    Check { default: bool },
    Spin { default: i64, min: i64, max: i64 },
    Combo { default: String, vars: Vec<String> },
    Button,
    String { default: String },
}

/// An option as advertised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub kind: OptionKind,
}

const FIELDS: &[&str] = &["name", "type", "default", "min", "max", "var"];

impl OptionSpec {
    /// Parse an `option` line.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("option") {
            return Err(UciError::ParseError(format!("Not an option line: {}", line)));
        }

        // Every field value runs until the next field keyword, since names and
        // defaults may contain spaces.
        let mut fields: Vec<(&str, Vec<&str>)> = Vec::new();
        for part in parts {
            if FIELDS.contains(&part) {
                fields.push((part, Vec::new()));
            } else if let Some((_, value)) = fields.last_mut() {
                value.push(part);
            } else {
                return Err(UciError::ParseError(format!("Unexpected '{}' in option", part)));
            }
        }

        let field = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.join(" "))
        };
        let name = field("name")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| UciError::ParseError(format!("Option without name: {}", line)))?;
        let number = |key: &str| -> Result<i64, UciError> {
            field(key)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| UciError::ParseError(format!("Option {} needs numeric {}", name, key)))
        };
        let default = field("default").unwrap_or_default();

        let kind = match field("type").as_deref() {
            Some("check") => OptionKind::Check {
                default: default == "true",
            },
            Some("spin") => OptionKind::Spin {
                default: number("default")?,
                min: number("min")?,
                max: number("max")?,
            },
            Some("combo") => OptionKind::Combo {
                default,
                vars: fields
                    .iter()
                    .filter(|(k, _)| *k == "var")
                    .map(|(_, v)| v.join(" "))
                    .collect(),
            },
            Some("button") => OptionKind::Button,
            Some("string") => OptionKind::String {
                default: if default == "<empty>" { String::new() } else { default },
            },
            other => {
                return Err(UciError::ParseError(format!(
                    "Unknown option type {:?} for {}",
                    other, name
                )))
            }
        };
        Ok(OptionSpec { name, kind })
    }

    /// Format as an `option` line.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }

    /// Current default as wire text, `None` for buttons.
    pub fn default_value(&self) -> Option<String> {
        match &self.kind {
            OptionKind::Check { default } => Some(default.to_string()),
            OptionKind::Spin { default, .. } => Some(default.to_string()),
            OptionKind::Combo { default, .. } | OptionKind::String { default } => {
                Some(default.clone())
            }
            OptionKind::Button => None,
        }
    }

    /// Checks a value against the declaration and returns it as it should
    /// be sent in `setoption`.
    pub fn validate(&self, value: Option<&str>) -> Result<Option<String>, UciError> {
        let invalid = |reason: String| UciError::InvalidOptionValue {
            name: self.name.clone(),
            value: value.unwrap_or_default().to_string(),
            reason,
        };
        match (&self.kind, value) {
            (OptionKind::Button, None) => Ok(None),
            (OptionKind::Button, Some(_)) => Err(invalid("buttons take no value".to_string())),
            (_, None) => Err(invalid("a value is required".to_string())),
            (OptionKind::Check { .. }, Some(v)) => match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(Some("true".to_string())),
                "false" | "0" | "off" => Ok(Some("false".to_string())),
                _ => Err(invalid("expected true or false".to_string())),
            },
            (OptionKind::Spin { min, max, .. }, Some(v)) => {
                let n: i64 = v
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected an integer".to_string()))?;
                if n < *min || n > *max {
                    return Err(invalid(format!("outside {}..={}", min, max)));
                }
                Ok(Some(n.to_string()))
            }
            (OptionKind::Combo { vars, .. }, Some(v)) => vars
                .iter()
                .find(|var| var.eq_ignore_ascii_case(v.trim()))
                .map(|var| Some(var.clone()))
                .ok_or_else(|| invalid(format!("expected one of {}", vars.join(", ")))),
            (OptionKind::String { .. }, Some(v)) => Ok(Some(v.to_string())),
        }
    }
}

impl fmt::Display for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option name {} type ", self.name)?;
        match &self.kind {
            OptionKind::Check { default } => write!(f, "check default {}", default),
            OptionKind::Spin { default, min, max } => {
                write!(f, "spin default {} min {} max {}", default, min, max)
            }
            OptionKind::Combo { default, vars } => {
                write!(f, "combo default {}", default)?;
                for var in vars {
                    write!(f, " var {}", var)?;
                }
                Ok(())
            }
            OptionKind::Button => write!(f, "button"),
            OptionKind::String { default } if default.is_empty() => {
                write!(f, "string default <empty>")
            }
            OptionKind::String { default } => write!(f, "string default {}", default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_spin() {
        let spec = OptionSpec::parse("option name Skill Level type spin default 20 min 0 max 20").unwrap();
        assert_eq!(spec.name, "Skill Level");
        assert_eq!(
            spec.kind,
            OptionKind::Spin {
                default: 20,
                min: 0,
                max: 20
            }
        );
        assert_eq!(spec.validate(Some("5")).unwrap(), Some("5".to_string()));
        assert!(spec.validate(Some("21")).is_err());
        assert!(spec.validate(Some("high")).is_err());
        assert!(spec.validate(None).is_err());
    }

    #[test]
    fn parse_combo() {
        let spec = OptionSpec::parse(
            "option name Analysis Contempt type combo default Both var Off var White var Black var Both",
        )
        .unwrap();
        let OptionKind::Combo { default, vars } = &spec.kind else {
            panic!("Expected combo");
        };
        assert_eq!(default, "Both");
        assert_eq!(vars, &["Off", "White", "Black", "Both"]);
        assert_eq!(spec.validate(Some("white")).unwrap(), Some("White".to_string()));
        assert!(spec.validate(Some("Gray")).is_err());
    }

    #[test]
    fn parse_check_button_string() {
        let check = OptionSpec::parse("option name Ponder type check default false").unwrap();
        assert_eq!(check.kind, OptionKind::Check { default: false });
        assert_eq!(check.validate(Some("on")).unwrap(), Some("true".to_string()));

        let button = OptionSpec::parse("option name Clear Hash type button").unwrap();
        assert_eq!(button.kind, OptionKind::Button);
        assert_eq!(button.validate(None).unwrap(), None);
        assert!(button.validate(Some("x")).is_err());

        let string = OptionSpec::parse("option name EvalFile type string default <empty>").unwrap();
        assert_eq!(string.kind, OptionKind::String { default: String::new() });
        assert_eq!(string.default_value(), Some(String::new()));
    }

    #[test]
    fn format_round_trips() {
        for line in [
            "option name Hash type spin default 16 min 1 max 33554432",
            "option name UCI_AnalyseMode type check default false",
            "option name Clear Hash type button",
            "option name Style type combo default Normal var Solid var Normal var Risky",
            "option name Book File type string default book.bin",
        ] {
            assert_eq!(OptionSpec::parse(line).unwrap().to_uci(), line);
        }
    }

    #[test]
    fn rejects_malformed() {
        assert!(OptionSpec::parse("option type spin").is_err());
        assert!(OptionSpec::parse("option name X type spin default 1").is_err());
        assert!(OptionSpec::parse("option name X type dial").is_err());
        assert!(OptionSpec::parse("id name X").is_err());
    }
}

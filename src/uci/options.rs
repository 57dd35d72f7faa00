//! UCI option descriptor conversion and the "Configuring" phase of the
//! handshake (spec §4.2).
//!
//! Parsing the `option` line itself (its `name`/`type`/`default`/`min`/
//! `max`/`var` keyword stream, including values containing spaces) is
//! delegated to `vampirc_uci`'s own parser — that's exactly the kind of
//! opaque, already-solved parsing problem the spec treats as an external
//! collaborator for PGN tokenizing, and the ecosystem crate already gets
//! it right for UCI too.

use vampirc_uci::UciOptionConfig;

use super::types::{OptionDescriptor, OptionKind};

pub fn from_uci_option_config(cfg: UciOptionConfig) -> OptionDescriptor {
    match cfg {
        UciOptionConfig::Check { name, default } => {
            OptionDescriptor { name, kind: OptionKind::Check { default } }
        }
        UciOptionConfig::Spin { name, default, min, max } => {
            OptionDescriptor { name, kind: OptionKind::Spin { default, min, max } }
        }
        UciOptionConfig::Combo { name, default, var } => {
            OptionDescriptor { name, kind: OptionKind::Combo { default, allowed: var } }
        }
        UciOptionConfig::Button { name } => OptionDescriptor { name, kind: OptionKind::Button },
        UciOptionConfig::String { name, default } => {
            OptionDescriptor { name, kind: OptionKind::String { default } }
        }
    }
}

/// Outcome of applying one `--option NAME=VALUE` setting against the
/// engine's advertised descriptors.
#[derive(Debug)]
pub enum Applied {
    /// Send `setoption name {name} [value {value}]`.
    SetOption { name: String, value: Option<String> },
    /// EngineRecoverable (spec §7): logged by the caller, run continues.
    Recoverable(String),
}

/// Validate and, where needed, clamp a user-supplied option value
/// (spec §4.2 "Configuring").
pub fn apply_user_option(name: &str, value: &str, descriptors: &[OptionDescriptor]) -> Applied {
    let Some(descriptor) = descriptors.iter().find(|d| d.name == name) else {
        return Applied::Recoverable(format!("unknown engine option '{name}'"));
    };

    match &descriptor.kind {
        OptionKind::Button => Applied::SetOption { name: name.to_string(), value: None },
        OptionKind::Check { .. } => {
            if value != "true" && value != "false" {
                return Applied::Recoverable(format!(
                    "option '{name}' expects true/false, got '{value}'"
                ));
            }
            Applied::SetOption { name: name.to_string(), value: Some(value.to_string()) }
        }
        OptionKind::Spin { min, max, .. } => {
            let Ok(requested) = value.parse::<i64>() else {
                return Applied::Recoverable(format!(
                    "option '{name}' expects a number, got '{value}'"
                ));
            };
            let mut clamped = requested;
            let mut was_clamped = false;
            if let Some(min) = min {
                if clamped < *min {
                    clamped = *min;
                    was_clamped = true;
                }
            }
            if let Some(max) = max {
                if clamped > *max {
                    clamped = *max;
                    was_clamped = true;
                }
            }
            if was_clamped {
                log::error!("option '{name}' value {requested} clamped to {clamped}");
            }
            Applied::SetOption { name: name.to_string(), value: Some(clamped.to_string()) }
        }
        OptionKind::Combo { allowed, .. } => {
            if !allowed.is_empty() && !allowed.iter().any(|v| v == value) {
                return Applied::Recoverable(format!(
                    "option '{name}' value '{value}' is not one of {allowed:?}"
                ));
            }
            Applied::SetOption { name: name.to_string(), value: Some(value.to_string()) }
        }
        OptionKind::String { .. } => {
            Applied::SetOption { name: name.to_string(), value: Some(value.to_string()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor {
                name: "Skill Level".to_string(),
                kind: OptionKind::Spin { default: Some(20), min: Some(0), max: Some(20) },
            },
            OptionDescriptor {
                name: "Style".to_string(),
                kind: OptionKind::Combo {
                    default: Some("Normal".to_string()),
                    allowed: vec!["Solid".to_string(), "Normal".to_string(), "Risky".to_string()],
                },
            },
        ]
    }

    #[test]
    fn unknown_option_is_recoverable() {
        let descriptors = descriptors();
        assert!(matches!(
            apply_user_option("Nonexistent", "1", &descriptors),
            Applied::Recoverable(_)
        ));
    }

    #[test]
    fn out_of_range_spin_is_clamped_not_rejected() {
        let descriptors = descriptors();
        match apply_user_option("Skill Level", "99", &descriptors) {
            Applied::SetOption { value: Some(value), .. } => assert_eq!(value, "20"),
            other => panic!("expected a clamped SetOption, got {other:?}"),
        }
    }

    #[test]
    fn bad_combo_value_is_recoverable() {
        let descriptors = descriptors();
        assert!(matches!(
            apply_user_option("Style", "Chaotic", &descriptors),
            Applied::Recoverable(_)
        ));
    }
}

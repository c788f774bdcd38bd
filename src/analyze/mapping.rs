//! Credential mapping -- decide what value each discovered field is submitted with.
//!
//! Mapping is a flat, ordered rule list over lowercased field names. Rules
//! are data, not control flow, so reordering or extending them is a one-line
//! change and the precedence is visible in one place.

use crate::analyze::form::FormField;
use std::collections::HashMap;

// ---- Public types -----------------------------------------------------------

/// Login credentials supplied by the caller.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account identifier -- email address or username.
    pub identifier: String,
    /// Account secret -- the password.
    pub secret: String,
}

// ---- Mapping rules ----------------------------------------------------------

/// What a matched rule substitutes into a field.
#[derive(Debug, Clone, Copy)]
enum Fill {
    Identifier,
    Secret,
    /// Keep whatever the server pre-filled (CSRF tokens and the like).
    Original,
}

/// One name-based rule: matches when the lowercased field name contains any
/// of the needles.
struct MappingRule {
    needles: &'static [&'static str],
    fill: Fill,
}

/// Ordered rule list; the first matching rule wins. The order is part of the
/// contract: `user_password` maps to the secret, `user_csrf_token` maps to
/// the identifier.
const MAPPING_RULES: &[MappingRule] = &[
    MappingRule {
        needles: &["pass"],
        fill: Fill::Secret,
    },
    MappingRule {
        needles: &["email", "user", "login"],
        fill: Fill::Identifier,
    },
    MappingRule {
        needles: &["csrf", "token"],
        fill: Fill::Original,
    },
];

// ---- Public API -------------------------------------------------------------

/// Build the submission payload for a form, in field document order.
///
/// When `overrides` carries any entries the discovered fields are ignored and
/// the overrides are submitted verbatim. Otherwise every field is matched
/// against the rule list; fields no rule claims fall back to their suggested
/// value, or their original value when the suggestion is blank.
pub fn build_payload(
    fields: &[FormField],
    credentials: &Credentials,
    overrides: Option<&HashMap<String, String>>,
) -> Vec<(String, String)> {
    if let Some(map) = overrides {
        if !map.is_empty() {
            return map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        }
    }

    fields
        .iter()
        .map(|field| (field.name.clone(), fill_for(field, credentials)))
        .collect()
}

// ---- Private helpers --------------------------------------------------------

fn fill_for(field: &FormField, credentials: &Credentials) -> String {
    let lower = field.name.to_lowercase();

    for rule in MAPPING_RULES {
        if rule.needles.iter().any(|needle| lower.contains(needle)) {
            return match rule.fill {
                Fill::Identifier => credentials.identifier.clone(),
                Fill::Secret => credentials.secret.clone(),
                Fill::Original => field.value.clone(),
            };
        }
    }

    // Unclaimed field: keep the suggestion, or the original value when the
    // suggestion is blank.
    if field.suggested_value.is_empty() {
        field.value.clone()
    } else {
        field.suggested_value.clone()
    }
}

// ---- Tests ------------------------------------------------------------------

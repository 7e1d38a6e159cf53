use std::collections::HashSet;

use serde::Serialize;

use crate::er_ast::Schema;
use crate::er_parser::{HEADER_KEYWORD, parse_er};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Parses `input` and checks the result. Parse errors come first, followed by
/// the structural checks.
pub fn validate(input: &str) -> ValidationResult {
    let parsed = parse_er(input);
    let mut errors: Vec<String> = parsed.errors().to_vec();

    if !input.to_lowercase().contains(&HEADER_KEYWORD.to_lowercase()) {
        errors.push(format!("Missing {HEADER_KEYWORD} header"));
    }
    if let Some(schema) = &parsed.schema {
        errors.extend(validate_schema(schema));
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

/// Duplicate entity names and relationship ends that name no entity.
pub fn validate_schema(schema: &Schema) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for entity in &schema.entities {
        let name = entity.name.as_str();
        if !seen.insert(name) && reported.insert(name) {
            errors.push(format!("Duplicate entity name: {name}"));
        }
    }

    for rel in &schema.relationships {
        for name in [&rel.first_entity, &rel.second_entity] {
            if !seen.contains(name.as_str()) {
                errors.push(format!(
                    "Relationship \"{}\" references unknown entity: {name}",
                    rel.label
                ));
            }
        }
    }

    errors
}

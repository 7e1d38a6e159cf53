//! Diagram attribute types to PostgreSQL column types.

pub const FALLBACK_TYPE: &str = "TEXT";

/// Maps a diagram type token to a SQL type. Never fails: anything
/// unrecognized becomes `TEXT`.
pub fn map_type(diagram_type: &str) -> String {
    let normalized = diagram_type.trim().to_lowercase();

    if let Some(base) = normalized.strip_suffix("[]") {
        return format!("{}[]", map_type(base));
    }

    if let Some((name, params)) = split_params(&normalized) {
        return match lookup(name.trim()) {
            Some(mapped) => with_params(mapped, params),
            None => FALLBACK_TYPE.to_string(),
        };
    }

    lookup(&normalized).unwrap_or(FALLBACK_TYPE).to_string()
}

/// `name(params)` -> (`name`, `params`).
fn split_params(token: &str) -> Option<(&str, &str)> {
    let open = token.find('(')?;
    let inner = token[open + 1..].strip_suffix(')')?;
    Some((&token[..open], inner.trim()))
}

/// Swaps the mapping's default parameters for the supplied ones, or appends
/// them when the mapping has none.
fn with_params(mapped: &str, params: &str) -> String {
    let base = mapped.split('(').next().unwrap_or(mapped);
    format!("{base}({params})")
}

fn lookup(name: &str) -> Option<&'static str> {
    let mapped = match name {
        // Numeric
        "int" | "integer" => "INTEGER",
        "bigint" => "BIGINT",
        "smallint" => "SMALLINT",
        "serial" => "SERIAL",
        "bigserial" => "BIGSERIAL",
        "decimal" => "DECIMAL",
        "numeric" => "NUMERIC",
        "float" | "double" => "DOUBLE PRECISION",
        "real" => "REAL",

        // String
        "string" | "varchar" => "VARCHAR(255)",
        "text" => "TEXT",
        "char" => "CHAR(1)",

        "boolean" | "bool" => "BOOLEAN",

        // Temporal
        "date" => "DATE",
        "time" => "TIME",
        "datetime" | "timestamp" => "TIMESTAMP",
        "timestamptz" => "TIMESTAMPTZ",

        "uuid" => "UUID",
        "json" => "JSON",
        "jsonb" => "JSONB",

        // Binary
        "bytea" | "blob" => "BYTEA",

        _ => return None,
    };
    Some(mapped)
}

use serde::Serialize;

use crate::er_ast::*;
use crate::identifier::normalize;
use crate::type_mapper::map_type;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSql {
    pub create_tables: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub comments: Vec<String>,
    pub drop_tables: Vec<String>,
    pub full_script: String,
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

pub fn generate_create_table(entity: &Entity) -> String {
    let table = normalize(&entity.name);
    let mut lines: Vec<String> = Vec::new();

    for attr in &entity.attributes {
        let mut column = format!(
            "{} {}",
            quote_ident(&normalize(&attr.name)),
            map_type(&attr.attr_type)
        );
        if attr.is_primary_key() {
            column.push_str(" NOT NULL");
        }
        lines.push(column);
    }

    let pk_columns: Vec<String> = entity
        .primary_keys()
        .map(|a| quote_ident(&normalize(&a.name)))
        .collect();
    if !pk_columns.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", pk_columns.join(", ")));
    }

    for attr in &entity.attributes {
        if attr.has_key(KeyType::Uk) && !attr.is_primary_key() {
            lines.push(format!("UNIQUE ({})", quote_ident(&normalize(&attr.name))));
        }
    }

    if lines.is_empty() {
        return format!("CREATE TABLE IF NOT EXISTS {} ();", quote_ident(&table));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n);",
        quote_ident(&table),
        lines.join(",\n  ")
    )
}

/// FK target is inferred by naming convention only: `customer_id` points at
/// the entity whose table name is `customer`. Unmatched columns are skipped.
pub fn generate_foreign_keys(schema: &Schema) -> Vec<String> {
    let mut statements = Vec::new();

    for entity in &schema.entities {
        let table = normalize(&entity.name);
        for attr in entity.attributes.iter().filter(|a| a.has_key(KeyType::Fk)) {
            let column = normalize(&attr.name);
            let Some(target_name) = column.strip_suffix("_id") else {
                log::debug!("{table}.{column}: no `_id` suffix, skipping foreign key");
                continue;
            };
            let Some(target) = schema
                .entities
                .iter()
                .find(|e| normalize(&e.name) == target_name)
            else {
                log::debug!(
                    "{table}.{column}: no table named `{target_name}`, skipping foreign key"
                );
                continue;
            };
            let target_column = target
                .primary_keys()
                .next()
                .map(|a| normalize(&a.name))
                .unwrap_or_else(|| "id".to_string());

            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE CASCADE;",
                quote_ident(&table),
                quote_ident(&format!("fk_{table}_{column}")),
                quote_ident(&column),
                quote_ident(target_name),
                quote_ident(&target_column),
            ));
        }
    }

    statements
}

/// `COMMENT ON` statements for entity aliases and attribute comments.
pub fn generate_comments(schema: &Schema) -> Vec<String> {
    let mut statements = Vec::new();

    for entity in &schema.entities {
        let table = quote_ident(&normalize(&entity.name));
        if let Some(alias) = &entity.alias {
            statements.push(format!("COMMENT ON TABLE {table} IS {};", quote_literal(alias)));
        }
        for attr in &entity.attributes {
            if let Some(comment) = &attr.comment {
                statements.push(format!(
                    "COMMENT ON COLUMN {table}.{} IS {};",
                    quote_ident(&normalize(&attr.name)),
                    quote_literal(comment)
                ));
            }
        }
    }

    statements
}

/// Declaration order; `CASCADE` takes care of dependents.
pub fn generate_drop_tables(schema: &Schema) -> Vec<String> {
    schema
        .entities
        .iter()
        .map(|e| format!("DROP TABLE IF EXISTS {} CASCADE;", quote_ident(&normalize(&e.name))))
        .collect()
}

pub fn generate_schema_sql(schema: &Schema) -> SchemaSql {
    let create_tables: Vec<String> = schema.entities.iter().map(generate_create_table).collect();
    let foreign_keys = generate_foreign_keys(schema);
    let comments = generate_comments(schema);
    let drop_tables = generate_drop_tables(schema);

    let mut sections: Vec<String> = Vec::new();
    for (title, statements) in [
        ("Tables", &create_tables),
        ("Foreign keys", &foreign_keys),
        ("Comments", &comments),
    ] {
        if !statements.is_empty() {
            sections.push(format!("-- {title}\n{}", statements.join("\n\n")));
        }
    }
    let full_script = if sections.is_empty() {
        String::new()
    } else {
        format!("{}\n", sections.join("\n\n"))
    };

    SchemaSql {
        create_tables,
        foreign_keys,
        comments,
        drop_tables,
        full_script,
    }
}

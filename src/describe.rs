use crate::display_width::format_table;
use crate::er_ast::Schema;
use crate::identifier::normalize;
use crate::type_mapper::map_type;

/// Plain-text overview of the tables a schema compiles to.
pub fn describe(schema: &Schema) -> String {
    let mut blocks: Vec<String> = Vec::new();

    for entity in &schema.entities {
        let mut block = normalize(&entity.name);
        if let Some(alias) = &entity.alias {
            block.push_str(&format!(" ({alias})"));
        }

        let rows: Vec<Vec<String>> = entity
            .attributes
            .iter()
            .map(|a| {
                let keys: Vec<&str> = a.keys.iter().map(|k| k.as_str()).collect();
                vec![
                    normalize(&a.name),
                    map_type(&a.attr_type),
                    keys.join(","),
                    a.comment.clone().unwrap_or_default(),
                ]
            })
            .collect();
        for line in format_table(&rows).lines() {
            block.push_str("\n  ");
            block.push_str(line);
        }
        blocks.push(block);
    }

    if !schema.relationships.is_empty() {
        let lines: Vec<String> = schema.relationships.iter().map(|r| r.to_mermaid()).collect();
        blocks.push(format!("relationships\n  {}", lines.join("\n  ")));
    }

    blocks.join("\n\n")
}

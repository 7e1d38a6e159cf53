use std::collections::HashMap;

use winnow::prelude::*;
use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::token::{rest, take_till, take_until, take_while};

use crate::cardinality::Cardinality;
use crate::er_ast::*;
use crate::identifier::strip_quotes;

pub const HEADER_KEYWORD: &str = "erDiagram";

/// Parses an ER diagram line by line. Unparseable attribute lines are
/// reported and skipped; the schema built so far is always returned.
pub fn parse_er(input: &str) -> ParseResult {
    let mut state = ParserState::SeekHeader;
    let mut entities = EntityTable::default();
    let mut relationships: Vec<Relationship> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();

        if line.is_empty() || is_comment(line) {
            continue;
        }
        if header_line.parse(line).is_ok() {
            if matches!(state, ParserState::SeekHeader) {
                state = ParserState::TopLevel;
            }
            continue;
        }
        if matches!(state, ParserState::SeekHeader) {
            continue;
        }
        if direction_line.parse(line).is_ok() {
            continue;
        }

        state = match state {
            ParserState::InEntityBlock(mut entity) => {
                if closing_brace.parse(line).is_ok() {
                    entities.upsert(entity);
                    ParserState::TopLevel
                } else {
                    match attribute_line.parse(line) {
                        Ok(attribute) => entity.attributes.push(attribute),
                        Err(_) => {
                            log::warn!("line {line_number}: skipping attribute `{line}`");
                            errors.push(format!(
                                "Line {line_number}: unable to parse attribute: {line}"
                            ));
                        }
                    }
                    ParserState::InEntityBlock(entity)
                }
            }
            _ => top_level_line(
                line,
                line_number,
                &mut entities,
                &mut relationships,
                &mut errors,
            ),
        };
    }

    if let ParserState::InEntityBlock(entity) = state {
        log::debug!("committing unterminated block for `{}`", entity.name);
        entities.upsert(entity);
    }

    let schema = Schema {
        entities: entities.into_entities(),
        relationships,
    };
    ParseResult::new(schema, errors)
}

enum ParserState {
    SeekHeader,
    TopLevel,
    InEntityBlock(Entity),
}

fn top_level_line(
    line: &str,
    line_number: usize,
    entities: &mut EntityTable,
    relationships: &mut Vec<Relationship>,
    errors: &mut Vec<String>,
) -> ParserState {
    if let Ok((header, body)) = entity_block_open.parse(line) {
        let mut entity = header.into_entity();
        let closed = match inline_block_body.parse(body) {
            Ok((attributes, closed)) => {
                entity.attributes = attributes;
                closed
            }
            Err(_) => {
                log::warn!("line {line_number}: skipping inline attributes `{body}`");
                errors.push(format!(
                    "Line {line_number}: unable to parse attribute: {}",
                    body.trim_end_matches('}').trim_end()
                ));
                body.trim_end().ends_with('}')
            }
        };
        if closed {
            entities.upsert(entity);
            return ParserState::TopLevel;
        }
        return ParserState::InEntityBlock(entity);
    }

    if let Ok(rel) = relationship_line.parse(line) {
        let relationship = rel.into_relationship();
        entities.insert_if_absent(Entity::new(relationship.first_entity.clone()));
        entities.insert_if_absent(Entity::new(relationship.second_entity.clone()));
        relationships.push(relationship);
        return ParserState::TopLevel;
    }

    if let Ok(header) = entity_declaration.parse(line) {
        entities.insert_if_absent(header.into_entity());
        return ParserState::TopLevel;
    }

    log::debug!("line {line_number}: ignoring `{line}`");
    ParserState::TopLevel
}

/// Entities keyed by name, in first-seen order.
#[derive(Default)]
struct EntityTable {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityTable {
    /// Explicit block: replaces an earlier entry in place, or appends.
    fn upsert(&mut self, entity: Entity) {
        match self.index.get(&entity.name) {
            Some(&i) => self.entities[i] = entity,
            None => self.push(entity),
        }
    }

    /// Implicit mention: never overwrites an existing entry.
    fn insert_if_absent(&mut self, entity: Entity) {
        if !self.index.contains_key(&entity.name) {
            self.push(entity);
        }
    }

    fn push(&mut self, entity: Entity) {
        self.index.insert(entity.name.clone(), self.entities.len());
        self.entities.push(entity);
    }

    fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("%%")
}

fn trailing_comment(input: &mut &str) -> winnow::Result<()> {
    opt(preceded(space0, ("%%", rest))).void().parse_next(input)
}

fn header_line(input: &mut &str) -> winnow::Result<()> {
    take_while(1.., |c: char| c.is_ascii_alphabetic())
        .verify(|s: &str| s.eq_ignore_ascii_case(HEADER_KEYWORD))
        .parse_next(input)?;
    trailing_comment.parse_next(input)
}

fn closing_brace(input: &mut &str) -> winnow::Result<()> {
    "}".parse_next(input)?;
    trailing_comment.parse_next(input)
}

fn direction_line(input: &mut &str) -> winnow::Result<()> {
    "direction".parse_next(input)?;
    space1.parse_next(input)?;
    alt(("TB", "BT", "LR", "RL")).parse_next(input)?;
    space0.parse_next(input)?;
    Ok(())
}

#[derive(Debug, PartialEq)]
struct EntityHeader<'s> {
    name: &'s str,
    alias: Option<&'s str>,
}

impl EntityHeader<'_> {
    fn into_entity(self) -> Entity {
        Entity {
            name: strip_quotes(self.name),
            alias: self.alias.map(strip_quotes),
            attributes: Vec::new(),
        }
    }
}

fn entity_name<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    alt((
        delimited("\\\"", take_until(0.., "\\\""), "\\\"").take(),
        delimited("\"", take_till(0.., '"'), "\"").take(),
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))
    .parse_next(input)
}

fn entity_alias<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    delimited("[", take_till(1.., ']'), "]").parse_next(input)
}

fn entity_header<'s>(input: &mut &'s str) -> winnow::Result<EntityHeader<'s>> {
    let name = entity_name.parse_next(input)?;
    let alias = opt(preceded(space0, entity_alias)).parse_next(input)?;
    Ok(EntityHeader { name, alias })
}

/// `NAME[alias] {` plus whatever follows the brace on the same line.
fn entity_block_open<'s>(
    input: &mut &'s str,
) -> winnow::Result<(EntityHeader<'s>, &'s str)> {
    let header = entity_header.parse_next(input)?;
    space0.parse_next(input)?;
    "{".parse_next(input)?;
    space0.parse_next(input)?;
    let body = rest.parse_next(input)?;
    Ok((header, body))
}

/// Attributes written on the opening line, `int id PK string name }`,
/// and whether the block closes there too.
fn inline_block_body(input: &mut &str) -> winnow::Result<(Vec<Attribute>, bool)> {
    let attributes: Vec<Attribute> = separated(0.., attribute, space1).parse_next(input)?;
    space0.parse_next(input)?;
    let closed = opt("}").parse_next(input)?.is_some();
    trailing_comment.parse_next(input)?;
    space0.parse_next(input)?;
    Ok((attributes, closed))
}

fn entity_declaration<'s>(input: &mut &'s str) -> winnow::Result<EntityHeader<'s>> {
    let header = entity_header.parse_next(input)?;
    space0.parse_next(input)?;
    Ok(header)
}

#[derive(Debug)]
struct RelationshipLine<'s> {
    first: &'s str,
    first_card: &'s str,
    connector: &'s str,
    second_card: &'s str,
    second: &'s str,
    label: &'s str,
}

impl RelationshipLine<'_> {
    fn into_relationship(self) -> Relationship {
        Relationship {
            first_entity: strip_quotes(self.first),
            second_entity: strip_quotes(self.second),
            first_cardinality: Cardinality::decode(self.first_card),
            second_cardinality: Cardinality::decode(self.second_card),
            identifying: self.connector == "--",
            label: strip_quotes(self.label),
        }
    }
}

fn cardinality_token<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(2, |c: char| matches!(c, '|' | 'o' | '{' | '}')).parse_next(input)
}

fn relationship_line<'s>(input: &mut &'s str) -> winnow::Result<RelationshipLine<'s>> {
    let first = entity_name.parse_next(input)?;
    space0.parse_next(input)?;
    let first_card = cardinality_token.parse_next(input)?;
    let connector = alt(("--", "..")).parse_next(input)?;
    let second_card = cardinality_token.parse_next(input)?;
    space0.parse_next(input)?;
    let second = entity_name.parse_next(input)?;
    space0.parse_next(input)?;
    ":".parse_next(input)?;
    space0.parse_next(input)?;
    let label = rest.parse_next(input)?;

    Ok(RelationshipLine {
        first,
        first_card,
        connector,
        second_card,
        second,
        label: label.trim_end(),
    })
}

fn attribute_type<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || matches!(c, '_' | '-' | '(' | ')' | '[' | ']' | ',')
    })
    .verify(|s: &str| s.starts_with(|c: char| c.is_alphabetic()))
    .parse_next(input)
}

fn attribute_name<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    (
        opt("*"),
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

fn key_token(input: &mut &str) -> winnow::Result<KeyType> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_')
        .verify_map(KeyType::from_token)
        .parse_next(input)
}

fn key_separator(input: &mut &str) -> winnow::Result<()> {
    alt(((space0, ",", space0).void(), space1.void())).parse_next(input)
}

fn key_list(input: &mut &str) -> winnow::Result<Vec<KeyType>> {
    separated(1.., key_token, key_separator).parse_next(input)
}

fn quoted_comment<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    delimited("\"", take_till(0.., '"'), "\"").parse_next(input)
}

fn attribute_line(input: &mut &str) -> winnow::Result<Attribute> {
    let attr = attribute.parse_next(input)?;
    space0.parse_next(input)?;
    Ok(attr)
}

/// `type name [PK, FK, UK] ["comment"]`
fn attribute(input: &mut &str) -> winnow::Result<Attribute> {
    let attr_type = attribute_type.parse_next(input)?;
    space1.parse_next(input)?;
    let raw_name = attribute_name.parse_next(input)?;
    let listed = opt(preceded(space1, key_list)).parse_next(input)?;
    let comment = opt(preceded(space0, quoted_comment)).parse_next(input)?;

    let mut keys: Vec<KeyType> = Vec::new();
    let name = match raw_name.strip_prefix('*') {
        Some(stripped) => {
            keys.push(KeyType::Pk);
            stripped
        }
        None => raw_name,
    };
    for key in listed.unwrap_or_default() {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    Ok(Attribute {
        name: name.to_string(),
        attr_type: attr_type.to_string(),
        keys,
        comment: comment.map(|c| c.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entity_names(result: &ParseResult) -> Vec<&str> {
        result
            .schema
            .as_ref()
            .map(|s| s.entities.iter().map(|e| e.name.as_str()).collect())
            .unwrap_or_default()
    }

    fn schema(result: &ParseResult) -> &Schema {
        result.schema.as_ref().unwrap()
    }

    #[test]
    fn parse_entity_name_bare() {
        let mut input = "LINE-ITEM rest";
        assert_eq!(entity_name(&mut input).unwrap(), "LINE-ITEM");
        assert_eq!(input, " rest");
    }

    #[test]
    fn parse_entity_name_quoted() {
        let mut input = "\"Customer Account\" {";
        assert_eq!(entity_name(&mut input).unwrap(), "\"Customer Account\"");
        assert_eq!(input, " {");
    }

    #[test]
    fn parse_entity_name_escaped_quotes() {
        let mut input = "\\\"a/b\\\" ||--|| B : x";
        assert_eq!(entity_name(&mut input).unwrap(), "\\\"a/b\\\"");
    }

    #[test]
    fn parse_header_case_insensitive() {
        assert!(header_line.parse("erDiagram").is_ok());
        assert!(header_line.parse("ERDIAGRAM").is_ok());
        assert!(header_line.parse("erDiagram %% schema").is_ok());
        assert!(header_line.parse("erDiagram extra").is_err());
    }

    #[test]
    fn parse_direction() {
        assert!(direction_line.parse("direction LR").is_ok());
        assert!(direction_line.parse("direction XY").is_err());
    }

    #[test]
    fn parse_block_open_with_alias() {
        let (header, body) = entity_block_open.parse("p[\"Person\"] {").unwrap();
        assert_eq!(header.name, "p");
        assert_eq!(header.alias, Some("\"Person\""));
        assert_eq!(body, "");
    }

    #[test]
    fn parse_block_open_closed_on_same_line() {
        let (header, body) = entity_block_open.parse("EMPTY { }").unwrap();
        assert_eq!(header.name, "EMPTY");
        let (attributes, closed) = inline_block_body.parse(body).unwrap();
        assert!(attributes.is_empty());
        assert!(closed);
    }

    #[test]
    fn parse_inline_block_body() {
        let (attributes, closed) = inline_block_body
            .parse("int customer_id PK string email UK }")
            .unwrap();
        assert!(closed);
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].name, "customer_id");
        assert_eq!(attributes[0].keys, vec![KeyType::Pk]);
        assert_eq!(attributes[1].attr_type, "string");
        assert_eq!(attributes[1].name, "email");
        assert_eq!(attributes[1].keys, vec![KeyType::Uk]);
    }

    #[test]
    fn parse_inline_block_body_left_open() {
        let (attributes, closed) = inline_block_body.parse("int id PK").unwrap();
        assert!(!closed);
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn parse_key_token_takes_whole_word() {
        assert!(key_token.parse("pkey").is_err());
        assert_eq!(key_token.parse("fk").unwrap(), KeyType::Fk);
    }

    #[test]
    fn parse_closing_brace_with_comment() {
        assert!(closing_brace.parse("}").is_ok());
        assert!(closing_brace.parse("} %% end of customer").is_ok());
        assert!(closing_brace.parse("} x").is_err());
    }

    #[test]
    fn parse_relationship_solid() {
        let rel = relationship_line
            .parse("CUSTOMER ||--o{ ORDER : places")
            .unwrap()
            .into_relationship();
        assert_eq!(rel.first_entity, "CUSTOMER");
        assert_eq!(rel.second_entity, "ORDER");
        assert_eq!(rel.first_cardinality, Cardinality::ExactlyOne);
        assert_eq!(rel.second_cardinality, Cardinality::ZeroOrMore);
        assert!(rel.identifying);
        assert_eq!(rel.label, "places");
    }

    #[test]
    fn parse_relationship_dashed_with_quoted_label() {
        let rel = relationship_line
            .parse("PERSON }|..|{ \"CAR\" : \"is driven by\"")
            .unwrap()
            .into_relationship();
        assert_eq!(rel.second_entity, "CAR");
        assert_eq!(rel.first_cardinality, Cardinality::OneOrMore);
        assert_eq!(rel.second_cardinality, Cardinality::OneOrMore);
        assert!(!rel.identifying);
        assert_eq!(rel.label, "is driven by");
    }

    #[test]
    fn parse_relationship_requires_label_separator() {
        assert!(relationship_line.parse("A ||--|| B").is_err());
    }

    #[test]
    fn parse_attribute_plain() {
        let attr = attribute_line.parse("string name").unwrap();
        assert_eq!(attr.attr_type, "string");
        assert_eq!(attr.name, "name");
        assert!(attr.keys.is_empty());
        assert_eq!(attr.comment, None);
    }

    #[test]
    fn parse_attribute_keys_and_comment() {
        let attr = attribute_line
            .parse("int customer_id PK, FK \"owner\"")
            .unwrap();
        assert_eq!(attr.keys, vec![KeyType::Pk, KeyType::Fk]);
        assert_eq!(attr.comment.as_deref(), Some("owner"));
    }

    #[test]
    fn parse_attribute_parameterized_type() {
        let attr = attribute_line.parse("varchar(100) email UK").unwrap();
        assert_eq!(attr.attr_type, "varchar(100)");
        assert_eq!(attr.keys, vec![KeyType::Uk]);
    }

    #[test]
    fn parse_attribute_star_marks_primary_key() {
        let attr = attribute_line.parse("int *id").unwrap();
        assert_eq!(attr.name, "id");
        assert_eq!(attr.keys, vec![KeyType::Pk]);

        let attr = attribute_line.parse("int *id PK, UK").unwrap();
        assert_eq!(attr.keys, vec![KeyType::Pk, KeyType::Uk]);
    }

    #[test]
    fn parse_attribute_rejects_unknown_key() {
        assert!(attribute_line.parse("int id NN").is_err());
        assert!(attribute_line.parse("justone").is_err());
    }

    #[test]
    fn parse_er_mixed_blocks_and_relationships() {
        let input = "\
erDiagram
    CUSTOMER {
        int customer_id PK
        string email UK
    }
    CUSTOMER ||--o{ ORDER : \"places\"
";
        let result = parse_er(input);
        assert!(result.success);
        assert_eq!(entity_names(&result), vec!["CUSTOMER", "ORDER"]);
        let schema = schema(&result);
        assert_eq!(schema.entities[0].attributes.len(), 2);
        assert!(schema.entities[1].attributes.is_empty());
        assert_eq!(schema.relationships.len(), 1);
    }

    #[test]
    fn parse_er_block_replaces_implicit_entity_in_place() {
        let input = "\
erDiagram
    A ||--o{ B : has
    B {
        int id PK
    }
";
        let result = parse_er(input);
        assert_eq!(entity_names(&result), vec!["A", "B"]);
        assert_eq!(schema(&result).entities[1].attributes.len(), 1);
    }

    #[test]
    fn parse_er_relationship_does_not_overwrite_block() {
        let input = "\
erDiagram
    B {
        int id PK
    }
    A ||--o{ B : has
";
        let result = parse_er(input);
        assert_eq!(entity_names(&result), vec!["B", "A"]);
        assert_eq!(schema(&result).entities[0].attributes.len(), 1);
    }

    #[test]
    fn parse_er_standalone_declaration_with_alias() {
        let result = parse_er("erDiagram\n    p[Person]\n");
        let entity = &schema(&result).entities[0];
        assert_eq!(entity.name, "p");
        assert_eq!(entity.alias.as_deref(), Some("Person"));
    }

    #[test]
    fn parse_er_ignores_lines_before_header() {
        let result = parse_er("title: shop\nFOO\nerDiagram\n    BAR\n");
        assert!(result.success);
        assert_eq!(entity_names(&result), vec!["BAR"]);
    }

    #[test]
    fn parse_er_without_header_is_empty() {
        let result = parse_er("A ||--|| B : r\n");
        assert!(result.success);
        assert!(schema(&result).entities.is_empty());
    }

    #[test]
    fn parse_er_skips_comments_and_direction() {
        let input = "erDiagram\n    %% a comment\n    direction LR\n    A ||--|| B : r\n";
        let result = parse_er(input);
        assert!(result.success);
        assert_eq!(entity_names(&result), vec!["A", "B"]);
    }

    #[test]
    fn parse_er_bad_attribute_is_reported_and_skipped() {
        let input = "\
erDiagram
    A {
        int id PK
        this is not valid
        string name
    }
";
        let result = parse_er(input);
        assert!(!result.success);
        assert_eq!(
            result.errors(),
            ["Line 4: unable to parse attribute: this is not valid".to_string()]
        );
        assert_eq!(schema(&result).entities[0].attributes.len(), 2);
    }

    #[test]
    fn parse_er_unterminated_block_is_committed() {
        let result = parse_er("erDiagram\n    A {\n        int id PK\n");
        assert!(result.success);
        assert_eq!(schema(&result).entities[0].attributes.len(), 1);
    }

    #[test]
    fn parse_er_unknown_top_level_lines_are_ignored() {
        let result = parse_er("erDiagram\n    style A fill:#f9f\n    A\n");
        assert!(result.success);
        assert_eq!(entity_names(&result), vec!["A"]);
    }

    #[test]
    fn parse_er_inline_attribute_block() {
        let input = "\
erDiagram
    CUSTOMER { int customer_id PK string email UK }
    CUSTOMER ||--o{ ORDER : \"places\"
";
        let result = parse_er(input);
        assert!(result.success);
        assert_eq!(entity_names(&result), vec!["CUSTOMER", "ORDER"]);
        let customer = &schema(&result).entities[0];
        assert_eq!(customer.attributes.len(), 2);
        assert!(customer.attributes[0].is_primary_key());
        assert!(customer.attributes[1].has_key(KeyType::Uk));
        assert_eq!(schema(&result).relationships.len(), 1);
    }

    #[test]
    fn parse_er_inline_attributes_continue_on_next_lines() {
        let input = "erDiagram\n    A { int id PK\n        string name\n    }\n";
        let result = parse_er(input);
        assert!(result.success);
        assert_eq!(schema(&result).entities[0].attributes.len(), 2);
    }

    #[test]
    fn parse_er_bad_inline_attributes_are_reported() {
        let result = parse_er("erDiagram\n    A { 123 id }\n    A ||--|| B : r\n");
        assert!(!result.success);
        assert_eq!(
            result.errors(),
            ["Line 2: unable to parse attribute: 123 id".to_string()]
        );
        assert_eq!(entity_names(&result), vec!["A", "B"]);
        assert_eq!(schema(&result).relationships.len(), 1);
    }

    #[test]
    fn parse_er_closing_brace_with_trailing_comment() {
        let input = "\
erDiagram
    CUSTOMER {
        int customer_id PK
    } %% end of customer
    CUSTOMER ||--o{ ORDER : places
";
        let result = parse_er(input);
        assert!(result.success);
        assert!(result.errors().is_empty());
        assert_eq!(entity_names(&result), vec!["CUSTOMER", "ORDER"]);
        assert_eq!(schema(&result).entities[0].attributes.len(), 1);
        assert_eq!(schema(&result).relationships.len(), 1);
    }

    #[test]
    fn parse_er_is_deterministic() {
        let input = "erDiagram\n    A ||--o{ B : r1\n    B }|..|| C : r2\n";
        assert_eq!(parse_er(input), parse_er(input));
    }
}

pub mod cardinality;
pub mod ddl;
pub mod describe;
pub mod display_width;
pub mod er_ast;
pub mod er_parser;
pub mod error;
pub mod identifier;
pub mod query_builder;
pub mod type_mapper;
pub mod validator;

pub use ddl::SchemaSql;
pub use er_ast::{ParseResult, Schema};
pub use error::{Error, Result};
pub use query_builder::{Query, QueryBuilder, SelectOptions, SortDirection};
pub use validator::{ValidationResult, validate};

/// Parses Mermaid `erDiagram` text into a schema, collecting diagnostics.
pub fn parse(input: &str) -> ParseResult {
    er_parser::parse_er(input)
}

/// Parses `input` and lowers whatever schema it yields to DDL, even when
/// some lines failed to parse.
pub fn compile(input: &str) -> (ParseResult, SchemaSql) {
    let parsed = parse(input);
    let sql = parsed
        .schema
        .as_ref()
        .map(ddl::generate_schema_sql)
        .unwrap_or_default();
    (parsed, sql)
}

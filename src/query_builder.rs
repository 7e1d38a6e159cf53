use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ddl::quote_ident;
use crate::er_ast::{Entity, Schema};
use crate::error::{Error, Result};
use crate::identifier::normalize;

/// A statement with `$n` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::InvalidSortDirection(s.to_string())),
        }
    }
}

impl SortDirection {

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub order_by: Option<String>,
    pub order_dir: Option<SortDirection>,
}

/// CRUD statement templates for one entity's table.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    primary_key: String,
}

impl QueryBuilder {
    /// Attributes that normalize to the same column collapse to the first one.
    pub fn new(entity: &Entity) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(entity.attributes.len());
        for attr in &entity.attributes {
            let column = normalize(&attr.name);
            if columns.contains(&column) {
                log::debug!("{}: `{}` repeats column `{column}`", entity.name, attr.name);
                continue;
            }
            columns.push(column);
        }
        let primary_key = entity
            .primary_keys()
            .next()
            .map(|a| normalize(&a.name))
            .or_else(|| columns.first().cloned())
            .unwrap_or_else(|| "id".to_string());

        Self {
            table: normalize(&entity.name),
            columns,
            primary_key,
        }
    }

    /// Looks the entity up by exact name first, then by table name.
    pub fn for_entity(schema: &Schema, name: &str) -> Result<Self> {
        let wanted = normalize(name);
        schema
            .entity(name)
            .or_else(|| schema.entities.iter().find(|e| normalize(&e.name) == wanted))
            .map(Self::new)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Known columns present in `data`, in column order.
    fn known_values<'a>(
        &'a self,
        data: &'a Map<String, Value>,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .filter_map(move |c| data.get(c).map(|v| (c.as_str(), v)))
    }

    pub fn select_all(&self, options: &SelectOptions) -> Query {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));
        let mut params = Vec::new();

        if let Some(order_by) = &options.order_by {
            let column = normalize(order_by);
            if self.has_column(&column) {
                let dir = options.order_dir.unwrap_or_default();
                sql.push_str(&format!(" ORDER BY {} {}", quote_ident(&column), dir.as_sql()));
            } else {
                log::debug!("{}: ignoring order by unknown column `{order_by}`", self.table);
            }
        }
        if let Some(limit) = options.limit {
            params.push(Value::from(limit));
            sql.push_str(&format!(" LIMIT ${}", params.len()));
        }
        if let Some(offset) = options.offset {
            params.push(Value::from(offset));
            sql.push_str(&format!(" OFFSET ${}", params.len()));
        }

        Query { sql, params }
    }

    pub fn select_by_id(&self, id: Value) -> Query {
        Query {
            sql: format!(
                "SELECT * FROM {} WHERE {} = $1",
                quote_ident(&self.table),
                quote_ident(&self.primary_key)
            ),
            params: vec![id],
        }
    }

    /// Keys that are not columns of the table are dropped.
    pub fn insert(&self, data: &Map<String, Value>) -> Query {
        let (columns, params): (Vec<&str>, Vec<Value>) =
            self.known_values(data).map(|(c, v)| (c, v.clone())).unzip();

        if columns.is_empty() {
            return Query {
                sql: format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote_ident(&self.table)),
                params,
            };
        }

        let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        Query {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                quote_ident(&self.table),
                column_list.join(", "),
                placeholders.join(", ")
            ),
            params,
        }
    }

    /// Returns `None` when `data` has no settable column. The primary key is
    /// never part of the `SET` list.
    pub fn update(&self, id: Value, data: &Map<String, Value>) -> Option<Query> {
        let (columns, mut params): (Vec<&str>, Vec<Value>) = self
            .known_values(data)
            .filter(|(c, _)| *c != self.primary_key)
            .map(|(c, v)| (c, v.clone()))
            .unzip();

        if columns.is_empty() {
            return None;
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", quote_ident(c), i + 1))
            .collect();
        params.push(id);
        Some(Query {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
                quote_ident(&self.table),
                assignments.join(", "),
                quote_ident(&self.primary_key),
                params.len()
            ),
            params,
        })
    }

    pub fn delete_by_id(&self, id: Value) -> Query {
        Query {
            sql: format!(
                "DELETE FROM {} WHERE {} = $1 RETURNING *",
                quote_ident(&self.table),
                quote_ident(&self.primary_key)
            ),
            params: vec![id],
        }
    }

    pub fn count(&self) -> Query {
        Query {
            sql: format!("SELECT COUNT(*) AS count FROM {}", quote_ident(&self.table)),
            params: Vec::new(),
        }
    }
}

use serde::Serialize;

use crate::cardinality::Cardinality;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Schema {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            attributes: Vec::new(),
        }
    }

    /// Attributes carrying `PK`, in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_primary_key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    pub keys: Vec<KeyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Attribute {
    pub fn has_key(&self, key: KeyType) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_primary_key(&self) -> bool {
        self.has_key(KeyType::Pk)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyType {
    #[serde(rename = "PK")]
    Pk,
    #[serde(rename = "FK")]
    Fk,
    #[serde(rename = "UK")]
    Uk,
}

impl KeyType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "PK" => Some(Self::Pk),
            "FK" => Some(Self::Fk),
            "UK" => Some(Self::Uk),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pk => "PK",
            Self::Fk => "FK",
            Self::Uk => "UK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub first_entity: String,
    pub second_entity: String,
    pub first_cardinality: Cardinality,
    pub second_cardinality: Cardinality,
    pub identifying: bool,
    pub label: String,
}

impl Relationship {
    /// Writes the relationship back as a single Mermaid line.
    pub fn to_mermaid(&self) -> String {
        let connector = if self.identifying { "--" } else { ".." };
        format!(
            "{} {}{}{} {} : \"{}\"",
            self.first_entity,
            self.first_cardinality.left_token(),
            connector,
            self.second_cardinality.right_token(),
            self.second_entity,
            self.label
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ParseResult {
    pub fn new(schema: Schema, errors: Vec<String>) -> Self {
        let success = errors.is_empty();
        Self {
            success,
            schema: Some(schema),
            errors: if success { None } else { Some(errors) },
        }
    }

    pub fn errors(&self) -> &[String] {
        self.errors.as_deref().unwrap_or(&[])
    }
}

use serde::Serialize;

/// Multiplicity at one end of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    /// Decodes one connector end. The same value can be written facing either
    /// direction, so `|o` and `o|` are equivalent. Unknown tokens decode to
    /// `ExactlyOne`; line syntax is checked by the parser, not here.
    pub fn decode(token: &str) -> Self {
        let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "|o" | "o|" => Self::ZeroOrOne,
            "||" => Self::ExactlyOne,
            "}o" | "o{" | "{o" => Self::ZeroOrMore,
            "}|" | "|{" | "{|" => Self::OneOrMore,
            _ => Self::ExactlyOne,
        }
    }

    /// Token for the left end of a connector (`A <here>--.. B`).
    pub fn left_token(self) -> &'static str {
        match self {
            Self::ZeroOrOne => "|o",
            Self::ExactlyOne => "||",
            Self::ZeroOrMore => "}o",
            Self::OneOrMore => "}|",
        }
    }

    /// Token for the right end of a connector (`A --<here> B`).
    pub fn right_token(self) -> &'static str {
        match self {
            Self::ZeroOrOne => "o|",
            Self::ExactlyOne => "||",
            Self::ZeroOrMore => "o{",
            Self::OneOrMore => "|{",
        }
    }
}

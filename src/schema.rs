//! Minimal reader for GraphQL SDL documents.
//!
//! Only object and interface definitions are kept: for every field, the named
//! type it returns and the arguments it takes. That is enough to walk a query
//! and catch fields or arguments the service does not declare before the query
//! goes over the wire.

use thiserror::Error;
use tracing::debug;

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

/// Root operation type queries are checked from
const QUERY_ROOT: &str = "Query";

/// Names that open a new top level definition
const DEFINITION_KEYWORDS: &[&str] = &[
    "type",
    "interface",
    "enum",
    "input",
    "union",
    "scalar",
    "schema",
    "directive",
    "extend",
];

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseSchemaError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unbalanced braces")]
    UnbalancedBraces,
    #[error("missing name after {0}")]
    MissingName(String),
    #[error("field {0} has no type")]
    MissingFieldType(String),
    #[error("document declares no object types")]
    NoTypes,
}

#[derive(Debug, Error)]
pub enum LoadSchemaError {
    #[error("failed to read schema document {0}")]
    Read(String, #[source] std::io::Error),
    #[error("failed to parse schema document")]
    Parse(#[from] ParseSchemaError),
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SchemaCheckError {
    #[error("failed to parse query")]
    Malformed(#[source] ParseSchemaError),
    #[error("query has no selection set")]
    NoSelection,
    #[error("queries using {0} are not supported")]
    Unsupported(&'static str),
    #[error("schema has no type {0}")]
    UnknownType(String),
    #[error("type {type_name} has no field {field}")]
    UnknownField { type_name: String, field: String },
    #[error("field {type_name}.{field} takes no argument {argument}")]
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Token {
    Name(String),
    Punct(char),
}

fn tokenize(doc: &str) -> Result<Vec<Token>, ParseSchemaError> {
    let mut tokens = Vec::new();
    let mut chars = doc.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    // A lone `""` is an empty string, `"""` opens a block string
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        skip_string(&mut chars, true)?;
                    }
                } else {
                    skip_string(&mut chars, false)?;
                }
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = c.to_string();
                while let Some(&c) = chars.peek() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            c if c.is_whitespace() || c == ',' => {}
            c => tokens.push(Token::Punct(c)),
        }
    }

    Ok(tokens)
}

fn skip_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    block: bool,
) -> Result<(), ParseSchemaError> {
    let mut quotes = 0;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
                quotes = 0;
            }
            '"' if !block => return Ok(()),
            '"' => {
                quotes += 1;
                if quotes == 3 {
                    return Ok(());
                }
            }
            _ => quotes = 0,
        }
    }
    Err(ParseSchemaError::UnterminatedString)
}

fn starts_definition(token: &Token) -> bool {
    match token {
        Token::Name(name) => DEFINITION_KEYWORDS.contains(&name.as_str()),
        Token::Punct(_) => false,
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct FieldDef {
    /// Named type with list and non-null wrappers stripped
    type_name: String,
    args: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    types: HashMap<String, HashMap<String, FieldDef>>,
}

impl Schema {
    pub fn load(path: &Path) -> Result<Schema, LoadSchemaError> {
        let doc = std::fs::read_to_string(path)
            .map_err(|e| LoadSchemaError::Read(path.display().to_string(), e))?;
        let schema = Schema::parse(&doc)?;
        debug!(
            "Loaded schema {} with {} object types",
            path.display(),
            schema.types.len()
        );
        Ok(schema)
    }

    pub fn parse(doc: &str) -> Result<Schema, ParseSchemaError> {
        let tokens = tokenize(doc)?;
        let mut types: HashMap<String, HashMap<String, FieldDef>> = HashMap::new();

        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Name(kw) if kw == "type" || kw == "interface" => {
                    let name = match tokens.get(i + 1) {
                        Some(Token::Name(name)) => name.clone(),
                        _ => return Err(ParseSchemaError::MissingName(kw.clone())),
                    };

                    // Skip `implements A & B` and directives up to the body. A
                    // declaration without one ends where the next definition starts
                    i += 2;
                    while let Some(token) = tokens.get(i) {
                        match token {
                            Token::Punct('{') => break,
                            Token::Punct('(') => i = skip_parens(&tokens, i + 1)? + 1,
                            t if starts_definition(t) => break,
                            _ => i += 1,
                        }
                    }

                    if tokens.get(i) != Some(&Token::Punct('{')) {
                        types.entry(name).or_default();
                        continue;
                    }

                    let (fields, end) = read_fields(&tokens, i + 1)?;
                    // `extend type` adds to an existing entry
                    types.entry(name).or_default().extend(fields);
                    i = end + 1;
                }
                Token::Punct('(') => {
                    i = skip_parens(&tokens, i + 1)? + 1;
                }
                Token::Punct('{') => {
                    i = skip_block(&tokens, i + 1)? + 1;
                }
                Token::Punct('}') | Token::Punct(')') => {
                    return Err(ParseSchemaError::UnbalancedBraces)
                }
                _ => i += 1,
            }
        }

        if types.is_empty() {
            return Err(ParseSchemaError::NoTypes);
        }

        Ok(Schema { types })
    }

    #[cfg(test)]
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    fn field(&self, type_name: &str, field: &str) -> Result<&FieldDef, SchemaCheckError> {
        let fields = self
            .types
            .get(type_name)
            .ok_or_else(|| SchemaCheckError::UnknownType(type_name.to_string()))?;

        fields
            .get(field)
            .ok_or_else(|| SchemaCheckError::UnknownField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })
    }

    /// Walks the selection set of a query operation and checks every field and
    /// argument it uses against the schema
    pub fn check_query(&self, query: &str) -> Result<(), SchemaCheckError> {
        let tokens = tokenize(query).map_err(SchemaCheckError::Malformed)?;

        // Operation keyword, name and variable definitions
        let mut i = 0;
        while let Some(token) = tokens.get(i) {
            match token {
                Token::Punct('{') => break,
                Token::Punct('(') => {
                    i = skip_parens(&tokens, i + 1).map_err(SchemaCheckError::Malformed)? + 1
                }
                _ => i += 1,
            }
        }

        if i == tokens.len() {
            return Err(SchemaCheckError::NoSelection);
        }

        self.check_selection_set(&tokens, i + 1, QUERY_ROOT)?;
        Ok(())
    }

    /// Checks a selection set starting just after its `{`. Returns the index of
    /// the closing `}`
    fn check_selection_set(
        &self,
        tokens: &[Token],
        start: usize,
        type_name: &str,
    ) -> Result<usize, SchemaCheckError> {
        use SchemaCheckError::*;

        let mut i = start;
        loop {
            let name = match tokens.get(i) {
                None => return Err(Malformed(ParseSchemaError::UnbalancedBraces)),
                Some(Token::Punct('}')) => return Ok(i),
                Some(Token::Punct('.')) => return Err(Unsupported("fragment spreads")),
                Some(Token::Punct(c)) => {
                    return Err(Malformed(ParseSchemaError::MissingName(c.to_string())))
                }
                Some(Token::Name(name)) => name,
            };
            i += 1;

            // `alias: field`
            let field = if tokens.get(i) == Some(&Token::Punct(':')) {
                let field = match tokens.get(i + 1) {
                    Some(Token::Name(field)) => field,
                    _ => return Err(Malformed(ParseSchemaError::MissingName(name.clone()))),
                };
                i += 2;
                field
            } else {
                name
            };

            if field == "__typename" {
                continue;
            }

            let def = self.field(type_name, field)?;

            if tokens.get(i) == Some(&Token::Punct('(')) {
                let end = skip_parens(tokens, i + 1).map_err(Malformed)?;
                for argument in argument_names(&tokens[i + 1..end]) {
                    if !def.args.contains(&argument) {
                        return Err(UnknownArgument {
                            type_name: type_name.to_string(),
                            field: field.clone(),
                            argument,
                        });
                    }
                }
                i = end + 1;
            }

            while tokens.get(i) == Some(&Token::Punct('@')) {
                i += 2;
                if tokens.get(i) == Some(&Token::Punct('(')) {
                    i = skip_parens(tokens, i + 1).map_err(Malformed)? + 1;
                }
            }

            if tokens.get(i) == Some(&Token::Punct('{')) {
                i = self.check_selection_set(tokens, i + 1, &def.type_name)? + 1;
            }
        }
    }
}

/// Collects field definitions of a type body starting just after its `{`.
/// Returns the fields and the index of the closing `}`
fn read_fields(
    tokens: &[Token],
    start: usize,
) -> Result<(HashMap<String, FieldDef>, usize), ParseSchemaError> {
    let mut fields = HashMap::new();
    let mut i = start;

    while let Some(token) = tokens.get(i) {
        match token {
            Token::Punct('}') => return Ok((fields, i)),
            Token::Punct('@') => {
                i += 2;
                if tokens.get(i) == Some(&Token::Punct('(')) {
                    i = skip_parens(tokens, i + 1)? + 1;
                }
            }
            Token::Name(name) => {
                i += 1;

                let mut args = HashSet::new();
                if tokens.get(i) == Some(&Token::Punct('(')) {
                    let end = skip_parens(tokens, i + 1)?;
                    args = argument_names(&tokens[i + 1..end]).into_iter().collect();
                    i = end + 1;
                }

                if tokens.get(i) != Some(&Token::Punct(':')) {
                    return Err(ParseSchemaError::MissingFieldType(name.clone()));
                }
                i += 1;

                while tokens.get(i) == Some(&Token::Punct('[')) {
                    i += 1;
                }
                let type_name = match tokens.get(i) {
                    Some(Token::Name(type_name)) => type_name.clone(),
                    _ => return Err(ParseSchemaError::MissingFieldType(name.clone())),
                };
                i += 1;
                while matches!(
                    tokens.get(i),
                    Some(Token::Punct(']')) | Some(Token::Punct('!'))
                ) {
                    i += 1;
                }

                fields.insert(name.clone(), FieldDef { type_name, args });
            }
            Token::Punct(_) => i += 1,
        }
    }

    Err(ParseSchemaError::UnbalancedBraces)
}

/// Names of the arguments in the tokens between a pair of parentheses
fn argument_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Punct('(') | Token::Punct('[') | Token::Punct('{') => depth += 1,
            Token::Punct(')') | Token::Punct(']') | Token::Punct('}') => {
                depth = depth.saturating_sub(1)
            }
            Token::Name(name) if depth == 0 => {
                let after_sigil = i > 0
                    && matches!(tokens[i - 1], Token::Punct('@') | Token::Punct('$'));
                if !after_sigil && tokens.get(i + 1) == Some(&Token::Punct(':')) {
                    names.push(name.clone());
                }
            }
            _ => {}
        }
    }

    names
}

/// Returns the index of the `)` matching a `(` just before `start`
fn skip_parens(tokens: &[Token], start: usize) -> Result<usize, ParseSchemaError> {
    let mut depth = 1usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        match token {
            Token::Punct('(') => depth += 1,
            Token::Punct(')') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(ParseSchemaError::UnbalancedBraces)
}

/// Skips a block we do not care about (enum, input, schema). Returns the index
/// of its closing `}`
fn skip_block(tokens: &[Token], start: usize) -> Result<usize, ParseSchemaError> {
    let mut depth = 1usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        match token {
            Token::Punct('{') => depth += 1,
            Token::Punct('}') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(ParseSchemaError::UnbalancedBraces)
}

#[cfg(test)]
mod test {
    use super::*;

    const SHIPPED_SCHEMA: &str = include_str!("../res/schema.graphql");

    fn unknown_field(type_name: &str, field: &str) -> SchemaCheckError {
        SchemaCheckError::UnknownField {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    #[test]
    fn test_shipped_schema() {
        let schema = Schema::parse(SHIPPED_SCHEMA).expect("Failed to parse schema");
        assert!(schema.has_type("Query"));
        assert!(schema.has_type("Media"));

        let media = schema.field("Page", "media").expect("Page.media missing");
        assert_eq!(media.type_name, "Media");
        assert!(media.args.contains("onList"));

        let airing_at = schema
            .field("AiringSchedule", "airingAt")
            .expect("AiringSchedule.airingAt missing");
        assert_eq!(airing_at.type_name, "Int");

        // Enums are not object types
        assert!(!schema.has_type("MediaSeason"));
    }

    #[test]
    fn test_arguments_and_directives_are_not_fields() {
        let doc = r#"
            """
            A "quoted" description
            """
            type Query {
              Page(
                "The page number"
                page: Int
                perPage: Int = 50
              ): Page
              oldField: Int @deprecated(reason: "use Page")
            }

            enum MediaSeason { WINTER SPRING }

            type Page implements Node & Other @key(fields: "id") {
              # comment with a fake: field
              media(season: MediaSeason, onList: Boolean): [Media!]!
            }
        "#;
        let schema = Schema::parse(doc).expect("Failed to parse");

        let page = schema.field("Query", "Page").expect("Page missing");
        assert_eq!(
            page.args,
            HashSet::from(["page".to_string(), "perPage".to_string()])
        );
        schema.field("Query", "oldField").expect("oldField missing");
        assert_eq!(
            schema.field("Query", "page").unwrap_err(),
            unknown_field("Query", "page")
        );
        assert!(schema.field("Query", "deprecated").is_err());
        assert!(schema.field("Page", "fake").is_err());
        assert!(schema.field("Page", "key").is_err());

        let media = schema.field("Page", "media").expect("media missing");
        assert_eq!(media.type_name, "Media");
    }

    #[test]
    fn test_bodyless_type_does_not_swallow_next_definition() {
        let schema = Schema::parse("type A\ntype B { c: Int }").expect("Failed to parse");
        assert!(schema.has_type("A"));
        assert_eq!(schema.field("A", "c").unwrap_err(), unknown_field("A", "c"));
        schema.field("B", "c").expect("B.c missing");

        let schema = Schema::parse("type A implements Node\nenum E { X }\ntype B { c: Int }")
            .expect("Failed to parse");
        assert!(schema.has_type("A"));
        schema.field("B", "c").expect("B.c missing");
    }

    #[test]
    fn test_check_query() {
        let schema = Schema::parse(SHIPPED_SCHEMA).expect("Failed to parse schema");
        schema
            .check_query(crate::anilist::CURRENT_SEASON_QUERY)
            .expect("Shipped query rejected");

        schema
            .check_query("{ Viewer { id name } aliased: Page(page: 2) { __typename } }")
            .expect("Valid query rejected");

        assert_eq!(
            schema.check_query("query { Page { media { id airingAt } } }"),
            Err(unknown_field("Media", "airingAt"))
        );
        assert_eq!(
            schema.check_query("query ($p: Int = 1) { Page(page: $p, perPge: 50) { pageInfo { total } } }"),
            Err(SchemaCheckError::UnknownArgument {
                type_name: "Query".to_string(),
                field: "Page".to_string(),
                argument: "perPge".to_string(),
            })
        );
        assert_eq!(
            schema.check_query("query { Page { ...Fields } }"),
            Err(SchemaCheckError::Unsupported("fragment spreads"))
        );
        assert_eq!(
            schema.check_query("query getNothing($a: Int)"),
            Err(SchemaCheckError::NoSelection)
        );
        assert_eq!(
            schema.check_query("query { Page { media { id }"),
            Err(SchemaCheckError::Malformed(ParseSchemaError::UnbalancedBraces))
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert_eq!(
            Schema::parse("type A { b: Int").unwrap_err(),
            ParseSchemaError::UnbalancedBraces
        );
        assert_eq!(
            Schema::parse("type A { \"b: Int }").unwrap_err(),
            ParseSchemaError::UnterminatedString
        );
        assert_eq!(
            Schema::parse("type A { b }").unwrap_err(),
            ParseSchemaError::MissingFieldType("b".to_string())
        );
        assert_eq!(
            Schema::parse("enum A { B }").unwrap_err(),
            ParseSchemaError::NoTypes
        );
    }
}

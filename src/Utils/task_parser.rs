//! parse a lesson file with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into
//! HashMap<title, HashMap<key, Option<Vec<Value>>>>. Values are typed on the fly (integer, float, boolean, otherwise string).
//!
//! Lines starting with //, #, % or ; are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type DocumentMap = HashMap<String, SectionMap>;
pub type SectionMap = HashMap<String, Option<Vec<Value>>>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(f) => f.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

/// Parses a title (word characters without spaces), trailing whitespace dropped
fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = identifier(input)?;
    Ok((input.trim(), result))
}

fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // a single value runs up to a comma, whitespace or semicolon
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

/// key: value, value, ...
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_key, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim(), result))
}

/// A title followed by one or more key-value pairs
fn parse_section(input: &str) -> IResult<&str, (String, HashMap<String, Vec<Value>>)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;

    let section_map = pairs.into_iter().collect::<HashMap<String, Vec<Value>>>();
    Ok((input, (title, section_map)))
}

/// Drops comment and blank lines, trims the rest
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.starts_with("//")
                && !line.starts_with('#')
                && !line.starts_with('%')
                && !line.starts_with(';')
                && !line.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let mut parser = many1(delimited(space0, parse_section, multispace0));
    let (input, sections) = parser.parse(input)?;

    let mut result = HashMap::new();
    for (title, section_map) in sections {
        let title_map: SectionMap = section_map
            .into_iter()
            .map(|(key, values)| (key, Some(values)))
            .collect();
        result.insert(title, title_map);
    }
    Ok((input, result))
}

/// Strips comments, parses the whole text and refuses anything left over
pub fn parse_document_as(input: &str) -> Result<DocumentMap, String> {
    let filtered = filter_comments(input);
    match parse_document(&filtered) {
        Ok((remaining, parsed)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining
                ));
            }
            Ok(parsed)
        }
        Err(e) => Err(format!("Parsing error: {:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("run\n lessons: variance").unwrap();
        assert_eq!(title, "run");
        assert_eq!(remaining, "lessons: variance");

        let (remaining, title) = parse_title("title_with_underscore key1: value1").unwrap();
        assert_eq!(title, "title_with_underscore");
        assert_eq!(remaining, "key1: value1");
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("floating_point, variance").unwrap();
        assert_eq!(value, Value::String("floating_point".to_string()));
        assert_eq!(remaining, ", variance");

        let (_, value) = parse_value("123, next").unwrap();
        assert_eq!(value, Value::Integer(123));

        let (_, value) = parse_value("1e-8").unwrap();
        assert_eq!(value, Value::Float(1e-8));

        let (_, value) = parse_value("true").unwrap();
        assert_eq!(value, Value::Boolean(true));

        let (_, value) = parse_value("results/run_1").unwrap();
        assert_eq!(value, Value::String("results/run_1".to_string()));
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("lessons : variance , convergence").unwrap();
        assert_eq!(key, "lessons");
        assert_eq!(
            values,
            vec![
                Value::String("variance".to_string()),
                Value::String("convergence".to_string())
            ]
        );
        assert_eq!(remaining, "");

        let (remaining, (_, values)) = parse_key_value_pair("seed: 42\nplots: true").unwrap();
        assert_eq!(values, vec![Value::Integer(42)]);
        assert_eq!(remaining, "plots: true");
    }

    #[test]
    fn test_parse_section() {
        let input = "settings seed: 42 plots: false";
        let (remaining, (title, map)) = parse_section(input).unwrap();
        assert_eq!(title, "settings");
        assert_eq!(map.len(), 2);
        assert_eq!(map["seed"], vec![Value::Integer(42)]);
        assert_eq!(map["plots"], vec![Value::Boolean(false)]);
        assert_eq!(remaining, "");

        let input = "run lessons: variance settings";
        let (remaining, (_, map)) = parse_section(input).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(remaining, "settings");
    }

    #[test]
    fn test_parse_document_multiline() {
        let input = "run\nlessons: variance, least_squares\nsettings\nseed: 1\nsample_size: 50";
        let (remaining, doc) = parse_document(input).unwrap();
        assert_eq!(remaining, "");
        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc["run"]["lessons"].as_ref().unwrap(),
            &vec![
                Value::String("variance".to_string()),
                Value::String("least_squares".to_string())
            ]
        );
        assert_eq!(doc["settings"]["sample_size"], Some(vec![Value::Integer(50)]));
    }

    #[test]
    fn test_comments_and_indentation() {
        let input = r#"
            // lesson file
            run
                lessons: convergence
            # trailing settings
            settings
                seed: 9
        "#;
        let doc = parse_document_as(input).unwrap();
        assert_eq!(doc["settings"]["seed"], Some(vec![Value::Integer(9)]));
        assert_eq!(
            doc["run"]["lessons"],
            Some(vec![Value::String("convergence".to_string())])
        );
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_document_as("").is_err());
        assert!(parse_document_as("run lessons variance").is_err());
        assert!(parse_document_as("settings\nseed: 1\n: orphan").is_err());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_integer(), Some(3));
        assert_eq!(Value::Float(0.5).as_integer(), None);
        assert_eq!(Value::String("x".to_string()).as_boolean(), None);
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }
}

//! Expression templates
//!
//! Parses string leaves containing placeholders like:
//! - `${path.to.value}` - reference to another leaf
//! - `${a?b?'literal'}` - ordered alternatives, the last of several may be a literal default
//! - `${a?:b}` - `?:` is accepted as an alternative separator too
//! - `$\{not.an.expression}` - escaped braces and quotes are kept literally
//!
//! A string without any `${` never becomes an [`Expression`]; it stays a plain scalar.

use crate::error::{Error, Result};
use crate::value::Scalar;

/// One piece of an [`Expression`]
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Concrete value: literal text or an already resolved placeholder
    Static(Scalar),
    /// Unresolved placeholder
    Dynamic {
        /// Raw text between `${` and `}`
        source: String,
        /// Candidate paths tried in order. The last one of several doubles as literal default.
        alternatives: Vec<String>,
    },
}

impl Segment {
    pub fn is_static(&self) -> bool {
        matches!(self, Segment::Static(_))
    }
}

/// Parsed `${...}` template
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    template: String,
    segments: Vec<Segment>,
}

impl Expression {
    /// Parse a template string
    pub fn parse(template: &str) -> Result<Self> {
        ExpressionParser::new(template).parse()
    }

    pub(crate) fn from_segments(template: String, segments: Vec<Segment>) -> Self {
        Self { template, segments }
    }

    /// The original template text. Also identifies the expression in cycle checks.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when no dynamic segment remains
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(Segment::is_static)
    }

    /// Collapse a fully static expression into its value.
    ///
    /// A single segment keeps its type, several segments are concatenated as text.
    /// Returns `None` while a dynamic segment remains.
    pub fn to_static_value(&self) -> Option<Scalar> {
        if !self.is_static() {
            return None;
        }
        match self.segments.as_slice() {
            [] => Some(Scalar::String(String::new())),
            [Segment::Static(value)] => Some(value.clone()),
            segments => {
                let mut text = String::new();
                for segment in segments {
                    if let Segment::Static(value) = segment {
                        text.push_str(&value.to_string());
                    }
                }
                Some(Scalar::String(text))
            }
        }
    }
}

/// Turn a string leaf into an expression when it holds a placeholder.
/// Other scalars, and strings without placeholders, come back unchanged.
pub fn parse_scalar(value: &Scalar) -> Result<Scalar> {
    match value {
        Scalar::String(template) if template.contains("${") => {
            let expression = Expression::parse(template)?;
            Ok(match expression.to_static_value() {
                Some(value) => value,
                None => Scalar::Expression(expression),
            })
        }
        _ => Ok(value.clone()),
    }
}

/// Parser for expression templates
pub struct ExpressionParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ExpressionParser<'a> {
    /// Create a new parser for the given input
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the entire input string
    pub fn parse(&mut self) -> Result<Expression> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.current() {
            if c == '\\' {
                self.advance();
                let escaped = self.escaped_char()?;
                literal.push(escaped);
            } else if self.check_expression_start() {
                if !literal.is_empty() {
                    segments.push(Segment::Static(Scalar::String(std::mem::take(
                        &mut literal,
                    ))));
                }
                self.advance(); // $
                self.advance(); // {
                segments.push(self.parse_dynamic()?);
            } else {
                literal.push(c);
                self.advance();
            }
        }

        if !literal.is_empty() || segments.is_empty() {
            segments.push(Segment::Static(Scalar::String(literal)));
        }

        Ok(Expression::from_segments(self.input.to_string(), segments))
    }

    /// Parse the body of a placeholder, positioned right after `${`
    fn parse_dynamic(&mut self) -> Result<Segment> {
        let mut raw = String::new();
        let mut quote: Option<char> = None;

        loop {
            let c = match self.current() {
                Some(c) => c,
                None if quote.is_some() => {
                    return Err(self.error("Unterminated quote in expression"));
                }
                None => return Err(self.error("Unterminated expression, expected '}'")),
            };
            self.advance();
            match c {
                '\\' => {
                    let escaped = self.escaped_char()?;
                    // Quotes stay escaped so the splitter treats them as text
                    if escaped == '\'' || escaped == '"' {
                        raw.push('\\');
                    }
                    raw.push(escaped);
                }
                '\'' | '"' => {
                    match quote {
                        None => quote = Some(c),
                        Some(open) if open == c => quote = None,
                        Some(_) => {}
                    }
                    raw.push(c);
                }
                '}' if quote.is_none() => break,
                _ => raw.push(c),
            }
        }

        let alternatives = split_alternatives(&raw)?;
        if alternatives.is_empty() {
            return Ok(Segment::Static(Scalar::String(String::new())));
        }
        Ok(Segment::Dynamic {
            source: raw.trim().to_string(),
            alternatives,
        })
    }

    /// Read the character following a backslash
    fn escaped_char(&mut self) -> Result<char> {
        match self.current() {
            Some(c @ ('{' | '}' | '\'' | '"')) => {
                self.advance();
                Ok(c)
            }
            Some(c) => Err(self.error(format!("Illegal escape sequence '\\{}'", c))),
            None => Err(self.error("Dangling escape character at end of template")),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(format!("{} in template '{}'", message.into(), self.input))
    }

    /// Get current character
    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Advance by one character
    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += c.len_utf8();
        }
    }

    /// Check if we're at an expression start (${)
    fn check_expression_start(&self) -> bool {
        self.input[self.pos..].starts_with("${")
    }
}

/// Split the inside of a placeholder on `?` or `?:`, ignoring separators in quotes.
///
/// A quote opening a piece delimits it and is dropped; a quote in the middle of a
/// piece is kept verbatim. Pieces are trimmed and empty pieces are dropped.
pub fn split_alternatives(expression: &str) -> Result<Vec<String>> {
    let mut result = Vec::new();
    let mut chunk = String::new();
    let mut quote: Option<char> = None;
    let mut preserve_quote = false;
    let mut chars = expression.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(q @ ('\'' | '"')) => chunk.push(q),
                Some(other) => {
                    return Err(Error::parse(format!(
                        "Illegal escape sequence '\\{}' in expression '{}'",
                        other, expression
                    )))
                }
                None => {
                    return Err(Error::parse(format!(
                        "Dangling escape character in expression '{}'",
                        expression
                    )))
                }
            },
            '\'' | '"' => match quote {
                None => {
                    quote = Some(c);
                    preserve_quote = !chunk.trim().is_empty();
                    if preserve_quote {
                        chunk.push(c);
                    } else {
                        chunk.clear();
                    }
                }
                Some(open) if open == c => {
                    quote = None;
                    if preserve_quote {
                        chunk.push(c);
                    } else {
                        push_piece(&chunk, &mut result);
                        chunk.clear();
                    }
                }
                Some(_) => chunk.push(c),
            },
            _ if quote.is_some() => chunk.push(c),
            '?' => {
                if chars.peek() == Some(&':') {
                    chars.next();
                }
                push_piece(&chunk, &mut result);
                chunk.clear();
            }
            _ => chunk.push(c),
        }
    }

    if quote.is_some() {
        return Err(Error::parse(format!(
            "Unterminated quote in expression '{}'",
            expression
        )));
    }
    push_piece(&chunk, &mut result);
    Ok(result)
}

fn push_piece(piece: &str, result: &mut Vec<String>) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        result.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn dynamic(source: &str, alternatives: &[&str]) -> Segment {
        Segment::Dynamic {
            source: source.to_string(),
            alternatives: alternatives.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn text(s: &str) -> Segment {
        Segment::Static(Scalar::String(s.to_string()))
    }

    #[test]
    fn test_parse_literal() {
        let expr = Expression::parse("hello world").unwrap();
        assert!(expr.is_static());
        assert_eq!(expr.segments(), &[text("hello world")]);
    }

    #[test]
    fn test_parse_single_reference() {
        let expr = Expression::parse("${server.port}").unwrap();
        assert!(!expr.is_static());
        assert_eq!(expr.segments(), &[dynamic("server.port", &["server.port"])]);
    }

    #[test]
    fn test_parse_mixed_template() {
        let expr = Expression::parse("Hello ${name?'World'}!").unwrap();
        assert_eq!(
            expr.segments(),
            &[
                text("Hello "),
                dynamic("name?'World'", &["name", "World"]),
                text("!")
            ]
        );
        assert_eq!(expr.template(), "Hello ${name?'World'}!");
    }

    #[test]
    fn test_parse_elvis_separator() {
        let expr = Expression::parse("${ a ?: b ? c }").unwrap();
        assert_eq!(expr.segments(), &[dynamic("a ?: b ? c", &["a", "b", "c"])]);
    }

    #[test]
    fn test_parse_empty_placeholder_is_static() {
        let expr = Expression::parse("x${ }y").unwrap();
        assert!(expr.is_static());
        assert_eq!(expr.to_static_value(), Some(Scalar::String("xy".into())));
    }

    #[test]
    fn test_parse_escapes() {
        let expr = Expression::parse(r"$\{a\}").unwrap();
        assert!(expr.is_static());
        assert_eq!(expr.segments(), &[text("${a}")]);
    }

    #[test]
    fn test_parse_quoted_separator_and_brace() {
        let expr = Expression::parse("${a?'what? }'}").unwrap();
        assert_eq!(expr.segments(), &[dynamic("a?'what? }'", &["a", "what? }"])]);
    }

    #[test]
    fn test_parse_escaped_quote_in_default() {
        let expr = Expression::parse(r"${a?it\'s}").unwrap();
        assert_eq!(expr.segments(), &[dynamic(r"a?it\'s", &["a", "it's"])]);
    }

    #[test]
    fn test_parse_errors() {
        for template in [r"\n", "${a", "${a?'b}", r"${a\x}", "tail\\"] {
            let err = Expression::parse(template).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Parse, "template: {:?}", template);
        }
    }

    #[test]
    fn test_split_alternatives() {
        assert_eq!(split_alternatives("a?b").unwrap(), vec!["a", "b"]);
        assert_eq!(split_alternatives("a??b").unwrap(), vec!["a", "b"]);
        assert_eq!(split_alternatives("'x?y'").unwrap(), vec!["x?y"]);
        assert_eq!(split_alternatives("a'b?c'd").unwrap(), vec!["a'b?c'd"]);
        assert_eq!(split_alternatives("  ").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_parse_scalar() {
        let plain = Scalar::String("no placeholders".into());
        assert_eq!(parse_scalar(&plain).unwrap(), plain);

        let escaped = Scalar::String(r"$\{x}".into());
        assert_eq!(parse_scalar(&escaped).unwrap(), escaped);

        let number = Scalar::Integer(3);
        assert_eq!(parse_scalar(&number).unwrap(), number);

        let templated = parse_scalar(&Scalar::String("${x}".into())).unwrap();
        assert!(templated.is_expression());
    }

    #[test]
    fn test_static_value_concatenation() {
        let expr = Expression::from_segments(
            "${a}-${b}".into(),
            vec![
                Segment::Static(Scalar::Integer(1)),
                text("-"),
                Segment::Static(Scalar::Bool(true)),
            ],
        );
        assert_eq!(expr.to_static_value(), Some(Scalar::String("1-true".into())));

        let single = Expression::from_segments(
            "${a}".into(),
            vec![Segment::Static(Scalar::Integer(8080))],
        );
        assert_eq!(single.to_static_value(), Some(Scalar::Integer(8080)));
    }
}

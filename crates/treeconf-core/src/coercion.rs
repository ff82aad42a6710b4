//! Typed reads
//!
//! A typed accessor first tries a direct conversion of the stored scalar
//! ([`ConfigType::from_scalar`]). String leaves that do not convert directly go
//! through the [`ParserRegistry`]: parsers are tried in registration order and
//! the first one applicable to the requested type wins.

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::path::Path;
use crate::value::{Scalar, Value};

/// Trait for string parsers used by typed accessors
pub trait ValueParser: Send + Sync {
    /// Whether this parser produces values of the type identified by `type_id`
    fn is_applicable(&self, type_id: TypeId, value: &str) -> bool;

    /// Parse `value`. The boxed value must be of the type this parser is applicable to.
    fn parse(&self, value: &str) -> std::result::Result<Box<dyn Any>, String>;

    /// Name of the produced type
    fn type_name(&self) -> &str;
}

/// A simple function-based parser
pub struct FnParser<T, F>
where
    F: Fn(&str) -> std::result::Result<T, String> + Send + Sync,
{
    func: F,
    _type: PhantomData<fn() -> T>,
}

impl<T, F> FnParser<T, F>
where
    F: Fn(&str) -> std::result::Result<T, String> + Send + Sync,
{
    /// Create a new function-based parser
    pub fn new(func: F) -> Self {
        Self {
            func,
            _type: PhantomData,
        }
    }
}

impl<T, F> ValueParser for FnParser<T, F>
where
    T: 'static,
    F: Fn(&str) -> std::result::Result<T, String> + Send + Sync,
{
    fn is_applicable(&self, type_id: TypeId, _value: &str) -> bool {
        type_id == TypeId::of::<T>()
    }

    fn parse(&self, value: &str) -> std::result::Result<Box<dyn Any>, String> {
        (self.func)(value).map(|parsed| Box::new(parsed) as Box<dyn Any>)
    }

    fn type_name(&self) -> &str {
        std::any::type_name::<T>()
    }
}

/// Ordered list of string parsers
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn ValueParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.parsers.iter().map(|parser| parser.type_name()))
            .finish()
    }
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Create a registry with the standard built-in parsers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_parsers();
        registry
    }

    fn register_builtin_parsers(&mut self) {
        self.register_fn(parse_bool);
        self.register_fn(parse_number::<i8>);
        self.register_fn(parse_number::<i16>);
        self.register_fn(parse_number::<i32>);
        self.register_fn(parse_number::<i64>);
        self.register_fn(parse_number::<u8>);
        self.register_fn(parse_number::<u16>);
        self.register_fn(parse_number::<u32>);
        self.register_fn(parse_number::<u64>);
        self.register_fn(parse_number::<usize>);
        self.register_fn(parse_number::<f32>);
        self.register_fn(parse_number::<f64>);
        self.register_fn(parse_decimal);
        self.register_fn(parse_offset_date_time);
        self.register_fn(parse_instant);
        self.register_fn(parse_duration);
        self.register_fn(Locale::parse);
    }

    /// Append a parser. Earlier parsers take precedence.
    pub fn register(&mut self, parser: Arc<dyn ValueParser>) {
        self.parsers.push(parser);
    }

    /// Append a function as a parser for its return type
    pub fn register_fn<T, F>(&mut self, func: F)
    where
        T: 'static,
        F: Fn(&str) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnParser::new(func)));
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Parse `value` read at `path` as `T` with the first applicable parser
    pub fn parse<T: ConfigType>(&self, path: &Path, value: &str) -> Result<T> {
        let type_id = TypeId::of::<T>();
        let parser = self
            .parsers
            .iter()
            .find(|parser| parser.is_applicable(type_id, value))
            .ok_or_else(|| {
                Error::value_conversion(path.to_string(), T::NAME, format!("string ({:?})", value))
                    .with_help(format!("Register a value parser for {}", T::NAME))
            })?;
        log::trace!("Parsing '{}' as {} with {}", path, T::NAME, parser.type_name());

        let parsed = parser.parse(value).map_err(|e| {
            Error::value_conversion(
                path.to_string(),
                T::NAME,
                format!("string ({:?}): {}", value, e),
            )
        })?;
        parsed.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            Error::internal(format!(
                "Parser for {} returned a value of another type",
                parser.type_name()
            ))
        })
    }
}

/// Types readable with the typed accessors
pub trait ConfigType: Sized + 'static {
    /// Name used in conversion errors
    const NAME: &'static str;

    /// Conversion from a stored scalar without string parsing
    fn from_scalar(value: &Scalar) -> Option<Self>;

    /// Conversion from a map or list node
    fn from_node(_node: &Node) -> Option<Self> {
        None
    }
}

/// Convert the node stored at `path` to `T`
pub(crate) fn coerce<T: ConfigType>(registry: &ParserRegistry, path: &Path, node: &Node) -> Result<T> {
    let value = match node {
        Node::Leaf(value) => value,
        container => {
            return T::from_node(container).ok_or_else(|| {
                Error::value_conversion(path.to_string(), T::NAME, container.type_name())
            })
        }
    };
    if let Some(converted) = T::from_scalar(value) {
        return Ok(converted);
    }
    match value {
        Scalar::String(text) => registry.parse::<T>(path, text),
        other => Err(Error::value_conversion(
            path.to_string(),
            T::NAME,
            other.describe(),
        )),
    }
}

impl ConfigType for bool {
    const NAME: &'static str = "bool";

    fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! integer_config_type {
    ($($t:ty),*) => {
        $(
            impl ConfigType for $t {
                const NAME: &'static str = stringify!($t);

                fn from_scalar(value: &Scalar) -> Option<Self> {
                    match value {
                        Scalar::Integer(i) => <$t>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_config_type!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl ConfigType for f64 {
    const NAME: &'static str = "f64";

    fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Float(f) => Some(*f),
            Scalar::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl ConfigType for f32 {
    const NAME: &'static str = "f32";

    fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Float(f) => Some(*f as f32),
            Scalar::Integer(i) => Some(*i as f32),
            _ => None,
        }
    }
}

impl ConfigType for String {
    const NAME: &'static str = "string";

    /// Any resolved scalar reads as its text
    fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Expression(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl ConfigType for Decimal {
    const NAME: &'static str = "decimal";

    fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Integer(i) => Some(Decimal::from(*i)),
            Scalar::Float(f) => Decimal::try_from(*f).ok(),
            _ => None,
        }
    }
}

impl ConfigType for Duration {
    const NAME: &'static str = "duration";

    fn from_scalar(_value: &Scalar) -> Option<Self> {
        None
    }
}

impl ConfigType for DateTime<FixedOffset> {
    const NAME: &'static str = "offset date-time";

    fn from_scalar(_value: &Scalar) -> Option<Self> {
        None
    }
}

impl ConfigType for DateTime<Utc> {
    const NAME: &'static str = "instant";

    fn from_scalar(_value: &Scalar) -> Option<Self> {
        None
    }
}

impl ConfigType for Locale {
    const NAME: &'static str = "locale";

    fn from_scalar(_value: &Scalar) -> Option<Self> {
        None
    }
}

impl ConfigType for Value {
    const NAME: &'static str = "value";

    fn from_scalar(value: &Scalar) -> Option<Self> {
        Some(value.to_value())
    }

    fn from_node(node: &Node) -> Option<Self> {
        Some(node.to_value())
    }
}

/// `true` / `false`, trimmed and case-insensitive
pub fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("Could not parse boolean value: {}", value)),
    }
}

fn parse_number<T>(value: &str) -> std::result::Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|e| e.to_string())
}

fn parse_decimal(value: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| e.to_string())
}

fn parse_offset_date_time(value: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value).map_err(|e| e.to_string())
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_offset_date_time(value).map(|dt| dt.with_timezone(&Utc))
}

static SHORT_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?) *(ms|s|m|h|d)$").expect("valid duration regex")
});

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("valid ISO-8601 duration regex")
});

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// ISO-8601 (`PT1H30M`, `P2D`, `PT0.5S`) or shorthand `<number><unit>` with
/// unit one of `ms`, `s`, `m`, `h`, `d`. Fractional shorthand values are allowed.
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let invalid = || format!("Could not parse duration value: {}", value);
    let text = value.trim();

    if text.starts_with('-') {
        return Err(format!("Negative durations are not supported: {}", value));
    }

    if let Some(caps) = SHORT_DURATION.captures(text) {
        let amount = Decimal::from_str(&caps[1]).map_err(|_| invalid())?;
        let unit_nanos = match &caps[2] {
            "ms" => 1_000_000,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3_600 * NANOS_PER_SECOND,
            _ => 86_400 * NANOS_PER_SECOND,
        };
        return amount
            .checked_mul(Decimal::from(unit_nanos))
            .and_then(nanos_to_duration)
            .ok_or_else(invalid);
    }

    let caps = ISO_DURATION.captures(text).ok_or_else(invalid)?;
    if caps.iter().skip(1).all(|group| group.is_none()) {
        return Err(invalid());
    }
    let component = |index: usize, unit_seconds: u64| -> std::result::Result<Decimal, String> {
        match caps.get(index) {
            Some(m) => Decimal::from_str(m.as_str())
                .ok()
                .and_then(|amount| amount.checked_mul(Decimal::from(unit_seconds * NANOS_PER_SECOND)))
                .ok_or_else(invalid),
            None => Ok(Decimal::ZERO),
        }
    };
    let nanos = [component(1, 86_400)?, component(2, 3_600)?, component(3, 60)?, component(4, 1)?]
        .into_iter()
        .try_fold(Decimal::ZERO, |total, part| total.checked_add(part))
        .ok_or_else(invalid)?;
    nanos_to_duration(nanos).ok_or_else(invalid)
}

fn nanos_to_duration(nanos: Decimal) -> Option<Duration> {
    nanos.trunc().to_u64().map(Duration::from_nanos)
}

/// ISO 639-1 codes accepted as locale languages
const KNOWN_LANGUAGES: &str = "aa ab ae af ak am an ar as av ay az ba be bg bh bi bm bn bo br bs ca \
    ce ch co cr cs cu cv cy da de dv dz ee el en eo es et eu fa ff fi fj fo fr fy ga gd gl gn gu \
    gv ha he hi ho hr ht hu hy hz ia id ie ig ii ik io is it iu ja jv ka kg ki kj kk kl km kn ko \
    kr ks ku kv kw ky la lb lg li ln lo lt lu lv mg mh mi mk ml mn mr ms mt my na nb nd ne ng nl \
    nn no nr nv ny oc oj om or os pa pi pl ps pt qu rm rn ro ru rw sa sc sd se sg si sk sl sm sn \
    so sq sr ss st su sv sw ta te tg th ti tk tl tn to tr ts tt tw ty ug uk ur uz ve vi vo wa wo \
    xh yi yo za zh zu";

/// A validated language tag: `language[-Script][-REGION]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    script: Option<String>,
    region: Option<String>,
}

impl Locale {
    /// Parse a language tag. Underscores are accepted as separators (`en_US`).
    pub fn parse(tag: &str) -> std::result::Result<Self, String> {
        let normalized = tag.trim().replace('_', "-");
        let mut subtags = normalized.split('-');
        let language = subtags.next().unwrap_or_default().to_ascii_lowercase();
        if language.len() != 2 || !KNOWN_LANGUAGES.split_whitespace().any(|l| l == language) {
            return Err(format!("Locale is not available: {}", tag));
        }

        let mut locale = Locale {
            language,
            script: None,
            region: None,
        };
        for subtag in subtags {
            let alphabetic = subtag.chars().all(|c| c.is_ascii_alphabetic());
            let numeric = subtag.chars().all(|c| c.is_ascii_digit());
            if subtag.len() == 4 && alphabetic && locale.script.is_none() && locale.region.is_none() {
                let mut script = subtag.to_ascii_lowercase();
                script[..1].make_ascii_uppercase();
                locale.script = Some(script);
            } else if ((subtag.len() == 2 && alphabetic) || (subtag.len() == 3 && numeric))
                && locale.region.is_none()
            {
                locale.region = Some(subtag.to_ascii_uppercase());
            } else {
                return Err(format!("Invalid locale subtag '{}' in: {}", subtag, tag));
            }
        }
        Ok(locale)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.language)?;
        if let Some(script) = &self.script {
            write!(f, "-{}", script)?;
        }
        if let Some(region) = &self.region {
            write!(f, "-{}", region)?;
        }
        Ok(())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Locale::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn read<T: ConfigType>(scalar: Scalar) -> Result<T> {
        coerce(
            &ParserRegistry::with_builtins(),
            &Path::parse("a.b").unwrap(),
            &Node::Leaf(scalar),
        )
    }

    #[test]
    fn test_direct_conversions() {
        assert_eq!(read::<i64>(Scalar::Integer(8080)).unwrap(), 8080);
        assert_eq!(read::<u16>(Scalar::Integer(8080)).unwrap(), 8080);
        assert_eq!(read::<f64>(Scalar::Integer(2)).unwrap(), 2.0);
        assert!(read::<bool>(Scalar::Bool(true)).unwrap());
        assert_eq!(read::<String>(Scalar::Integer(7)).unwrap(), "7");
        assert_eq!(read::<Decimal>(Scalar::Integer(3)).unwrap(), Decimal::from(3));
    }

    #[test]
    fn test_float_reads_as_decimal_text() {
        assert_eq!(read::<String>(Scalar::Float(1.0)).unwrap(), "1.0");
        assert_eq!(read::<String>(Scalar::Float(0.25)).unwrap(), "0.25");
    }

    #[test]
    fn test_out_of_range_integer_fails() {
        let err = read::<u8>(Scalar::Integer(300)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
        assert_eq!(err.path.as_deref(), Some("a.b"));
    }

    #[test]
    fn test_string_parsing() {
        assert_eq!(read::<i32>("42".into()).unwrap(), 42);
        assert_eq!(read::<f32>("1.5".into()).unwrap(), 1.5);
        assert!(!read::<bool>(" FALSE ".into()).unwrap());
        assert_eq!(
            read::<Decimal>("10.25".into()).unwrap(),
            Decimal::from_str("10.25").unwrap()
        );
    }

    #[test]
    fn test_bool_rejects_other_words() {
        let err = read::<bool>("yes".into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
        assert!(err.to_string().contains("yes"));
    }

    #[test]
    fn test_non_string_mismatch_fails() {
        let err = read::<i64>(Scalar::Bool(true)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
        assert_eq!(err.cause.as_deref(), Some("Got: boolean (true)"));
    }

    #[test]
    fn test_container_conversion() {
        let registry = ParserRegistry::with_builtins();
        let list = Node::List(vec![Arc::new(Node::Leaf(Scalar::Integer(1)))]);
        let path = Path::parse("a").unwrap();
        assert_eq!(
            coerce::<Value>(&registry, &path, &list).unwrap(),
            Value::Sequence(vec![Value::Integer(1)])
        );
        assert!(coerce::<i64>(&registry, &path, &list).is_err());
    }

    #[test]
    fn test_duration_shorthand() {
        assert_eq!(parse_duration("15ms").unwrap(), Duration::from_millis(15));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2 m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("0.5ms").unwrap(), Duration::from_micros(500));
    }

    #[test]
    fn test_duration_iso() {
        assert_eq!(parse_duration("PT1H30M").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("P2D").unwrap(), Duration::from_secs(172_800));
        assert_eq!(parse_duration("PT0.25S").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("pt10s").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_duration_errors() {
        for value in ["", "P", "PT", "10", "10x", "-5s", "-PT1S", "1.s"] {
            assert!(parse_duration(value).is_err(), "value: {:?}", value);
        }
    }

    #[test]
    fn test_locale_parsing() {
        let locale = Locale::parse("en_us").unwrap();
        assert_eq!(locale.to_string(), "en-US");
        assert_eq!(locale.region(), Some("US"));

        let locale = Locale::parse("zh-hant-TW").unwrap();
        assert_eq!(locale.script(), Some("Hant"));
        assert_eq!(locale.to_string(), "zh-Hant-TW");

        assert_eq!(Locale::parse("es-419").unwrap().region(), Some("419"));
    }

    #[test]
    fn test_unavailable_locale() {
        for tag in ["xx", "english", "en-US-extra", ""] {
            assert!(Locale::parse(tag).is_err(), "tag: {:?}", tag);
        }
        let err = read::<Locale>("qq_QQ".into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
    }

    #[test]
    fn test_date_times() {
        let dt = read::<DateTime<FixedOffset>>("2024-03-01T10:00:00+02:00".into()).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 7_200);

        let instant = read::<DateTime<Utc>>("2024-03-01T10:00:00+02:00".into()).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn test_registry_order_first_applicable_wins() {
        let mut registry = ParserRegistry::new();
        registry.register_fn(|_: &str| Ok::<i64, String>(1));
        registry.register_fn(|_: &str| Ok::<i64, String>(2));
        let path = Path::parse("x").unwrap();
        assert_eq!(registry.parse::<i64>(&path, "anything").unwrap(), 1);
    }

    #[test]
    fn test_missing_parser() {
        let registry = ParserRegistry::new();
        let err = registry
            .parse::<Duration>(&Path::parse("x").unwrap(), "1s")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
        assert!(err.help.unwrap().contains("duration"));
    }
}

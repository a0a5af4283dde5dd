//! Rule expressions
//!
//! A rule expression is a `|`-separated list of rules, each written as
//! `name` or `name:param1,param2`, e.g. `required|email` or
//! `starts_with:192|ipv4`.

use regex::Regex;
use thiserror::Error;

/// Errors raised while parsing a rule expression
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("unknown validation rule '{name}'")]
    UnknownRule { name: String },

    #[error("validation rule '{rule}' requires {expected} parameter(s), got {found}")]
    ParameterCount {
        rule: String,
        expected: usize,
        found: usize,
    },

    #[error("validation rule '{rule}' expects a number, got '{value}'")]
    InvalidNumber { rule: String, value: String },

    #[error("invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// A numeric rule parameter, keeping its written form for messages
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub raw: String,
}

impl Bound {
    fn parse(rule: &str, raw: &str) -> Result<Self, RuleError> {
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| RuleError::InvalidNumber {
                rule: rule.to_string(),
                value: raw.to_string(),
            })?;
        Ok(Self {
            value,
            raw: raw.trim().to_string(),
        })
    }
}

/// One parsed validation rule
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Nullable,
    String,
    Integer,
    Numeric,
    Boolean,
    Array,
    Email,
    Url,
    Uuid,
    Ip,
    Ipv4,
    Ipv6,
    Alpha,
    AlphaNum,
    AlphaDash,
    StartsWith(Vec<String>),
    EndsWith(Vec<String>),
    Gt(Bound),
    Gte(Bound),
    Lt(Bound),
    Lte(Bound),
    Min(Bound),
    Max(Bound),
    Between(Bound, Bound),
    Size(Bound),
    In(Vec<String>),
    NotIn(Vec<String>),
    Regex(Regex),
    Date,
    DateFormat(String),
    File,
}

impl Rule {
    /// Parse a single rule such as `gt:42`
    pub fn parse(raw: &str) -> Result<Self, RuleError> {
        let (name, params) = match raw.split_once(':') {
            Some((name, params)) => (name.trim(), Some(params)),
            None => (raw.trim(), None),
        };

        let list = |expected_min: usize| -> Result<Vec<String>, RuleError> {
            let values: Vec<String> = params
                .map(|p| p.split(',').map(|v| v.trim().to_string()).collect())
                .unwrap_or_default();
            if values.len() < expected_min || values.iter().all(|v| v.is_empty()) {
                return Err(RuleError::ParameterCount {
                    rule: name.to_string(),
                    expected: expected_min,
                    found: values.iter().filter(|v| !v.is_empty()).count(),
                });
            }
            Ok(values)
        };

        let bound = || -> Result<Bound, RuleError> {
            let values = list(1)?;
            if values.len() != 1 {
                return Err(RuleError::ParameterCount {
                    rule: name.to_string(),
                    expected: 1,
                    found: values.len(),
                });
            }
            Bound::parse(name, &values[0])
        };

        let rule = match name {
            "required" => Rule::Required,
            "nullable" => Rule::Nullable,
            "string" => Rule::String,
            "integer" | "int" => Rule::Integer,
            "numeric" => Rule::Numeric,
            "boolean" | "bool" => Rule::Boolean,
            "array" => Rule::Array,
            "email" => Rule::Email,
            "url" => Rule::Url,
            "uuid" => Rule::Uuid,
            "ip" => Rule::Ip,
            "ipv4" => Rule::Ipv4,
            "ipv6" => Rule::Ipv6,
            "alpha" => Rule::Alpha,
            "alpha_num" => Rule::AlphaNum,
            "alpha_dash" => Rule::AlphaDash,
            "starts_with" => Rule::StartsWith(list(1)?),
            "ends_with" => Rule::EndsWith(list(1)?),
            "gt" => Rule::Gt(bound()?),
            "gte" => Rule::Gte(bound()?),
            "lt" => Rule::Lt(bound()?),
            "lte" => Rule::Lte(bound()?),
            "min" => Rule::Min(bound()?),
            "max" => Rule::Max(bound()?),
            "size" => Rule::Size(bound()?),
            "between" => {
                let values = list(2)?;
                if values.len() != 2 {
                    return Err(RuleError::ParameterCount {
                        rule: name.to_string(),
                        expected: 2,
                        found: values.len(),
                    });
                }
                Rule::Between(Bound::parse(name, &values[0])?, Bound::parse(name, &values[1])?)
            }
            "in" => Rule::In(list(1)?),
            "not_in" => Rule::NotIn(list(1)?),
            "regex" => {
                let pattern = params.unwrap_or_default();
                Rule::Regex(compile_pattern(pattern)?)
            }
            "date" => Rule::Date,
            "date_format" => match params {
                Some(format) if !format.is_empty() => Rule::DateFormat(format.to_string()),
                _ => {
                    return Err(RuleError::ParameterCount {
                        rule: name.to_string(),
                        expected: 1,
                        found: 0,
                    });
                }
            },
            "file" => Rule::File,
            other => {
                return Err(RuleError::UnknownRule {
                    name: other.to_string(),
                });
            }
        };

        Ok(rule)
    }

    /// Rules that run even when the value is null
    pub fn is_implicit(&self) -> bool {
        matches!(self, Rule::Required)
    }
}

/// Accepts both `/pattern/flags` and bare patterns
fn compile_pattern(pattern: &str) -> Result<Regex, RuleError> {
    let source = match pattern.strip_prefix('/') {
        Some(rest) => match rest.rfind('/') {
            Some(end) => {
                let (body, flags) = (&rest[..end], &rest[end + 1..]);
                if flags.is_empty() {
                    body.to_string()
                } else {
                    format!("(?{}){}", flags, body)
                }
            }
            None => pattern.to_string(),
        },
        None => pattern.to_string(),
    };

    Regex::new(&source).map_err(|e| RuleError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Parsed form of a rule expression, in declaration order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn parse(expression: &str) -> Result<Self, RuleError> {
        let rules = expression
            .split('|')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Rule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_nullable(&self) -> bool {
        self.rules.iter().any(|r| matches!(r, Rule::Nullable))
    }

    /// Whether string values should be sized as numbers
    pub fn is_numeric(&self) -> bool {
        self.rules
            .iter()
            .any(|r| matches!(r, Rule::Numeric | Rule::Integer))
    }
}

/// Join rule expressions into one, preserving order
pub fn join_rules<I, S>(expressions: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    expressions
        .into_iter()
        .map(|e| e.as_ref().trim().to_string())
        .filter(|e| !e.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

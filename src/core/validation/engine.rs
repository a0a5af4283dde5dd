//! Rule evaluation engine
//!
//! [`RuleEngine`] evaluates rule expressions against argument values and
//! produces Laravel-style, human-readable messages such as
//! "The foo must be a valid email address.".

use super::rules::{Bound, Rule, RuleError, RuleSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use validator::{ValidateEmail, ValidateIp, ValidateUrl};

/// Failure messages per field, in evaluation order
///
/// An empty map means every rule passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Messages recorded for one field
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.fields.iter()
    }
}

impl IntoIterator for ValidationErrors {
    type Item = (String, Vec<String>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// The rule-evaluation collaborator used by validated parameters
///
/// Implementations must be safe for concurrent read-only use.
pub trait RuleEvaluator: Send + Sync {
    /// Check the syntax of a rule expression
    fn check(&self, expression: &str) -> Result<(), RuleError>;

    /// Evaluate `rules` (field -> expression) against `data` (field -> value)
    ///
    /// A field missing from `data` is evaluated as null.
    fn evaluate(
        &self,
        data: &IndexMap<String, Value>,
        rules: &IndexMap<String, String>,
    ) -> ValidationErrors;
}

/// Default rule engine
///
/// Parsed rule sets are cached by expression, so rules checked at schema
/// build time are not parsed again per request. Clones share the cache.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    custom_messages: IndexMap<String, String>,
    parsed: Arc<RwLock<HashMap<String, Arc<RuleSet>>>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the message of a rule
    ///
    /// `key` is either `field.rule` (e.g. `foo.email`) or a bare rule name
    /// applying to every field. The message may use `:attribute`.
    pub fn with_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.custom_messages.insert(key.into(), message.into());
        self
    }

    /// Number of distinct rule expressions parsed so far
    pub fn cached_rule_sets(&self) -> usize {
        self.parsed.read().map(|parsed| parsed.len()).unwrap_or(0)
    }

    fn rule_set(&self, expression: &str) -> Result<Arc<RuleSet>, RuleError> {
        if let Some(set) = self
            .parsed
            .read()
            .ok()
            .and_then(|parsed| parsed.get(expression).cloned())
        {
            return Ok(set);
        }

        let set = Arc::new(RuleSet::parse(expression)?);
        match self.parsed.write() {
            Ok(mut parsed) => Ok(parsed
                .entry(expression.to_string())
                .or_insert(set)
                .clone()),
            Err(e) => {
                tracing::warn!(error = %e, "Rule cache unavailable");
                Ok(set)
            }
        }
    }

    fn evaluate_field(&self, field: &str, value: &Value, set: &RuleSet, errors: &mut ValidationErrors) {
        if value.is_null() && set.is_nullable() {
            return;
        }

        for rule in set.rules() {
            if value.is_null() && !rule.is_implicit() {
                continue;
            }
            if let Some(message) = check_rule(rule, value, set.is_numeric()) {
                errors.add(field, self.render(field, rule_name(rule), message));
            }
        }
    }

    fn render(&self, field: &str, rule: &str, default: String) -> String {
        let template = self
            .custom_messages
            .get(&format!("{}.{}", field, rule))
            .or_else(|| self.custom_messages.get(rule))
            .cloned()
            .unwrap_or(default);
        template.replace(":attribute", &display_attribute(field))
    }
}

impl RuleEvaluator for RuleEngine {
    fn check(&self, expression: &str) -> Result<(), RuleError> {
        self.rule_set(expression).map(|_| ())
    }

    fn evaluate(
        &self,
        data: &IndexMap<String, Value>,
        rules: &IndexMap<String, String>,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        for (field, expression) in rules {
            let set = match self.rule_set(expression) {
                Ok(set) => set,
                Err(e) => {
                    tracing::warn!(field = %field, error = %e, "Skipping unparseable rule expression");
                    errors.add(field.clone(), format!("The {} rules are invalid: {}.", display_attribute(field), e));
                    continue;
                }
            };
            let value = data.get(field).unwrap_or(&Value::Null);
            self.evaluate_field(field, value, &set, &mut errors);
        }

        errors
    }
}

fn display_attribute(field: &str) -> String {
    field.replace('_', " ")
}

fn rule_name(rule: &Rule) -> &'static str {
    match rule {
        Rule::Required => "required",
        Rule::Nullable => "nullable",
        Rule::String => "string",
        Rule::Integer => "integer",
        Rule::Numeric => "numeric",
        Rule::Boolean => "boolean",
        Rule::Array => "array",
        Rule::Email => "email",
        Rule::Url => "url",
        Rule::Uuid => "uuid",
        Rule::Ip => "ip",
        Rule::Ipv4 => "ipv4",
        Rule::Ipv6 => "ipv6",
        Rule::Alpha => "alpha",
        Rule::AlphaNum => "alpha_num",
        Rule::AlphaDash => "alpha_dash",
        Rule::StartsWith(_) => "starts_with",
        Rule::EndsWith(_) => "ends_with",
        Rule::Gt(_) => "gt",
        Rule::Gte(_) => "gte",
        Rule::Lt(_) => "lt",
        Rule::Lte(_) => "lte",
        Rule::Min(_) => "min",
        Rule::Max(_) => "max",
        Rule::Between(_, _) => "between",
        Rule::Size(_) => "size",
        Rule::In(_) => "in",
        Rule::NotIn(_) => "not_in",
        Rule::Regex(_) => "regex",
        Rule::Date => "date",
        Rule::DateFormat(_) => "date_format",
        Rule::File => "file",
    }
}

/// How a value is measured by size rules
enum Measure {
    Numeric(f64),
    Characters(f64),
    Items(f64),
}

impl Measure {
    fn of(value: &Value, numeric: bool) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Measure::Numeric),
            Value::String(s) if numeric => s.trim().parse().ok().map(Measure::Numeric),
            Value::String(s) => Some(Measure::Characters(s.chars().count() as f64)),
            Value::Array(items) => Some(Measure::Items(items.len() as f64)),
            Value::Object(map) => Some(Measure::Items(map.len() as f64)),
            _ => None,
        }
    }

    fn amount(&self) -> f64 {
        match self {
            Measure::Numeric(v) | Measure::Characters(v) | Measure::Items(v) => *v,
        }
    }

    /// Unit suffix appended to range messages
    fn suffix(&self) -> &'static str {
        match self {
            Measure::Numeric(_) => "",
            Measure::Characters(_) => " characters",
            Measure::Items(_) => " items",
        }
    }
}

/// Scalar rendering used by string rules
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => n.as_i64().is_some_and(|i| i == 0 || i == 1),
        Value::String(s) => matches!(s.as_str(), "0" | "1"),
        _ => false,
    }
}

fn is_date(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn matches_format(text: &str, format: &str) -> bool {
    DateTime::parse_from_str(text, format).is_ok()
        || NaiveDateTime::parse_from_str(text, format).is_ok()
        || NaiveDate::parse_from_str(text, format).is_ok()
        || NaiveTime::parse_from_str(text, format).is_ok()
}

/// Returns the default message template when `rule` fails for `value`
fn check_rule(rule: &Rule, value: &Value, numeric: bool) -> Option<String> {
    let text = as_text(value);

    match rule {
        Rule::Required => {
            let missing = match value {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                Value::Array(a) => a.is_empty(),
                _ => false,
            };
            missing.then(|| "The :attribute field is required.".to_string())
        }
        Rule::Nullable => None,
        Rule::String => (!value.is_string()).then(|| "The :attribute must be a string.".to_string()),
        Rule::Integer => (!is_integer(value)).then(|| "The :attribute must be an integer.".to_string()),
        Rule::Numeric => (!is_numeric(value)).then(|| "The :attribute must be a number.".to_string()),
        Rule::Boolean => {
            (!is_boolean(value)).then(|| "The :attribute field must be true or false.".to_string())
        }
        Rule::Array => (!(value.is_array() || value.is_object()))
            .then(|| "The :attribute must be an array.".to_string()),
        Rule::Email => {
            let ok = value.as_str().is_some_and(|s| s.to_string().validate_email());
            (!ok).then(|| "The :attribute must be a valid email address.".to_string())
        }
        Rule::Url => {
            let ok = value.as_str().is_some_and(|s| s.to_string().validate_url());
            (!ok).then(|| "The :attribute must be a valid URL.".to_string())
        }
        Rule::Uuid => {
            let ok = value.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok());
            (!ok).then(|| "The :attribute must be a valid UUID.".to_string())
        }
        Rule::Ip => {
            let ok = value.as_str().is_some_and(|s| s.to_string().validate_ip());
            (!ok).then(|| "The :attribute must be a valid IP address.".to_string())
        }
        Rule::Ipv4 => {
            let ok = value.as_str().is_some_and(|s| s.to_string().validate_ipv4());
            (!ok).then(|| "The :attribute must be a valid IPv4 address.".to_string())
        }
        Rule::Ipv6 => {
            let ok = value.as_str().is_some_and(|s| s.to_string().validate_ipv6());
            (!ok).then(|| "The :attribute must be a valid IPv6 address.".to_string())
        }
        Rule::Alpha => {
            let ok = value
                .as_str()
                .is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphabetic));
            (!ok).then(|| "The :attribute must only contain letters.".to_string())
        }
        Rule::AlphaNum => {
            let ok = text
                .as_deref()
                .is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphanumeric));
            (!ok).then(|| "The :attribute must only contain letters and numbers.".to_string())
        }
        Rule::AlphaDash => {
            let ok = text.as_deref().is_some_and(|s| {
                !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            });
            (!ok).then(|| {
                "The :attribute must only contain letters, numbers, dashes and underscores."
                    .to_string()
            })
        }
        Rule::StartsWith(prefixes) => {
            let ok = text
                .as_deref()
                .is_some_and(|s| prefixes.iter().any(|p| s.starts_with(p.as_str())));
            (!ok).then(|| {
                format!(
                    "The :attribute must start with one of the following: {}.",
                    prefixes.join(", ")
                )
            })
        }
        Rule::EndsWith(suffixes) => {
            let ok = text
                .as_deref()
                .is_some_and(|s| suffixes.iter().any(|p| s.ends_with(p.as_str())));
            (!ok).then(|| {
                format!(
                    "The :attribute must end with one of the following: {}.",
                    suffixes.join(", ")
                )
            })
        }
        Rule::Gt(bound) => compare(value, numeric, bound, |a, b| a > b, &GT),
        Rule::Gte(bound) => compare(value, numeric, bound, |a, b| a >= b, &GTE),
        Rule::Lt(bound) => compare(value, numeric, bound, |a, b| a < b, &LT),
        Rule::Lte(bound) => compare(value, numeric, bound, |a, b| a <= b, &LTE),
        Rule::Min(bound) => compare(value, numeric, bound, |a, b| a >= b, &MIN),
        Rule::Max(bound) => compare(value, numeric, bound, |a, b| a <= b, &MAX),
        Rule::Between(low, high) => {
            let measure = Measure::of(value, numeric);
            let ok = measure
                .as_ref()
                .is_some_and(|m| m.amount() >= low.value && m.amount() <= high.value);
            if ok {
                return None;
            }
            let suffix = measure.map(|m| m.suffix()).unwrap_or_default();
            Some(format!(
                "The :attribute must be between {} and {}{}.",
                low.raw, high.raw, suffix
            ))
        }
        Rule::Size(bound) => {
            let measure = Measure::of(value, numeric);
            let ok = measure.as_ref().is_some_and(|m| m.amount() == bound.value);
            if ok {
                return None;
            }
            match measure {
                Some(Measure::Items(_)) => {
                    Some(format!("The :attribute must contain {} items.", bound.raw))
                }
                Some(Measure::Characters(_)) => {
                    Some(format!("The :attribute must be {} characters.", bound.raw))
                }
                _ => Some(format!("The :attribute must be {}.", bound.raw)),
            }
        }
        Rule::In(allowed) => {
            let ok = text.as_ref().is_some_and(|s| allowed.contains(s));
            (!ok).then(|| "The selected :attribute is invalid.".to_string())
        }
        Rule::NotIn(denied) => {
            let ok = text.as_ref().is_none_or(|s| !denied.contains(s));
            (!ok).then(|| "The selected :attribute is invalid.".to_string())
        }
        Rule::Regex(re) => {
            let ok = text.as_deref().is_some_and(|s| re.is_match(s));
            (!ok).then(|| "The :attribute format is invalid.".to_string())
        }
        Rule::Date => {
            let ok = value.as_str().is_some_and(is_date);
            (!ok).then(|| "The :attribute is not a valid date.".to_string())
        }
        Rule::DateFormat(format) => {
            let ok = value.as_str().is_some_and(|s| matches_format(s, format));
            (!ok).then(|| format!("The :attribute does not match the format {}.", format))
        }
        // Resolved argument values are never uploaded files.
        Rule::File => Some("The :attribute must be a file.".to_string()),
    }
}

/// Message templates of a size comparison, one per kind of measure
struct SizeMessages {
    numeric: &'static str,
    characters: &'static str,
    items: &'static str,
}

const GT: SizeMessages = SizeMessages {
    numeric: "The :attribute must be greater than :value.",
    characters: "The :attribute must be greater than :value characters.",
    items: "The :attribute must have more than :value items.",
};

const GTE: SizeMessages = SizeMessages {
    numeric: "The :attribute must be greater than or equal to :value.",
    characters: "The :attribute must be greater than or equal to :value characters.",
    items: "The :attribute must have :value items or more.",
};

const LT: SizeMessages = SizeMessages {
    numeric: "The :attribute must be less than :value.",
    characters: "The :attribute must be less than :value characters.",
    items: "The :attribute must have less than :value items.",
};

const LTE: SizeMessages = SizeMessages {
    numeric: "The :attribute must be less than or equal to :value.",
    characters: "The :attribute must be less than or equal to :value characters.",
    items: "The :attribute must not have more than :value items.",
};

const MIN: SizeMessages = SizeMessages {
    numeric: "The :attribute must be at least :value.",
    characters: "The :attribute must be at least :value characters.",
    items: "The :attribute must have at least :value items.",
};

const MAX: SizeMessages = SizeMessages {
    numeric: "The :attribute must not be greater than :value.",
    characters: "The :attribute must not be greater than :value characters.",
    items: "The :attribute must not have more than :value items.",
};

fn compare(
    value: &Value,
    numeric: bool,
    bound: &Bound,
    passes: impl Fn(f64, f64) -> bool,
    messages: &SizeMessages,
) -> Option<String> {
    let measure = Measure::of(value, numeric);
    if measure.as_ref().is_some_and(|m| passes(m.amount(), bound.value)) {
        return None;
    }

    let template = match measure {
        Some(Measure::Characters(_)) => messages.characters,
        Some(Measure::Items(_)) => messages.items,
        _ => messages.numeric,
    };
    Some(template.replace(":value", &bound.raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluate(field: &str, value: Value, expression: &str) -> Vec<String> {
        let engine = RuleEngine::new();
        let data = IndexMap::from([(field.to_string(), value)]);
        let rules = IndexMap::from([(field.to_string(), expression.to_string())]);
        engine.evaluate(&data, &rules).get(field).to_vec()
    }

    #[test]
    fn test_email_message() {
        assert_eq!(
            evaluate("foo", json!("notanemail"), "email"),
            vec!["The foo must be a valid email address."]
        );
        assert!(evaluate("foo", json!("valid@email.com"), "email").is_empty());
    }

    #[test]
    fn test_gt_message_for_numbers() {
        assert_eq!(
            evaluate("bar", json!(12), "gt:42"),
            vec!["The bar must be greater than 42."]
        );
        assert!(evaluate("bar", json!(43), "gt:42").is_empty());
    }

    #[test]
    fn test_every_failing_rule_is_reported_in_order() {
        assert_eq!(
            evaluate("foo", json!("255.255.255.256"), "starts_with:192|ipv4"),
            vec![
                "The foo must start with one of the following: 192.",
                "The foo must be a valid IPv4 address."
            ]
        );
        assert_eq!(
            evaluate("foo", json!("192.168.1.256"), "starts_with:192|ipv4"),
            vec!["The foo must be a valid IPv4 address."]
        );
        assert!(evaluate("foo", json!("192.168.1.1"), "starts_with:192|ipv4").is_empty());
    }

    #[test]
    fn test_size_rules_by_kind() {
        assert_eq!(
            evaluate("name", json!("ab"), "min:3"),
            vec!["The name must be at least 3 characters."]
        );
        assert_eq!(
            evaluate("tags", json!([1, 2, 3]), "max:2"),
            vec!["The tags must not have more than 2 items."]
        );
        assert_eq!(
            evaluate("age", json!(200), "max:150"),
            vec!["The age must not be greater than 150."]
        );
        assert_eq!(
            evaluate("age", json!("12"), "numeric|between:18,65"),
            vec!["The age must be between 18 and 65."]
        );
        assert!(evaluate("code", json!("abcd"), "size:4").is_empty());
    }

    #[test]
    fn test_null_only_fails_required() {
        assert!(evaluate("foo", Value::Null, "email|gt:3").is_empty());
        assert_eq!(
            evaluate("foo", Value::Null, "required|email"),
            vec!["The foo field is required."]
        );
        assert!(evaluate("foo", Value::Null, "nullable|required").is_empty());
    }

    #[test]
    fn test_missing_field_is_null() {
        let engine = RuleEngine::new();
        let rules = IndexMap::from([("foo".to_string(), "required".to_string())]);
        let errors = engine.evaluate(&IndexMap::new(), &rules);
        assert_eq!(errors.get("foo"), ["The foo field is required."]);
    }

    #[test]
    fn test_attribute_underscores_become_spaces() {
        assert_eq!(
            evaluate("first_name", json!(""), "required"),
            vec!["The first name field is required."]
        );
    }

    #[test]
    fn test_custom_messages() {
        let engine = RuleEngine::new()
            .with_message("foo.email", "Give :attribute a real address")
            .with_message("required", "Missing :attribute");
        let data = IndexMap::from([("foo".to_string(), json!("nope"))]);
        let rules = IndexMap::from([
            ("foo".to_string(), "email".to_string()),
            ("bar".to_string(), "required".to_string()),
        ]);
        let errors = engine.evaluate(&data, &rules);
        assert_eq!(errors.get("foo"), ["Give foo a real address"]);
        assert_eq!(errors.get("bar"), ["Missing bar"]);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_misc_rules() {
        assert!(evaluate("id", json!("67e55044-10b1-426f-9247-bb680e5fe0c8"), "uuid").is_empty());
        assert!(!evaluate("id", json!("nope"), "uuid").is_empty());
        assert!(evaluate("kind", json!("b"), "in:a,b").is_empty());
        assert_eq!(
            evaluate("kind", json!("c"), "in:a,b"),
            vec!["The selected kind is invalid."]
        );
        assert!(evaluate("day", json!("2024-02-29"), "date").is_empty());
        assert!(!evaluate("day", json!("2023-02-29"), "date").is_empty());
        assert!(evaluate("day", json!("29/02/2024"), "date_format:%d/%m/%Y").is_empty());
        assert!(evaluate("slug", json!("a-b_c"), "alpha_dash").is_empty());
        assert!(!evaluate("slug", json!("a b"), "alpha_dash").is_empty());
        assert!(evaluate("n", json!(3), "integer").is_empty());
        assert!(!evaluate("n", json!("x"), "integer").is_empty());
        assert!(evaluate("flag", json!(true), "boolean").is_empty());
        assert!(evaluate("site", json!("https://example.com"), "url").is_empty());
        assert!(evaluate("code", json!("AB12"), "regex:/^[A-Z]{2}[0-9]{2}$/").is_empty());
    }

    #[test]
    fn test_check_reports_syntax_errors() {
        let engine = RuleEngine::new();
        assert!(engine.check("email|gt:42").is_ok());
        assert!(engine.check("email|bogus").is_err());
        assert_eq!(engine.cached_rule_sets(), 1);
    }

    #[test]
    fn test_checked_rules_are_parsed_once() {
        let engine = RuleEngine::new();
        engine.check("regex:/^[A-Z]{2}$/|required").unwrap();
        let first = engine.rule_set("regex:/^[A-Z]{2}$/|required").unwrap();

        let data = IndexMap::from([("code".to_string(), json!("abc"))]);
        let rules = IndexMap::from([("code".to_string(), "regex:/^[A-Z]{2}$/|required".to_string())]);
        for _ in 0..3 {
            let errors = engine.clone().evaluate(&data, &rules);
            assert_eq!(errors.get("code"), ["The code format is invalid."]);
        }

        assert_eq!(engine.cached_rule_sets(), 1);
        let again = engine.rule_set("regex:/^[A-Z]{2}$/|required").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
}

//! Declarative input schemas.
//!
//! A [`Schema`] describes the expected shape of one request location: which
//! fields exist, their types, whether they are required, and per-field
//! constraints (length, range, pattern, format). Validation is pure and
//! collects every failing field rather than stopping at the first.
//!
//! # Example
//!
//! ```
//! use marquee_core::Location;
//! use marquee_middleware::schema::{FieldSchema, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .required("title", FieldSchema::string().max_length(80))
//!     .optional("year", FieldSchema::integer().range(1888, 2077))
//!     .build()
//!     .unwrap();
//!
//! assert!(schema.validate(Location::Body, &json!({"title": "Heat"})).is_ok());
//!
//! let err = schema.validate(Location::Body, &json!({"year": 1700})).unwrap_err();
//! assert!(err.names_field("title"));
//! assert!(err.names_field("year"));
//! ```

use std::fmt;

use marquee_core::{FieldError, Location, ValidationError};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Error building a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field pattern is not a valid regular expression.
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        /// The field carrying the pattern.
        field: String,
        /// The regex compile error.
        #[source]
        source: regex::Error,
    },

    /// The same field was declared twice.
    #[error("field '{0}' declared more than once")]
    DuplicateField(String),
}

/// The JSON type a field must have.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// A JSON string.
    String,
    /// A JSON integer.
    Integer,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// An array whose items all match the inner field schema.
    Array(Box<FieldSchema>),
    /// A single value or an array of values matching the inner schema.
    ///
    /// Validated output is always normalized to an array.
    OneOrMany(Box<FieldSchema>),
    /// A JSON object.
    Object,
    /// Anything.
    Any,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Array(item) => write!(f, "array of {}", item.ty),
            Self::OneOrMany(item) => write!(f, "{} or array of {}", item.ty, item.ty),
            Self::Object => f.write_str("object"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// A string format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// An absolute URI with scheme and authority.
    Uri,
}

/// Constraints for one field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    ty: FieldType,
    min_length: Option<usize>,
    max_length: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    pattern: Option<String>,
    compiled: Option<Regex>,
    format: Option<Format>,
}

impl FieldSchema {
    /// A field of the given type with no constraints.
    #[must_use]
    pub fn of(ty: FieldType) -> Self {
        Self {
            ty,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            pattern: None,
            compiled: None,
            format: None,
        }
    }

    /// A string field.
    #[must_use]
    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    /// An integer field.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    /// A number field.
    #[must_use]
    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    /// A boolean field.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    /// An array field whose items match `item`.
    #[must_use]
    pub fn array(item: Self) -> Self {
        Self::of(FieldType::Array(Box::new(item)))
    }

    /// A single value or an array of values matching `item`.
    #[must_use]
    pub fn one_or_many(item: Self) -> Self {
        Self::of(FieldType::OneOrMany(Box::new(item)))
    }

    /// Minimum string length in characters (or array length).
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// Maximum string length in characters (or array length).
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Inclusive numeric lower bound.
    #[must_use]
    pub fn minimum(mut self, min: i64) -> Self {
        self.minimum = Some(min as f64);
        self
    }

    /// Inclusive numeric upper bound.
    #[must_use]
    pub fn maximum(mut self, max: i64) -> Self {
        self.maximum = Some(max as f64);
        self
    }

    /// Inclusive numeric range.
    #[must_use]
    pub fn range(self, min: i64, max: i64) -> Self {
        self.minimum(min).maximum(max)
    }

    /// Regular expression the whole string must match.
    ///
    /// Compiled when the schema is built.
    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Format check for string values.
    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Returns the field type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    fn compile(&mut self, field: &str) -> Result<(), SchemaError> {
        if let Some(pattern) = &self.pattern {
            let anchored = format!("^(?:{pattern})$");
            let regex = Regex::new(&anchored).map_err(|source| SchemaError::InvalidPattern {
                field: field.to_string(),
                source,
            })?;
            self.compiled = Some(regex);
        }
        match &mut self.ty {
            FieldType::Array(item) | FieldType::OneOrMany(item) => item.compile(field),
            _ => Ok(()),
        }
    }

    /// Checks `value` and returns the normalized value or the field errors.
    fn check(&self, field: &str, value: &Value, coerce: bool, errors: &mut Vec<FieldError>) -> Option<Value> {
        let value = if coerce { coerce_scalar(&self.ty, value) } else { value.clone() };

        match &self.ty {
            FieldType::Array(item) => {
                let Some(items) = value.as_array() else {
                    errors.push(type_error(field, &self.ty));
                    return None;
                };
                self.check_length(field, items.len(), errors);
                return check_items(field, item, items, coerce, errors).map(Value::Array);
            }
            FieldType::OneOrMany(item) => {
                let items = match value {
                    Value::Array(items) => items,
                    single => vec![single],
                };
                return check_items(field, item, &items, coerce, errors).map(Value::Array);
            }
            _ => {}
        }

        if !matches_type(&value, &self.ty) {
            errors.push(type_error(field, &self.ty));
            return None;
        }

        let before = errors.len();
        if let Some(s) = value.as_str() {
            self.check_length(field, s.chars().count(), errors);
            if let Some(regex) = &self.compiled {
                if !regex.is_match(s) {
                    errors.push(FieldError::new(
                        field,
                        format!("{field} does not match the required format"),
                        "PATTERN_MISMATCH",
                    ));
                }
            }
            if self.format == Some(Format::Uri) && !is_absolute_uri(s) {
                errors.push(FieldError::new(
                    field,
                    format!("{field} must be an absolute URI"),
                    "INVALID_FORMAT",
                ));
            }
        }
        if let Some(n) = value.as_f64() {
            let below = self.minimum.is_some_and(|min| n < min);
            let above = self.maximum.is_some_and(|max| n > max);
            if below || above {
                errors.push(FieldError::new(
                    field,
                    format!("{field} is out of range{}", describe_range(self.minimum, self.maximum)),
                    "OUT_OF_RANGE",
                ));
            }
        }

        (errors.len() == before).then_some(value)
    }

    fn check_length(&self, field: &str, len: usize, errors: &mut Vec<FieldError>) {
        if let Some(min) = self.min_length {
            if len < min {
                errors.push(FieldError::new(
                    field,
                    format!("{field} must be at least {min} long"),
                    "TOO_SHORT",
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                errors.push(FieldError::new(
                    field,
                    format!("{field} must be at most {max} long"),
                    "TOO_LONG",
                ));
            }
        }
    }
}

fn check_items(
    field: &str,
    item: &FieldSchema,
    items: &[Value],
    coerce: bool,
    errors: &mut Vec<FieldError>,
) -> Option<Vec<Value>> {
    let before = errors.len();
    let checked: Vec<Value> = items
        .iter()
        .enumerate()
        .filter_map(|(i, v)| item.check(&format!("{field}[{i}]"), v, coerce, errors))
        .collect();
    (errors.len() == before).then_some(checked)
}

fn matches_type(value: &Value, ty: &FieldType) -> bool {
    match ty {
        FieldType::String => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array(_) | FieldType::OneOrMany(_) => value.is_array(),
        FieldType::Object => value.is_object(),
        FieldType::Any => true,
    }
}

/// Path and query values arrive as strings; parse them when the field wants
/// a scalar of another type.
fn coerce_scalar(ty: &FieldType, value: &Value) -> Value {
    let Some(s) = value.as_str() else {
        return value.clone();
    };
    let parsed = match ty {
        FieldType::Integer => s.parse::<i64>().ok().map(Value::from),
        FieldType::Number => s.parse::<f64>().ok().map(Value::from),
        FieldType::Boolean => s.parse::<bool>().ok().map(Value::from),
        _ => None,
    };
    parsed.unwrap_or_else(|| value.clone())
}

fn type_error(field: &str, ty: &FieldType) -> FieldError {
    FieldError::new(field, format!("{field} must be {ty}"), "INVALID_TYPE")
}

fn describe_range(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!(" ({min}..={max})"),
        (Some(min), None) => format!(" (>= {min})"),
        (None, Some(max)) => format!(" (<= {max})"),
        (None, None) => String::new(),
    }
}

fn is_absolute_uri(s: &str) -> bool {
    s.parse::<http::Uri>()
        .is_ok_and(|uri| uri.scheme().is_some() && uri.authority().is_some())
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    required: bool,
    schema: FieldSchema,
}

/// An object schema for one request location.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
    allow_additional: bool,
}

impl Schema {
    /// Creates a schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// A schema that accepts any object.
    #[must_use]
    pub fn any() -> Self {
        Self {
            fields: Vec::new(),
            allow_additional: true,
        }
    }

    /// Returns the declared field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns true if `name` is declared and required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name && f.required)
    }

    /// Validates `input` for `location`.
    ///
    /// Path and query inputs have their string values coerced to the declared
    /// scalar type. On success returns the normalized object.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn validate(&self, location: Location, input: &Value) -> Result<Value, ValidationError> {
        let Some(object) = input.as_object() else {
            return Err(ValidationError::single(
                location,
                FieldError::new("", format!("request {location} must be a JSON object"), "NOT_AN_OBJECT"),
            ));
        };

        let coerce = matches!(location, Location::Path | Location::Query);
        let mut errors = Vec::new();
        let mut output = Map::new();

        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.push(FieldError::new(
                            &field.name,
                            format!("{} is required", field.name),
                            "FIELD_REQUIRED",
                        ));
                    }
                }
                Some(value) => {
                    if let Some(checked) = field.schema.check(&field.name, value, coerce, &mut errors) {
                        output.insert(field.name.clone(), checked);
                    }
                }
            }
        }

        for (key, value) in object {
            if self.fields.iter().any(|f| &f.name == key) {
                continue;
            }
            if self.allow_additional {
                output.insert(key.clone(), value.clone());
            } else {
                errors.push(FieldError::new(
                    key,
                    format!("{key} is not allowed"),
                    "UNKNOWN_FIELD",
                ));
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(output))
        } else {
            Err(ValidationError::new(location, errors))
        }
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
    allow_additional: bool,
}

impl SchemaBuilder {
    /// Declares a required field.
    #[must_use]
    pub fn required(mut self, name: &str, schema: FieldSchema) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            required: true,
            schema,
        });
        self
    }

    /// Declares an optional field.
    #[must_use]
    pub fn optional(mut self, name: &str, schema: FieldSchema) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            required: false,
            schema,
        });
        self
    }

    /// Sets whether undeclared fields are accepted.
    #[must_use]
    pub fn allow_additional(mut self, allow: bool) -> Self {
        self.allow_additional = allow;
        self
    }

    /// Compiles patterns and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` for an invalid pattern or a duplicate field.
    pub fn build(mut self) -> Result<Schema, SchemaError> {
        for i in 0..self.fields.len() {
            let (seen, rest) = self.fields.split_at_mut(i);
            let field = &mut rest[0];
            if seen.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            field.schema.compile(&field.name)?;
        }
        Ok(Schema {
            fields: self.fields,
            allow_additional: self.allow_additional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn id_schema() -> Schema {
        Schema::builder()
            .required("movieId", FieldSchema::string().pattern("[0-9a-fA-F]{24}"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_required_and_unknown_fields() {
        let schema = Schema::builder()
            .required("title", FieldSchema::string())
            .build()
            .unwrap();

        let err = schema
            .validate(Location::Body, &json!({"rating": 5}))
            .unwrap_err();
        assert_eq!(err.location, Location::Body);
        let codes: Vec<_> = err.fields.iter().map(|f| (f.field.as_str(), f.code.as_str())).collect();
        assert_eq!(codes, vec![("title", "FIELD_REQUIRED"), ("rating", "UNKNOWN_FIELD")]);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let schema = Schema::builder()
            .required("title", FieldSchema::string())
            .optional("year", FieldSchema::integer())
            .build()
            .unwrap();
        let err = schema
            .validate(Location::Body, &json!({"title": null, "year": null}))
            .unwrap_err();
        assert_eq!(err.fields.len(), 1);
        assert!(err.names_field("title"));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = id_schema().validate(Location::Body, &json!([1, 2])).unwrap_err();
        assert_eq!(err.fields[0].code, "NOT_AN_OBJECT");
    }

    #[test]
    fn test_string_constraints() {
        let schema = Schema::builder()
            .required("title", FieldSchema::string().min_length(1).max_length(5))
            .required("cover", FieldSchema::string().format(Format::Uri))
            .build()
            .unwrap();

        let err = schema
            .validate(Location::Body, &json!({"title": "too long", "cover": "not a uri"}))
            .unwrap_err();
        let codes: Vec<_> = err.fields.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["TOO_LONG", "INVALID_FORMAT"]);

        assert!(schema
            .validate(Location::Body, &json!({"title": "Heat", "cover": "https://img.example.com/a.jpg"}))
            .is_ok());
    }

    #[test]
    fn test_numeric_range_and_type() {
        let schema = Schema::builder()
            .required("year", FieldSchema::integer().range(1888, 2077))
            .build()
            .unwrap();
        assert!(schema.validate(Location::Body, &json!({"year": 1888})).is_ok());
        assert!(schema.validate(Location::Body, &json!({"year": 2077})).is_ok());
        let err = schema.validate(Location::Body, &json!({"year": 2078})).unwrap_err();
        assert_eq!(err.fields[0].code, "OUT_OF_RANGE");
        let err = schema.validate(Location::Body, &json!({"year": "1999"})).unwrap_err();
        assert_eq!(err.fields[0].code, "INVALID_TYPE");
    }

    #[test]
    fn test_query_strings_are_coerced() {
        let schema = Schema::builder()
            .optional("limit", FieldSchema::integer().range(1, 100))
            .build()
            .unwrap();
        let out = schema.validate(Location::Query, &json!({"limit": "10"})).unwrap();
        assert_eq!(out, json!({"limit": 10}));
        assert!(schema.validate(Location::Query, &json!({"limit": "ten"})).is_err());
    }

    #[test]
    fn test_array_items_checked() {
        let schema = Schema::builder()
            .optional("tags", FieldSchema::array(FieldSchema::string().max_length(3)))
            .build()
            .unwrap();
        let err = schema
            .validate(Location::Body, &json!({"tags": ["ok", "toolong"]}))
            .unwrap_err();
        assert_eq!(err.fields[0].field, "tags[1]");
        assert_eq!(err.fields[0].code, "TOO_LONG");
    }

    #[test]
    fn test_one_or_many_normalizes_to_array() {
        let schema = Schema::builder()
            .optional("tags", FieldSchema::one_or_many(FieldSchema::string()))
            .build()
            .unwrap();
        let single = schema.validate(Location::Query, &json!({"tags": "action"})).unwrap();
        assert_eq!(single, json!({"tags": ["action"]}));
        let many = schema
            .validate(Location::Query, &json!({"tags": ["action", "drama"]}))
            .unwrap();
        assert_eq!(many, json!({"tags": ["action", "drama"]}));
    }

    #[test]
    fn test_allow_additional_passes_through() {
        let schema = Schema::any();
        let out = schema.validate(Location::Body, &json!({"x": 1})).unwrap();
        assert_eq!(out, json!({"x": 1}));
    }

    #[test]
    fn test_build_errors() {
        let err = Schema::builder()
            .required("id", FieldSchema::string().pattern("[unclosed"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));

        let err = Schema::builder()
            .required("id", FieldSchema::string())
            .optional("id", FieldSchema::string())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(name) if name == "id"));
    }

    #[test]
    fn test_pattern_is_anchored() {
        let schema = id_schema();
        let padded = format!("x{}x", "a".repeat(24));
        assert!(schema.validate(Location::Path, &json!({"movieId": padded})).is_err());
    }

    proptest! {
        #[test]
        fn prop_movie_id_pattern(id in "[0-9a-zA-Z]{0,30}") {
            let expected = id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit());
            let result = id_schema().validate(Location::Path, &json!({"movieId": id}));
            prop_assert_eq!(result.is_ok(), expected);
        }
    }
}

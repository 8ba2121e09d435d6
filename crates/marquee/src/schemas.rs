//! Input schemas for the movie routes.

use std::sync::Arc;

use marquee_middleware::{FieldSchema, Format, Schema, SchemaError, MOVIE_ID_PARAM};

/// Movie identifiers are 24 hex characters.
pub const MOVIE_ID_PATTERN: &str = "[0-9a-fA-F]{24}";

/// Earliest accepted release year.
pub const MIN_YEAR: i64 = 1888;

/// Latest accepted release year.
pub const MAX_YEAR: i64 = 2077;

/// The compiled schemas shared by every route that needs them.
#[derive(Debug, Clone)]
pub struct MovieSchemas {
    /// `{movieId}` path parameter.
    pub movie_id: Arc<Schema>,
    /// Body of a create: every field but `tags` is required.
    pub create: Arc<Schema>,
    /// Body of an update or replace: every field is optional.
    pub update: Arc<Schema>,
}

impl MovieSchemas {
    /// Compiles all movie schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn compile() -> Result<Self, SchemaError> {
        Ok(Self {
            movie_id: Arc::new(movie_id_schema()?),
            create: Arc::new(movie_body_schema(true)?),
            update: Arc::new(movie_body_schema(false)?),
        })
    }
}

fn movie_id_schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .required(MOVIE_ID_PARAM, FieldSchema::string().pattern(MOVIE_ID_PATTERN))
        .build()
}

fn movie_body_schema(create: bool) -> Result<Schema, SchemaError> {
    let fields = [
        ("title", FieldSchema::string().max_length(80)),
        ("year", FieldSchema::integer().range(MIN_YEAR, MAX_YEAR)),
        ("cover", FieldSchema::string().format(Format::Uri)),
        ("description", FieldSchema::string().max_length(300)),
        ("duration", FieldSchema::integer().maximum(300)),
        ("contentRating", FieldSchema::string().max_length(5)),
        ("source", FieldSchema::string().format(Format::Uri)),
    ];

    let builder = fields
        .into_iter()
        .fold(Schema::builder(), |builder, (name, field)| {
            if create {
                builder.required(name, field)
            } else {
                builder.optional(name, field)
            }
        });

    builder.optional("tags", tags_field()).build()
}

fn tags_field() -> FieldSchema {
    FieldSchema::array(FieldSchema::string().max_length(50))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::Location;
    use serde_json::json;

    fn schemas() -> MovieSchemas {
        MovieSchemas::compile().unwrap()
    }

    fn complete() -> serde_json::Value {
        json!({
            "title": "Metropolis",
            "year": 1927,
            "cover": "https://img.example.com/metropolis.jpg",
            "description": "A futuristic city.",
            "duration": 153,
            "contentRating": "NR",
            "source": "https://stream.example.com/metropolis",
            "tags": ["silent", "sci-fi"]
        })
    }

    #[test]
    fn test_movie_id() {
        let schema = schemas().movie_id;
        assert!(schema
            .validate(Location::Path, &json!({"movieId": "5d9f1140fc13ae1f8d000001"}))
            .is_ok());

        for bad in ["5d9f1140fc13ae1f8d00000", "5d9f1140fc13ae1f8d0000zz", "5d9f1140fc13ae1f8d0000011"] {
            let err = schema.validate(Location::Path, &json!({"movieId": bad})).unwrap_err();
            assert!(err.names_field("movieId"), "{bad}");
        }
    }

    #[test]
    fn test_create_accepts_complete_movie() {
        assert!(schemas().create.validate(Location::Body, &complete()).is_ok());
    }

    #[test]
    fn test_create_requires_all_but_tags() {
        let schema = schemas().create;

        let mut body = complete();
        body.as_object_mut().unwrap().remove("tags");
        assert!(schema.validate(Location::Body, &body).is_ok());

        body.as_object_mut().unwrap().remove("source");
        let err = schema.validate(Location::Body, &body).unwrap_err();
        assert!(err.names_field("source"));
    }

    #[test]
    fn test_field_constraints() {
        let schema = schemas().create;
        let cases = [
            ("title", json!("x".repeat(81))),
            ("year", json!(1887)),
            ("year", json!(2078)),
            ("cover", json!("not a uri")),
            ("duration", json!(301)),
            ("contentRating", json!("PG-13+")),
            ("tags[0]", json!(["y".repeat(51)])),
        ];

        for (field, value) in cases {
            let mut body = complete();
            body[field.trim_end_matches("[0]")] = value;
            let err = schema.validate(Location::Body, &body).unwrap_err();
            assert!(err.names_field(field), "{field}");
        }
    }

    #[test]
    fn test_update_allows_partial_but_not_unknown() {
        let schema = schemas().update;
        assert!(schema.validate(Location::Body, &json!({"year": 1999})).is_ok());
        assert!(schema.validate(Location::Body, &json!({})).is_ok());

        let err = schema
            .validate(Location::Body, &json!({"rating": 5}))
            .unwrap_err();
        assert!(err.names_field("rating"));
    }
}

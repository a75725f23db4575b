//! Response content deserialization

use serde::de::DeserializeOwned;

use crate::error::{HttpError, Result};

/// Turns response text into a typed value
pub trait ContentDeserializer {
    /// Deserialize `content` into `T`
    fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T>;
}

/// [`ContentDeserializer`] backed by `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl ContentDeserializer for JsonDeserializer {
    fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        serde_json::from_str(content).map_err(HttpError::from)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Movie {
        title: String,
        year: u16,
    }

    #[test]
    fn test_json_deserializer() {
        let movie: Movie = JsonDeserializer
            .deserialize(r#"{"title":"Heat","year":1995}"#)
            .expect("Valid movie");

        assert_eq!(
            movie,
            Movie {
                title: "Heat".to_string(),
                year: 1995
            }
        );
    }

    #[test]
    fn test_json_deserializer_error() {
        let result: Result<Movie> = JsonDeserializer.deserialize(r#"{"title":"Heat"}"#);
        assert!(matches!(result, Err(HttpError::Deserialization(_))));
    }
}

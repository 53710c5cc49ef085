//! Collection response envelopes

use serde_json::Value;

use crate::api::error::{Error, Result};

/// One page of a collection response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    /// Raw item fragments, in server order
    pub items: Vec<Value>,
    /// Continuation link reported by the server, if any
    pub next_link: Option<String>,
}

impl QueryResponse {
    /// Parse a response body in any of the envelopes the two dialects use:
    ///
    /// - `{"value": [...], "@odata.nextLink": "..."}` (Graph, SharePoint nometadata)
    /// - `{"d": {"results": [...], "__next": "..."}}` (SharePoint verbose)
    /// - `{"d": {...}}` (SharePoint verbose, single entity)
    pub fn parse(body: &[u8]) -> Result<Self> {
        let json: Value = serde_json::from_slice(body)
            .map_err(|e| Error::parse(format!("response is not JSON: {}", e)))?;

        let Value::Object(mut root) = json else {
            return Err(Error::parse("response is not a JSON object"));
        };

        if let Some(value) = root.remove("value") {
            let Value::Array(items) = value else {
                return Err(Error::parse("'value' is not an array"));
            };
            let next_link = root
                .get("@odata.nextLink")
                .or_else(|| root.get("odata.nextLink"))
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok(Self { items, next_link });
        }

        if let Some(Value::Object(mut d)) = root.remove("d") {
            let next_link = d.get("__next").and_then(Value::as_str).map(str::to_string);
            return match d.remove("results") {
                Some(Value::Array(items)) => Ok(Self { items, next_link }),
                Some(_) => Err(Error::parse("'d.results' is not an array")),
                None => Ok(Self {
                    items: vec![Value::Object(d)],
                    next_link: None,
                }),
            };
        }

        Err(Error::parse(
            "response has neither a 'value' array nor a 'd' envelope",
        ))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_envelope_with_next_link() {
        let body = br#"{"@odata.context":"x","value":[{"id":"1"},{"id":"2"}],"@odata.nextLink":"https://graph/next"}"#;
        let response = QueryResponse::parse(body).unwrap();
        assert_eq!(response.len(), 2);
        assert_eq!(response.next_link.as_deref(), Some("https://graph/next"));
        assert!(response.has_more());
    }

    #[test]
    fn test_verbose_envelopes() {
        let body = br#"{"d":{"results":[{"Id":1}],"__next":"https://sp/next"}}"#;
        let response = QueryResponse::parse(body).unwrap();
        assert_eq!(response.items[0]["Id"], 1);
        assert_eq!(response.next_link.as_deref(), Some("https://sp/next"));

        let single = QueryResponse::parse(br#"{"d":{"Id":7,"Title":"Site"}}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.items[0]["Title"], "Site");
        assert!(!single.has_more());
    }

    #[test]
    fn test_empty_collection() {
        let response = QueryResponse::parse(br#"{"value":[]}"#).unwrap();
        assert!(response.is_empty());
        assert!(!response.has_more());
    }

    #[test]
    fn test_malformed_bodies_are_parse_errors() {
        for body in [
            "not json",
            "[1,2]",
            r#"{"value":{}}"#,
            r#"{"something":"else"}"#,
        ] {
            assert!(matches!(
                QueryResponse::parse(body.as_bytes()),
                Err(Error::Parse(_))
            ));
        }
    }
}

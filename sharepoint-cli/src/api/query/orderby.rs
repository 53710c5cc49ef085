//! Ordering terms for `$orderby`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_odata(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// One ordering term; earlier terms take precedence over later ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Parse `Field` or `Field:desc` / `Field:asc`
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (field, direction) = match spec.rsplit_once(':') {
            Some((field, dir)) => match dir.to_ascii_lowercase().as_str() {
                "asc" => (field, Direction::Ascending),
                "desc" => (field, Direction::Descending),
                other => return Err(format!("unknown sort direction '{}'", other)),
            },
            None => (spec, Direction::Ascending),
        };

        if field.is_empty() {
            return Err(format!("missing field name in '{}'", spec));
        }

        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_spec() {
        assert_eq!(OrderBy::parse("Title").unwrap(), OrderBy::asc("Title"));
        assert_eq!(OrderBy::parse("Created:DESC").unwrap(), OrderBy::desc("Created"));
        assert!(OrderBy::parse("Title:up").is_err());
        assert!(OrderBy::parse(":desc").is_err());
    }
}

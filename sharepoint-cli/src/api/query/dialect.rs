//! Per-dialect rendering rules
//!
//! SharePoint REST and Graph agree on most of OData; where they differ
//! (literal syntax, expansion syntax, accepted media type) the difference is
//! captured here as data so the translator itself never branches on dialect.

use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use super::expand::{ExpansionStrategy, GRAPH_EXPANSION, SHAREPOINT_EXPANSION};
use super::filters::FilterValue;

/// OData backend a model collection is queried through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[serde(alias = "sharepoint")]
    SharePointRest,
    Graph,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::SharePointRest => "sharepoint",
            Dialect::Graph => "graph",
        }
    }

    pub(crate) fn rules(self) -> &'static DialectRules {
        match self {
            Dialect::SharePointRest => &SHAREPOINT_RULES,
            Dialect::Graph => &GRAPH_RULES,
        }
    }

    /// `Accept` header value for collection requests
    pub fn accept_header(self) -> &'static str {
        self.rules().accept
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::SharePointRest => write!(f, "SharePoint REST"),
            Dialect::Graph => write!(f, "Microsoft Graph"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sharepoint" | "sharepoint_rest" | "sp" | "rest" => Ok(Dialect::SharePointRest),
            "graph" | "msgraph" => Ok(Dialect::Graph),
            other => Err(format!(
                "unknown dialect '{}', expected 'sharepoint' or 'graph'",
                other
            )),
        }
    }
}

/// Prefix/suffix wrapped around a literal's canonical text
#[derive(Debug, Clone, Copy)]
pub(crate) struct Wrap {
    prefix: &'static str,
    suffix: &'static str,
}

impl Wrap {
    const BARE: Wrap = Wrap {
        prefix: "",
        suffix: "",
    };

    const fn typed(prefix: &'static str) -> Wrap {
        Wrap { prefix, suffix: "'" }
    }

    fn apply(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }
}

/// Literal syntax table
#[derive(Debug)]
pub(crate) struct LiteralSyntax {
    guid: Wrap,
    datetime: Wrap,
}

impl LiteralSyntax {
    /// Render a literal, or explain why it cannot be rendered
    pub(crate) fn render(&self, value: &FilterValue) -> Result<String, String> {
        Ok(match value {
            FilterValue::Null => "null".to_string(),
            FilterValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Float(f) if !f.is_finite() => {
                return Err(format!("{} has no OData representation", f));
            }
            FilterValue::Float(f) => f.to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::DateTime(dt) => self
                .datetime
                .apply(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            FilterValue::Guid(g) => self.guid.apply(&g.to_string()),
        })
    }
}

/// Everything that differs between the two OData targets
pub(crate) struct DialectRules {
    pub(crate) literals: LiteralSyntax,
    pub(crate) expansion: &'static dyn ExpansionStrategy,
    accept: &'static str,
}

static SHAREPOINT_RULES: DialectRules = DialectRules {
    literals: LiteralSyntax {
        guid: Wrap::typed("guid'"),
        datetime: Wrap::typed("datetime'"),
    },
    expansion: &SHAREPOINT_EXPANSION,
    accept: "application/json;odata=nometadata",
};

static GRAPH_RULES: DialectRules = DialectRules {
    literals: LiteralSyntax {
        guid: Wrap::BARE,
        datetime: Wrap::BARE,
    },
    expansion: &GRAPH_EXPANSION,
    accept: "application/json",
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn render(dialect: Dialect, value: FilterValue) -> String {
        dialect.rules().literals.render(&value).unwrap()
    }

    #[test]
    fn test_string_quotes_are_doubled() {
        for dialect in [Dialect::SharePointRest, Dialect::Graph] {
            assert_eq!(render(dialect, "O'Neil".into()), "'O''Neil'");
        }
    }

    #[test]
    fn test_guid_literals_differ_by_dialect() {
        let id = Uuid::parse_str("1e1a939f-60b2-2000-98a6-d25d3d400a3a").unwrap();
        assert_eq!(
            render(Dialect::SharePointRest, id.into()),
            "guid'1e1a939f-60b2-2000-98a6-d25d3d400a3a'"
        );
        assert_eq!(
            render(Dialect::Graph, id.into()),
            "1e1a939f-60b2-2000-98a6-d25d3d400a3a"
        );
    }

    #[test]
    fn test_datetime_literals_use_fixed_iso_form() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(
            render(Dialect::SharePointRest, dt.into()),
            "datetime'2024-03-01T08:30:00Z'"
        );
        assert_eq!(render(Dialect::Graph, dt.into()), "2024-03-01T08:30:00Z");
    }

    #[test]
    fn test_scalar_literals() {
        assert_eq!(render(Dialect::Graph, true.into()), "true");
        assert_eq!(render(Dialect::Graph, false.into()), "false");
        assert_eq!(render(Dialect::Graph, 42i64.into()), "42");
        assert_eq!(render(Dialect::Graph, 2.5f64.into()), "2.5");
        assert_eq!(render(Dialect::Graph, FilterValue::Null), "null");
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let err = Dialect::Graph
            .rules()
            .literals
            .render(&FilterValue::Float(f64::NAN))
            .unwrap_err();
        assert!(err.contains("NaN"));
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("sp".parse::<Dialect>().unwrap(), Dialect::SharePointRest);
        assert_eq!("Graph".parse::<Dialect>().unwrap(), Dialect::Graph);
        assert!("soap".parse::<Dialect>().is_err());
    }
}

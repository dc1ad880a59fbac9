//! Structural document filters.
//!
//! A [`Filter`] is a plain value: two filters that accept the same documents
//! by construction compare equal once normalized, which lets the facet phase
//! batch global collectors that share a filter into a single index scan.

use crate::index::leaf::LeafContext;
use crate::{Error, Result};
use roaring::RoaringBitmap;
use std::fmt;
use tantivy::query::{AllQuery, BooleanQuery, EnableScoring, Occur, Query, TermQuery, Weight};
use tantivy::schema::{IndexRecordOption, Schema};
use tantivy::{DocSet, Searcher, Term, TERMINATED};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermValue {
    Str(String),
    U64(u64),
    I64(i64),
    Bool(bool),
}

impl From<&str> for TermValue {
    fn from(value: &str) -> Self {
        TermValue::Str(value.to_string())
    }
}

impl From<String> for TermValue {
    fn from(value: String) -> Self {
        TermValue::Str(value)
    }
}

impl From<u64> for TermValue {
    fn from(value: u64) -> Self {
        TermValue::U64(value)
    }
}

impl From<i64> for TermValue {
    fn from(value: i64) -> Self {
        TermValue::I64(value)
    }
}

impl From<bool> for TermValue {
    fn from(value: bool) -> Self {
        TermValue::Bool(value)
    }
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermValue::Str(s) => write!(f, "{}", s),
            TermValue::U64(v) => write!(f, "{}", v),
            TermValue::I64(v) => write!(f, "{}", v),
            TermValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Filter {
    MatchAll,
    Term { field: String, value: TermValue },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn term(field: impl Into<String>, value: impl Into<TermValue>) -> Self {
        Filter::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Filter::MatchAll)
    }

    /// Canonical form used as a grouping key.
    ///
    /// Nested groups of the same kind are flattened, children are sorted and
    /// deduplicated, `MatchAll` is absorbed, and double negation is removed.
    pub fn normalize(&self) -> Filter {
        match self {
            Filter::MatchAll | Filter::Term { .. } => self.clone(),
            Filter::Not(inner) => match inner.normalize() {
                Filter::Not(positive) => *positive,
                other => Filter::Not(Box::new(other)),
            },
            Filter::And(children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalize() {
                        Filter::MatchAll => {}
                        Filter::And(grand) => flat.extend(grand),
                        other => flat.push(other),
                    }
                }
                collapse(flat, Filter::MatchAll, Filter::And)
            }
            Filter::Or(children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalize() {
                        Filter::MatchAll => return Filter::MatchAll,
                        Filter::Or(grand) => flat.extend(grand),
                        other => flat.push(other),
                    }
                }
                collapse(flat, Filter::Or(Vec::new()), Filter::Or)
            }
        }
    }

    /// Compiles the filter into a Tantivy query against `schema`.
    pub fn to_query(&self, schema: &Schema) -> Result<Box<dyn Query>> {
        let query: Box<dyn Query> = match self {
            Filter::MatchAll => Box::new(AllQuery),
            Filter::Term { field, value } => {
                let field = schema.get_field(field).map_err(|_| {
                    Error::InvalidFilter(format!("unknown field [{}]", field))
                })?;
                let term = match value {
                    TermValue::Str(s) => Term::from_field_text(field, s),
                    TermValue::U64(v) => Term::from_field_u64(field, *v),
                    TermValue::I64(v) => Term::from_field_i64(field, *v),
                    TermValue::Bool(v) => Term::from_field_bool(field, *v),
                };
                Box::new(TermQuery::new(term, IndexRecordOption::Basic))
            }
            Filter::And(children) if children.is_empty() => Box::new(AllQuery),
            Filter::And(children) => Box::new(BooleanQuery::intersection(
                children
                    .iter()
                    .map(|child| child.to_query(schema))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Filter::Or(children) => Box::new(BooleanQuery::union(
                children
                    .iter()
                    .map(|child| child.to_query(schema))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Filter::Not(inner) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                (Occur::MustNot, inner.to_query(schema)?),
            ])),
        };
        Ok(query)
    }

    /// Prepares the filter for per-segment evaluation.
    pub fn weight(&self, searcher: &Searcher) -> Result<FilterWeight> {
        let normalized = self.normalize();
        if normalized.is_match_all() {
            return Ok(FilterWeight {
                weight: None,
                description: normalized.to_string(),
            });
        }

        let query = normalized.to_query(searcher.schema())?;
        let weight = query.weight(EnableScoring::disabled_from_searcher(searcher))?;
        Ok(FilterWeight {
            weight: Some(weight),
            description: normalized.to_string(),
        })
    }
}

fn collapse(mut children: Vec<Filter>, empty: Filter, group: fn(Vec<Filter>) -> Filter) -> Filter {
    children.sort();
    children.dedup();
    match children.len() {
        0 => empty,
        1 => children.remove(0),
        _ => group(children),
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::MatchAll => write!(f, "*"),
            Filter::Term { field, value } => write!(f, "{}:{}", field, value),
            Filter::And(children) => write_group(f, children, " AND "),
            Filter::Or(children) => write_group(f, children, " OR "),
            Filter::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Filter], separator: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", child)?;
    }
    write!(f, ")")
}

/// A filter compiled against one searcher.
pub struct FilterWeight {
    weight: Option<Box<dyn Weight>>,
    description: String,
}

impl FilterWeight {
    /// Live documents of `leaf` accepted by the filter.
    pub fn leaf_docs(&self, leaf: &LeafContext<'_>) -> Result<RoaringBitmap> {
        let weight = match &self.weight {
            Some(weight) => weight,
            None => return Ok(leaf.alive_docs()),
        };

        let mut scorer = weight.scorer(leaf.reader(), 1.0)?;
        let mut docs = RoaringBitmap::new();
        let mut doc = scorer.doc();
        while doc != TERMINATED {
            if leaf.is_alive(doc) {
                docs.insert(doc);
            }
            doc = scorer.advance();
        }
        Ok(docs)
    }
}

impl fmt::Debug for FilterWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterWeight")
            .field("filter", &self.description)
            .finish()
    }
}

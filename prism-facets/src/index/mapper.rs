use crate::index::filter::Filter;

/// Resolves the type-scoping filter of a request.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    type_field: String,
}

impl TypeMapper {
    pub fn new(type_field: impl Into<String>) -> Self {
        Self {
            type_field: type_field.into(),
        }
    }

    pub fn type_field(&self) -> &str {
        &self.type_field
    }

    /// Filter restricting a search to `types`, or `None` when the request spans all types.
    pub fn search_filter(&self, types: &[String]) -> Option<Filter> {
        match types {
            [] => None,
            [single] => Some(Filter::term(self.type_field.clone(), single.as_str())),
            many => Some(Filter::or(
                many.iter()
                    .map(|t| Filter::term(self.type_field.clone(), t.as_str()))
                    .collect(),
            )),
        }
    }
}

//! Query-string and URL construction
//!
//! CouchDB expects booleans as `true`/`false` and keys as JSON, so every
//! parameter goes through [`QueryValue`] before it is percent-encoded.

use url::Url;

use crate::error::CoreError;

/// A value that can appear in a query string. `None` means "leave it out".
pub trait QueryValue {
    fn render(&self) -> Option<String>;
}

impl QueryValue for bool {
    fn render(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl QueryValue for str {
    fn render(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl QueryValue for String {
    fn render(&self) -> Option<String> {
        Some(self.clone())
    }
}

macro_rules! impl_query_value_for_int {
    ($($t:ty),*) => {
        $(impl QueryValue for $t {
            fn render(&self) -> Option<String> {
                Some(self.to_string())
            }
        })*
    };
}

impl_query_value_for_int!(u8, u16, u32, u64, usize, i32, i64);

/// JSON values (view keys) are sent as compact JSON
impl QueryValue for serde_json::Value {
    fn render(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// Lists of strings render as `["a","b"]`
impl QueryValue for Vec<String> {
    fn render(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl<T: QueryValue> QueryValue for Option<T> {
    fn render(&self) -> Option<String> {
        self.as_ref().and_then(QueryValue::render)
    }
}

impl<T: QueryValue + ?Sized> QueryValue for &T {
    fn render(&self) -> Option<String> {
        (**self).render()
    }
}

/// Ordered list of query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Query::push`]
    pub fn with(mut self, key: &str, value: impl QueryValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl QueryValue) {
        if let Some(rendered) = value.render() {
            self.pairs.push((key.to_string(), rendered));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Append percent-encoded path segments and the query to `base`
pub fn build_url<S: AsRef<str>>(base: &Url, segments: &[S], query: &Query) -> Result<Url, CoreError> {
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().map_err(|()| {
            CoreError::InvalidArgument(format!("{} cannot be used as a base URL", base))
        })?;
        path.pop_if_empty();
        path.extend(segments.iter());
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.pairs.iter());
    }
    Ok(url)
}

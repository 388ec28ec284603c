//! Form body encoding for API calls
//!
//! Bodies are `key=value` pairs joined with `&`, in insertion order, with no
//! percent-escaping. Values are sent exactly as supplied; the signature is
//! computed over these same bytes.

/// Ordered call arguments; `None` values are dropped when encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    pairs: Vec<(String, Option<String>)>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required argument
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), Some(value.into())));
        self
    }

    /// Add an argument that is omitted from the body when `None`
    pub fn opt<V: Into<String>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.pairs.push((key.into(), value.map(Into::into)));
        self
    }

    /// Whether the given key is present with a value
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, v)| k == key && v.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.iter().all(|(_, v)| v.is_none())
    }

    /// Encode with `nonce` as the leading field; an existing `nonce`
    /// argument is replaced so the body carries exactly one
    pub fn encode_with_nonce(&self, nonce: &str) -> String {
        let mut body = format!("nonce={nonce}");
        for (key, value) in self.present().filter(|(k, _)| *k != "nonce") {
            body.push('&');
            body.push_str(key);
            body.push('=');
            body.push_str(value);
        }
        body
    }

    /// Encode as a form body
    pub fn encode(&self) -> String {
        self.present()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}

impl<K, V, const N: usize> From<[(K, Option<V>); N]> for QueryArgs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, Option<V>); N]) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |args, (k, v)| args.opt(k, v))
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for QueryArgs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |args, (k, v)| args.opt(k, v))
    }
}

use url::form_urlencoded;

/// Field names the client fills in itself
pub const RESERVED_KEYS: [&str; 4] = ["user", "function", "sign", "authmode"];

/// Ordered request arguments for an API function.
///
/// API functions take untyped positional arguments named `param1`,
/// `param2`, ... whose meaning depends on the function being called.
/// `Params` keeps them in insertion order, which is also the order they are
/// signed and transmitted in.
///
/// ```
/// use rsclient::Params;
///
/// let params = Params::new().arg("12").arg("title");
/// assert_eq!(params.to_query(), "param1=12&param2=title");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    fields: Vec<(String, String)>,
    next_position: usize,
}

impl Params {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of positional values
    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values.into_iter().fold(Params::new(), |params, value| params.arg(value))
    }

    /// Append the next positional argument
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.push_arg(value);
        self
    }

    /// Append the next positional argument in place
    pub fn push_arg(&mut self, value: impl Into<String>) {
        self.next_position += 1;
        self.fields
            .push((format!("param{}", self.next_position), value.into()));
    }

    /// Append a named field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Append a named field in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// First reserved field name the caller supplied, if any
    pub fn reserved_key(&self) -> Option<&str> {
        self.iter()
            .map(|(k, _)| k)
            .find(|k| RESERVED_KEYS.contains(k))
    }

    /// Form-encode the fields in order
    pub fn to_query(&self) -> String {
        canonical_query(self.iter())
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Form-encode key/value pairs in the order given.
///
/// No sorting is applied: the signer and the transmitter must see the same
/// sequence. An empty input yields an empty string.
pub fn canonical_query<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

//! Typed query-string parameters.
//!
//! Values are restricted to primitives or flat lists of primitives so that
//! nothing structured can be smuggled into a query string.

use std::fmt;

/// A single primitive query value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Str(s) => f.write_str(s),
            Primitive::Int(i) => write!(f, "{}", i),
            Primitive::Float(x) => write!(f, "{}", x),
            Primitive::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    One(Primitive),
    Many(Vec<Primitive>),
}

macro_rules! primitive_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(v: $ty) -> Self {
                    Primitive::$variant($conv(v))
                }
            }

            impl From<$ty> for QueryValue {
                fn from(v: $ty) -> Self {
                    QueryValue::One(Primitive::from(v))
                }
            }
        )*
    };
}

primitive_from! {
    String => Str(|v| v),
    &str => Str(|v: &str| v.to_string()),
    &String => Str(|v: &String| v.clone()),
    i64 => Int(|v| v),
    i32 => Int(i64::from),
    u32 => Int(i64::from),
    f64 => Float(|v| v),
    f32 => Float(f64::from),
    bool => Bool(|v| v),
}

impl<T: Into<Primitive>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::Many(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered query parameters. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Inserts `value` only when present; `None` leaves the parameter out.
    pub fn insert_opt<V: Into<QueryValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merges `other` into `self`; keys from `other` win.
    pub fn extend(&mut self, other: QueryParams) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens to string pairs, repeating the key once per list element.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match value {
                QueryValue::One(p) => pairs.push((key.clone(), p.to_string())),
                QueryValue::Many(items) => {
                    pairs.extend(items.iter().map(|p| (key.clone(), p.to_string())))
                }
            }
        }
        pairs
    }
}

use linked_hash_map::LinkedHashMap;

/// The value of a GFF3 column-9 attribute.
///
/// The source format treats an attribute as either a single string or a
/// comma-separated list interchangeably (`spec.md` §9, "Dynamic typing of
/// attribute values"); this tagged variant models that directly instead of
/// silently coercing one into the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Scalar(String),
    List(Vec<String>),
}

impl AttrValue {
    /// Parses a raw (already percent-decoded) attribute value: a comma
    /// present anywhere in the value means it is list-valued (`spec.md`
    /// §4.1).
    pub fn from_raw(raw: &str) -> AttrValue {
        if raw.contains(',') {
            AttrValue::List(raw.split(',').map(|v| v.to_owned()).collect())
        } else {
            AttrValue::Scalar(raw.to_owned())
        }
    }

    /// The first (or only) value, for call sites that only care about one.
    pub fn first(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(s) => Some(s.as_str()),
            AttrValue::List(vs) => vs.first().map(|s| s.as_str()),
        }
    }

    pub fn as_list(&self) -> Vec<&str> {
        match self {
            AttrValue::Scalar(s) => vec![s.as_str()],
            AttrValue::List(vs) => vs.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Joins list values with `,`; returns the scalar verbatim otherwise.
    pub fn joined(&self) -> String {
        match self {
            AttrValue::Scalar(s) => s.clone(),
            AttrValue::List(vs) => vs.join(","),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, AttrValue::List(_))
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Scalar(s)
    }
}

impl<'a> From<&'a str> for AttrValue {
    fn from(s: &'a str) -> Self {
        AttrValue::Scalar(s.to_owned())
    }
}

/// Ordered attribute mapping (`spec.md` §3: "an ordered mapping from
/// attribute name to either a single string value or an ordered list").
///
/// Grounded on the teacher's use of `LinkedHashMap` for order-preserving
/// collections (`gte::Gene::transcripts`); here it preserves attribute
/// *and* segment insertion order instead of transcript insertion order.
pub type AttrMap = LinkedHashMap<String, AttrValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_vs_list() {
        assert_eq!(AttrValue::from_raw("abc"), AttrValue::Scalar("abc".into()));
        assert_eq!(
            AttrValue::from_raw("a,b,c"),
            AttrValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn joined_round_trips() {
        assert_eq!(AttrValue::from_raw("a,b").joined(), "a,b");
        assert_eq!(AttrValue::from_raw("a").joined(), "a");
    }
}

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix reserved for identifiers that were never persisted.
pub const TEMP_PREFIX: &str = "temp_";

/// Locally allocated placeholder for a child row the server has not seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(u64);

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:x}", TEMP_PREFIX, self.0)
    }
}

/// Identifier of a child record (choice, ordering item, matching pair).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildId {
    Temporary(TempId),
    Persisted(String),
}

impl ChildId {
    pub fn persisted(id: impl Into<String>) -> Self {
        ChildId::Persisted(id.into())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, ChildId::Temporary(_))
    }

    pub fn as_temporary(&self) -> Option<TempId> {
        match self {
            ChildId::Temporary(temp) => Some(*temp),
            ChildId::Persisted(_) => None,
        }
    }

    /// Reads the wire form. Only `temp_<hex>` is temporary; anything else,
    /// including a malformed `temp_` string, is taken as a server id.
    pub fn parse(raw: &str) -> Self {
        raw.strip_prefix(TEMP_PREFIX)
            .filter(|hex| !hex.is_empty())
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .map(|index| ChildId::Temporary(TempId(index)))
            .unwrap_or_else(|| ChildId::Persisted(raw.to_owned()))
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildId::Temporary(temp) => temp.fmt(f),
            ChildId::Persisted(id) => f.write_str(id),
        }
    }
}

impl From<TempId> for ChildId {
    fn from(temp: TempId) -> Self {
        ChildId::Temporary(temp)
    }
}

impl Serialize for ChildId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChildId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ChildId::parse(&raw))
    }
}

impl Serialize for TempId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TempId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match ChildId::parse(&raw) {
            ChildId::Temporary(temp) => Ok(temp),
            ChildId::Persisted(_) => Err(serde::de::Error::custom(format!(
                "'{raw}' is not a temporary identifier"
            ))),
        }
    }
}

/// Server-assigned identifier of a question (the parent record).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues temporary ids for one editor session.
///
/// Clones share the counter, so the UI and the session can both allocate
/// without coordinating with each other or with the server.
#[derive(Debug, Clone, Default)]
pub struct TempIdAllocator {
    next: Arc<AtomicU64>,
}

impl TempIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> ChildId {
        ChildId::Temporary(self.allocate_temp())
    }

    pub fn allocate_temp(&self) -> TempId {
        TempId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn allocated_ids_are_distinct_and_temporary() {
        let allocator = TempIdAllocator::new();
        let shared = allocator.clone();

        let ids: HashSet<ChildId> = (0..500)
            .map(|i| if i % 2 == 0 { allocator.allocate() } else { shared.allocate() })
            .collect();

        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(ChildId::is_temporary));
    }

    #[test]
    fn wire_form_keeps_the_variant() {
        let temp = TempIdAllocator::new().allocate();
        let text = temp.to_string();
        assert!(text.starts_with(TEMP_PREFIX));
        assert_eq!(ChildId::parse(&text), temp);

        assert_eq!(ChildId::parse("42"), ChildId::persisted("42"));
        assert_eq!(ChildId::parse("temp_"), ChildId::persisted("temp_"));
        assert_eq!(ChildId::parse("temp_zz"), ChildId::persisted("temp_zz"));
    }

    #[test]
    fn json_uses_plain_strings() {
        let ids = vec![ChildId::persisted("8"), ChildId::Temporary(TempId(0xab12))];
        let json = serde_json::to_string(&ids).unwrap();
        assert_eq!(json, r#"["8","temp_ab12"]"#);

        let back: Vec<ChildId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ids);
    }

    #[test]
    fn temp_id_rejects_real_ids() {
        assert!(serde_json::from_str::<TempId>(r#""42""#).is_err());
        assert_eq!(
            serde_json::from_str::<TempId>(r#""temp_ab12""#).unwrap(),
            TempId(0xab12)
        );
    }
}

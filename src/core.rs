use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Atomic reference-counted string type used for identifiers.
pub(crate) type ArcStr = Arc<str>;

/// Keyword arguments for a single invocation, keyed by argument port name.
///
/// The engine passes these to the collection untouched. Keys are not checked
/// against the task's declared ports.
pub type Arguments = BTreeMap<String, Value>;

/// Group assigned to solutions that don't declare one.
pub const DEFAULT_GROUP: &str = "album";

/// Identifier of a dispatchable task, always `group:name:version`.
///
/// Cloning is cheap, the underlying string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(ArcStr);

impl TaskId {
    pub fn new(group: &str, name: &str, version: &str) -> Self {
        Self(format!("{group}:{name}:{version}").into())
    }

    /// Parses `group:name:version`. Anything after the second colon belongs
    /// to the version, so versions may contain colons themselves.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        let group = parts.next()?;
        let name = parts.next()?;
        let version = parts.next()?;

        if name.is_empty() || version.is_empty() {
            return None;
        }

        Some(Self::new(group, name, version))
    }

    /// Splits the identifier back into `(group, name, version)`.
    ///
    /// The split is on the first two colons, so it is only faithful when
    /// neither group nor name contains one. `TaskId::new("album", "a:b", "1.0")`
    /// comes back as `("album", "a", "b:1.0")`. Lookup and dispatch go by the
    /// whole string and are not affected.
    pub fn parts(&self) -> (&str, &str, &str) {
        let mut parts = self.0.splitn(3, ':');
        let group = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        (group, name, version)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaskId::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("expected group:name:version, got '{raw}'"))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = TaskId::new("album", "denoise", "1.0");
        assert_eq!(id.as_str(), "album:denoise:1.0");
        assert_eq!(id.parts(), ("album", "denoise", "1.0"));
    }

    #[test]
    fn test_parse_keeps_colons_in_version() {
        let id = TaskId::parse("ij:fiji:2.0:rc1").unwrap();
        assert_eq!(id.parts(), ("ij", "fiji", "2.0:rc1"));
    }

    #[test]
    fn test_colon_in_name_shifts_parts() {
        let id = TaskId::new("album", "a:b", "1.0");
        assert_eq!(id.as_str(), "album:a:b:1.0");
        assert_eq!(id.parts(), ("album", "a", "b:1.0"));
        assert_eq!(TaskId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_short_ids() {
        assert!(TaskId::parse("album:denoise").is_none());
        assert!(TaskId::parse("album::1.0").is_none());
        assert!(TaskId::parse("").is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let id = TaskId::new("album", "denoise", "1.0");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""album:denoise:1.0""#);

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

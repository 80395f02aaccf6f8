use crate::{
    address::Address,
    error::{ErrorKind, UrosError, UrosResult},
    ustring::UString,
};

/// {name, md5, optional definition}. Globally unique by name; registered
/// once at boot via `userRegisterStaticTypes`.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: UString,
    pub md5: UString,
    pub definition: Option<UString>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<UString>, md5: impl Into<UString>) -> Self {
        Self { name: name.into(), md5: md5.into(), definition: None }
    }

    pub fn with_definition(mut self, definition: impl Into<UString>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// `md5sum="*"` is a wildcard that matches any registered type,
    /// per the handshake's VALIDATE step.
    pub fn md5_matches(&self, candidate: &str) -> bool {
        candidate == "*" || self.md5.as_str() == candidate
    }

    pub fn type_matches(&self, candidate: &str) -> bool {
        candidate == "*" || self.name.as_str() == candidate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRole {
    Publisher,
    Subscriber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Server,
    Caller,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TopicFlags {
    pub latched: bool,
    pub no_delay: bool,
    pub persistent: bool,
}

/// {name, type-descriptor ref, handler ref, flags}. The common shape
/// behind topic, service and parameter catalog entries.
#[derive(Debug, Clone)]
pub struct NameRecord {
    pub name: UString,
    pub type_name: UString,
}

impl NameRecord {
    pub fn new(name: impl Into<UString>, type_name: impl Into<UString>) -> Self {
        Self { name: name.into(), type_name: type_name.into() }
    }
}

/// {name, last-known-value}.
#[derive(Debug, Clone)]
pub struct ParamEntry {
    pub name: UString,
    pub last_value: ParamValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Double(f64),
    Str(String),
}

pub type NodeName = UString;

/// Helper shared by every RPC handler that needs to reject a malformed
/// argument with `BadParam` rather than panic.
pub fn require(condition: bool, message: impl Into<String>) -> UrosResult<()> {
    if condition {
        Ok(())
    } else {
        Err(UrosError::new(ErrorKind::BadParam, message))
    }
}

pub use Address as PeerAddress;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_md5_matches_anything() {
        let td = TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1");
        assert!(td.md5_matches("*"));
        assert!(td.md5_matches("992ce8a1687cec8c8bd883ec73ca41d1"));
        assert!(!td.md5_matches("deadbeef"));
    }

    #[test]
    fn wildcard_type_matches_anything() {
        let td = TypeDescriptor::new("std_msgs/String", "992ce8a1687cec8c8bd883ec73ca41d1");
        assert!(td.type_matches("*"));
        assert!(td.type_matches("std_msgs/String"));
        assert!(!td.type_matches("std_msgs/Int32"));
    }
}

use uros_base::{Address, ParamValue, ServiceRole, TopicFlags, TopicRole, TypeDescriptor, UString};

pub type SessionId = u64;

/// Topic entry (TE): a name record plus role and flags. Live session ids
/// for a topic live in the registry's own `sessions` catalog, keyed by
/// name (`Registry::count_sessions`/`sessions`), not here.
#[derive(Debug, Clone)]
pub struct TopicEntry {
    pub name: UString,
    pub type_desc: TypeDescriptor,
    pub role: TopicRole,
    pub flags: TopicFlags,
}

impl TopicEntry {
    pub fn new(name: UString, type_desc: TypeDescriptor, role: TopicRole, flags: TopicFlags) -> Self {
        Self { name, type_desc, role, flags }
    }
}

/// Service entry (SE): a name record plus role. Live sessions are tracked
/// the same way as for `TopicEntry` — in the registry's `sessions` catalog.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: UString,
    pub type_desc: TypeDescriptor,
    pub role: ServiceRole,
    pub persistent: bool,
}

impl ServiceEntry {
    pub fn new(name: UString, type_desc: TypeDescriptor, role: ServiceRole) -> Self {
        Self { name, type_desc, role, persistent: false }
    }
}

/// Subscribed parameter with its last observed value (updated by
/// `paramUpdate` calls forwarded from the Master).
#[derive(Debug, Clone)]
pub struct ParamRecord {
    pub name: UString,
    pub value: Option<ParamValue>,
}

/// Connection session (CS) bookkeeping kept in the registry: just enough
/// to answer `getBusInfo`/`getBusStats` and to let a worker remove itself
/// on exit. The socket and handler state stay with the owning worker.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub topic_or_service: UString,
    pub local: Address,
    pub remote: Address,
}

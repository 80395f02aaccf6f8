use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use uros_base::{ErrorKind, ServiceRole, TopicFlags, TopicRole, TypeDescriptor, UString, UrosError, UrosResult};

use crate::entries::{ParamRecord, ServiceEntry, SessionId, SessionRecord, TopicEntry};

/// In-memory catalogs of published topics, subscribed topics, published
/// services, called services, subscribed params, registered types, and
/// live TCPROS sessions.
///
/// Each catalog has its own mutex. Operations that touch two catalogs
/// (advertise checks the type catalog before inserting into a topic
/// catalog) always lock in this fixed order to avoid deadlock:
/// `types` -> `published_topics`/`subscribed_topics` ->
/// `published_services`/`called_services` -> `params` -> `sessions`.
pub struct Registry {
    types: Mutex<Vec<TypeDescriptor>>,
    published_topics: Mutex<Vec<TopicEntry>>,
    subscribed_topics: Mutex<Vec<TopicEntry>>,
    published_services: Mutex<Vec<ServiceEntry>>,
    called_services: Mutex<Vec<ServiceEntry>>,
    params: Mutex<Vec<ParamRecord>>,
    sessions: Mutex<Vec<SessionRecord>>,
    next_session_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            types: Mutex::new(Vec::new()),
            published_topics: Mutex::new(Vec::new()),
            subscribed_topics: Mutex::new(Vec::new()),
            published_services: Mutex::new(Vec::new()),
            called_services: Mutex::new(Vec::new()),
            params: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    // ---- type catalog -----------------------------------------------

    /// Idempotent on an identical re-register (same name and md5);
    /// conflicts (same name, different md5) fail with `BadParam`.
    pub fn register_static_type(&self, desc: TypeDescriptor) -> UrosResult<()> {
        let mut types = self.types.lock().expect("registry mutex poisoned");
        if let Some(existing) = types.iter().find(|t| t.name == desc.name) {
            if existing.md5 == desc.md5 {
                return Ok(());
            }
            return Err(UrosError::new(
                ErrorKind::BadParam,
                format!("type {} already registered with a different md5", desc.name),
            ));
        }
        types.push(desc);
        Ok(())
    }

    pub fn lookup_type_by_name(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.lock().expect("registry mutex poisoned").iter().find(|t| t.name.as_str() == name).cloned()
    }

    // ---- topic catalogs ----------------------------------------------

    pub fn advertise_topic(
        &self,
        name: impl Into<UString>,
        type_name: &str,
        flags: TopicFlags,
    ) -> UrosResult<()> {
        let name = name.into();
        let type_desc = self
            .lookup_type_by_name(type_name)
            .ok_or_else(|| UrosError::new(ErrorKind::MapMiss, format!("unregistered type {type_name}")))?;

        let mut topics = self.published_topics.lock().expect("registry mutex poisoned");
        if topics.iter().any(|t| t.name == name) {
            // advertiseTopic twice: deterministic no-op, per spec's
            // idempotence property.
            return Ok(());
        }
        topics.push(TopicEntry::new(name, type_desc, TopicRole::Publisher, flags));
        Ok(())
    }

    pub fn unadvertise_topic(&self, name: &str) -> UrosResult<()> {
        remove_by_name(&self.published_topics, name)
    }

    pub fn subscribe_topic(&self, name: impl Into<UString>, type_name: &str) -> UrosResult<()> {
        let name = name.into();
        let type_desc = self
            .lookup_type_by_name(type_name)
            .ok_or_else(|| UrosError::new(ErrorKind::MapMiss, format!("unregistered type {type_name}")))?;

        let mut topics = self.subscribed_topics.lock().expect("registry mutex poisoned");
        if topics.iter().any(|t| t.name == name) {
            return Ok(());
        }
        topics.push(TopicEntry::new(name, type_desc, TopicRole::Subscriber, TopicFlags::default()));
        Ok(())
    }

    /// Removes `name` from the subscribed catalog and clears its session
    /// list — tearing the sessions down is the caller's (the engine's)
    /// job once it observes the removal.
    pub fn unsubscribe_topic(&self, name: &str) -> UrosResult<()> {
        remove_by_name(&self.subscribed_topics, name)
    }

    pub fn lookup_published_topic(&self, name: &str) -> Option<TopicEntry> {
        find_by_name(&self.published_topics, name)
    }

    pub fn lookup_subscribed_topic(&self, name: &str) -> Option<TopicEntry> {
        find_by_name(&self.subscribed_topics, name)
    }

    pub fn published_topics(&self) -> Vec<TopicEntry> {
        self.published_topics.lock().expect("registry mutex poisoned").clone()
    }

    pub fn subscribed_topics(&self) -> Vec<TopicEntry> {
        self.subscribed_topics.lock().expect("registry mutex poisoned").clone()
    }

    // ---- service catalogs ---------------------------------------------

    pub fn advertise_service(&self, name: impl Into<UString>, type_name: &str) -> UrosResult<()> {
        let name = name.into();
        let type_desc = self
            .lookup_type_by_name(type_name)
            .ok_or_else(|| UrosError::new(ErrorKind::MapMiss, format!("unregistered type {type_name}")))?;

        let mut services = self.published_services.lock().expect("registry mutex poisoned");
        if services.iter().any(|s| s.name == name) {
            return Ok(());
        }
        services.push(ServiceEntry::new(name, type_desc, ServiceRole::Server));
        Ok(())
    }

    pub fn unadvertise_service(&self, name: &str) -> UrosResult<()> {
        remove_by_name(&self.published_services, name)
    }

    pub fn call_service(&self, name: impl Into<UString>, type_name: &str) -> UrosResult<()> {
        let name = name.into();
        let type_desc = self
            .lookup_type_by_name(type_name)
            .ok_or_else(|| UrosError::new(ErrorKind::MapMiss, format!("unregistered type {type_name}")))?;

        let mut services = self.called_services.lock().expect("registry mutex poisoned");
        if services.iter().any(|s| s.name == name) {
            return Ok(());
        }
        services.push(ServiceEntry::new(name, type_desc, ServiceRole::Caller));
        Ok(())
    }

    pub fn lookup_published_service(&self, name: &str) -> Option<ServiceEntry> {
        find_by_name(&self.published_services, name)
    }

    pub fn lookup_called_service(&self, name: &str) -> Option<ServiceEntry> {
        find_by_name(&self.called_services, name)
    }

    pub fn published_services(&self) -> Vec<ServiceEntry> {
        self.published_services.lock().expect("registry mutex poisoned").clone()
    }

    pub fn called_services(&self) -> Vec<ServiceEntry> {
        self.called_services.lock().expect("registry mutex poisoned").clone()
    }

    // ---- params ---------------------------------------------------------

    pub fn subscribe_param(&self, name: impl Into<UString>) -> UrosResult<()> {
        let name = name.into();
        let mut params = self.params.lock().expect("registry mutex poisoned");
        if params.iter().any(|p| p.name == name) {
            return Ok(());
        }
        params.push(ParamRecord { name, value: None });
        Ok(())
    }

    pub fn subscribed_params(&self) -> Vec<UString> {
        self.params.lock().expect("registry mutex poisoned").iter().map(|p| p.name.clone()).collect()
    }

    pub fn unsubscribe_param(&self, name: &str) -> UrosResult<()> {
        let mut params = self.params.lock().expect("registry mutex poisoned");
        let before = params.len();
        params.retain(|p| p.name.as_str() != name);
        if params.len() == before {
            return Err(UrosError::new(ErrorKind::MapMiss, format!("unknown param {name}")));
        }
        Ok(())
    }

    /// Updates the last-known value of a subscribed param. Fails with
    /// `MapMiss` if the key was never subscribed — the registry is left
    /// unchanged, matching the unknown-key `paramUpdate` scenario.
    pub fn update_param(&self, name: &str, value: uros_base::ParamValue) -> UrosResult<()> {
        let mut params = self.params.lock().expect("registry mutex poisoned");
        let entry = params
            .iter_mut()
            .find(|p| p.name.as_str() == name)
            .ok_or_else(|| UrosError::new(ErrorKind::MapMiss, format!("unknown param {name}")))?;
        entry.value = Some(value);
        Ok(())
    }

    // ---- sessions ---------------------------------------------------------

    /// Assigns the next session id and records it. Only the worker
    /// thread servicing a session is expected to call this and
    /// `remove_session` for it.
    pub fn add_session(&self, topic_or_service: impl Into<UString>, local: uros_base::Address, remote: uros_base::Address) -> SessionId {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let topic_or_service = topic_or_service.into();
        self.sessions.lock().expect("registry mutex poisoned").push(SessionRecord {
            id,
            topic_or_service,
            local,
            remote,
        });
        id
    }

    pub fn remove_session(&self, id: SessionId) {
        self.sessions.lock().expect("registry mutex poisoned").retain(|s| s.id != id);
    }

    pub fn count_sessions(&self, name: &str) -> usize {
        self.sessions
            .lock()
            .expect("registry mutex poisoned")
            .iter()
            .filter(|s| s.topic_or_service.as_str() == name)
            .count()
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.sessions.lock().expect("registry mutex poisoned").clone()
    }
}

trait Named {
    fn entry_name(&self) -> &UString;
}

impl Named for TopicEntry {
    fn entry_name(&self) -> &UString {
        &self.name
    }
}

impl Named for ServiceEntry {
    fn entry_name(&self) -> &UString {
        &self.name
    }
}

fn find_by_name<T: Named + Clone>(catalog: &Mutex<Vec<T>>, name: &str) -> Option<T> {
    catalog
        .lock()
        .expect("registry mutex poisoned")
        .iter()
        .find(|entry| entry.entry_name().as_str() == name)
        .cloned()
}

fn remove_by_name<T: Named>(catalog: &Mutex<Vec<T>>, name: &str) -> UrosResult<()> {
    let mut catalog = catalog.lock().expect("registry mutex poisoned");
    let before = catalog.len();
    catalog.retain(|entry| entry.entry_name().as_str() != name);
    if catalog.len() == before {
        return Err(UrosError::new(ErrorKind::MapMiss, format!("unknown entry {name}")));
    }
    Ok(())
}

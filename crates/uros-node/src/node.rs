//! The node supervisor: boot/drain lifecycle plus the XMLRPC and TCPROS
//! listener threads and the three worker pools that service them.
//!
//! Each listener thread owns its own accept-side pool outright (spawns it,
//! dispatches into it, joins it when the accept loop ends) so `Node` only
//! ever has to join the listener thread handles during drain. The
//! TCPROS-client pool is the exception: it services outbound connects
//! triggered by `subscribe_topic`/`call_service`, not a listener, so `Node`
//! owns and joins it directly.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, info, warn};
use uros_base::{Address, ErrorKind, ParamValue, TopicFlags, TypeDescriptor, UrosError, UrosResult};
use uros_net::{Connection, Listener};
use uros_registry::Registry;
use uros_rpc::{dispatch, MasterClient, SlaveHandler};
use uros_tcpros::{
    accept_publisher_session_with_header, accept_service_session_with_header, connect_subscriber_session, write_message,
    Header, ServiceCaller, Session,
};
use uros_threading::{PoolConfig, ThreadPool};
use uros_xmlrpc::{parse_method_call, read_request, write_method_call, write_method_response, write_request, write_response, MethodCall, Value};

use crate::callbacks::AppCallbacks;
use crate::config::NodeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Uninit,
    Starting,
    Running,
    Draining,
    Shutdown,
}

type PublishFn = Arc<dyn Fn(&mut Session) -> UrosResult<()> + Send + Sync>;
type SubscribeFn = Arc<dyn Fn(&mut Session) -> UrosResult<()> + Send + Sync>;
type ServiceFn = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync>;

#[derive(Default)]
struct HandlerTable {
    publishers: Mutex<HashMap<String, PublishFn>>,
    subscribers: Mutex<HashMap<String, SubscribeFn>>,
    services: Mutex<HashMap<String, ServiceFn>>,
}

/// Wakes a thread blocked in [`wait`](ExitSignal::wait) the moment
/// [`request`](ExitSignal::request) is called from any other thread.
/// `flag` is handed out as the per-session cooperative-cancellation token
/// every TCPROS session already expects; the mutex/condvar pair is only
/// there so the supervisor doesn't have to poll it.
struct ExitSignal {
    flag: Arc<AtomicBool>,
    gate: Mutex<()>,
    cv: Condvar,
}

impl ExitSignal {
    fn new() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)), gate: Mutex::new(()), cv: Condvar::new() }
    }

    fn token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn request(&self) {
        self.flag.store(true, Ordering::Release);
        let _guard = self.gate.lock().expect("exit gate poisoned");
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut guard = self.gate.lock().expect("exit gate poisoned");
        while !self.flag.load(Ordering::Acquire) {
            guard = self.cv.wait(guard).expect("exit gate poisoned");
        }
    }
}

/// Everything a Slave-RPC or TCPROS worker closure needs, behind one `Arc`
/// so dispatch jobs (which must be `'static`) can clone it cheaply.
struct Shared {
    caller_id: String,
    master_uri: String,
    registry: Registry,
    xmlrpc_addr: Address,
    tcpros_addr: Address,
    pid: u32,
    state: Mutex<NodeState>,
    exit: ExitSignal,
    callbacks: Arc<dyn AppCallbacks>,
    handlers: HandlerTable,
    shutdown_reason: Mutex<Option<String>>,
}

impl Shared {
    fn begin_drain(&self, reason: &str) {
        self.callbacks.user_shutdown(reason);
        *self.shutdown_reason.lock().expect("state mutex poisoned") = Some(reason.to_owned());
        *self.state.lock().expect("state mutex poisoned") = NodeState::Draining;
        self.exit.request();
    }
}

impl SlaveHandler for Shared {
    fn caller_id(&self) -> &str {
        &self.caller_id
    }
    fn registry(&self) -> &Registry {
        &self.registry
    }
    fn tcpros_addr(&self) -> Address {
        self.tcpros_addr
    }
    fn pid(&self) -> u32 {
        self.pid
    }
    fn master_uri(&self) -> &str {
        &self.master_uri
    }
    fn on_shutdown(&self, reason: &str) {
        info!(reason, "shutdown requested over the Slave API");
        self.begin_drain(reason);
    }
    fn on_param_update(&self, key: &str, value: ParamValue) -> UrosResult<()> {
        self.callbacks.user_param_update(key, value)
    }
    fn on_publisher_update(&self, topic: &str, publisher_uris: &[String]) -> UrosResult<()> {
        debug!(topic, count = publisher_uris.len(), "publisherUpdate received, reconnect is the caller's job");
        Ok(())
    }
}

/// The top-level lifecycle owner. `boot` performs steps 1-7 and returns a
/// node in the RUNNING state with its listeners and pools already live;
/// `run` blocks the calling thread until a shutdown is requested (over the
/// Slave API or via [`Node::shutdown`]) and then performs the drain
/// sequence before returning.
pub struct Node {
    config: NodeConfig,
    shared: Arc<Shared>,
    master: Arc<MasterClient>,
    xmlrpc_thread: Option<JoinHandle<()>>,
    tcpros_thread: Option<JoinHandle<()>>,
    tcpros_client_pool: Option<ThreadPool>,
}

impl Node {
    /// Boot sequence 1-7. `RUNNING` is reached only once every step below
    /// has succeeded; any failure unwinds without leaving listener threads
    /// or pools behind.
    pub fn boot(config: NodeConfig, callbacks: Arc<dyn AppCallbacks>) -> UrosResult<Self> {
        // 1. Initialize base pools and registry.
        let registry = Registry::new();

        // 2. Config is already loaded by the caller (`NodeConfig::default`
        //    supplies compile-time fallbacks for anything not overridden).

        // 3. Register static types via application callback.
        callbacks.user_register_static_types(&registry)?;

        // 4. Start XMLRPC listener; start Slave-RPC pool.
        let xmlrpc_listener = Listener::bind(config.xmlrpc_listen.to_address(), 16)?;
        let xmlrpc_addr = xmlrpc_listener.local_addr();
        let slave_pool = ThreadPool::create(PoolConfig { priority: config.pool_priority(), ..PoolConfig::new(config.slave_pool_size) }, "slave-rpc");

        // 5. Start TCPROS listener; start TCPROS-server pool and
        //    TCPROS-client pool.
        let tcpros_listener = Listener::bind(config.tcpros_listen.to_address(), 16)?;
        let tcpros_addr = tcpros_listener.local_addr();
        let tcpros_server_pool =
            ThreadPool::create(PoolConfig { priority: config.pool_priority(), ..PoolConfig::new(config.tcpros_server_pool_size) }, "tcpros-server");
        let tcpros_client_pool =
            ThreadPool::create(PoolConfig { priority: config.pool_priority(), ..PoolConfig::new(config.tcpros_client_pool_size) }, "tcpros-client");

        let master_addr = config.master_addr.to_address();
        let master = Arc::new(MasterClient::new(master_addr, config.rpc_timeout));

        let shared = Arc::new(Shared {
            caller_id: config.node_name.clone(),
            master_uri: format!("http://{master_addr}/"),
            registry,
            xmlrpc_addr,
            tcpros_addr,
            pid: std::process::id(),
            state: Mutex::new(NodeState::Starting),
            exit: ExitSignal::new(),
            callbacks: Arc::clone(&callbacks),
            handlers: HandlerTable::default(),
            shutdown_reason: Mutex::new(None),
        });

        let xmlrpc_thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("xmlrpc-listener".to_owned())
                .spawn(move || run_xmlrpc_listener(xmlrpc_listener, slave_pool, shared))
                .expect("failed to spawn xmlrpc listener thread")
        };
        let tcpros_thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("tcpros-listener".to_owned())
                .spawn(move || run_tcpros_listener(tcpros_listener, tcpros_server_pool, shared))
                .expect("failed to spawn tcpros listener thread")
        };

        let node = Self {
            config: config.clone(),
            shared,
            master,
            xmlrpc_thread: Some(xmlrpc_thread),
            tcpros_thread: Some(tcpros_thread),
            tcpros_client_pool: Some(tcpros_client_pool),
        };

        // 6. Application callback: publish topics, subscribe topics,
        //    publish services, subscribe params (each entry calls the
        //    corresponding Master RPC).
        callbacks.user_publish_topics(&node.shared.registry)?;
        callbacks.user_subscribe_topics(&node.shared.registry)?;
        callbacks.user_publish_services(&node.shared.registry)?;
        callbacks.user_subscribe_params(&node.shared.registry)?;
        node.sync_static_registrations_with_master()?;

        // 7. Publish the `/rosout` log subscription if configured.
        if let Some(topic) = config.rosout_topic.clone() {
            node.publish_rosout_topic(&topic)?;
        }

        *node.shared.state.lock().expect("state mutex poisoned") = NodeState::Running;
        Ok(node)
    }

    /// Registers every catalog entry the boot-step-6 callback populated
    /// directly (bulk static declarations with no live handler) with the
    /// Master. Entries wired through [`advertise_topic`](Node::advertise_topic)
    /// and friends register themselves as part of that call and are
    /// idempotently skipped here.
    fn sync_static_registrations_with_master(&self) -> UrosResult<()> {
        let caller_api = self.caller_api();
        for topic in self.shared.registry.published_topics() {
            self.master.register_publisher(&self.shared.caller_id, topic.name.as_str(), topic.type_desc.name.as_str(), &caller_api)?;
        }
        for topic in self.shared.registry.subscribed_topics() {
            self.master.register_subscriber(&self.shared.caller_id, topic.name.as_str(), topic.type_desc.name.as_str(), &caller_api)?;
        }
        for service in self.shared.registry.published_services() {
            self.master.register_service(&self.shared.caller_id, service.name.as_str(), &self.tcpros_api(), &caller_api)?;
        }
        for key in self.shared.registry.subscribed_params() {
            self.master.subscribe_param(&self.shared.caller_id, &caller_api, key.as_str())?;
        }
        Ok(())
    }

    fn publish_rosout_topic(&self, topic: &str) -> UrosResult<()> {
        let type_desc = TypeDescriptor::new("rosgraph_msgs/Log", "acffd30cd6b6de30f120938c17c593fb");
        let shared = Arc::clone(&self.shared);
        self.advertise_topic(topic, type_desc, TopicFlags { latched: false, no_delay: false, persistent: false }, move |session| {
            // A session that connects while already draining is the
            // self-unblock connect from `self_unblock_tcpros`: write the
            // shutting-down notice instead of entering the idle loop.
            if session.should_exit() {
                let reason = shared.shutdown_reason.lock().expect("state mutex poisoned").clone().unwrap_or_default();
                let _ = write_message(&mut session.conn, format!("Node is shutting down: {reason}").as_bytes());
                return Ok(());
            }
            // No application ever writes through the default handler;
            // overriding nodes that want real log output call
            // `advertise_topic` with their own routine instead.
            while !session.should_exit() {
                thread::sleep(Duration::from_millis(200));
            }
            Ok(())
        })
    }

    fn caller_api(&self) -> String {
        format!("http://{}/", self.shared.xmlrpc_addr)
    }

    fn tcpros_api(&self) -> String {
        format!("http://{}/", self.shared.tcpros_addr)
    }

    pub fn xmlrpc_addr(&self) -> Address {
        self.shared.xmlrpc_addr
    }

    pub fn tcpros_addr(&self) -> Address {
        self.shared.tcpros_addr
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn state(&self) -> NodeState {
        *self.shared.state.lock().expect("state mutex poisoned")
    }

    /// Advertises `topic`, registers it with the Master, and installs
    /// `handler` as the STREAM_LOOP routine invoked for every subscriber
    /// that connects.
    pub fn advertise_topic(
        &self,
        topic: &str,
        type_desc: TypeDescriptor,
        flags: TopicFlags,
        handler: impl Fn(&mut Session) -> UrosResult<()> + Send + Sync + 'static,
    ) -> UrosResult<()> {
        self.shared.registry.register_static_type(type_desc.clone())?;
        self.shared.registry.advertise_topic(topic.to_owned(), type_desc.name.as_str(), flags)?;
        self.shared.handlers.publishers.lock().expect("handler mutex poisoned").insert(topic.to_owned(), Arc::new(handler));
        self.master.register_publisher(&self.shared.caller_id, topic, type_desc.name.as_str(), &self.caller_api())?;
        Ok(())
    }

    pub fn unadvertise_topic(&self, topic: &str) -> UrosResult<()> {
        self.shared.registry.unadvertise_topic(topic)?;
        self.shared.handlers.publishers.lock().expect("handler mutex poisoned").remove(topic);
        self.master.unregister_publisher(&self.shared.caller_id, topic, &self.caller_api())?;
        Ok(())
    }

    /// Subscribes to `topic`, looks up its current publishers at the
    /// Master, and dispatches one connect attempt per publisher into the
    /// TCPROS-client pool.
    pub fn subscribe_topic(
        &self,
        topic: &str,
        type_desc: TypeDescriptor,
        handler: impl Fn(&mut Session) -> UrosResult<()> + Send + Sync + 'static,
    ) -> UrosResult<()> {
        self.shared.registry.register_static_type(type_desc.clone())?;
        self.shared.registry.subscribe_topic(topic.to_owned(), type_desc.name.as_str())?;
        let handler: SubscribeFn = Arc::new(handler);
        self.shared.handlers.subscribers.lock().expect("handler mutex poisoned").insert(topic.to_owned(), Arc::clone(&handler));

        let reply = self.master.register_subscriber(&self.shared.caller_id, topic, type_desc.name.as_str(), &self.caller_api())?;
        let Some(pool) = self.tcpros_client_pool.as_ref() else {
            return Err(UrosError::new(ErrorKind::NotConnected, "tcpros client pool already drained"));
        };
        if let Some(publishers) = reply.value.as_array() {
            for publisher_uri in publishers.iter().filter_map(Value::as_str) {
                if let Ok(slave_addr) = parse_xmlrpc_uri(publisher_uri) {
                    dispatch_subscriber_connect(pool, Arc::clone(&self.shared), Arc::clone(&self.master), topic.to_owned(), type_desc.clone(), slave_addr);
                }
            }
        }
        Ok(())
    }

    pub fn unsubscribe_topic(&self, topic: &str) -> UrosResult<()> {
        self.shared.registry.unsubscribe_topic(topic)?;
        self.shared.handlers.subscribers.lock().expect("handler mutex poisoned").remove(topic);
        self.master.unregister_subscriber(&self.shared.caller_id, topic, &self.caller_api())?;
        Ok(())
    }

    /// Advertises `service`, registers it with the Master, and installs
    /// `handler` as the REQ_LOOP routine invoked per request.
    pub fn advertise_service(
        &self,
        service: &str,
        type_desc: TypeDescriptor,
        handler: impl Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync + 'static,
    ) -> UrosResult<()> {
        self.shared.registry.register_static_type(type_desc.clone())?;
        self.shared.registry.advertise_service(service.to_owned(), type_desc.name.as_str())?;
        self.shared.handlers.services.lock().expect("handler mutex poisoned").insert(service.to_owned(), Arc::new(handler));
        self.master.register_service(&self.shared.caller_id, service, &self.tcpros_api(), &self.caller_api())?;
        Ok(())
    }

    pub fn unadvertise_service(&self, service: &str) -> UrosResult<()> {
        self.shared.registry.unadvertise_service(service)?;
        self.shared.handlers.services.lock().expect("handler mutex poisoned").remove(service);
        self.master.unregister_service(&self.shared.caller_id, service, &self.tcpros_api())?;
        Ok(())
    }

    /// Looks up `service` at the Master and performs one `REQ -> RESP`
    /// exchange against its server. One-shot: does not keep the
    /// connection open.
    pub fn call_service(&self, service: &str, type_desc: &TypeDescriptor, request: &[u8]) -> UrosResult<Result<Vec<u8>, String>> {
        self.shared.registry.call_service(service.to_owned(), type_desc.name.as_str())?;
        let reply = self.master.lookup_service(&self.shared.caller_id, service)?;
        if reply.code != 1 {
            return Err(UrosError::new(ErrorKind::MapMiss, format!("lookupService failed: {}", reply.message)));
        }
        let server_uri = reply.value.as_str().ok_or_else(|| UrosError::new(ErrorKind::Parse, "lookupService reply missing uri"))?;
        let server_addr = parse_xmlrpc_uri(server_uri)?;
        let mut caller = ServiceCaller::connect(server_addr, service, type_desc, &self.shared.caller_id, false, self.config.rpc_timeout)?;
        caller.call(request)
    }

    /// Local-request path for the `shutdown()` drain trigger (the
    /// Slave-API path runs through [`Shared::begin_drain`] instead).
    pub fn shutdown(&self, reason: &str) {
        info!(reason, "local shutdown requested");
        self.shared.begin_drain(reason);
    }

    /// Blocks until a shutdown has been requested, then runs the drain
    /// sequence (steps 1-5) and returns.
    pub fn run(mut self) -> UrosResult<()> {
        self.shared.exit.wait();
        self.drain()
    }

    fn drain(&mut self) -> UrosResult<()> {
        // 1. already DRAINING and exit flag already true by the time a
        //    caller reaches here (either path into `shutdown` set them).
        if !self.shared.exit.is_set() {
            *self.shared.state.lock().expect("state mutex poisoned") = NodeState::Draining;
            self.shared.exit.request();
        }

        // 2. Application callback: unsubscribe params, unpublish
        //    services, unsubscribe topics, unpublish topics (reverse
        //    order of boot step 6).
        if let Err(err) = self.shared.callbacks.user_unsubscribe_params(&self.shared.registry) {
            warn!(?err, "user_unsubscribe_params failed during drain");
        }
        if let Err(err) = self.shared.callbacks.user_unpublish_services(&self.shared.registry) {
            warn!(?err, "user_unpublish_services failed during drain");
        }
        if let Err(err) = self.shared.callbacks.user_unsubscribe_topics(&self.shared.registry) {
            warn!(?err, "user_unsubscribe_topics failed during drain");
        }
        if let Err(err) = self.shared.callbacks.user_unpublish_topics(&self.shared.registry) {
            warn!(?err, "user_unpublish_topics failed during drain");
        }

        // 3. Abort listener sockets (push one more accept() through each
        //    blocked listener); wake every pool worker (joinAll).
        self_unblock_xmlrpc(self.shared.xmlrpc_addr, self.config.rpc_timeout);
        self_unblock_tcpros(self.shared.tcpros_addr, self.config.rpc_timeout);
        if let Some(pool) = self.tcpros_client_pool.take() {
            pool.join_all();
        }

        // 4. Join listeners and pools (each listener thread joins the
        //    pool it owns before returning).
        if let Some(handle) = self.xmlrpc_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.tcpros_thread.take() {
            let _ = handle.join();
        }

        // 5. Registry is freed when `Shared` drops; transition to
        //    SHUTDOWN.
        *self.shared.state.lock().expect("state mutex poisoned") = NodeState::Shutdown;
        Ok(())
    }
}

fn dispatch_subscriber_connect(
    pool: &ThreadPool,
    shared: Arc<Shared>,
    master: Arc<MasterClient>,
    topic: String,
    type_desc: TypeDescriptor,
    slave_addr: Address,
) {
    pool.dispatch(Box::new(move || {
        let requested = vec![Value::Array(vec![Value::Str("TCPROS".into())])];
        let reply = match MasterClient::new(slave_addr, master.timeout()).request_topic(&shared.caller_id, &topic, requested) {
            Ok(reply) if reply.code == 1 => reply,
            Ok(reply) => {
                debug!(topic, message = reply.message, "requestTopic failed");
                return;
            }
            Err(err) => {
                debug!(topic, ?err, "requestTopic call failed");
                return;
            }
        };
        let Some(fields) = reply.value.as_array() else { return };
        let (Some(host), Some(port)) = (fields.get(1).and_then(Value::as_str), fields.get(2).and_then(Value::as_int)) else {
            return;
        };
        let Ok(ip) = uros_base::parse_ipv4_literal(host) else { return };
        let remote = Address::new(ip, port as u16);

        let Some(subscribe_fn) = shared.handlers.subscribers.lock().expect("handler mutex poisoned").get(&topic).cloned() else {
            return;
        };
        let exit = shared.exit.token();
        let registry = &shared.registry;
        let result = connect_subscriber_session(remote, registry, &topic, &type_desc, &shared.caller_id, master.timeout(), exit, move |session| {
            (*subscribe_fn)(session)
        });
        if let Err(err) = result {
            debug!(topic, ?remote, ?err, "subscriber connect failed");
        }
    }));
}

fn run_xmlrpc_listener(listener: Listener, pool: ThreadPool, shared: Arc<Shared>) {
    loop {
        let (conn, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(err) => {
                if shared.exit.is_set() {
                    break;
                }
                warn!(?err, "xmlrpc accept failed");
                continue;
            }
        };
        if shared.exit.is_set() {
            break;
        }
        let shared = Arc::clone(&shared);
        pool.dispatch(Box::new(move || {
            if let Err(err) = service_xmlrpc_connection(conn, &shared) {
                debug!(?peer, ?err, "xmlrpc connection ended with error");
            }
        }));
    }
    pool.join_all();
}

fn service_xmlrpc_connection(mut conn: Connection, shared: &Shared) -> UrosResult<()> {
    let body = read_request(&mut conn).map_err(UrosError::from)?;
    let call = parse_method_call(&body).map_err(UrosError::from)?;
    let value = dispatch(shared, &call);
    let response_body = write_method_response(&value);
    write_response(&mut conn, &response_body).map_err(UrosError::from)
}

fn run_tcpros_listener(listener: Listener, pool: ThreadPool, shared: Arc<Shared>) {
    loop {
        let (conn, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(err) => {
                if shared.exit.is_set() {
                    break;
                }
                warn!(?err, "tcpros accept failed");
                continue;
            }
        };
        if shared.exit.is_set() {
            break;
        }
        let shared = Arc::clone(&shared);
        pool.dispatch(Box::new(move || route_tcpros_connection(conn, peer, &shared)));
    }
    pool.join_all();
}

fn route_tcpros_connection(mut conn: Connection, peer: Address, shared: &Shared) {
    let header = match Header::read(&mut conn) {
        Ok(header) => header,
        Err(err) => {
            debug!(?peer, ?err, "tcpros header parse failed");
            return;
        }
    };

    let result = if let Some(topic) = header.topic().map(str::to_owned) {
        let handler = shared.handlers.publishers.lock().expect("handler mutex poisoned").get(&topic).cloned();
        match handler {
            Some(publish_fn) => {
                accept_publisher_session_with_header(header, conn, &shared.registry, shared.exit.token(), move |session| (*publish_fn)(session))
            }
            None => Err(UrosError::new(ErrorKind::MapMiss, format!("no publisher handler installed for {topic}"))),
        }
    } else if let Some(service) = header.service().map(str::to_owned) {
        let handler = shared.handlers.services.lock().expect("handler mutex poisoned").get(&service).cloned();
        match handler {
            Some(request_fn) => {
                accept_service_session_with_header(header, conn, &shared.registry, shared.exit.token(), move |req| (*request_fn)(req))
            }
            None => Err(UrosError::new(ErrorKind::MapMiss, format!("no service handler installed for {service}"))),
        }
    } else {
        Err(UrosError::new(ErrorKind::Parse, "handshake named neither a topic nor a service"))
    };

    if let Err(err) = result {
        debug!(?peer, ?err, "tcpros session ended with error");
    }
}

/// Connects and immediately performs a throwaway `getPid` call against our
/// own XMLRPC port purely to push one more `accept()` through a listener
/// thread that's blocked waiting for a peer.
fn self_unblock_xmlrpc(addr: Address, timeout: Duration) {
    let Ok(mut conn) = Connection::connect(addr, timeout) else { return };
    let body = write_method_call(&MethodCall::new("getPid", vec![Value::Str("/drain".into())]));
    let _ = write_request(&mut conn, "/RPC2", &addr.to_string(), &body);
}

/// Connects to our own TCPROS port and sends a subscriber handshake for
/// `/rosout` to push one more `accept()` through the listener thread. If
/// `/rosout` is published (boot step 7), the publisher session this
/// handshake routes to is already draining and writes back a real
/// "shutting down" notice (see [`Node::publish_rosout_topic`]) rather than
/// silently dropping the connection.
fn self_unblock_tcpros(addr: Address, timeout: Duration) {
    let Ok(mut conn) = Connection::connect(addr, timeout) else { return };
    let mut header = Header::new();
    header.insert("callerid", "/drain").insert("topic", "/rosout").insert("md5sum", "*").insert("type", "*");
    let _ = header.write(&mut conn);
}

/// Parses a `http://host:port/`-shaped XML-RPC URI (as returned by the
/// Master and by peer Slaves) into an [`Address`]. No DNS resolution —
/// every URI on this wire is already an IPv4 literal.
fn parse_xmlrpc_uri(uri: &str) -> UrosResult<Address> {
    let rest = uri.strip_prefix("http://").ok_or_else(|| UrosError::new(ErrorKind::Parse, format!("not an http uri: {uri}")))?;
    let rest = rest.trim_end_matches('/');
    let (host, port) = rest.rsplit_once(':').ok_or_else(|| UrosError::new(ErrorKind::Parse, format!("uri missing port: {uri}")))?;
    let ip = uros_base::parse_ipv4_literal(host)?;
    let port: u16 = port.parse().map_err(|_| UrosError::new(ErrorKind::Parse, format!("bad port in uri: {uri}")))?;
    Ok(Address::new(ip, port))
}

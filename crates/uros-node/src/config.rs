use std::time::Duration;

use serde::{Deserialize, Serialize};
use uros_base::Address;
use uros_threading::ThreadPriority;

/// Node configuration: name, the three listen/connect addresses, and the
/// compile-time pool sizes. `Default` supplies the values spec.md calls
/// out as defaults; no on-disk persistence is implemented, only the
/// `Default` + serde shape for an optional JSON load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_name: String,
    pub master_addr: AddressConfig,
    pub xmlrpc_listen: AddressConfig,
    pub tcpros_listen: AddressConfig,
    pub slave_pool_size: usize,
    pub tcpros_server_pool_size: usize,
    pub tcpros_client_pool_size: usize,
    #[serde(with = "duration_millis")]
    pub rpc_timeout: Duration,
    pub rosout_topic: Option<String>,
}

/// Serde-friendly mirror of [`Address`] (plain `Ipv4Addr` doesn't round
/// trip through `serde_json` the way a `[u8; 4]`-shaped struct does, so
/// this stays a config-layer type and converts at the edge).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddressConfig {
    pub ip: [u8; 4],
    pub port: u16,
}

impl AddressConfig {
    pub fn to_address(self) -> Address {
        Address::new(self.ip.into(), self.port)
    }
}

impl From<Address> for AddressConfig {
    fn from(addr: Address) -> Self {
        Self { ip: addr.ip.octets(), port: addr.port }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: "uros_node".to_owned(),
            master_addr: AddressConfig { ip: [127, 0, 0, 1], port: 11311 },
            xmlrpc_listen: AddressConfig { ip: [0, 0, 0, 0], port: 0 },
            tcpros_listen: AddressConfig { ip: [0, 0, 0, 0], port: 0 },
            slave_pool_size: 4,
            tcpros_server_pool_size: 4,
            tcpros_client_pool_size: 4,
            rpc_timeout: Duration::from_secs(5),
            rosout_topic: Some("/rosout".to_owned()),
        }
    }
}

impl NodeConfig {
    pub fn pool_priority(&self) -> ThreadPriority {
        ThreadPriority::OsDefault
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (value.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.node_name, "uros_node");
        assert_eq!(config.master_addr.to_address(), Address::loopback(11311));
        assert_eq!(config.xmlrpc_listen.to_address().port, 0);
    }

    #[test]
    fn round_trips_through_json() {
        let config = NodeConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: NodeConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.node_name, config.node_name);
        assert_eq!(parsed.slave_pool_size, config.slave_pool_size);
    }
}

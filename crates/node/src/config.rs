//! YAML configuration of a node process.
use std::fs;
use std::io;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::prelude::chord_core::consts::DEFAULT_IDENTIFIER_BITS;
use crate::prelude::chord_core::consts::DEFAULT_SCHEME;
use crate::prelude::chord_core::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::prelude::chord_core::dht::IdSpace;
use crate::prelude::Bootstrap;
use crate::prelude::NodeId;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_EXTERNAL_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_EXTERNAL_PORT: u16 = 8000;
pub const DEFAULT_VIRTUAL_NODES: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_external_address")]
    pub external_address: String,
    #[serde(default = "default_external_port")]
    pub external_port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_identifier_bits")]
    pub identifier_bits: u8,
    /// Milliseconds between two stabilization ticks.
    #[serde(default = "default_stabilize_interval")]
    pub stabilize_interval: u64,
    /// Fixed identifier of the first hosted member, as hex.
    /// A random one is minted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default = "default_virtual_nodes")]
    pub virtual_nodes: usize,
    /// When there is no bootstrap in the YAML file, this process seeds a new ring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Bootstrap>,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_external_address() -> String {
    DEFAULT_EXTERNAL_ADDRESS.to_string()
}

fn default_external_port() -> u16 {
    DEFAULT_EXTERNAL_PORT
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_identifier_bits() -> u8 {
    DEFAULT_IDENTIFIER_BITS
}

fn default_stabilize_interval() -> u64 {
    DEFAULT_STABILIZE_INTERVAL_MS
}

fn default_virtual_nodes() -> usize {
    DEFAULT_VIRTUAL_NODES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            external_address: default_external_address(),
            external_port: default_external_port(),
            scheme: default_scheme(),
            identifier_bits: default_identifier_bits(),
            stabilize_interval: default_stabilize_interval(),
            node_id: None,
            virtual_nodes: default_virtual_nodes(),
            join: None,
        }
    }
}

impl Config {
    /// Check values serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| Error::InvalidBindAddr(self.bind_addr.clone()))?;
        let space = IdSpace::new(self.identifier_bits)?;
        if let Some(id) = self.node_id {
            if !space.contains(id) {
                return Err(Error::InvalidConfig(format!(
                    "node_id {} exceeds {} bits",
                    id, self.identifier_bits
                )));
            }
        }
        if self.virtual_nodes == 0 {
            return Err(Error::InvalidConfig(
                "virtual_nodes must be at least 1".to_string(),
            ));
        }
        if self.stabilize_interval == 0 {
            return Err(Error::InvalidConfig(
                "stabilize_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}

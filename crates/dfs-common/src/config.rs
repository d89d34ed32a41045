use serde::Deserialize;
use std::fs;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct NameServiceConfig {
    pub bind_addr: String,
    pub snapshot_path: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DataNodeConfig {
    pub bind_addr: String,
    pub data_path: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ClientConfig {
    pub name_service_addr: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct JobManagerConfig {
    pub bind_addr: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DaemonConfig {
    pub bind_addr: String,
    pub work_path: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CommonConfig {
    pub name_service_addr: String,
    pub job_manager_addr: String,
    pub heartbeat_interval: u64,
    pub chunk_size: u64,
    pub replication_factor: usize,
    pub barrier_poll_interval_ms: u64,
    pub log_level: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Config {
    pub name_service: NameServiceConfig,
    pub data_node: DataNodeConfig,
    pub client: ClientConfig,
    pub job_manager: JobManagerConfig,
    pub daemon: DaemonConfig,
    pub common: CommonConfig,
}

pub fn load_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config_content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_content)?;
    Ok(config)
}

use crate::prelude::*;
use crate::goodwe::{family, transport};

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use serde_yaml;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "Vec::new")]
    pub inverters: Vec<Inverter>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Inverter {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Inverter {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub host: String,
    #[serde(default = "Config::default_port")]
    pub port: u16,

    /// ET/EH/BT/BH, ES/EM/BP or DT/NS/XS; skips discovery when set
    pub family: Option<String>,
    pub comm_addr: Option<u8>,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_timeout")]
    pub timeout: Duration,
    #[serde(default = "Config::default_retries")]
    pub retries: u32,

    #[serde(default)]
    pub include_unknown: bool,
}
impl Inverter {
    /// Single inverter given on the command line instead of in a file.
    pub fn from_host(host: &str, port: Option<u16>, family: Option<String>) -> Self {
        Self {
            enabled: true,
            host: host.to_string(),
            port: port.unwrap_or_else(Config::default_port),
            family,
            comm_addr: None,
            timeout: Config::default_timeout(),
            retries: Config::default_retries(),
            include_unknown: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn comm_addr(&self) -> Option<u8> {
        self.comm_addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn include_unknown(&self) -> bool {
        self.include_unknown
    }
} // }}}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        let config: Self = serde_yaml::from_str(&content)?;

        info!("Configuration loaded:");
        info!("  Inverters: {} configured, {} enabled",
            config.inverters.len(),
            config.inverters.iter().filter(|i| i.enabled).count()
        );
        for (i, inv) in config.inverters.iter().enumerate() {
            info!("    Inverter[{}]:", i);
            info!("      Enabled: {}", inv.enabled);
            info!("      Host: {}:{}", inv.host, inv.port);
            info!("      Family: {}", inv.family.as_deref().unwrap_or("auto"));
            if let Some(addr) = inv.comm_addr {
                info!("      Comm Address: {:#04x}", addr);
            }
            info!("      Timeout: {}s, {} retries", inv.timeout.as_secs(), inv.retries);
        }
        info!("  Log Level: {}", config.loglevel);

        config.validate()?;
        Ok(config)
    }

    /// Config holding just the given inverter, for `--host` runs.
    pub fn single(inverter: Inverter) -> Result<Self> {
        let config = Self {
            inverters: vec![inverter],
            loglevel: Self::default_loglevel(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (i, inverter) in self.enabled_inverters().enumerate() {
            if inverter.host.is_empty() {
                bail!("inverters[{}].host cannot be empty", i);
            }
            if inverter.port == 0 {
                bail!("inverters[{}].port must be between 1 and 65535", i);
            }
            if inverter.timeout.is_zero() {
                bail!("inverters[{}].timeout must be at least 1 second", i);
            }
            if let Some(name) = inverter.family() {
                if family::by_name(name).is_none() {
                    bail!("inverters[{}].family {} is not a known inverter family", i, name);
                }
            }
        }

        Ok(())
    }

    pub fn inverters(&self) -> &[Inverter] {
        &self.inverters
    }

    pub fn enabled_inverters(&self) -> impl Iterator<Item = &Inverter> {
        self.inverters.iter().filter(|i| i.enabled())
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    fn default_port() -> u16 {
        transport::DEFAULT_PORT
    }

    fn default_timeout() -> Duration {
        crate::goodwe::DEFAULT_TIMEOUT
    }

    fn default_retries() -> u32 {
        crate::goodwe::DEFAULT_RETRIES
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}

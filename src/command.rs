use crate::prelude::*;
use crate::goodwe::{self, Inverter, Value};

use {clap::Subcommand, serde_json::json};

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Broadcast a search for wifi modules on the local network
    Scan,
    /// Print model, serial number and firmware versions
    Info,
    /// Print all runtime sensor values
    Runtime {
        /// Include fields whose meaning is unknown
        #[clap(long = "unknown")]
        unknown: bool,
    },
    /// Print all settings
    Settings,
    /// Read one setting
    Get { id: String },
    /// Write one setting
    Set { id: String, value: String },
    /// 0 general, 1 off-grid, 2 backup, 3 export off (DT)
    WorkMode { mode: i64 },
    /// Grid export limit in W
    ExportLimit { limit: i64 },
    /// On-grid battery depth of discharge in %
    BatteryDod { dod: i64 },
}

impl Command {
    /// Whether the command addresses configured inverters, as opposed to the
    /// local network.
    pub fn needs_inverter(&self) -> bool {
        !matches!(self, Command::Scan)
    }

    /// Broadcast search, printed as `{ip, mac, name}`.
    pub async fn scan(timeout: Duration, retries: u32) -> Result<serde_json::Value> {
        let response = goodwe::search_inverters(timeout, retries).await?;
        let reply = goodwe::parse_search_reply(&response)?;
        Ok(serde_json::to_value(reply)?)
    }

    /// Run against one connected inverter and return what to print.
    pub async fn run(&self, inverter: &mut Inverter, include_unknown: bool) -> Result<serde_json::Value> {
        use Command::*;

        let output = match self {
            Scan => bail!("scan does not address a single inverter"),
            Info => serde_json::to_value(inverter.read_device_info().await?)?,
            Runtime { unknown } => {
                serde_json::to_value(inverter.read_runtime_data(*unknown || include_unknown).await?)?
            }
            Settings => serde_json::to_value(inverter.read_settings_data().await?)?,
            Get { id } => json!({ id.as_str(): inverter.read_setting(id).await? }),
            Set { id, value } => {
                let value: Value = value.parse().map_err(|_| anyhow!("cannot parse {} as a value", value))?;
                inverter.write_setting(id, &value).await?;
                json!({ id.as_str(): value })
            }
            WorkMode { mode } => {
                inverter.set_work_mode(*mode).await?;
                json!({ "work_mode": mode })
            }
            ExportLimit { limit } => {
                inverter.set_grid_export_limit(*limit).await?;
                json!({ "grid_export_limit": limit })
            }
            BatteryDod { dod } => {
                inverter.set_ongrid_battery_dod(*dod).await?;
                json!({ "battery_dod": dod })
            }
        };

        Ok(output)
    }
}

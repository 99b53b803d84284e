use backpack_lcd::lcd::display::DisplayConfig;
use dotenv::var;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Number of the `/dev/i2c-N` bus.
    pub bus: u8,
    /// Seconds between two scroll steps.
    pub scroll_seconds: u64,
    pub display: DisplayConfig,
}

impl Config {
    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("lcd.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = var("CONFIG_FILE").unwrap_or_else(|_| "lcd.json".to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus: 1,
            scroll_seconds: 5,
            display: DisplayConfig::default(),
        }
    }
}

mod config;

use crate::config::Config;
use backpack_lcd::lcd::display::LcdDisplay;
use backpack_lcd::mock::Recorder;
use backpack_lcd::{Clock, I2cBus};
use dotenv::dotenv;
use log::{debug, info};
use std::env::{var, var_os};
use std::time::Duration;
use sysinfo::System;

const UNKNOWN_STR: &str = "???";
const BANNER: &str = "backpack_lcd: text longer than the panel scrolls one line at a time.";

fn run<B: I2cBus, C: Clock>(bus: B, clock: C, config: &Config, text: &str) -> eyre::Result<()> {
    let scroll_interval = Duration::from_secs(config.scroll_seconds);

    let mut lcd = LcdDisplay::new(bus, clock, config.display.clone())?;
    debug!("{:?} initialized.", lcd);

    lcd.write_line(System::host_name().as_deref().unwrap_or(UNKNOWN_STR), 1)?;
    lcd.write_line(System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR), 2)?;
    lcd.hold(scroll_interval);

    info!("Printing {:?}", text);
    lcd.print(text, scroll_interval)?;
    lcd.hold(scroll_interval);

    lcd.set_backlight(false);
    lcd.clear()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    info!(
        "Hello, {}!",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );

    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    debug!("{:?}", config);

    let bus_no: u8 = match var("LCD_I2C_BUS") {
        Ok(bus) => bus.parse()?,
        Err(_) => config.bus,
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        BANNER.to_string()
    } else {
        args.join(" ")
    };

    if var_os("LCD_DRY_RUN").is_some() {
        info!("Dry run, nothing is sent to /dev/i2c-{}", bus_no);
        let recorder = Recorder::new();
        run(recorder.bus(), recorder.clock(), &config, &text)?;
        info!(
            "{} bus writes, controller received {:?}",
            recorder.writes().len(),
            recorder.text()
        );
        return Ok(());
    }

    open_and_run(bus_no, &config, &text)
}

#[cfg(target_os = "linux")]
fn open_and_run(bus_no: u8, config: &Config, text: &str) -> eyre::Result<()> {
    use backpack_lcd::clock::ThreadClock;

    let bus = backpack_lcd::i2c::LinuxI2cBus::open(bus_no)?;
    info!("LCD @ {:?}, address {:#04x}", bus, config.display.address);
    run(bus, ThreadClock, config, text)
}

#[cfg(not(target_os = "linux"))]
fn open_and_run(_bus_no: u8, _config: &Config, _text: &str) -> eyre::Result<()> {
    Err(eyre::eyre!("I2C access needs Linux i2c-dev, use LCD_DRY_RUN=1 elsewhere"))
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! NV4 RAMDAC command line driver
//!
//! Builds a device from a configuration file, applies register writes,
//! advances emulated time and prints the resulting state as JSON.

use std::path::PathBuf;

use clap::Parser;
use nv4emu::core::config::Nv4Config;
use nv4emu::core::device::Nv4Device;
use nv4emu::core::mmio::RegisterWrite;
use nv4emu::Result;

#[derive(Parser)]
#[command(name = "nv4-ramdac")]
#[command(about = "Drive the NV4 RAMDAC clocks and print the device state", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults to power-on values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Register write applied before stepping, as ADDRESS=VALUE (repeatable)
    #[arg(short, long = "write", value_name = "ADDRESS=VALUE")]
    writes: Vec<RegisterWrite>,

    /// Number of time steps to run
    #[arg(short, long, default_value = "1")]
    steps: u32,

    /// Emulated microseconds per step
    #[arg(short, long, default_value = "1000.0")]
    elapsed_us: f64,

    /// Put the display unit in extended (accelerated) mode
    #[arg(long = "override")]
    override_mode: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Nv4Config::load(path)?,
        None => Nv4Config::default(),
    };

    let mut device = Nv4Device::new(&config);
    device.display().borrow_mut().set_override(cli.override_mode);

    for write in &cli.writes {
        log::info!("Write 0x{:06x} = 0x{:08x}", write.address, write.value);
        device.write32(write.address, write.value);
    }

    log::info!("Running {} steps of {} us", cli.steps, cli.elapsed_us);

    for _ in 0..cli.steps {
        device.advance(cli.elapsed_us);
    }

    let snapshot = serde_json::to_string_pretty(&device.snapshot())?;
    println!("{}", snapshot);

    Ok(())
}

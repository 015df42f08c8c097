// Copyright 2024 Felix Engl
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


mod args;
mod logging;
mod run;

pub use args::{RunInstruction, UniqArgs};
pub use logging::configure_logging;
pub use run::{filter_lines, run, run_to_stdout, LineReceiver, RunStats};

use crate::app::args::{consume_args, ConsumedArgs};
use crate::config::{BackendKind, Configs};
use anyhow::Context;
use camino::Utf8Path;

/// The file written by --generate-example-config
pub const EXAMPLE_CONFIG_FILE: &str = "uri_uniq.json";

/// A config with a disk cached backend and a processed key log.
pub fn create_example_config() -> Configs {
    let mut configs = Configs::default();
    configs.filter.backend = BackendKind::CachedDisk;
    configs.filter.capacity_power_of_two = Some(20);
    configs.filter.processed_key_log = Some("uri_uniq/processed.log".into());
    configs
}

/// Writes the example config to [path] as pretty json.
pub fn write_example_config(path: impl AsRef<Utf8Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(&create_example_config())?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {path}!"))
}

pub fn exec_args(args: UniqArgs) -> anyhow::Result<()> {
    match consume_args(args).context("Failed to load the config!")? {
        ConsumedArgs::GenerateExampleConfig => {
            write_example_config(EXAMPLE_CONFIG_FILE)?;
            println!("Wrote {EXAMPLE_CONFIG_FILE}.");
            Ok(())
        }
        ConsumedArgs::RunConfig(instruction) => {
            configure_logging(&instruction.configs)?;
            run_to_stdout(&instruction)?;
            log::info!("Exit application.");
            Ok(())
        }
    }
}

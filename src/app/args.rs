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


use crate::config::{BackendKind, Configs};
use camino::Utf8PathBuf;
use clap::Parser;
use std::str::FromStr;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
/// Reads uris line by line and prints every uri seen for the first time.
pub struct UniqArgs {
    /// Writes an exemplary config to uri_uniq.json and exits.
    #[arg(long)]
    pub generate_example_config: bool,
    /// The folder containing the configs.
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,
    /// Overrides the backend from the config.
    #[arg(short, long, value_parser = BackendKind::from_str)]
    pub backend: Option<BackendKind>,
    /// Overrides the log level from the config.
    #[arg(long)]
    pub override_log_level: Option<log::LevelFilter>,
    /// Log to file
    #[arg(long)]
    pub log_to_file: bool,
    /// A processed key log whose keys count as seen before reading the input.
    #[arg(short, long)]
    pub seed_log: Option<Utf8PathBuf>,
    /// Overrides the processed key log from the config.
    #[arg(short, long)]
    pub processed_key_log: Option<Utf8PathBuf>,
    /// File with one uri per line. Reads stdin if missing.
    pub input: Option<Utf8PathBuf>,
}

#[derive(Debug)]
pub enum ConsumedArgs {
    RunConfig(RunInstruction),
    GenerateExampleConfig,
}

/// Everything necessary to execute a run.
#[derive(Debug, Clone)]
pub struct RunInstruction {
    pub configs: Configs,
    pub input: Option<Utf8PathBuf>,
    pub seed_log: Option<Utf8PathBuf>,
}

/// Consumes the args and returns everything necessary to execute the filter.
pub(crate) fn consume_args(args: UniqArgs) -> Result<ConsumedArgs, config::ConfigError> {
    if args.generate_example_config {
        return Ok(ConsumedArgs::GenerateExampleConfig);
    }
    let mut configs = match args.config {
        Some(ref folder) => Configs::load_from(folder)?,
        None => Configs::discover_or_default()?,
    };
    if let Some(backend) = args.backend {
        configs.filter.backend = backend;
    }
    if let Some(level) = args.override_log_level {
        configs.system.log_level = level;
    }
    if args.log_to_file {
        configs.system.log_to_file = true;
    }
    if args.processed_key_log.is_some() {
        configs.filter.processed_key_log = args.processed_key_log;
    }
    Ok(ConsumedArgs::RunConfig(RunInstruction {
        configs,
        input: args.input,
        seed_log: args.seed_log,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use camino_tempfile::Utf8TempDir;

    #[test]
    fn args_override_the_config() {
        let dir = Utf8TempDir::new().unwrap();
        let args = UniqArgs::parse_from([
            "uri-uniq",
            "--config",
            dir.path().as_str(),
            "--backend",
            "cached-disk",
            "--override-log-level",
            "debug",
            "-p",
            "processed.log",
            "urls.txt",
        ]);
        let ConsumedArgs::RunConfig(instruction) = consume_args(args).unwrap() else {
            panic!("Expected a run config!")
        };
        assert_eq!(instruction.configs.filter.backend, BackendKind::CachedDisk);
        assert_eq!(instruction.configs.system.log_level, log::LevelFilter::Debug);
        assert_eq!(
            instruction.configs.filter.processed_key_log,
            Some(Utf8PathBuf::from("processed.log"))
        );
        assert_eq!(instruction.input, Some(Utf8PathBuf::from("urls.txt")));
        assert!(instruction.seed_log.is_none());
    }

    #[test]
    fn unknown_backends_are_rejected() {
        assert!(UniqArgs::try_parse_from(["uri-uniq", "--backend", "redis"]).is_err());
    }
}

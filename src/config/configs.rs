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


use crate::config::{SystemConfig, UniqFilterConfig};
use camino::Utf8Path;
use config::Config;
use serde::{Deserialize, Serialize};

/// Prefix of the environment variables overriding the config, e.g. URI_UNIQ.FILTER.BACKEND
pub const ENV_PREFIX: &str = "URI_UNIQ";

/// A collection of all configs of the filter process.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename(serialize = "Config"))]
pub struct Configs {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub filter: UniqFilterConfig,
}

impl Configs {
    pub fn new(system: SystemConfig, filter: UniqFilterConfig) -> Self {
        Self { system, filter }
    }

    /// Loads `uri_uniq` or `config` from [folder], overridden by the environment.
    pub fn load_from<P: AsRef<Utf8Path>>(folder: P) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("./config").required(false))
            .add_source(config::File::with_name("./uri_uniq").required(false))
            .add_source(
                config::File::with_name(folder.as_ref().join("uri_uniq").as_str()).required(false),
            )
            .add_source(
                config::File::with_name(folder.as_ref().join("config").as_str()).required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("."))
            .build()?
            .try_deserialize()
    }

    pub fn discover_or_default() -> Result<Self, config::ConfigError> {
        match Config::builder()
            .add_source(config::File::with_name("./uri_uniq"))
            .add_source(config::File::with_name("./uri_uniq/config"))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("."))
            .build()
        {
            Ok(value) => value.try_deserialize(),
            Err(_) => Ok(Default::default()),
        }
    }

    pub fn discover() -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("uri_uniq/config"))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("."))
            .build()?
            .try_deserialize()
    }
}

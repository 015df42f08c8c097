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


//! Filters already seen uris out of a stream of uris.
//!
//! A [uniq::UriUniqFilter] remembers the uris it has seen in one of the
//! [fpset] stores and hands every new one to a [uniq::UriReceiver].

pub mod app;
pub mod config;
pub mod fingerprint;
pub mod fpset;
pub mod io;
pub mod uniq;

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

mod bloom;
mod cache;
mod cached_disk;
mod disk;
mod errors;
mod memory;
mod table;
mod traits;

pub use bloom::*;
pub use cache::*;
pub use cached_disk::*;
pub use disk::*;
pub use errors::*;
pub use memory::*;
pub use table::MAX_CAPACITY_POWER_OF_TWO;
pub use traits::*;

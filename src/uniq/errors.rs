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

use crate::fpset::FpSetError;
use crate::io::ErrorWithPath;
use thiserror::Error;

/// Errors of an [super::UriUniqFilter]. Any of them means the filter can no
/// longer decide if a uri is new.
#[derive(Debug, Error)]
pub enum UniqFilterError {
    #[error(transparent)]
    Set(#[from] FpSetError),
    #[error("The processed key log failed: {0}")]
    ProcessedKeyLog(#[source] ErrorWithPath),
    #[error("The key {0:?} can not be logged, logged keys must be non-empty without control characters or surrounding whitespace.")]
    UnloggableKey(String),
}

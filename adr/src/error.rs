// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson
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

use std::fmt;

use crate::id::Uuid;

/// The four taxonomic error kinds of the core.
#[derive(Clone, Debug)]
pub enum Error {
    /// Malformed archive, bad UUID string, schema mismatch. Fatal to the
    /// current operation; no state is mutated.
    Structural(String),

    /// A referenced UUID does not resolve, a field is missing, a geometry
    /// could not be polygonised. Logged with object context, processing
    /// continues with the field left at its default.
    Integrity { uuid: Option<Uuid>, message: String },

    /// An object the store expected to find does not exist.
    NotFound(Uuid),

    /// A dependency cycle was found while sorting the recompute graph.
    Cycle,

    /// The ingestion or recompute loop was cancelled.
    Cancelled,

    /// The on-disk schema does not match and migration was not permitted.
    SchemaMismatch { found: i64, expected: i64 },

    /// Underlying I/O failure, reported with path context.
    Io { path: String, message: String },

    #[cfg(feature = "sqlite")]
    Sqlite(String),
}

impl Error {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    pub fn integrity(uuid: Uuid, message: impl Into<String>) -> Self {
        Self::Integrity {
            uuid: Some(uuid),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, e: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural(msg) => write!(f, "structural error: {msg}"),
            Self::Integrity { uuid, message } => match uuid {
                Some(uuid) => write!(f, "data integrity warning ({uuid}): {message}"),
                None => write!(f, "data integrity warning: {message}"),
            },
            Self::NotFound(uuid) => write!(f, "object not found: {uuid}"),
            Self::Cycle => write!(f, "dependency cycle detected in recompute graph"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::SchemaMismatch { found, expected } => {
                write!(f, "schema mismatch: found {found}, expected {expected}")
            }
            Self::Io { path, message } => write!(f, "I/O error at {path}: {message}"),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(msg) => write!(f, "sqlite error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}

// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The lookup state machine and the four iterative operations built on
//! top of it.

pub mod discover_neighbors;
pub mod find_value;
pub mod lookup;
pub mod notify_peer;
pub mod store_value;

/// Concurrency factor for iterative lookups: number of outstanding
/// find-peer/find-value requests per round.
pub const ALPHA: usize = 3;

/// Replication factor: number of peers a stored value is sent to.
pub const C: usize = 3;

// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! In-memory mapping from identifier to stored bytes. No eviction, no
//! persistence — last write wins.

use std::collections::HashMap;

use crate::id::Id;

#[derive(Default)]
pub struct ValueStore {
    values: HashMap<Id, Vec<u8>>,
}

impl ValueStore {
    pub fn new() -> ValueStore {
        ValueStore::default()
    }

    pub fn put(&mut self, key: Id, value: Vec<u8>) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &Id) -> Option<&Vec<u8>> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &Id) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut store = ValueStore::new();
        let key = Id::from_hex("abc").expect("valid hex");
        store.put(key, vec![1, 2, 3]);
        store.put(key, vec![4, 5, 6]);
        assert_eq!(store.get(&key), Some(&vec![4, 5, 6]));
    }

    #[test]
    fn missing_key_returns_none() {
        let store = ValueStore::new();
        assert_eq!(store.get(&Id::ZERO), None);
    }
}

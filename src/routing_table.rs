// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The bucketed, XOR-distance-ordered cache of known peers.
//!
//! Grounded on `ant-node/src/networking/kad/kbucket.rs`'s
//! insertion-ordered `VecDeque` buckets, reworked to the single
//! "largest bucket may overflow" split policy instead of the teacher's
//! per-bucket replacement cache (see DESIGN.md).

use std::collections::VecDeque;
use std::net::SocketAddr;

use rand::RngCore;

use crate::id::{BIT_LEN, Id};

/// A random identifier guaranteed to fall into `bucket` relative to
/// `local_id` — used to pick a refresh target for a bucket that needs
/// contacting. Matches bits `0..bucket` to `local_id`, flips the bit at
/// `bucket`, and randomizes the rest.
pub fn random_id_in_bucket(local_id: &Id, bucket: usize, rng: &mut impl RngCore) -> Id {
    let mut id = Id::random(rng);
    let prefix_len = bucket.min(BIT_LEN - 1);
    for i in 0..prefix_len {
        id.set_bit(i, local_id.bit(i));
    }
    if bucket < BIT_LEN - 1 {
        id.set_bit(bucket, !local_id.bit(bucket));
    }
    id
}

/// A `(id, endpoint)` pair held in the routing table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Peer {
    pub id: Id,
    pub endpoint: SocketAddr,
}

impl Peer {
    pub fn new(id: Id, endpoint: SocketAddr) -> Peer {
        Peer { id, endpoint }
    }
}

impl From<crate::wire::message::Peer> for Peer {
    fn from(p: crate::wire::message::Peer) -> Peer {
        Peer::new(p.id, p.endpoint)
    }
}

impl From<Peer> for crate::wire::message::Peer {
    fn from(p: Peer) -> crate::wire::message::Peer {
        crate::wire::message::Peer::new(p.id, p.endpoint)
    }
}

/// A bucketed, ordered cache of known peers, keyed by XOR distance from
/// a local identifier.
pub struct RoutingTable {
    local_id: Id,
    k: usize,
    buckets: Vec<VecDeque<Peer>>,
    /// Index of the single bucket currently allowed to grow past `k`.
    largest_bucket: usize,
    peer_count: usize,
}

impl RoutingTable {
    /// Creates an empty table for `local_id` with bucket capacity `k`.
    pub fn new(local_id: Id, k: usize) -> RoutingTable {
        RoutingTable {
            local_id,
            k,
            buckets: (0..BIT_LEN).map(|_| VecDeque::new()).collect(),
            largest_bucket: 0,
            peer_count: 0,
        }
    }

    pub fn local_id(&self) -> Id {
        self.local_id
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Index of the first bit at which `id` differs from the local id,
    /// capped to `BIT_LEN - 2` (159 is reserved for local-id-adjacent
    /// collisions and never split).
    fn bucket_index(&self, id: &Id) -> usize {
        for i in 0..(BIT_LEN - 1) {
            if id.bit(i) != self.local_id.bit(i) {
                return i;
            }
        }
        BIT_LEN - 1
    }

    fn contains(&self, id: &Id) -> bool {
        self.buckets.iter().any(|b| b.iter().any(|p| p.id == *id))
    }

    /// Inserts `(id, endpoint)`. Returns `false` if `id` is the local
    /// id, already present, or the target bucket is full and is not
    /// the currently-splittable largest bucket.
    pub fn push(&mut self, id: Id, endpoint: SocketAddr) -> bool {
        if id == self.local_id || self.contains(&id) {
            return false;
        }

        let idx = self.bucket_index(&id);
        let bucket = &mut self.buckets[idx];

        if bucket.len() < self.k {
            bucket.push_back(Peer::new(id, endpoint));
            self.peer_count += 1;
            return true;
        }

        if idx == self.largest_bucket {
            bucket.push_back(Peer::new(id, endpoint));
            self.peer_count += 1;
            if self.largest_bucket < BIT_LEN - 1 {
                self.largest_bucket += 1;
            }
            return true;
        }

        false
    }

    /// Removes the peer with the given id. Returns `true` if it was
    /// found.
    pub fn remove(&mut self, id: &Id) -> bool {
        for bucket in &mut self.buckets {
            if let Some(pos) = bucket.iter().position(|p| p.id == *id) {
                bucket.remove(pos);
                self.peer_count -= 1;
                return true;
            }
        }
        false
    }

    /// Total number of peers held across all buckets.
    pub fn peer_count(&self) -> usize {
        self.peer_count
    }

    /// Iterates peers in increasing XOR distance from `target`.
    pub fn find(&self, target: &Id) -> ClosestIter<'_> {
        let start = self.bucket_index(target).max(self.lowest_nonempty_bucket());
        ClosestIter {
            buckets: &self.buckets,
            bucket_idx: Some(start),
            peer_idx: 0,
        }
    }

    /// Returns up to `max` peers closest to `target`.
    pub fn closest(&self, target: &Id, max: usize) -> Vec<Peer> {
        self.find(target).take(max).copied().collect()
    }

    /// Indices of every bucket currently holding at least one peer.
    pub fn non_empty_buckets(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(i, _)| i)
    }

    /// The lowest bucket index such that the prefix of buckets
    /// `0..=index` holds at least `k` peers (or the highest bucket
    /// index if the table holds fewer than `k` peers total).
    fn lowest_nonempty_bucket(&self) -> usize {
        let mut peers = 0usize;
        let last = self.buckets.len() - 1;
        let mut i = 0usize;
        while i != last && peers <= self.k {
            peers += self.buckets[i].len();
            i += 1;
        }
        i
    }

    /// A JSON-shaped diagnostic dump: local id, peer count, bucket
    /// size, and per-bucket `{index, bit_value, peer_count}` records.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        out.push_str("{\n");
        out.push_str(&format!("  \"id\": \"{}\",\n", self.local_id));
        out.push_str(&format!("  \"peer_count\": {},\n", self.peer_count));
        out.push_str(&format!("  \"k_bucket_size\": {},\n", self.k));
        out.push_str("  \"k_buckets\": [\n");
        for (i, bucket) in self.buckets.iter().enumerate() {
            out.push_str(&format!(
                "    {{ \"index\": {}, \"bit_value\": {}, \"peer_count\": {} }}{}\n",
                i,
                self.local_id.bit(i),
                bucket.len(),
                if i + 1 == self.buckets.len() { "" } else { "," }
            ));
        }
        out.push_str("  ]\n}\n");
        out
    }
}

/// A closest-first visitor over a routing table's peers, walking the
/// starting bucket in insertion order and then descending through
/// lower-indexed buckets, skipping empty ones.
pub struct ClosestIter<'a> {
    buckets: &'a [VecDeque<Peer>],
    bucket_idx: Option<usize>,
    peer_idx: usize,
}

impl<'a> Iterator for ClosestIter<'a> {
    type Item = &'a Peer;

    fn next(&mut self) -> Option<&'a Peer> {
        loop {
            let idx = self.bucket_idx?;
            let bucket = &self.buckets[idx];
            if let Some(peer) = bucket.get(self.peer_idx) {
                self.peer_idx += 1;
                return Some(peer);
            }
            if idx == 0 {
                self.bucket_idx = None;
                return None;
            }
            self.bucket_idx = Some(idx - 1);
            self.peer_idx = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpoint(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn id_with_bit(bit: usize) -> Id {
        let mut id = Id::ZERO;
        id.set_bit(bit, true);
        id
    }

    #[test]
    fn bucket_index_matches_first_differing_bit() {
        let table = RoutingTable::new(Id::ZERO, 20);
        let id = id_with_bit(5);
        assert_eq!(table.bucket_index(&id), 5);
    }

    #[test]
    fn push_rejects_local_id() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        assert!(!table.push(Id::ZERO, endpoint(1)));
        assert_eq!(table.peer_count(), 0);
    }

    #[test]
    fn push_rejects_duplicate_id() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        let id = id_with_bit(10);
        assert!(table.push(id, endpoint(1)));
        assert!(!table.push(id, endpoint(2)));
        assert_eq!(table.peer_count(), 1);
    }

    #[test]
    fn no_identifier_appears_twice() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        for i in 0..50 {
            let id = Id::from_hex(&format!("{i:x}")).expect("valid hex");
            table.push(id, endpoint(i as u16));
        }
        let mut seen = std::collections::HashSet::new();
        for peer in table.find(&Id::ZERO) {
            assert!(seen.insert(peer.id), "duplicate id in routing table");
        }
    }

    #[test]
    fn accepts_kth_peer_everywhere_but_rejects_k_plus_1th_outside_largest() {
        let mut table = RoutingTable::new(Id::ZERO, 2);
        // Bucket 159 is the largest bucket initially... use bucket 0 explicitly
        // by forcing largest_bucket to move away from it first.
        let far_bit = id_with_bit(0);
        // fill bucket 0 to k
        let mut a = Id::ZERO;
        a.set_bit(0, true);
        a.set_bit(1, true);
        let mut b = Id::ZERO;
        b.set_bit(0, true);
        b.set_bit(2, true);
        assert!(table.push(a, endpoint(1)));
        assert!(table.push(b, endpoint(2)));
        assert_eq!(table.peer_count(), 2);
        // largest bucket is still 0 (never overflowed yet), so bucket 0 accepts overflow
        let mut c = Id::ZERO;
        c.set_bit(0, true);
        c.set_bit(3, true);
        assert!(table.push(c, endpoint(3)));
        assert_eq!(table.peer_count(), 3);
        // now largest bucket moved to 1; bucket 0 is full and non-largest, rejects
        let mut d = Id::ZERO;
        d.set_bit(0, true);
        d.set_bit(4, true);
        assert!(!table.push(d, endpoint(4)));
        assert_eq!(table.peer_count(), 3);
        let _ = far_bit;
    }

    #[test]
    fn remove_returns_true_only_when_found() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        let id = id_with_bit(3);
        assert!(!table.remove(&id));
        table.push(id, endpoint(1));
        assert!(table.remove(&id));
        assert_eq!(table.peer_count(), 0);
        assert!(!table.remove(&id));
    }

    #[test]
    fn peer_count_equals_sum_of_bucket_sizes() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        for i in 1..20 {
            table.push(id_with_bit(i), endpoint(i as u16));
        }
        let sum: usize = table.buckets.iter().map(|b| b.len()).sum();
        assert_eq!(sum, table.peer_count());
    }

    #[test]
    fn find_yields_closest_first() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        let near = id_with_bit(159);
        let far = id_with_bit(0);
        table.push(far, endpoint(1));
        table.push(near, endpoint(2));
        let ordered: Vec<Id> = table.find(&Id::ZERO).map(|p| p.id).collect();
        assert_eq!(ordered, vec![near, far]);
    }

    #[test]
    fn random_id_in_bucket_lands_in_requested_bucket() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let table = RoutingTable::new(Id::ZERO, 20);
        for bucket in [0usize, 5, 42, 159] {
            let id = random_id_in_bucket(&Id::ZERO, bucket, &mut rng);
            assert_eq!(table.bucket_index(&id), bucket);
        }
    }

    #[test]
    fn non_empty_buckets_reflects_inserted_peers() {
        let mut table = RoutingTable::new(Id::ZERO, 20);
        assert_eq!(table.non_empty_buckets().count(), 0);
        table.push(id_with_bit(3), endpoint(1));
        table.push(id_with_bit(9), endpoint(2));
        let indices: Vec<usize> = table.non_empty_buckets().collect();
        assert_eq!(indices, vec![3, 9]);
    }
}

//! Splits outgoing bundles that exceed a link's MTU and reassembles incoming
//! fragments back into the original bundle.

use bp7::block::{Block, Type as BlockType};
use bp7::bundle::Bundle;
use bp7::dtn_time::DtnTime;
use bp7::primary_block::FragmentInfo;
use bp7::BundleId;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, trace};

/// How long a fragment set's ID is remembered as abandoned after its
/// earliest-expiring fragment times out, so a straggling retransmission
/// does not resurrect it. Matches the default cleanup-interval cadence.
const TOMBSTONE_RETENTION_SECS: u64 = 60;

/// The result of attempting to split a bundle for a given MTU.
pub enum SplitOutcome {
    /// Fragmentation was refused (must-not-fragment, administrative record)
    /// or unnecessary (the bundle already fits): send the bundle as-is.
    Whole,
    /// The bundle was split into these ordered fragments.
    Fragments(Vec<Bundle>),
}

/// Splits `bundle` into fragments no larger than `max_fragment_size` bytes
/// of encoded form, or returns [`SplitOutcome::Whole`] when splitting is
/// refused or unneeded.
pub fn split(bundle: &Bundle, max_fragment_size: usize) -> SplitOutcome {
    if bundle.primary.flags.do_not_fragment || bundle.primary.flags.is_admin_record {
        return SplitOutcome::Whole;
    }
    if bundle.emit().len() <= max_fragment_size {
        return SplitOutcome::Whole;
    }

    let header_overhead = header_overhead(bundle);
    let budget = std::cmp::max(
        max_fragment_size.saturating_sub(header_overhead),
        max_fragment_size / 2,
    )
    .max(1);

    let payload = &bundle.payload().data;
    let total_len = payload.len() as u64;
    let fragment_count = total_len.div_ceil(budget as u64).max(1);

    let mut fragments = Vec::with_capacity(fragment_count as usize);
    for i in 0..fragment_count {
        let offset = i * budget as u64;
        let end = std::cmp::min(offset + budget as u64, total_len);
        let slice = payload[offset as usize..end as usize].to_vec();

        let mut primary = bundle.primary.clone();
        primary.flags.is_fragment = true;
        primary.fragment_info = Some(FragmentInfo {
            offset,
            total_len,
        });

        let mut blocks = Vec::new();
        for block in &bundle.blocks {
            if block.block_type == BlockType::Payload {
                continue;
            }
            if block.flags.must_replicate {
                blocks.push(Block::new(
                    block.block_type,
                    block.block_number,
                    block.flags,
                    block.crc_type,
                    block.data.clone(),
                ));
            }
        }
        blocks.push(Block::new(
            BlockType::Payload,
            1,
            bundle.payload().flags,
            bundle.payload().crc_type,
            slice,
        ));

        match Bundle::new(primary, blocks) {
            Ok(b) => fragments.push(b),
            Err(e) => {
                debug!(error = %e, "fragment assembly failed, aborting split");
                return SplitOutcome::Whole;
            }
        }
    }

    trace!(count = fragments.len(), budget, "bundle split into fragments");
    SplitOutcome::Fragments(fragments)
}

/// CBOR size of the primary block plus every canonical block marked
/// must-be-replicated-in-every-fragment: the overhead every fragment pays.
fn header_overhead(bundle: &Bundle) -> usize {
    let mut size = bundle.primary.emit().len();
    for block in &bundle.blocks {
        if block.flags.must_replicate {
            size += block.emit().len();
        }
    }
    size
}

struct FragmentSet {
    total_len: u64,
    template: Bundle,
    received: Vec<(u64, Vec<u8>)>,
    expiry: DtnTime,
}

impl FragmentSet {
    fn covers_whole(&self) -> bool {
        let mut ordered = self.received.clone();
        ordered.sort_by_key(|(offset, _)| *offset);
        let mut covered = 0u64;
        for (offset, data) in &ordered {
            if *offset > covered {
                return false;
            }
            covered = covered.max(offset + data.len() as u64);
        }
        covered >= self.total_len
    }

    fn reassemble(&self) -> Bundle {
        let mut buffer = vec![0u8; self.total_len as usize];
        for (offset, data) in &self.received {
            let start = *offset as usize;
            buffer[start..start + data.len()].copy_from_slice(data);
        }

        let mut primary = self.template.primary.clone();
        primary.flags.is_fragment = false;
        primary.fragment_info = None;

        let mut blocks: Vec<Block> = self
            .template
            .blocks
            .iter()
            .filter(|b| b.block_type != BlockType::Payload)
            .map(|b| Block::new(b.block_type, b.block_number, b.flags, b.crc_type, b.data.clone()))
            .collect();
        blocks.push(Block::new(
            BlockType::Payload,
            1,
            self.template.payload().flags,
            self.template.payload().crc_type,
            buffer,
        ));

        Bundle::new(primary, blocks).expect("reassembled bundle upholds the same invariants as its fragments")
    }
}

/// Outcome of handing a freshly decoded fragment to [`ReassemblyManager::add_fragment`].
pub enum AddFragmentOutcome {
    /// Recorded; the set is not yet complete.
    Accepted,
    /// A fragment at this offset was already recorded; this one was ignored.
    DuplicateOffset,
    /// This fragment's set had already been abandoned as expired; discarded
    /// rather than resurrecting the set.
    Abandoned,
    /// Coverage is now total: the reassembled bundle is returned and the set
    /// is removed.
    Completed(Bundle),
}

/// Accumulates fragments into their original bundles, keyed by the
/// reassembled Bundle ID (fragment-offset zeroed).
pub struct ReassemblyManager {
    sets: Mutex<HashMap<BundleId, FragmentSet>>,
    tombstones: Mutex<HashMap<BundleId, DtnTime>>,
}

impl Default for ReassemblyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReassemblyManager {
    pub fn new() -> Self {
        Self {
            sets: Mutex::new(HashMap::new()),
            tombstones: Mutex::new(HashMap::new()),
        }
    }

    fn original_id(fragment: &Bundle) -> BundleId {
        BundleId {
            source: fragment.primary.source.clone(),
            timestamp: fragment.primary.timestamp,
            is_fragment: false,
            fragment_offset: 0,
        }
    }

    /// Feeds one arriving fragment into its set, creating the set on first
    /// arrival. `fragment` must have `primary.flags.is_fragment` set.
    pub fn add_fragment(&self, fragment: Bundle) -> AddFragmentOutcome {
        let id = Self::original_id(&fragment);
        let now = DtnTime::now();

        {
            let mut tombstones = self.tombstones.lock().unwrap();
            if let Some(&forget_at) = tombstones.get(&id) {
                if now < forget_at {
                    trace!(%id, "fragment discarded: set already abandoned");
                    return AddFragmentOutcome::Abandoned;
                }
                tombstones.remove(&id);
            }
        }

        let Some(frag_info) = fragment.primary.fragment_info.clone() else {
            // Not actually a fragment; treat as a one-shot complete set.
            return AddFragmentOutcome::Completed(fragment);
        };

        let mut sets = self.sets.lock().unwrap();
        let expiry = fragment.expiry();
        let entry = sets.entry(id.clone()).or_insert_with(|| FragmentSet {
            total_len: frag_info.total_len,
            template: fragment.clone(),
            received: Vec::new(),
            expiry,
        });

        if entry.received.iter().any(|(offset, _)| *offset == frag_info.offset) {
            trace!(%id, offset = frag_info.offset, "duplicate fragment offset rejected");
            return AddFragmentOutcome::DuplicateOffset;
        }

        entry.expiry = entry.expiry.min(expiry);
        entry
            .received
            .push((frag_info.offset, fragment.payload().data.clone()));

        if entry.covers_whole() {
            let set = sets.remove(&id).unwrap();
            debug!(%id, "fragment set reassembled");
            return AddFragmentOutcome::Completed(set.reassemble());
        }

        AddFragmentOutcome::Accepted
    }

    /// Removes and tombstones every set whose earliest expiration is past.
    /// Returns the number of sets abandoned.
    pub fn cleanup(&self, now: DtnTime) -> usize {
        let mut sets = self.sets.lock().unwrap();
        let expired: Vec<BundleId> = sets
            .iter()
            .filter(|(_, set)| set.expiry < now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sets.remove(id);
        }
        drop(sets);

        if !expired.is_empty() {
            let mut tombstones = self.tombstones.lock().unwrap();
            for id in &expired {
                tombstones.insert(id.clone(), DtnTime::new(now.seconds + TOMBSTONE_RETENTION_SECS, 0));
            }
            tombstones.retain(|_, forget_at| *forget_at >= now);
            debug!(count = expired.len(), "abandoned expired fragment sets");
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp7::builder::Builder;
    use bp7::eid::Eid;

    fn big_payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn whole_bundle_under_threshold_is_not_split() {
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(b"short".to_vec())
            .build()
            .unwrap();
        assert!(matches!(split(&bundle, 10_000), SplitOutcome::Whole));
    }

    #[test]
    fn oversized_bundle_splits_and_offsets_partition_payload() {
        let payload = big_payload(10_000);
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(payload.clone())
            .build()
            .unwrap();

        let SplitOutcome::Fragments(fragments) = split(&bundle, 3_000) else {
            panic!("expected a split");
        };
        assert!(fragments.len() > 1);

        let mut covered = 0u64;
        for fragment in &fragments {
            let info = fragment.primary.fragment_info.as_ref().unwrap();
            assert_eq!(info.offset, covered);
            covered += fragment.payload().data.len() as u64;
        }
        assert_eq!(covered, payload.len() as u64);
        assert_eq!(
            fragments.last().unwrap().primary.fragment_info.as_ref().unwrap().total_len,
            payload.len() as u64
        );
    }

    #[test]
    fn must_not_fragment_is_refused() {
        let mut bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(big_payload(10_000))
            .build()
            .unwrap();
        bundle.primary.flags.do_not_fragment = true;
        assert!(matches!(split(&bundle, 1_000), SplitOutcome::Whole));
    }

    #[test]
    fn reassembles_fragments_delivered_out_of_order() {
        let payload = big_payload(10_000);
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(payload.clone())
            .build()
            .unwrap();
        let SplitOutcome::Fragments(mut fragments) = split(&bundle, 3_000) else {
            panic!("expected a split");
        };
        fragments.reverse();

        let manager = ReassemblyManager::new();
        let mut reassembled = None;
        for fragment in fragments {
            if let AddFragmentOutcome::Completed(b) = manager.add_fragment(fragment) {
                reassembled = Some(b);
            }
        }
        let reassembled = reassembled.expect("reassembly should complete");
        assert_eq!(reassembled.payload().data, payload);
        assert!(!reassembled.primary.flags.is_fragment);
    }

    #[test]
    fn duplicate_offset_is_rejected_and_missing_fragment_completes_it() {
        let payload = big_payload(10_000);
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(payload.clone())
            .build()
            .unwrap();
        let SplitOutcome::Fragments(fragments) = split(&bundle, 3_000) else {
            panic!("expected a split");
        };

        let manager = ReassemblyManager::new();
        assert!(matches!(
            manager.add_fragment(fragments[0].clone()),
            AddFragmentOutcome::Accepted
        ));
        assert!(matches!(
            manager.add_fragment(fragments[0].clone()),
            AddFragmentOutcome::DuplicateOffset
        ));

        let mut completed = None;
        for fragment in fragments.into_iter().skip(1) {
            if let AddFragmentOutcome::Completed(b) = manager.add_fragment(fragment) {
                completed = Some(b);
            }
        }
        assert_eq!(completed.unwrap().payload().data, payload);
    }
}

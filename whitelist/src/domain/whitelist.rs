// This file is part of anchor-whitelist.
// Copyright (C) 2025 anchor-whitelist contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::{AnchorKind, Candidate};
use parking_lot::RwLock;
use std::sync::Arc;
use whitelist_common::domain::{ActiveGeneration, BlockRef, Hash, ProtocolGeneration};

/// A trusted `(end_block, hash)` pair: any chain whose block at `end_block` does not have `hash`
/// is to be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub end_block: u64,
    pub hash: Hash,
}

impl From<&Candidate> for Anchor {
    fn from(candidate: &Candidate) -> Self {
        Self {
            end_block: candidate.end_block,
            hash: candidate.hash,
        }
    }
}

/// Per anchor kind state of the whitelist workflow. `Rejected` is not sticky: the next poll
/// starts over with `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorState {
    #[default]
    Empty,
    Pending(Candidate),
    Whitelisted(Anchor),
    Rejected(Candidate),
}

/// Process-wide whitelist state, written by the whitelist service and read by fork-choice.
/// Cloning shares the state. Both anchors are updated under one lock, hence readers never observe
/// a half-updated anchor.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    anchors: Arc<RwLock<Anchors>>,
    generation: ActiveGeneration,
}

#[derive(Debug, Clone, Copy, Default)]
struct Anchors {
    checkpoint: Option<Anchor>,
    milestone: Option<Anchor>,
}

impl Anchors {
    /// The anchors fork-choice has to respect. A milestone carries less weight than a checkpoint
    /// and is superseded by one at or above its end block.
    fn effective(&self) -> impl Iterator<Item = Anchor> {
        let milestone = match (self.checkpoint, self.milestone) {
            (Some(checkpoint), Some(milestone)) if milestone.end_block <= checkpoint.end_block => {
                None
            }
            (_, milestone) => milestone,
        };

        self.checkpoint.into_iter().chain(milestone)
    }
}

impl Whitelist {
    pub fn new(generation: ActiveGeneration) -> Self {
        Self {
            anchors: Default::default(),
            generation,
        }
    }

    /// Commit the given anchor, replacing the previous one of the same kind (last writer wins).
    pub fn commit(&self, kind: AnchorKind, anchor: Anchor) {
        let mut anchors = self.anchors.write();
        match kind {
            AnchorKind::Checkpoint => anchors.checkpoint = Some(anchor),
            AnchorKind::Milestone => anchors.milestone = Some(anchor),
        }
    }

    pub fn checkpoint_anchor(&self) -> Option<Anchor> {
        self.anchors.read().checkpoint
    }

    pub fn milestone_anchor(&self) -> Option<Anchor> {
        self.anchors.read().milestone
    }

    pub fn anchor(&self, kind: AnchorKind) -> Option<Anchor> {
        match kind {
            AnchorKind::Checkpoint => self.checkpoint_anchor(),
            AnchorKind::Milestone => self.milestone_anchor(),
        }
    }

    /// The shared flag telling which oracle protocol generation is active.
    pub fn generation(&self) -> &ActiveGeneration {
        &self.generation
    }

    pub fn active_generation(&self) -> ProtocolGeneration {
        self.generation.get()
    }

    /// Whether the block with the given number and hash is compatible with the whitelisted
    /// anchors, i.e. false only if an anchor at that number has a different hash.
    pub fn is_on_checkpointed_chain(&self, number: u64, hash: Hash) -> bool {
        let anchors = *self.anchors.read();

        anchors
            .effective()
            .filter(|anchor| anchor.end_block == number)
            .all(|anchor| anchor.hash == hash)
    }

    /// Whether importing the given contiguous chain segment, given the current local head, is
    /// compatible with the whitelisted anchors. A segment is rejected if it contains an anchored
    /// block number with a different hash or if it ends below an anchor the local chain has
    /// already passed, i.e. it would reorg below that anchor.
    pub fn is_valid_chain(&self, current_head: u64, segment: &[BlockRef]) -> bool {
        let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
            return true;
        };
        let anchors = *self.anchors.read();

        anchors.effective().all(|anchor| {
            if anchor.end_block < first.number {
                true
            } else if anchor.end_block <= last.number {
                segment
                    .iter()
                    .find(|block| block.number == anchor.end_block)
                    .is_some_and(|block| block.hash == anchor.hash)
            } else {
                current_head < anchor.end_block
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{Anchor, AnchorKind, Whitelist};
    use whitelist_common::domain::{BlockRef, ByteArray, Hash};

    const HASH_A: Hash = ByteArray([0xa; 32]);
    const HASH_B: Hash = ByteArray([0xb; 32]);

    fn segment(from: u64, to: u64, hash_at: impl Fn(u64) -> Hash) -> Vec<BlockRef> {
        (from..=to)
            .map(|number| BlockRef {
                number,
                hash: hash_at(number),
            })
            .collect()
    }

    #[test]
    fn test_commit() {
        let whitelist = Whitelist::default();
        assert_eq!(whitelist.checkpoint_anchor(), None);
        assert_eq!(whitelist.milestone_anchor(), None);

        let anchor = Anchor {
            end_block: 1_280,
            hash: HASH_A,
        };
        whitelist.commit(AnchorKind::Checkpoint, anchor);
        assert_eq!(whitelist.checkpoint_anchor(), Some(anchor));
        assert_eq!(whitelist.milestone_anchor(), None);

        // Idempotent.
        whitelist.commit(AnchorKind::Checkpoint, anchor);
        assert_eq!(whitelist.checkpoint_anchor(), Some(anchor));

        // Last writer wins, also for lower end blocks.
        let lower = Anchor {
            end_block: 1_024,
            hash: HASH_B,
        };
        whitelist.commit(AnchorKind::Checkpoint, lower);
        assert_eq!(whitelist.anchor(AnchorKind::Checkpoint), Some(lower));

        // Clones share state.
        let shared = whitelist.clone();
        shared.commit(AnchorKind::Milestone, anchor);
        assert_eq!(whitelist.milestone_anchor(), Some(anchor));
    }

    #[test]
    fn test_is_on_checkpointed_chain() {
        let whitelist = Whitelist::default();
        assert!(whitelist.is_on_checkpointed_chain(1_280, HASH_B));

        whitelist.commit(
            AnchorKind::Checkpoint,
            Anchor {
                end_block: 1_280,
                hash: HASH_A,
            },
        );
        assert!(whitelist.is_on_checkpointed_chain(1_280, HASH_A));
        assert!(!whitelist.is_on_checkpointed_chain(1_280, HASH_B));
        assert!(whitelist.is_on_checkpointed_chain(1_279, HASH_B));

        whitelist.commit(
            AnchorKind::Milestone,
            Anchor {
                end_block: 1_300,
                hash: HASH_A,
            },
        );
        assert!(!whitelist.is_on_checkpointed_chain(1_300, HASH_B));
    }

    #[test]
    fn test_milestone_superseded_by_checkpoint() {
        let whitelist = Whitelist::default();
        whitelist.commit(
            AnchorKind::Milestone,
            Anchor {
                end_block: 1_000,
                hash: HASH_A,
            },
        );
        assert!(!whitelist.is_on_checkpointed_chain(1_000, HASH_B));

        whitelist.commit(
            AnchorKind::Checkpoint,
            Anchor {
                end_block: 1_280,
                hash: HASH_A,
            },
        );
        assert!(whitelist.is_on_checkpointed_chain(1_000, HASH_B));
    }

    #[test]
    fn test_is_valid_chain() {
        let whitelist = Whitelist::default();
        assert!(whitelist.is_valid_chain(2_000, &segment(1_000, 1_100, |_| HASH_B)));

        whitelist.commit(
            AnchorKind::Checkpoint,
            Anchor {
                end_block: 1_280,
                hash: HASH_A,
            },
        );
        let hash_at = |number| if number == 1_280 { HASH_A } else { HASH_B };

        assert!(whitelist.is_valid_chain(2_000, &[]));

        // Segment containing the anchor.
        assert!(whitelist.is_valid_chain(2_000, &segment(1_200, 1_300, hash_at)));
        assert!(!whitelist.is_valid_chain(2_000, &segment(1_200, 1_300, |_| HASH_B)));

        // Segment after the anchor.
        assert!(whitelist.is_valid_chain(2_000, &segment(1_281, 1_300, |_| HASH_B)));

        // Segment ending below the anchor: only valid while the local head is below it, too.
        assert!(!whitelist.is_valid_chain(2_000, &segment(1_100, 1_200, |_| HASH_B)));
        assert!(whitelist.is_valid_chain(1_250, &segment(1_100, 1_200, |_| HASH_B)));
    }
}

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

//! Decoding of oracle JSON payloads of both protocol generations into the canonical domain types.
//! Wire version branching happens here and nowhere else.

mod v1;
mod v2;

use crate::domain::{Checkpoint, DecodeCause, DecodeError, Milestone, Span, Validator};
use base64::{Engine, prelude::BASE64_STANDARD};
use serde::de::DeserializeOwned;
use whitelist_common::domain::{ByteArray, Hash, ProtocolGeneration};

/// JSON codec for the configured [ProtocolGeneration].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec {
    generation: ProtocolGeneration,
}

impl JsonCodec {
    pub fn new(generation: ProtocolGeneration) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> ProtocolGeneration {
        self.generation
    }

    pub fn decode_checkpoint(&self, raw: &[u8]) -> Result<Checkpoint, DecodeError> {
        match self.generation {
            ProtocolGeneration::V1 => {
                from_json::<v1::Envelope<v1::Checkpoint>>("checkpoint", raw)?
                    .result
                    .try_into()
            }

            ProtocolGeneration::V2 => {
                from_json::<v2::CheckpointResponse>("checkpoint", raw)?
                    .checkpoint
                    .try_into()
            }
        }
    }

    pub fn decode_checkpoint_count(&self, raw: &[u8]) -> Result<i64, DecodeError> {
        match self.generation {
            ProtocolGeneration::V1 => {
                let count =
                    from_json::<v1::Envelope<v1::CheckpointCount>>("checkpoint count", raw)?;
                Ok(count.result.result)
            }

            ProtocolGeneration::V2 => {
                let count = from_json::<v2::CheckpointCount>("checkpoint count", raw)?;
                parse_i64("checkpoint count", &count.ack_count)
            }
        }
    }

    pub fn decode_milestone(&self, raw: &[u8]) -> Result<Milestone, DecodeError> {
        match self.generation {
            ProtocolGeneration::V1 => {
                from_json::<v1::Envelope<v1::Milestone>>("milestone", raw)?
                    .result
                    .try_into()
            }

            ProtocolGeneration::V2 => {
                from_json::<v2::MilestoneResponse>("milestone", raw)?
                    .milestone
                    .try_into()
            }
        }
    }

    pub fn decode_milestone_count(&self, raw: &[u8]) -> Result<i64, DecodeError> {
        match self.generation {
            ProtocolGeneration::V1 => {
                let count = from_json::<v1::Envelope<v1::MilestoneCount>>("milestone count", raw)?;
                Ok(count.result.count)
            }

            ProtocolGeneration::V2 => {
                let count = from_json::<v2::MilestoneCount>("milestone count", raw)?;
                parse_i64("milestone count", &count.count)
            }
        }
    }

    pub fn decode_span(&self, raw: &[u8]) -> Result<Span, DecodeError> {
        let raw_span = match self.generation {
            ProtocolGeneration::V1 => from_json::<v1::Envelope<v1::Span>>("span", raw)?
                .result
                .try_into()?,

            ProtocolGeneration::V2 => from_json::<v2::SpanResponse>("span", raw)?
                .span
                .try_into()?,
        };

        crate::domain::resolve(raw_span).map_err(|error| DecodeError::new("span", error))
    }

    pub fn decode_validator(&self, raw: &[u8]) -> Result<Validator, DecodeError> {
        match self.generation {
            ProtocolGeneration::V1 => from_json::<v1::Validator>("validator", raw)?.try_into(),
            ProtocolGeneration::V2 => from_json::<v2::Validator>("validator", raw)?.try_into(),
        }
    }

    /// Whether the milestone asked for is in the oracle's list of rejected milestones.
    pub fn decode_no_ack(&self, raw: &[u8]) -> Result<bool, DecodeError> {
        let no_ack = from_json::<v1::Envelope<v1::NoAck>>("no-ack", raw)?;
        Ok(no_ack.result.result)
    }

    pub fn decode_last_no_ack(&self, raw: &[u8]) -> Result<String, DecodeError> {
        let last_no_ack = from_json::<v1::Envelope<v1::LastNoAck>>("last no-ack", raw)?;
        Ok(last_no_ack.result.result)
    }
}

fn from_json<T>(field: &'static str, raw: &[u8]) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(raw).map_err(|error| DecodeError::new(field, error))
}

/// Parse a base-10 unsigned 64-bit number; unlike [str::parse] a leading `+` is rejected.
fn parse_u64(field: &'static str, s: &str) -> Result<u64, DecodeError> {
    if s.starts_with('+') {
        return Err(DecodeError::new(
            field,
            DecodeCause::UnexpectedSign(s.to_owned()),
        ));
    }

    s.parse::<u64>()
        .map_err(|error| DecodeError::new(field, DecodeCause::Integer(s.to_owned(), error)))
}

fn parse_i64(field: &'static str, s: &str) -> Result<i64, DecodeError> {
    s.parse::<i64>()
        .map_err(|error| DecodeError::new(field, DecodeCause::Integer(s.to_owned(), error)))
}

/// Decode standard (not URL-safe) base64 and reinterpret the bytes as a hash.
fn decode_base64_hash(field: &'static str, s: &str) -> Result<Hash, DecodeError> {
    let bytes = BASE64_STANDARD
        .decode(s)
        .map_err(|error| DecodeError::new(field, error))?;
    Ok(Hash::from_slice_padded(&bytes))
}

/// Decode `0x` prefixed (or plain) hex of exactly `N` bytes.
fn decode_hex<const N: usize>(field: &'static str, s: &str) -> Result<ByteArray<N>, DecodeError> {
    let bytes = const_hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|error| DecodeError::new(field, error))?;
    ByteArray::try_from(bytes.as_slice()).map_err(|error| DecodeError::new(field, error))
}

pub(super) fn check_range(
    field: &'static str,
    start_block: u64,
    end_block: u64,
) -> Result<(), DecodeError> {
    if start_block > end_block {
        Err(DecodeError::new(
            field,
            DecodeCause::InvalidRange {
                start_block,
                end_block,
            },
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{DecodeCause, DecodeError, ResolveError},
        infra::codec::JsonCodec,
    };
    use assert_matches::assert_matches;
    use base64::{Engine, prelude::BASE64_STANDARD};
    use whitelist_common::domain::{ByteArray, ProtocolGeneration};

    const V1: JsonCodec = JsonCodec {
        generation: ProtocolGeneration::V1,
    };
    const V2: JsonCodec = JsonCodec {
        generation: ProtocolGeneration::V2,
    };

    const PROPOSER: &str = "0x0101010101010101010101010101010101010101";

    fn checkpoint_v2(start_block: &str, root_hash: &str) -> String {
        format!(
            r#"{{
                "checkpoint": {{
                    "id": "4",
                    "proposer": "{PROPOSER}",
                    "start_block": "{start_block}",
                    "end_block": "1280",
                    "root_hash": "{root_hash}",
                    "bor_chain_id": "137",
                    "timestamp": "1700000000"
                }}
            }}"#
        )
    }

    #[test]
    fn test_decode_checkpoint_v2() {
        let hash = [7u8; 32];
        let raw = checkpoint_v2("1025", &BASE64_STANDARD.encode(hash));

        let checkpoint = V2.decode_checkpoint(raw.as_bytes()).expect("can be decoded");
        assert_eq!(checkpoint.proposer, ByteArray([1; 20]));
        assert_eq!(checkpoint.start_block, 1_025);
        assert_eq!(checkpoint.end_block, 1_280);
        assert_eq!(checkpoint.root_hash, ByteArray(hash));
        assert_eq!(checkpoint.chain_id, "137");
        assert_eq!(checkpoint.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_decode_checkpoint_v2_malformed() {
        let hash = BASE64_STANDARD.encode([7u8; 32]);

        let raw = checkpoint_v2("10x25", &hash);
        let result = V2.decode_checkpoint(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "checkpoint.start_block",
                cause: DecodeCause::Integer(..),
            })
        );

        let raw = checkpoint_v2("+1025", &hash);
        let result = V2.decode_checkpoint(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                cause: DecodeCause::UnexpectedSign(_),
                ..
            })
        );

        let raw = checkpoint_v2("1025", "not base64!");
        let result = V2.decode_checkpoint(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "checkpoint.root_hash",
                cause: DecodeCause::Base64(_),
            })
        );

        let raw = checkpoint_v2("2000", &hash);
        let result = V2.decode_checkpoint(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                cause: DecodeCause::InvalidRange {
                    start_block: 2_000,
                    end_block: 1_280
                },
                ..
            })
        );

        // V1 payloads are not accepted by the V2 codec.
        let raw = r#"{"height": "1", "result": {"start_block": 1}}"#;
        let result = V2.decode_checkpoint(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                cause: DecodeCause::Json(_),
                ..
            })
        );
    }

    #[test]
    fn test_decode_checkpoint_v1() {
        let raw = format!(
            r#"{{
                "height": "23000",
                "result": {{
                    "proposer": "{PROPOSER}",
                    "start_block": 257,
                    "end_block": 512,
                    "root_hash": "0x{}",
                    "bor_chain_id": "137",
                    "timestamp": 1700000000,
                    "unknown": true
                }}
            }}"#,
            "ab".repeat(32)
        );

        let checkpoint = V1.decode_checkpoint(raw.as_bytes()).expect("can be decoded");
        assert_eq!(checkpoint.start_block, 257);
        assert_eq!(checkpoint.end_block, 512);
        assert_eq!(checkpoint.root_hash, ByteArray([0xab; 32]));

        // Missing root hash.
        let raw = format!(
            r#"{{"result": {{"proposer": "{PROPOSER}", "start_block": 1, "end_block": 2,
                "bor_chain_id": "137", "timestamp": 1}}}}"#
        );
        let result = V1.decode_checkpoint(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "checkpoint",
                cause: DecodeCause::Json(_),
            })
        );
    }

    #[test]
    fn test_decode_milestone() {
        let hash = [9u8; 32];
        let raw = format!(
            r#"{{
                "milestone": {{
                    "proposer": "{PROPOSER}",
                    "start_block": "1025",
                    "end_block": "1280",
                    "hash": "{}",
                    "bor_chain_id": "137",
                    "milestone_id": "a6b2c3-0x{}",
                    "timestamp": "1700000000",
                    "total_difficulty": "123456"
                }}
            }}"#,
            BASE64_STANDARD.encode(hash),
            "cd".repeat(32)
        );
        let milestone = V2.decode_milestone(raw.as_bytes()).expect("can be decoded");
        assert_eq!(milestone.end_block, 1_280);
        assert_eq!(milestone.hash, ByteArray(hash));
        assert_eq!(milestone.total_difficulty, 123_456);
        assert!(milestone.milestone_id.starts_with("a6b2c3"));

        let raw = raw.replace("\"123456\"", "\"lots\"");
        let result = V2.decode_milestone(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "milestone.total_difficulty",
                ..
            })
        );

        let raw = format!(
            r#"{{"result": {{"proposer": "{PROPOSER}", "start_block": 1, "end_block": 2,
                "hash": "0x{}", "bor_chain_id": "137", "milestone_id": "m1",
                "timestamp": 1}}}}"#,
            "01".repeat(32)
        );
        let milestone = V1.decode_milestone(raw.as_bytes()).expect("can be decoded");
        assert_eq!(milestone.total_difficulty, 0);
        assert_eq!(milestone.milestone_id, "m1");
    }

    #[test]
    fn test_decode_base64_hash_is_padded() {
        let raw = checkpoint_v2("1025", "");
        let checkpoint = V2.decode_checkpoint(raw.as_bytes()).expect("can be decoded");
        assert!(checkpoint.root_hash.is_zero());

        let raw = checkpoint_v2("1025", &BASE64_STANDARD.encode([1, 2]));
        let checkpoint = V2.decode_checkpoint(raw.as_bytes()).expect("can be decoded");
        assert_eq!(checkpoint.root_hash.0[30..], [1, 2]);
    }

    #[test]
    fn test_decode_counts() {
        assert_matches!(
            V2.decode_checkpoint_count(br#"{"ack_count": "4"}"#),
            Ok(4)
        );
        assert_matches!(
            V2.decode_checkpoint_count(br#"{"ack_count": "-1"}"#),
            Ok(-1)
        );
        assert_matches!(
            V2.decode_milestone_count(br#"{"count": "four"}"#),
            Err(DecodeError {
                field: "milestone count",
                cause: DecodeCause::Integer(..),
            })
        );
        assert_matches!(
            V2.decode_milestone_count(br#"{"count": 4}"#),
            Err(DecodeError {
                cause: DecodeCause::Json(_),
                ..
            })
        );

        assert_matches!(
            V1.decode_checkpoint_count(br#"{"height": "1", "result": {"result": 4}}"#),
            Ok(4)
        );
        assert_matches!(
            V1.decode_milestone_count(br#"{"height": "1", "result": {"count": 0}}"#),
            Ok(0)
        );
    }

    fn validator_v2(id: u8, voting_power: &str) -> String {
        format!(
            r#"{{"val_id": "{id}", "signer": "0x{}", "voting_power": "{voting_power}",
                "proposer_priority": "-{id}", "jailed": false, "pub_key": "AQID"}}"#,
            format!("{id:02x}").repeat(20)
        )
    }

    #[test]
    fn test_decode_span_v2() {
        let raw = format!(
            r#"{{
                "span": {{
                    "id": "12",
                    "start_block": "6656",
                    "end_block": "13055",
                    "validator_set": {{
                        "validators": [{}, {}, {}],
                        "proposer": {}
                    }},
                    "selected_producers": [{}, {}, {}],
                    "bor_chain_id": "137"
                }}
            }}"#,
            validator_v2(3, "300"),
            validator_v2(1, "100"),
            validator_v2(2, "200"),
            validator_v2(1, "100"),
            validator_v2(2, "200"),
            validator_v2(3, "300"),
            validator_v2(1, "100"),
        );

        let span = V2.decode_span(raw.as_bytes()).expect("can be decoded");
        assert_eq!(span.id, 12);
        assert_eq!(span.start_block, 6_656);
        assert_eq!(span.end_block, 13_055);
        assert_eq!(span.chain_id, "137");

        // Wire-designated proposer, not the one with the highest voting power.
        assert_eq!(span.validator_set.proposer().id, 1);
        assert_eq!(span.validator_set.proposer().proposer_priority, -1);

        let producers = span
            .selected_producers
            .iter()
            .map(|v| v.id)
            .collect::<Vec<_>>();
        assert_eq!(producers, vec![2, 3, 1]);
        assert_eq!(span.validator_set.validators().len(), 3);
    }

    #[test]
    fn test_decode_span_v1() {
        let validator = |id: u8, power: i64| {
            format!(
                r#"{{"ID": {id}, "startEpoch": 0, "endEpoch": 0, "nonce": 1, "power": {power},
                    "pubKey": "0x04", "signer": "0x{}", "last_updated": "", "jailed": false,
                    "accum": {}}}"#,
                format!("{id:02x}").repeat(20),
                -(id as i64)
            )
        };

        let raw = format!(
            r#"{{
                "height": "100",
                "result": {{
                    "span_id": 3,
                    "start_block": 256,
                    "end_block": 6655,
                    "validator_set": {{
                        "validators": [{}, {}],
                        "proposer": {}
                    }},
                    "selected_producers": [{}],
                    "bor_chain_id": "137"
                }}
            }}"#,
            validator(1, 10),
            validator(2, 20),
            validator(2, 20),
            validator(1, 10),
        );
        let span = V1.decode_span(raw.as_bytes()).expect("can be decoded");
        assert_eq!(span.id, 3);
        assert_eq!(span.validator_set.proposer().id, 2);
        assert_eq!(span.validator_set.proposer().voting_power, 20);
        assert_eq!(span.selected_producers[0].proposer_priority, -1);

        // Proposer not in validator set.
        let raw = raw.replace(
            &format!("\"proposer\": {}", validator(2, 20)),
            &format!("\"proposer\": {}", validator(3, 30)),
        );
        let result = V1.decode_span(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "span",
                cause: DecodeCause::Resolve(ResolveError::ProposerNotInSet(_)),
            })
        );
    }

    #[test]
    fn test_decode_validator() {
        let validator = V2
            .decode_validator(validator_v2(5, "500").as_bytes())
            .expect("can be decoded");
        assert_eq!(validator.id, 5);
        assert_eq!(validator.address, ByteArray([5; 20]));
        assert_eq!(validator.voting_power, 500);
        assert_eq!(validator.proposer_priority, -5);

        let result = V2.decode_validator(validator_v2(5, "5e2").as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "validator.voting_power",
                ..
            })
        );

        let raw = r#"{"ID": 1, "signer": "0x0102", "power": 1, "accum": 0}"#;
        let result = V1.decode_validator(raw.as_bytes());
        assert_matches!(
            result,
            Err(DecodeError {
                field: "validator.signer",
                cause: DecodeCause::Len(_),
            })
        );
    }

    #[test]
    fn test_decode_no_ack() {
        assert_matches!(
            V1.decode_no_ack(br#"{"height": "1", "result": {"result": true}}"#),
            Ok(true)
        );
        assert_matches!(
            V1.decode_last_no_ack(br#"{"height": "1", "result": {"result": "m-17"}}"#),
            Ok(id) if id == "m-17"
        );
    }
}

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Encodes a [Profile] in bounded steps so that a large profile doesn't hold
//! up a cooperative scheduler.
//!
//! The work is laid out up front as a queue of steps: one or more per
//! repeated top-level field, one for the string table, and one for the
//! scalar fields after it. Each step writes a contiguous range of the output,
//! in the same order [crate::Message::encode_into] would, so the result is
//! byte-identical to the synchronous path.
//!
//! The encoder borrows the profile for its whole lifetime, so the profile
//! can't be mutated while an encode is in progress. Dropping the encoder (or
//! the future returned by [Profile::encode_chunked]) between steps cancels
//! the encode and drops the partial buffer with it.

use crate::{EncodeError, Field, Profile, Value, Writer, NO_OPT_ZERO, PROTOBUF_MAX_MESSAGE_BYTES};
use std::collections::VecDeque;
use std::ops::Range;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkedEncodeOptions {
    /// The most elements of a repeated field which are encoded per step.
    /// Zero is treated as one.
    pub items_per_step: usize,
}

impl ChunkedEncodeOptions {
    pub const DEFAULT_ITEMS_PER_STEP: usize = 1024;
}

impl Default for ChunkedEncodeOptions {
    fn default() -> Self {
        Self {
            items_per_step: Self::DEFAULT_ITEMS_PER_STEP,
        }
    }
}

/// One unit of work of a [ChunkedEncoder].
#[derive(Clone, Debug, Eq, PartialEq)]
enum Step {
    SampleTypes(Range<usize>),
    Samples(Range<usize>),
    Mappings(Range<usize>),
    Locations(Range<usize>),
    Functions(Range<usize>),
    StringTable,
    Trailer,
}

/// A step queue which encodes a [Profile] a bounded amount at a time. See
/// the [module docs](self).
#[derive(Debug)]
pub struct ChunkedEncoder<'a> {
    profile: &'a Profile,
    buffer: Vec<u8>,
    offset: usize,
    steps: VecDeque<Step>,
}

impl<'a> ChunkedEncoder<'a> {
    /// Measures the profile, allocates the output buffer, and plans the
    /// steps. No encoding happens until [ChunkedEncoder::step] is called.
    pub fn new(profile: &'a Profile, options: ChunkedEncodeOptions) -> Result<Self, EncodeError> {
        let proto_len = profile.proto_len();
        if proto_len > PROTOBUF_MAX_MESSAGE_BYTES {
            return Err(EncodeError::TooLarge { len: proto_len });
        }
        let per_step = options.items_per_step.max(1);

        let mut steps = VecDeque::new();
        plan(&mut steps, profile.sample_types.len(), per_step, Step::SampleTypes);
        plan(&mut steps, profile.samples.len(), per_step, Step::Samples);
        plan(&mut steps, profile.mappings.len(), per_step, Step::Mappings);
        plan(&mut steps, profile.locations.len(), per_step, Step::Locations);
        plan(&mut steps, profile.functions.len(), per_step, Step::Functions);
        steps.push_back(Step::StringTable);
        steps.push_back(Step::Trailer);

        Ok(Self {
            profile,
            buffer: vec![0; proto_len as usize],
            offset: 0,
            steps,
        })
    }

    /// The number of steps left.
    #[inline]
    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.steps.is_empty()
    }

    /// Performs the next step. Returns whether there are steps left.
    pub fn step(&mut self) -> Result<bool, EncodeError> {
        let Some(step) = self.steps.pop_front() else {
            return Ok(false);
        };
        let profile = self.profile;
        let mut writer = Writer::new(&mut self.buffer, self.offset);
        match step {
            Step::SampleTypes(range) => encode_range(&profile.sample_types, range, &mut writer)?,
            Step::Samples(range) => encode_range(&profile.samples, range, &mut writer)?,
            Step::Mappings(range) => encode_range(&profile.mappings, range, &mut writer)?,
            Step::Locations(range) => encode_range(&profile.locations, range, &mut writer)?,
            Step::Functions(range) => encode_range(&profile.functions, range, &mut writer)?,
            Step::StringTable => profile.string_table.encode(&mut writer)?,
            Step::Trailer => profile.encode_trailer(&mut writer)?,
        }
        self.offset = writer.offset();
        Ok(!self.steps.is_empty())
    }

    /// Runs the remaining steps without yielding and returns the buffer.
    pub fn finish(mut self) -> Result<Vec<u8>, EncodeError> {
        while self.step()? {}
        Ok(self.into_buffer())
    }

    /// Runs the remaining steps, yielding to the scheduler after each one.
    pub async fn run(mut self) -> Result<Vec<u8>, EncodeError> {
        let steps = self.steps.len();
        tracing::debug!(steps, len = self.buffer.len(), "starting chunked profile encode");
        while self.step()? {
            tokio::task::yield_now().await;
        }
        tracing::debug!(steps, len = self.buffer.len(), "finished chunked profile encode");
        Ok(self.into_buffer())
    }

    fn into_buffer(self) -> Vec<u8> {
        debug_assert!(self.steps.is_empty());
        debug_assert_eq!(self.offset, self.buffer.len());
        self.buffer
    }
}

fn plan(steps: &mut VecDeque<Step>, len: usize, per_step: usize, make: fn(Range<usize>) -> Step) {
    let mut start = 0;
    while start < len {
        let end = len.min(start + per_step);
        steps.push_back(make(start..end));
        start = end;
    }
}

fn encode_range<T: Value, const N: u32>(
    list: &[Field<T, N, NO_OPT_ZERO>],
    range: Range<usize>,
    writer: &mut Writer<'_>,
) -> Result<(), EncodeError> {
    for field in list.get(range).unwrap_or_default() {
        field.encode(writer)?;
    }
    Ok(())
}

impl Profile {
    /// Encodes the profile like [crate::Message::encode_to_vec], but yields to the
    /// async scheduler between bounded steps. Resolves once, with the full
    /// buffer or an error.
    pub async fn encode_chunked(
        &self,
        options: ChunkedEncodeOptions,
    ) -> Result<Vec<u8>, EncodeError> {
        ChunkedEncoder::new(self, options)?.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Label, Location, Mapping, Message, Sample, ValueType};

    fn big_profile(samples: usize) -> Profile {
        let mut profile = Profile::default();
        let cpu = profile.intern("cpu");
        let nanoseconds = profile.intern("nanoseconds");
        profile.sample_types = vec![Field::from(ValueType {
            r#type: cpu.into(),
            unit: nanoseconds.into(),
        })];
        for i in 0..samples {
            let key = profile.intern(&format!("label {}", i % 7));
            profile.samples.push(Field::from(Sample {
                location_ids: Field::from(vec![i as u64 + 1, 1]),
                values: Field::from(vec![i as i64 * 1000 - 50]),
                labels: vec![Field::from(Label {
                    key: key.into(),
                    num: Field::from(i as i64),
                    ..Default::default()
                })],
            }));
            profile.locations.push(Field::from(Location {
                id: Field::from(i as u64 + 1),
                address: Field::from(0x4000 + i as u64),
                ..Default::default()
            }));
        }
        profile.mappings.push(Field::from(Mapping {
            id: Field::from(1),
            ..Default::default()
        }));
        profile.time_nanos = Field::from(1_700_000_000_000_000_000);
        profile.period_type = Field::from(Some(ValueType::default()));
        profile
    }

    #[test]
    fn plans_bounded_steps() {
        let profile = big_profile(10);
        let options = ChunkedEncodeOptions { items_per_step: 4 };
        let encoder = ChunkedEncoder::new(&profile, options).unwrap();
        // 1 sample type, 3 sample chunks, 1 mapping, 3 location chunks,
        // then the string table and trailer.
        assert_eq!(encoder.remaining_steps(), 10);
        assert_eq!(
            encoder.steps.iter().cloned().collect::<Vec<_>>(),
            vec![
                Step::SampleTypes(0..1),
                Step::Samples(0..4),
                Step::Samples(4..8),
                Step::Samples(8..10),
                Step::Mappings(0..1),
                Step::Locations(0..4),
                Step::Locations(4..8),
                Step::Locations(8..10),
                Step::StringTable,
                Step::Trailer,
            ]
        );
    }

    #[test]
    fn finish_matches_sync() {
        let profile = big_profile(100);
        let expected = profile.encode_to_vec().unwrap();
        for items_per_step in [0, 1, 3, 64, 1024] {
            let encoder =
                ChunkedEncoder::new(&profile, ChunkedEncodeOptions { items_per_step }).unwrap();
            assert_eq!(encoder.finish().unwrap(), expected, "{items_per_step}");
        }
    }

    #[test]
    fn stepping() {
        let profile = Profile::default();
        let mut encoder = ChunkedEncoder::new(&profile, Default::default()).unwrap();
        assert_eq!(encoder.remaining_steps(), 2);
        assert!(encoder.step().unwrap());
        assert!(!encoder.step().unwrap());
        assert!(encoder.is_done());
        assert!(!encoder.step().unwrap());
        assert!(encoder.finish().unwrap().is_empty());
    }

    #[tokio::test]
    async fn async_matches_sync() {
        let profile = big_profile(2500);
        let expected = profile.encode_to_vec().unwrap();
        let actual = profile
            .encode_chunked(ChunkedEncodeOptions { items_per_step: 100 })
            .await
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn runs_on_other_executors() {
        let profile = big_profile(20);
        let expected = profile.encode_to_vec().unwrap();
        let actual =
            futures::executor::block_on(profile.encode_chunked(ChunkedEncodeOptions {
                items_per_step: 2,
            }))
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn other_tasks_make_progress() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let profile = big_profile(50);
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            async move {
                for _ in 0..10 {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            }
        };
        let encode = profile.encode_chunked(ChunkedEncodeOptions { items_per_step: 1 });
        let (encoded, ()) = tokio::join!(encode, ticker);
        assert_eq!(encoded.unwrap(), profile.encode_to_vec().unwrap());
        assert_eq!(ticks.load(Ordering::Relaxed), 10);
    }
}

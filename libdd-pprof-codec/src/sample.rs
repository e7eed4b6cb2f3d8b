// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    encode_repeated, impl_embedded_message, repeated_proto_len, DecodeError, EncodeError, Field,
    Label, Message, RawField, Writer, NO_OPT_ZERO, OPT_ZERO,
};

/// Each Sample records values encountered in some program context. The
/// program context is typically a stack trace, perhaps augmented with
/// auxiliary information like the thread-id, some indicator of a higher level
/// request being handled, etc.
///
/// The location ids and values are packed; labels are one embedded message
/// each.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "bolero"),
    derive(bolero::generator::TypeGenerator)
)]
pub struct Sample {
    /// The ids recorded here correspond to a Profile.location.id.
    /// The leaf is at location_id\[0\].
    pub location_ids: Field<Vec<u64>, 1, OPT_ZERO>,
    /// The type and unit of each value is defined by the corresponding entry
    /// in Profile.sample_type. All samples must have the same number of
    /// values, the same as the length of Profile.sample_type. When
    /// aggregating multiple samples into a single sample, the result has a
    /// list of values that is the element-wise sum of the original lists.
    pub values: Field<Vec<i64>, 2, OPT_ZERO>,
    /// NOTE: While possible, having multiple values for the same label key is
    /// strongly discouraged and should never be used. Most tools (e.g. pprof)
    /// do not have good (or any) support for multi-value labels. And an even
    /// more discouraged case is having a string label and a numeric label of
    /// the same name on a sample. Again, possible to express, but should not
    /// be used.
    pub labels: Vec<Field<Label, 3, NO_OPT_ZERO>>,
}

impl Sample {
    fn fields_proto_len(&self) -> u64 {
        self.location_ids.proto_len() + self.values.proto_len() + repeated_proto_len(&self.labels)
    }

    fn encode_fields(&self, writer: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.location_ids.encode(writer)?;
        self.values.encode(writer)?;
        encode_repeated(&self.labels, writer)
    }
}

impl_embedded_message!(Sample);

impl Message for Sample {
    fn merge_field(&mut self, field: RawField<'_>) -> Result<(), DecodeError> {
        match field.number {
            1 => self.location_ids.merge(field),
            2 => self.values.merge(field),
            3 => Field::push_decoded(&mut self.labels, field),
            _ => field.skip("Sample"),
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<&Sample> for crate::prost_impls::Sample {
    fn from(sample: &Sample) -> Self {
        // If the prost file is regenerated, this may pick up new members.
        #[allow(clippy::needless_update)]
        Self {
            location_ids: sample.location_ids.value.clone(),
            values: sample.values.value.clone(),
            labels: sample
                .labels
                .iter()
                .map(|field| crate::prost_impls::Label::from(field.value))
                .collect(),
            ..Self::default()
        }
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<Sample> for crate::prost_impls::Sample {
    fn from(sample: Sample) -> Self {
        Self::from(&sample)
    }
}

#[cfg(any(test, feature = "prost_impls"))]
impl From<crate::prost_impls::Sample> for Sample {
    fn from(sample: crate::prost_impls::Sample) -> Self {
        Self {
            location_ids: sample.location_ids.into(),
            values: sample.values.into(),
            labels: sample
                .labels
                .into_iter()
                .map(|label| Field::from(Label::from(label)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prost_impls;
    use prost::Message as _;

    #[test]
    fn empty() {
        let sample = Sample::default();
        let prost_sample = prost_impls::Sample {
            location_ids: vec![],
            values: vec![],
            labels: vec![],
        };

        assert_eq!(sample.measured_len(), 0);
        let buffer = sample.encode_to_vec().unwrap();
        let roundtrip = prost_impls::Sample::decode(buffer.as_slice()).unwrap();
        assert_eq!(prost_sample, roundtrip);
    }

    #[test]
    fn packed_location_ids() {
        let sample = Sample {
            location_ids: Field::from(vec![1, 2, 3]),
            ..Default::default()
        };
        assert_eq!(
            sample.encode_to_vec().unwrap(),
            [0x0a, 0x03, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn packed_zero_takes_a_byte() {
        let sample = Sample {
            values: Field::from(vec![0, 0]),
            ..Default::default()
        };
        assert_eq!(sample.encode_to_vec().unwrap(), [0x12, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn unpacked_values_are_accepted() {
        // Each value under its own varint tag, as older encoders do.
        let bytes = [0x10, 0x05, 0x10, 0x06, 0x12, 0x01, 0x07];
        let sample = Sample::decode(&bytes).unwrap();
        assert_eq!(sample.values.value, vec![5, 6, 7]);
    }

    #[test]
    fn labels_with_strings_and_numbers() {
        let sample = Sample {
            location_ids: Field::from(vec![3, 2, 1]),
            values: Field::from(vec![10, -20]),
            labels: vec![
                Field::from(Label {
                    key: Field::from(1),
                    str: Field::from(2),
                    ..Default::default()
                }),
                Field::from(Label {
                    key: Field::from(3),
                    num: Field::from(4096),
                    num_unit: Field::from(4),
                    ..Default::default()
                }),
                Field::default(),
            ],
        };
        let buffer = sample.encode_to_vec().unwrap();
        assert_eq!(Sample::decode(&buffer).unwrap(), sample);
        assert_eq!(prost_impls::Sample::from(&sample).encode_to_vec(), buffer);
    }

    #[test]
    fn roundtrip() {
        bolero::check!().with_type::<Sample>().for_each(|sample| {
            let prost_sample = prost_impls::Sample::from(sample);

            let buffer = sample.encode_to_vec().unwrap();
            assert_eq!(buffer.len(), sample.measured_len());
            let roundtrip = prost_impls::Sample::decode(buffer.as_slice()).unwrap();
            assert_eq!(prost_sample, roundtrip);

            let buffer2 = prost_sample.encode_to_vec();
            assert_eq!(buffer, buffer2);
            assert_eq!(&Sample::decode(&buffer2).unwrap(), sample);
        });
    }
}

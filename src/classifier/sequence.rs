// Fixed-length sequence padding.
//
// Matches Keras `pad_sequences(maxlen, padding='post', truncating='post')`:
// long sequences keep their first `max_length` ids, short ones are filled on
// the right. The model was trained under this convention, so a mismatch here
// silently degrades accuracy rather than erroring.

/// Shape of the integer sequence fed to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceSpec {
    /// Number of ids per sequence
    pub max_length: usize,
    /// Filler id used for right-padding
    pub pad_id: i64,
}

impl Default for SequenceSpec {
    fn default() -> Self {
        Self {
            max_length: 100,
            pad_id: 0,
        }
    }
}

impl SequenceSpec {
    /// Truncate or right-pad `ids` to exactly `max_length` entries.
    pub fn pad(&self, ids: &[i64]) -> Vec<i64> {
        let mut padded: Vec<i64> = ids.iter().copied().take(self.max_length).collect();
        padded.resize(self.max_length, self.pad_id);
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_short_sequence() {
        let spec = SequenceSpec {
            max_length: 5,
            pad_id: 0,
        };
        assert_eq!(spec.pad(&[7, 8]), vec![7, 8, 0, 0, 0]);
    }

    #[test]
    fn test_truncate_keeps_leading_ids() {
        let spec = SequenceSpec {
            max_length: 3,
            pad_id: 0,
        };
        assert_eq!(spec.pad(&[1, 2, 3, 4, 5]), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_sequence_is_all_filler() {
        let spec = SequenceSpec {
            max_length: 4,
            pad_id: 9,
        };
        assert_eq!(spec.pad(&[]), vec![9, 9, 9, 9]);
    }

    #[test]
    fn test_default_length_is_100() {
        let spec = SequenceSpec::default();
        assert_eq!(spec.pad(&[3; 250]).len(), 100);
        assert_eq!(spec.pad(&[3; 10]).len(), 100);
    }
}

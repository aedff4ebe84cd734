/// Errors raised while building an [`EytzingerArray`](crate::EytzingerArray).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The requested length exceeds half the maximum value of the index type,
    /// so the `2i + 2` child computation could overflow.
    IndexTooSmall {
        /// Requested element count.
        len: usize,
        /// Name of the index type that was too narrow.
        index_type: &'static str,
    },
    /// The input iterator ended before `expected` elements were read.
    InputExhausted { expected: usize, actual: usize },
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexTooSmall { len, index_type } => write!(
                f,
                "array length {len} is too big for index type {index_type}, use a wider index type"
            ),
            Self::InputExhausted { expected, actual } => write!(
                f,
                "input yielded {actual} elements but {expected} were requested"
            ),
        }
    }
}

impl std::error::Error for BuildError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_length_and_type() {
        let err = BuildError::IndexTooSmall {
            len: 200,
            index_type: "u8",
        };
        let msg = err.to_string();
        assert!(msg.contains("200"), "{msg}");
        assert!(msg.contains("u8"), "{msg}");
    }

    #[test]
    fn display_input_exhausted() {
        let err = BuildError::InputExhausted {
            expected: 10,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "input yielded 3 elements but 10 were requested"
        );
    }
}

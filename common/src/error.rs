use serde::{Deserialize, Serialize};

/// Input-validity failures: malformed or missing feed data that must stop
/// the cycle rather than be silently defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputError {
    NonFinite {
        field: String,
    },
    Negative {
        field: String,
        value: f64,
    },
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    MissingSeries {
        timeframe: String,
    },
    NotEnoughBars {
        timeframe: String,
        have: usize,
        need: usize,
    },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::NonFinite { field } => {
                write!(f, "Field '{}' is missing or not a finite number", field)
            }
            InputError::Negative { field, value } => {
                write!(f, "Field '{}' must be non-negative, got {}", field, value)
            }
            InputError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "Field '{}' out of range: {} not in [{}, {}]",
                    field, value, min, max
                )
            }
            InputError::MissingSeries { timeframe } => {
                write!(f, "No bar series supplied for timeframe {}", timeframe)
            }
            InputError::NotEnoughBars {
                timeframe,
                have,
                need,
            } => {
                write!(
                    f,
                    "Timeframe {} has {} bars, {} required",
                    timeframe, have, need
                )
            }
        }
    }
}

impl std::error::Error for InputError {}

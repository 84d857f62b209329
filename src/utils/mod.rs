pub mod date;
pub mod duration;
pub mod fuzzy;

pub use date::{parse_time, parse_time_at, TimeSpec};
pub use duration::{parse_duration, parse_offset, split_hms, Span, TimeParseError};

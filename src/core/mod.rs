pub mod array;
pub mod interval;
pub mod interval_set;
pub mod primitives;
pub mod time_unit;

pub use array::{JaggedArray, extrema, min_interval, search_index, sum_range};
pub use interval::Interval;
pub use interval_set::IntervalSet;
pub use time_unit::TimeUnit;

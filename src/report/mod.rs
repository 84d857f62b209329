// Reporting windows and per-project totals for `show` and `stats`

pub mod stats;
pub mod window;

pub use stats::{compute_stats, natural_cmp, Stats, StatsRow};
pub use window::{resolve_window, Shortcut, Window, WindowRequest};

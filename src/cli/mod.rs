//! CLI argument parsing and command handling.

mod args;
mod validators;

pub use args::{
    Cli, Command, ConfigAction, DecimateArgs, DecimateBatchArgs, DecimateOptionArgs,
    GlobalArgs, MergeArgs, MergeBatchArgs, MergeOptionArgs, PatternArgs, SpectrogramArgs,
    SpectrogramBatchArgs, SpectrogramOptionArgs, ViewArgs,
};
pub use validators::{
    AcceptedSet, parse_accepted_set, parse_day_range, parse_fill_value, parse_rate, parse_seconds,
};

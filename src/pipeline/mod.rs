//! Processing pipeline components.

mod batch;
mod coordinator;
mod errlog;
mod processor;
mod reservation;

pub use batch::{
    BatchSummary, DecimateBatchSettings, DecimationStage, MergeBatchSettings, MergeUnit,
    PatternSettings, SpectrogramBatchSettings, plan_merge_units, run_decimate_batch,
    run_merge_batch, run_spectrogram_batch,
};
pub use coordinator::{
    collect_segment_files, ensure_output_dir, file_timestamp, merged_output_name,
    output_dir_for, output_extension, rename_for_format, year_from_token,
};
pub use errlog::{ErrorLog, error_chain};
pub use processor::{
    DecimateResult, DirectoryMerge, decimate_file, merge_directory, spectrogram_file,
};
pub use reservation::{OutputReservation, cleanup_all_reservations, serial_name};

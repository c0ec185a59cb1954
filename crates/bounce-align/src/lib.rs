//! Beat-synchronized cut planning.
//!
//! This crate is the synchronous core of the pipeline:
//! - Measure filtering: keep every Nth beat as a downbeat
//! - Scene alignment: split long scenes and snap cuts to measures
//! - Plan serialization: the text form handed to assembly
//!
//! Nothing here touches the filesystem or spawns processes.

pub mod aligner;
pub mod error;
pub mod measures;
pub mod scenes;
pub mod serializer;
pub mod snap;
pub mod split;
pub mod timestamps;
pub mod timing;

pub use aligner::{align, AlignDiagnostics, AlignOptions, AlignWarning, Alignment};
pub use error::{AlignError, AlignResult, PlanParseError};
pub use measures::{estimate_tempo, filter_measures, TempoEstimate};
pub use scenes::{scenes_from_cuts, DEFAULT_MIN_SCENE_GAP};
pub use serializer::{read_plan, write_plan};
pub use snap::snap_to_measure;
pub use split::split_scene;
pub use timestamps::{parse_timestamp_list, write_timestamp_list, TimestampList};
pub use timing::time_scale;

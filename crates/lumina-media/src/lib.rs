#![deny(unreachable_patterns)]
//! Media engine for capsule assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Remote media fetching into job scratch space
//! - Orientation probing via FFprobe
//! - Branded slide compositing behind the `ImageCompositor` trait
//! - Segment rendering and final concatenation behind `MediaTranscoder`

pub mod command;
pub mod compositor;
pub mod concat;
pub mod download;
pub mod error;
pub mod probe;
pub mod segment;
pub mod slide;
pub mod transcoder;

pub use command::{check_convert, check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use compositor::{
    sanitize_annotation_text, Gravity, ImageCompositor, ImagePlacement, MagickCompositor,
    TextOverlay,
};
pub use concat::concatenate;
pub use download::fetch_to_file;
pub use error::{MediaError, MediaResult};
pub use probe::{detect_orientation, probe_dimensions, MediaDimensions};
pub use segment::{segment_path, SegmentRenderer, TEXT_SLIDE_SECS};
pub use slide::{SlideRenderer, BACKGROUND_FILE};
pub use transcoder::{FfmpegTranscoder, MediaTranscoder, CANVAS_HEIGHT, CANVAS_WIDTH};

//! Host-side helpers

pub mod image;

pub use self::image::{decode_image, frame_from_bytes, frame_from_file, to_rgba_frame};

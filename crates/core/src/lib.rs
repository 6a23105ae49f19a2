//! Facial region segmentation and contour vectorization.
//!
//! Given a photo, a color-coded segmentation map and facial landmarks, the
//! engine levels and crops the face, carves the main face mask into
//! anatomical regions, traces one closed contour per region and renders the
//! result as an SVG, PNG or JSON document.

pub mod alignment {
    pub mod face_aligner;
}

pub mod masking {
    pub mod mask_preparation;
}

pub mod subdivision {
    pub mod anatomical_subdivider;
    pub mod face_boundaries;
}

pub mod contours {
    pub mod contour_extractor;
    pub mod under_eye;
}

pub mod rendering {
    pub mod digit_font;
    pub mod overlay_renderer;
}

pub mod output {
    pub mod domain {
        pub mod output_generator;
        pub mod style;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod process_face_use_case;
    pub mod region_fan_out;
}

pub mod io {
    pub mod document_writer;
    pub mod image_file_reader;
    pub mod landmark_reader;
}

pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod contour;
    pub mod error;
    pub mod landmarks;
    pub mod mask;
    pub mod region;
}

pub use pipeline::process_face_use_case::{process_face, FaceProcessingResult, ProcessFaceUseCase};
pub use shared::error::{FaceContourError, Result};

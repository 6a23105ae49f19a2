pub mod encoding;
pub mod generator_factory;
pub mod json_generator;
pub mod png_generator;
pub mod svg_generator;

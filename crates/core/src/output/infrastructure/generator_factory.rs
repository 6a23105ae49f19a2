use crate::output::domain::output_generator::{OutputFormat, OutputGenerator};
use crate::output::domain::style::StyleConfiguration;

use super::json_generator::JsonGenerator;
use super::png_generator::PngGenerator;
use super::svg_generator::SvgGenerator;

/// Creates the document generator for `format`.
///
/// The style is ignored by the metadata generator, which carries geometry only.
pub fn create_generator(format: OutputFormat, style: StyleConfiguration) -> Box<dyn OutputGenerator> {
    log::info!("Using {format} output generator");
    match format {
        OutputFormat::Svg => Box::new(SvgGenerator::new(style)),
        OutputFormat::Png => Box::new(PngGenerator::new(style)),
        OutputFormat::Json => Box::new(JsonGenerator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OutputFormat::Svg)]
    #[case(OutputFormat::Png)]
    #[case(OutputFormat::Json)]
    fn test_factory_returns_requested_format(#[case] format: OutputFormat) {
        let generator = create_generator(format, StyleConfiguration::default());
        assert_eq!(generator.format(), format);
    }
}

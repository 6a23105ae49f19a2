/// Horizontal nudge applied to the chin label in generated documents.
pub const CHIN_LABEL_NUDGE_X: i32 = 160;

pub const CM_PER_INCH: f64 = 2.54;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const CONFIG_DIR_NAME: &str = "facecontour";
pub const CONFIG_FILE_NAME: &str = "config.json";

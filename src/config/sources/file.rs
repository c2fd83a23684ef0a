//! TOML file source

use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use std::path::Path;

/// File name looked up by `ConfigLoader::load_from_dir`
pub const CONFIG_FILE_NAME: &str = "treegrid.toml";

/// Add a TOML file to the builder. A missing file is an error only when
/// `required` is set.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        File::from(path)
            .format(FileFormat::Toml)
            .required(required),
    )
}

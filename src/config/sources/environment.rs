//! Environment variable source: TREEGRID__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Environment source for `TREEGRID__SECTION__KEY` variables.
///
/// `TREEGRID__TABLE__ROWS_PER_PAGE_OPTIONS` takes a comma separated list.
pub fn source() -> Environment {
    Environment::with_prefix("TREEGRID")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("table.rows_per_page_options")
}

/// Add an environment overlay to the builder.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    environment: Environment,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(environment)
}

pub mod configuration;
pub mod environment;
pub mod error;
pub mod values;
pub mod version1;

pub use configuration::{make_runtime_configuration, Configuration};
pub use values::{ConnectionUri, PoolSettings, Secret};
pub use version1::{
    parse_configuration, write_parsed_configuration, MalloySettings, ParsedConfiguration,
    CONFIGURATION_FILENAME, CONFIGURATION_JSONSCHEMA_FILENAME, DEFAULT_CONNECTION_URI_VARIABLE,
};

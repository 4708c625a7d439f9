//! Configuration for the query engine.

use std::path::PathBuf;

use query_engine_metadata::metadata;

use crate::environment::Environment;
use crate::error::MakeRuntimeConfigurationError;
use crate::values::{ConnectionUri, PoolSettings, Secret};
use crate::version1::{MalloySettings, ParsedConfiguration, CONFIGURATION_FILENAME};

/// The 'Configuration' type collects all the information necessary to translate and execute
/// queries at runtime.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which resolves secrets against the environment and checks
/// that the metadata is self-consistent.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub pool_settings: PoolSettings,
    pub connection_uri: String,
    pub malloy: MalloySettings,
}

pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let connection_uri = match parsed_config.connection_uri {
        ConnectionUri(Secret::Plain(uri)) => Ok(uri),
        ConnectionUri(Secret::FromEnvironment { variable }) => {
            environment.read(&variable).map_err(|error| {
                MakeRuntimeConfigurationError::MissingEnvironmentVariable {
                    file_path: PathBuf::from(CONFIGURATION_FILENAME),
                    message: error.to_string(),
                }
            })
        }
    }?;

    check_metadata(&parsed_config.metadata)?;

    Ok(Configuration {
        metadata: parsed_config.metadata,
        pool_settings: parsed_config.pool_settings,
        connection_uri,
        malloy: parsed_config.malloy,
    })
}

/// Every object type has its identity field, and every edge leads to a known object type.
fn check_metadata(metadata: &metadata::Metadata) -> Result<(), MakeRuntimeConfigurationError> {
    for (name, info) in &metadata.object_types.0 {
        if info.id_field_info().is_none() {
            return Err(MakeRuntimeConfigurationError::InvalidMetadata(format!(
                "object type '{name}' has no identity field '{}'",
                info.id_field
            )));
        }
        for (edge_name, edge) in &info.edges {
            if metadata.lookup_object_type(&edge.target).is_none() {
                return Err(MakeRuntimeConfigurationError::InvalidMetadata(format!(
                    "edge '{edge_name}' of object type '{name}' leads to unknown object type '{}'",
                    edge.target
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{EmptyEnvironment, FixedEnvironment, Variable};
    use crate::version1::DEFAULT_CONNECTION_URI_VARIABLE;
    use metadata::{EdgeInfo, EdgeJoin, Nullable, ObjectTypeInfo, ScalarType};

    #[test]
    fn connection_uri_is_read_from_the_environment() {
        let configuration = make_runtime_configuration(
            ParsedConfiguration::empty(),
            FixedEnvironment::from([(
                Variable::from(DEFAULT_CONNECTION_URI_VARIABLE),
                "postgresql://localhost/objects".to_string(),
            )]),
        )
        .expect("valid configuration");
        assert_eq!(configuration.connection_uri, "postgresql://localhost/objects");
    }

    #[test]
    fn missing_variables_are_reported() {
        let error = make_runtime_configuration(ParsedConfiguration::empty(), EmptyEnvironment)
            .expect_err("the variable is not set");
        assert_eq!(
            error.to_string(),
            "invalid configuration environment: the environment variable OBJQUERY_CONNECTION_URI is not set"
        );
    }

    #[test]
    fn edges_must_lead_to_known_types() {
        let mut parsed = ParsedConfiguration::empty();
        parsed.connection_uri = "postgresql://localhost/objects".into();
        parsed.metadata = metadata::Metadata::empty().with_object_type(
            "User",
            ObjectTypeInfo::new("User")
                .with_field("id", ScalarType::Bigint, Nullable::NonNullable)
                .with_edge(
                    "reviews",
                    EdgeInfo::many("Review", EdgeJoin::columns([("id", "author_id")])),
                ),
        );

        let error = make_runtime_configuration(parsed, EmptyEnvironment)
            .expect_err("Review is not mapped");
        assert_eq!(
            error.to_string(),
            "invalid metadata: edge 'reviews' of object type 'User' leads to unknown object type 'Review'"
        );
    }
}

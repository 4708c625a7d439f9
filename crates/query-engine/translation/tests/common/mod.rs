use std::path::PathBuf;

use objquery_configuration::environment::{FixedEnvironment, Variable};
use objquery_configuration::{
    make_runtime_configuration, parse_configuration, Configuration,
    DEFAULT_CONNECTION_URI_VARIABLE,
};
use query_engine_models::Query;

const GOLDENFILES: &str = "tests/goldenfiles";

/// The configuration every translation test runs against.
pub async fn configuration() -> anyhow::Result<Configuration> {
    let parsed = parse_configuration(GOLDENFILES).await?;
    Ok(make_runtime_configuration(
        parsed,
        FixedEnvironment::from([(
            Variable::from(DEFAULT_CONNECTION_URI_VARIABLE),
            "the translation tests do not rely on a database connection".to_string(),
        )]),
    )?)
}

/// Read the query of a test.
pub fn request(testname: &str) -> anyhow::Result<Query> {
    let path = PathBuf::from(GOLDENFILES).join(testname).join("request.json");
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

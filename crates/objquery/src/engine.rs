//! Translate and run object queries against one configuration.

use tracing::{info_span, Instrument};

use objquery_configuration::Configuration;
use query_engine_execution::{postgres, MemoryExecutor, Resolver};
use query_engine_models::{Query, QueryResponse};
use query_engine_sql::sql;
use query_engine_translation::translation;

use crate::error::Error;
use crate::state::{self, State};

/// Ties a runtime configuration to the translators and executors.
///
/// An engine made with [`Engine::new`] translates queries and runs them in memory. Running
/// them against PostgreSQL needs an engine made with [`Engine::connect`].
#[derive(Debug, Clone)]
pub struct Engine {
    configuration: Configuration,
    state: Option<State>,
}

impl Engine {
    pub fn new(configuration: Configuration) -> Self {
        Engine {
            configuration,
            state: None,
        }
    }

    /// Connect to the configured database, registering the execution metrics.
    pub async fn connect(
        configuration: Configuration,
        metrics_registry: &mut prometheus::Registry,
    ) -> Result<Self, Error> {
        let state = state::create_state(&configuration, metrics_registry).await?;
        Ok(Engine {
            configuration,
            state: Some(state),
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn state(&self) -> Result<&State, Error> {
        self.state.as_ref().ok_or(Error::NotConnected)
    }

    /// The SQL returning every result object of the query in one JSON array.
    pub fn to_sql(&self, query: &Query) -> Result<sql::string::SQL, Error> {
        let plan = translation::query::translate(&self.configuration.metadata, query)?;
        let sql = plan.query.query_sql();
        tracing::info!(generated_sql = sql.sql, params = ?&sql.params);
        Ok(sql)
    }

    pub fn to_malloy(&self, query: &Query) -> Result<String, Error> {
        Ok(translation::malloy::translate(
            &self.configuration.metadata,
            query,
            &self.configuration.malloy.connection,
        )?)
    }

    pub fn to_cypher(&self, query: &Query) -> Result<String, Error> {
        Ok(translation::cypher::translate(
            &self.configuration.metadata,
            query,
        )?)
    }

    /// `CREATE TABLE` statements for every mapped object type.
    pub fn ddl(&self) -> Result<Vec<sql::string::DDL>, Error> {
        Ok(translation::ddl::translate(&self.configuration.metadata)?)
    }

    /// Run a query against a resolver.
    pub async fn execute_in_memory<R: Resolver>(
        &self,
        resolver: &R,
        query: &Query,
    ) -> Result<QueryResponse, Error> {
        Ok(MemoryExecutor::new(&self.configuration.metadata, resolver)
            .execute(query)
            .await?)
    }

    /// Run a query against the connected database.
    pub async fn execute(&self, query: &Query) -> Result<QueryResponse, Error> {
        let state = self.state()?;

        let plan = async { translation::query::translate(&self.configuration.metadata, query) }
            .instrument(info_span!("Plan query"))
            .await
            .map_err(|err| {
                tracing::error!("{}", err);
                err
            })?;

        let result = postgres::execute(&state.pool, &state.metrics, plan)
            .instrument(info_span!("Execute query"))
            .await
            .map_err(|err| {
                tracing::error!("{}", err);
                err
            })?;

        query_engine_execution::metrics::update_pool_metrics(&state.pool, &state.metrics);
        Ok(result)
    }

    /// The formatted SQL of a query and the database's plan for it.
    pub async fn explain(&self, query: &Query) -> Result<(String, String), Error> {
        let state = self.state()?;
        let plan = translation::query::translate(&self.configuration.metadata, query)?;
        Ok(postgres::explain(&state.pool, &state.metrics, plan)
            .instrument(info_span!("Explain query"))
            .await?)
    }

    /// Create the tables of every mapped object type in the connected database.
    pub async fn create_tables(&self) -> Result<(), Error> {
        let state = self.state()?;
        for sql::string::DDL(statement) in self.ddl()? {
            tracing::info!(generated_sql = statement.sql);
            sqlx::query(&statement.sql)
                .execute(&state.pool)
                .instrument(info_span!("Create table"))
                .await
                .map_err(query_engine_execution::Error::DB)?;
        }
        Ok(())
    }
}

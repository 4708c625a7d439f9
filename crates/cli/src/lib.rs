//! The commands of the `objquery` tool.
//!
//! Every command works on a context directory holding a `configuration.json`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};

use objquery::Engine;
use objquery_configuration::environment::Environment;
use objquery_configuration::{
    make_runtime_configuration, parse_configuration, write_parsed_configuration,
    ParsedConfiguration, CONFIGURATION_FILENAME,
};
use query_engine_models::Query;
use query_engine_sql::sql;

/// The various contextual bits and bobs we need to run.
pub struct Context<Env: Environment> {
    pub context_path: PathBuf,
    pub environment: Env,
}

/// The command invoked by the user.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write an empty configuration and its JSON schema to the context directory.
    Initialize,
    /// Translate a query file.
    Translate {
        /// The language to translate to.
        #[arg(long, value_enum, default_value_t = Target::Sql)]
        target: Target,
        /// Indent the generated SQL.
        #[arg(long)]
        pretty: bool,
        /// A JSON file holding the query.
        file: PathBuf,
    },
    /// Print the `CREATE TABLE` statements for the mapped object types.
    Ddl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Sql,
    Malloy,
    Cypher,
    /// The query's operation tree.
    Dump,
}

/// Run a command in a given directory, writing what it prints to `out`.
pub async fn run(
    command: Command,
    context: Context<impl Environment>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Initialize => initialize(&context.context_path, out).await?,
        Command::Translate {
            target,
            pretty,
            file,
        } => translate(context, target, pretty, &file, out).await?,
        Command::Ddl => ddl(context, out).await?,
    };
    Ok(())
}

/// Initialize an empty directory with an empty configuration.
///
/// Fails if a configuration is already there.
async fn initialize(context_path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    if tokio::fs::try_exists(context_path.join(CONFIGURATION_FILENAME)).await? {
        anyhow::bail!(
            "a configuration already exists in {}",
            context_path.display()
        );
    }
    tokio::fs::create_dir_all(context_path).await?;
    write_parsed_configuration(ParsedConfiguration::initial(), context_path).await?;
    writeln!(out, "initialized {}", context_path.display())?;
    Ok(())
}

async fn engine(context: Context<impl Environment>) -> anyhow::Result<Engine> {
    let parsed = parse_configuration(&context.context_path).await?;
    let configuration = make_runtime_configuration(parsed, context.environment)?;
    Ok(Engine::new(configuration))
}

async fn translate(
    context: Context<impl Environment>,
    target: Target,
    pretty: bool,
    file: &Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let query: Query = serde_json::from_str(&tokio::fs::read_to_string(file).await?)?;
    let engine = engine(context).await?;
    tracing::debug!(?target, file = %file.display(), "translating query");

    match target {
        Target::Sql => {
            let query_sql = engine.to_sql(&query)?;
            if pretty {
                writeln!(out, "{}", sql::execution_plan::pretty(&query_sql.sql))?;
            } else {
                writeln!(out, "{}", query_sql.sql)?;
            }
            for (index, sql::string::Param::String(param)) in query_sql.params.iter().enumerate() {
                writeln!(out, "-- ${} = {param:?}", index + 1)?;
            }
        }
        Target::Malloy => writeln!(out, "{}", engine.to_malloy(&query)?)?,
        Target::Cypher => writeln!(out, "{}", engine.to_cypher(&query)?)?,
        Target::Dump => write!(out, "{}", query.dump())?,
    }
    Ok(())
}

async fn ddl(context: Context<impl Environment>, out: &mut impl Write) -> anyhow::Result<()> {
    let engine = engine(context).await?;
    for sql::string::DDL(statement) in engine.ddl()? {
        writeln!(out, "{};", statement.sql)?;
    }
    Ok(())
}

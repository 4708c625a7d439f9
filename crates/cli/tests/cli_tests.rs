//! Run the commands against temporary context directories.

use std::path::{Path, PathBuf};

use similar_asserts::assert_eq;

use objquery_cli::{run, Command, Context, Target};
use objquery_configuration::environment::EmptyEnvironment;
use objquery_configuration::{
    write_parsed_configuration, ParsedConfiguration, CONFIGURATION_FILENAME,
    CONFIGURATION_JSONSCHEMA_FILENAME,
};

async fn run_in(dir: &Path, command: Command) -> anyhow::Result<String> {
    let mut out = vec![];
    run(
        command,
        Context {
            context_path: dir.to_path_buf(),
            environment: EmptyEnvironment,
        },
        &mut out,
    )
    .await?;
    Ok(String::from_utf8(out)?)
}

async fn social_context() -> anyhow::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    let mut parsed = ParsedConfiguration::initial();
    parsed.connection_uri = "postgresql://localhost/social".into();
    parsed.metadata = tests_common::social_metadata();
    write_parsed_configuration(parsed, dir.path()).await?;
    Ok(dir)
}

async fn query_file(dir: &Path, query: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join("query.json");
    tokio::fs::write(&path, query).await?;
    Ok(path)
}

const FRIENDS_QUERY: &str = r#"{
  "source": { "type": "collection", "objectType": "User", "ids": [1] },
  "operations": [
    { "type": "where", "predicate": "name == 'id1'" },
    { "type": "edge", "edge": "friends", "operations": [{ "type": "project", "fields": ["name"] }] }
  ]
}"#;

#[tokio::test]
async fn initialize_writes_configuration_and_schema() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let context = dir.path().join("social");

    let output = run_in(&context, Command::Initialize).await?;
    assert_eq!(output, format!("initialized {}\n", context.display()));
    assert!(context.join(CONFIGURATION_FILENAME).exists());
    assert!(context.join(CONFIGURATION_JSONSCHEMA_FILENAME).exists());

    let again = run_in(&context, Command::Initialize).await;
    assert!(again.is_err());
    Ok(())
}

#[tokio::test]
async fn translate_to_sql_lists_parameters() -> anyhow::Result<()> {
    let dir = social_context().await?;
    let file = query_file(dir.path(), FRIENDS_QUERY).await?;

    let output = run_in(
        dir.path(),
        Command::Translate {
            target: Target::Sql,
            pretty: false,
            file,
        },
    )
    .await?;
    let lines = output.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(r#"SELECT coalesce(json_agg(row_to_json("universe")), '[]')"#));
    assert!(lines[0].contains(r#"("user"."name" = $1)"#));
    assert_eq!(lines[1], r#"-- $1 = "id1""#);
    Ok(())
}

#[tokio::test]
async fn translate_to_cypher_and_dump() -> anyhow::Result<()> {
    let dir = social_context().await?;
    let file = query_file(dir.path(), FRIENDS_QUERY).await?;

    let cypher = run_in(
        dir.path(),
        Command::Translate {
            target: Target::Cypher,
            pretty: false,
            file: file.clone(),
        },
    )
    .await?;
    assert_eq!(
        cypher,
        "MATCH (u:User)-[:FRIENDS]->(n1:User)\nWHERE u.id IN [1] AND u.name = 'id1'\nRETURN n1.name\n"
    );

    let dump = run_in(
        dir.path(),
        Command::Translate {
            target: Target::Dump,
            pretty: false,
            file,
        },
    )
    .await?;
    assert_eq!(
        dump,
        "\
EDGE friends
    PROJECT [name]
        PARENT
    WHERE name == 'id1'
        LEAF User [1]
"
    );
    Ok(())
}

#[tokio::test]
async fn ddl_prints_one_statement_per_table() -> anyhow::Result<()> {
    let dir = social_context().await?;
    let output = run_in(dir.path(), Command::Ddl).await?;
    let tables = output
        .lines()
        .map(|line| line.split('"').nth(1).unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(tables, vec!["user", "review", "friendships"]);
    assert!(output.lines().all(|line| line.ends_with(");")));
    Ok(())
}

#[tokio::test]
async fn translating_without_configuration_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = query_file(dir.path(), FRIENDS_QUERY).await?;
    let result = run_in(
        dir.path(),
        Command::Translate {
            target: Target::Malloy,
            pretty: false,
            file,
        },
    )
    .await;
    assert!(result.is_err());
    Ok(())
}

//! Command line parsing and configuration resolution tests.

use clap::Parser;
use dbsheet::{
    Cli, Command, DEFAULT_OUTPUT, DotenvOutcome, load_dotenv_from, resolve_config,
    resolve_database_url,
};
use dbsheet_core::error::DbSheetError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const NO_URL_VARS: [(&str, Option<&str>); 2] = [("DATABASE_URL", None), ("DB_URI", None)];

#[test]
fn test_cli_defaults() {
    temp_env::with_vars(NO_URL_VARS, || {
        let cli = Cli::try_parse_from(["dbsheet"]).unwrap();

        assert_eq!(cli.command, None);
        assert_eq!(cli.options.schema, "public");
        assert!(cli.options.tables.is_empty());
        assert_eq!(cli.options.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(cli.global.verbose, 0);
        assert!(!cli.global.quiet);
    });
}

#[test]
fn test_cli_options_after_subcommand() {
    temp_env::with_vars(NO_URL_VARS, || {
        let cli = Cli::try_parse_from([
            "dbsheet",
            "generate",
            "--database-url",
            "postgres://localhost/app",
            "-t",
            "users,companies",
            "-o",
            "docs.xlsx",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Command::Generate));
        assert_eq!(cli.options.tables, vec!["users", "companies"]);
        assert_eq!(cli.options.output, PathBuf::from("docs.xlsx"));
        assert_eq!(cli.global.verbose, 2);
    });
}

#[test]
fn test_cli_list_tables_command() {
    let cli = Cli::try_parse_from(["dbsheet", "list-tables", "-s", "billing"]).unwrap();
    assert_eq!(cli.command, Some(Command::ListTables));
    assert_eq!(cli.options.schema, "billing");
}

#[test]
fn test_database_url_precedence() {
    temp_env::with_vars(
        [
            ("DATABASE_URL", Some("postgres://from-env/db")),
            ("DB_URI", Some("postgres://from-uri/db")),
        ],
        || {
            assert_eq!(
                resolve_database_url(Some("postgres://explicit/db")).unwrap(),
                "postgres://explicit/db"
            );
            assert_eq!(
                resolve_database_url(None).unwrap(),
                "postgres://from-env/db"
            );
        },
    );

    temp_env::with_vars(
        [
            ("DATABASE_URL", None),
            ("DB_URI", Some("postgresql://from-uri/db")),
        ],
        || {
            assert_eq!(
                resolve_database_url(None).unwrap(),
                "postgresql://from-uri/db"
            );
        },
    );
}

#[test]
fn test_missing_database_url_is_configuration_error() {
    temp_env::with_vars(NO_URL_VARS, || {
        let error = resolve_database_url(None).unwrap_err();
        assert!(matches!(error, DbSheetError::Configuration { .. }));
        assert!(error.to_string().contains("DATABASE_URL"));
    });
}

#[test]
fn test_non_postgres_url_is_rejected() {
    let error = resolve_database_url(Some("mysql://root:pw@localhost/app")).unwrap_err();
    assert!(matches!(error, DbSheetError::Configuration { .. }));
    assert!(!error.to_string().contains(":pw@"));
}

#[test]
fn test_resolve_config_without_tables_lists_schema() {
    temp_env::with_vars(NO_URL_VARS, || {
        let cli =
            Cli::try_parse_from(["dbsheet", "--database-url", "postgres://localhost/app"])
                .unwrap();
        let config = resolve_config(&cli.options).unwrap();

        assert_eq!(config.tables, None);
        assert_eq!(config.schema, "public");
    });
}

#[test]
fn test_resolve_config_concatenates_tables_and_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# extra tables").unwrap();
    writeln!(file, "orders").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "invoices  # billing").unwrap();

    temp_env::with_vars(NO_URL_VARS, || {
        let tables_file = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "dbsheet",
            "--database-url",
            "postgres://localhost/app",
            "--tables",
            "users, companies",
            "--tables-file",
            tables_file,
        ])
        .unwrap();
        let config = resolve_config(&cli.options).unwrap();

        assert_eq!(
            config.tables,
            Some(vec![
                "users".to_string(),
                "companies".to_string(),
                "orders".to_string(),
                "invoices".to_string(),
            ])
        );
    });
}

#[test]
fn test_resolve_config_rejects_duplicate_tables() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "users").unwrap();

    temp_env::with_vars(NO_URL_VARS, || {
        let tables_file = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "dbsheet",
            "--database-url",
            "postgres://localhost/app",
            "-t",
            "users",
            "--tables-file",
            tables_file,
        ])
        .unwrap();

        let error = resolve_config(&cli.options).unwrap_err();
        assert!(matches!(error, DbSheetError::Configuration { .. }));
    });
}

#[test]
fn test_resolve_config_missing_tables_file_is_io_error() {
    temp_env::with_vars(NO_URL_VARS, || {
        let cli = Cli::try_parse_from([
            "dbsheet",
            "--database-url",
            "postgres://localhost/app",
            "--tables-file",
            "/nonexistent/dbsheet/tables.txt",
        ])
        .unwrap();

        let error = resolve_config(&cli.options).unwrap_err();
        assert!(matches!(error, DbSheetError::Io { .. }));
    });
}

#[test]
fn test_dotenv_file_is_loaded_and_reported() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "DATABASE_URL=postgres://from-dotenv/app").unwrap();

    temp_env::with_vars(NO_URL_VARS, || {
        let outcome = load_dotenv_from(file.path());
        assert_eq!(outcome, DotenvOutcome::Loaded(file.path().to_path_buf()));
        assert_eq!(
            resolve_database_url(None).unwrap(),
            "postgres://from-dotenv/app"
        );
    });
}

#[test]
fn test_dotenv_does_not_override_environment() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "DATABASE_URL=postgres://from-dotenv/app").unwrap();

    temp_env::with_vars(
        [("DATABASE_URL", Some("postgres://from-env/app")), ("DB_URI", None)],
        || {
            load_dotenv_from(file.path());
            assert_eq!(
                resolve_database_url(None).unwrap(),
                "postgres://from-env/app"
            );
        },
    );
}

#[test]
fn test_missing_dotenv_file_is_not_found() {
    let outcome = load_dotenv_from(std::path::Path::new("/nonexistent/dbsheet/.env"));
    assert_eq!(outcome, DotenvOutcome::NotFound);
}

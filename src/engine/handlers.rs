//! CLI command handlers: resolve options, open the file, run one command or the serve loop.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;

use crate::assist::{CommandGenerator, SqlGenerator};
use crate::engine::arg_parser::{Cli, Commands, FormatArg};
use crate::engine::tools::format_count;
use crate::session::{Session, SessionRegistry};
use crate::utils::{
    DEFAULT_PAGE_SIZE, HISTORY_LIMIT, PackagePaths, apply_file_to_opts, assist_command_from_env,
    load_sqlity_toml, setup_logging,
};
use crate::{Database, Opts, QueryResult, SortOrder, TableKind};

/// Defaults, then `.sqlity.toml` and the assist env key from the database's directory, then CLI flags.
pub fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts {
        db_path: cli.db.clone(),
        page_size: DEFAULT_PAGE_SIZE,
        history_limit: HISTORY_LIMIT,
        verbose: false,
        assist_command: Vec::new(),
        assist_consent: false,
    };
    let dir = config_dir(&cli.db);
    // Logging is not up yet; report a bad file once it is.
    let file_err = match load_sqlity_toml(dir) {
        Ok(Some(file)) => {
            apply_file_to_opts(&file, &mut opts);
            None
        }
        Ok(None) => None,
        Err(e) => Some(e),
    };
    if opts.assist_command.is_empty()
        && let Some(cmd) = assist_command_from_env(dir)
    {
        opts.assist_command = cmd;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if let Some(n) = cli.page_size {
        opts.page_size = n;
    }
    setup_logging(opts.verbose);
    if let Some(e) = file_err {
        warn!(
            "ignoring {}: {}",
            dir.join(PackagePaths::get().config_filename()).display(),
            e
        );
    }
    opts
}

fn config_dir(db: &Path) -> &Path {
    match db.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Run the subcommand in `cli` against its database file.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let mut db = Database::open(&opts.db_path)
        .with_context(|| format!("opening {}", opts.db_path.display()))?;

    match &cli.command {
        Commands::Tables => print_tables(&db)?,
        Commands::Describe { table } => {
            let schema = db.describe_table(table)?;
            if schema.columns.is_empty() {
                bail!("no such table: {}", table);
            }
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Schema => println!("{}", db.schema_sql()?),
        Commands::Query { sql } => {
            let result = db.execute_query(sql)?;
            print_result(&result)?;
        }
        Commands::Browse {
            table,
            page,
            page_size,
            order_by,
            desc,
        } => {
            let order = if *desc { SortOrder::Desc } else { SortOrder::Asc };
            let size = page_size.unwrap_or(opts.page_size);
            let data = db.table_page(table, *page, size, order_by.as_deref(), order)?;
            print_result(&data.result)?;
            info!(
                "Page {} of {} rows (page size {})",
                data.page,
                format_count(data.total_rows),
                data.page_size
            );
        }
        Commands::Export { table, format, out } => {
            let data = match format {
                FormatArg::Csv => db.export_csv(table)?,
                FormatArg::Json => db.export_json(table)?,
            };
            let out = out
                .clone()
                .unwrap_or_else(|| format!("{}.{}", table, format.extension()).into());
            std::fs::write(&out, data).with_context(|| format!("writing {}", out.display()))?;
            info!("Exported {} to {}", table, out.display());
        }
        Commands::Import {
            table,
            file,
            format,
        } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let count = match format.unwrap_or_else(|| FormatArg::from_path(file)) {
                FormatArg::Csv => db.import_csv(table, &text)?,
                FormatArg::Json => db.import_json(table, &text)?,
            };
            info!("Imported {} rows into {}", format_count(count as i64), table);
        }
        Commands::Insert { table, json } => {
            let values: serde_json::Map<String, Value> =
                serde_json::from_str(json).context("row must be a JSON object")?;
            let rowid = db.insert_row(table, &values)?;
            info!("Row inserted (rowid {})", rowid);
        }
        Commands::Update {
            table,
            rowid,
            column,
            value,
        } => {
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.clone()));
            db.update_row(table, *rowid, column, &value)?;
            info!("Row updated.");
        }
        Commands::Delete { table, rowids } => {
            let n = db.delete_rows(table, rowids)?;
            info!("{} row(s) deleted.", n);
        }
        Commands::Serve => {
            let generator = CommandGenerator::new(&opts.assist_command, opts.assist_consent);
            let mut sessions = SessionRegistry::new(opts.history_limit);
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            serve(
                &mut db,
                &mut sessions,
                generator
                    .is_configured()
                    .then_some(&generator as &dyn SqlGenerator),
                stdin.lock(),
                stdout.lock(),
            )?;
        }
    }

    db.close()
        .with_context(|| format!("closing {}", opts.db_path.display()))?;
    Ok(())
}

/// Answer one JSON response line per non-empty request line until `input` ends.
pub fn serve<R: BufRead, W: Write>(
    db: &mut Database,
    sessions: &mut SessionRegistry,
    assist: Option<&dyn SqlGenerator>,
    input: R,
    mut output: W,
) -> Result<()> {
    let path = db.path().to_path_buf();
    let state = sessions.session_mut(&path);
    let mut session = Session { db, state, assist };
    let start = Instant::now();
    let mut handled = 0usize;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = session.handle_line(&line);
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
        handled += 1;
    }
    debug!("Served {} requests in {:?}", handled, start.elapsed());
    Ok(())
}

fn print_tables(db: &Database) -> Result<()> {
    for t in db.list_tables()? {
        let kind = match t.kind {
            TableKind::Table => "table",
            TableKind::View => "view",
        };
        println!("{}\t{}\t{}", t.name, kind, format_count(t.row_count));
    }
    Ok(())
}

fn print_result(result: &QueryResult) -> Result<()> {
    if result.columns.is_empty() {
        info!(
            "{} row(s) affected in {:.1} ms",
            result.rows_affected, result.time
        );
        return Ok(());
    }
    println!("{}", result.columns.join("\t"));
    for row in &result.values {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
    debug!("{} row(s) in {:.1} ms", result.values.len(), result.time);
    Ok(())
}

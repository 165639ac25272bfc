// Docforge CLI - headless template operations against a session file

mod exit_codes;
mod session_file;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use docforge_config::Settings;
use docforge_core::{apply_marks, dedupe, locate, Document, Span};
use docforge_engine::{Session, TableView};
use docforge_protocol::DiscoveryResult;
use docforge_service_client::ServiceClient;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use session_file::SessionFile;

#[derive(Parser)]
#[command(name = "dforge")]
#[command(about = "Document template automation (headless)")]
#[command(version)]
struct Cli {
    /// Session file holding fields, table edits, and undo histories
    #[arg(long, global = true, env = "DFORGE_SESSION", default_value = "dforge-session.json")]
    session: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage session documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Find occurrences of a literal string in a file
    #[command(after_help = "\
Examples:
  dforge scan contract.md 'Acme Corp'
  dforge scan contract.md 'Acme Corp' --json")]
    Scan {
        /// File to scan
        file: PathBuf,
        /// Literal text to find (not a regex)
        needle: String,
        /// Emit spans as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a session document with the current selection marked
    Highlight {
        /// Document name (as loaded with `doc add`)
        doc: String,
    },

    /// Manage fields
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// Manage a field's references
    Ref {
        #[command(subcommand)]
        command: RefCommands,
    },

    /// Set the replacement value for a reference
    Replace {
        field: String,
        reference: String,
        value: String,
    },

    /// Choose what `highlight` marks
    Select {
        #[command(subcommand)]
        command: SelectCommands,
    },

    /// Edit and view extracted tables
    Table {
        #[command(subcommand)]
        command: TableCommands,
    },

    /// Undo within a scope: fields, tables, or field:<key>
    Undo { scope: String },

    /// Redo within a scope: fields, tables, or field:<key>
    Redo { scope: String },

    /// Merge a discovery result into the session
    #[command(after_help = "\
Examples:
  dforge ingest discovery.json
  dforge ingest --url http://localhost:8000")]
    Ingest {
        /// Discovery result file (omit when using --url)
        file: Option<PathBuf>,
        /// Call the discovery service instead of reading a file
        #[arg(long)]
        url: Option<String>,
        /// Discovery instructions (defaults to the configured ones)
        #[arg(long)]
        instructions: Option<String>,
    },

    /// Print the generation payload
    Payload {
        #[arg(long)]
        pretty: bool,
    },

    /// Build the payload, call the generation service, write the document
    Generate {
        /// Service base URL (defaults to the configured one)
        #[arg(long)]
        url: Option<String>,
        /// Output file for the generated document
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// Load a text/markdown file into the session
    Add {
        path: PathBuf,
        /// Override the document name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List loaded documents
    List,
}

#[derive(Subcommand)]
enum FieldCommands {
    /// Create a field from a label
    Add { label: String },
    /// Delete a field and everything it owns
    Rm { key: String },
    /// Change a field's display label
    Label { key: String, label: String },
    /// List fields with their references
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RefCommands {
    /// Add a reference to a field
    Add { field: String, text: String },
    /// Remove a reference by index (0 = newest)
    Rm { field: String, index: usize },
    /// Rewrite a reference in place, keeping its replacement value
    Rename {
        field: String,
        index: usize,
        text: String,
    },
}

#[derive(Subcommand)]
enum SelectCommands {
    /// Toggle a field in the highlight selection
    Field { key: String },
    /// Toggle a single reference in the highlight selection
    Ref { field: String, reference: String },
    /// Highlight every reference of every field
    All {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
}

#[derive(Subcommand)]
enum TableCommands {
    /// Record a cell edit (old value is taken from the pristine table)
    Edit {
        index: usize,
        row: usize,
        col: usize,
        value: String,
    },
    /// Print a table in its current view mode
    View { index: usize },
    /// Flip a table between original and edited view
    Toggle { index: usize },
    /// List tables and their edit counts
    List,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    ExitCode::from(run(cli))
}

fn run(cli: Cli) -> u8 {
    let settings = Settings::load();

    match cli.command {
        Commands::Scan { file, needle, json } => scan(&file, &needle, json),
        Commands::Doc { command } => with_session(&cli.session, &settings, |file| match command {
            DocCommands::Add { path, name } => doc_add(file, &path, name),
            DocCommands::List => {
                for doc in file.session.documents().iter() {
                    println!("{}\t{} bytes", doc.name, doc.text.len());
                }
                EXIT_SUCCESS
            }
        }),
        Commands::Highlight { doc } => with_session(&cli.session, &settings, |file| {
            let spans = match file.session.highlight_spans(&doc) {
                Ok(spans) => spans,
                Err(e) => {
                    eprintln!("{e}");
                    return EXIT_USAGE;
                }
            };
            let text = &file.session.documents().by_name(&doc).expect("checked above").text;
            println!("{}", apply_marks(text, &spans, "<mark>", "</mark>"));
            EXIT_SUCCESS
        }),
        Commands::Field { command } => with_session(&cli.session, &settings, |file| match command {
            FieldCommands::Add { label } => match file.session.create_field(&label) {
                Some(key) => {
                    println!("{key}");
                    EXIT_SUCCESS
                }
                None => {
                    eprintln!("field label must not be blank");
                    EXIT_USAGE
                }
            },
            FieldCommands::Rm { key } => {
                report(file.session.delete_field(&key), "no such field", EXIT_USAGE)
            }
            FieldCommands::Label { key, label } => report(
                file.session.rename_field_label(&key, &label),
                "no such field (or blank label)",
                EXIT_USAGE,
            ),
            FieldCommands::List { json } => {
                field_list(&file.session, json);
                EXIT_SUCCESS
            }
        }),
        Commands::Ref { command } => with_session(&cli.session, &settings, |file| match command {
            RefCommands::Add { field, text } => report(
                file.session.add_reference(&field, &text),
                "reference not added (unknown field, blank, or duplicate)",
                EXIT_USAGE,
            ),
            RefCommands::Rm { field, index } => report(
                file.session.remove_reference(&field, index),
                "reference not removed (unknown field or index)",
                EXIT_USAGE,
            ),
            RefCommands::Rename { field, index, text } => report(
                file.session.rename_reference(&field, index, &text),
                "reference not renamed (unknown field, index, or blank text)",
                EXIT_USAGE,
            ),
        }),
        Commands::Replace {
            field,
            reference,
            value,
        } => with_session(&cli.session, &settings, |file| {
            file.session.set_replacement(&field, &reference, &value);
            EXIT_SUCCESS
        }),
        Commands::Select { command } => with_session(&cli.session, &settings, |file| {
            match command {
                SelectCommands::Field { key } => {
                    let on = file.session.toggle_field_selection(&key);
                    println!("{}", if on { "selected" } else { "deselected" });
                }
                SelectCommands::Ref { field, reference } => {
                    let on = file.session.toggle_reference_selection(&field, &reference);
                    println!("{}", if on { "selected" } else { "deselected" });
                }
                SelectCommands::All { state } => {
                    file.session.set_highlight_all(state == "on");
                }
            }
            EXIT_SUCCESS
        }),
        Commands::Table { command } => with_session(&cli.session, &settings, |file| match command {
            TableCommands::Edit {
                index,
                row,
                col,
                value,
            } => report(
                file.session.record_table_edit(index, row, col, &value),
                "no such table cell (or value unchanged)",
                EXIT_USAGE,
            ),
            TableCommands::View { index } => match file.session.table(index) {
                Some(table) => {
                    let mode = file.session.table_view(index);
                    for row in table.view(file.session.table_edits(), mode) {
                        println!("{}", row.join("\t"));
                    }
                    EXIT_SUCCESS
                }
                None => {
                    eprintln!("no such table: {index}");
                    EXIT_USAGE
                }
            },
            TableCommands::Toggle { index } => {
                let mode = file.session.toggle_table_view(index);
                println!(
                    "{}",
                    match mode {
                        TableView::Original => "original",
                        TableView::Edited => "edited",
                    }
                );
                EXIT_SUCCESS
            }
            TableCommands::List => {
                for table in file.session.tables() {
                    let edits = file
                        .session
                        .table_edits()
                        .iter()
                        .filter(|e| e.table_index == table.index)
                        .count();
                    println!("#{}\t{}\t{} edit(s)", table.index, table.source, edits);
                }
                EXIT_SUCCESS
            }
        }),
        Commands::Undo { scope } => with_session(&cli.session, &settings, |file| {
            apply_history(&mut file.session, &scope, true)
        }),
        Commands::Redo { scope } => with_session(&cli.session, &settings, |file| {
            apply_history(&mut file.session, &scope, false)
        }),
        Commands::Ingest {
            file: input,
            url,
            instructions,
        } => with_session(&cli.session, &settings, |file| {
            ingest(file, input.as_deref(), url.as_deref(), instructions.as_deref(), &settings)
        }),
        Commands::Payload { pretty } => with_session(&cli.session, &settings, |file| {
            let request = file.session.generate_request();
            let json = if pretty {
                serde_json::to_string_pretty(&request)
            } else {
                serde_json::to_string(&request)
            };
            match json {
                Ok(json) => {
                    println!("{json}");
                    EXIT_SUCCESS
                }
                Err(e) => {
                    eprintln!("cannot serialize payload: {e}");
                    EXIT_ERROR
                }
            }
        }),
        Commands::Generate { url, output } => with_session(&cli.session, &settings, |file| {
            let base = url.unwrap_or_else(|| settings.service_url.clone());
            let client = ServiceClient::new(base);
            match client.generate(&file.session.generate_request()) {
                Ok(bytes) => match fs::write(&output, bytes) {
                    Ok(()) => {
                        println!("wrote {}", output.display());
                        EXIT_SUCCESS
                    }
                    Err(e) => {
                        eprintln!("cannot write {}: {}", output.display(), e);
                        EXIT_ERROR
                    }
                },
                Err(e) => {
                    eprintln!("generation failed: {e}");
                    EXIT_ERROR
                }
            }
        }),
    }
}

/// Load the session file, run the command, save back on success paths.
/// The session file is written even when the command was a usage-level
/// no-op — harmless, and it keeps saved_at honest.
fn with_session<F>(path: &Path, settings: &Settings, f: F) -> u8
where
    F: FnOnce(&mut SessionFile) -> u8,
{
    let mut file = match SessionFile::load_or_new(path, settings.history_limit) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("{e}");
            return EXIT_ERROR;
        }
    };
    let code = f(&mut file);
    if code == EXIT_ERROR {
        return code;
    }
    if let Err(e) = file.save(path) {
        eprintln!("{e}");
        return EXIT_ERROR;
    }
    code
}

fn report(changed: bool, message: &str, fail_code: u8) -> u8 {
    if changed {
        EXIT_SUCCESS
    } else {
        eprintln!("{message}");
        fail_code
    }
}

fn scan(path: &Path, needle: &str, json: bool) -> u8 {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {}: {}", path.display(), e);
            return EXIT_ERROR;
        }
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut spans = dedupe(locate(&text, needle, &name));
    spans.sort_by_key(|s| s.char_start);

    if json {
        match serde_json::to_string(&spans) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("cannot serialize spans: {e}");
                return EXIT_ERROR;
            }
        }
    } else {
        for span in &spans {
            print_span(span);
        }
        eprintln!("{} occurrence(s)", spans.len());
    }
    EXIT_SUCCESS
}

fn print_span(span: &Span) {
    println!(
        "line {}, chars {}-{} (abs {}-{}): {}",
        span.line_index + 1,
        span.line_char_start,
        span.line_char_end,
        span.char_start,
        span.char_end,
        span.context_line
    );
}

fn doc_add(file: &mut SessionFile, path: &Path, name: Option<String>) -> u8 {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("cannot read {}: {}", path.display(), e);
            return EXIT_ERROR;
        }
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });

    let hash = blake3::hash(&bytes).to_hex().to_string();
    let doc = Document::new(name.clone(), text);
    file.session.add_document(doc);
    file.record_source(&name, path.to_path_buf(), hash);
    println!("loaded '{name}'");
    EXIT_SUCCESS
}

fn field_list(session: &Session, json: bool) {
    if json {
        let fields: Vec<serde_json::Value> = session
            .registry()
            .fields()
            .map(|f| {
                serde_json::json!({
                    "key": f.key,
                    "label": f.label,
                    "references": f.references,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(fields));
    } else {
        for field in session.registry().fields() {
            println!("{} ({})", field.key, field.label);
            for (i, reference) in field.references.iter().enumerate() {
                let replacement = field.replacement_for(reference).unwrap_or(reference);
                if replacement == reference {
                    println!("  [{i}] {reference}");
                } else {
                    println!("  [{i}] {reference} -> {replacement}");
                }
            }
        }
    }
}

fn apply_history(session: &mut Session, scope: &str, undo: bool) -> u8 {
    let applied = match scope {
        "fields" => {
            if undo {
                session.undo_fields()
            } else {
                session.redo_fields()
            }
        }
        "tables" => {
            if undo {
                session.undo_tables()
            } else {
                session.redo_tables()
            }
        }
        other => match other.strip_prefix("field:") {
            Some(key) => {
                if undo {
                    session.undo_field(key)
                } else {
                    session.redo_field(key)
                }
            }
            None => {
                eprintln!("unknown scope '{other}' (expected fields, tables, or field:<key>)");
                return EXIT_USAGE;
            }
        },
    };
    // An empty stack is a no-op, not an error.
    println!(
        "{}",
        match (applied, undo) {
            (true, true) => "undone",
            (true, false) => "redone",
            (false, true) => "nothing to undo",
            (false, false) => "nothing to redo",
        }
    );
    EXIT_SUCCESS
}

fn ingest(
    file: &mut SessionFile,
    input: Option<&Path>,
    url: Option<&str>,
    instructions: Option<&str>,
    settings: &Settings,
) -> u8 {
    let (result, source) = if let Some(base) = url {
        let instructions = instructions.unwrap_or(&settings.default_instructions);
        let request = file.session.discovery_request(Some(instructions));
        let client = ServiceClient::new(base);
        match client.discover(&request) {
            Ok(result) => (result, "Schema Discovery".to_string()),
            Err(e) => {
                eprintln!("discovery failed: {e}");
                return EXIT_ERROR;
            }
        }
    } else if let Some(path) = input {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                eprintln!("cannot read {}: {}", path.display(), e);
                return EXIT_ERROR;
            }
        };
        match serde_json::from_str::<DiscoveryResult>(&contents) {
            Ok(result) => (result, path.display().to_string()),
            Err(e) => {
                eprintln!("cannot parse {}: {}", path.display(), e);
                return EXIT_ERROR;
            }
        }
    } else {
        eprintln!("ingest needs a file or --url");
        return EXIT_USAGE;
    };

    if let Some(warning) = &result.warning {
        log::warn!("discovery warning: {warning}");
    }

    let ticket = file.session.begin_discovery();
    match file.session.ingest(ticket, &result, &source) {
        Ok(()) => {
            println!(
                "ingested {} field(s), {} table(s)",
                result.schema.document_fields.fields.len(),
                result.tables.len()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            EXIT_ERROR
        }
    }
}

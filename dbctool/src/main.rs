use clap::{Parser, Subcommand};
use colored::Colorize;
use dbcfile::{Database, DbcError};
use std::path::{Path, PathBuf};
use std::process;

const EXIT_OK: i32 = 0;
const EXIT_FINDINGS: i32 = 1;
const EXIT_ERROR: i32 = 2;

/// dbctool: inspect CAN database (dbc) files
///
/// Export, check and reformat dbc files.
#[derive(Parser)]
#[command(name = "dbctool", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content of a dbc file as JSON
    Json {
        /// Path to .dbc file
        file: PathBuf,
        /// Indent the output
        #[arg(long)]
        pretty: bool,
        /// Treat parser warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Check the consistency of a dbc file
    Check {
        /// Path to .dbc file
        file: PathBuf,
        /// Treat parser warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Write a dbc file in standard layout
    Fmt {
        /// Path to .dbc file
        file: PathBuf,
        /// Output file; the result is printed if this is not given
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Treat parser warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Show a summary of a dbc file
    Info {
        /// Path to .dbc file
        file: PathBuf,
        /// Treat parser warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Json {
            file,
            pretty,
            strict,
        } => run_json(&file, pretty, strict),
        Commands::Check { file, strict } => run_check(&file, strict),
        Commands::Fmt {
            file,
            output,
            strict,
        } => run_fmt(&file, output.as_deref(), strict),
        Commands::Info { file, strict } => run_info(&file, strict),
    };

    process::exit(exit_code);
}

// load the file and print all warnings; None if loading failed
fn load_database(file: &Path, strict: bool) -> Option<Database> {
    match dbcfile::load(file, strict) {
        Ok((database, log_msgs)) => {
            for msg in &log_msgs {
                print_warning(msg);
            }
            Some(database)
        }
        Err(error) => {
            eprintln!("{} {}", "error:".red().bold(), error);
            None
        }
    }
}

fn print_warning(msg: &DbcError) {
    match msg {
        // parser messages already start with file and line
        DbcError::ParserError { parser_error } => {
            eprintln!("{} {}", "warning:".yellow().bold(), parser_error);
        }
        other => eprintln!("{} {}", "warning:".yellow().bold(), other),
    }
}

fn run_json(file: &Path, pretty: bool, strict: bool) -> i32 {
    let Some(database) = load_database(file, strict) else {
        return EXIT_ERROR;
    };
    match database.to_json_string(pretty) {
        Ok(text) => {
            println!("{text}");
            EXIT_OK
        }
        Err(error) => {
            eprintln!("{} {}", "error:".red().bold(), error);
            EXIT_ERROR
        }
    }
}

fn run_check(file: &Path, strict: bool) -> i32 {
    let Some(database) = load_database(file, strict) else {
        return EXIT_ERROR;
    };
    let findings = database.check();
    if findings.is_empty() {
        println!("{} {}", file.display(), "ok".green());
        EXIT_OK
    } else {
        for finding in &findings {
            println!("{finding}");
        }
        println!(
            "{} {}",
            file.display(),
            format!("{} problem(s) found", findings.len()).red()
        );
        EXIT_FINDINGS
    }
}

fn run_fmt(file: &Path, output: Option<&Path>, strict: bool) -> i32 {
    let Some(database) = load_database(file, strict) else {
        return EXIT_ERROR;
    };
    match output {
        Some(outfile) => match database.write(outfile) {
            Ok(()) => EXIT_OK,
            Err(error) => {
                eprintln!("{} {}", "error:".red().bold(), error);
                EXIT_ERROR
            }
        },
        None => {
            print!("{}", database.write_to_string());
            EXIT_OK
        }
    }
}

fn run_info(file: &Path, strict: bool) -> i32 {
    let Some(database) = load_database(file, strict) else {
        return EXIT_ERROR;
    };
    let signal_count: usize = database
        .messages
        .iter()
        .map(|message| message.signals.len())
        .sum();

    println!("file:     {}", file.display());
    println!("version:  {}", database.version);
    println!("nodes:    {}", database.ecus.join(" "));
    println!("messages: {}", database.messages.len());
    println!("signals:  {signal_count}");
    for message in &database.messages {
        println!(
            "  {:>8}  {:<32} dlc {:<2} {:>3} signal(s)  {}",
            format!("{:03X}", message.can_id),
            message.name,
            message.dlc,
            message.signals.len(),
            message.sender
        );
    }
    EXIT_OK
}

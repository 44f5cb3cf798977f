use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use tinybase::executor::{format, ExecutionOutcome, Executor};
use tinybase::planner::parser::SqlParser;

const DATA_DIR: &str = "data";
const PROMPT: &str = "tinysql> ";
const CONTINUATION_PROMPT: &str = "      -> ";

fn main() -> rustyline::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut executor = match Executor::new(DATA_DIR) {
        Ok(executor) => executor,
        Err(err) => {
            eprintln!("Failed to open database: {}", err);
            std::process::exit(1);
        }
    };
    let parser = SqlParser::new();

    let args: Vec<String> = std::env::args().collect();
    if args.len() == 2 {
        run_script(&mut executor, &parser, &args[1]);
        return Ok(());
    }

    run_repl(&mut executor, &parser)
}

/// Parse and execute one statement. Errors go to stderr and the shell keeps
/// going; only EXIT ends the session.
fn dispatch(executor: &mut Executor, parser: &SqlParser, sql: &str) -> bool {
    let command = match parser.parse(sql) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{}", err);
            return false;
        }
    };

    match executor.execute(command) {
        Ok(ExecutionOutcome::Rows { columns, rows }) => {
            println!("{}", format::render_table(&columns, &rows));
        }
        Ok(ExecutionOutcome::Message(message)) => println!("{}", message),
        Ok(ExecutionOutcome::Exit) => {
            println!("Bye!");
            return true;
        }
        Err(err) => eprintln!("{}", err),
    }
    false
}

/// One argument means a script: run it silently, statement by statement.
fn run_script(executor: &mut Executor, parser: &SqlParser, path: &str) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Failed to open file {}: {}", path, err);
            std::process::exit(1);
        }
    };

    for statement in content.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        if dispatch(executor, parser, statement) {
            break;
        }
    }
}

fn run_repl(executor: &mut Executor, parser: &SqlParser) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut buffer = String::new();

    'repl: loop {
        let prompt = if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };

        match rl.readline(prompt) {
            Ok(line) => {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(line.trim_end());

                // run every complete statement accumulated so far
                while let Some(position) = buffer.find(';') {
                    let statement: String = buffer.drain(..=position).collect();
                    let statement = statement.trim_end_matches(';').trim().to_string();
                    if statement.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(&statement)?;
                    if dispatch(executor, parser, &statement) {
                        break 'repl;
                    }
                }
                buffer = buffer.trim_start().to_string();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

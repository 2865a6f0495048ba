//!
//! teamgate console
//! ----------------
//! Terminal admin console for the team/user management backend. Runs one command with
//! `--command`, otherwise starts an interactive interpreter.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use teamgate::cli::{Console, Flow, TerminalPresenter};
use teamgate::config::ConsoleConfig;
use teamgate::error::AppResult;
use teamgate::gateway::HttpGateway;
use teamgate::identity::{FileSessionStore, SessionContext};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--session-file <path>] [--log <filter>] [--timeout <secs>]\n  {program} --user <u> --password <p>      # log in, then start the interpreter\n  {program} -c \"<command>\"                # run one console command and exit\n\nFlags:\n  --api <url>              Authority base URL (env TEAMGATE_API_URL, default http://localhost:5000)\n  --session-file <path>    Where the session survives restarts (env TEAMGATE_SESSION_FILE)\n  --log <filter>           Log filter when RUST_LOG is unset (env TEAMGATE_LOG, default warn)\n  --timeout <secs>         Per-request timeout (env TEAMGATE_TIMEOUT_SECS)\n  --user <u>               Log in as this user on start\n  --password <p>           Password for --user\n  -c, --command <cmd>      Run a single command\n  -h, --help               Show this help\n\n{help}",
        help = teamgate::cli::dashboard::HELP
    );
}

struct Args {
    user: Option<String>,
    password: Option<String>,
    command: Option<String>,
}

fn parse_args(program: &str, rest: &[String]) -> Result<Args> {
    let mut out = Args { user: None, password: None, command: None };
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--user" | "--password" | "-c" | "--command" => {
                let value = rest.get(i + 1).cloned().with_context(|| format!("{} requires a value", rest[i]))?;
                match rest[i].as_str() {
                    "--user" => out.user = Some(value),
                    "--password" => out.password = Some(value),
                    _ => out.command = Some(value),
                }
                i += 2;
            }
            "-h" | "--help" => {
                print_usage(program);
                std::process::exit(0);
            }
            other => {
                print_usage(program);
                anyhow::bail!("unknown argument '{}'", other);
            }
        }
    }
    Ok(out)
}

fn main() -> Result<()> {
    let argv: Vec<String> = env::args().collect();
    let program = argv.first().cloned().unwrap_or_else(|| "teamgate".to_string());

    let mut config = ConsoleConfig::from_env().context("reading environment")?;
    let rest = config.apply_args(&argv[1..]).context("parsing flags")?;
    let args = parse_args(&program, &rest)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    info!(target: "startup", api = %config.api_url, session_file = %config.session_file.display(), "teamgate starting");

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().context("building runtime")?;

    let context = SessionContext::init(Arc::new(FileSessionStore::new(config.session_file.clone())));
    let gateway = Arc::new(HttpGateway::new(&config, context.clone()).context("building HTTP client")?);
    let presenter = Arc::new(TerminalPresenter::new());
    let console = Console::new(gateway, context, presenter);
    console.resume();

    if let (Some(user), Some(password)) = (args.user.as_deref(), args.password.as_deref()) {
        report(rt.block_on(console.login(user, password)));
    } else if args.user.is_some() || args.password.is_some() {
        eprintln!("--user and --password must be given together; starting without logging in");
    }

    if let Some(command) = args.command {
        let code = if run_line(&rt, &console, &command) == Outcome::Failed { 1 } else { 0 };
        std::process::exit(code);
    }
    run_repl(&rt, &console)
}

#[derive(PartialEq)]
enum Outcome {
    Done,
    Failed,
    Quit,
}

/// Execute one line and print what it produced.
fn run_line(rt: &tokio::runtime::Runtime, console: &Console, line: &str) -> Outcome {
    report(rt.block_on(console.execute(line)))
}

fn report(result: AppResult<Flow>) -> Outcome {
    match result {
        Ok(Flow::Print(text)) => {
            println!("{}", text);
            Outcome::Done
        }
        Ok(Flow::Quiet) => Outcome::Done,
        Ok(Flow::Quit) => Outcome::Quit,
        Err(e) => {
            eprintln!("error: {}", e.message());
            Outcome::Failed
        }
    }
}

fn run_repl(rt: &tokio::runtime::Runtime, console: &Console) -> Result<()> {
    let mut editor = DefaultEditor::new().context("starting line editor")?;
    println!("teamgate console. Type 'help' for commands.");
    loop {
        match editor.readline(&console.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // Keep passwords out of the history.
                if !line.starts_with("login ") {
                    let _ = editor.add_history_entry(line);
                }
                if run_line(rt, console, line) == Outcome::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        }
    }
    Ok(())
}

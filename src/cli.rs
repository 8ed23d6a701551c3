// ─── Command Line ───
// Argument parsing, the terminal profile selector and the console status
// reporter.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use crate::core::launch::{LaunchOptions, ProfileSelector, Selection};
use crate::core::profile::Registry;
use crate::core::state::AppState;
use crate::core::status::{StatusHandle, StatusReporter};
use crate::core::tasks::{self, RunOptions};

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "MicroDrop profile manager and launcher")]
pub struct Cli {
    /// Path to the profiles list (default: `<config>/MicroDrop/<major>.0/profiles.json`).
    #[arg(short = 'f', long)]
    pub profiles_path: Option<PathBuf>,
    /// Launch the most recently used profile.
    #[arg(long)]
    pub default: bool,
    /// Show the profile selector even when there is a single profile.
    #[arg(long)]
    pub no_auto: bool,
    /// Do not check for package upgrades.
    #[arg(long)]
    pub no_upgrade: bool,
    /// Log filter, e.g. `debug` or `launcher_lib=trace` (overrides RUST_LOG).
    #[arg(short, long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            launch: LaunchOptions {
                launch_default: self.default,
                no_auto: self.no_auto,
            },
            no_upgrade: self.no_upgrade,
        }
    }
}

/// Prints status lines on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn status(&self, message: &str) {
        println!("{}", message);
    }
}

const MENU_HELP: &str = "\
  <n>          launch profile <n>
  n <dir>      create a new profile in <dir>
  i <dir>      import an existing profile from <dir>
  r <n>        remove profile <n> from the list
  d <n>        remove profile <n> and delete its data
  q            quit";

/// Line-based profile selector.
pub struct PromptSelector {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

impl PromptSelector {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self { input, output }
    }

    pub fn stdio() -> Self {
        Self::new(
            Box::new(BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let _ = write!(self.output, "{}", prompt);
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn show(&mut self, registry: &Registry) {
        let _ = writeln!(self.output, "\nProfiles:");
        for (i, record) in registry.records().iter().enumerate() {
            let version = record
                .major_version
                .map(|m| format!("v{}", m))
                .unwrap_or_else(|| "-".into());
            let _ = writeln!(
                self.output,
                "  [{}] {} ({}, last used {})",
                i + 1,
                record.path.display(),
                version,
                record.last_used_label()
            );
        }
        let _ = writeln!(self.output, "{}", MENU_HELP);
    }
}

/// Interpret one line of selector input.
pub fn parse_selection(line: &str, registry: &Registry) -> Result<Selection, String> {
    let profile_at = |raw: &str| -> Result<PathBuf, String> {
        let index: usize = raw
            .trim()
            .parse()
            .map_err(|_| format!("`{}` is not a profile number", raw.trim()))?;
        index
            .checked_sub(1)
            .and_then(|i| registry.records().get(i))
            .map(|r| r.path.clone())
            .ok_or_else(|| format!("there is no profile {}", index))
    };
    let directory = |raw: &str| -> Result<PathBuf, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            Err("a directory is required".into())
        } else {
            Ok(PathBuf::from(raw))
        }
    };

    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match command {
        "q" | "quit" => Ok(Selection::Quit),
        "n" | "new" => Ok(Selection::Create {
            path: directory(rest)?,
            overwrite: false,
        }),
        "i" | "import" => Ok(Selection::Import(directory(rest)?)),
        "r" | "remove" => Ok(Selection::Remove {
            path: profile_at(rest)?,
            delete_data: false,
        }),
        "d" | "delete" => Ok(Selection::Remove {
            path: profile_at(rest)?,
            delete_data: true,
        }),
        "" => Err("enter a command".into()),
        _ => profile_at(command).map(Selection::Launch),
    }
}

impl ProfileSelector for PromptSelector {
    fn select(&mut self, registry: &Registry) -> Selection {
        self.show(registry);
        loop {
            let Some(line) = self.read_line("> ") else {
                return Selection::Quit;
            };
            match parse_selection(&line, registry) {
                Ok(selection) => return selection,
                Err(message) => {
                    let _ = writeln!(self.output, "{}", message);
                }
            }
        }
    }

    fn confirm(&mut self, question: &str) -> bool {
        matches!(
            self.read_line(&format!("{} [y/N] ", question)).as_deref(),
            Some("y") | Some("Y") | Some("yes")
        )
    }

    fn report_error(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }
}

/// Run the launcher and return the process exit code.
pub async fn execute(cli: Cli) -> i32 {
    let status: StatusHandle = Arc::new(ConsoleReporter);
    let state = match AppState::initialize(cli.profiles_path.clone(), status) {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("error: {}", e);
            return 1;
        }
    };
    info!("Profiles list: {:?}", state.paths.profiles);

    let summary = tasks::run(&state, cli.run_options(), Box::new(PromptSelector::stdio())).await;
    info!(
        "Run finished: units {:?}, return code {:?}",
        summary.dispatched, summary.return_code
    );
    summary.return_code.unwrap_or(0)
}

//! REPL (Read-Eval-Print Loop)

use crate::error::{CompileError, render_error};
use crate::interp::{InterpreterConfig, Session, stdout_sink};
use crate::parser::is_incomplete;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = ". ";
const HISTORY_FILE: &str = ".cppi_history";
const SOURCE_NAME: &str = "<repl>";

/// Result of feeding one line to the REPL
#[derive(Debug, PartialEq, Eq)]
pub enum Feed {
    /// Input so far is an unfinished statement
    Pending,
    /// Evaluated to a value worth echoing
    Echo(String),
    /// Evaluated without a value
    Done,
    /// Rendered error report
    Failed(String),
}

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
    pending: String,
}

impl Repl {
    /// Create a new REPL
    pub fn new(config: InterpreterConfig) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let session = match Session::new(stdout_sink(), config) {
            Ok(session) => session,
            Err(err) => return Err(ReadlineError::Io(std::io::Error::other(err.to_string()))),
        };
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session,
            history_path,
            pending: String::new(),
        };
        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }
        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("cppi {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            let prompt = if self.pending.is_empty() {
                PROMPT
            } else {
                CONTINUATION_PROMPT
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() && self.pending.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(trimmed);

                    if self.pending.is_empty() && trimmed.starts_with(':') {
                        if self.handle_command(trimmed) {
                            break;
                        }
                        continue;
                    }

                    match self.feed(&line) {
                        Feed::Echo(value) => println!("{value}"),
                        Feed::Failed(report) => eprint!("{report}"),
                        Feed::Pending | Feed::Done => {}
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.pending.clear();
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }
        Ok(())
    }

    /// Handle REPL commands (starting with :)
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":globals" => {
                let mut names = self.session.program().globals().borrow().local_names();
                names.sort();
                for name in names {
                    println!("  {name}");
                }
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :clear          Clear the screen");
        println!("  :globals        List names defined so far");
        println!();
        println!("You can enter:");
        println!("  - Expressions: 1 + 2, x * 3");
        println!("  - Declarations: int x = 4;  struct P {{ int a; }};");
        println!("  - Functions: int twice(int n) {{ return n * 2; }}");
        println!("  - Statements: for (int i = 0; i < 3; i++) print(i);");
        println!();
        println!("Built-in functions:");
        println!("  print(x)        Print int, long, bool, char or string");
        println!("  print_int(x), print_long(x), print_bool(x), print_char(x), print_string(x)");
    }

    /// Add a line to the pending input and evaluate it once complete
    pub fn feed(&mut self, line: &str) -> Feed {
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);
        let source = std::mem::take(&mut self.pending);

        match self.session.eval(&source) {
            Ok(Some(value)) => Feed::Echo(value.borrow().string_rep()),
            Ok(None) => Feed::Done,
            Err(err) if incomplete(&err, &source) => {
                self.pending = source;
                Feed::Pending
            }
            Err(err) => {
                tracing::debug!(error = %err, "input rejected");
                Feed::Failed(render_error(SOURCE_NAME, &source, &err))
            }
        }
    }
}

fn incomplete(err: &CompileError, source: &str) -> bool {
    is_incomplete(err, source.trim_end())
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

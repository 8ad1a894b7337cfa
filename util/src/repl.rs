use std::path::PathBuf;

use rustyline::{error::ReadlineError, Editor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Readline(ReadlineError),
    #[error("Eval failed: {0:?}")]
    EvalError(E),
}

pub trait Repl {
    type Error: std::fmt::Debug;

    fn history(&self) -> Option<PathBuf> {
        None
    }

    /// Incomplete input keeps reading on a continuation prompt.
    fn is_complete(&self, _input: &str) -> bool {
        true
    }

    fn evaluate(&mut self, input: String) -> Result<(), Self::Error>;
}

pub fn start_repl<R: Repl>(mut repl: R) -> Result<(), Error<R::Error>> {
    let mut editor = Editor::<()>::new();
    let history = repl.history();
    if let Some(history) = &history {
        editor.load_history(history).ok();
    }
    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { ">> " } else { ".. " };
        match editor.readline(prompt) {
            Ok(line) => {
                if !pending.is_empty() {
                    pending.push('\n');
                }
                pending.push_str(&line);
                if !repl.is_complete(&pending) {
                    continue;
                }
                let input = std::mem::take(&mut pending);
                editor.add_history_entry(input.as_str());
                repl.evaluate(input).map_err(Error::EvalError)?;
                if let Some(history) = &history {
                    editor.save_history(history).map_err(Error::Readline)?;
                }
            }
            // ^C drops a half-typed entry before it ends the session
            Err(ReadlineError::Interrupted) if !pending.is_empty() => pending.clear(),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Bye!");
                break Ok(());
            }
            Err(e) => break Err(Error::Readline(e)),
        }
    }
}

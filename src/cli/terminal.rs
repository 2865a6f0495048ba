use std::io::{self, BufRead, BufReader, Write};

use parking_lot::Mutex;

use crate::identity::Route;
use crate::presenter::Presenter;

/// Presenter for an interactive terminal: notices and routes go to stdout and every
/// confirmation waits for a y/N answer on the input. Anything but an explicit yes, end of
/// input included, declines.
pub struct TerminalPresenter {
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::reading(BufReader::new(io::stdin()))
    }

    pub(crate) fn reading(input: impl BufRead + Send + 'static) -> Self {
        Self { input: Mutex::new(Box::new(input)) }
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for TerminalPresenter {
    fn notify(&self, message: &str) {
        println!("! {}", message);
    }

    fn navigate(&self, route: Route) {
        println!("-> {}", route);
    }

    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        match self.input.lock().read_line(&mut answer) {
            Ok(0) | Err(_) => {
                println!();
                false
            }
            Ok(_) => is_yes(&answer),
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

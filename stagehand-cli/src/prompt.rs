//! Yes/no prompt on stdin.

use std::io::{BufRead, Write};

use stagehand_release::Confirm;

/// Asks on stdout, reads one line from stdin.
///
/// An empty answer accepts; any answer containing `n` or `N` declines.
/// End of input declines.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Confirm for StdinPrompt {
    fn confirm(&mut self, question: &str, details: &[String]) -> bool {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in details {
            let _ = writeln!(out, "  {line}");
        }
        if !details.is_empty() {
            let _ = writeln!(out);
        }
        let _ = write!(out, "{question} [Y/n] ");
        let _ = out.flush();
        drop(out);

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) => {
                println!();
                false
            }
            Ok(_) => accepts(&answer),
            Err(err) => {
                tracing::warn!("cannot read answer: {err}");
                false
            }
        }
    }
}

/// Decision rule for a typed answer.
pub fn accepts(answer: &str) -> bool {
    !answer.contains(['n', 'N'])
}

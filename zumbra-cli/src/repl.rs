//! Interactive read-eval-print loop backed by rustyline.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use zumbra_vm::VmConfig;

use crate::session::Session;

pub const PROMPT: &str = ">> ";

/// Read lines until end of input, evaluating each in one shared session
/// and printing the value of its last expression.
pub fn start(config: VmConfig) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut session = Session::new(config);

    println!("Zumbra {}. Ctrl-D to exit.", env!("CARGO_PKG_VERSION"));
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str())?;
                match session.eval(&line) {
                    Ok(value) => println!("{value}"),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

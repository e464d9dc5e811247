//! Text output of VM programs.
use std::fmt::{self, Write as FmtWrite};

use super::ir::VmCommand;

/// Renders VM commands as text, one instruction per line.
///
/// Labels and function headers start at the beginning of the line,
/// everything else is indented. Indentation is only for readability,
/// the downstream translator ignores it.
pub struct VmWriter<W> {
    out: W,
}

impl<W: FmtWrite> VmWriter<W> {
    pub const INDENT: &'static str = "  ";

    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write a single instruction to the underlying writer.
    pub fn write(&mut self, command: &VmCommand) -> fmt::Result {
        match command {
            VmCommand::Label(_) | VmCommand::Function(_, _) => writeln!(self.out, "{command}"),
            _ => writeln!(self.out, "{}{command}", Self::INDENT),
        }
    }

    pub fn write_all<'a>(&mut self, commands: impl IntoIterator<Item = &'a VmCommand>) -> fmt::Result {
        for command in commands {
            self.write(command)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render a whole program to a string.
pub fn render(commands: &[VmCommand]) -> Result<String, fmt::Error> {
    let mut writer = VmWriter::new(String::new());
    writer.write_all(commands)?;
    Ok(writer.into_inner())
}

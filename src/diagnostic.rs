// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;

use clap::ColorChoice;
use codespan_reporting::diagnostic::{
    Diagnostic as CodespanDiagnostic, Label as CodespanLabel, LabelStyle, Severity,
};
use codespan_reporting::files::{Error as FilesError, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, Color, ColorSpec, WriteColor};
use log::warn;
use pest::iterators::Pair;
use pest::RuleType;

use crate::automaton::Loc;
use crate::errors::EncodingError;

/// Severity of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

/// A label representing a part of the source code
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    message: Option<String>,
    range: (usize, usize),
}

impl Label {
    fn to_codespan_label(&self, fileid: usize) -> CodespanLabel<usize> {
        CodespanLabel::new(LabelStyle::Primary, fileid, self.range.0..self.range.1)
            .with_message(self.message.clone().unwrap_or_default())
    }
}

/// Diagnostic of a particular part of an automata file
struct Diagnostic {
    title: String,
    message: String,
    level: Level,
    location: Option<(usize, Label)>,
}

impl Diagnostic {
    fn emit(&self, buffer: &mut Buffer, files: &SimpleFiles<String, String>) -> Result<(), FilesError> {
        if let Some((fileid, label)) = &self.location {
            let severity = match self.level {
                Level::Error => Severity::Error,
                Level::Warning => Severity::Warning,
            };

            let diagnostic = CodespanDiagnostic::new(severity)
                .with_message(&self.message)
                .with_labels(vec![label.to_codespan_label(*fileid)]);

            let config = term::Config::default();
            term::emit(buffer, &config, files, &diagnostic)?;
        } else {
            let color = match self.level {
                Level::Error => Color::Red,
                Level::Warning => Color::Yellow,
            };

            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
            write!(buffer, "{}", self.title)?;
            buffer.set_color(&ColorSpec::new())?;
            writeln!(buffer, ": {}", self.message)?;
        }
        Ok(())
    }
}

pub struct DiagnosticHandler {
    files: SimpleFiles<String, String>,
    error_string: String,
    /// `color_choice` indicates whether to emit error messages w/ ANSI colors
    color_choice: ColorChoice,
}

impl Default for DiagnosticHandler {
    /// Default `DiagnosticHandler` does not emit colored error messages
    fn default() -> Self {
        Self::new(ColorChoice::Never)
    }
}

impl DiagnosticHandler {
    pub fn new(color_choice: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            error_string: String::new(),
            color_choice,
        }
    }

    /// Creates a buffer for error diagnostics
    /// (different buffers are created based on whether we want colors or not)
    fn create_buffer(&self) -> Buffer {
        if self.color_choice == ColorChoice::Never {
            Buffer::no_color()
        } else {
            Buffer::ansi()
        }
    }

    pub fn add_file(&mut self, name: String, content: String) -> usize {
        self.files.add(name, content)
    }

    /// Everything emitted so far, in emission order
    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        let mut buffer = self.create_buffer();
        if let Err(e) = diagnostic.emit(&mut buffer, &self.files) {
            warn!("could not render diagnostic `{}`: {e}", diagnostic.message);
            return;
        }
        let error_msg = String::from_utf8_lossy(buffer.as_slice());
        self.error_string.push_str(&error_msg);
        print!("{}", error_msg);
    }

    fn located(message: &str, level: Level, (start, end, fileid): Loc) -> Diagnostic {
        Diagnostic {
            title: format!("{:?} in file {}", level, fileid),
            message: message.to_string(),
            level,
            location: Some((
                fileid,
                Label {
                    message: Some(message.to_string()),
                    range: (start, end),
                },
            )),
        }
    }

    /// Parametric over any pest `RuleType`, so every grammar can report
    /// against the pair that failed.
    pub fn emit_diagnostic_parsing<R: RuleType>(
        &mut self,
        message: &str,
        fileid: usize,
        pair: &Pair<'_, R>,
        level: Level,
    ) {
        let span = pair.as_span();
        self.emit(Self::located(message, level, (span.start(), span.end(), fileid)));
    }

    pub fn emit_diagnostic_lexing(
        &mut self,
        message: &str,
        fileid: usize,
        start: usize,
        end: usize,
        level: Level,
    ) {
        self.emit(Self::located(message, level, (start, end, fileid)));
    }

    pub fn emit_general_message(&mut self, message: &str, level: Level) {
        self.emit(Diagnostic {
            title: format!("{:?}", level),
            message: message.to_string(),
            level,
            location: None,
        });
    }

    /// Reports a validation failure, pointing at `loc` when the automaton
    /// came from a file.
    pub fn emit_encoding_error(&mut self, error: &EncodingError, loc: Option<Loc>) {
        let message = error.to_string();
        match loc {
            Some(loc) => self.emit(Self::located(&message, Level::Error, loc)),
            None => self.emit_general_message(&message, Level::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use strip_ansi_escapes::strip_str;

    use super::*;
    use crate::errors::InvalidKind;

    #[test]
    fn located_diagnostics_point_into_the_file() {
        let mut handler = DiagnosticHandler::new(ColorChoice::Never);
        let file_id = handler.add_file(
            "main.aut".to_string(),
            "constraint 1 {\n  init q;\n}\n".to_string(),
        );
        handler.emit_diagnostic_lexing("undeclared state `q`", file_id, 22, 23, Level::Error);

        let content = strip_str(handler.error_string());
        assert!(content.starts_with("error: undeclared state `q`"));
        assert!(content.contains("main.aut:2:8"));
        assert!(content.contains("init q;"));
    }

    #[test]
    fn general_messages() {
        let mut handler = DiagnosticHandler::default();
        handler.emit_general_message("nothing to do", Level::Warning);
        let err = EncodingError::invalid("7", InvalidKind::EmptyAcceptSet);
        handler.emit_encoding_error(&err, None);
        insta::assert_snapshot!(handler.error_string(), @r"
        Warning: nothing to do
        Error: invalid automaton `7`: automaton has no accept state
        ");
    }
}

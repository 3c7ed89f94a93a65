use std::io::{self, BufRead, Write};

use crossterm::style::{Color, Stylize};
use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    error::Error,
    eval::{EvalConfig, Evaluator},
    lex::{Lexer, TokenKind},
    parse::{Parsed, Parser, ParserConfig},
};

pub const PROMPT: &str = "ħ >>> ";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub parser: ParserConfig,
    pub eval: EvalConfig,
    pub color: bool,
    pub prompt: String,
    /// Name shown in diagnostics; `<input>` when unset.
    pub filename: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            parser: ParserConfig::default(),
            eval: EvalConfig::default(),
            color: false,
            prompt: PROMPT.to_string(),
            filename: None,
        }
    }
}

/// What one expression produced.
#[derive(Debug)]
pub enum Response {
    Value(String),
    Error(Error),
}

#[derive(Debug)]
pub enum Step {
    Quit,
    Continue(Vec<Response>),
}

pub struct Session {
    config: SessionConfig,
    evaluator: Evaluator,
    evaluated: usize,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session {
            evaluator: Evaluator::new(config.eval),
            config,
            evaluated: 0,
        }
    }

    /// Number of expressions evaluated so far, successfully or not.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Handles one line of input. Only a line that is exactly `quit` or
    /// `exit` ends the session; blank lines are ignored; anything else is
    /// parsed and evaluated expression by expression.
    pub fn feed_line(&mut self, line: &str) -> Step {
        let line = line.trim_end_matches(['\n', '\r']);
        if line == "quit" || line == "exit" {
            tracing::debug!(evaluated = self.evaluated, "session ended");
            return Step::Quit;
        }
        if line.trim().is_empty() {
            return Step::Continue(Vec::new());
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            for token in Lexer::new(line).filter(|t| t.token != TokenKind::Whitespace) {
                tracing::debug!("{token}");
            }
        }

        Step::Continue(self.evaluate_all(line))
    }

    fn evaluate_all(&mut self, input: &str) -> Vec<Response> {
        let filename = self.config.filename.as_deref();
        let mut parser = Parser::new(filename, input).with_config(self.config.parser);
        let mut responses = Vec::new();
        loop {
            match parser.parse_expression() {
                Ok(Parsed::Expression(expr)) => {
                    self.evaluated += 1;
                    responses.push(match self.evaluator.evaluate_to_text(&expr) {
                        Ok(text) => Response::Value(text),
                        Err(e) => Response::Error(e.into()),
                    });
                }
                Ok(Parsed::EndOfStatement) => continue,
                Ok(Parsed::EndOfInput) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "parse failed");
                    responses.push(Response::Error(e));
                    parser.skip_statement();
                }
            }
        }
        responses
    }

    /// Reads lines until end of input or `quit`, writing one line per result.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, output: &mut W) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(output, "{}", self.config.prompt)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                if !self.config.prompt.is_empty() {
                    writeln!(output)?;
                }
                return Ok(());
            }

            if !self.respond(&line, output)? {
                return Ok(());
            }
        }
    }

    /// The interactive shell: a line editor with history on the terminal.
    /// Ctrl-C and Ctrl-D leave like `quit`.
    pub fn run_editor<W: Write>(&mut self, output: &mut W) -> Result<(), ReadlineError> {
        let mut editor = DefaultEditor::new()?;
        loop {
            match editor.readline(&self.config.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    if !self.respond(&line, output)? {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    self.write_line(output, "\n Exiting...", Color::Yellow)?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Feeds one line and writes its results. Returns `false` once the
    /// session has ended.
    fn respond<W: Write>(&mut self, line: &str, output: &mut W) -> io::Result<bool> {
        match self.feed_line(line) {
            Step::Quit => {
                self.write_line(output, "\n Exiting...", Color::Yellow)?;
                Ok(false)
            }
            Step::Continue(responses) => {
                for response in responses {
                    match response {
                        Response::Value(text) => self.write_line(output, &text, Color::Green)?,
                        Response::Error(e) => self.write_line(output, &e.to_string(), Color::Red)?,
                    }
                }
                Ok(true)
            }
        }
    }

    fn write_line<W: Write>(&self, output: &mut W, text: &str, color: Color) -> io::Result<()> {
        if self.config.color {
            writeln!(output, "{}", text.with(color))
        } else {
            writeln!(output, "{text}")
        }
    }
}

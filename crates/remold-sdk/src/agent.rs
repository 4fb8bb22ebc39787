use std::io::Write as _;
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::error::AgentError;

/// The text-generation collaborator: given source code and an instruction,
/// return the raw transcript.
pub trait RefactorAgent {
    fn complete(&self, source: &str, instruction: &str) -> Result<String, AgentError>;
}

impl<F> RefactorAgent for F
where
    F: Fn(&str, &str) -> Result<String, AgentError>,
{
    fn complete(&self, source: &str, instruction: &str) -> Result<String, AgentError> {
        self(source, instruction)
    }
}

/// What kind of improvement to ask the agent for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionKind {
    #[default]
    Refactor,
    Optimize,
    Document,
    Style,
    Security,
}

impl SuggestionKind {
    pub const ALL: [Self; 5] = [
        Self::Refactor,
        Self::Optimize,
        Self::Document,
        Self::Style,
        Self::Security,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Refactor => "refactor",
            Self::Optimize => "optimize",
            Self::Document => "document",
            Self::Style => "style",
            Self::Security => "security",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Refactor => "Refactor this code by extracting reusable components into utility modules. Focus on code organization and modularity.",
            Self::Optimize => "Optimize this code for performance, efficiency, and best practices. Suggest improvements for speed, memory usage, and algorithm efficiency.",
            Self::Document => "Add comprehensive documentation to this code. Include doc comments, inline comments, and type annotations to improve readability and maintainability.",
            Self::Style => "Improve the code style and formatting according to the language's conventions. Focus on naming, spacing, and overall code aesthetics.",
            Self::Security => "Review this code for security vulnerabilities and fix them. Focus on input validation, error handling, and secure coding practices.",
        }
    }
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SuggestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown suggestion type '{s}'"))
    }
}

/// Wrap the instruction and source into the request sent to an agent.
pub fn build_request(source: &str, instruction: &str) -> String {
    format!(
        "{instruction}\n\n\
         Return a single ```json fenced block with these keys:\n\
         - \"primary_content\": the improved version of the original file\n\
         - \"backup_content\": the old code to be saved to a separate file\n\
         - \"utility_modules\": object mapping extracted module filenames to their code\n\n\
         Code to improve:\n```\n{source}\n```\n"
    )
}

/// Runs an external command, writes the request to its stdin and reads the
/// transcript from its stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line the way a POSIX shell would for words: single
    /// quotes are literal, double quotes allow `\"` and `\\`, and a backslash
    /// outside quotes escapes the next character. No expansion is done.
    pub fn parse(command_line: &str) -> Result<Self, AgentError> {
        let mut parts = split_words(command_line)?.into_iter();
        let program = parts.next().ok_or(AgentError::NotConfigured)?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

fn invalid(reason: &str) -> AgentError {
    AgentError::InvalidCommand(reason.to_string())
}

fn split_words(line: &str) -> Result<Vec<String>, AgentError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(invalid("unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => word.push(c),
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => return Err(invalid("unterminated double quote")),
                        },
                        Some(c) => word.push(c),
                        None => return Err(invalid("unterminated double quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => word.push(c),
                    None => return Err(invalid("trailing backslash")),
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

impl RefactorAgent for CommandAgent {
    fn complete(&self, source: &str, instruction: &str) -> Result<String, AgentError> {
        tracing::info!(program = %self.program, "invoking agent");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AgentError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let request = build_request(source, instruction);
        let mut stdin = child.stdin.take().ok_or_else(|| {
            AgentError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "agent stdin unavailable",
            ))
        })?;
        // Feed stdin from a thread so a chatty agent cannot deadlock on a full stdout pipe.
        let writer = std::thread::spawn(move || stdin.write_all(request.as_bytes()));

        let output = child.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            // the agent may legitimately stop reading early
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(AgentError::Io(e)),
            Err(_) => {
                return Err(AgentError::Io(std::io::Error::other(
                    "stdin writer panicked",
                )))
            }
        }

        if !output.status.success() {
            return Err(AgentError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let transcript = String::from_utf8(output.stdout).map_err(|_| AgentError::InvalidOutput)?;
        tracing::debug!(len = transcript.len(), "agent transcript received");
        Ok(transcript)
    }
}

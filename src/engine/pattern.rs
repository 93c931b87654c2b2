//! Command-line tokenizing and the declarative patterns shared by the safety
//! rules and the discovery triggers.
//!
//! Input is split on whitespace only. There is no quoting or escaping: `cat "my file"`
//! yields the two arguments `"my` and `file"`.

use serde::{Deserialize, Serialize};

/// A parsed input line: lower-cased command name plus verbatim arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub command: String,
    pub args: Vec<String>,
    /// The trimmed original input.
    pub raw: String,
}

impl CommandLine {
    pub fn parse(input: &str) -> Self {
        let raw = input.trim().to_string();
        let mut parts = raw.split_whitespace();
        let command = parts.next().map(|c| c.to_lowercase()).unwrap_or_default();
        let args = parts.map(str::to_string).collect();
        Self { command, args, raw }
    }

    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    /// Command and arguments joined by single spaces, lower-cased.
    pub fn normalized(&self) -> String {
        let mut out = self.command.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_lowercase());
        }
        out
    }

    fn tokens(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().map(|a| a.to_lowercase()))
            .collect()
    }

    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }
}

/// Declarative predicate over a [`CommandLine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Contiguous token sequence anywhere in the line, e.g. `rm -rf /`.
    Phrase(Vec<String>),
    /// Token sequence starting at the command position.
    Leading(Vec<String>),
    /// The program being run, directly or through `sudo`, is `name` or `name.<variant>`.
    Program(String),
    /// Substring of the line with all whitespace removed (fork bombs and friends).
    Compact(String),
    /// Plain substring of the normalized line.
    Contains(String),
    /// `command` with a short-flag cluster containing `flag` and an operand containing `operand`.
    FlagWithOperand {
        command: String,
        flag: char,
        operand: String,
    },
    /// `command` with any argument containing `needle`.
    CommandWithArg { command: String, needle: String },
    /// `command` with any argument starting with `prefix`.
    ArgPrefix { command: String, prefix: String },
}

impl Pattern {
    pub fn phrase(text: &str) -> Self {
        Pattern::Phrase(text.split_whitespace().map(str::to_lowercase).collect())
    }

    pub fn leading(text: &str) -> Self {
        Pattern::Leading(text.split_whitespace().map(str::to_lowercase).collect())
    }

    pub fn program(name: &str) -> Self {
        Pattern::Program(name.to_lowercase())
    }

    pub fn compact(text: &str) -> Self {
        Pattern::Compact(strip_whitespace(&text.to_lowercase()))
    }

    pub fn contains(text: &str) -> Self {
        Pattern::Contains(text.to_lowercase())
    }

    pub fn command_with_arg(command: &str, needle: &str) -> Self {
        Pattern::CommandWithArg {
            command: command.to_lowercase(),
            needle: needle.to_lowercase(),
        }
    }

    /// The same pattern with every literal lower-cased, for hand-written content.
    pub fn lowercased(self) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|t| t.to_lowercase()).collect();
        match self {
            Pattern::Phrase(tokens) => Pattern::Phrase(lower(tokens)),
            Pattern::Leading(tokens) => Pattern::Leading(lower(tokens)),
            Pattern::Program(name) => Pattern::program(&name),
            Pattern::Compact(text) => Pattern::compact(&text),
            Pattern::Contains(text) => Pattern::contains(&text),
            Pattern::FlagWithOperand {
                command,
                flag,
                operand,
            } => Pattern::FlagWithOperand {
                command: command.to_lowercase(),
                flag,
                operand: operand.to_lowercase(),
            },
            Pattern::CommandWithArg { command, needle } => {
                Pattern::command_with_arg(&command, &needle)
            }
            Pattern::ArgPrefix { command, prefix } => Pattern::ArgPrefix {
                command: command.to_lowercase(),
                prefix: prefix.to_lowercase(),
            },
        }
    }

    pub fn matches(&self, line: &CommandLine) -> bool {
        match self {
            Pattern::Phrase(needle) => {
                if needle.is_empty() {
                    return false;
                }
                let tokens = line.tokens();
                tokens
                    .windows(needle.len())
                    .any(|window| window == needle.as_slice())
            }
            Pattern::Leading(needle) => {
                let tokens = line.tokens();
                !needle.is_empty() && tokens.starts_with(needle)
            }
            Pattern::Program(name) => {
                let program = if line.command == "sudo" {
                    line.args.first().map(|a| a.to_lowercase()).unwrap_or_default()
                } else {
                    line.command.clone()
                };
                program == *name
                    || program
                        .strip_prefix(name.as_str())
                        .map(|rest| rest.starts_with('.'))
                        .unwrap_or(false)
            }
            Pattern::Compact(needle) => {
                !needle.is_empty() && strip_whitespace(&line.raw.to_lowercase()).contains(needle)
            }
            Pattern::Contains(needle) => !needle.is_empty() && line.normalized().contains(needle),
            Pattern::FlagWithOperand {
                command,
                flag,
                operand,
            } => {
                if line.command != *command {
                    return false;
                }
                let has_flag = line.args.iter().any(|a| {
                    a.starts_with('-') && !a.starts_with("--") && a[1..].contains(*flag)
                });
                let has_operand = line
                    .args
                    .iter()
                    .any(|a| !a.starts_with('-') && a.to_lowercase().contains(operand.as_str()));
                has_flag && has_operand
            }
            Pattern::CommandWithArg { command, needle } => {
                line.command == *command
                    && line
                        .args
                        .iter()
                        .any(|a| a.to_lowercase().contains(needle.as_str()))
            }
            Pattern::ArgPrefix { command, prefix } => {
                line.command == *command
                    && line
                        .args
                        .iter()
                        .any(|a| a.to_lowercase().starts_with(prefix.as_str()))
            }
        }
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lowercases_command_only() {
        let line = CommandLine::parse("  CAT  Admin_Note.TXT ");
        assert_eq!(line.command, "cat");
        assert_eq!(line.args, vec!["Admin_Note.TXT".to_string()]);
        assert_eq!(line.raw, "CAT  Admin_Note.TXT");
    }

    #[test]
    fn parse_does_not_honor_quotes() {
        let line = CommandLine::parse("cat \"my file\"");
        assert_eq!(line.args.len(), 2);
    }

    #[test]
    fn phrase_requires_contiguous_tokens() {
        let p = Pattern::phrase("rm -rf /");
        assert!(p.matches(&CommandLine::parse("sudo rm -rf /")));
        assert!(!p.matches(&CommandLine::parse("rm -rf /tmp")));
        assert!(!p.matches(&CommandLine::parse("rm / -rf")));
    }

    #[test]
    fn leading_is_anchored_to_the_command() {
        let p = Pattern::leading("sl");
        assert!(p.matches(&CommandLine::parse("sl")));
        assert!(p.matches(&CommandLine::parse("SL -a")));
        assert!(!p.matches(&CommandLine::parse("cd sl")));
        assert!(!p.matches(&CommandLine::parse("cat sl")));
    }

    #[test]
    fn program_matches_direct_and_sudo_invocations() {
        let p = Pattern::program("mkfs");
        assert!(p.matches(&CommandLine::parse("mkfs /dev/sda1")));
        assert!(p.matches(&CommandLine::parse("mkfs.ext4 /dev/sdb")));
        assert!(p.matches(&CommandLine::parse("sudo mkfs.xfs /dev/sdb")));
        assert!(!p.matches(&CommandLine::parse("cat mkfs_notes.txt")));
        assert!(!p.matches(&CommandLine::parse("mkfsx")));
    }

    #[test]
    fn lowercased_normalizes_hand_written_literals() {
        let p = Pattern::Phrase(vec!["Netstat".into(), "-A".into()]).lowercased();
        assert_eq!(p, Pattern::phrase("netstat -a"));
        assert!(p.matches(&CommandLine::parse("netstat -a")));
    }

    #[test]
    fn compact_ignores_spacing() {
        let p = Pattern::compact(":(){ :|:& };:");
        assert!(p.matches(&CommandLine::parse(":(){ :|: & };:")));
    }

    #[test]
    fn flag_with_operand_detects_recursive_wildcard() {
        let p = Pattern::FlagWithOperand {
            command: "rm".into(),
            flag: 'r',
            operand: "*".into(),
        };
        assert!(p.matches(&CommandLine::parse("rm -fr ./*")));
        assert!(!p.matches(&CommandLine::parse("rm -f ./*")));
        assert!(!p.matches(&CommandLine::parse("rm -r ./build")));
    }

    #[test]
    fn command_with_arg_is_case_insensitive() {
        let p = Pattern::command_with_arg("nc-investigate", "aurora");
        assert!(p.matches(&CommandLine::parse("nc-investigate Project-AURORA")));
        assert!(!p.matches(&CommandLine::parse("cat aurora")));
    }
}

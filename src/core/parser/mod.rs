//! Smallsh Parser
//!
//! Grammar: `command [arg]* [< input] [> output] [&]`. Parsing never fails;
//! a malformed command surfaces later, when it is executed.

use self::ast::{SimpleCommand, MAX_ARGUMENTS};

pub mod ast;

const COMMENT_PREFIX: char = '#';
const INPUT_REDIRECT: &str = "<";
const OUTPUT_REDIRECT: &str = ">";
const BACKGROUND: &str = "&";

#[derive(Debug)]
pub struct Command {
    pub input: String,
    pub inner: ast::Command,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    CollectingArguments,
    ExpectInputPath,
    ExpectOutputPath,
}

impl Command {
    pub fn new(input: &str, inner: ast::Command) -> Self {
        Self {
            input: input.to_string(),
            inner,
        }
    }

    pub fn parse(input: &str) -> Self {
        let command = Command::new(input, parse_tokens(input));
        debug!("parsed Command: {:?}", command);
        command
    }
}

fn parse_tokens(input: &str) -> ast::Command {
    let mut tokens = input.split_whitespace().peekable();
    let name = match tokens.next() {
        Some(name) if !name.starts_with(COMMENT_PREFIX) => name,
        _ => return ast::Command::Blank,
    };

    let mut command = SimpleCommand::new(name);
    let mut state = State::CollectingArguments;
    let mut dropped = 0;
    while let Some(token) = tokens.next() {
        state = match (state, token) {
            (_, INPUT_REDIRECT) => State::ExpectInputPath,
            (_, OUTPUT_REDIRECT) => State::ExpectOutputPath,
            (State::ExpectInputPath, path) => {
                command.input = Some(path.to_string());
                State::CollectingArguments
            }
            (State::ExpectOutputPath, path) => {
                command.output = Some(path.to_string());
                State::CollectingArguments
            }
            (State::CollectingArguments, BACKGROUND) if tokens.peek().is_none() => {
                command.background = true;
                State::CollectingArguments
            }
            (State::CollectingArguments, arg) => {
                if command.args.len() < MAX_ARGUMENTS {
                    command.args.push(arg.to_string());
                } else {
                    dropped += 1;
                }
                State::CollectingArguments
            }
        };
    }

    if dropped > 0 {
        warn!(
            "{}: dropped {} arguments beyond the limit of {}",
            command.name, dropped, MAX_ARGUMENTS
        );
    }

    ast::Command::Simple(command)
}

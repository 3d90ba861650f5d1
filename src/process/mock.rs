//! Scripted command runner for tests
//!
//! Rules match on program name and an argument prefix. Each rule holds a
//! queue of outputs; the last output repeats once the queue is drained, so
//! a rule can describe a state change ("not mounted", then "mounted").

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use super::runner::{CommandLine, CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl RecordedCall {
    pub fn line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

struct Rule {
    program: String,
    prefix: Vec<String>,
    outputs: VecDeque<CommandOutput>,
}

#[derive(Default)]
pub struct ScriptedRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `program prefix...` with `outputs` in turn
    pub fn on<I>(self, program: &str, prefix: &[&str], outputs: I) -> Self
    where
        I: IntoIterator<Item = CommandOutput>,
    {
        self.rules.borrow_mut().push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.into_iter().collect(),
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Recorded calls to `program` whose arguments start with `prefix`
    pub fn calls_to(&self, program: &str, prefix: &[&str]) -> Vec<RecordedCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == program && starts_with(&c.args, prefix))
            .cloned()
            .collect()
    }
}

fn starts_with(args: &[String], prefix: &[&str]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandLine) -> io::Result<CommandOutput> {
        let args = cmd.args_lossy();
        self.calls.borrow_mut().push(RecordedCall {
            program: cmd.program().to_string(),
            args: args.clone(),
            stdin: cmd.stdin().map(|s| s.to_vec()),
        });

        let mut rules = self.rules.borrow_mut();
        // most specific rule wins
        let rule = rules
            .iter_mut()
            .filter(|r| {
                r.program == cmd.program()
                    && starts_with(&args, &r.prefix.iter().map(String::as_str).collect::<Vec<_>>())
            })
            .max_by_key(|r| r.prefix.len());

        match rule {
            Some(rule) => {
                let output = if rule.outputs.len() > 1 {
                    rule.outputs.pop_front()
                } else {
                    rule.outputs.front().cloned()
                };
                Ok(output.unwrap_or_default())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no scripted answer for {}", cmd.render()),
            )),
        }
    }
}

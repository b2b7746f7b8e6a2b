//! Scripted backend for unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use crate::error::SolverResult;
use crate::model::SolverModel;
use crate::session::{SatResult, SolverBackend};

/// Backend that records commands and replays scripted check answers
#[derive(Default)]
pub struct ScriptedBackend {
    pub commands: Vec<String>,
    checks: VecDeque<SatResult>,
    model: Option<String>,
}

impl ScriptedBackend {
    pub fn with_checks(checks: Vec<SatResult>) -> Self {
        Self {
            checks: checks.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
}

#[async_trait]
impl SolverBackend for ScriptedBackend {
    async fn declare(&mut self, command: &str) -> SolverResult<()> {
        self.commands.push(command.to_string());
        Ok(())
    }

    async fn assert(&mut self, term: &str) -> SolverResult<()> {
        self.commands.push(format!("(assert {term})"));
        Ok(())
    }

    async fn push(&mut self) -> SolverResult<()> {
        self.commands.push("(push 1)".to_string());
        Ok(())
    }

    async fn pop(&mut self) -> SolverResult<()> {
        self.commands.push("(pop 1)".to_string());
        Ok(())
    }

    async fn check_sat(&mut self, _timeout: Duration) -> SolverResult<SatResult> {
        self.commands.push("(check-sat)".to_string());
        Ok(self.checks.pop_front().unwrap_or(SatResult::Unknown))
    }

    async fn get_model(&mut self) -> SolverResult<SolverModel> {
        match &self.model {
            Some(text) => SolverModel::parse(text),
            None => Ok(SolverModel::default()),
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded evaluation of author-supplied check programs.
//!
//! Custom graders run author code, so every run carries a CPU and memory
//! budget from settings. The "CPU" budget is enforced twice over: a step
//! counter bounds the work deterministically, and a wall-clock deadline
//! catches anything the step accounting misprices. Memory is bounded by the
//! parsed program size. A blown budget is a sandbox fault, never a panic.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::eval::{Context, EvalError, Expr, parse};

/// Evaluation steps charged per millisecond of CPU budget.
const STEPS_PER_MS: u64 = 50_000;

/// Approximate bytes charged per AST node.
const BYTES_PER_NODE: u64 = 64;

/// Check the wall clock every this many steps.
const CLOCK_CHECK_INTERVAL: u64 = 4096;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SandboxError {
    #[error("program error: {0}")]
    Eval(#[from] EvalError),

    #[error("program exceeds the memory budget")]
    MemoryBudget,

    #[error("program exceeds the step budget")]
    StepBudget,

    #[error("program exceeds the CPU deadline")]
    Deadline,
}

/// Budgets for one sandboxed call.
#[derive(Clone, Copy, Debug)]
pub struct Sandbox {
    cpu_ms: u64,
    max_steps: u64,
    max_nodes: u64,
}

impl Sandbox {
    /// Budgets from the `grader.sandbox_cpu_ms` / `grader.sandbox_mem_bytes`
    /// settings.
    pub fn from_budgets(cpu_ms: u64, mem_bytes: u64) -> Self {
        Self {
            cpu_ms,
            max_steps: cpu_ms.saturating_mul(STEPS_PER_MS),
            max_nodes: mem_bytes / BYTES_PER_NODE,
        }
    }

    /// A roomy sandbox for unit tests.
    pub fn for_tests() -> Self {
        Self::from_budgets(100, 1024 * 1024)
    }

    /// Parse and evaluate a program under the budgets.
    pub fn run(&self, program: &str, context: &Context) -> Result<f64, SandboxError> {
        let expr = parse(program)?;
        if expr.size() as u64 > self.max_nodes {
            return Err(SandboxError::MemoryBudget);
        }

        let mut budget = Budget {
            steps: 0,
            max_steps: self.max_steps,
            deadline: Instant::now() + Duration::from_millis(self.cpu_ms),
        };
        budget.eval(&expr, context)
    }
}

struct Budget {
    steps: u64,
    max_steps: u64,
    deadline: Instant,
}

impl Budget {
    fn charge(&mut self) -> Result<(), SandboxError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(SandboxError::StepBudget);
        }
        if self.steps % CLOCK_CHECK_INTERVAL == 0 && Instant::now() > self.deadline {
            return Err(SandboxError::Deadline);
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr, context: &Context) -> Result<f64, SandboxError> {
        self.charge()?;
        match expr {
            Expr::Number(_) | Expr::Var(_) => {
                crate::eval::evaluate_expr(expr, context).map_err(SandboxError::Eval)
            }
            Expr::Call(name, argument) => {
                let argument = self.eval(argument, context)?;
                crate::eval::apply_function(name, argument).map_err(SandboxError::Eval)
            }
            Expr::Neg(inner) => Ok(-self.eval(inner, context)?),
            Expr::Add(l, r) => Ok(self.eval(l, context)? + self.eval(r, context)?),
            Expr::Sub(l, r) => Ok(self.eval(l, context)? - self.eval(r, context)?),
            Expr::Mul(l, r) => Ok(self.eval(l, context)? * self.eval(r, context)?),
            Expr::Div(l, r) => Ok(self.eval(l, context)? / self.eval(r, context)?),
            Expr::Pow(l, r) => Ok(self.eval(l, context)?.powf(self.eval(r, context)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::Context;

    use super::{Sandbox, SandboxError};

    #[test]
    fn evaluates_within_budget() {
        let sandbox = Sandbox::for_tests();
        let ctx = Context::new().with_variable("ans", 4.0);
        assert_eq!(sandbox.run("ans - 4", &ctx).unwrap(), 0.0);
    }

    #[test]
    fn oversized_programs_hit_the_memory_budget() {
        // A tiny memory budget: a handful of nodes only.
        let sandbox = Sandbox::from_budgets(100, 256);
        let ctx = Context::new();
        let long_sum = (0..64).map(|i| i.to_string()).collect::<Vec<_>>().join("+");
        assert_eq!(
            sandbox.run(&long_sum, &ctx),
            Err(SandboxError::MemoryBudget)
        );
    }

    #[test]
    fn parse_failures_are_sandbox_errors() {
        let sandbox = Sandbox::for_tests();
        let ctx = Context::new();
        assert!(matches!(
            sandbox.run("(1 +", &ctx),
            Err(SandboxError::Eval(_))
        ));
    }
}

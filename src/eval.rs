use crate::{
    error::EvalError,
    parse::{DEFAULT_MAX_DEPTH, Expr},
    value::Literal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        // a parsed tree can be one level deeper than its operator chain
        EvalConfig {
            max_depth: DEFAULT_MAX_DEPTH * 2,
        }
    }
}

/// Reduces expression trees to literals. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Evaluator { config }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(expr = %expr), ret, err)]
    pub fn evaluate(&self, expr: &Expr) -> Result<Literal, EvalError> {
        self.evaluate_within(expr, 0)
    }

    pub fn evaluate_to_text(&self, expr: &Expr) -> Result<String, EvalError> {
        Ok(self.evaluate(expr)?.to_string())
    }

    fn evaluate_within(&self, expr: &Expr, depth: usize) -> Result<Literal, EvalError> {
        if depth > self.config.max_depth {
            return Err(EvalError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        match expr {
            Expr::Literal(literal) => Ok(literal.clone()),
            Expr::Unary { op, operand } => {
                let value = self.evaluate_within(operand, depth + 1)?;
                value
                    .step(op.delta())
                    .ok_or(EvalError::UnsupportedOperation {
                        op: op.symbol(),
                        lhs: value.kind(),
                        rhs: None,
                    })
            }
            Expr::Binary { op, left, right } => {
                // both sides are reduced first, even for `and`/`or`
                let lhs = self.evaluate_within(left, depth + 1)?;
                let rhs = self.evaluate_within(right, depth + 1)?;
                lhs.apply(*op, &rhs)
            }
        }
    }
}

pub fn evaluate(expr: &Expr) -> Result<Literal, EvalError> {
    Evaluator::default().evaluate(expr)
}

pub fn evaluate_to_text(expr: &Expr) -> Result<String, EvalError> {
    Evaluator::default().evaluate_to_text(expr)
}

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{AgentflowError, Result, tools::Tool};

/// Evaluates arithmetic expressions: `+ - * / % ^`, parentheses and unary minus.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression such as \"(2 + 3) * 4\". Supports + - * / % ^ and parentheses."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["expression"],
            "properties": {
                "expression": { "type": "string", "description": "The expression to evaluate" }
            }
        })
    }

    async fn execute(
        &self,
        input: Value,
    ) -> Result<Value> {
        let expression = input
            .get("expression")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| AgentflowError::Tool("calculator requires an 'expression' string".to_string()))?;

        let result = evaluate(&expression)?;
        Ok(json!({
            "expression": expression,
            "result": number_value(result),
        }))
    }
}

/// Whole results are reported as integers so `2+2` reads as `4`, not `4.0`.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// Deepest nesting of parentheses, signs and exponents accepted.
const MAX_DEPTH: usize = 256;

pub(crate) fn evaluate(expression: &str) -> Result<f64> {
    let mut parser = Parser {
        chars: expression.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.chars.len() {
        return Err(AgentflowError::Tool(format!("unexpected '{}' in expression", parser.chars[parser.pos])));
    }
    if !value.is_finite() {
        return Err(AgentflowError::Tool("expression does not evaluate to a finite number".to_string()));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' {
                value + rhs
            } else {
                value - rhs
            };
        }
        Ok(value)
    }

    // term := power (('*' | '/' | '%') power)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.power()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.pos += 1;
            let rhs = self.power()?;
            if rhs == 0.0 && op != '*' {
                return Err(AgentflowError::Tool("division by zero".to_string()));
            }
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // power := unary ('^' power)?
    fn power(&mut self) -> Result<f64> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.pos += 1;
            let exp = self.power()?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    // every recursive rule passes through here, so this bounds the stack
    fn unary(&mut self) -> Result<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(AgentflowError::Tool("expression nested too deeply".to_string()));
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<f64> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(')') {
                    return Err(AgentflowError::Tool("missing closing parenthesis".to_string()));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse::<f64>().map_err(|_| AgentflowError::Tool(format!("invalid number '{}'", text)))
            }
            Some(c) => Err(AgentflowError::Tool(format!("unexpected '{}' in expression", c))),
            None => Err(AgentflowError::Tool("unexpected end of expression".to_string())),
        }
    }
}

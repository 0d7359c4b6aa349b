// Star-count filter expressions like ">=100"
use std::fmt;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// `{operator, threshold}` predicate over star counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonFilter {
    pub op: Comparison,
    pub threshold: u64,
}

impl ComparisonFilter {
    pub fn new(op: Comparison, threshold: u64) -> Self {
        Self { op, threshold }
    }

    /// Parse `=N`, `>N`, `>=N`, `<N`, `<=N` or a bare `N` (equality).
    ///
    /// Digits and operator characters may appear in any order; they are
    /// collected into separate tokens. An empty expression means "no filter".
    /// A missing number is read as 0.
    pub fn parse(expression: &str) -> Result<Option<Self>> {
        if expression.is_empty() {
            return Ok(None);
        }

        let mut op = String::new();
        let mut value = String::new();
        for (position, character) in expression.chars().enumerate() {
            match character {
                '0'..='9' => value.push(character),
                '=' | '>' | '<' => op.push(character),
                _ => {
                    return Err(Error::InvalidFilter {
                        character,
                        position,
                    })
                }
            }
        }

        let threshold = if value.is_empty() {
            0
        } else {
            value
                .parse()
                .map_err(|_| Error::InvalidFilterValue(expression.to_string()))?
        };

        let op = match op.as_str() {
            "" | "=" => Comparison::Eq,
            ">" => Comparison::Gt,
            ">=" => Comparison::Ge,
            "<" => Comparison::Lt,
            "<=" => Comparison::Le,
            _ => {
                return Err(Error::FilterInternal {
                    expression: expression.to_string(),
                    operator: op,
                })
            }
        };

        Ok(Some(Self { op, threshold }))
    }

    pub fn matches(&self, stars: u64) -> bool {
        match self.op {
            Comparison::Eq => stars == self.threshold,
            Comparison::Gt => stars > self.threshold,
            Comparison::Ge => stars >= self.threshold,
            Comparison::Lt => stars < self.threshold,
            Comparison::Le => stars <= self.threshold,
        }
    }
}

impl fmt::Display for ComparisonFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.threshold)
    }
}

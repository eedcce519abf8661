use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use regex::Regex;

use crate::error::{Error, Result};
use crate::observations::ObservationTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Intercept,
    Column(String),
    Power { column: String, exponent: u32 },
}

impl Term {
    pub fn column(&self) -> Option<&str> {
        match self {
            Term::Intercept => None,
            Term::Column(column) | Term::Power { column, .. } => Some(column),
        }
    }

    pub fn exponent(&self) -> u32 {
        match self {
            Term::Intercept => 0,
            Term::Column(_) => 1,
            Term::Power { exponent, .. } => *exponent,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Intercept => write!(f, "Intercept"),
            Term::Column(column) => write!(f, "{column}"),
            Term::Power { column, exponent } => write!(f, "I({column}**{exponent})"),
        }
    }
}

/// `response ~ term + term ...`; an intercept is implied unless `- 1` or `+ 0` is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<Term>,
}

const NAME: &str = r"[A-Za-z_][A-Za-z0-9_.]*";

/// Highest power accepted in `I(x**k)`, matching the polynomial degree limit of the CLI.
pub const MAX_EXPONENT: u32 = 10;

impl FromStr for Formula {
    type Err = Error;

    fn from_str(formula: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Formula {
            formula: formula.to_string(),
            reason: reason.to_string(),
        };

        let (response, rhs) = formula
            .split_once('~')
            .ok_or_else(|| invalid("missing `~`"))?;
        let response = response.trim();

        let name_re = Regex::new(&format!("^{NAME}$")).map_err(|e| invalid(&e.to_string()))?;
        if !name_re.is_match(response) {
            return Err(invalid("response must be a column name"));
        }

        let term_re = Regex::new(&format!(
            r"^([+-]?)\s*(?:I\(\s*({NAME})\s*(?:\*\*|\^)\s*(\d+)\s*\)|({NAME})|(\d+))"
        ))
        .map_err(|e| invalid(&e.to_string()))?;

        let mut intercept = true;
        let mut terms: Vec<Term> = Vec::new();
        let mut rest = rhs.trim();
        let mut first = true;

        while !rest.is_empty() {
            let caps = term_re
                .captures(rest)
                .ok_or_else(|| invalid(&format!("cannot parse `{rest}`")))?;

            let sign = &caps[1];
            if sign.is_empty() && !first {
                return Err(invalid("terms must be joined with `+`"));
            }
            let negated = sign == "-";

            let term = if let (Some(column), Some(exponent)) = (caps.get(2), caps.get(3)) {
                let exponent: u32 = exponent
                    .as_str()
                    .parse()
                    .map_err(|_| invalid("exponent out of range"))?;
                match exponent {
                    0 => return Err(invalid("exponent must be positive")),
                    k if k > MAX_EXPONENT => {
                        return Err(invalid(&format!("exponent {k} is above {MAX_EXPONENT}")))
                    }
                    1 => Some(Term::Column(column.as_str().to_string())),
                    _ => Some(Term::Power {
                        column: column.as_str().to_string(),
                        exponent,
                    }),
                }
            } else if let Some(column) = caps.get(4) {
                Some(Term::Column(column.as_str().to_string()))
            } else {
                match (&caps[5], negated) {
                    ("1", false) => intercept = true,
                    ("1", true) | ("0", false) => intercept = false,
                    _ => return Err(invalid("only `1`, `- 1` and `+ 0` are allowed as constants")),
                }
                None
            };

            if let Some(term) = term {
                if negated {
                    return Err(invalid("only the intercept can be removed"));
                }
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }

            rest = rest[caps[0].len()..].trim_start();
            first = false;
        }

        if intercept {
            terms.insert(0, Term::Intercept);
        }

        if terms.is_empty() {
            return Err(invalid("no terms on the right-hand side"));
        }

        Ok(Self {
            response: response.to_string(),
            terms,
        })
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rhs = self
            .terms
            .iter()
            .filter(|t| **t != Term::Intercept)
            .join(" + ");

        write!(f, "{} ~ {}", self.response, rhs)?;

        if !self.has_intercept() {
            write!(f, " - 1")?;
        }

        Ok(())
    }
}

impl Formula {
    pub fn has_intercept(&self) -> bool {
        self.terms.contains(&Term::Intercept)
    }

    fn lookup<'a>(table: &'a ObservationTable, column: &str) -> Result<&'a [f64]> {
        table
            .column(column)
            .ok_or_else(|| Error::MissingColumn(column.to_string()))
    }

    pub fn design_matrix(&self, table: &ObservationTable) -> Result<DMatrix<f64>> {
        let columns = self
            .terms
            .iter()
            .map(|term| match term.column() {
                Some(column) => Self::lookup(table, column).map(Some),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DMatrix::from_fn(table.len(), self.terms.len(), |i, j| {
            match columns[j] {
                Some(values) => values[i].powi(self.terms[j].exponent() as i32),
                None => 1.,
            }
        }))
    }

    pub fn response_vector(&self, table: &ObservationTable) -> Result<DVector<f64>> {
        Self::lookup(table, &self.response).map(DVector::from_column_slice)
    }
}

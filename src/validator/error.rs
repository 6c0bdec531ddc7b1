use crate::reflect::Kind;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// Error returned when a validation pass cannot run at all.
///
/// Field-level rule failures are not errors of this kind; they are collected
/// into [`ValidationErrors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateError {
    /// The value passed does not match the descriptor it was checked against.
    InvalidArgument {
        /// What was wrong with the argument
        reason: String,
    },
    /// A tag names a rule that is not registered.
    ///
    /// This is a programming mistake (a typo in a tag or a missing
    /// `register` call), never a data issue.
    RuleNotFound {
        /// The unknown rule name
        rule: String,
    },
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidateError::InvalidArgument { reason } => {
                write!(f, "[validator] invalid argument: {}", reason)
            }
            ValidateError::RuleNotFound { rule } => {
                write!(f, "[validator] rule '{}' is not registered", rule)
            }
        }
    }
}

impl std::error::Error for ValidateError {}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub kind: Kind,
    /// Display rendering of the field value at check time
    pub value: String,
    pub rule: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} {}]",
            self.rule, self.kind, self.field, self.value
        )
    }
}

impl std::error::Error for ValidationError {}

/// Ordered failures from one validation pass; empty means the value is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Names of the failed rules, in evaluation order.
    pub fn rules(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.rule.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl Deref for ValidationErrors {
    type Target = [ValidationError];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

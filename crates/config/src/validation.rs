// crates/config/src/validation.rs
//! Range and shape checks for config sections
//!
//! A section lists its checks against a [`Report`], which qualifies every
//! field with the section's table name and keeps going after a failure so
//! one pass reports everything wrong with a file.

use crate::error::ValidationError;
use std::fmt::Display;
use std::ops::RangeInclusive;

/// A `[table]` of the config file
pub trait ConfigSection {
    /// Table name, used to qualify field names in errors
    const NAME: &'static str;

    /// Records every invalid field of this section in `report`
    fn check(&self, report: &mut Report);

    /// Checks this section alone
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut report = Report::default();
        report.section(self);
        report.finish()
    }
}

/// Accumulates validation errors across one or more sections
#[derive(Debug, Default)]
pub struct Report {
    table: &'static str,
    errors: Vec<ValidationError>,
}

impl Report {
    /// Runs `section`'s checks, qualifying its fields with its table name
    pub fn section<S: ConfigSection + ?Sized>(&mut self, section: &S) -> &mut Self {
        let outer = std::mem::replace(&mut self.table, S::NAME);
        section.check(self);
        self.table = outer;
        self
    }

    /// `value` must lie in `range`, bounds included
    pub fn within<T>(&mut self, field: &str, value: T, range: RangeInclusive<T>) -> &mut Self
    where
        T: PartialOrd + Display,
    {
        if !range.contains(&value) {
            let message = format!(
                "must be between {} and {}, got {}",
                range.start(),
                range.end(),
                value
            );
            self.fail(field, message);
        }
        self
    }

    /// `value` must not exceed the sibling field `limit_field`
    pub fn at_most<T>(&mut self, field: &str, value: T, limit_field: &str, limit: T) -> &mut Self
    where
        T: PartialOrd + Display,
    {
        if value > limit {
            let message = format!(
                "must not exceed {} ({}), got {}",
                self.qualify(limit_field),
                limit,
                value
            );
            self.fail(field, message);
        }
        self
    }

    /// `value` must contain something other than whitespace
    pub fn filled(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "must not be empty");
        }
        self
    }

    /// `value` must start with `prefix`; empty values are left to [`Report::filled`]
    pub fn prefixed(&mut self, field: &str, value: &str, prefix: &str) -> &mut Self {
        if !value.trim().is_empty() && !value.starts_with(prefix) {
            self.fail(field, format!("must start with '{}', got '{}'", prefix, value));
        }
        self
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok` if nothing failed, otherwise every error in check order
    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        let field = self.qualify(field);
        self.errors.push(ValidationError::new(field, message));
    }

    fn qualify(&self, field: &str) -> String {
        if self.table.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.table, field)
        }
    }
}

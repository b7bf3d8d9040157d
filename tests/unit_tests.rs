//! Component-level tests: configuration, errors, diagnostics, builders and
//! utilities.

mod unit;

//! rule-audit
//!
//! Audits translated rule catalogs against a reference language: missing and
//! extra rules, untranslated text, and structural differences between rules.

pub mod audit;
pub mod cli;
pub mod compare;
pub mod config;
pub mod discovery;
pub mod report;
pub mod rules;

/// Builders for unit tests
mod test_utils;

//! Unit-test harness for the CLI runtime.

pub(crate) mod support;

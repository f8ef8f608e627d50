//! Test suites for the bootstrap orchestrator.

mod support;

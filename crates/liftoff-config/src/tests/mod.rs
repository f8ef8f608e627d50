//! Unit and behavioural tests for configuration resolution.

mod support;
mod unit;

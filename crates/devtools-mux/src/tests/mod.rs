//! Test suites for the DevTools client.

mod support;

//! Edge case tests for f12c-par.

//! Edge case tests for kuki-sem

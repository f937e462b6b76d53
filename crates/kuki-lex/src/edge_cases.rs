//! Edge case tests for kuki-lex

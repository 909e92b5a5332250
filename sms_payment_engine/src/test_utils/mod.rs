//! Helpers for creating throwaway databases in tests.
pub mod prepare_env;

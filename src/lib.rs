//! SpecSync governance layer: decides whether a commit may proceed by
//! checking that code, spec, tests and docs stay aligned, and produces a
//! ranked remediation plan when they do not.

pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;

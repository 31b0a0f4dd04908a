//! # CLI Module
//!
//! The `oapi3-check` harness: a thin consumer of the validator for contract tests
//! and shell scripts.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Build a contract and list its path templates and operations:
//!
//! ```bash
//! oapi3-check check --spec openapi.yaml
//! ```
//!
//! ### `request`
//!
//! Validate one request and, with `--status`, the response to it:
//!
//! ```bash
//! oapi3-check request --spec openapi.yaml --method post --path '/pets?dry_run=true' \
//!     --content-type application/json --body pet.json \
//!     --status 201 --response-content-type application/json --response-body created.json
//! ```
//!
//! On success the coerced parameters and decoded body are printed. On failure the
//! problem document (`{code, message}`) and its HTTP status are printed and the
//! process exits with status 1.

mod commands;

pub use commands::{init_logging, run_cli, Cli, Commands, LogFormat, Outcome};

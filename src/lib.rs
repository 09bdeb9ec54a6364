//! # bashc
//!
//! An ahead-of-time compiler from a subset of a POSIX-style shell language
//! to C. The generated program reproduces the script's control flow,
//! process spawning, pipelines, and exit-status propagation, and links
//! against the small `libbashc` runtime shipped alongside this crate.
//!
//! ## Pipeline
//!
//! A script is translated in three stages:
//!
//! 1. **Lexer** - Tokenizes shell source into words and operators
//! 2. **Parser** - Parses tokens into command trees
//! 3. **Code generator** - Walks each tree and emits C
//!
//! Each stage collects its errors instead of aborting, so a partially
//! broken script still translates as far as possible.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bashc::codegen::generate;
//! use bashc::lexer::tokenize;
//! use bashc::parser::parse;
//!
//! let source = std::fs::read_to_string("script.sh").unwrap();
//! let lexed = tokenize(&source);
//! let parsed = parse(&lexed.tokens);
//! let generated = generate(&parsed.commands).unwrap();
//!
//! if lexed.errors.is_empty() && parsed.errors.is_empty() {
//!     std::fs::write("script.c", &generated.c_source).unwrap();
//! }
//! ```

pub mod codegen;
pub mod driver;
pub mod error;
pub mod lexer;
pub mod parser;

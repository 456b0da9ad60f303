// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # Counterfeit: call-recording fakes for Go interfaces
//!
//! Counterfeit reads Go source, finds an interface (or derives one from a
//! package's exported functions) and writes a test double for it: a struct
//! that records every call, answers from a per-method stub when one is set,
//! and otherwise returns canned values.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use counterfeit::{generate, Config, Request};
//!
//! let request = Request::locate("Store", "internal/store", "storefakes");
//! let generated = generate(&request, &Config::default())?;
//! assert_eq!(generated.name, "FakeStore");
//! std::fs::write(generated.file_name, generated.source)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                                                             │
//! │  GO SOURCE (file or directory)                              │
//! │       │                                                     │
//! │       ├──► locate(name, path) ──► Contract                  │
//! │       │        (embeds flattened, types resolved)           │
//! │       │                                                     │
//! │       └──► extract_functions(dir) ──► Contract              │
//! │                                                             │
//! │  CONTRACT                                                   │
//! │       │                                                     │
//! │       ├──► generate_fake(contract, name, pkg) ──► Go fake   │
//! │       │                                                     │
//! │       └──► generate_interface(contract, pkg) ──► Go iface   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`Contract`] model is the only thing shared between the two halves:
//! every type in it is already resolved and renders as valid Go text, and
//! its [`ImportSet`] lists exactly the imports that text needs.
//!
//! ## Generated fakes
//!
//! For a method `Get(key string) ([]byte, error)` the fake has a `GetStub`
//! field, a `GetCalls()` accessor returning argument records, `GetCallCount()`
//! and `GetReturns(...)`. All state sits behind one `sync.RWMutex`, so a fake
//! can be shared by goroutines. Stubs run while that lock is held and must
//! not call back into the same fake.

pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod generate;
pub mod loader;
pub mod locate;
pub mod model;
pub mod parse;
pub mod render;
pub mod resolve;
pub mod templates;
pub mod util;

// Re-exports
pub use config::{Config, CONFIG_FILE};
pub use error::{Error, Result};
pub use extract::{extract_functions, Extractor};
pub use generate::{generate, Generated, Mode, Request};
pub use loader::PackageLoader;
pub use locate::{locate, Locator};
pub use model::{
    ChanDir, Contract, ImportSet, Location, MethodSignature, PackageContext, Parameter,
    Qualifier, ReturnValue, TypeParam, TypeRef,
};
pub use parse::{GoFile, Package};
pub use render::{generate_fake, generate_interface, RenderConfig, Renderer};
pub use resolve::{resolve_type_str, LocalQualifier, Scope};

// Code formatting
pub use format::{format_go, is_formatter_available, FormatError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # puzzle
//!
//! **puzzle** is a set of building blocks for web services: a struct-to-struct
//! copier with cached copy plans, a tag-driven field validator with a pluggable
//! rule registry, and named TTL data dictionaries.
//!
//! ## Overview
//!
//! Both the copier and the validator work from field descriptors generated at
//! compile time by `#[derive(Reflect)]`; nothing walks types at runtime. The
//! shared state they need (compiled copy plans, registered rules, dictionaries)
//! lives in explicit objects that callers construct once and share by handle.
//!
//! ## Architecture
//!
//! - **[`reflect`]** - Field descriptors, kinds and value views behind `#[derive(Reflect)]`
//! - **[`copier`]** - Copy-plan compiler, [`Copier`] and the type-pair [`CopierCache`]
//! - **[`validator`]** - Tag parser, default rules and the rule-registry [`Validator`]
//! - **[`ttl`]** - Capacity-bounded TTL cache used by the copier cache and dictionaries
//! - **[`dict`]** - Named data dictionaries and a [`DictDirectory`](dict::DictDirectory)
//! - **[`parser`]** - JSON and YAML loading
//! - **[`runtime_config`]** - Environment-driven cache tuning
//! - **[`otel`]** - `tracing` subscriber setup
//!
//! ### Copy Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Cache as CopierCache
//!     participant Plan as CopyPlan::compile
//!     participant Copier
//!
//!     Caller->>Cache: copy(&mut dest, &src)
//!     Cache->>Cache: lookup TypePair(S, D)
//!     alt Cache Miss or Expired
//!         Cache->>Plan: compile(S::struct_info(), D::struct_info())
//!         Plan->>Plan: walk D fields in order,<br/>resolve names on S
//!         Plan-->>Cache: Arc<Copier>
//!     end
//!     Cache->>Copier: copy(dest, src)
//!     Copier->>Copier: apply actions in order
//!     Copier-->>Caller: Ok(())
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use puzzle::{CopierCache, Reflect, Validator};
//!
//! #[derive(Debug, Clone, Default, Reflect)]
//! pub struct SignupRequest {
//!     #[puzzle(check = "request,min=3,max=32")]
//!     pub name: String,
//!     #[puzzle(check = "email")]
//!     pub email: String,
//!     pub age: u8,
//! }
//!
//! #[derive(Debug, Clone, Default, Reflect)]
//! pub struct UserRecord {
//!     pub id: u64,
//!     pub name: String,
//!     pub email: String,
//!     pub age: i32,
//! }
//!
//! let validator = Validator::with_default_rules();
//! let cache = CopierCache::default();
//!
//! let request = SignupRequest {
//!     name: "ada".into(),
//!     email: "ada@puzzle.com".into(),
//!     age: 36,
//! };
//! assert!(validator.check(&request).unwrap().is_empty());
//!
//! let mut record = UserRecord { id: 1, ..Default::default() };
//! cache.copy(&mut record, &request).unwrap();
//! assert_eq!(record.age, 36);
//! assert_eq!(record.id, 1);
//! ```
//!
//! ## Concurrency
//!
//! Everything is synchronous. [`CopierCache`], [`Validator`] and
//! [`DictDirectory`](dict::DictDirectory) are `Send + Sync` handles that can be
//! cloned into worker threads; compiled plans are immutable and shared via `Arc`.

// Lets the derive's `::puzzle::` paths resolve inside this crate's own tests.
extern crate self as puzzle;

pub mod copier;
pub mod dict;
pub mod otel;
pub mod parser;
pub mod reflect;
pub mod runtime_config;
pub mod ttl;
pub mod validator;

pub use copier::{copy_slice, Copier, CopierCache, CopyError, CopyPlan, TypePair};
pub use puzzle_macros::Reflect;
pub use reflect::{Field, Kind, Reflect, StructInfo, Value};
pub use runtime_config::RuntimeConfig;
pub use validator::{ValidateError, ValidationError, ValidationErrors, Validator};

//! Query layer - composable predicates over stored documents.
//!
//! This crate has no storage dependency. It provides:
//! - An expression tree with a single entity placeholder ([`Expr`], [`Param`])
//! - Typed predicates that compose with AND/OR without mutating their inputs ([`Predicate`])
//! - Evaluation of predicates against JSON documents ([`Document`])
//! - Sort specifications and the value ordering shared by stores ([`Sort`])
//!
//! # Example
//!
//! ```
//! use query::{and, Predicate};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Lead {
//!     company_id: String,
//!     agent_id: String,
//! }
//!
//! let by_company = Predicate::<Lead>::new(|it| it.field("company_id").eq("C1"));
//! let by_agent = Predicate::<Lead>::new(|it| it.field("agent_id").eq("A1"));
//! let narrowed = and(Some(&by_company), Some(&by_agent)).unwrap();
//!
//! let lead = Lead { company_id: "C1".into(), agent_id: "A2".into() };
//! assert!(by_company.matches(&lead).unwrap());
//! assert!(!narrowed.matches(&lead).unwrap());
//! ```

pub mod document;
pub mod error;
mod eval;
pub mod expr;
pub mod predicate;
pub mod sort;
pub mod value;

pub use document::{get_path, remove_path, set_path, Document, ID_FIELD};
pub use error::{QueryError, QueryResult};
pub use expr::{CmpOp, Expr, Method, Param};
pub use predicate::{and, new_query, or, Filter, Predicate};
pub use sort::{Sort, SortDirection};
pub use value::{compare_values, values_equal};

//! Embedded engine facade for running loq query pipelines over in-memory
//! blocks.
//!
//! ```
//! use loq_client::Engine;
//! use loq_common::EngineConfig;
//! use loq_pipeline::{Block, BlockResult};
//!
//! let engine = Engine::new(EngineConfig::default()).expect("engine");
//! let input = vec![BlockResult::from_block(&Block::from_rows(&[
//!     &[("host", "web-1")],
//!     &[("host", "web-2")],
//!     &[("host", "web-1")],
//! ]))];
//! let result = engine
//!     .run_query("stats uniq(host) as hosts", input)
//!     .expect("query");
//! assert_eq!(result.rows()[0], vec![("hosts".to_string(), "2".to_string())]);
//! ```

pub mod engine;

pub use engine::{Engine, QueryResult};

//! Bundles a tree of TypeScript declaration files into one namespaced `.d.ts`
//!
//! The pipeline is text based: a closed catalog of regular expressions
//! ([`patterns`]) classifies import and export idioms, the [`optimizer`]
//! resolves them, the [`wrapper`] puts everything inside one
//! `declare namespace`, and the [`orchestrator`] runs it all per bundle.

pub mod compactor;
pub mod config;
pub mod discovery;
pub mod error;
pub mod externals;
pub mod fs;
pub mod logging;
pub mod naming;
pub mod optimizer;
pub mod orchestrator;
pub mod patterns;
pub mod wrapper;

pub use config::{BundleDescriptor, Config, Options};
pub use error::{BundleError, Result};
pub use orchestrator::{
    BundleOutcome, BundleOutput, BundleStatus, Bundler, GenerationReport, generate_bundles,
};

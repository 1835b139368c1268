//! linkmend: referential integrity for image assets in a markdown vault
//!
//! This crate keeps the links between binary assets (images) and the
//! markdown documents that embed them consistent when assets are renamed or
//! moved. Assets are referenced through three independent syntaxes — wiki
//! links (`![[photo.png|caption|800x600]]`, `[[photo.png]]`), markdown
//! inline images (`![caption](photo.png)`), and HTML `<img>` tags — and a
//! single rename must update all of them without corrupting surrounding
//! text, without touching code spans, and without running twice for one
//! rename.
//!
//! # Architecture
//!
//! - [`corpus`]: the vault model — document ropes, the asset inventory, and
//!   resolution of raw link targets to stable asset identities
//! - [`syntax`]: pure parse/build functions for every link format
//! - [`codespan`]: code exclusion (inline spans, fenced blocks, structural
//!   hints)
//! - [`finder`]: corpus-wide "who references this asset" queries
//! - [`rewrite`]: the rename-triggered rewrite pass with per-file outcomes
//! - [`guard`]: debouncing of overlapping rename notifications
//! - [`config`]: settings (image extension allow-list, code-span policy)
//!
//! # Usage
//!
//! ```ignore
//! use linkmend::config::Settings;
//! use linkmend::corpus::Corpus;
//! use linkmend::guard::{RenameGuard, RenameTransition};
//!
//! let settings = Settings::default();
//! let mut corpus = Corpus::scan(&settings, &vault_dir)?;
//! let mut guard = RenameGuard::new();
//!
//! let transition = RenameTransition::new(old_id, new_id);
//! if let Some(outcome) = linkmend::rewrite::handle_rename(
//!     &mut corpus, &settings, &mut guard, &transition,
//! ) {
//!     println!("updated {} files", outcome.updated_files);
//! }
//! ```

// Core modules - corpus and asset identity
pub mod corpus;

// Scanning and rewriting
pub mod codespan;
pub mod finder;
pub mod guard;
pub mod rewrite;
pub mod syntax;

// Configuration
pub mod config;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;

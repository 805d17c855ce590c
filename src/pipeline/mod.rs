//! Pipeline stages for PRD-to-hierarchy planning.
//!
//! Each submodule implements one transformation step and is testable on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ chunk ──▶ llm ──▶ parse
//! (URL/path/bytes) (pdfium) (text) (chat)  (JSON recovery + merge)
//! ```
//!
//! 1. [`input`]   — canonicalise a path, URL or byte buffer to a local PDF
//! 2. [`extract`] — pull the text layer of every page; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`chunk`]   — split the text on paragraph boundaries to fit the model
//! 4. [`llm`]     — one chat completion per chunk with timeout, retry and
//!    backoff; the only stage with network I/O
//! 5. [`parse`]   — recover groups from the model's answer and merge them
//!    across chunks

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;

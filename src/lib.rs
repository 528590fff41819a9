//! # Gallery Ingest
//!
//! Turns a flat directory of bridal photos and videos into web-ready
//! derivatives plus the JSON manifest a gallery site renders from. The
//! directory is the data source: filenames decide which subject and slot a
//! file belongs to, and everything else is derived.
//!
//! # Architecture: One Pipeline, Two Entry Points
//!
//! ```text
//! input dir ─► scan ─► classify ─► transcode ─► metadata ─► manifest.json
//!                                     ▲                         ▲
//!  POST /api/admin/gallery ───────────┘                         │
//!  DELETE /api/admin/gallery?id= ───────────────────────────────┘
//! ```
//!
//! Batch builds (`gallery-ingest build`) regenerate the whole manifest from
//! the directory. The admin API edits it one item at a time through a
//! single-writer [`manifest::ManifestStore`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `MediaKind` and the supported extensions |
//! | [`naming`] | Filename convention: subject/slot parser, derivative names |
//! | [`scan`] | Lists the input directory and applies the skip rules |
//! | [`classify`] | Buckets files into subject slots and the collection, resolves conflicts |
//! | [`imaging`] | Pure-Rust decode, orient, resize, AVIF encode, inline previews |
//! | [`ffmpeg`] | The external video tool: compression, poster frames, still fallback |
//! | [`transcode`] | Per-item state machine producing a derivative, poster and preview |
//! | [`metadata`] | Alt text, titles, hashtags and badges |
//! | [`manifest`] | Manifest schema, grouping, atomic writes, upload/delete edits |
//! | [`cache`] | SHA-256 keyed transcode cache for incremental builds |
//! | [`pipeline`] | Orchestrates build, upload and delete |
//! | [`server`] | axum router for the admin endpoints |
//! | [`config`] | `gallery.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Filesystem As Truth
//!
//! There is no database. Re-running a build on an unchanged directory yields
//! a byte-identical manifest: discovery is sorted, metadata is a pure
//! function of (subject, slot, kind), and derivatives from earlier runs are
//! recognised by their lowercase `bride_` / `upload_` prefix and reused.
//!
//! ## Pure-Rust Images, ffmpeg For Video
//!
//! Stills go through the `image` crate (Lanczos3, AVIF via rav1e) so the
//! common path has no system dependencies. Video has no credible pure-Rust
//! encoder, so it shells out to `ffmpeg`, which also renders a still for
//! image formats the decoder cannot read (HEIC, AVIF input).
//!
//! ## Per-Item Isolation
//!
//! A file that fails to transcode is logged and left out; the run goes on.
//! Only a missing input directory or a failed manifest write aborts a
//! build, and the atomic rename means the previous manifest survives.

pub mod cache;
pub mod classify;
pub mod config;
pub mod ffmpeg;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod server;
pub mod transcode;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

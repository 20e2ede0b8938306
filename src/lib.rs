//! tomp4 — batch-convert video files to MP4 containers.
//!
//! The heavy lifting (probing, planning, subprocess plumbing) lives in the
//! `tomp4-av` crate; this crate hosts the conversion orchestrator and the
//! progress renderer used by the CLI binary.

pub mod convert;
pub mod progress;

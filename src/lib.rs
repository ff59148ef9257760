//! Library crate for usrgrp-editor.
//!
//! - Directory file codec, in-memory model, locking and platform backends (`sys`)
//! - Settings, keybindings, the controller and the TUI state and loop (`app`)
//! - Error and result types (`error`)
//! - UI rendering (`ui`)
//!
//! It is used by the `usrgrp-editor` binary and by tests.
#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod app;
pub mod error;
pub mod sys;
pub mod ui;

pub use error::{Error, Result};

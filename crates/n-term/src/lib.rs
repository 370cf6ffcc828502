// SPDX-License-Identifier: MIT
//
// n-term — Terminal output engine for n-vt.
//
// The output half of a terminal control-protocol engine, plus the OS
// plumbing that feeds the input half (n-input). Applications draw into
// cell buffers; a cursor-optimizing renderer works out the cheapest byte
// stream that turns what the terminal shows into what the buffer holds,
// using scroll regions, insert/delete, repeat and erase sequences, and
// only touching lines that changed.
//
// On the input side this crate owns what n-input deliberately doesn't:
// cancelable readers over epoll, kqueue, select, the Windows console, or
// a helper thread; raw mode and panic-safe restore; and the threads that
// turn stdin into decoded events.
//
// No TUI framework underneath. Every byte sent to the terminal is
// accounted for. Every frame is diffed. Every escape code is earned.

pub mod ansi;
pub mod buffer;
pub mod caps;
pub mod cell;
pub mod color;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod poll;
pub mod reader;
pub mod render_buffer;
pub mod renderer;
pub mod screen;
pub mod tabstops;
pub mod terminal;
pub mod window;

pub use error::{Error, Result};

//! # courier-channels
//!
//! Messaging transports for Courier. Every transport implements
//! `courier_core::traits::Channel`; the console channel ships in-tree.

pub mod console;

//! Core types for Entroswarm
pub mod key_binding;
pub mod layout;
pub mod modes;

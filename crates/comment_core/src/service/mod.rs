//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and collaborator calls into comment use-cases.
//! - Keep boundary layers decoupled from storage details.

pub mod comment_service;
pub mod permission;

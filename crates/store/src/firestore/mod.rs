//! Firestore REST access: the typed document codec and the users collection reader.

pub mod client;
pub mod document;


pub use client::FirestoreUserDirectory;
pub use document::{Document, DocumentPath, Value};

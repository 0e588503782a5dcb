/// Markdown round-trip persistence for board and task-list documents.
///
/// A wiki page can embed kanban boards (`####` board, `#####` columns,
/// checkbox task lines with indentation nesting) or plain task lists.
/// This crate parses that markdown into a mutable in-memory model,
/// applies user actions to it, and writes it back while preserving the
/// untouched parts of the document byte-for-byte. The server is a dumb
/// whole-document store; saves are coordinated so only one round trip is
/// ever in flight.
pub mod cache;
pub mod identity;
pub mod mutate;
pub mod parser;
pub mod save;
pub mod serializer;
pub mod session;
pub mod store;
pub mod tasklist;
pub mod types;

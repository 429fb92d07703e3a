//! Static layout and the text formats describing layouts and dispatch plans.

pub mod layout;
pub mod layout_parser;
pub mod dispatch;

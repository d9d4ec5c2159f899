pub mod theme;

// Building blocks
pub mod component;
pub mod input;
pub mod keys;
pub mod rows;

// Panes
pub mod details;
pub mod paged;
pub mod table;
pub mod textarea;

// Floating layers
pub mod form;
pub mod overlay;

// Composition: page, service root
pub mod page;
pub mod root;

pub use theme::styles;

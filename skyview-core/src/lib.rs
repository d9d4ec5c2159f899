pub mod config;
pub mod error;
pub mod format;
pub mod fuzzy;
pub mod keymap;
pub mod profile;

// Resource model and remote contracts
pub mod gateway;
pub mod resource;

// View-independent state: paging, tables, focus, overlays
pub mod navigation;
pub mod overlay;
pub mod paginator;
pub mod table;

// Filter/key-condition builders and Insights polling
pub mod filter;
pub mod query;

// Cross-view drill-through
pub mod drill;

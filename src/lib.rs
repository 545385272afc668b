pub mod a11y;
pub mod config;
pub mod document;
pub mod error;
pub mod files;
pub mod graph;
pub mod html;
pub mod images;
pub mod layout;
pub mod lint;
pub mod livereload;
pub mod metadata;
pub mod pipeline;
pub mod scaffold;
pub mod scripts;
pub mod server;
pub mod sourcemap;
pub mod styles;
pub mod tasks;
pub mod templates;
pub mod watch;

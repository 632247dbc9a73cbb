//! Morpho resolves named views to template files, renders them with data and
//! optionally wraps the output in a labeled container element so it can be
//! embedded in a larger page.
//!
//! ```rust,ignore
//! use morpho::{Config, RenderOptions, TemplateManager};
//!
//! let views = TemplateManager::global().create(Config::new("templates/", "site/"));
//! // Renders templates/site/form/input.hbs to stdout as
//! // <div class="component-wrapper form-input">...</div>
//! views.render("form/input", &serde_json::json!({ "name": "email" }), &RenderOptions::default())?;
//! ```
//!
//! For Morpho's command line interface, see the `morpho-cli` crate.

mod collection;
mod config;
mod data;
mod error;
mod fs;
mod manager;
mod template;
mod view;

pub use collection::ViewCollection;
pub use config::{Config, Globals, PathPolicy, DEFAULT_EXTENSION};
pub use data::load_data;
pub use error::Error;
pub use manager::TemplateManager;
pub use template::{Templates, MAX_COMPONENT_DEPTH};
pub use view::{view_class_name, RenderOptions, View};

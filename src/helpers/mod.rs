//! Helper functions shared by the renderer, templates and generator

mod html;
mod path;
mod url;

pub use html::*;
pub use path::*;
pub use url::*;

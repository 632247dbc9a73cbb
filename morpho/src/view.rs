//! Morpho view-related functionality.

use std::fs;
use std::path::{Component, Path, PathBuf};

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::fs::maybe_canonicalize;
use crate::{Config, Error, PathPolicy, Templates};

/// Options controlling how a single view is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Whether to embed the rendered output in a labeled container element.
    pub wrap: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { wrap: true }
    }
}

impl RenderOptions {
    /// Options that leave rendered output untouched.
    pub fn unwrapped() -> Self {
        Self { wrap: false }
    }
}

/// A view is a named template file that is rendered with data to produce
/// markup.
///
/// Views are cheap to construct and are built fresh for every render.
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    path: PathBuf,
    // Directory the view must stay inside of. When the context is a file name
    // prefix rather than a directory, this is the directory holding it.
    root: PathBuf,
    // Part of `path` below `root`.
    relative: String,
    path_policy: PathPolicy,
}

impl View {
    /// Constructor. The view's path is `dir + context + name + "." +
    /// extension`, concatenated as plain strings.
    pub fn new<N: AsRef<str>>(config: &Config, name: N) -> Self {
        let name = name.as_ref().to_string();
        let root = config.root();
        let path = format!("{}{}.{}", root, name, config.extension);
        let split = root
            .rfind(std::path::is_separator)
            .map(|i| i + 1)
            .unwrap_or(0);
        let (root, relative) = path.split_at(split);
        let root = if root.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(root)
        };
        Self {
            name,
            relative: relative.to_string(),
            root,
            path: PathBuf::from(path),
            path_policy: config.path_policy,
        }
    }

    /// The name this view was requested by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path to the view's template file, failing if it does not
    /// exist or, under [`PathPolicy::Contained`], if it lies outside of the
    /// view root.
    ///
    /// Containment is checked before existence, so a name escaping the root
    /// fails the same way whether or not its target exists.
    pub fn path(&self) -> Result<&Path> {
        let contained = self.path_policy == PathPolicy::Contained;
        if contained && escapes_root(&self.relative) {
            return Err(self.outside_root(self.path.clone()).into());
        }
        if !self.path.exists() {
            return Err(Error::ViewNotFound(self.path.clone()).into());
        }
        if contained {
            self.ensure_canonically_contained()?;
        }
        Ok(&self.path)
    }

    // Catches symbolic links leading out of the root.
    fn ensure_canonically_contained(&self) -> Result<()> {
        let path = match maybe_canonicalize(&self.path)? {
            Some(path) => path,
            None => return Err(Error::ViewNotFound(self.path.clone()).into()),
        };
        match maybe_canonicalize(&self.root)? {
            Some(root) if !path.starts_with(&root) => Err(self.outside_root(path).into()),
            _ => Ok(()),
        }
    }

    fn outside_root(&self, path: PathBuf) -> Error {
        Error::ViewOutsideRoot {
            name: self.name.clone(),
            path,
            root: self.root.clone(),
        }
    }

    /// Renders the view with the given data and returns the produced text,
    /// wrapped if `options.wrap` is set.
    pub fn content<D: Serialize>(
        &self,
        templates: &Templates,
        data: &D,
        options: &RenderOptions,
    ) -> Result<String> {
        let path = self.path()?;
        debug!("Rendering view {} from {}", self.name, path.display());
        let source =
            fs::read_to_string(path).map_err(|e| Error::ViewRead(path.to_path_buf(), e))?;
        let content = templates.render(&self.name, &source, data)?;
        if options.wrap {
            Ok(self.wrap(&content))
        } else {
            Ok(content)
        }
    }

    /// Embeds the given content in a container labeled with this view's class
    /// name. Neither the content nor the class name is escaped.
    pub fn wrap(&self, content: &str) -> String {
        format!(
            "<div class=\"component-wrapper {}\">{}</div>",
            view_class_name(&self.name),
            content
        )
    }
}

// Whether walking `relative` from a directory ever climbs above it. Since view
// paths are concatenated strings, a leading separator only doubles the one
// before it and does not make the path absolute.
fn escapes_root(relative: &str) -> bool {
    let mut depth = 0_usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::Prefix(_) => return true,
        }
    }
    false
}

/// Derives a CSS class name from a view name: one leading `/` is dropped and
/// all remaining `/` become `-`.
pub fn view_class_name(name: &str) -> String {
    name.strip_prefix('/').unwrap_or(name).replace('/', "-")
}

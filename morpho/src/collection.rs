use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use eyre::Result;
use log::debug;
use serde::Serialize;

use crate::{Config, Error, RenderOptions, Templates, View};

/// A view collection renders views from a fixed directory/context pair.
///
/// Despite the name, no views are stored: every render builds a fresh
/// [`View`].
pub struct ViewCollection {
    config: Arc<Config>,
    templates: Templates,
}

impl ViewCollection {
    /// Constructor.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        debug!(
            "Creating view collection for {} (extension: {})",
            config.root(),
            config.extension
        );
        Self {
            templates: Templates::new(config.clone()),
            config,
        }
    }

    /// The configuration this collection was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The base directory for views.
    pub fn dir(&self) -> &str {
        &self.config.dir
    }

    /// The path segment inserted between the base directory and view names.
    pub fn context(&self) -> &str {
        &self.config.context
    }

    /// Build the view with the given name.
    pub fn view<N: AsRef<str>>(&self, name: N) -> View {
        View::new(&self.config, name)
    }

    /// Render the named view and return the result.
    pub fn content<N, D>(&self, name: N, data: &D, options: &RenderOptions) -> Result<String>
    where
        N: AsRef<str>,
        D: Serialize,
    {
        self.view(name).content(&self.templates, data, options)
    }

    /// Render the named view into the given writer. Nothing is written if
    /// rendering fails.
    pub fn render_to<W, N, D>(
        &self,
        writer: &mut W,
        name: N,
        data: &D,
        options: &RenderOptions,
    ) -> Result<()>
    where
        W: Write,
        N: AsRef<str>,
        D: Serialize,
    {
        let name = name.as_ref();
        let content = self.content(name, data, options)?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| Error::Output(name.to_string(), e))?;
        Ok(())
    }

    /// Render the named view to standard output.
    pub fn render<N, D>(&self, name: N, data: &D, options: &RenderOptions) -> Result<()>
    where
        N: AsRef<str>,
        D: Serialize,
    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, name, data, options)?;
        handle
            .flush()
            .map_err(|e| Error::Io("stdout".to_string(), e))?;
        Ok(())
    }

    /// Lists the names of all views available under this collection's
    /// directory and context, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let root = self.config.root();
        let pattern = format!("{}**/*.{}", root, self.config.extension);
        let suffix = format!(".{}", self.config.extension);
        let mut names = Vec::new();
        for entry_result in
            glob::glob(&pattern).map_err(|e| Error::ViewPattern(pattern.clone(), e))?
        {
            let entry = entry_result.map_err(|e| {
                let path = e.path().display().to_string();
                Error::Io(path, e.into())
            })?;
            if !entry.is_file() {
                continue;
            }
            if let Some(name) = view_name(&entry, &root, &suffix) {
                names.push(name);
            }
        }
        names.sort();
        debug!("Found {} view(s) under {}", names.len(), root);
        Ok(names)
    }
}

impl fmt::Debug for ViewCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCollection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Inverts the path concatenation performed by `View::new`.
fn view_name(path: &Path, root: &str, suffix: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()?;
    parts
        .join("/")
        .strip_suffix(suffix)
        .map(ToString::to_string)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{PathPolicy, MAX_COMPONENT_DEPTH};
    use serde_json::json;

    const VIEWS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/views");

    fn collection() -> ViewCollection {
        ViewCollection::new(Config::new(format!("{}/", VIEWS), "site/"))
    }

    fn render_to_string(
        collection: &ViewCollection,
        name: &str,
        data: &serde_json::Value,
        options: &RenderOptions,
    ) -> Result<String> {
        let mut out = Vec::new();
        collection.render_to(&mut out, name, data, options)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn accessors() {
        let collection = collection();
        assert_eq!(collection.dir(), format!("{}/", VIEWS));
        assert_eq!(collection.context(), "site/");
        assert_eq!(collection.config().path_policy, PathPolicy::Contained);
        assert_eq!(collection.view("widget").name(), "widget");
    }

    #[test]
    fn render_writes_wrapped_content() {
        let out = render_to_string(
            &collection(),
            "greeting",
            &json!({ "name": "world" }),
            &RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(
            out,
            r#"<div class="component-wrapper greeting">Hello, world!</div>"#
        );
    }

    #[test]
    fn render_writes_nothing_on_failure() {
        let mut out = Vec::new();
        let err = collection()
            .render_to(&mut out, "nope", &(), &RenderOptions::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ViewNotFound(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn content_matches_rendered_output() {
        let collection = collection();
        let data = json!({ "name": "world" });
        let content = collection
            .content("greeting", &data, &RenderOptions::unwrapped())
            .unwrap();
        let rendered =
            render_to_string(&collection, "greeting", &data, &RenderOptions::unwrapped())
                .unwrap();
        assert_eq!(content, "Hello, world!");
        assert_eq!(content, rendered);
    }

    #[test]
    fn components_are_wrapped_by_default() {
        let out = collection()
            .content(
                "page",
                &json!({ "field": { "name": "email" } }),
                &RenderOptions::unwrapped(),
            )
            .unwrap();
        assert_eq!(
            out,
            r#"<form><div class="component-wrapper form-input"><input name="email"></div></form>"#
        );
    }

    #[test]
    fn components_can_be_unwrapped() {
        let out = collection()
            .content("unwrapped", &(), &RenderOptions::unwrapped())
            .unwrap();
        assert_eq!(out, "[hello]");
    }

    #[test]
    fn missing_component_fails_rendering() {
        let err = collection()
            .content("dangling", &(), &RenderOptions::default())
            .unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::ViewRender(name, e)) => {
                assert_eq!(name, "dangling");
                let cause = std::error::Error::source(e).and_then(|c| c.downcast_ref::<Error>());
                assert!(matches!(
                    cause,
                    Some(Error::ViewNotFound(path)) if path.ends_with("site/missing.hbs")
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn escaping_component_fails_rendering() {
        let err = collection()
            .content("escape", &(), &RenderOptions::default())
            .unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::ViewRender(_, e)) => {
                let cause = std::error::Error::source(e).and_then(|c| c.downcast_ref::<Error>());
                assert!(matches!(cause, Some(Error::ViewOutsideRoot { .. })));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn recursive_components_are_bounded() {
        let err = collection()
            .content("recursive", &(), &RenderOptions::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ViewRender(_, _))
        ));
        // The nesting counter is restored, so rendering continues to work.
        assert_eq!(
            collection()
                .content("unwrapped", &(), &RenderOptions::unwrapped())
                .unwrap(),
            "[hello]"
        );
    }

    // Builds data that makes the `nest` view include itself `levels` times.
    fn nested(levels: usize) -> serde_json::Value {
        let mut data = json!({ "last": true });
        for _ in 0..levels {
            data = json!({ "next": data });
        }
        data
    }

    #[test]
    fn components_nest_up_to_the_limit() {
        let collection = collection();
        let out = collection
            .content("nest", &nested(MAX_COMPONENT_DEPTH), &RenderOptions::unwrapped())
            .unwrap();
        assert_eq!(out, "x".repeat(MAX_COMPONENT_DEPTH + 1));

        let err = collection
            .content(
                "nest",
                &nested(MAX_COMPONENT_DEPTH + 1),
                &RenderOptions::unwrapped(),
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ViewRender(name, _)) if name == "nest"
        ));

        // The failed render left the counter where it started.
        let out = collection
            .content("nest", &nested(MAX_COMPONENT_DEPTH), &RenderOptions::unwrapped())
            .unwrap();
        assert_eq!(out, "x".repeat(MAX_COMPONENT_DEPTH + 1));
    }

    #[test]
    fn globals_reach_views() {
        let config = Config::new(format!("{}/", VIEWS), "site/")
            .with_global("siteName", "Morpho")
            .unwrap();
        let out = ViewCollection::new(config)
            .content("site-name", &(), &RenderOptions::unwrapped())
            .unwrap();
        assert_eq!(out, "Morpho");
    }

    #[test]
    fn markdown_data_renders_through_views() {
        let out = collection()
            .content(
                "article",
                &json!({ "body": "# Title" }),
                &RenderOptions::unwrapped(),
            )
            .unwrap();
        assert_eq!(out, "<h1>Title</h1>\n");
    }

    #[test]
    fn lists_view_names() {
        let names = collection().names().unwrap();
        assert!(names.contains(&"widget".to_string()));
        assert!(names.contains(&"form/input".to_string()));
        assert!(names.contains(&"a/b/c".to_string()));
        assert!(!names.iter().any(|n| n.contains("secret")));
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}

//! Template engine and template helpers.

use std::cell::Cell;
use std::fs;
use std::sync::Arc;

use eyre::Result;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
};
use log::trace;
use pulldown_cmark::{Options, Parser};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use time::{format_description, Date, PrimitiveDateTime};

use crate::view::{view_class_name, View};
use crate::{Config, Error};

/// How deeply `component` helper calls may nest before rendering fails.
pub const MAX_COMPONENT_DEPTH: usize = 16;

/// Key under which configured globals are exposed to views.
const GLOBALS_KEY: &str = "config";

/// Renders view sources through [Handlebars](https://handlebarsjs.com/).
///
/// View sources are compiled on every render; nothing is cached between
/// calls.
pub struct Templates {
    hb: Handlebars<'static>,
    globals: Map<String, JsonValue>,
}

impl Templates {
    /// Constructor. Registers all of Morpho's helpers.
    pub fn new(config: Arc<Config>) -> Self {
        let globals: Map<String, JsonValue> = config.globals.clone().into();
        let mut hb = Handlebars::new();
        hb.set_strict_mode(config.strict);
        hb.register_helper("class_name", Box::new(class_name));
        hb.register_helper("markdown", Box::new(markdown));
        hb.register_helper("pad", Box::new(pad));
        hb.register_helper("format_date", Box::new(format_date));
        hb.register_helper("format_date_time", Box::new(format_date_time));
        hb.register_helper(
            "component",
            Box::new(Component {
                config,
                globals: globals.clone(),
            }),
        );
        Self { hb, globals }
    }

    /// Render the given view source with the given data, returning the
    /// produced text.
    pub fn render<D: Serialize>(&self, name: &str, source: &str, data: &D) -> Result<String> {
        let data = serde_json::to_value(data).map_err(Error::from)?;
        let rendered = render_source(&self.hb, &self.globals, source, data)
            .map_err(|e| Error::ViewRender(name.to_string(), e))?;
        trace!("View {} rendered {} bytes", name, rendered.len());
        Ok(rendered)
    }
}

fn render_source(
    hb: &Handlebars,
    globals: &Map<String, JsonValue>,
    source: &str,
    data: JsonValue,
) -> Result<String, RenderError> {
    hb.render_template(source, &with_globals(data, globals))
}

// Globals never shadow a `config` field supplied by the caller. Data that is
// neither an object nor null is passed through untouched.
fn with_globals(data: JsonValue, globals: &Map<String, JsonValue>) -> JsonValue {
    if globals.is_empty() {
        return data;
    }
    let mut obj = match data {
        JsonValue::Object(obj) => obj,
        JsonValue::Null => Map::new(),
        other => return other,
    };
    obj.entry(GLOBALS_KEY)
        .or_insert_with(|| JsonValue::Object(globals.clone()));
    JsonValue::Object(obj)
}

thread_local! {
    static COMPONENT_DEPTH: Cell<usize> = Cell::new(0);
}

// Tracks one level of component nesting for as long as it is alive.
struct DepthGuard;

impl DepthGuard {
    fn enter(name: &str) -> Result<Self, RenderError> {
        COMPONENT_DEPTH.with(|depth| {
            if depth.get() >= MAX_COMPONENT_DEPTH {
                return Err(RenderError::new(format!(
                    "component \"{}\" exceeds the maximum nesting depth of {}",
                    name, MAX_COMPONENT_DEPTH
                )));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        COMPONENT_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Renders another view from the same view root in place.
///
/// Usage:
///
/// ```handlebars
/// {{component "form/input" field wrap=false}}
/// ```
///
/// The data parameter is optional and defaults to the current context. The
/// component is wrapped unless `wrap=false` is given. Output is not escaped.
struct Component {
    config: Arc<Config>,
    globals: Map<String, JsonValue>,
}

impl HelperDef for Component {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let name = str_param(h, 0, "component")?;
        let data = h
            .param(1)
            .map(|p| p.value().clone())
            .unwrap_or_else(|| ctx.data().clone());
        let wrap = h
            .hash_get("wrap")
            .and_then(|w| w.value().as_bool())
            .unwrap_or(true);

        let view = View::new(&self.config, name);
        let path = view.path().map_err(|e| component_error(name, e))?;
        let source = fs::read_to_string(path).map_err(|e| {
            component_error(name, Error::ViewRead(path.to_path_buf(), e).into())
        })?;

        let _guard = DepthGuard::enter(name)?;
        let content = render_source(r, &self.globals, &source, data)?;
        if wrap {
            out.write(&view.wrap(&content))?;
        } else {
            out.write(&content)?;
        }
        Ok(())
    }
}

// Keeps Morpho's own errors as the cause so callers can still match on them.
fn component_error(name: &str, report: eyre::Report) -> RenderError {
    match report.downcast::<Error>() {
        Ok(e) => RenderError::from_error(&format!("component \"{}\": {}", name, e), e),
        Err(report) => RenderError::new(format!("component \"{}\": {}", name, report)),
    }
}

fn str_param<'a>(h: &'a Helper, idx: usize, helper: &str) -> Result<&'a str, RenderError> {
    h.param(idx)
        .and_then(|p| p.value().as_str())
        .ok_or_else(|| {
            RenderError::new(format!(
                "{}: expected a string as parameter {}",
                helper, idx
            ))
        })
}

/// Derives a CSS class name from a view name.
///
/// Usage:
///
/// ```handlebars
/// {{ class_name "form/input" }}
/// ```
///
/// Produces `form-input`.
pub fn class_name(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let name = str_param(h, 0, "class_name")?;
    out.write(&view_class_name(name))?;
    Ok(())
}

/// Converts Markdown to HTML.
///
/// Usage:
///
/// ```handlebars
/// {{ markdown content }}
/// ```
pub fn markdown(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let content = str_param(h, 0, "markdown")?;
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_HEADING_ATTRIBUTES;
    let parser = Parser::new_ext(content, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    out.write(&html)?;
    Ok(())
}

/// Parses a string as a date and formats it according to a formatting rule.
///
/// Usage:
///
/// ```handlebars
/// {{ format_date "2022-01-01" "[month repr:long] [day padding:none], [year]" }}
/// ```
///
/// Produces `January 1, 2022`.
///
/// The formatting rule is defined by the
/// [`time`](https://crates.io/crates/time) crate. See [the
/// docs](https://time-rs.github.io/book/api/format-description.html) for more
/// details.
pub fn format_date(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = str_param(h, 0, "format_date")?;
    let description = str_param(h, 1, "format_date")?;
    let formatted = format_date_str(value, description)
        .map_err(|e| RenderError::new(format!("format_date: {}", e)))?;
    out.write(&formatted)?;
    Ok(())
}

/// Parses a string as a timestamp (with date and time) and formats it according
/// to a formatting rule.
///
/// Usage:
///
/// ```handlebars
/// {{ format_date_time "2022-01-01T14:00" "[month repr:long] [day padding:none], [year] at [hour repr:24]:[minute padding:zero]" }}
/// ```
///
/// Produces `January 1, 2022 at 14:00`. Seconds are optional in the input.
pub fn format_date_time(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = str_param(h, 0, "format_date_time")?;
    let description = str_param(h, 1, "format_date_time")?;
    let formatted = format_date_time_str(value, description)
        .map_err(|e| RenderError::new(format!("format_date_time: {}", e)))?;
    out.write(&formatted)?;
    Ok(())
}

fn format_date_str(value: &str, description: &str) -> Result<String, String> {
    let input = format_description::parse_borrowed::<1>("[year]-[month]-[day]")
        .map_err(|e| e.to_string())?;
    let date = Date::parse(value, &input).map_err(|e| e.to_string())?;
    let output =
        format_description::parse_borrowed::<1>(description).map_err(|e| e.to_string())?;
    date.format(&output).map_err(|e| e.to_string())
}

fn format_date_time_str(value: &str, description: &str) -> Result<String, String> {
    const INPUT_FORMATS: &[&str] = &[
        "[year]-[month]-[day]T[hour]:[minute]:[second]",
        "[year]-[month]-[day]T[hour]:[minute]",
    ];
    let mut last_err = String::new();
    for input in INPUT_FORMATS {
        let input = format_description::parse_borrowed::<1>(input).map_err(|e| e.to_string())?;
        match PrimitiveDateTime::parse(value, &input) {
            Ok(dt) => {
                let output = format_description::parse_borrowed::<1>(description)
                    .map_err(|e| e.to_string())?;
                return dt.format(&output).map_err(|e| e.to_string());
            }
            Err(e) => last_err = e.to_string(),
        }
    }
    Err(last_err)
}

/// Pad a string with a given character or string until it meets the specified
/// length.
///
/// Usage:
///
/// ```handlebars
/// {{ pad "2" "0" 2 }}
/// ```
///
/// Produces `02`. Parameters are in the format
/// `{{ pad string paddingCharOrString desiredMinLength }}`
pub fn pad(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = match h.param(0).map(|p| p.value()) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => return Err(RenderError::new("pad: missing value to pad")),
    };
    let padding = str_param(h, 1, "pad")?;
    let length = h
        .param(2)
        .and_then(|p| p.value().as_u64())
        .ok_or_else(|| RenderError::new("pad: expected a length as parameter 2"))?;
    out.write(&pad_start(&value, padding, length as usize))?;
    Ok(())
}

fn pad_start(value: &str, padding: &str, length: usize) -> String {
    let len = value.chars().count();
    if padding.is_empty() || len >= length {
        return value.to_string();
    }
    let prefix = padding
        .chars()
        .cycle()
        .take(length - len)
        .collect::<String>();
    format!("{}{}", prefix, value)
}

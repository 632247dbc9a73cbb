use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::Result;
use morpho::{load_data, Config, RenderOptions, TemplateManager};
use serde_json::Value as JsonValue;

const DEFAULT_CONFIG_FILE: &str = "morpho.yml";

#[derive(Parser, Debug)]
#[clap(name = "morpho", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Configuration file to load. Skipped if it does not exist.
    #[clap(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Base directory for views (overrides the configuration file).
    #[clap(short, long)]
    dir: Option<String>,

    /// Path segment between the base directory and view names (overrides the
    /// configuration file).
    #[clap(short = 'x', long)]
    context: Option<String>,

    /// JSON, YAML or Markdown file providing data to the views.
    #[clap(long)]
    data: Option<PathBuf>,

    /// Emit rendered output without the component wrapper.
    #[clap(long)]
    no_wrap: bool,

    /// List the available views instead of rendering.
    #[clap(short, long)]
    list: bool,

    /// Which view(s) to render.
    views: Vec<String>,
}

fn main() {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })
    .unwrap();

    if let Err(e) = run(&args) {
        log::error!("Failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let views = TemplateManager::global().create(config);

    if args.list {
        for name in views.names()? {
            println!("{}", name);
        }
        return Ok(());
    }
    if args.views.is_empty() {
        log::warn!("No views given, nothing to render");
        return Ok(());
    }

    let data = match &args.data {
        Some(path) => load_data(path)?,
        None => JsonValue::Null,
    };
    let options = RenderOptions {
        wrap: !args.no_wrap,
    };
    let views = TemplateManager::global().views()?;
    for name in &args.views {
        views.render(name, &data, &options)?;
        log::debug!("Rendered view {}", name);
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = if Path::new(&args.config).exists() {
        Config::load_from_file(&args.config)?
    } else {
        log::debug!(
            "No such configuration file, using defaults: {}",
            args.config.display()
        );
        Config::default()
    };
    if let Some(dir) = &args.dir {
        config.dir = dir.clone();
    }
    if let Some(context) = &args.context {
        config.context = context.clone();
    }
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_render_args() {
        let args = Args::parse_from([
            "morpho",
            "-v",
            "--dir",
            "views/",
            "-x",
            "site/",
            "--no-wrap",
            "form/input",
            "widget",
        ]);
        assert!(args.verbose);
        assert!(args.no_wrap);
        assert!(!args.list);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(args.views, vec!["form/input", "widget"]);
    }

    #[test]
    fn overrides_apply_to_missing_config_file() {
        let args = Args::parse_from([
            "morpho",
            "--config",
            "does-not-exist.yml",
            "--dir",
            "views/",
            "--context",
            "site/",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.dir, "views/");
        assert_eq!(config.context, "site/");
        assert_eq!(config.extension, morpho::DEFAULT_EXTENSION);
    }
}

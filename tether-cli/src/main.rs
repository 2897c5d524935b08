//! Tether CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tether_callable::WILDCARD;
use tether_config::{load_and_merge, load_config, AppConfig};
use tether_runtime::App;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Inspect Tether configurations and generate client scripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration files, merged in order (later files win)
    #[arg(
        short,
        long = "config",
        global = true,
        env = "TETHER_CONFIG",
        value_delimiter = ',',
        default_value = "tether.yaml"
    )]
    configs: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and scan the configuration
    Check,

    /// Print the hash naming the generated client script
    Hash {
        /// Print the callable repository hash instead
        #[arg(long)]
        repository: bool,
    },

    /// Print the merged options of a class method
    Options {
        /// Class name, client-facing (`App.Admin.Users`) or qualified
        #[arg(long)]
        class: String,

        /// Method name; the class-wide options when omitted
        #[arg(long)]
        method: Option<String>,
    },

    /// Generate the client script
    Script {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let app = build_app(&cli.configs)?;

    match cli.command {
        Commands::Check => {
            print!("{}", check_report(&app)?);
        }

        Commands::Hash { repository } => {
            let hash = if repository {
                app.repository().invalidation_hash()?
            } else {
                app.script_hash()?
            };
            println!("{hash}");
        }

        Commands::Options { class, method } => {
            let report = options_report(&app, &class, method.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Script { output } => {
            let script = app.script()?;
            match output {
                Some(path) => {
                    fs::write(&path, script)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Script written");
                }
                None => print!("{script}"),
            }
        }
    }

    Ok(())
}

fn load(paths: &[PathBuf]) -> Result<AppConfig> {
    let config = match paths {
        [single] => load_config(single)
            .with_context(|| format!("Invalid configuration {}", single.display()))?,
        many => load_and_merge(many.to_vec()).context("Invalid configuration")?,
    };
    Ok(config)
}

fn build_app(paths: &[PathBuf]) -> Result<App> {
    let config = load(paths)?;
    tracing::debug!(
        files = paths.len(),
        classes = config.classes.len(),
        functions = config.functions.len(),
        "Configuration loaded"
    );

    let app = App::builder().config(config).build()?;
    Ok(app)
}

fn check_report(app: &App) -> Result<String> {
    let classes = app.repository().class_names()?;
    let stats = app.repository().stats();
    let hash = app.repository().invalidation_hash()?;

    let mut report = String::from("Configuration is valid\n");
    report.push_str(&format!("  Plugins:     {}\n", app.plugins().len()));
    report.push_str(&format!("  Classes:     {}\n", classes.len()));
    report.push_str(&format!("  Functions:   {}\n", stats.functions));
    report.push_str(&format!("  Directories: {}\n", stats.directories));
    report.push_str(&format!("  Namespaces:  {}\n", stats.namespaces));
    report.push_str(&format!("  Hash:        {hash}\n"));
    Ok(report)
}

fn options_report(app: &App, class: &str, method: Option<&str>) -> Result<Value> {
    let entity = app
        .entity(class)
        .with_context(|| format!("Unknown class {class}"))?;
    let method = method.unwrap_or(WILDCARD);
    let callable = method == WILDCARD || entity.is_callable(method);

    Ok(json!({
        "class": entity.qualified_name(),
        "external": entity.external_name(),
        "method": method,
        "callable": callable,
        "options": entity.options_for(method),
    }))
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into()))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
core:
  prefix:
    class: "App"
  options:
    tags: ["web"]

classes:
  "app::Sample":
    protected: ["secret"]
    tags: ["sample"]
    methods:
      save:
        mode: "write"
      secret: {}

functions:
  ping: {}
"#;

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "{CONFIG}").unwrap();
        file
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "tether",
            "--config",
            "a.yaml,b.toml",
            "options",
            "--class",
            "App.Sample",
            "--method",
            "save",
        ])
        .unwrap();
        assert_eq!(cli.configs, vec![PathBuf::from("a.yaml"), PathBuf::from("b.toml")]);
        assert!(matches!(cli.command, Commands::Options { .. }));
    }

    #[test]
    fn test_check_report() {
        let file = config_file();
        let app = build_app(&[file.path().to_path_buf()]).unwrap();

        let report = check_report(&app).unwrap();
        assert!(report.starts_with("Configuration is valid"));
        assert!(report.contains("Classes:     1"));
        assert!(report.contains("Functions:   1"));
    }

    #[test]
    fn test_options_report() {
        let file = config_file();
        let app = build_app(&[file.path().to_path_buf()]).unwrap();

        let report = options_report(&app, "App.Sample", Some("save")).unwrap();
        assert_eq!(report["class"], json!("app::Sample"));
        assert_eq!(report["callable"], json!(true));
        assert_eq!(report["options"]["mode"], json!("write"));
        assert_eq!(report["options"]["tags"], json!(["web", "sample"]));

        let report = options_report(&app, "App.Sample", Some("secret")).unwrap();
        assert_eq!(report["callable"], json!(false));

        assert!(options_report(&app, "App.Missing", None).is_err());
    }

    #[test]
    fn test_script_for_configured_classes() {
        let file = config_file();
        let app = build_app(&[file.path().to_path_buf()]).unwrap();

        let script = app.script().unwrap();
        assert!(script.contains("window.App.App.Sample.save = function()"));
        assert!(script.contains("window.tether_ping = function()"));
        assert!(!script.contains("Sample.secret"));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(build_app(&[PathBuf::from("/nonexistent/tether.yaml")]).is_err());
    }
}

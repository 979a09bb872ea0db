//! codesum CLI - Summarize a codebase for LLM context.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use codesum::builder::Codesum;
use codesum::config::{
    self, require_root, Config, ExtractorKind, API_BASE_ENV, API_KEY_ENV, ROOT_ENV,
};
use codesum::errors::{exit_code, CodesumError};
use codesum::output::{write_artifact, write_summaries};
use codesum::summarize::{completion_summarizer, FileSummary, DEFAULT_API_BASE, DEFAULT_MODEL};
use codesum::tokens::{ArtifactSize, Encoding};
use codesum::tree::NumberedLine;
use codesum::walker::PathBase;
use codesum::logging;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "codesum")]
#[command(about = "Summarize a codebase as a numbered tree and per-file descriptions")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that walks the codebase.
#[derive(Args)]
struct WalkArgs {
    /// Codebase root to scan
    #[arg(long, env = ROOT_ENV)]
    root: Option<PathBuf>,

    /// Additional ignore file, applied after .gitignore and .ignore (repeatable)
    #[arg(long = "ignore-file")]
    ignore_files: Vec<PathBuf>,

    /// Filter files only; still traverse directories matched by ignore rules
    #[arg(long)]
    no_prune: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Directory that receives the artifacts
    #[arg(long, default_value = config::OUTPUT_DIR)]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the numbered directory tree
    Tree {
        #[command(flatten)]
        walk: WalkArgs,

        /// What tree paths are relative to
        #[arg(long, value_enum, default_value = "parent")]
        base: BaseArg,

        /// Print the tree instead of writing the artifact
        #[arg(long)]
        stdout: bool,

        /// Print numbered lines as JSON instead of writing the artifact
        #[arg(long)]
        json: bool,

        /// Token encoding for the size report
        #[arg(long, default_value = "cl100k")]
        encoding: EncodingArg,
    },

    /// Describe each script file's components with a completion model
    Summarize {
        #[command(flatten)]
        walk: WalkArgs,

        /// Glob patterns selecting files to summarize [default: *.js,*.jsx]
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Completion model
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Maximum tokens per summary
        #[arg(long, default_value_t = 60)]
        max_tokens: u32,

        /// Completion API base URL
        #[arg(long, env = API_BASE_ENV, default_value = DEFAULT_API_BASE)]
        api_base: String,

        /// Completion API key
        #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
        api_key: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Component extractor
        #[arg(long, value_enum, default_value = "tree-sitter")]
        extractor: ExtractorArg,

        /// Script run by the node extractor
        #[arg(long, default_value = "scripts/parse.js")]
        node_script: PathBuf,

        /// Interpreter for the node extractor
        #[arg(long, default_value = "node")]
        node_program: String,

        /// Also print the summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum BaseArg {
    Root,
    Parent,
}

impl From<BaseArg> for PathBase {
    fn from(arg: BaseArg) -> Self {
        match arg {
            BaseArg::Root => PathBase::Root,
            BaseArg::Parent => PathBase::Parent,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum EncodingArg {
    Cl100k,
    O200k,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Cl100k => Encoding::Cl100kBase,
            EncodingArg::O200k => Encoding::O200kBase,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum ExtractorArg {
    TreeSitter,
    Node,
}

fn main() {
    // Before parsing, so `env` fallbacks see values from `.env`.
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match dotenv {
        Ok(Some(path)) => debug!(path = %path.display(), "using .env"),
        Ok(None) => {}
        Err(e) => warn!("failed to load .env: {e}"),
    }

    let json_output = json_flag(&cli.command);

    let result = match cli.command {
        Commands::Tree {
            walk,
            base,
            stdout,
            json,
            encoding,
        } => run_tree(walk, base.into(), stdout, json, encoding.into()),
        Commands::Summarize {
            walk,
            include,
            model,
            max_tokens,
            api_base,
            api_key,
            timeout,
            extractor,
            node_script,
            node_program,
            json,
        } => {
            let extractor = match extractor {
                ExtractorArg::TreeSitter => ExtractorKind::TreeSitter,
                ExtractorArg::Node => ExtractorKind::NodeScript {
                    program: node_program,
                    script: node_script,
                },
            };
            build_config(walk).and_then(|mut config| {
                if !include.is_empty() {
                    config.include = include;
                }
                config.extractor = extractor;
                config.completion.model = model;
                config.completion.max_tokens = max_tokens;
                config.completion.api_base = api_base;
                config.completion.api_key = api_key.filter(|k| !k.is_empty());
                config.completion.timeout = Duration::from_secs(timeout);
                run_summarize(&config, json)
            })
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "codesum", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Tree { json, .. } => *json,
        Commands::Summarize { json, .. } => *json,
        Commands::Completions { .. } => false,
    }
}

fn build_config(walk: WalkArgs) -> Result<Config, CodesumError> {
    let mut config = Config::new(require_root(walk.root)?);
    config.ignore_files.extend(walk.ignore_files);
    config.walk.prune_ignored_dirs = !walk.no_prune;
    config.walk.include_hidden = !walk.skip_hidden;
    config.walk.max_depth = walk.max_depth;
    config.output_dir = walk.output_dir;
    Ok(config)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CodesumError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CodesumError::Io(std::io::Error::other(e.to_string())))
}

// --- Tree command ---

fn run_tree(
    walk: WalkArgs,
    base: PathBase,
    stdout: bool,
    json: bool,
    encoding: Encoding,
) -> Result<(), CodesumError> {
    let mut config = build_config(walk)?;
    config.walk.base = base;
    config.encoding = encoding;
    config.validate()?;

    let summary = Codesum::from_config(&config).tree()?;
    let document = summary.document();
    let size = ArtifactSize::measure(&document, config.encoding);
    info!(entries = summary.lines.len(), %size, "rendered tree");

    if json {
        #[derive(Serialize)]
        struct Output<'a> {
            root: String,
            size: ArtifactSize,
            lines: &'a [NumberedLine],
            failures: Vec<String>,
        }

        let output = Output {
            root: config.root.display().to_string(),
            size,
            lines: &summary.lines,
            failures: summary.failures.iter().map(|e| e.to_string()).collect(),
        };
        println!("{}", to_json(&output)?);
    } else if stdout {
        print!("{document}");
    } else {
        let path = config.tree_artifact_path();
        write_artifact(&path, &document)?;
        println!(
            "Wrote {} ({} entries, {})",
            path.display(),
            summary.lines.len(),
            size
        );
    }

    Ok(())
}

// --- Summarize command ---

fn run_summarize(config: &Config, json: bool) -> Result<(), CodesumError> {
    config.validate()?;
    if config.completion.api_key.is_none() {
        warn!("{API_KEY_ENV} is not set; file summaries will be placeholders");
    }

    let include = config.include_patterns()?;
    let extractor = config.component_extractor();
    let summarizer = completion_summarizer(config.completion.clone());

    let report =
        Codesum::from_config(config).summarize(&include, extractor.as_ref(), summarizer.as_ref())?;

    let path = config.summaries_artifact_path();
    write_summaries(&path, &report.summaries)?;

    if json {
        #[derive(Serialize)]
        struct Output<'a> {
            artifact: String,
            summaries: &'a [FileSummary],
            failures: Vec<String>,
        }

        let output = Output {
            artifact: path.display().to_string(),
            summaries: &report.summaries,
            failures: report.failures.iter().map(|e| e.to_string()).collect(),
        };
        println!("{}", to_json(&output)?);
    } else {
        let described = report
            .summaries
            .iter()
            .filter(|s| s.summary.is_some())
            .count();
        println!(
            "Wrote {} ({} files, {} described)",
            path.display(),
            report.summaries.len(),
            described
        );
    }

    Ok(())
}

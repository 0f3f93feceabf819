mod error;
mod gitlab;
mod gitlab_config;
mod theme;
mod ui;
mod util;
mod viewer;
mod widgets;

use clap::{Arg, ArgAction, ArgMatches, Command};
use error::{Error, Result};
use git2::Repository;
use gitlab::GitLabClient;
use gitlab_config::{current_ref, Connection, GitLabConfig, RemoteInfo};
use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::PathBuf;
use std::sync::Arc;
use viewer::stack::PipelineRef;
use viewer::Header;
use yansi::Paint;

const LOG_DIR: &str = "glab-cli";
const LOG_FILE: &str = "ci-view.log";

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("glab")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Work seamlessly with GitLab from the command line.")
        .subcommand_required(true)
        .subcommand(
            Command::new("ci")
                .about("Work with GitLab CI/CD pipelines and jobs.")
                .subcommand_required(true)
                .subcommand(
                    Command::new("view")
                        .about("View, run, trace, log, and cancel CI/CD job's current pipeline.")
                        .arg(
                            Arg::new("ref")
                                .value_name("REF")
                                .help("Branch or tag to show the latest pipeline of."),
                        )
                        .arg(
                            Arg::new("branch")
                                .short('b')
                                .long("branch")
                                .value_name("REF")
                                .help("Check pipeline status for a branch or tag. Defaults to the current branch."),
                        )
                        .arg(
                            Arg::new("web")
                                .short('w')
                                .long("web")
                                .action(ArgAction::SetTrue)
                                .help("Open pipeline in a browser."),
                        )
                        .arg(
                            Arg::new("repo")
                                .short('R')
                                .long("repo")
                                .value_name("GROUP/PROJECT")
                                .help("Select another repository."),
                        )
                        .arg(
                            Arg::new("debug")
                                .long("debug")
                                .action(ArgAction::SetTrue)
                                .help("Write debug output to the log file."),
                        ),
                ),
        )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewOptions {
    ref_name: Option<String>,
    web: bool,
    repo: Option<String>,
    debug: bool,
}

impl ViewOptions {
    fn from_matches(matches: &ArgMatches) -> Option<Self> {
        let (_, ci) = matches.subcommand()?;
        let (_, view) = ci.subcommand()?;
        Some(Self {
            ref_name: view
                .get_one::<String>("ref")
                .or_else(|| view.get_one::<String>("branch"))
                .cloned(),
            web: view.get_flag("web"),
            repo: view.get_one::<String>("repo").cloned(),
            debug: view.get_flag("debug"),
        })
    }
}

fn setup_logging(debug: bool) -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?
        .join(LOG_DIR);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(LOG_FILE);

    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}",
        )))
        .build(&path)?;
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| Error::Config(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| Error::Config(e.to_string()))?;
    Ok(path)
}

/// Puts the terminal back before the default hook prints the panic.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = viewer::restore_terminal();
        log::error!("panic: {}", info);
        default_hook(info);
    }));
}

fn browser_command(os: &str) -> (&'static str, &'static [&'static str]) {
    match os {
        "macos" => ("open", &[]),
        "windows" => ("cmd", &["/C", "start", ""]),
        _ => ("xdg-open", &[]),
    }
}

fn open_in_browser(url: &str) -> Result<()> {
    let (program, args) = browser_command(std::env::consts::OS);
    let status = std::process::Command::new(program)
        .args(args)
        .arg(url)
        .status()
        .map_err(|e| Error::Browser(format!("{}: {}", program, e)))?;
    if !status.success() {
        return Err(Error::Browser(format!("{} exited with {}", program, status)));
    }
    Ok(())
}

fn run() -> Result<()> {
    let matches = cli().get_matches();
    let opts = ViewOptions::from_matches(&matches).unwrap_or_default();

    let debug = opts.debug || std::env::var("GLAB_DEBUG").is_ok_and(|v| v == "1");
    match setup_logging(debug) {
        Ok(path) => log::info!("glab {} logging to {}", env!("CARGO_PKG_VERSION"), path.display()),
        Err(e) => eprintln!("{} logging disabled: {}", "warning:".yellow(), e),
    }

    let repo = Repository::discover(".").ok();
    let remote = repo.as_ref().and_then(RemoteInfo::from_repository);
    let config = GitLabConfig::load()?;
    let conn = Connection::resolve(&config, remote.as_ref(), &|var| std::env::var(var).ok())?;

    let project = opts
        .repo
        .clone()
        .or_else(|| remote.as_ref().map(|r| r.project.clone()))
        .ok_or_else(|| {
            Error::Config(
                "Could not determine the project: run inside a GitLab repository or pass --repo"
                    .to_string(),
            )
        })?;
    let ref_name = match opts.ref_name.clone() {
        Some(ref_name) => ref_name,
        None => {
            let repo = repo.as_ref().ok_or_else(|| {
                Error::Config("Not inside a git repository: pass a branch with --branch".to_string())
            })?;
            current_ref(repo)?
        }
    };
    log::info!("{}: latest pipeline of {} on {}", conn.host, ref_name, project);

    let client = GitLabClient::new(&conn.base_url, &conn.token)?;
    let pipeline = client.latest_pipeline(&project, &ref_name)?;

    if opts.web {
        let url = pipeline
            .web_url
            .ok_or_else(|| Error::Browser(format!("pipeline #{} has no web URL", pipeline.id)))?;
        println!("Opening {} in your browser.", url);
        return open_in_browser(&url);
    }

    install_panic_hook();
    let root = PipelineRef::new(pipeline.id, project.clone());
    let result = viewer::run(
        Arc::new(client),
        root,
        Header { project, ref_name },
        config.refresh_interval(),
    );
    if let Err(e) = &result {
        log::error!("viewer stopped: {}", e);
    }
    result
}

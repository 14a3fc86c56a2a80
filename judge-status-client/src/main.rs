#[cfg(feature = "codeforces")]
mod data_codeforces;
mod data_mock;
mod error;
pub mod util;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::util;
    pub use byte_unit::Byte;
    pub use cfg_if::cfg_if;
    pub use log::{debug, error, info, trace, warn};
    pub use serde::Deserialize;
    pub use std::path::{Path, PathBuf};
    pub use std::time::Duration;
}

use clap::{ArgEnum, Args, Parser};
use judge_status::{Actor, Engine, RemoteStatusGateway, Target, TrackerConfig};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target as ConsoleTarget},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use prelude::*;
use std::process::exit;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ArgEnum, Deserialize)]
enum DataSource {
    Codeforces,
    Mock,
}

#[derive(serde_with::DeserializeFromStr, Debug, Clone, Copy)]
struct LogLevel(log::LevelFilter);

impl std::str::FromStr for LogLevel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "error" | "Error" => Self(log::LevelFilter::Error),
            "warn" | "Warn" => Self(log::LevelFilter::Warn),
            "info" | "Info" => Self(log::LevelFilter::Info),
            "debug" | "Debug" => Self(log::LevelFilter::Debug),
            "trace" | "Trace" => Self(log::LevelFilter::Trace),
            _ => return Err(Error::BadLogLevel(s.to_string())),
        })
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        l.0
    }
}

#[derive(Debug, Default, Args, Deserialize)]
struct Flags {
    #[clap(long, arg_enum)]
    data_source: Option<DataSource>,
    /// Only load the history, don't track the latest submission.
    #[clap(long)]
    #[serde(default)]
    history_only: bool,
    /// Dump the log onto stderr.
    #[clap(long)]
    #[serde(default)]
    stderr: Option<bool>,
    /// Log level.
    #[clap(long)]
    log_level: Option<LogLevel>,
    /// Also write the log into this file.
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct Cli {
    /// Whose submissions to track.
    handle: String,
    /// The problem, like 1850A.
    target: String,
    /// Config file.
    #[clap(long, parse(from_os_str))]
    etc: Option<PathBuf>,

    #[clap(flatten)]
    cfg: Flags,
}

fn codeforces_api() -> String {
    "https://codeforces.com/api".to_owned()
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct Codeforces {
    #[serde(default = "codeforces_api")]
    api_base: String,
}

impl Default for Codeforces {
    fn default() -> Self {
        Self {
            api_base: codeforces_api(),
        }
    }
}

fn current_dir() -> PathBuf {
    ".".into()
}

#[derive(Debug, Deserialize)]
struct Mock {
    /// Directory holding `<handle>.toml`.
    #[serde(default = "current_dir")]
    dir: PathBuf,
}

impl Default for Mock {
    fn default() -> Self {
        Self { dir: current_dir() }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    config: Flags,
    #[serde(default)]
    tracker: TrackerConfig,
    #[serde(default)]
    codeforces: Codeforces,
    #[serde(default)]
    mock: Mock,
}

impl ConfigFile {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = util::load_file(path)?;
        toml::from_str(&content).map_err(Error::TOMLParseError)
    }
}

fn init_logging(cli: &Cli, etc: &ConfigFile) -> Result<()> {
    let log_level = cli
        .cfg
        .log_level
        .or(etc.config.log_level)
        .map_or_else(|| log::LevelFilter::Info, LogLevel::into);

    let use_stderr = cli.cfg.stderr.or(etc.config.stderr).unwrap_or(false);

    let stderr_level = if use_stderr {
        log_level
    } else {
        // Dump errors to stderr even if it's not enabled for normal log.
        log::LevelFilter::Error
    };

    let console_fmt = "{h({d(%Y-%m-%d %H:%M:%S)(utc)} - {l}: {m}{n})}";
    let stderr = ConsoleAppender::builder()
        .target(ConsoleTarget::Stderr)
        .encoder(Box::new(PatternEncoder::new(console_fmt)))
        .build();

    let mut config = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(stderr_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut appenders = vec!["stderr"];

    if let Some(log_path) = cli.cfg.log_file.as_ref().or(etc.config.log_file.as_ref()) {
        let text_fmt = "{d(%Y-%m-%d %H:%M:%S)(utc)} - {l}: {m}{n}";
        let log_file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(text_fmt)))
            .append(false)
            .build(log_path)
            .map_err(Error::IOError)?;
        config = config.appender(Appender::builder().build("file", Box::new(log_file)));
        appenders.push("file");
    }

    let config = config
        .build(Root::builder().appenders(appenders).build(log_level))
        .map_err(|e| Error::LogInitError(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| Error::LogInitError(e.to_string()))?;
    Ok(())
}

async fn follow(
    cli: &Cli,
    etc: &ConfigFile,
    gateway: Arc<dyn RemoteStatusGateway>,
    target: Target,
    actor: Actor,
) -> Result<()> {
    let engine = Engine::new(gateway, etc.tracker.clone());

    let r = engine.load_all(&target, &actor).await;
    let snapshot = engine.snapshot().await?;
    if let Some(info) = &snapshot.actor_info {
        println!(
            "{} rating {} (max {}) {}",
            info.handle,
            info.rating.map_or_else(|| "-".to_owned(), |x| x.to_string()),
            info.max_rating.map_or_else(|| "-".to_owned(), |x| x.to_string()),
            info.rank.as_deref().unwrap_or(""),
        );
    }
    if let Err(e) = r {
        return Err(Error::SessionError(e.to_string()));
    }
    println!("{} submissions on {}", snapshot.items.len(), target);
    for item in &snapshot.items {
        println!("{}", util::describe_item(item));
    }

    if cli.cfg.history_only || etc.config.history_only {
        return Ok(());
    }

    let rx = engine.subscribe().await?;
    let printer = async_std::task::spawn(async move {
        let mut last = None;
        while let Ok(s) = rx.recv().await {
            if s.is_loading_history {
                continue;
            }
            let line = util::describe_progress(&s);
            if last.as_ref() != Some(&line) {
                println!("{}", line);
                last = Some(line);
            }
        }
    });

    engine.start_tracking(target, actor).await?;
    let outcome = engine.wait_tracking().await?;
    info!("tracking finished: {:?}", outcome);

    let snapshot = engine.snapshot().await?;
    // Dropping the engine closes the session, which ends the printer.
    drop(engine);
    printer.await;

    match snapshot.error_message {
        Some(e) => Err(Error::SessionError(e)),
        None => Ok(()),
    }
}

#[async_std::main]
async fn main() {
    let cli = Cli::parse();

    let etc = match &cli.etc {
        Some(p) => ConfigFile::load(p).unwrap_or_else(|e| {
            eprintln!("config file {} is broken: {}", p.display(), e);
            exit(1)
        }),
        None => ConfigFile::default(),
    };

    if let Err(e) = init_logging(&cli, &etc) {
        eprintln!("{}", e);
        exit(1);
    }

    let target: Target = match cli.target.parse() {
        Ok(t) => t,
        Err(e) => {
            error!("{}", e);
            exit(1)
        }
    };
    let actor = Actor::new(&cli.handle);

    let ds = cli.cfg.data_source.or(etc.config.data_source);

    let gateway: Arc<dyn RemoteStatusGateway> = match ds {
        None => {
            error!("data source is not specified");
            exit(1)
        }
        Some(DataSource::Codeforces) => {
            cfg_if! {
                if #[cfg(feature = "codeforces")] {
                    match data_codeforces::get(&etc.codeforces.api_base) {
                        Ok(x) => Arc::new(x),
                        Err(e) => {
                            error!("cannot set up the Codeforces client: {}", e);
                            exit(1);
                        }
                    }
                } else {
                    error!("Codeforces disabled at build time");
                    exit(1);
                }
            }
        }
        Some(DataSource::Mock) => match data_mock::MockDataSource::new(&etc.mock.dir, &actor) {
            Ok(x) => Arc::new(x),
            Err(e) => {
                error!("cannot load mock data: {}", e);
                exit(1);
            }
        },
    };

    if let Err(e) = follow(&cli, &etc, gateway, target, actor).await {
        error!("error: {}", e);
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_only_is_a_switch() {
        let cli = Cli::try_parse_from(["client", "--history-only", "tourist", "1850A"]).unwrap();
        assert!(cli.cfg.history_only);
        assert_eq!(cli.handle, "tourist");
        assert_eq!(cli.target, "1850A");

        let cli = Cli::try_parse_from(["client", "tourist", "1850A"]).unwrap();
        assert!(!cli.cfg.history_only);
    }

    #[test]
    fn test_history_only_from_config() {
        let etc: ConfigFile = toml::from_str("[config]\nhistory_only = true\n").unwrap();
        assert!(etc.config.history_only);
        let etc: ConfigFile = toml::from_str("").unwrap();
        assert!(!etc.config.history_only);
    }
}

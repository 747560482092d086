use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Result;

/// Executor configuration options.
///
/// The authoritative back-pressure bound is `max_queue_size`: the facade
/// rejects a submission once this many submissions are accepted but not
/// yet completed (see `executor.rs`). `threads_count` fixes the worker
/// pool size for the lifetime of the executor; dynamic resizing is a
/// Non-goal.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Config {
    /// PLUGIN_TASK_QUEUE_MAX_SIZE: maximum accepted-but-not-completed submissions.
    #[serde(default = "Config::default_max_queue_size")]
    pub max_queue_size: usize,

    /// Number of worker threads to spawn.
    #[serde(default = "Config::default_threads_count")]
    pub threads_count: u16,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_queue_size: Config::default_max_queue_size(),
            threads_count: Config::default_threads_count(),
        }
    }
}

impl Config {
    fn default_max_queue_size() -> usize {
        50_000
    }

    fn default_threads_count() -> u16 {
        num_cpus::get() as u16
    }

    /// Loads the configuration from the given [`std::fs::File`].
    ///
    /// [`std::fs::File`]: https://doc.rust-lang.org/std/fs/struct.File.html
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let config = File::open(path)?;
        let config = Config::from_reader(config)?;
        Ok(config)
    }

    /// Loads the configuration from the given [`std::io::Read`].
    ///
    /// [`std::io::Read`]: https://doc.rust-lang.org/std/io/trait.Read.html
    pub fn from_reader<R: Read>(reader: R) -> Result<Config> {
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }
}

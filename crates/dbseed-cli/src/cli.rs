use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dbseed::store::{DEFAULT_BUCKET, DEFAULT_CHUNK_SIZE};
use dbseed::ReconciliationPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "dbseed",
    about = "Seed a database from a target directory and mirror its files into a bucket",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// File policy: always, update or none
    #[arg(long, global = true, env = "IMAGE_UPLOAD", default_value = "update")]
    pub policy: ReconciliationPolicy,

    /// Client identifier; names the default database file
    #[arg(long, global = true, env = "CLIENT_ID", default_value = "dbseed")]
    pub client_id: String,

    /// Directory holding data.json and uploadFiles/
    #[arg(long, global = true, env = "TARGET_DIR", default_value = "data")]
    pub target_dir: PathBuf,

    /// SQLite database path [default: <client-id>.sqlite3]
    #[arg(long, global = true, env = "DBSEED_DATABASE")]
    pub database: Option<PathBuf>,

    /// Bucket that receives the files
    #[arg(long, global = true, env = "DBSEED_BUCKET", default_value = DEFAULT_BUCKET)]
    pub bucket: String,

    /// Chunk size in bytes for new uploads, at most 16 MiB
    #[arg(long, global = true, env = "DBSEED_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// The database path, falling back to `<client-id>.sqlite3`.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.sqlite3", self.client_id)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reset, insert seed records and synchronize files (the default)
    Seed,
    /// Show the file plan for the policy without changing anything
    Plan,
    /// Compare the bucket with the upload directory and report duplicates
    Verify,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["dbseed", "--client-id", "acme"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.database_path(), PathBuf::from("acme.sqlite3"));
        assert_eq!(cli.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_policy_flag() {
        let cli = Cli::try_parse_from(["dbseed", "plan", "--policy", "ALWAYS"]).unwrap();
        assert_eq!(cli.command, Some(Command::Plan));
        assert_eq!(cli.policy, ReconciliationPolicy::AlwaysUpload);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(Cli::try_parse_from(["dbseed", "--policy", "sometimes"]).is_err());
    }

    #[test]
    fn test_explicit_database() {
        let cli = Cli::try_parse_from(["dbseed", "--database", "/tmp/x.db", "verify"]).unwrap();
        assert_eq!(cli.database_path(), PathBuf::from("/tmp/x.db"));
    }
}

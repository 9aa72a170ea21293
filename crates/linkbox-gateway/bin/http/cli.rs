use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const CODE_LENGTH_ENV: &str = "CODE_LENGTH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_STORAGE_PATH: &str = "urls.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "linkbox-gateway")]
pub struct CLI {
    #[arg(
        short = 'a',
        long,
        env = SERVER_ADDRESS_ENV,
        default_value = DEFAULT_SERVER_ADDRESS,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub server_address: String,

    /// Prefix of every short URL handed out.
    #[arg(
        short = 'b',
        long,
        env = BASE_URL_ENV,
        default_value = DEFAULT_BASE_URL,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub base_url: String,

    /// Empty disables file storage.
    #[arg(
        short = 'f',
        long,
        env = FILE_STORAGE_PATH_ENV,
        default_value = DEFAULT_FILE_STORAGE_PATH
    )]
    pub file_storage_path: PathBuf,

    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = linkbox_generator::random::DEFAULT_CODE_LENGTH
    )]
    pub code_length: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

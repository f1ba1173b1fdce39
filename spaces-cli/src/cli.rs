use std::path::PathBuf;

use clap::Parser;
use spaces_engine::ProxyType;

#[derive(Parser, Debug)]
#[command(
    name = "spaces-dl",
    author,
    version,
    about = "Record live or replayed audio Spaces to an AAC file",
    long_about = None
)]
pub struct Args {
    /// Space URL, e.g. https://x.com/i/spaces/1vOxwdQbRpXKB
    #[arg(value_name = "URL")]
    pub url: String,

    /// Output file (defaults to `<space id>.aac`)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory for the default output file name
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Proxy URL (e.g. http://127.0.0.1:7890)
    #[arg(long, env = "SPACES_DL_PROXY")]
    pub proxy: Option<String>,

    /// Proxy type
    #[arg(long, value_enum)]
    pub proxy_type: Option<ProxyType>,

    /// Proxy username
    #[arg(long, requires = "proxy")]
    pub proxy_username: Option<String>,

    /// Proxy password
    #[arg(long, requires = "proxy_username")]
    pub proxy_password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// `auth_token` cookie of a logged-in session
    #[arg(long, env = "SPACES_DL_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// `ct0` cookie (CSRF token) of a logged-in session
    #[arg(long, env = "SPACES_DL_CT0", hide_env_values = true)]
    pub ct0: Option<String>,

    /// Override the API bearer token
    #[arg(long, env = "SPACES_DL_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

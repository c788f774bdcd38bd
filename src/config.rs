//! Command line and runtime configuration.

use clap::Parser;

/// Command-line arguments for the service binary.
#[derive(Debug, Parser)]
#[command(name = "sesame", version, about = "Form-login automation service")]
pub struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, short, default_value_t = 3000)]
    pub port: u16,

    /// Include full upstream error chains in 500 response bodies.
    #[arg(long)]
    pub verbose_errors: bool,
}

impl Cli {
    /// Settings the request handlers carry.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            verbose_errors: self.verbose_errors,
        }
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings carried into request handlers.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Include full upstream error chains in 500 response bodies.
    pub verbose_errors: bool,
}

// ---- Tests ------------------------------------------------------------------

//! Command-line argument parsing

use crate::cli::config::{AuthConfig, ConfigOverrides};
use crate::error::Result;
use crate::error::handlers::ValidationErrorHandler;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "docker-registry-client")]
#[command(about = "Talk to Docker registries over the v1 or v2 API, whichever they speak")]
#[command(version, author)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Skip TLS verification
    #[arg(
        long = "insecure",
        short = 'k',
        global = true,
        help = "Accept invalid TLS certificates"
    )]
    pub insecure: bool,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        short = 't',
        global = true,
        help = "Timeout for network operations in seconds"
    )]
    pub timeout: Option<u64>,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(long = "quiet", short = 'q', global = true, help = "Only print results and errors")]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pick the API version for a repository and report the resulting client
    Resolve {
        /// Repository, e.g. busybox, alpine:latest, quay.io/quay/elasticsearch
        name: String,
        /// Force an API version (1 or 2) instead of probing
        #[arg(long = "api-version")]
        api_version: Option<u32>,
        /// Also list the repository's tags through the resolved client
        #[arg(long = "tags")]
        tags: bool,
    },
    /// Verify credentials against an index
    Login {
        /// Index to log in to (defaults to docker.io)
        index: Option<String>,
        #[arg(long = "username", short = 'u')]
        username: Option<String>,
        #[arg(long = "password", short = 'p')]
        password: Option<String>,
        /// Email sent with v1 logins
        #[arg(long = "email", short = 'e')]
        email: Option<String>,
        /// Base64 username:password, as found in Docker config files
        #[arg(long = "auth")]
        auth: Option<String>,
    },
    /// Ping an index over v1, v2, or both
    Ping {
        index: Option<String>,
        #[arg(long = "api-version")]
        api_version: Option<u32>,
    },
    /// Parse a repository reference and print it as JSON
    Parse {
        reference: String,
        #[arg(long = "default-index")]
        default_index: Option<String>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout {
            ValidationErrorHandler::validate_timeout(timeout)?;
        }
        Ok(())
    }

    /// Settings given on the command line. Switches that were not passed
    /// stay unset so they do not mask the environment.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout: self.timeout,
            insecure: self.insecure.then_some(true),
            verbose: self.verbose.then_some(true),
            quiet: self.quiet.then_some(true),
        }
    }

    /// Credentials given on the command line, if this is a login. Missing
    /// halves may still come from the environment.
    pub fn auth_config(&self) -> Option<AuthConfig> {
        match &self.command {
            Command::Login {
                username,
                password,
                email,
                auth,
                ..
            } => Some(AuthConfig {
                username: username.clone(),
                password: password.clone(),
                email: email.clone(),
                auth: auth.clone(),
            }),
            _ => None,
        }
    }

    /// Print usage examples
    pub fn print_examples() {
        println!("Examples:");
        println!("  # Detect the API version of a repository");
        println!("  docker-registry-client resolve busybox");
        println!();
        println!("  # Force the legacy API and list tags");
        println!("  docker-registry-client resolve --api-version 1 --tags quay.io/quay/elasticsearch");
        println!();
        println!("  # Check credentials");
        println!("  docker-registry-client login registry.example.com -u myuser -p mypassword");
        println!();
        println!("  # Using environment variables for sensitive data");
        println!("  export REGISTRY_CLIENT_USERNAME=myuser");
        println!("  export REGISTRY_CLIENT_PASSWORD=mypassword");
        println!("  docker-registry-client login registry.example.com");
    }
}

//! Runs the parsed command line against the library

use crate::cli::args::{Args, Command};
use crate::cli::config::{AppConfig, AuthConfig};
use crate::error::Result;
use crate::logging::Logger;
use crate::negotiation::{LoginNegotiator, VersionResolver};
use crate::reference::{parse_index, parse_repo_and_ref};
use crate::registry::{
    ApiVersion, CurrentRegistry, LegacyRegistry, RegistryV1, RegistryV2, RepositoryTarget,
};

pub struct Runner {
    args: Args,
    config: AppConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        args.validate()?;
        let config = AppConfig::from_env().merge(&args.overrides());
        config.validate()?;

        let output = if config.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(config.verbose)
        };

        Ok(Self {
            args,
            config,
            output,
        })
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Command::Resolve {
                name,
                api_version,
                tags,
            } => self.resolve(name, *api_version, *tags).await,
            Command::Login { index, .. } => self.login(index.as_deref()).await,
            Command::Ping { index, api_version } => {
                self.ping(index.as_deref(), *api_version).await
            }
            Command::Parse {
                reference,
                default_index,
            } => self.parse(reference, default_index.as_deref()),
        }?;

        self.output.detail(&format!(
            "Completed in {}",
            self.output.format_duration(self.output.elapsed())
        ));
        Ok(())
    }

    async fn resolve(&self, name: &str, version: Option<u32>, list_tags: bool) -> Result<()> {
        self.output.section("Resolve");

        // Registry credentials from the environment, if complete, for token requests
        let credentials = AuthConfig::from_env().credentials().ok();
        let target = RepositoryTarget::parse(name)?
            .with_optional_version(version)
            .with_credentials(credentials);
        let resolver = VersionResolver::from_config(&self.config.transport(), self.output.clone())?;
        let client = resolver.resolve(&target).await?;

        self.output.summary_kv(
            "Client",
            &[
                ("Repository", client.repo().canonical_name.clone()),
                ("API version", client.api_version().to_string()),
                ("Endpoint", client.base_url().to_string()),
            ],
        );
        println!("{}", client.api_version());

        if list_tags {
            let tags = client.list_tags().await?;
            self.output.info(&format!("{} tags", tags.len()));
            for tag in tags {
                println!("{}", tag);
            }
        }
        Ok(())
    }

    async fn login(&self, index: Option<&str>) -> Result<()> {
        self.output.section("Login");

        let auth = self
            .args
            .auth_config()
            .unwrap_or_default()
            .or(AuthConfig::from_env());
        let credentials = auth.credentials()?;
        let index = parse_index(index)?;

        let negotiator = LoginNegotiator::from_config(&self.config.transport(), self.output.clone())?;
        let result = negotiator.login(&index, &credentials).await?;

        self.output
            .success(&format!("{}: {}", index.name, result.status));
        if self.output.quiet {
            println!("{}", result.status);
        }
        Ok(())
    }

    async fn ping(&self, index: Option<&str>, version: Option<u32>) -> Result<()> {
        self.output.section("Ping");

        let index = parse_index(index)?;
        let versions = match version.map(ApiVersion::try_from).transpose()? {
            Some(version) => vec![version],
            None => vec![ApiVersion::V2, ApiVersion::V1],
        };
        let transport = self.config.transport();

        let mut answered = false;
        let mut last_error = None;
        for version in versions {
            let result = match version {
                ApiVersion::V1 => {
                    RegistryV1::new(&transport, self.output.clone())?
                        .ping_index(&index)
                        .await
                }
                ApiVersion::V2 => {
                    RegistryV2::new(&transport, self.output.clone())?
                        .ping(&index)
                        .await
                        .into_result()
                }
            };

            match result {
                Ok(response) => {
                    println!("{} {} {}", index.name, version, response.status);
                    answered = true;
                }
                Err(e) => {
                    self.output
                        .warning(&format!("{} {} ping failed: {}", index.name, version, e));
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(()),
        }
    }

    fn parse(&self, reference: &str, default_index: Option<&str>) -> Result<()> {
        let parsed = parse_repo_and_ref(reference, default_index)?;
        let json = serde_json::to_string_pretty(&parsed)?;
        println!("{}", json);
        Ok(())
    }
}

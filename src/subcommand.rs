use super::*;

mod pool;
mod settings_cmd;
mod template;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Run the merged mining template registry")]
    Pool(pool::Pool),
    #[command(about = "Print resolved settings")]
    Settings(settings_cmd::SettingsCmd),
    #[command(about = "Print the current mining.notify arguments")]
    Template(template::Template),
}

impl Subcommand {
    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Pool(pool) => pool.run(settings, cancel_token).await,
            Self::Settings(settings_cmd) => settings_cmd.run(settings),
            Self::Template(template) => template.run(settings).await,
        }
    }
}

/// Connects the backends and builds a registry with its first template.
async fn build_registry(settings: &Settings) -> Result<Arc<TemplateRegistry>> {
    let primary: Arc<dyn PrimaryBackend> = Arc::new(settings.primary_backend()?);

    let secondary = settings
        .secondary_backend()?
        .map(|backend| Arc::new(backend) as Arc<dyn SecondaryBackend>);

    let coinbaser = Arc::new(PoolCoinbaser::new(settings.address()?, settings.pool_sig()));

    TemplateRegistry::new(primary, secondary, coinbaser, settings.registry_config()?).await
}

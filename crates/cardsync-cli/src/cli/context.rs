use super::setup::Cli;
use anyhow::{Context as _, Result};
use cardsync::config::CardsyncConfig;
use cardsync::connectivity::{Connectivity, ManualConnectivity, ProbeConnectivity};
use cardsync::remote::dir::DirRemote;
use cardsync::store::fs::FileCardStore;
use cardsync::{CardsApi, SyncEngine};
use std::sync::Arc;

/// Everything a handler needs, wired from config and flags.
pub struct Context {
    pub owner: String,
    pub json: bool,
    pub api: CardsApi<FileCardStore, DirRemote>,
    pub engine: SyncEngine<FileCardStore, DirRemote>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = CardsyncConfig::load(cli.config.as_deref())
            .context("failed to load configuration")?;

        let owner = cli.owner.clone().unwrap_or_else(|| config.owner.clone());
        let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir());
        let remote_dir = cli.remote_dir.clone().or_else(|| config.remote_dir.clone());
        tracing::debug!(%owner, data_dir = %data_dir.display(), ?remote_dir, "cli context");

        let local = Arc::new(FileCardStore::new(data_dir));
        let connectivity: Arc<dyn Connectivity> = match &remote_dir {
            Some(dir) if !cli.offline => {
                let probe_dir = dir.clone();
                Arc::new(ProbeConnectivity::new(move || probe_dir.is_dir()))
            }
            _ => Arc::new(ManualConnectivity::new(false)),
        };
        let remote = Arc::new(match remote_dir {
            Some(dir) => DirRemote::new(dir),
            None => DirRemote::unconfigured(),
        });

        Ok(Self {
            owner,
            json: cli.json,
            api: CardsApi::new(Arc::clone(&local), Arc::clone(&remote), Arc::clone(&connectivity)),
            engine: SyncEngine::new(local, remote, connectivity),
        })
    }
}

use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Pool {}

impl Pool {
    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        let registry = build_registry(&settings).await?;

        info!(
            "Registry ready with {} byte extranonce2{}",
            registry.extranonce2_size(),
            if registry.has_secondary() {
                ", merged mining enabled"
            } else {
                ""
            }
        );

        let mut tasks = JoinSet::new();

        let mut events = registry.subscribe();
        let cancel = cancel_token.clone();

        tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(Event::NewBlock { prevhash }) => {
                            info!("Chain tip moved to {}", BlockHash::from(prevhash));
                        }
                        Ok(Event::NewTemplate { new_block, notify }) => {
                            info!(
                                "Broadcasting job {} (clean jobs: {new_block})",
                                notify.job_id
                            );
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Event log lagged by {n} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        generator::spawn_generator(
            registry,
            settings.update_interval(),
            settings.secondary_poll_interval(),
            cancel_token.clone(),
            &mut tasks,
        );

        cancel_token.cancelled().await;

        info!("Shutting down");

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                error!("Task failed: {err}");
            }
        }

        Ok(())
    }
}

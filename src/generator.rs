use super::*;

/// Keeps the registry's templates fresh: the primary chain every
/// `update_interval`, the secondary chain every `secondary_poll_interval`.
pub(crate) fn spawn_generator(
    registry: Arc<TemplateRegistry>,
    update_interval: Duration,
    secondary_poll_interval: Duration,
    cancel: CancellationToken,
    tasks: &mut JoinSet<()>,
) {
    info!("Spawning generator tasks");

    {
        let registry = registry.clone();
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let mut ticker = interval(update_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the registry built its first template on startup
            ticker.reset();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Ok(Refresh::Skipped) = registry.refresh_primary().await {
                            debug!("Skipped primary refresh");
                        }
                    }
                }
            }

            info!("Shutting down primary generator");
        });
    }

    // Runs without a secondary backend too, so one provisioned later is
    // picked up on the next tick.
    tasks.spawn(async move {
        let mut ticker = interval(secondary_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Ok(Refresh::Released) = registry.refresh_secondary().await {
                        warn!("Merged mining disabled until a secondary backend is provisioned");
                    }
                }
            }
        }

        info!("Shutting down secondary generator");
    });
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::block_template::tests::{CURTIME, gbt},
    };

    struct Counting {
        calls: AtomicU64,
    }

    #[async_trait]
    impl PrimaryBackend for Counting {
        async fn get_template(&self) -> Result<Value, BackendError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut template = gbt(1, "207fffff", &[]);
            template["curtime"] = json!(CURTIME + n as u32);
            Ok(template)
        }

        async fn submit_block(&self, _block_hex: String) -> Result<bool, BackendError> {
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_primary_until_cancelled() {
        let backend = Arc::new(Counting {
            calls: AtomicU64::new(0),
        });

        let registry = TemplateRegistry::new(
            backend.clone(),
            None,
            Arc::new(crate::block_template::tests::coinbaser()),
            RegistryConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        spawn_generator(
            registry,
            Duration::from_secs(10),
            Duration::from_secs(2),
            cancel.clone(),
            &mut tasks,
        );

        assert_eq!(tasks.len(), 2);

        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

        cancel.cancel();
        while tasks.join_next().await.is_some() {}
    }

    struct Flaky {
        calls: AtomicU64,
        gone: bool,
    }

    #[async_trait]
    impl SecondaryBackend for Flaky {
        async fn get_work(&self) -> Result<Value, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.gone {
                return Err(BackendError::Unavailable {
                    backend: "rootstock",
                    message: "401 Unauthorized".into(),
                });
            }

            Ok(json!({
                "blockHashForMergedMining": format!("0x{}", "ab".repeat(32)),
                "target": format!("0x{}", "ff".repeat(32)),
                "parentBlockHash": format!("0x{}", "cd".repeat(32)),
                "notify": true,
            }))
        }

        async fn submit_partial_merkle_block(
            &self,
            _submission: PartialMerkleSubmission,
        ) -> Result<Value, BackendError> {
            Ok(Value::Null)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_secondary_provisioned_after_release() {
        let primary = Arc::new(Counting {
            calls: AtomicU64::new(0),
        });

        let gone = Arc::new(Flaky {
            calls: AtomicU64::new(0),
            gone: true,
        });

        let registry = TemplateRegistry::new(
            primary,
            Some(gone.clone() as Arc<dyn SecondaryBackend>),
            Arc::new(crate::block_template::tests::coinbaser()),
            RegistryConfig::default(),
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        spawn_generator(
            registry.clone(),
            Duration::from_secs(60),
            Duration::from_secs(2),
            cancel.clone(),
            &mut tasks,
        );

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(gone.calls.load(Ordering::SeqCst), 1);
        assert!(!registry.has_secondary());

        let alive = Arc::new(Flaky {
            calls: AtomicU64::new(0),
            gone: false,
        });

        registry.provision_secondary(alive.clone());

        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(gone.calls.load(Ordering::SeqCst), 1);
        assert!(alive.calls.load(Ordering::SeqCst) >= 9);

        cancel.cancel();
        while tasks.join_next().await.is_some() {}
    }
}

use super::*;

#[tokio::test]
async fn initial_template_is_built_on_construction() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[transaction(1)]));
    let registry = registry(&primary, None, config()).await;

    assert_eq!(primary.template_calls.load(Ordering::SeqCst), 1);

    let notify = registry.get_last_broadcast_args().unwrap();
    let job = registry.get_job(notify.job_id).unwrap();

    assert_eq!(notify.job_id, JobId::new(1));
    assert!(notify.clean_jobs);
    assert_eq!(job.height, 1000);
    assert_eq!(job.tx_count(), 2);
    assert_eq!(job.prev_blockhash(), BlockHash::from_byte_array([1; 32]));
    assert!(job.merged.is_none());
}

#[tokio::test]
async fn construction_fails_without_a_template() {
    let primary = MockPrimary::new(json!({}));
    primary.fail("loading block index");

    assert!(
        TemplateRegistry::new(primary, None, coinbaser(), config())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn construction_rejects_bad_config() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));

    for config in [
        RegistryConfig {
            instance_id: 32,
            ..config()
        },
        RegistryConfig {
            extranonce_size: 5,
            ..config()
        },
        RegistryConfig {
            job_id_digits: 1,
            ..config()
        },
    ] {
        assert!(
            TemplateRegistry::new(primary.clone(), None, coinbaser(), config)
                .await
                .is_err()
        );
    }
}

#[tokio::test]
async fn same_tip_keeps_older_jobs() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));
    let registry = registry(&primary, None, config()).await;
    let mut events = registry.subscribe();

    primary.set_template(block_template(1, EASY_BITS, &[transaction(1)]));

    assert_eq!(
        registry.refresh_primary().await.unwrap(),
        Refresh::Updated {
            job_id: JobId::new(2),
            new_block: false,
        }
    );

    assert!(registry.get_job(JobId::new(1)).is_ok());
    assert!(registry.get_job(JobId::new(2)).is_ok());

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::NewTemplate { new_block, notify } => {
            assert!(!new_block);
            assert!(!notify.clean_jobs);
            assert_eq!(notify.job_id, JobId::new(2));
            assert_eq!(notify.merkle_branches.len(), 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn new_tip_evicts_older_jobs() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));
    let registry = registry(&primary, None, config()).await;
    registry.refresh_primary().await.unwrap();

    let mut events = registry.subscribe();

    primary.set_template(block_template(2, EASY_BITS, &[]));

    assert_eq!(
        registry.refresh_primary().await.unwrap(),
        Refresh::Updated {
            job_id: JobId::new(3),
            new_block: true,
        }
    );

    for job_id in [1, 2] {
        assert!(matches!(
            registry.get_job(JobId::new(job_id)),
            Err(ShareError::JobNotFound { .. })
        ));
    }

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::NewBlock { .. }));
    assert!(matches!(
        events[1],
        Event::NewTemplate {
            new_block: true,
            ..
        }
    ));

    let extranonce1 = registry.get_new_extranonce1();
    assert!(matches!(
        submit(
            &registry,
            JobId::new(1),
            &extranonce1,
            "00000000",
            0,
            any_difficulty()
        ),
        Err(ShareError::JobNotFound { .. })
    ));
}

#[tokio::test]
async fn failed_refresh_keeps_current_template() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));
    let registry = registry(&primary, None, config()).await;

    primary.fail("boom");
    assert!(matches!(
        registry.refresh_primary().await,
        Err(RefreshError::Backend { .. })
    ));

    primary.set_template(json!({"bits": EASY_BITS}));
    assert!(matches!(
        registry.refresh_primary().await,
        Err(RefreshError::Template { .. })
    ));

    assert_eq!(latest_job(&registry), JobId::new(1));
    assert!(registry.get_job(JobId::new(1)).is_ok());
    assert!(registry.last_primary_update().is_some());
}

#[tokio::test]
async fn refresh_is_single_flight() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));
    let registry = registry(&primary, None, config()).await;

    let (first, second) = tokio::join!(registry.refresh_primary(), registry.refresh_primary());

    assert!(matches!(first.unwrap(), Refresh::Updated { .. }));
    assert_eq!(second.unwrap(), Refresh::Skipped);
    assert_eq!(primary.template_calls.load(Ordering::SeqCst), 2);

    // the flag is released afterwards
    assert!(matches!(
        registry.refresh_primary().await.unwrap(),
        Refresh::Updated { .. }
    ));
}

#[tokio::test]
async fn extranonce1_values_are_distinct_and_prefixed() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));
    let registry = registry(
        &primary,
        None,
        RegistryConfig {
            instance_id: 3,
            extranonce_size: 10,
            ..config()
        },
    )
    .await;

    let first = registry.get_new_extranonce1();
    let second = registry.get_new_extranonce1();

    assert_ne!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(first.as_bytes()[0] >> 3, 3);
    assert_eq!(second.as_bytes()[0] >> 3, 3);
    assert_eq!(registry.extranonce2_size(), 6);
}

#[tokio::test]
async fn job_ids_wrap() {
    let primary = MockPrimary::new(block_template(1, EASY_BITS, &[]));
    let registry = registry(
        &primary,
        None,
        RegistryConfig {
            job_id_digits: 2,
            ..config()
        },
    )
    .await;

    for _ in 1..254 {
        registry.refresh_primary().await.unwrap();
    }

    assert_eq!(latest_job(&registry), JobId::new(254));

    registry.refresh_primary().await.unwrap();

    assert_eq!(latest_job(&registry), JobId::new(1));
    assert_eq!(latest_job(&registry).to_string(), "1");
}

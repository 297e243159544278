//! Bootstrap paths: address-based, delegated, and publication failures

use crate::core_identity::*;
use crate::test_utils::*;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_first_bootstrap_requests_exactly_one_consent() {
    let env = TestIdentityEnv::new();
    let identity = env.bootstrap().await;

    assert_eq!(env.authorizer.count(), 1);
    let request = &env.authorizer.requests()[0];
    assert_eq!(request.address.as_deref(), Some(TEST_ADDRESS.to_lowercase().as_str()));
    assert!(request.space.is_none());

    let did = identity.did().expect("published");
    assert!(did.as_str().starts_with("did:muport:Qm"));
    assert_eq!(identity.management_address(), Some(TEST_ADDRESS.to_lowercase().as_str()));
}

#[tokio::test]
async fn test_is_logged_in_after_bootstrap() {
    let env = TestIdentityEnv::new();
    let services = env.services();
    assert!(!IdentityCore::is_logged_in(&services, TEST_ADDRESS).unwrap());

    env.bootstrap().await;

    assert!(IdentityCore::is_logged_in(&services, TEST_ADDRESS).unwrap());
    assert!(IdentityCore::is_logged_in(&services, &TEST_ADDRESS.to_lowercase()).unwrap());
    assert_eq!(
        env.storage.keys().unwrap(),
        vec![format!("serialized3id_{}", TEST_ADDRESS.to_lowercase())]
    );
}

#[tokio::test]
async fn test_second_bootstrap_reuses_persisted_record() {
    let env = TestIdentityEnv::new();
    let first = env.bootstrap().await;

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let opts = BootstrapOptions {
        consent_callback: Some(Box::new(move |fresh| sink.lock().unwrap().push(fresh))),
    };
    let second = IdentityCore::get_id_from_eth_address(
        &TEST_ADDRESS.to_uppercase().replace("0X", "0x"),
        env.authorizer.clone(),
        env.services(),
        opts,
    )
    .await
    .unwrap();

    assert_eq!(env.authorizer.count(), 1);
    assert_eq!(*observed.lock().unwrap(), vec![false]);
    assert_eq!(first.did(), second.did());
}

#[tokio::test]
async fn test_consent_callback_reports_fresh_authorization() {
    let env = TestIdentityEnv::new();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let opts = BootstrapOptions {
        consent_callback: Some(Box::new(move |fresh| sink.lock().unwrap().push(fresh))),
    };

    IdentityCore::get_id_from_eth_address(TEST_ADDRESS, env.authorizer.clone(), env.services(), opts)
        .await
        .unwrap();

    assert_eq!(*observed.lock().unwrap(), vec![true]);
}

#[tokio::test]
async fn test_denied_consent_persists_nothing() {
    let env = TestIdentityEnv::new();
    let err = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        Arc::new(DenyingAuthorizer),
        env.services(),
        BootstrapOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IdentityError::Authorization(AuthError::Denied)));
    assert!(env.storage.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_same_wallet_yields_same_did() {
    let a = TestIdentityEnv::new().bootstrap().await;
    let b = TestIdentityEnv::new().bootstrap().await;
    let c = TestIdentityEnv::with_wallet([9u8; 32]).bootstrap().await;

    assert_eq!(a.did(), b.did());
    assert_ne!(a.did(), c.did());
}

#[tokio::test]
async fn test_delegated_identity_is_not_persisted() {
    let env = TestIdentityEnv::new();
    let identity = IdentityCore::get_id_from_auth(&StaticSeedDelegate::new(5), env.services(), None)
        .await
        .unwrap();

    assert!(identity.did().is_some());
    assert!(identity.management_address().is_none());
    assert!(env.storage.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_delegated_identity_cannot_open_spaces_without_authorizer() {
    let env = TestIdentityEnv::new();
    let identity = IdentityCore::get_id_from_auth(&StaticSeedDelegate::new(5), env.services(), None)
        .await
        .unwrap();

    let err = identity.init_keyring_by_name("music").await.unwrap_err();
    assert!(matches!(err, IdentityError::Authorization(AuthError::Unavailable)));
}

#[tokio::test]
async fn test_pin_failure_does_not_fail_publication() {
    let env = TestIdentityEnv::new();
    let services = IdentityServices::new(Arc::new(env.storage.clone()), Arc::new(env.content.clone()))
        .with_pinning(Arc::new(MemoryPinningService::failing()));

    let identity = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        env.authorizer.clone(),
        services,
        BootstrapOptions::default(),
    )
    .await
    .unwrap();

    assert!(identity.did().is_some());
    assert_eq!(env.content.len().unwrap(), 1);
}

#[tokio::test]
async fn test_pinning_mirror_receives_document() {
    let env = TestIdentityEnv::new();
    env.bootstrap().await;

    for _ in 0..100 {
        if !env.pinning.pinned().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(env.pinning.pinned().len(), 1);
}

#[tokio::test]
async fn test_content_store_failure_propagates() {
    let env = TestIdentityEnv::new();
    let services = IdentityServices::new(Arc::new(env.storage.clone()), Arc::new(FailingContentStore));

    let err = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        env.authorizer.clone(),
        services,
        BootstrapOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IdentityError::Publication(_)));
}

#[tokio::test]
async fn test_sign_jwt_requires_publication() {
    let env = TestIdentityEnv::new();
    let published = env.bootstrap().await;

    let unpublished =
        IdentityCore::from_state(&published.serialize_state().unwrap(), env.services(), None).unwrap();
    assert!(matches!(
        unpublished.sign_jwt(serde_json::json!({"sub": "x"})),
        Err(IdentityError::NotPublished)
    ));

    let token = published.sign_jwt(serde_json::json!({"sub": "x"})).unwrap();
    assert_eq!(token.split('.').count(), 3);
}

#[test]
fn test_pinning_config_controls_mirror() {
    let env = TestIdentityEnv::new();
    let mut config = crate::config::PinningConfig::default();
    let base = || IdentityServices::new(Arc::new(env.storage.clone()), Arc::new(env.content.clone()));

    let services = base().with_pinning_config(Arc::new(env.pinning.clone()), &config);
    assert!(services.pinning.is_some());
    assert_eq!(services.pin_timeout, Some(config.timeout));

    config.enabled = false;
    let services = base().with_pinning_config(Arc::new(env.pinning.clone()), &config);
    assert!(services.pinning.is_none());
    assert!(services.pin_timeout.is_none());
}

#[tokio::test]
async fn test_failed_persist_fails_bootstrap() {
    let env = TestIdentityEnv::new();
    let storage = FlakyStorage::new();
    let services = env.services_with_storage(Arc::new(storage.clone()));

    storage.fail_next_saves(1);
    let err = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        env.authorizer.clone(),
        services.clone(),
        BootstrapOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, IdentityError::Storage(_)));
    assert!(!IdentityCore::is_logged_in(&services, TEST_ADDRESS).unwrap());

    let identity = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        env.authorizer.clone(),
        services.clone(),
        BootstrapOptions::default(),
    )
    .await
    .unwrap();
    assert!(identity.did().is_some());
    assert!(IdentityCore::is_logged_in(&services, TEST_ADDRESS).unwrap());
    assert_eq!(env.authorizer.count(), 2);
}

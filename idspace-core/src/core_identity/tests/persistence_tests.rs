//! Serialized state round trips and logout

use crate::core_identity::*;
use crate::test_utils::*;
use tempfile::TempDir;
use std::sync::Arc;

#[tokio::test]
async fn test_state_roundtrip_preserves_identity() {
    let env = TestIdentityEnv::new();
    let original = env.bootstrap().await;
    original.init_keyring_by_name("music").await.unwrap();

    let serialized = original.serialize_state().unwrap();
    let fresh = TestIdentityEnv::new();
    let restored = IdentityCore::restore(&serialized, fresh.services(), None)
        .await
        .unwrap();

    assert_eq!(original.did(), restored.did());
    assert_eq!(original.space_names().unwrap(), restored.space_names().unwrap());
    assert_eq!(
        original.main_keyring().public_keys(),
        restored.main_keyring().public_keys()
    );
    assert_eq!(
        original.space_keyring("music").unwrap().unwrap().public_keys(),
        restored.space_keyring("music").unwrap().unwrap().public_keys()
    );
    // from_state persists records that carry an address
    assert_eq!(fresh.storage.keys().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_state_is_rejected() {
    let env = TestIdentityEnv::new();

    for input in ["not json", "{}", r#"{"seed": "0xzz"}"#, r#"{"seed": ""}"#] {
        let err = IdentityCore::from_state(input, env.services(), None).unwrap_err();
        assert!(
            matches!(err, IdentityError::MalformedState(_)),
            "{input} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn test_logout_removes_record() {
    let env = TestIdentityEnv::new();
    let identity = env.bootstrap().await;
    let services = env.services();
    assert!(IdentityCore::is_logged_in(&services, TEST_ADDRESS).unwrap());

    identity.logout().unwrap();

    assert!(!IdentityCore::is_logged_in(&services, TEST_ADDRESS).unwrap());
    // in-memory keyrings survive until drop
    assert!(identity.encrypt(b"x", None).is_ok());

    env.bootstrap().await;
    assert_eq!(env.authorizer.count(), 2);
}

#[tokio::test]
async fn test_file_storage_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let env = TestIdentityEnv::new();
    let services = |dir: &TempDir| {
        IdentityServices::new(
            Arc::new(FileIdentityStorage::new(dir.path().to_path_buf()).unwrap()),
            Arc::new(env.content.clone()),
        )
    };

    let first = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        env.authorizer.clone(),
        services(&temp_dir),
        BootstrapOptions::default(),
    )
    .await
    .unwrap();
    first.init_keyring_by_name("music").await.unwrap();

    let second = IdentityCore::get_id_from_eth_address(
        TEST_ADDRESS,
        env.authorizer.clone(),
        services(&temp_dir),
        BootstrapOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(first.did(), second.did());
    assert_eq!(second.space_names().unwrap(), vec!["music".to_string()]);
    assert_eq!(env.authorizer.count(), 2);
}

#[test]
fn test_debug_output_hides_seeds() {
    let seed = KeyringSeed::from_bytes(vec![0xab; 64]).unwrap();
    let record = IdentityRecord::new(Some("0xABC".to_string()), seed);
    let services = TestIdentityEnv::new().services();
    let identity = IdentityCore::from_state(&record.to_json().unwrap(), services, None).unwrap();

    let debug = format!("{:?}", identity);
    assert!(debug.contains("0xabc"));
    assert!(!debug.contains(&"ab".repeat(32)));
}

use crate::{
    builder::UcanBuilder,
    capability::Capability,
    chain::ProofChain,
    crypto::did::DidParser,
    error::UcanError,
    store::{MemoryStore, UcanJwtStore},
    tests::fixtures::{Identities, CHAT_SEMANTICS, SUPPORTED_KEYS},
    time::now,
};
use serde_json::json;
use std::collections::BTreeSet;

#[tokio::test]
async fn it_decodes_deep_ucan_chains() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let mut store = MemoryStore::default();

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .witnessed_by(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    store.write_token(&leaf_ucan.encode().unwrap()).await.unwrap();

    let chain =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store)
            .await
            .unwrap();

    assert_eq!(chain.ucan().audience(), identities.mallory_did);
    assert_eq!(chain.proofs()[0].ucan().issuer(), identities.alice_did);
}

#[tokio::test]
async fn it_fails_with_incorrect_chaining() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let mut store = MemoryStore::default();

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    // Mallory delegates from a proof that was not issued to them
    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.mallory_key)
        .for_audience(identities.alice_did.as_str())
        .with_lifetime(50)
        .witnessed_by(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    store.write_token(&leaf_ucan.encode().unwrap()).await.unwrap();

    let result =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store).await;

    assert!(matches!(result, Err(UcanError::AudienceMismatch { .. })));
}

#[tokio::test]
async fn it_fails_when_a_proof_is_missing() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let store = MemoryStore::default();

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .witnessed_by(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    // The leaf token was never written to the store
    let result =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store).await;

    assert!(matches!(result, Err(UcanError::MissingProof(_))));
}

#[tokio::test]
async fn it_resolves_proofs_embedded_in_facts() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let store = MemoryStore::default();

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .with_add_proof_facts(true)
        .witnessed_by(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    // The store is empty; the chain must resolve from the embedded proof
    let chain =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store)
            .await
            .unwrap();

    assert_eq!(chain.proofs()[0].ucan().issuer(), identities.alice_did);
}

#[tokio::test]
async fn it_fails_when_the_proof_lifetime_is_narrower() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let mut store = MemoryStore::default();

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_expiration(now() + 60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    // The delegated token outlives its proof
    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_expiration(now() + 600)
        .witnessed_by(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    store.write_token(&leaf_ucan.encode().unwrap()).await.unwrap();

    let result =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn it_reports_the_terminal_issuer_of_a_chain() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let store = MemoryStore::default();

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .with_add_proof_facts(true)
        .witnessed_by(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    let chain =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store)
            .await
            .unwrap();

    assert_eq!(
        chain.terminal_issuers(),
        BTreeSet::from([identities.alice_did.clone()])
    );
}

#[tokio::test]
async fn it_attributes_ancestral_capabilities_to_the_originator() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let store = MemoryStore::default();

    let cap = Capability::new("chat:general".into(), "chat/post".into(), json!({}));

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .claiming_capability(&cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .with_add_proof_facts(true)
        .witnessed_by(&leaf_ucan, None)
        .claiming_capability(&cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    let chain =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store)
            .await
            .unwrap();

    let capability_infos = chain.reduce_capabilities(&CHAT_SEMANTICS);

    assert_eq!(capability_infos.len(), 1);
    let info = &capability_infos[0];

    assert!(info.originators.contains(&identities.alice_did));
    assert_eq!(Capability::from(&info.capability), cap);
}

#[tokio::test]
async fn it_keeps_escalations_but_originated_by_the_claimant() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let store = MemoryStore::default();

    let post_cap = Capability::new("chat:general".into(), "chat/post".into(), json!({}));
    let moderate_cap = Capability::new("chat:general".into(), "chat/moderate".into(), json!({}));

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .claiming_capability(&post_cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    // Bob escalates: alice only granted posting
    let delegated_token = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .with_add_proof_facts(true)
        .witnessed_by(&leaf_ucan, None)
        .claiming_capability(&moderate_cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap()
        .encode()
        .unwrap();

    let chain =
        ProofChain::try_from_token_string(&delegated_token, None, &mut did_parser, &store)
            .await
            .unwrap();

    let capability_infos = chain.reduce_capabilities(&CHAT_SEMANTICS);

    assert_eq!(capability_infos.len(), 1);
    let info = &capability_infos[0];

    assert_eq!(
        info.originators,
        BTreeSet::from([identities.bob_did.clone()])
    );
}

#[tokio::test]
async fn it_redelegates_capabilities_from_a_proof() {
    let identities = Identities::new().await;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let store = MemoryStore::default();

    let cap = Capability::new("chat:general".into(), "chat/post".into(), json!({}));

    let leaf_ucan = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(600)
        .claiming_capability(&cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(50)
        .with_add_proof_facts(true)
        .delegating_from(&leaf_ucan, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let delegated_expiry = delegated.expires_at();
    let chain = ProofChain::from_ucan(delegated, None, &mut did_parser, &store)
        .await
        .unwrap();

    let capability_infos = chain.reduce_capabilities(&CHAT_SEMANTICS);

    assert_eq!(capability_infos.len(), 1);
    let info = &capability_infos[0];

    assert_eq!(Capability::from(&info.capability), cap);
    assert!(info.originators.contains(&identities.alice_did));
    // Redelegated authority is attenuated to the delegating token's lifetime
    assert_eq!(info.expires_at, delegated_expiry);
}

use crate::{
    builder::UcanBuilder,
    capability::Capability,
    error::UcanError,
    tests::fixtures::Identities,
    time::now,
    ucan::Ucan,
};
use cid::multihash::Code;
use serde_json::json;

#[tokio::test]
async fn it_builds_with_a_simple_example() {
    let identities = Identities::new().await;

    let fact_1 = json!({ "test": true });
    let fact_2 = json!({ "preimage": "abc", "hash": "sth" });

    let cap_1 = Capability::new(
        "mailto:alice@gmail.com".into(),
        "email/send".into(),
        json!({}),
    );
    let cap_2 = Capability::new("wnfs://alice.fission.name/public".into(), "wnfs/super_user".into(), json!({}));

    let expiration = now() + 30;
    let not_before = now() - 30;

    let token = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_expiration(expiration)
        .not_before(not_before)
        .with_fact("abc/challenge", fact_1.clone())
        .with_fact("def/challenge", fact_2.clone())
        .claiming_capability(&cap_1)
        .claiming_capability(&cap_2)
        .with_nonce()
        .build()
        .unwrap();

    let ucan = token.sign().await.unwrap();

    assert_eq!(ucan.issuer(), identities.alice_did);
    assert_eq!(ucan.audience(), identities.bob_did);
    assert_eq!(ucan.expires_at(), expiration);
    assert_eq!(ucan.not_before(), Some(not_before));
    assert!(ucan.nonce().is_some());

    let facts = ucan.facts().unwrap();
    assert_eq!(facts.get("abc/challenge"), Some(&fact_1));
    assert_eq!(facts.get("def/challenge"), Some(&fact_2));

    let capabilities: Vec<Capability> = ucan.capabilities().iter().collect();
    assert_eq!(capabilities, vec![cap_1, cap_2]);
}

#[tokio::test]
async fn it_requires_an_expiry() {
    let identities = Identities::new().await;

    let result = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .build();

    assert!(matches!(result, Err(UcanError::MalformedToken(_))));
}

#[tokio::test]
async fn it_rejects_a_not_before_later_than_the_expiry() {
    let identities = Identities::new().await;

    let result = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_expiration(now() + 10)
        .not_before(now() + 100)
        .build();

    assert!(matches!(result, Err(UcanError::MalformedToken(_))));
}

#[tokio::test]
async fn it_references_witnessing_proofs_by_cid() {
    let identities = Identities::new().await;

    let parent_cap = Capability::new("chat:general".into(), "chat/post".into(), json!({}));

    let authority = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(30)
        .claiming_capability(&parent_cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let next_cap = Capability::new("chat:general".into(), "chat/post".into(), json!({}));

    let ucan = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(30)
        .witnessed_by(&authority, None)
        .witnessed_by(&authority, None)
        .claiming_capability(&next_cap)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let authority_cid = authority.to_cid(Code::Blake3_256).unwrap().to_string();
    let proofs = ucan.proofs().unwrap();

    assert!(proofs.iter().all(|cid| cid == &authority_cid));
}

#[tokio::test]
async fn it_embeds_proof_tokens_in_facts_when_asked() {
    let identities = Identities::new().await;

    let authority = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let ucan = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(30)
        .with_add_proof_facts(true)
        .witnessed_by(&authority, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let authority_cid = authority.to_cid(Code::Blake3_256).unwrap();
    let embedded = ucan.embedded_proof(&authority_cid).unwrap();

    assert_eq!(embedded, authority.encode().unwrap());

    // The embedded copy survives an encode/decode round trip
    let decoded = Ucan::try_from(ucan.encode().unwrap().as_str()).unwrap();
    assert_eq!(
        decoded.embedded_proof(&authority_cid).unwrap(),
        authority.encode().unwrap()
    );
}

#[tokio::test]
async fn it_leaves_facts_alone_by_default() {
    let identities = Identities::new().await;

    let authority = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.bob_did.as_str())
        .with_lifetime(60)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    let ucan = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_lifetime(30)
        .witnessed_by(&authority, None)
        .build()
        .unwrap()
        .sign()
        .await
        .unwrap();

    assert!(ucan.facts().is_none());
}

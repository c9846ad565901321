use crate::{
    did::{create_did, resolve_did, restore_did, sign, verify_signature, DidFormat},
    KeyType, UcanError,
};

#[test]
fn it_creates_a_json_ld_document() {
    let document = create_did(KeyType::Ed25519, DidFormat::JsonLd);
    let method = &document.verification_method[0];

    assert!(document.id.starts_with("did:key:z"));
    assert_eq!(method.key_type, "Ed25519VerificationKey2018");
    assert_eq!(method.controller, document.id);
    assert!(method.public_key_base58.is_some());
    assert!(method.private_key_base58.is_some());
    assert_eq!(document.authentication, vec![method.id.clone()]);
    assert!(document.key_agreement.is_empty());
}

#[test]
fn it_creates_a_jose_document() {
    let document = create_did(KeyType::Ed25519, DidFormat::Jose);
    let method = &document.verification_method[0];

    assert_eq!(method.key_type, "JsonWebKey2020");

    let public_jwk = method.public_key_jwk.as_ref().unwrap();

    assert_eq!(public_jwk.kty, "OKP");
    assert_eq!(public_jwk.crv, "Ed25519");
    assert!(public_jwk.x.is_some());
    assert!(public_jwk.d.is_none());
    assert!(method.private_key_jwk.as_ref().unwrap().d.is_some());
}

#[test]
fn it_resolves_a_did_to_a_public_document() {
    for key_type in [
        KeyType::Ed25519,
        KeyType::P256,
        KeyType::Secp256k1,
        KeyType::X25519,
        KeyType::Bls12381G2,
    ] {
        let created = create_did(key_type, DidFormat::JsonLd);
        let resolved = resolve_did(&created.id, DidFormat::JsonLd).unwrap();
        let method = &resolved.verification_method[0];

        assert_eq!(resolved.id, created.id);
        assert_eq!(
            method.public_key_base58,
            created.verification_method[0].public_key_base58
        );
        assert!(method.private_key_base58.is_none());
    }
}

#[test]
fn it_restores_a_document_from_an_exported_method() {
    let created = create_did(KeyType::Ed25519, DidFormat::JsonLd);
    let restored = restore_did(&created.verification_method[0], DidFormat::JsonLd).unwrap();

    assert_eq!(restored.id, created.id);
    assert_eq!(
        restored.verification_method[0].public_key_base58,
        created.verification_method[0].public_key_base58
    );
}

#[test]
fn it_restores_across_document_formats() {
    let created = create_did(KeyType::P256, DidFormat::Jose);
    let restored = restore_did(&created.verification_method[0], DidFormat::JsonLd).unwrap();

    assert_eq!(restored.id, created.id);
    assert!(restored.verification_method[0].public_key_base58.is_some());
}

#[test]
fn it_rejects_a_restored_method_with_a_foreign_controller() {
    let created = create_did(KeyType::Ed25519, DidFormat::JsonLd);
    let other = create_did(KeyType::Ed25519, DidFormat::JsonLd);

    let mut method = created.verification_method[0].clone();
    method.controller = other.id;

    assert!(matches!(
        restore_did(&method, DidFormat::JsonLd),
        Err(UcanError::KeyMismatch)
    ));
}

#[test]
fn it_places_x25519_keys_under_key_agreement() {
    let document = create_did(KeyType::X25519, DidFormat::JsonLd);

    assert_eq!(document.key_agreement.len(), 1);
    assert!(document.authentication.is_empty());
}

#[test]
fn it_rejects_an_unresolvable_did() {
    assert!(matches!(
        resolve_did("did:key:zNotAFingerprint", DidFormat::JsonLd),
        Err(UcanError::InvalidDid(_))
    ));
    assert!(matches!(
        resolve_did("did:web:example.com", DidFormat::JsonLd),
        Err(UcanError::InvalidDid(_))
    ));
}

#[tokio::test]
async fn it_signs_and_verifies_messages() {
    for key_type in [KeyType::Ed25519, KeyType::P256, KeyType::Secp256k1] {
        let document = create_did(key_type, DidFormat::JsonLd);
        let method = &document.verification_method[0];
        let message = b"it was a dark and stormy night";

        let signature = sign(method, message).await.unwrap();

        assert!(verify_signature(&document.id, message, &signature)
            .await
            .unwrap());
        assert!(!verify_signature(&document.id, b"another message", &signature)
            .await
            .unwrap());
        assert!(!verify_signature(&document.id, message, "not!base64url")
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn it_refuses_to_sign_with_an_identification_key() {
    for key_type in [KeyType::X25519, KeyType::Bls12381G2] {
        let document = create_did(key_type, DidFormat::JsonLd);
        let method = &document.verification_method[0];

        assert!(matches!(
            sign(method, b"message").await,
            Err(UcanError::NotSigningCapable(_))
        ));
        assert!(matches!(
            verify_signature(&document.id, b"message", "c2ln").await,
            Err(UcanError::NotSigningCapable(_))
        ));
    }
}

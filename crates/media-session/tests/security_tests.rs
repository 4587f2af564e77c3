//! Encryption negotiation tests.
//!
//! Covers the protocol priority walk on both sides of a round, eviction
//! when a protocol wins, the sweep of unconfirmed protocols, and the
//! gating rules each protocol carries.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rjingle_media_session::prelude::*;
use rjingle_media_session::SrtpControl;
use std::collections::HashMap;
use std::sync::Arc;

const CIPHER_80: &str = "AES_CM_128_HMAC_SHA1_80";
const CIPHER_32: &str = "AES_CM_128_HMAC_SHA1_32";

fn remote_fingerprint() -> Fingerprint {
    Fingerprint::new(
        "sha-256",
        "4F:01:5A:A3:57:A9:2D:0A:C5:82:AE:E1:31:8F:96:CE:7A:9D:69:B8:2B:12:E7:A9:C8:3A:C5:21:40:B0:E6:11",
    )
    .with_setup(DtlsSetup::ActPass)
}

fn with_dtls_fingerprint(mut content: ContentDescriptor) -> ContentDescriptor {
    content.transport = content
        .transport
        .map(|transport| transport.with_fingerprint(remote_fingerprint()));
    content
}

fn with_cryptos(mut content: ContentDescriptor, cryptos: Vec<CryptoAttribute>) -> ContentDescriptor {
    let mut encryption = content.description.encryption.take().unwrap_or_default();
    for crypto in cryptos {
        encryption = encryption.with_crypto(crypto);
    }
    content.description.encryption = Some(encryption);
    content
}

fn with_zrtp(mut content: ContentDescriptor) -> ContentDescriptor {
    let encryption = content.description.encryption.take().unwrap_or_default();
    content.description.encryption =
        Some(encryption.with_zrtp_hash(ZrtpHash::new("1.10", "aa11bb22cc33dd44")));
    content
}

/// Shapes one of our offer contents into what the remote answer to it
/// looks like: their transport, none of our advertisements.
fn answer_to(content: &ContentDescriptor) -> ContentDescriptor {
    let mut answer = content
        .clone()
        .with_transport(remote_ice_transport(content.media()));
    answer.description.encryption = None;
    answer
}

fn signaling_without_zrtp() -> Arc<StaticConference> {
    Arc::new(StaticConference {
        focus: false,
        translation: false,
        zrtp_signaling: false,
        views: HashMap::new(),
    })
}

// ---------------------------------------------------------------------
// Answer side

#[tokio::test]
async fn answer_picks_dtls_when_the_offer_carries_fingerprints() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = responder(engine, factory);
    let mut events = handler.take_event_receiver().unwrap();

    let offer = with_dtls_fingerprint(remote_audio_offer());
    handler.process_offer(vec![offer], None).await.unwrap();

    assert_eq!(
        handler.selected_encryption(MediaType::Audio),
        Some(SrtpKind::DtlsSrtp)
    );
    assert!(drain_events(&mut events).contains(&NegotiationEvent::EncryptionSelected {
        media: MediaType::Audio,
        protocol: SrtpKind::DtlsSrtp,
    }));

    // The walk stopped at DTLS, so the answer advertises nothing else.
    let answer = handler.local_contents().await;
    assert!(answer[0].description.encryption.is_none());

    // Our fingerprints rode out on the harvested transport, marked with
    // the responder's setup role.
    let fingerprints = &answer[0].transport.as_ref().unwrap().fingerprints;
    assert_eq!(fingerprints.len(), 1);
    assert_eq!(fingerprints[0].setup, Some(DtlsSetup::Active));

    // The remote fingerprint landed in the control.
    let control = handler
        .srtp_controls()
        .get(MediaType::Audio, SrtpKind::DtlsSrtp)
        .and_then(SrtpControl::into_dtls)
        .unwrap();
    assert_eq!(control.remote_fingerprints, vec![remote_fingerprint()]);
    assert_eq!(control.setup, DtlsSetup::Active);
}

#[tokio::test]
async fn answer_falls_back_to_sdes_without_fingerprints() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = responder(engine, factory);

    let offer = with_cryptos(
        remote_audio_offer(),
        vec![
            CryptoAttribute::new(1, CIPHER_80, "inline:remoteoffer80"),
            CryptoAttribute::new(2, CIPHER_32, "inline:remoteoffer32"),
        ],
    );
    handler.process_offer(vec![offer], None).await.unwrap();

    assert_eq!(
        handler.selected_encryption(MediaType::Audio),
        Some(SrtpKind::Sdes)
    );

    // The answer echoes exactly one crypto attribute, our preferred
    // suite under the offerer's tag, and no fingerprints.
    let answer = handler.local_contents().await;
    let cryptos = &answer[0].description.encryption.as_ref().unwrap().cryptos;
    assert_eq!(cryptos.len(), 1);
    assert_eq!(cryptos[0].crypto_suite, CIPHER_80);
    assert_eq!(cryptos[0].tag, 1);
    assert!(answer[0].transport.as_ref().unwrap().fingerprints.is_empty());
}

#[tokio::test]
async fn sdes_answer_follows_our_cipher_order_not_theirs() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = responder(engine, factory);

    // The offer leads with the weaker suite; we still take the stronger
    // one because our own preference order decides.
    let offer = with_cryptos(
        remote_audio_offer(),
        vec![
            CryptoAttribute::new(1, CIPHER_32, "inline:remoteoffer32"),
            CryptoAttribute::new(2, CIPHER_80, "inline:remoteoffer80"),
        ],
    );
    handler.process_offer(vec![offer], None).await.unwrap();

    let answer = handler.local_contents().await;
    let cryptos = &answer[0].description.encryption.as_ref().unwrap().cryptos;
    assert_eq!(cryptos[0].crypto_suite, CIPHER_80);
    assert_eq!(cryptos[0].tag, 2);
}

#[tokio::test]
async fn unsupported_remote_cryptos_leave_the_round_unencrypted() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = responder(engine, factory);
    let mut events = handler.take_event_receiver().unwrap();

    let offer = with_cryptos(
        remote_audio_offer(),
        vec![CryptoAttribute::new(1, "F8_128_HMAC_SHA1_80", "inline:remoteoffer")],
    );
    handler.process_offer(vec![offer], None).await.unwrap();

    assert_eq!(handler.selected_encryption(MediaType::Audio), None);
    let answer = handler.local_contents().await;
    assert!(answer[0].description.encryption.is_none());
    // We never had a control to lose, so no failure is reported.
    assert!(!drain_events(&mut events)
        .iter()
        .any(|e| matches!(e, NegotiationEvent::SecurityNegotiationFailed { .. })));
}

#[tokio::test]
async fn zrtp_is_answered_only_when_offered() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();

    // Offer advertises a hello-hash: we answer with ours.
    let handler = responder(engine.clone(), factory.clone());
    let offer = with_zrtp(remote_audio_offer());
    handler.process_offer(vec![offer], None).await.unwrap();
    assert_eq!(
        handler.selected_encryption(MediaType::Audio),
        Some(SrtpKind::Zrtp)
    );
    let answer = handler.local_contents().await;
    let encryption = answer[0].description.encryption.as_ref().unwrap();
    assert_eq!(encryption.zrtp_hashes.len(), 1);
    let control = handler
        .srtp_controls()
        .get(MediaType::Audio, SrtpKind::Zrtp)
        .and_then(SrtpControl::into_zrtp)
        .unwrap();
    assert!(control.remote_capable);

    // Plain offer: no hello-hash in the answer even though we could.
    let handler = responder(engine, factory);
    handler
        .process_offer(vec![remote_audio_offer()], None)
        .await
        .unwrap();
    assert_eq!(handler.selected_encryption(MediaType::Audio), None);
    let answer = handler.local_contents().await;
    assert!(answer[0].description.encryption.is_none());
}

#[tokio::test]
async fn conference_signaling_gates_zrtp() {
    let engine = Arc::new(MockEngine::new());
    let factory = MockTransportFactory::new();
    let handler = MediaHandler::builder(NegotiationRole::Initiator)
        .with_engine(engine)
        .with_transport_factory(factory)
        .with_conference(signaling_without_zrtp())
        .build()
        .unwrap();

    let offer = handler.create_content_list().await.unwrap();

    let encryption = offer[0].description.encryption.as_ref().unwrap();
    assert!(encryption.zrtp_hashes.is_empty());
    assert!(!encryption.cryptos.is_empty());
    assert!(!handler.srtp_controls().contains(MediaType::Audio, SrtpKind::Zrtp));
}

#[tokio::test]
async fn dtls_is_not_offered_to_peers_without_the_feature() {
    let engine = Arc::new(MockEngine::new());
    let factory = MockTransportFactory::new();
    let handler = MediaHandler::builder(NegotiationRole::Initiator)
        .with_engine(engine)
        .with_transport_factory(factory)
        .with_discovery(Arc::new(StaticDiscovery::without_remote_dtls()))
        .build()
        .unwrap();

    let offer = handler.create_content_list().await.unwrap();

    assert!(offer[0].transport.as_ref().unwrap().fingerprints.is_empty());
    assert!(!handler
        .srtp_controls()
        .contains(MediaType::Audio, SrtpKind::DtlsSrtp));
    // The other protocols still went out.
    let encryption = offer[0].description.encryption.as_ref().unwrap();
    assert!(!encryption.cryptos.is_empty());
    assert!(!encryption.zrtp_hashes.is_empty());
}

#[tokio::test]
async fn disabling_encryption_strips_every_advertisement() {
    let engine = Arc::new(MockEngine::new());
    let factory = MockTransportFactory::new();
    let handler = MediaHandler::builder(NegotiationRole::Initiator)
        .with_engine(engine)
        .with_transport_factory(factory)
        .with_config(AccountMediaConfig::new().with_default_encryption(false))
        .build()
        .unwrap();

    let offer = handler.create_content_list().await.unwrap();

    assert!(offer[0].description.encryption.is_none());
    assert!(offer[0].transport.as_ref().unwrap().fingerprints.is_empty());
    assert!(!handler.srtp_controls().contains(MediaType::Audio, SrtpKind::Sdes));
}

// ---------------------------------------------------------------------
// Confirmation side

#[tokio::test]
async fn initiator_confirms_dtls_from_the_answer() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = initiator(engine, factory);
    let mut events = handler.take_event_receiver().unwrap();

    let offer = handler.create_content_list().await.unwrap();
    let answer = with_dtls_fingerprint(answer_to(&offer[0]));
    handler.process_answer(vec![answer]).await.unwrap();

    assert_eq!(
        handler.selected_encryption(MediaType::Audio),
        Some(SrtpKind::DtlsSrtp)
    );
    assert!(drain_events(&mut events).contains(&NegotiationEvent::EncryptionSelected {
        media: MediaType::Audio,
        protocol: SrtpKind::DtlsSrtp,
    }));

    let control = handler
        .srtp_controls()
        .get(MediaType::Audio, SrtpKind::DtlsSrtp)
        .and_then(SrtpControl::into_dtls)
        .unwrap();
    assert_eq!(control.setup, DtlsSetup::Passive);
    assert_eq!(control.remote_fingerprints, vec![remote_fingerprint()]);

    // Winning evicted the protocols that lost the walk.
    assert!(!handler.srtp_controls().contains(MediaType::Audio, SrtpKind::Sdes));
    assert!(!handler.srtp_controls().contains(MediaType::Audio, SrtpKind::Zrtp));
}

#[tokio::test]
async fn an_answer_cannot_introduce_dtls_on_its_own() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = MediaHandler::builder(NegotiationRole::Initiator)
        .with_engine(engine)
        .with_transport_factory(factory)
        .with_discovery(Arc::new(StaticDiscovery::without_remote_dtls()))
        .build()
        .unwrap();

    let offer = handler.create_content_list().await.unwrap();
    let echoed = offer[0].description.encryption.as_ref().unwrap().cryptos[0].clone();

    // A misbehaving peer answers with a fingerprint we never solicited,
    // plus a valid crypto echo. The crypto wins.
    let answer = with_dtls_fingerprint(with_cryptos(
        answer_to(&offer[0]),
        vec![CryptoAttribute::new(echoed.tag, echoed.crypto_suite, "inline:remoteanswer")],
    ));
    handler.process_answer(vec![answer]).await.unwrap();

    assert_eq!(
        handler.selected_encryption(MediaType::Audio),
        Some(SrtpKind::Sdes)
    );
}

#[tokio::test]
async fn unconfirmed_protocols_are_swept_after_the_answer() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = initiator(engine, factory);
    let mut events = handler.take_event_receiver().unwrap();

    let offer = handler.create_content_list().await.unwrap();

    // Answer comes back with no encryption at all.
    handler
        .process_answer(vec![answer_to(&offer[0])])
        .await
        .unwrap();

    assert_eq!(handler.selected_encryption(MediaType::Audio), None);
    assert!(!handler
        .srtp_controls()
        .contains(MediaType::Audio, SrtpKind::DtlsSrtp));
    assert!(!handler.srtp_controls().contains(MediaType::Audio, SrtpKind::Sdes));
    // ZRTP keeps negotiating in-band, so its control survives.
    assert!(handler.srtp_controls().contains(MediaType::Audio, SrtpKind::Zrtp));

    let failures: Vec<String> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            NegotiationEvent::SecurityNegotiationFailed { protocol, reason, .. } => {
                Some(format!("{protocol}: {reason}"))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        failures,
        vec![
            "dtls-srtp: answer carried no fingerprint".to_string(),
            "sdes: answer carried no crypto attribute".to_string(),
        ]
    );
}

#[tokio::test]
async fn confirm_rejects_a_crypto_we_never_offered() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = initiator(engine, factory);
    let mut events = handler.take_event_receiver().unwrap();

    let offer = handler.create_content_list().await.unwrap();
    let answer = with_cryptos(
        answer_to(&offer[0]),
        vec![CryptoAttribute::new(9, CIPHER_80, "inline:remoteanswer")],
    );
    handler.process_answer(vec![answer]).await.unwrap();

    assert_eq!(handler.selected_encryption(MediaType::Audio), None);
    let reasons: Vec<String> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            NegotiationEvent::SecurityNegotiationFailed { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert!(reasons.contains(&"answer selected a crypto attribute we did not offer".to_string()));
}

#[tokio::test]
async fn selection_is_tracked_per_media_type() {
    let engine = Arc::new(MockEngine::new());
    let factory = MockTransportFactory::new();
    let handler = MediaHandler::builder(NegotiationRole::Responder)
        .with_engine(engine)
        .with_transport_factory(factory)
        .with_config(
            AccountMediaConfig::new()
                .with_direction(MediaType::Video, MediaDirection::SendReceive),
        )
        .build()
        .unwrap();

    let audio = with_cryptos(
        remote_audio_offer(),
        vec![CryptoAttribute::new(1, CIPHER_80, "inline:remoteoffer")],
    );
    let video = with_dtls_fingerprint(remote_video_offer());
    handler.process_offer(vec![audio, video], None).await.unwrap();

    assert_eq!(
        handler.selected_encryption(MediaType::Audio),
        Some(SrtpKind::Sdes)
    );
    assert_eq!(
        handler.selected_encryption(MediaType::Video),
        Some(SrtpKind::DtlsSrtp)
    );
}

#[tokio::test]
async fn advertised_protocols_accumulate_across_contents() {
    let engine = Arc::new(MockEngine::new());
    let factory = MockTransportFactory::new();
    let handler = MediaHandler::builder(NegotiationRole::Responder)
        .with_engine(engine)
        .with_transport_factory(factory)
        .with_config(
            AccountMediaConfig::new()
                .with_direction(MediaType::Video, MediaDirection::SendReceive),
        )
        .build()
        .unwrap();

    let audio = with_cryptos(
        remote_audio_offer(),
        vec![CryptoAttribute::new(1, CIPHER_80, "inline:remoteoffer")],
    );
    let video = with_dtls_fingerprint(remote_video_offer());
    handler.process_offer(vec![audio, video], None).await.unwrap();

    assert_eq!(
        handler.advertised_encryptions(),
        vec![SrtpKind::Sdes, SrtpKind::DtlsSrtp]
    );

    handler.close().await;
    assert!(handler.advertised_encryptions().is_empty());
}

#[tokio::test]
async fn closing_the_handler_clears_the_controls() {
    let engine = Arc::new(MockEngine::audio_only());
    let factory = MockTransportFactory::new();
    let handler = responder(engine, factory);

    let offer = with_dtls_fingerprint(remote_audio_offer());
    handler.process_offer(vec![offer], None).await.unwrap();
    assert!(handler.selected_encryption(MediaType::Audio).is_some());

    handler.close().await;
    assert_eq!(handler.selected_encryption(MediaType::Audio), None);
    assert!(!handler
        .srtp_controls()
        .contains(MediaType::Audio, SrtpKind::DtlsSrtp));
}

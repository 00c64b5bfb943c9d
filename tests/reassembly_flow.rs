use assert_matches::assert_matches;
use openglass::{
    AudioConfig, ChannelKind, CompletedTransfer, DeviceStatus, EndpointId, FrameCodec,
    HotspotState, NotificationHandler, NotifyEvent, ProtocolError, ReassemblyError, StatusReading,
    TransferEvent, TransferState,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const PHOTO_KIND: u8 = 0x01;
const VIDEO_KIND: u8 = 0x02;

fn completed(event: NotifyEvent) -> Option<CompletedTransfer> {
    match event {
        NotifyEvent::Transfer {
            event: TransferEvent::Completed(transfer),
            ..
        } => Some(transfer),
        _ => None,
    }
}

fn encode_chunks(kind: u8, payload: &[u8], chunk_len: usize) -> Vec<Vec<u8>> {
    let mut packets: Vec<Vec<u8>> = payload
        .chunks(chunk_len)
        .enumerate()
        .map(|(sequence, chunk)| {
            let sequence = u16::try_from(sequence).expect("test payloads stay below 0xFFFF chunks");
            FrameCodec::encode_frame(sequence, kind, chunk).expect("sequence is never reserved")
        })
        .collect();
    packets.push(FrameCodec::encode_end_sentinel(kind).to_vec());
    packets
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(64)]
#[case(400)]
fn photo_survives_any_chunking(#[case] chunk_len: usize) {
    let payload: Vec<u8> = (0..=255u8).cycle().take(1_000).collect();
    let mut handler = NotificationHandler::default();

    let mut photo = None;
    for packet in encode_chunks(PHOTO_KIND, &payload, chunk_len) {
        let event = handler
            .handle(EndpointId::PhotoData, &packet)
            .expect("encoded packets should route");
        photo = completed(event).or(photo);
    }

    let photo = photo.expect("sentinel should complete the photo");
    assert_eq!(payload, photo.bytes());
    assert_eq!(payload.len().div_ceil(chunk_len), photo.frame_count());
    assert_eq!(0, photo.sequence_gaps());
    assert_eq!(0, handler.photo().buffered_len());
}

#[test]
fn consecutive_photos_do_not_share_bytes() {
    let mut handler = NotificationHandler::default();
    let mut photos = Vec::new();

    for payload in [&b"first"[..], &b"second photo"[..]] {
        for packet in encode_chunks(PHOTO_KIND, payload, 4) {
            let event = handler
                .handle(EndpointId::PhotoData, &packet)
                .expect("encoded packets should route");
            photos.extend(completed(event));
        }
    }

    let photos: Vec<Vec<u8>> = photos.into_iter().map(CompletedTransfer::into_bytes).collect();
    assert_eq!(vec![b"first".to_vec(), b"second photo".to_vec()], photos);
}

#[test]
fn interleaved_channels_keep_independent_state() {
    let mut handler = NotificationHandler::default();
    let photo_packets = encode_chunks(PHOTO_KIND, &[0xFF, 0xD8, 0xFF, 0xD9], 2);
    let video_packets = encode_chunks(VIDEO_KIND, &[0xAB, 0xCD, 0xEF], 2);

    let mut photo = None;
    let mut video = None;
    let notifications = [
        (EndpointId::DeviceStatus, vec![0x01]),
        (EndpointId::PhotoData, photo_packets[0].clone()),
        (EndpointId::VideoData, video_packets[0].clone()),
        (EndpointId::AudioData, vec![0x00, 0x00, 0x00, 0x10, 0x00]),
        (EndpointId::DeviceStatus, vec![0x07]),
        (EndpointId::PhotoData, photo_packets[1].clone()),
        (EndpointId::VideoData, video_packets[1].clone()),
        (EndpointId::PhotoData, photo_packets[2].clone()),
        (EndpointId::DeviceStatus, vec![0x03]),
        (EndpointId::VideoData, video_packets[2].clone()),
    ];
    for (endpoint, payload) in notifications {
        let event = handler
            .handle(endpoint, &payload)
            .expect("every notification should route");
        match endpoint {
            EndpointId::PhotoData => photo = completed(event).or(photo),
            EndpointId::VideoData => video = completed(event).or(video),
            _ => {}
        }
    }

    assert_eq!(
        Some(vec![0xFF, 0xD8, 0xFF, 0xD9]),
        photo.map(CompletedTransfer::into_bytes)
    );
    assert_eq!(
        Some(vec![0xAB, 0xCD, 0xEF]),
        video.map(CompletedTransfer::into_bytes)
    );
    assert_eq!(
        &[
            DeviceStatus::Initializing,
            DeviceStatus::BleInit,
            DeviceStatus::Ready
        ],
        handler.status().history()
    );
    assert_eq!(
        StatusReading::Status(DeviceStatus::Ready),
        handler.status().current()
    );
    assert_eq!(2, handler.audio().total_bytes());
}

#[test]
fn oversized_transfer_is_dropped_and_next_one_succeeds() {
    let mut handler = NotificationHandler::default().with_max_transfer_bytes(4);

    for packet in &encode_chunks(PHOTO_KIND, &[1, 2, 3, 4, 5, 6], 3)[..1] {
        handler
            .handle(EndpointId::PhotoData, packet)
            .expect("first chunk fits under the cap");
    }
    let overflow = FrameCodec::encode_frame(1, PHOTO_KIND, &[4, 5, 6]).expect("valid sequence");
    let result = handler.handle(EndpointId::PhotoData, &overflow);
    assert_matches!(
        result,
        Err(ProtocolError::Reassembly(error))
            if matches!(*error, ReassemblyError::BufferLimitExceeded { limit: 4, attempted: 6 })
    );
    assert_eq!(TransferState::Idle, handler.photo().state());

    let stray_end = handler
        .handle(EndpointId::PhotoData, &FrameCodec::encode_end_sentinel(PHOTO_KIND))
        .expect("sentinel should route");
    assert_eq!(
        NotifyEvent::TransferIgnored {
            channel: ChannelKind::Photo
        },
        stray_end
    );

    let mut photo = None;
    for packet in encode_chunks(PHOTO_KIND, &[9, 8, 7], 2) {
        let event = handler
            .handle(EndpointId::PhotoData, &packet)
            .expect("small photo should route");
        photo = completed(event).or(photo);
    }
    assert_eq!(Some(vec![9, 8, 7]), photo.map(CompletedTransfer::into_bytes));
}

#[test]
fn audio_stream_is_centered_and_normalised() {
    let mut handler =
        NotificationHandler::new(AudioConfig::builder().target_amplitude(1_000.0).build());
    let chunks: [&[u8]; 4] = [
        &[0x00, 0x00, 0x00, 0x64, 0x00],
        &[0x01, 0x00, 0x00],
        &[0xFF, 0xFF, 0x00, 0xC8, 0x00],
        &[0x02, 0x00, 0x00, 0x2C, 0x01],
    ];
    for chunk in chunks {
        handler
            .handle(EndpointId::AudioData, chunk)
            .expect("audio chunks should route");
    }

    let audio = handler.audio();
    assert_eq!(3, audio.chunk_count());
    assert_eq!(1, audio.dropped_chunks());

    let stats = audio.stats().expect("six bytes form whole samples");
    assert_eq!(Some(100), stats.min);
    assert_eq!(Some(300), stats.max);
    assert_eq!(200.0, stats.mean);

    let buffer = audio.finalize().expect("six bytes form whole samples");
    assert_eq!(200.0, buffer.dc_offset());
    assert_eq!(Some(10.0), buffer.scale());
    assert_eq!(&[-1_000, 0, 1_000], buffer.samples());
}

#[test]
fn hotspot_snapshot_replaces_previous_one() {
    let mut handler = NotificationHandler::default();
    let mut full = vec![0x02, 0x03, 0x08, 0x01, 0x03];
    full.extend_from_slice(&1_024u32.to_le_bytes());
    full.extend_from_slice(&256u32.to_le_bytes());
    full.push(4);
    full.extend_from_slice(b"Glas");
    full.push(11);
    full.extend_from_slice(b"192.168.4.1");

    handler
        .handle(EndpointId::HotspotStatus, &[0x01, 0x00, 0x08])
        .expect("minimal snapshot should decode");
    let event = handler
        .handle(EndpointId::HotspotStatus, &full)
        .expect("full snapshot should decode");

    let NotifyEvent::Hotspot(status) = event else {
        panic!("expected a hotspot event, got {event:?}");
    };
    assert_eq!(HotspotState::Active, status.state());
    assert_eq!(Some(1_024), status.total_data_bytes);
    assert_eq!(Some(256), status.ble_data_bytes);
    assert_eq!(Some("Glas"), status.ssid.as_deref());
    assert_eq!(Some("192.168.4.1"), status.ip_address.as_deref());
    assert_eq!(None, status.truncated());
    assert_eq!(Some(&status), handler.latest_hotspot());
}

#[test]
fn rejected_hotspot_keeps_last_good_snapshot() {
    let mut handler = NotificationHandler::default();
    handler
        .handle(EndpointId::HotspotStatus, &[0x00, 0x00, 0x04])
        .expect("minimal snapshot should decode");

    let result = handler.handle(EndpointId::HotspotStatus, &[0x02]);

    assert_matches!(result, Err(ProtocolError::Hotspot(_)));
    assert_eq!(
        Some(HotspotState::Disabled),
        handler.latest_hotspot().map(|status| status.state())
    );
}

use std::time::Duration;

use assert_matches::assert_matches;
use openglass::{
    EndpointId, ListenRequest, ListenStopReason, NotificationFlow, NotificationHandler,
    NotifyEvent, TransferEvent, WriteMode, WriteRequest,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

async fn connect(notifications: Option<&str>) -> anyhow::Result<openglass::DeviceSession> {
    let builder = openglass::FakeArgs::builder()
        .scan("hci1|00:11:22|Speaker|-65;hci0|AA:BB:CC|OpenGlass|-43")?;
    let fake_args = match notifications {
        Some(notifications) => builder.notifications(notifications)?.build(),
        None => builder.build(),
    };
    let client = openglass::fake_hardware_client(fake_args);
    Ok(client.connect_first_device("OpenGlass").await?)
}

#[tokio::test]
async fn fake_session_connect_reports_every_endpoint() -> anyhow::Result<()> {
    let session = connect(None).await?;
    let report = session.inspect_report();

    assert_eq!("AA:BB:CC", report.device().device_id());
    assert_eq!(Some(-43), report.device().rssi());
    assert_eq!(
        Vec::<EndpointId>::new(),
        report.endpoint_presence().missing()
    );
    assert_eq!(1, report.services().len());

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn fake_session_reads_and_writes_endpoints() -> anyhow::Result<()> {
    let session = connect(None).await?;

    assert_eq!(vec![0x01], session.read_endpoint(EndpointId::AudioCodec).await?);
    session
        .write_endpoint(EndpointId::PhotoControl, &[0xFF], WriteMode::WithResponse)
        .await?;

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn fake_session_delivers_only_requested_endpoints() -> anyhow::Result<()> {
    let session = connect(None).await?;
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::DeviceStatus])
        .build();

    let mut received = Vec::new();
    let summary = session
        .run_notifications(&request, CancellationToken::new(), |notification| {
            received.push((notification.index, notification.endpoint, notification.payload));
            NotificationFlow::Continue
        })
        .await?;

    assert_eq!(
        vec![
            (1, EndpointId::DeviceStatus, vec![0x07]),
            (2, EndpointId::DeviceStatus, vec![0x03]),
        ],
        received
    );
    assert_eq!(
        &ListenStopReason::NotificationStreamClosed,
        summary.stop_reason()
    );
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn fake_session_zero_limit_yields_nothing() -> anyhow::Result<()> {
    let session = connect(None).await?;
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::PhotoData])
        .max_notifications(0)
        .build();

    let mut calls = 0usize;
    let summary = session
        .run_notifications(&request, CancellationToken::new(), |_notification| {
            calls += 1;
            NotificationFlow::Continue
        })
        .await?;

    assert_eq!(0, calls);
    assert_eq!(0, summary.received_notifications());
    assert_eq!(&ListenStopReason::ReachedLimit(0), summary.stop_reason());
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn fake_session_cancel_produces_cancelled() -> anyhow::Result<()> {
    let session = connect(None).await?;
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::DeviceStatus, EndpointId::PhotoData])
        .build();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = session
        .run_notifications(&request, cancel, |_notification| NotificationFlow::Continue)
        .await?;

    assert_eq!(0, summary.received_notifications());
    assert_eq!(&ListenStopReason::Cancelled, summary.stop_reason());
    session.close().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn fake_session_interval_is_cancelled_mid_stream() -> anyhow::Result<()> {
    let fake_args = openglass::FakeArgs::builder()
        .scan("hci0|AA:BB:CC|OpenGlass|-43")?
        .notification_interval(Duration::from_secs(1))
        .build();
    let session = openglass::fake_hardware_client(fake_args)
        .connect_first_device("OpenGlass")
        .await?;
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::DeviceStatus])
        .build();
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();

    let summary = session
        .run_notifications(&request, cancel, move |_notification| {
            canceller.cancel();
            NotificationFlow::Continue
        })
        .await?;

    assert_eq!(1, summary.received_notifications());
    assert_eq!(&ListenStopReason::Cancelled, summary.stop_reason());
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn photo_capture_through_session_and_router() -> anyhow::Result<()> {
    let session = connect(Some(
        "device_status=07,photo_data=000001AABB,photo_data=FFFF01,photo_data=000001CC",
    ))
    .await?;
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::PhotoData, EndpointId::DeviceStatus])
        .trigger(WriteRequest::new(EndpointId::PhotoControl, [0xFF]))
        .build();

    let mut handler = NotificationHandler::default();
    let mut photo = None;
    let summary = session
        .run_notifications(&request, CancellationToken::new(), |notification| {
            let event = handler
                .handle(notification.endpoint, &notification.payload)
                .expect("fixture notifications should route");
            if let NotifyEvent::Transfer {
                event: TransferEvent::Completed(completed),
                ..
            } = event
            {
                photo = Some(completed);
                return NotificationFlow::Stop;
            }
            NotificationFlow::Continue
        })
        .await?;

    let photo = photo.expect("photo should complete before the stream ends");
    assert_eq!(&[0xAA, 0xBB], photo.bytes());
    assert_eq!(3, summary.received_notifications());
    assert_matches!(summary.stop_reason(), ListenStopReason::Finished);
    assert_eq!(
        Some(openglass::DeviceStatus::BleInit),
        handler.status().current().status()
    );
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_prefix_fails_to_connect() {
    let fake_args = openglass::FakeArgs::builder()
        .scan("hci0|AA:BB:CC|OpenGlass|-43")
        .expect("scan fixture should parse")
        .build();
    let result = openglass::fake_hardware_client(fake_args)
        .connect_first_device("Frame")
        .await;

    assert_matches!(
        result,
        Err(openglass::InteractionError::NoMatchingFixtureDevice { prefix }) if prefix == "Frame"
    );
}

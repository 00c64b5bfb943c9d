mod audio_view;
mod device_view;
mod hotspot_view;
mod inspect_view;
mod painter;
mod photo_view;
mod status_view;
mod summary_view;
mod table;
mod video_view;

pub(crate) use self::audio_view::AudioView;
pub(crate) use self::hotspot_view::HotspotView;
pub(crate) use self::inspect_view::InspectReportView;
pub(crate) use self::painter::Painter;
pub(crate) use self::photo_view::PhotoView;
pub(crate) use self::status_view::StatusView;
pub(crate) use self::video_view::VideoView;

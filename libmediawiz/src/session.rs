use crate::errors::MwError;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Single,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    VideoOnly,
    AudioOnly,
    Combined,
}

impl ContentKind {
    pub fn has_video(&self) -> bool {
        matches!(self, ContentKind::VideoOnly | ContentKind::Combined)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, ContentKind::AudioOnly | ContentKind::Combined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoQuality {
    Best,
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    Worst,
}

impl VideoQuality {
    pub const ALL: [VideoQuality; 8] = [
        VideoQuality::Best,
        VideoQuality::P2160,
        VideoQuality::P1440,
        VideoQuality::P1080,
        VideoQuality::P720,
        VideoQuality::P480,
        VideoQuality::P360,
        VideoQuality::Worst,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioQuality {
    Best,
    High,
    Medium,
    Low,
    Worst,
}

impl AudioQuality {
    pub const ALL: [AudioQuality; 5] = [
        AudioQuality::Best,
        AudioQuality::High,
        AudioQuality::Medium,
        AudioQuality::Low,
        AudioQuality::Worst,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Mp4,
    Mkv,
    Webm,
    Mp3,
    M4a,
    Opus,
    Flac,
    Wav,
}

impl MediaFormat {
    /// Container forced whenever subtitles are embedded.
    pub const SUBTITLE_CONTAINER: MediaFormat = MediaFormat::Mkv;

    /// Formats offered for the given content kind.
    pub fn choices(content: ContentKind) -> &'static [MediaFormat] {
        match content {
            ContentKind::AudioOnly => &[
                MediaFormat::Mp3,
                MediaFormat::M4a,
                MediaFormat::Opus,
                MediaFormat::Flac,
                MediaFormat::Wav,
            ],
            ContentKind::VideoOnly | ContentKind::Combined => {
                &[MediaFormat::Mp4, MediaFormat::Mkv, MediaFormat::Webm]
            }
        }
    }
}

/// Inclusive item range inside a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistRange {
    pub start: u32,
    pub end: u32,
}

impl PlaylistRange {
    pub fn new(start: u32, end: u32) -> Option<PlaylistRange> {
        if start <= end {
            Some(PlaylistRange { start, end })
        } else {
            None
        }
    }
}

/// What the user picked on the destination menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    CurrentDir,
    NewSubdir,
    ListedSubdir,
    NamedSubdir,
    CustomPath,
    /// Collections only. The folder is named by the download tool after the collection title.
    CollectionTitle,
}

impl DestinationKind {
    pub fn needs_detail(&self) -> bool {
        matches!(
            self,
            DestinationKind::NewSubdir
                | DestinationKind::ListedSubdir
                | DestinationKind::NamedSubdir
                | DestinationKind::CustomPath
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    CurrentDir,
    NewSubdir(String),
    /// Folder name exactly as listed on disk.
    ExistingSubdir(PathBuf),
    Path(PathBuf),
    CollectionTitle,
}

/// Choices accumulated while the wizard runs. Every field is owned by exactly one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub download_kind: Option<DownloadKind>,
    pub url: Option<Url>,
    /// `None` after the range step means the whole collection.
    pub range: Option<PlaylistRange>,
    pub content_kind: Option<ContentKind>,
    pub video_quality: Option<VideoQuality>,
    pub audio_quality: Option<AudioQuality>,
    pub subtitles: Option<bool>,
    pub format: Option<MediaFormat>,
    pub destination_kind: Option<DestinationKind>,
    pub destination: Option<Destination>,
}

/// A completed session with every required choice present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub kind: DownloadKind,
    pub url: Url,
    pub range: Option<PlaylistRange>,
    pub content: ContentKind,
    pub video_quality: Option<VideoQuality>,
    pub audio_quality: Option<AudioQuality>,
    pub subtitles: bool,
    pub format: MediaFormat,
    pub destination: Destination,
}

impl DownloadRequest {
    /// Subtitles are only embedded into files that carry a video stream.
    pub fn embeds_subtitles(&self) -> bool {
        self.subtitles && self.content.has_video()
    }
}

impl Session {
    pub fn request(&self) -> Result<DownloadRequest, MwError> {
        let content = self
            .content_kind
            .ok_or(MwError::IncompleteSession("content kind"))?;
        if content.has_video() && self.video_quality.is_none() {
            return Err(MwError::IncompleteSession("video quality"));
        }
        if content.has_audio() && self.audio_quality.is_none() {
            return Err(MwError::IncompleteSession("audio quality"));
        }
        let subtitles = self.subtitles.unwrap_or(false);
        let format = if subtitles {
            MediaFormat::SUBTITLE_CONTAINER
        } else {
            self.format.ok_or(MwError::IncompleteSession("format"))?
        };
        Ok(DownloadRequest {
            kind: self
                .download_kind
                .ok_or(MwError::IncompleteSession("download kind"))?,
            url: self
                .url
                .clone()
                .ok_or(MwError::IncompleteSession("source url"))?,
            range: self.range,
            content,
            video_quality: self.video_quality,
            audio_quality: self.audio_quality,
            subtitles,
            format,
            destination: self
                .destination
                .clone()
                .ok_or(MwError::IncompleteSession("destination"))?,
        })
    }
}

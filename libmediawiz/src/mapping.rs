use crate::session::{AudioQuality, ContentKind, DownloadRequest, MediaFormat, VideoQuality};

/// Fallback appended to merged selectors so single-file sources still download.
const MERGE_FALLBACK: &str = "best";

pub fn video_selector(quality: VideoQuality) -> &'static str {
    match quality {
        VideoQuality::Best => "bestvideo",
        VideoQuality::P2160 => "bestvideo[height<=2160]",
        VideoQuality::P1440 => "bestvideo[height<=1440]",
        VideoQuality::P1080 => "bestvideo[height<=1080]",
        VideoQuality::P720 => "bestvideo[height<=720]",
        VideoQuality::P480 => "bestvideo[height<=480]",
        VideoQuality::P360 => "bestvideo[height<=360]",
        VideoQuality::Worst => "worstvideo",
    }
}

pub fn audio_selector(quality: AudioQuality) -> &'static str {
    match quality {
        AudioQuality::Best => "bestaudio",
        AudioQuality::High => "bestaudio[abr<=192]",
        AudioQuality::Medium => "bestaudio[abr<=128]",
        AudioQuality::Low => "bestaudio[abr<=64]",
        AudioQuality::Worst => "worstaudio",
    }
}

pub fn extension(format: MediaFormat) -> &'static str {
    match format {
        MediaFormat::Mp4 => "mp4",
        MediaFormat::Mkv => "mkv",
        MediaFormat::Webm => "webm",
        MediaFormat::Mp3 => "mp3",
        MediaFormat::M4a => "m4a",
        MediaFormat::Opus => "opus",
        MediaFormat::Flac => "flac",
        MediaFormat::Wav => "wav",
    }
}

/// Format expression handed to the download tool's `-f` option.
pub fn format_expression(
    content: ContentKind,
    video: Option<VideoQuality>,
    audio: Option<AudioQuality>,
) -> String {
    let video = video_selector(video.unwrap_or(VideoQuality::Best));
    let audio = audio_selector(audio.unwrap_or(AudioQuality::Best));
    match content {
        ContentKind::Combined => format!("{video}+{audio}/{MERGE_FALLBACK}"),
        ContentKind::VideoOnly => video.to_string(),
        ContentKind::AudioOnly => audio.to_string(),
    }
}

/// Selection and output-container flags for a request, `-f` included.
pub fn format_args(request: &DownloadRequest) -> Vec<String> {
    let ext = extension(request.format).to_string();
    let mut args = vec![
        "-f".to_string(),
        format_expression(
            request.content,
            request.video_quality,
            request.audio_quality,
        ),
    ];
    match request.content {
        ContentKind::Combined => {
            args.push("--merge-output-format".to_string());
            args.push(ext);
        }
        ContentKind::VideoOnly => {
            args.push("--remux-video".to_string());
            args.push(ext);
        }
        ContentKind::AudioOnly => {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(ext);
        }
    }
    args
}

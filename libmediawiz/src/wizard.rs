use crate::destination::{list_subdirectories, validate_subdir_name};
use crate::errors::Result;
use crate::mapping::extension;
use crate::session::{
    AudioQuality, ContentKind, Destination, DestinationKind, DownloadKind, MediaFormat,
    PlaylistRange, Session, VideoQuality,
};
use std::path::{Path, PathBuf};
use url::Url;

/// Query parameter that identifies a collection in a locator.
const COLLECTION_PARAM: &str = "list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    DownloadKind,
    SourceUrl,
    CollectionRange,
    ContentKind,
    VideoQuality,
    AudioQuality,
    Subtitles,
    Format,
    DestinationKind,
    DestinationDetail,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    DownloadKind(DownloadKind),
    Url(Url),
    Range(Option<PlaylistRange>),
    ContentKind(ContentKind),
    VideoQuality(VideoQuality),
    AudioQuality(AudioQuality),
    Subtitles(bool),
    Format(MediaFormat),
    DestinationKind(DestinationKind),
    Destination(Destination),
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Quit,
    Back,
    Restart,
}

impl Control {
    pub fn parse(input: &str) -> Option<Control> {
        match input.trim().to_lowercase().as_str() {
            "q" | "quit" | "exit" => Some(Control::Quit),
            "b" | "back" => Some(Control::Back),
            "r" | "restart" => Some(Control::Restart),
            _ => None,
        }
    }
}

impl Step {
    pub const FIRST: Step = Step::DownloadKind;

    pub fn title(&self) -> &'static str {
        match self {
            Step::DownloadKind => "What do you want to download?",
            Step::SourceUrl => "Paste the URL",
            Step::CollectionRange => "Which items of the playlist? (e.g. 3-10, or \"all\")",
            Step::ContentKind => "What should be downloaded?",
            Step::VideoQuality => "Video quality",
            Step::AudioQuality => "Audio quality",
            Step::Subtitles => "Subtitles",
            Step::Format => "Output format",
            Step::DestinationKind => "Where should the files go?",
            Step::DestinationDetail => "Destination folder",
            Step::Confirm => "Ready to download",
        }
    }

    /// The step that follows this one given the choices made so far, `None` after the last.
    pub fn next(&self, session: &Session) -> Option<Step> {
        let content = session.content_kind.unwrap_or(ContentKind::Combined);
        let next = match self {
            Step::DownloadKind => Step::SourceUrl,
            Step::SourceUrl => match session.download_kind {
                Some(DownloadKind::Collection) => Step::CollectionRange,
                _ => Step::ContentKind,
            },
            Step::CollectionRange => Step::ContentKind,
            Step::ContentKind if content.has_video() => Step::VideoQuality,
            Step::ContentKind => Step::AudioQuality,
            Step::VideoQuality if content.has_audio() => Step::AudioQuality,
            Step::VideoQuality => Step::Subtitles,
            Step::AudioQuality if content.has_video() => Step::Subtitles,
            Step::AudioQuality => Step::Format,
            Step::Subtitles if session.subtitles == Some(true) => Step::DestinationKind,
            Step::Subtitles => Step::Format,
            Step::Format => Step::DestinationKind,
            Step::DestinationKind => match session.destination_kind {
                Some(kind) if kind.needs_detail() => Step::DestinationDetail,
                _ => Step::Confirm,
            },
            Step::DestinationDetail => Step::Confirm,
            Step::Confirm => return None,
        };
        Some(next)
    }
}

/// Records an answer into the fields owned by the step that produced it.
pub fn apply(session: &mut Session, answer: Answer) {
    match answer {
        Answer::DownloadKind(kind) => session.download_kind = Some(kind),
        Answer::Url(url) => session.url = Some(url),
        Answer::Range(range) => session.range = range,
        Answer::ContentKind(kind) => session.content_kind = Some(kind),
        Answer::VideoQuality(quality) => session.video_quality = Some(quality),
        Answer::AudioQuality(quality) => session.audio_quality = Some(quality),
        Answer::Subtitles(wanted) => {
            session.subtitles = Some(wanted);
            if wanted {
                session.format = Some(MediaFormat::SUBTITLE_CONTAINER);
            }
        }
        Answer::Format(format) => session.format = Some(format),
        Answer::DestinationKind(kind) => {
            session.destination_kind = Some(kind);
            session.destination = match kind {
                DestinationKind::CurrentDir => Some(Destination::CurrentDir),
                DestinationKind::CollectionTitle => Some(Destination::CollectionTitle),
                _ => None,
            };
        }
        Answer::Destination(destination) => session.destination = Some(destination),
        Answer::Start => {}
    }
}

/// Forgets the fields owned by `step`, leaving every other choice alone.
pub fn clear(session: &mut Session, step: Step) {
    match step {
        Step::DownloadKind => session.download_kind = None,
        Step::SourceUrl => session.url = None,
        Step::CollectionRange => session.range = None,
        Step::ContentKind => session.content_kind = None,
        Step::VideoQuality => session.video_quality = None,
        Step::AudioQuality => session.audio_quality = None,
        Step::Subtitles => {
            if session.subtitles == Some(true) {
                session.format = None;
            }
            session.subtitles = None;
        }
        Step::Format => session.format = None,
        Step::DestinationKind => {
            session.destination_kind = None;
            session.destination = None;
        }
        Step::DestinationDetail => session.destination = None,
        Step::Confirm => {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Next(Step),
    Finished,
}

/// Walks the steps forward and keeps the completed ones on a stack so `back` always
/// lands on the step that was actually answered last.
#[derive(Debug, Clone)]
pub struct Navigator {
    session: Session,
    history: Vec<(Step, Answer)>,
    current: Step,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator::new()
    }
}

impl Navigator {
    pub fn new() -> Navigator {
        Navigator {
            session: Session::default(),
            history: Vec::new(),
            current: Step::FIRST,
        }
    }

    pub fn current(&self) -> Step {
        self.current
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &[(Step, Answer)] {
        &self.history
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn submit(&mut self, answer: Answer) -> Progress {
        let step = self.current;
        apply(&mut self.session, answer.clone());
        self.history.push((step, answer));
        match step.next(&self.session) {
            Some(next) => {
                self.current = next;
                Progress::Next(next)
            }
            None => Progress::Finished,
        }
    }

    /// Returns to the previously answered step and forgets its answer.
    /// Returns false at the first step.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some((step, _)) => {
                clear(&mut self.session, step);
                self.current = step;
                true
            }
            None => false,
        }
    }

    pub fn restart(&mut self) {
        self.history.clear();
        self.session = Session::default();
        self.current = Step::FIRST;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub answer: Answer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Menu(Vec<MenuItem>),
    Text,
}

fn item(label: &str, answer: Answer) -> MenuItem {
    MenuItem {
        label: label.to_string(),
        answer,
    }
}

pub fn download_kind_label(kind: DownloadKind) -> &'static str {
    match kind {
        DownloadKind::Single => "Single video",
        DownloadKind::Collection => "Playlist",
    }
}

pub fn content_kind_label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Combined => "Video and audio",
        ContentKind::VideoOnly => "Video only",
        ContentKind::AudioOnly => "Audio only",
    }
}

pub fn video_quality_label(quality: VideoQuality) -> &'static str {
    match quality {
        VideoQuality::Best => "Best available",
        VideoQuality::P2160 => "2160p (4K)",
        VideoQuality::P1440 => "1440p",
        VideoQuality::P1080 => "1080p",
        VideoQuality::P720 => "720p",
        VideoQuality::P480 => "480p",
        VideoQuality::P360 => "360p",
        VideoQuality::Worst => "Lowest available",
    }
}

pub fn audio_quality_label(quality: AudioQuality) -> &'static str {
    match quality {
        AudioQuality::Best => "Best available",
        AudioQuality::High => "High (up to 192 kbps)",
        AudioQuality::Medium => "Medium (up to 128 kbps)",
        AudioQuality::Low => "Low (up to 64 kbps)",
        AudioQuality::Worst => "Lowest available",
    }
}

pub fn destination_kind_label(kind: DestinationKind) -> &'static str {
    match kind {
        DestinationKind::CurrentDir => "Current folder",
        DestinationKind::NewSubdir => "New subfolder",
        DestinationKind::ListedSubdir => "Pick an existing subfolder",
        DestinationKind::NamedSubdir => "Type the name of an existing subfolder",
        DestinationKind::CustomPath => "Custom path",
        DestinationKind::CollectionTitle => "Folder named after the playlist (known after download)",
    }
}

pub fn destination_label(destination: &Destination) -> String {
    match destination {
        Destination::CurrentDir => "current folder".to_string(),
        Destination::NewSubdir(name) => format!("new subfolder \"{name}\""),
        Destination::ExistingSubdir(name) => format!("subfolder \"{}\"", name.display()),
        Destination::Path(path) => format!("{}", path.display()),
        Destination::CollectionTitle => "folder named after the playlist".to_string(),
    }
}

/// Builds the menu or text prompt for `step`. Listing subfolders reads `base`.
pub fn prompt(step: Step, session: &Session, base: &Path) -> Result<Prompt> {
    let menu = match step {
        Step::DownloadKind => [DownloadKind::Single, DownloadKind::Collection]
            .into_iter()
            .map(|k| item(download_kind_label(k), Answer::DownloadKind(k)))
            .collect(),
        Step::SourceUrl | Step::CollectionRange => return Ok(Prompt::Text),
        Step::ContentKind => [
            ContentKind::Combined,
            ContentKind::VideoOnly,
            ContentKind::AudioOnly,
        ]
        .into_iter()
        .map(|k| item(content_kind_label(k), Answer::ContentKind(k)))
        .collect(),
        Step::VideoQuality => VideoQuality::ALL
            .into_iter()
            .map(|q| item(video_quality_label(q), Answer::VideoQuality(q)))
            .collect(),
        Step::AudioQuality => AudioQuality::ALL
            .into_iter()
            .map(|q| item(audio_quality_label(q), Answer::AudioQuality(q)))
            .collect(),
        Step::Subtitles => vec![
            item(
                "Download English subtitles and embed them (saves as MKV)",
                Answer::Subtitles(true),
            ),
            item("No subtitles", Answer::Subtitles(false)),
        ],
        Step::Format => {
            let content = session.content_kind.unwrap_or(ContentKind::Combined);
            MediaFormat::choices(content)
                .iter()
                .map(|f| item(&extension(*f).to_uppercase(), Answer::Format(*f)))
                .collect()
        }
        Step::DestinationKind => {
            let mut kinds = vec![
                DestinationKind::CurrentDir,
                DestinationKind::NewSubdir,
                DestinationKind::ListedSubdir,
                DestinationKind::NamedSubdir,
                DestinationKind::CustomPath,
            ];
            if session.download_kind == Some(DownloadKind::Collection) {
                kinds.push(DestinationKind::CollectionTitle);
            }
            kinds
                .into_iter()
                .map(|k| item(destination_kind_label(k), Answer::DestinationKind(k)))
                .collect()
        }
        Step::DestinationDetail => match session.destination_kind {
            Some(DestinationKind::ListedSubdir) => list_subdirectories(base)?
                .into_iter()
                .map(|name| {
                    let label = name.to_string_lossy().to_string();
                    item(&label, Answer::Destination(Destination::ExistingSubdir(name)))
                })
                .collect(),
            _ => return Ok(Prompt::Text),
        },
        Step::Confirm => vec![item("Start download", Answer::Start)],
    };
    Ok(Prompt::Menu(menu))
}

/// Hint shown under a free-text prompt.
pub fn text_hint(step: Step, session: &Session) -> &'static str {
    match (step, session.destination_kind) {
        (Step::SourceUrl, _) if session.download_kind == Some(DownloadKind::Collection) => {
            "A playlist URL, it must contain list=..."
        }
        (Step::SourceUrl, _) => "A single video URL",
        (Step::CollectionRange, _) => "start-end, both inclusive, or all",
        (Step::DestinationDetail, Some(DestinationKind::NewSubdir)) => "Name of the new folder",
        (Step::DestinationDetail, Some(DestinationKind::NamedSubdir)) => "Name of an existing folder",
        (Step::DestinationDetail, _) => "An absolute or relative path, created if missing",
        _ => "",
    }
}

/// Turns one line of input into an answer for `step`, or explains why it was rejected.
pub fn interpret(
    step: Step,
    prompt: &Prompt,
    session: &Session,
    base: &Path,
    input: &str,
) -> std::result::Result<Answer, String> {
    if let Prompt::Menu(items) = prompt {
        let choice = parse_choice(input, items.len())?;
        return Ok(items[choice - 1].answer.clone());
    }
    match step {
        Step::SourceUrl => {
            let kind = session.download_kind.unwrap_or(DownloadKind::Single);
            parse_locator(input, kind).map(Answer::Url)
        }
        Step::CollectionRange => parse_range(input).map(Answer::Range),
        Step::DestinationDetail => {
            parse_destination(input, session.destination_kind, base).map(Answer::Destination)
        }
        _ => Err("This step expects a number from the menu.".to_string()),
    }
}

/// Accepts a 1-based menu index within `1..=count`.
pub fn parse_choice(input: &str, count: usize) -> std::result::Result<usize, String> {
    if count == 0 {
        return Err("There is nothing to choose here. Type b to go back.".to_string());
    }
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n),
        _ => Err(format!("Please enter a number between 1 and {count}.")),
    }
}

pub fn is_collection_url(url: &Url) -> bool {
    url.query_pairs()
        .any(|(key, value)| key == COLLECTION_PARAM && !value.is_empty())
}

pub fn parse_locator(input: &str, kind: DownloadKind) -> std::result::Result<Url, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("The URL can't be empty.".to_string());
    }
    let url = Url::parse(input).map_err(|e| format!("\"{input}\" is not a valid URL ({e})."))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err("Only http and https URLs are supported.".to_string());
    }
    match (kind, is_collection_url(&url)) {
        (DownloadKind::Single, true) => Err(
            "This is a playlist URL. Go back (b) and choose Playlist, or paste a single video URL."
                .to_string(),
        ),
        (DownloadKind::Collection, false) => Err(
            "This URL has no playlist id (list=...). Paste a playlist URL, or go back (b) and choose Single video."
                .to_string(),
        ),
        _ => Ok(url),
    }
}

fn parse_index(value: &str) -> std::result::Result<u32, String> {
    match value.trim().parse::<i64>() {
        Ok(n) if n < 0 => Err(format!("{n} is negative, indices start at 0.")),
        Ok(n) => u32::try_from(n).map_err(|_| format!("{n} is too large.")),
        Err(_) => Err(format!("\"{}\" is not a whole number.", value.trim())),
    }
}

/// `all` selects the whole collection; otherwise `start-end`, `start:end` or `start end`.
pub fn parse_range(input: &str) -> std::result::Result<Option<PlaylistRange>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Enter a range like 3-10, or all.".to_string());
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    let parts: Vec<&str> = if input.contains(char::is_whitespace) {
        input.split_whitespace().collect()
    } else if let Some((start, end)) = input.split_once(['-', ':']) {
        vec![start, end]
    } else {
        vec![input]
    };
    let [start, end] = parts.as_slice() else {
        return Err("Enter exactly two numbers, like 3-10.".to_string());
    };
    let start = parse_index(start)?;
    let end = parse_index(end)?;
    PlaylistRange::new(start, end)
        .map(Some)
        .ok_or_else(|| format!("The start ({start}) must not be after the end ({end})."))
}

fn parse_destination(
    input: &str,
    kind: Option<DestinationKind>,
    base: &Path,
) -> std::result::Result<Destination, String> {
    match kind {
        Some(DestinationKind::NewSubdir) => validate_subdir_name(input).map(Destination::NewSubdir),
        Some(DestinationKind::NamedSubdir) => {
            let name = validate_subdir_name(input)?;
            if base.join(&name).is_dir() {
                Ok(Destination::ExistingSubdir(PathBuf::from(name)))
            } else {
                Err(format!("There is no folder named \"{name}\" here."))
            }
        }
        _ => {
            let input = input.trim();
            if input.is_empty() {
                return Err("The path can't be empty.".to_string());
            }
            let path = PathBuf::from(input);
            let full = if path.is_absolute() {
                path.clone()
            } else {
                base.join(&path)
            };
            if full.exists() && !full.is_dir() {
                return Err(format!("{input} exists and is not a folder."));
            }
            Ok(Destination::Path(path))
        }
    }
}

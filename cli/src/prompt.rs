use libmediawiz::command::{display_command, retrieval_args, subtitle_args, Tool};
use libmediawiz::destination::plan;
use libmediawiz::session::{DownloadKind, DownloadRequest, Session};
use libmediawiz::wizard::{
    self, audio_quality_label, content_kind_label, destination_label, download_kind_label,
    video_quality_label, Control, Navigator, Progress, Prompt, Step,
};
use libmediawiz::{mapping, MwError, Result};
use owo_colors::{OwoColorize, Stream::Stdout};
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::Path;

pub enum Outcome {
    Completed(DownloadRequest),
    Quit,
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    /// `None` once the input is closed.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) => Err(MwError::ConsoleError(format!("{} | {}", e, e.kind()))),
        }
    }

    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{text}").map_err(|e| MwError::ConsoleError(e.to_string()))
    }

    fn error(&mut self, text: &str) -> Result<()> {
        let line = format!("  {text}");
        self.say(line.if_supports_color(Stdout, |t| t.red()))
    }

    fn ask(&mut self) -> Result<()> {
        write!(self.output, "{} ", ">".if_supports_color(Stdout, |t| t.cyan()))
            .and_then(|_| self.output.flush())
            .map_err(|e| MwError::ConsoleError(e.to_string()))
    }
}

fn summary(session: &Session) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    if let Some(kind) = session.download_kind {
        rows.push(("Download", download_kind_label(kind).to_string()));
    }
    if let Some(url) = &session.url {
        rows.push(("URL", url.to_string()));
    }
    if session.download_kind == Some(DownloadKind::Collection) {
        let range = match session.range {
            Some(r) => format!("items {} to {}", r.start, r.end),
            None => "all items".to_string(),
        };
        rows.push(("Range", range));
    }
    if let Some(kind) = session.content_kind {
        rows.push(("Content", content_kind_label(kind).to_string()));
    }
    if let Some(q) = session.video_quality {
        rows.push(("Video", video_quality_label(q).to_string()));
    }
    if let Some(q) = session.audio_quality {
        rows.push(("Audio", audio_quality_label(q).to_string()));
    }
    if let Some(subs) = session.subtitles {
        rows.push(("Subtitles", if subs { "English, embedded" } else { "none" }.to_string()));
    }
    if let Some(format) = session.format {
        rows.push(("Format", mapping::extension(format).to_uppercase()));
    }
    if let Some(destination) = &session.destination {
        rows.push(("Save to", destination_label(destination)));
    }
    rows
}

fn render_confirm<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &Session,
    base: &Path,
    downloader: &Tool,
) -> Result<()> {
    for (key, value) in summary(session) {
        console.say(format!("  {:<10} {}", key, value))?;
    }
    if let Ok(request) = session.request() {
        let resolved = plan(request.kind, &request.destination, base);
        console.say("")?;
        let command = display_command(downloader, &retrieval_args(&request, &resolved));
        console.say(format!("  {}", command.if_supports_color(Stdout, |t| t.dimmed())))?;
        if request.subtitles {
            let command = display_command(downloader, &subtitle_args(&request, &resolved));
            console.say(format!("  {}", command.if_supports_color(Stdout, |t| t.dimmed())))?;
        }
    }
    console.say("")
}

fn render<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    nav: &Navigator,
    prompt: &Prompt,
    base: &Path,
    downloader: &Tool,
) -> Result<()> {
    let step = nav.current();
    console.say("")?;
    let title = format!("Step {} · {}", nav.history().len() + 1, step.title());
    console.say(title.if_supports_color(Stdout, |t| t.bold()))?;
    if step == Step::Confirm {
        render_confirm(console, nav.session(), base, downloader)?;
    }
    match prompt {
        Prompt::Menu(items) => {
            if items.is_empty() {
                console.say("  (nothing to choose from here)")?;
            }
            for (i, item) in items.iter().enumerate() {
                console.say(format!("  {}) {}", i + 1, item.label))?;
            }
        }
        Prompt::Text => {
            let hint = wizard::text_hint(step, nav.session());
            console.say(format!("  {}", hint.if_supports_color(Stdout, |t| t.dimmed())))?;
        }
    }
    let controls = if nav.can_go_back() {
        "(b) back  (r) restart  (q) quit"
    } else {
        "(q) quit"
    };
    console.say(controls.if_supports_color(Stdout, |t| t.dimmed()))?;
    console.ask()
}

/// Runs the prompt loop until the user confirms or quits. Nothing is written to disk here.
pub fn run_wizard<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    base: &Path,
    downloader: &Tool,
) -> Result<Outcome> {
    let mut nav = Navigator::new();
    loop {
        let step = nav.current();
        let prompt = wizard::prompt(step, nav.session(), base)?;
        render(console, &nav, &prompt, base, downloader)?;

        let line = match console.read_line()? {
            Some(line) => line,
            None => {
                tracing::info!("Input closed at {:?}", step);
                return Ok(Outcome::Quit);
            }
        };

        match Control::parse(&line) {
            Some(Control::Quit) => {
                tracing::info!("Quit at {:?}", step);
                return Ok(Outcome::Quit);
            }
            Some(Control::Back) | Some(Control::Restart) if !nav.can_go_back() => {
                console.error("You are already at the first step.")?;
                continue;
            }
            Some(Control::Back) => {
                nav.back();
                tracing::debug!("Back from {:?} to {:?}", step, nav.current());
                continue;
            }
            Some(Control::Restart) => {
                nav.restart();
                tracing::debug!("Restarted from {:?}", step);
                console.say("Starting over.")?;
                continue;
            }
            None => {}
        }

        match wizard::interpret(step, &prompt, nav.session(), base, &line) {
            Err(reason) => console.error(&reason)?,
            Ok(answer) => {
                tracing::debug!("{:?} answered with {:?}", step, answer);
                if nav.submit(answer) == Progress::Finished {
                    return nav.session().request().map(Outcome::Completed);
                }
            }
        }
    }
}
